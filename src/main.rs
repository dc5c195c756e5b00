use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sat_scout::agents::backend::{HttpAgentBackend, ResearchBackend};
use sat_scout::config::AppConfig;
use sat_scout::export::export_topic_csv;
use sat_scout::pipeline::ResearchPipeline;
use sat_scout::storage::SatelliteStore;
use sat_scout::Topic;

#[derive(Parser)]
#[command(name = "sat-scout")]
#[command(about = "Satellite research pipeline with agent-backed data extraction")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Research one satellite and store the results
    Research {
        /// Satellite name
        name: String,

        /// Only research this topic (default: all topics)
        #[arg(long)]
        topic: Option<String>,

        /// Print results without storing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show stored records for a satellite
    Show {
        /// Satellite name
        name: String,

        /// Only show this topic
        #[arg(long)]
        topic: Option<String>,
    },

    /// List stored satellites
    List,

    /// Delete stored records
    Delete {
        /// Satellite name
        name: String,

        /// Only delete this topic (default: the whole satellite)
        #[arg(long)]
        topic: Option<String>,
    },

    /// Export one topic's records as CSV
    Export {
        /// Topic to export
        #[arg(long)]
        topic: String,

        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Check whether the agent service is reachable
    Health,
}

fn parse_topic(key: &str) -> Result<Topic> {
    Topic::from_key(key).ok_or_else(|| {
        let known: Vec<&str> = Topic::all().iter().map(|t| t.key()).collect();
        anyhow!("unknown topic '{}', expected one of: {}", key, known.join(", "))
    })
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting sat-scout v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Research {
            name,
            topic,
            dry_run,
        } => {
            let topics = match topic.as_deref() {
                Some(key) => vec![parse_topic(key)?],
                None => Topic::all().to_vec(),
            };

            let backend: Arc<dyn ResearchBackend> = Arc::new(HttpAgentBackend::new(
                config.agent.base_url.clone(),
                config.agent.api_key.clone(),
                config.agent.timeout_seconds,
            ));
            let pipeline = ResearchPipeline::new(backend)
                .with_budgets(config.agent.max_actions, config.agent.timeout_seconds);

            let mut store = SatelliteStore::open(config.store_path())?;

            for topic in topics {
                println!("Researching {} for {}...", topic.title(), name);
                let record = pipeline.process(&name, topic).await;

                let filled = record
                    .iter()
                    .filter(|(_, v)| !matches!(v, serde_json::Value::String(s) if s == "NA"))
                    .count();
                println!("  {} of {} fields found", filled, record.len());

                if dry_run {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                } else {
                    store.put(&name, topic.key(), record, Utc::now())?;
                }
            }

            if !dry_run {
                println!("Stored results in {}", store.path().display());
            }
        }

        Commands::Show { name, topic } => {
            let store = SatelliteStore::open(config.store_path())?;
            match topic.as_deref() {
                Some(key) => {
                    let topic = parse_topic(key)?;
                    let stored = store
                        .get(&name, topic.key())
                        .ok_or_else(|| anyhow!("no {} record for {}", topic.key(), name))?;
                    println!("{}", serde_json::to_string_pretty(stored)?);
                }
                None => {
                    let topics = store
                        .get_all(&name)
                        .ok_or_else(|| anyhow!("no records for {}", name))?;
                    println!("{}", serde_json::to_string_pretty(topics)?);
                }
            }
        }

        Commands::List => {
            let store = SatelliteStore::open(config.store_path())?;
            for satellite in store.list_satellites() {
                let topics = store
                    .get_all(satellite)
                    .map(|t| t.len())
                    .unwrap_or_default();
                println!("{} ({} topics)", satellite, topics);
            }
        }

        Commands::Delete { name, topic } => {
            let mut store = SatelliteStore::open(config.store_path())?;
            let removed = match topic.as_deref() {
                Some(key) => {
                    let topic = parse_topic(key)?;
                    store.delete_topic(&name, topic.key())?
                }
                None => store.delete_satellite(&name)?,
            };
            if removed {
                println!("Deleted.");
            } else {
                println!("Nothing to delete.");
            }
        }

        Commands::Export { topic, out } => {
            let topic = parse_topic(&topic)?;
            let store = SatelliteStore::open(config.store_path())?;
            let csv = export_topic_csv(&store, topic);
            match out {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", csv),
            }
        }

        Commands::Health => {
            let backend = HttpAgentBackend::new(
                config.agent.base_url.clone(),
                config.agent.api_key.clone(),
                config.agent.timeout_seconds,
            );
            if backend.health_check().await? {
                println!("Agent service at {} is healthy.", config.agent.base_url);
            } else {
                println!("Agent service at {} is not responding.", config.agent.base_url);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
