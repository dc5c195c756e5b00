//! Persistent satellite records.
//!
//! All research results live in one JSON document keyed satellite name
//! then topic, each leaf holding the record plus its last-updated stamp.
//! Writes are wholesale: a put replaces the whole (satellite, topic)
//! entry and rewrites the file. The store is the single source of truth
//! the exporter and the agent's read-only lookup both draw from.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::record::Record;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One stored research result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub data: Record,
    pub last_updated: DateTime<Utc>,
}

type Document = BTreeMap<String, BTreeMap<String, StoredRecord>>;

/// File-backed store of all researched satellites.
pub struct SatelliteStore {
    path: PathBuf,
    data: Document,
}

impl SatelliteStore {
    /// Open the store at `path`, starting empty when the file does not
    /// exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let data = if path.exists() {
            let file = File::open(&path)?;
            serde_json::from_reader(BufReader::new(file))?
        } else {
            Document::new()
        };

        debug!(path = %path.display(), satellites = data.len(), "opened satellite store");
        Ok(Self { path, data })
    }

    /// Store one topic record, replacing any previous entry wholesale.
    pub fn put(
        &mut self,
        satellite: &str,
        topic: &str,
        record: Record,
        last_updated: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.data.entry(satellite.to_string()).or_default().insert(
            topic.to_string(),
            StoredRecord {
                data: record,
                last_updated,
            },
        );
        self.save()?;

        info!(satellite, topic, "stored research record");
        Ok(())
    }

    pub fn get(&self, satellite: &str, topic: &str) -> Option<&StoredRecord> {
        self.data.get(satellite)?.get(topic)
    }

    /// All topic records for one satellite.
    pub fn get_all(&self, satellite: &str) -> Option<&BTreeMap<String, StoredRecord>> {
        self.data.get(satellite)
    }

    /// Delete one topic record. Removing the last topic removes the
    /// satellite entirely.
    pub fn delete_topic(&mut self, satellite: &str, topic: &str) -> Result<bool, StorageError> {
        let Some(topics) = self.data.get_mut(satellite) else {
            return Ok(false);
        };
        let removed = topics.remove(topic).is_some();
        if topics.is_empty() {
            self.data.remove(satellite);
        }
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn delete_satellite(&mut self, satellite: &str) -> Result<bool, StorageError> {
        let removed = self.data.remove(satellite).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn list_satellites(&self) -> Vec<&str> {
        self.data.keys().map(String::as_str).collect()
    }

    /// Read-only lookup of already-researched data, in the shape handed
    /// to the agent's satellite-data tool.
    pub fn lookup_json(&self, satellite: &str) -> Option<serde_json::Value> {
        let topics = self.data.get(satellite)?;
        let map: serde_json::Map<String, serde_json::Value> = topics
            .iter()
            .map(|(topic, stored)| {
                (
                    topic.clone(),
                    serde_json::to_value(&stored.data).unwrap_or_default(),
                )
            })
            .collect();
        Some(serde_json::Value::Object(map))
    }

    fn save(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.data)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
