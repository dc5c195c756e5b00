//! # Sat Scout
//!
//! Satellite research pipeline driving a web-search agent over fixed
//! topic schemas.
//!
//! ## Architecture
//!
//! - **schema**: Topic registry, field definitions, and task prompts
//! - **agents**: Research-agent contract and HTTP backend
//! - **record**: Schema-shaped records and the `"NA"` sentinel
//! - **pipeline**: Normalization, trace mining, and the retrying cycle
//! - **storage**: File-backed satellite record store
//! - **export**: Flat spreadsheet-style export
//! - **config**: Configuration loading and validation

pub mod agents;
pub mod config;
pub mod export;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod storage;

pub use record::Record;
pub use schema::{Schema, Topic};
