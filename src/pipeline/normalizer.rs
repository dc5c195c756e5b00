//! Response normalization.
//!
//! Turns a raw agent output into a schema-conformant record. Extraction
//! strategies run in strict precedence order; the first success wins:
//!
//! 1. output is already a mapping — accept as-is
//! 2. first ```json fenced block in the text
//! 3. the whole text, when it starts with `{`
//! 4. schema-aware `field: value` line parse
//!
//! Whatever succeeds then passes field completion: every schema field not
//! present is filled with the `"NA"` sentinel; extra keys the agent
//! volunteered are never dropped. If all four strategies miss, the caller
//! gets `ExtractionFailure` and must branch to trace mining or fallback.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::agents::RawOutput;
use crate::record::Record;
use crate::schema::Schema;

/// No structural parse succeeded. Callers branch to trace mining or the
/// all-unknown fallback; this never crosses the pipeline boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no structured data could be extracted from agent output")]
pub struct ExtractionFailure;

/// Normalize a raw agent output against a topic schema. Pure.
pub fn normalize(raw: &RawOutput, schema: &Schema) -> Result<Record, ExtractionFailure> {
    let mut record = match raw {
        RawOutput::Structured(map) => Record::from_map(map.clone()),
        RawOutput::Text(text) => extract_from_text(text, schema)?,
    };

    record.fill_missing(schema);
    Ok(record)
}

fn extract_from_text(text: &str, schema: &Schema) -> Result<Record, ExtractionFailure> {
    if let Some(block) = fenced_json(text) {
        if let Some(record) = parse_object(block) {
            debug!("extracted record from fenced block");
            return Ok(record);
        }
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        if let Some(record) = parse_object(trimmed) {
            debug!("extracted record from bare JSON output");
            return Ok(record);
        }
    }

    if let Some(record) = parse_field_lines(text, schema) {
        debug!("extracted record from field: value lines");
        return Ok(record);
    }

    Err(ExtractionFailure)
}

/// First ```json fenced block in the text, if any.
fn fenced_json(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn parse_object(s: &str) -> Option<Record> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => Some(Record::from_map(map)),
        _ => None,
    }
}

/// Last structural attempt: scan for `field: value` lines whose key, once
/// normalized, matches a schema field. Succeeds when at least one field
/// matched.
fn parse_field_lines(text: &str, schema: &Schema) -> Option<Record> {
    let mut record = Record::new();

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = normalize_key(key);
        if !schema.has_field(&key) {
            continue;
        }

        let value = value
            .trim()
            .trim_matches(|c| c == '"' || c == '`' || c == ',')
            .trim();
        if value.is_empty() || record.contains(&key) {
            continue;
        }

        record.set(&key, Value::String(value.to_string()));
    }

    if record.is_empty() {
        None
    } else {
        Some(record)
    }
}

/// Strip markdown noise from a candidate key and snake-case it.
fn normalize_key(key: &str) -> String {
    key.trim()
        .trim_matches(|c| c == '"' || c == '`' || c == '*' || c == '-')
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}
