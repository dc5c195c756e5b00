//! Trace mining.
//!
//! Best-effort salvage of partial field values from the (action,
//! observation) trace of a stalled or unparseable agent run. Each topic
//! has its own keyword/pattern triggers matching its schema, under one
//! shared policy: observations are lower-cased, the first observation to
//! trigger a rule wins, and later observations never overwrite a filled
//! field. Discovered http(s) URLs are assigned round-robin into the first
//! still-unknown source field in the schema's declared order, regardless
//! of which value field the URL actually supports — a known imprecision
//! that is preserved deliberately, pending product-owner review.
//!
//! Mining always succeeds; the worst case is the all-unknown record.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::agents::TraceStep;
use crate::record::Record;
use crate::schema::{Schema, Topic};

/// Mine a trace for partial field values. Always returns a complete,
/// schema-shaped record (all-unknown at worst).
pub fn mine(trace: &[TraceStep], schema: &Schema) -> Record {
    let mut record = Record::fallback(schema);

    for step in trace {
        let observation = step.observation.as_str();
        let obs_lower = observation.to_lowercase();

        match schema.topic {
            Topic::BasicInfo => mine_basic(&mut record, &obs_lower),
            Topic::LaunchCost => mine_cost(&mut record, observation, &obs_lower),
            Topic::TechnicalSpecs => mine_tech(&mut record, &obs_lower),
            Topic::UserInfo => mine_user(&mut record, observation, &obs_lower),
            Topic::PurposeSdg => mine_purpose(&mut record, observation, &obs_lower),
            Topic::Frugal => mine_frugal(&mut record, observation, &obs_lower),
            Topic::Numeric => mine_numeric(&mut record, observation, &obs_lower),
        }

        assign_source_url(&mut record, schema, observation);
    }

    debug!(
        topic = schema.topic.key(),
        steps = trace.len(),
        "mined trace for partial data"
    );
    record
}

// ── shared helpers ──

fn fill_str(record: &mut Record, field: &str, value: &str) {
    if record.is_unknown(field) {
        record.set(field, Value::String(value.to_string()));
    }
}

fn fill_int(record: &mut Record, field: &str, value: i64) {
    if record.is_unknown(field) {
        record.set(field, Value::from(value));
    }
}

fn fill_float(record: &mut Record, field: &str, value: f64) {
    if record.is_unknown(field) {
        record.set(field, Value::from(value));
    }
}

/// Value following `label` after a colon/whitespace separator, up to the
/// next sentence/clause break.
fn labeled_value(text: &str, label: &str) -> Option<String> {
    let start = text.find(label)? + label.len();
    let rest = &text[start..];

    let value_start = rest.find(|c: char| c != ':' && !c.is_whitespace())?;
    let sep = &rest[..value_start];
    if !sep.chars().any(|c| c == ':' || c.is_whitespace()) {
        return None;
    }

    let value = &rest[value_start..];
    let end = value
        .find(|c| c == '.' || c == ';' || c == '\n')
        .unwrap_or(value.len());
    let value = value[..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// First value found for any of the labels, else the whole observation.
fn labeled_or_whole(observation: &str, obs_lower: &str, labels: &[&str]) -> String {
    labels
        .iter()
        .find_map(|label| labeled_value(obs_lower, label))
        .unwrap_or_else(|| observation.trim().to_string())
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").expect("static regex"))
}

fn currency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$[\d,]+(?:\.\d+)?").expect("static regex"))
}

fn roi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"roi[:\s]+([\d.]+)").expect("static regex"))
}

fn revenue_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"revenue[:\s]+([\d.]+)").expect("static regex"))
}

fn sdg_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"sdg\s*(\d+)").expect("static regex"))
}

/// Round-robin a discovered URL into the first still-unknown source field,
/// in the schema's declared field order. One URL per observation.
fn assign_source_url(record: &mut Record, schema: &Schema, observation: &str) {
    let Some(found) = url_re().find(observation) else {
        return;
    };
    let candidate = found.as_str().trim_end_matches(['.', ',', ')', ';']);
    if url::Url::parse(candidate).is_err() {
        return;
    }

    let target = schema
        .source_fields()
        .find(|field| record.is_unknown(field));
    if let Some(field) = target {
        record.set(field, Value::String(candidate.to_string()));
    }
}

// ── per-topic trigger sets ──

fn mine_basic(record: &mut Record, obs_lower: &str) {
    if obs_lower.contains("altitude") || obs_lower.contains("km") {
        fill_str(record, "altitude", "Partial");
    }
    if ["leo", "meo", "geo", "orbit"]
        .iter()
        .any(|kind| obs_lower.contains(kind))
    {
        fill_str(record, "launch_orbit_classification", "Partial");
    }
}

fn mine_cost(record: &mut Record, observation: &str, obs_lower: &str) {
    if obs_lower.contains("launch cost") && observation.contains('$') {
        if let Some(amount) = currency_re().find(observation) {
            fill_str(record, "launch_cost", amount.as_str());
        }
    }
    if let Some(vehicle) = labeled_value(obs_lower, "launch vehicle") {
        fill_str(record, "launch_vehicle", &vehicle);
    }
    if let Some(date) = labeled_value(obs_lower, "launch date") {
        fill_str(record, "launch_date", &date);
    }
    if let Some(site) = labeled_value(obs_lower, "launch site") {
        fill_str(record, "launch_site", &site);
    }
    if let Some(mass) = labeled_value(obs_lower, "launch mass") {
        fill_str(record, "launch_mass", &mass);
    }
    if obs_lower.contains("launch success") {
        if obs_lower.contains("fail") {
            fill_int(record, "launch_success", 0);
        } else {
            fill_int(record, "launch_success", 1);
        }
    }
    if obs_lower.contains("reusab") {
        if obs_lower.contains("not reusable") || obs_lower.contains("expendable") {
            fill_int(record, "vehicle_reusability", 0);
        } else if obs_lower.contains("reusable") {
            fill_int(record, "vehicle_reusability", 1);
        }
        fill_str(record, "reusability_details", observation.trim());
    }
    if let Some(cost) = labeled_value(obs_lower, "mission cost") {
        fill_str(record, "mission_cost", &cost);
    }
}

fn mine_tech(record: &mut Record, obs_lower: &str) {
    if let Some(kind) = labeled_value(obs_lower, "satellite type") {
        fill_str(record, "satellite_type", &kind);
    }
    if let Some(application) = labeled_value(obs_lower, "application") {
        fill_str(record, "satellite_application", &application);
    }
}

fn mine_user(record: &mut Record, observation: &str, obs_lower: &str) {
    let category = if obs_lower.contains("military") {
        Some(1)
    } else if obs_lower.contains("civil") {
        Some(2)
    } else if obs_lower.contains("commercial") {
        Some(3)
    } else if obs_lower.contains("government") {
        Some(4)
    } else if obs_lower.contains("mix") {
        Some(5)
    } else {
        None
    };
    if let Some(category) = category {
        fill_int(record, "user_category_number", category);
    }

    let labels = ["operated by", "owned by", "user", "operator"];
    if labels.iter().any(|l| obs_lower.contains(l)) {
        let description = labeled_or_whole(observation, obs_lower, &labels);
        fill_str(record, "user_description", &description);
    }
}

fn mine_purpose(record: &mut Record, observation: &str, obs_lower: &str) {
    let purpose = if obs_lower.contains("communication") {
        Some(1)
    } else if obs_lower.contains("earth observation") {
        Some(2)
    } else if obs_lower.contains("navigation") {
        Some(3)
    } else if obs_lower.contains("space science") {
        Some(4)
    } else if obs_lower.contains("technology development") {
        Some(5)
    } else {
        None
    };
    if let Some(purpose) = purpose {
        fill_int(record, "purpose", purpose);
        fill_int(record, "purpose_category_number", purpose);
    }

    let purpose_labels = ["purpose", "mission", "application"];
    if purpose_labels.iter().any(|l| obs_lower.contains(l)) {
        let description = labeled_or_whole(observation, obs_lower, &purpose_labels);
        fill_str(record, "purpose_description", &description);
    }

    let sdg_category = if obs_lower.contains("economic") {
        Some(1)
    } else if obs_lower.contains("social") {
        Some(2)
    } else if obs_lower.contains("environmental") {
        Some(3)
    } else if obs_lower.contains("innovation") {
        Some(4)
    } else {
        None
    };
    if let Some(category) = sdg_category {
        fill_int(record, "sdg_category", category);
    }

    let numbers: Vec<Value> = sdg_number_re()
        .captures_iter(obs_lower)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse::<i64>().ok())
        .map(Value::from)
        .collect();
    if !numbers.is_empty() && record.is_unknown("sdg_category_identification_numbers") {
        record.set("sdg_category_identification_numbers", Value::Array(numbers));
    }

    if obs_lower.contains("sdg") {
        if let Some(description) =
            labeled_value(obs_lower, "sdgs").or_else(|| labeled_value(obs_lower, "sdg"))
        {
            fill_str(record, "sdg_description", &description);
        }
    }
}

fn mine_frugal(record: &mut Record, observation: &str, obs_lower: &str) {
    if obs_lower.contains("frugal") {
        if obs_lower.contains("yes") {
            fill_str(record, "frugal", "YES");
        } else if obs_lower.contains("no") {
            fill_str(record, "frugal", "NO");
        }
    }

    let efficient = |obs: &str| obs.contains("efficient") || obs.contains("low cost");

    if obs_lower.contains("development cost") {
        if efficient(obs_lower) {
            fill_int(record, "development_cost_efficiency", 1);
            fill_str(
                record,
                "development_cost_efficiency_description",
                observation.trim(),
            );
        } else {
            fill_int(record, "development_cost_efficiency", 0);
        }
    }
    if obs_lower.contains("operational cost") {
        if efficient(obs_lower) {
            fill_int(record, "operational_cost_efficiency", 1);
            fill_str(
                record,
                "operational_cost_efficiency_description",
                observation.trim(),
            );
        } else {
            fill_int(record, "operational_cost_efficiency", 0);
        }
    }
    if obs_lower.contains("labour cost") || obs_lower.contains("labor cost") {
        if efficient(obs_lower) {
            fill_int(record, "labour_cost_efficiency", 1);
            fill_str(
                record,
                "labour_cost_efficiency_description",
                observation.trim(),
            );
        } else {
            fill_int(record, "labour_cost_efficiency", 0);
        }
    }
    if obs_lower.contains("frugal innovation")
        || obs_lower.contains("indigenous")
        || obs_lower.contains("reuse")
    {
        fill_int(record, "frugal_innovation_design", 1);
        fill_str(
            record,
            "frugal_innovation_design_description",
            observation.trim(),
        );
    }
}

fn mine_numeric(record: &mut Record, observation: &str, obs_lower: &str) {
    if let Some(caps) = roi_re().captures(obs_lower) {
        if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
            fill_float(record, "return_on_investment", value);
        }
    }
    if let Some(caps) = revenue_re().captures(obs_lower) {
        if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
            fill_float(record, "data_of_revenue_from_satellite_launch_musd", value);
        }
    }
    if obs_lower.contains("roi") || obs_lower.contains("return on investment") {
        fill_str(
            record,
            "return_on_investment_description",
            observation.trim(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::TraceStep;
    use crate::schema::Topic;

    fn step(observation: &str) -> TraceStep {
        TraceStep::new("web_search", observation)
    }

    #[test]
    fn test_empty_trace_yields_fallback() {
        let schema = Schema::for_topic(Topic::LaunchCost);
        let record = mine(&[], schema);
        assert_eq!(record, Record::fallback(schema));
    }

    #[test]
    fn test_first_match_wins() {
        let schema = Schema::for_topic(Topic::LaunchCost);
        let trace = vec![
            step("The launch cost was $62 million according to reports."),
            step("Another article puts the launch cost at $75 million."),
        ];
        let record = mine(&trace, schema);
        assert_eq!(record.get("launch_cost"), Some(&Value::String("$62".into())));
    }

    #[test]
    fn test_cost_labeled_fields() {
        let schema = Schema::for_topic(Topic::LaunchCost);
        let trace = vec![step(
            "Launch vehicle: PSLV-XL; launch site: Satish Dhawan Space Centre\n\
             Launch date: 27 November 2019",
        )];
        let record = mine(&trace, schema);
        assert_eq!(
            record.get("launch_vehicle"),
            Some(&Value::String("pslv-xl".into()))
        );
        assert_eq!(
            record.get("launch_site"),
            Some(&Value::String("satish dhawan space centre".into()))
        );
        assert_eq!(
            record.get("launch_date"),
            Some(&Value::String("27 november 2019".into()))
        );
    }

    #[test]
    fn test_reusability_flags() {
        let schema = Schema::for_topic(Topic::LaunchCost);
        let record = mine(&[step("The vehicle is expendable, reusability: none")], schema);
        assert_eq!(record.get("vehicle_reusability"), Some(&Value::from(0)));
        assert!(!record.is_unknown("reusability_details"));

        let record = mine(&[step("The booster is reusable")], schema);
        assert_eq!(record.get("vehicle_reusability"), Some(&Value::from(1)));
    }

    #[test]
    fn test_url_round_robin_in_schema_order() {
        let schema = Schema::for_topic(Topic::LaunchCost);
        let trace = vec![
            step("See https://example.com/a for details."),
            step("Also https://example.com/b has more."),
            step("And https://example.com/c."),
        ];
        let record = mine(&trace, schema);
        assert_eq!(
            record.get("launch_cost_source"),
            Some(&Value::String("https://example.com/a".into()))
        );
        assert_eq!(
            record.get("launch_vehicle_source"),
            Some(&Value::String("https://example.com/b".into()))
        );
        assert_eq!(
            record.get("launch_date_source"),
            Some(&Value::String("https://example.com/c".into()))
        );
        assert!(record.is_unknown("launch_site_source"));
    }

    #[test]
    fn test_url_trailing_punctuation_trimmed() {
        let schema = Schema::for_topic(Topic::UserInfo);
        let record = mine(&[step("Operated by ISRO (see https://isro.gov.in/page).")], schema);
        assert_eq!(
            record.get("user_source_link"),
            Some(&Value::String("https://isro.gov.in/page".into()))
        );
    }

    #[test]
    fn test_basic_partial_markers() {
        let schema = Schema::for_topic(Topic::BasicInfo);
        let record = mine(&[step("The satellite orbits at 550 km in LEO.")], schema);
        assert_eq!(record.get("altitude"), Some(&Value::String("Partial".into())));
        assert_eq!(
            record.get("launch_orbit_classification"),
            Some(&Value::String("Partial".into()))
        );
        assert!(record.is_unknown("orbital_life_years"));
    }

    #[test]
    fn test_user_category_first_match_wins() {
        let schema = Schema::for_topic(Topic::UserInfo);
        let trace = vec![
            step("It is a military satellite."),
            step("Some sources call it commercial."),
        ];
        let record = mine(&trace, schema);
        assert_eq!(record.get("user_category_number"), Some(&Value::from(1)));
    }

    #[test]
    fn test_purpose_and_sdg_numbers() {
        let schema = Schema::for_topic(Topic::PurposeSdg);
        let trace = vec![step(
            "An Earth observation mission supporting environmental goals: SDG 13 and SDG 15",
        )];
        let record = mine(&trace, schema);
        assert_eq!(record.get("purpose"), Some(&Value::from(2)));
        assert_eq!(record.get("purpose_category_number"), Some(&Value::from(2)));
        assert_eq!(record.get("sdg_category"), Some(&Value::from(3)));
        assert_eq!(
            record.get("sdg_category_identification_numbers"),
            Some(&Value::Array(vec![Value::from(13), Value::from(15)]))
        );
    }

    #[test]
    fn test_frugal_flags() {
        let schema = Schema::for_topic(Topic::Frugal);
        let trace = vec![step(
            "Frugal? Yes. The development cost was remarkably low cost compared to peers, \
             with indigenous components throughout.",
        )];
        let record = mine(&trace, schema);
        assert_eq!(record.get("frugal"), Some(&Value::String("YES".into())));
        assert_eq!(record.get("development_cost_efficiency"), Some(&Value::from(1)));
        assert_eq!(record.get("frugal_innovation_design"), Some(&Value::from(1)));
        assert!(record.is_unknown("operational_cost_efficiency"));
    }

    #[test]
    fn test_numeric_roi_and_revenue() {
        let schema = Schema::for_topic(Topic::Numeric);
        let record = mine(&[step("Estimated ROI: 1.5 with revenue: 120.5 million USD")], schema);
        assert_eq!(record.get("return_on_investment"), Some(&Value::from(1.5)));
        assert_eq!(
            record.get("data_of_revenue_from_satellite_launch_musd"),
            Some(&Value::from(120.5))
        );
        assert!(!record.is_unknown("return_on_investment_description"));
    }

    #[test]
    fn test_record_always_complete() {
        for topic in Topic::all() {
            let schema = Schema::for_topic(topic);
            let record = mine(&[step("nothing useful here")], schema);
            for field in schema.fields {
                assert!(record.contains(field.name), "{:?} {}", topic, field.name);
            }
        }
    }
}
