//! Tabular export.
//!
//! Turns stored records into flat spreadsheet-style rows, one worksheet
//! per topic. Columns start with the satellite name and the record's
//! last-updated stamp, then follow the schema's declared field order;
//! nested object values flatten into `parentfield_childfield` columns
//! and list values join with `; `. A trailing `error` column appears
//! when any exported record carries one.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::record::{Record, ERROR_FIELD, NAME_FIELD, UNKNOWN};
use crate::schema::{Schema, Topic};
use crate::storage::SatelliteStore;

/// One flat export row as ordered (column, value) pairs.
pub type Row = Vec<(String, String)>;

/// Flatten one record into a row for its topic's worksheet.
pub fn flatten_row(
    satellite: &str,
    last_updated: Option<&DateTime<Utc>>,
    record: &Record,
    schema: &Schema,
) -> Row {
    let mut row = vec![(NAME_FIELD.to_string(), satellite.to_string())];
    if let Some(stamp) = last_updated {
        row.push(("last_updated".to_string(), stamp.to_rfc3339()));
    }

    for field in schema.fields {
        if field.name == NAME_FIELD {
            continue;
        }
        match record.get(field.name) {
            Some(Value::Object(map)) => {
                for (child, value) in map {
                    row.push((format!("{}_{}", field.name, child), scalar(value)));
                }
            }
            Some(value) => row.push((field.name.to_string(), scalar(value))),
            None => row.push((field.name.to_string(), UNKNOWN.to_string())),
        }
    }

    if let Some(error) = record.get(ERROR_FIELD) {
        row.push((ERROR_FIELD.to_string(), scalar(error)));
    }

    row
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => UNKNOWN.to_string(),
        Value::Array(items) => items
            .iter()
            .map(scalar)
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

/// Render rows as CSV. The header is the first-seen union of all row
/// columns; rows missing a column leave the cell empty.
pub fn render_csv(rows: &[Row]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for (column, _) in row {
            if !columns.contains(&column.as_str()) {
                columns.push(column);
            }
        }
    }

    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for row in rows {
        let line = columns
            .iter()
            .map(|column| {
                row.iter()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| quote(v))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn quote(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Export every stored record for one topic as a CSV worksheet.
pub fn export_topic_csv(store: &SatelliteStore, topic: Topic) -> String {
    let schema = Schema::for_topic(topic);
    let rows: Vec<Row> = store
        .list_satellites()
        .into_iter()
        .filter_map(|satellite| {
            store.get(satellite, topic.key()).map(|stored| {
                flatten_row(satellite, Some(&stored.last_updated), &stored.data, schema)
            })
        })
        .collect();

    debug!(topic = topic.key(), rows = rows.len(), "rendered export worksheet");
    render_csv(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> &'static Schema {
        Schema::for_topic(Topic::BasicInfo)
    }

    fn record_from(value: Value) -> Record {
        match value {
            Value::Object(map) => Record::from_map(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_columns_follow_schema_order_with_name_first() {
        let record = record_from(json!({
            "altitude": "550 km",
            "launch_orbit_classification": "LEO"
        }));
        let row = flatten_row("Sentinel-2A", None, &record, schema());

        assert_eq!(row[0], (NAME_FIELD.to_string(), "Sentinel-2A".to_string()));
        assert_eq!(row[1], ("altitude".to_string(), "550 km".to_string()));
        // Absent fields still get a column, holding the sentinel.
        assert!(row
            .iter()
            .any(|(c, v)| c == "orbital_life_years" && v == UNKNOWN));
    }

    #[test]
    fn test_last_updated_column_follows_name() {
        let record = record_from(json!({"altitude": "550 km"}));
        let stamp: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().unwrap();
        let row = flatten_row("Sentinel-2A", Some(&stamp), &record, schema());

        assert_eq!(row[0].0, NAME_FIELD);
        assert_eq!(
            row[1],
            (
                "last_updated".to_string(),
                "2024-05-01T12:00:00+00:00".to_string()
            )
        );
        assert_eq!(row[2], ("altitude".to_string(), "550 km".to_string()));
    }

    #[test]
    fn test_nested_object_flattens_to_joined_columns() {
        let schema = Schema::for_topic(Topic::LaunchCost);
        let record = record_from(json!({
            "launch_mass": {"max_leo": "8000 kg", "actual_mass": "1625 kg"}
        }));
        let row = flatten_row("CartoSat-3", None, &record, schema);

        assert!(row
            .iter()
            .any(|(c, v)| c == "launch_mass_max_leo" && v == "8000 kg"));
        assert!(row
            .iter()
            .any(|(c, v)| c == "launch_mass_actual_mass" && v == "1625 kg"));
        assert!(!row.iter().any(|(c, _)| c == "launch_mass"));
    }

    #[test]
    fn test_list_values_join() {
        let schema = Schema::for_topic(Topic::PurposeSdg);
        let record = record_from(json!({
            "sdg_category_identification_numbers": [13, 15]
        }));
        let row = flatten_row("Sentinel-2A", None, &record, schema);
        assert!(row
            .iter()
            .any(|(c, v)| c == "sdg_category_identification_numbers" && v == "13; 15"));
    }

    #[test]
    fn test_error_column_appended() {
        let record = Record::fallback(schema()).with_error("agent rate limited: quota");
        let row = flatten_row("CartoSat-3", None, &record, schema());
        let (last_column, last_value) = row.last().unwrap();
        assert_eq!(last_column, "error");
        assert_eq!(last_value, "agent rate limited: quota");
    }

    #[test]
    fn test_csv_quoting() {
        let rows = vec![vec![
            ("satellite_name".to_string(), "X, \"Y\"".to_string()),
            ("altitude".to_string(), "550".to_string()),
        ]];
        let csv = render_csv(&rows);
        assert_eq!(csv, "satellite_name,altitude\n\"X, \"\"Y\"\"\",550\n");
    }

    #[test]
    fn test_rows_missing_a_column_leave_cell_empty() {
        let rows = vec![
            vec![("a".to_string(), "1".to_string())],
            vec![
                ("a".to_string(), "2".to_string()),
                ("error".to_string(), "boom".to_string()),
            ],
        ];
        let csv = render_csv(&rows);
        assert_eq!(csv, "a,error\n1,\n2,boom\n");
    }
}
