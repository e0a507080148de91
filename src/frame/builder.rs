//! Frame Builder
//!
//! Materializes the records of one query execution into a [`TabularResult`]:
//!
//! ```text
//! records → flatten → infer schema → align rows → TabularResult
//! ```
//!
//! Every row has exactly one value per column; keys a record lacks are
//! filled with `null`. Values of the timestamp column are converted to
//! epoch milliseconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use super::error::{FrameError, FrameResult};
use super::flatten::{flatten_record, FlatRecord};
use super::schema::{Column, ColumnSchema, FieldType};

/// Typed tabular result of one query target
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularResult {
    /// Correlation id of the originating target
    pub ref_id: String,
    /// Columns in first-seen order
    pub columns: Vec<Column>,
    /// Rows aligned to `columns`
    pub rows: Vec<Vec<Value>>,
}

impl TabularResult {
    /// Empty result for a target
    pub fn empty(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The column typed `time`, if any
    pub fn time_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.field_type == FieldType::Time)
    }

    /// All values of a column, in row order
    pub fn values(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

/// Builds a [`TabularResult`] from raw result records
pub struct FrameBuilder {
    ref_id: String,
    timestamp_field: Option<String>,
}

impl FrameBuilder {
    /// Create a builder for a target
    pub fn new(ref_id: impl Into<String>, timestamp_field: Option<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            timestamp_field,
        }
    }

    /// Flatten the records and build the frame
    pub fn build(&self, records: &[Value]) -> FrameResult<TabularResult> {
        let flattened = records
            .iter()
            .enumerate()
            .map(|(index, record)| match record {
                Value::Object(object) => Ok(flatten_record(object)),
                _ => Err(FrameError::NonObjectRecord { index }),
            })
            .collect::<FrameResult<Vec<FlatRecord>>>()?;

        self.build_flat(&flattened)
    }

    /// Build the frame from already flattened records
    pub fn build_flat(&self, records: &[FlatRecord]) -> FrameResult<TabularResult> {
        let timestamp_field = self.timestamp_field.as_deref();
        let schema = ColumnSchema::infer(records, timestamp_field);

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut row = Vec::with_capacity(schema.len());
            for column in schema.columns() {
                let value = record.get(&column.name).cloned().unwrap_or(Value::Null);
                if timestamp_field == Some(column.name.as_str()) && is_truthy(&value) {
                    row.push(Value::from(to_epoch_millis(&column.name, &value)?));
                } else {
                    row.push(value);
                }
            }
            rows.push(row);
        }

        Ok(TabularResult {
            ref_id: self.ref_id.clone(),
            columns: schema.into_columns(),
            rows,
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Convert a wire timestamp into epoch milliseconds
pub fn to_epoch_millis(column: &str, value: &Value) -> FrameResult<i64> {
    let parsed = match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        // Booleans read as 0/1 millis, like a numeric timestamp
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };

    parsed.ok_or_else(|| FrameError::InvalidTimestamp {
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_aligns_rows_to_columns() {
        let records = vec![
            json!({"$ts": "2023-01-01T00:00:00Z", "telemetry": {"temp": 20.5}}),
            json!({"$ts": "2023-01-01T00:01:00.500Z", "telemetry": {"temp": 21, "hum": 40}}),
            json!({"device": "d1"}),
        ];
        let frame = FrameBuilder::new("A", Some("$ts".into()))
            .build(&records)
            .unwrap();

        let names: Vec<&str> = frame.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["$ts", "telemetry.temp", "telemetry.hum", "device"]);
        assert_eq!(frame.columns[0].field_type, FieldType::Time);
        assert_eq!(frame.time_column().unwrap().name, "$ts");
        assert_eq!(
            frame.column("telemetry.hum").map(|c| c.field_type),
            Some(FieldType::Number)
        );
        assert!(frame.column("telemetry").is_none());

        assert_eq!(frame.len(), 3);
        assert!(frame.rows.iter().all(|row| row.len() == 4));
        assert_eq!(frame.rows[0], vec![json!(1672531200000i64), json!(20.5), Value::Null, Value::Null]);
        assert_eq!(frame.rows[1], vec![json!(1672531260500i64), json!(21), json!(40), Value::Null]);
        assert_eq!(frame.rows[2], vec![Value::Null, Value::Null, Value::Null, json!("d1")]);
    }

    #[test]
    fn test_without_timestamp_field_values_pass_through() {
        let records = vec![json!({"$ts": "2023-01-01T00:00:00Z", "v": true})];
        let frame = FrameBuilder::new("B", None).build(&records).unwrap();
        assert!(frame.time_column().is_none());
        assert_eq!(frame.columns[0].field_type, FieldType::String);
        assert_eq!(frame.rows[0][0], json!("2023-01-01T00:00:00Z"));
    }

    #[test]
    fn test_falsy_timestamps_pass_through() {
        let records = vec![
            json!({"t": null}),
            json!({"t": ""}),
            json!({"t": 0}),
            json!({"t": false}),
        ];
        let frame = FrameBuilder::new("A", Some("t".into())).build(&records).unwrap();
        assert_eq!(
            frame.values("t").unwrap(),
            vec![&Value::Null, &json!(""), &json!(0), &json!(false)]
        );
    }

    #[test]
    fn test_true_timestamp_reads_as_one_milli() {
        let records = vec![json!({"t": true})];
        let frame = FrameBuilder::new("A", Some("t".into())).build(&records).unwrap();
        assert_eq!(frame.rows[0][0], json!(1));
    }

    #[test]
    fn test_numeric_and_naive_timestamps() {
        assert_eq!(to_epoch_millis("t", &json!(1672531200000i64)).unwrap(), 1672531200000);
        assert_eq!(
            to_epoch_millis("t", &json!("2023-01-01T00:00:00")).unwrap(),
            1672531200000
        );
        assert_eq!(
            to_epoch_millis("t", &json!("2023-01-01T02:00:00+02:00")).unwrap(),
            1672531200000
        );
        assert_eq!(to_epoch_millis("t", &json!("2023-01-01")).unwrap(), 1672531200000);
    }

    #[test]
    fn test_invalid_timestamp_is_an_error() {
        let records = vec![json!({"t": "yesterday"})];
        let err = FrameBuilder::new("A", Some("t".into()))
            .build(&records)
            .unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidTimestamp {
                column: "t".into(),
                value: "\"yesterday\"".into()
            }
        );
    }

    #[test]
    fn test_non_object_record_rejected() {
        let records = vec![json!({"a": 1}), json!(42)];
        let err = FrameBuilder::new("A", None).build(&records).unwrap_err();
        assert_eq!(err, FrameError::NonObjectRecord { index: 1 });
    }

    #[test]
    fn test_empty_results() {
        let frame = FrameBuilder::new("A", Some("$ts".into())).build(&[]).unwrap();
        assert_eq!(frame, TabularResult::empty("A"));
        assert!(frame.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let frame = FrameBuilder::new("A", None)
            .build(&[json!({"x": 1})])
            .unwrap();
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "refId": "A",
                "columns": [{"name": "x", "type": "number"}],
                "rows": [[1]]
            })
        );
    }
}
