//! Per-entity CSV output.
//!
//! One append-only CSV per entity, created lazily on the entity's first
//! non-empty record. The first write fixes the column schema (`timestamp`,
//! `timestamp_unix`, then the remaining observed keys in sorted order); keys
//! that only show up in later cycles are logged for diagnostics and dropped
//! from the row. Every row is flushed immediately; this is an offline
//! test-data tool, durability beats throughput.

use std::fs::File;
use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use collector::{CollectorError, Record, RecordSink, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::debug;

struct EntityLog {
    writer: csv::Writer<File>,
    /// Column order as written in the header.
    columns: Vec<String>,
    /// Same set, for membership checks against wide records.
    recognized: FxHashSet<String>,
}

/// CSV-backed [`RecordSink`], one `<entity>_metrics.csv` per entity.
pub struct CsvEntityWriter {
    output_dir: PathBuf,
    logs: FxHashMap<String, EntityLog>,
}

impl CsvEntityWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            logs: FxHashMap::default(),
        }
    }

    fn open_log(&mut self, entity: &str, record: &Record) -> Result<&mut EntityLog> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{entity}_metrics.csv"));
        let mut writer = csv::Writer::from_writer(File::create(&path)?);

        // Schema is fixed here, at the first successful write.
        let mut columns = vec!["timestamp".to_string(), "timestamp_unix".to_string()];
        columns.extend(record.keys().cloned());

        writer
            .write_record(&columns)
            .map_err(|e| CollectorError::output(e.to_string()))?;

        let recognized = columns.iter().cloned().collect();
        self.logs.insert(
            entity.to_string(),
            EntityLog {
                writer,
                columns,
                recognized,
            },
        );
        Ok(self.logs.get_mut(entity).expect("just inserted"))
    }
}

impl RecordSink for CsvEntityWriter {
    fn write(&mut self, entity: &str, timestamp: DateTime<Utc>, record: &Record) -> Result<()> {
        if record.is_empty() {
            return Ok(());
        }

        let iso = timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        let unix = timestamp.timestamp_micros() as f64 / 1e6;

        if !self.logs.contains_key(entity) {
            self.open_log(entity, record)?;
        }
        let log = self.logs.get_mut(entity).expect("opened above");

        let unseen: Vec<&str> = record
            .keys()
            .filter(|key| !log.recognized.contains(key.as_str()))
            .map(String::as_str)
            .collect();
        if !unseen.is_empty() {
            // Schema stays fixed; later keys are visible in logs only.
            debug!("new metric keys for {entity} not in schema, dropped: {unseen:?}");
        }

        let row: Vec<String> = log
            .columns
            .iter()
            .map(|column| match column.as_str() {
                "timestamp" => iso.clone(),
                "timestamp_unix" => unix.to_string(),
                key => record.get(key).map(render_cell).unwrap_or_default(),
            })
            .collect();

        log.writer
            .write_record(&row)
            .map_err(|e| CollectorError::output(e.to_string()))?;
        log.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        for log in self.logs.values_mut() {
            log.writer.flush()?;
        }
        Ok(())
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        // Unquoted; CSV escaping is the writer's job.
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn read_lines(dir: &std::path::Path, entity: &str) -> Vec<String> {
        let content =
            std::fs::read_to_string(dir.join(format!("{entity}_metrics.csv"))).unwrap();
        content.lines().map(String::from).collect()
    }

    #[test]
    fn test_header_written_once_with_sorted_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvEntityWriter::new(dir.path());
        let now = Utc::now();

        writer
            .write(
                "nf0",
                now,
                &record(&[("host_b", json!(2.0)), ("host_a", json!(1.0))]),
            )
            .unwrap();

        let lines = read_lines(dir.path(), "nf0");
        assert_eq!(lines[0], "timestamp,timestamp_unix,host_a,host_b");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_schema_never_gains_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvEntityWriter::new(dir.path());
        let now = Utc::now();

        writer.write("nf0", now, &record(&[("a", json!(1.0))])).unwrap();
        writer
            .write("nf0", now, &record(&[("a", json!(2.0)), ("late", json!(9.0))]))
            .unwrap();

        let lines = read_lines(dir.path(), "nf0");
        assert_eq!(lines[0], "timestamp,timestamp_unix,a");
        // The late key is absent from every row, not just the header.
        for line in &lines[1..] {
            assert_eq!(line.matches(',').count(), 2);
            assert!(!line.contains('9'));
        }
    }

    #[test]
    fn test_missing_schema_key_leaves_empty_cell() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvEntityWriter::new(dir.path());
        let now = Utc::now();

        writer
            .write("nf0", now, &record(&[("a", json!(1.0)), ("b", json!(2.0))]))
            .unwrap();
        writer.write("nf0", now, &record(&[("b", json!(3.0))])).unwrap();

        let lines = read_lines(dir.path(), "nf0");
        assert!(lines[2].ends_with(",,3.0"));
    }

    #[test]
    fn test_empty_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvEntityWriter::new(dir.path());

        writer.write("nf0", Utc::now(), &Record::new()).unwrap();
        assert!(!dir.path().join("nf0_metrics.csv").exists());
    }

    #[test]
    fn test_entities_write_to_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvEntityWriter::new(dir.path());
        let now = Utc::now();

        writer.write("nf0", now, &record(&[("a", json!(1))])).unwrap();
        writer.write("nf1", now, &record(&[("b", json!(2))])).unwrap();

        assert!(dir.path().join("nf0_metrics.csv").exists());
        assert!(dir.path().join("nf1_metrics.csv").exists());
    }

    #[test]
    fn test_string_and_null_cells() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvEntityWriter::new(dir.path());

        writer
            .write(
                "nf0",
                Utc::now(),
                &record(&[("state", json!("connected")), ("gap", Value::Null)]),
            )
            .unwrap();

        let lines = read_lines(dir.path(), "nf0");
        assert_eq!(lines[0], "timestamp,timestamp_unix,gap,state");
        assert!(lines[1].ends_with(",,connected"));
    }
}
