use std::collections::BTreeMap;
use std::fmt::Write;

/// A single parsed metric sample.
///
/// Labels live in a `BTreeMap` so the rendered identity key is canonical
/// regardless of the order labels appeared in on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Metric name as it appeared before any label block.
    pub name: String,
    /// Label set, sorted by label name.
    pub labels: BTreeMap<String, String>,
    /// Numeric sample value.
    pub value: f64,
}

impl Sample {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            value,
        }
    }

    pub fn insert_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    /// Identity key: the bare name for unlabelled samples, otherwise
    /// `name{a="1",b="2"}` with labels in sorted order.
    ///
    /// A rendered key always starts with the metric name, which the counter
    /// tables rely on for prefix matching.
    pub fn key(&self) -> String {
        render_key(&self.name, self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Identity key with one label removed, used as the base name of an
    /// aggregation group (e.g. per-core samples minus the core index).
    pub fn key_without_label(&self, label: &str) -> String {
        render_key(
            &self.name,
            self.labels
                .iter()
                .filter(|(k, _)| k.as_str() != label)
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }
}

fn render_key<'a>(name: &str, labels: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::from(name);
    let mut first = true;
    for (k, v) in labels {
        if first {
            out.push('{');
            first = false;
        } else {
            out.push(',');
        }
        let _ = write!(out, "{k}=\"{v}\"");
    }
    if !first {
        out.push('}');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_without_labels() {
        let sample = Sample::new("node_load1", 1.0);
        assert_eq!(sample.key(), "node_load1");
    }

    #[test]
    fn test_key_with_labels_sorted() {
        let mut sample = Sample::new("node_cpu_seconds_total", 1.0);
        sample.insert_label("mode", "idle");
        sample.insert_label("cpu", "3");
        assert_eq!(
            sample.key(),
            "node_cpu_seconds_total{cpu=\"3\",mode=\"idle\"}"
        );
    }

    #[test]
    fn test_key_without_label_strips_only_that_label() {
        let mut sample = Sample::new("node_cpu_seconds_total", 1.0);
        sample.insert_label("cpu", "3");
        sample.insert_label("mode", "idle");
        assert_eq!(
            sample.key_without_label("cpu"),
            "node_cpu_seconds_total{mode=\"idle\"}"
        );
        // Stripping the only label leaves a bare name.
        let mut one = Sample::new("container_fs_reads_total", 1.0);
        one.insert_label("device", "sda");
        assert_eq!(one.key_without_label("device"), "container_fs_reads_total");
    }
}
