//! Tolerant parser for the line-oriented text metric exposition format.
//!
//! Each metric line is either `name value` or `name{label="val",...} value`.
//! Comment lines (`# `-prefixed) and blank lines are ignored. A line that does
//! not match either shape, or whose value fails numeric parsing, is skipped on
//! its own; a malformed line never aborts the rest of the parse.

mod sample;

pub use sample::Sample;

use rustc_hash::FxHashMap;
use tracing::trace;

/// Parse a raw exposition text blob into samples keyed by identity.
///
/// The identity key is [`Sample::key`]: the metric name plus the rendered
/// (sorted) label set, so metrics sharing a name but differing by labels stay
/// distinct. Later duplicates of the same identity overwrite earlier ones.
pub fn parse(text: &str) -> FxHashMap<String, Sample> {
    let mut samples = FxHashMap::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line) {
            Some(sample) => {
                samples.insert(sample.key(), sample);
            }
            None => trace!("skipping malformed exposition line: {line}"),
        }
    }

    samples
}

/// Parse one metric line. Returns `None` on any malformed shape.
fn parse_line(line: &str) -> Option<Sample> {
    if let Some(brace) = line.find('{') {
        let name = line[..brace].trim();
        let rest = &line[brace + 1..];
        // The label block must be closed before the value.
        let close = rest.find('}')?;
        let label_block = &rest[..close];
        let value: f64 = rest[close + 1..].trim().parse().ok()?;

        if name.is_empty() {
            return None;
        }

        let mut sample = Sample::new(name, value);
        for pair in label_block.split(',') {
            let Some((key, val)) = pair.split_once('=') else {
                continue;
            };
            sample.insert_label(key.trim(), val.trim().trim_matches('"'));
        }
        Some(sample)
    } else {
        let mut parts = line.split_whitespace();
        let name = parts.next()?;
        let value: f64 = parts.next()?.parse().ok()?;
        Some(Sample::new(name, value))
    }
}
