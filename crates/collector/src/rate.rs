//! Counter-to-rate conversion.
//!
//! Counters only ever grow until the reporting process restarts, so their raw
//! values are useless as point-in-time measurements. The converter keeps the
//! previous `(value, timestamp)` per metric key and turns each later sample
//! into the instantaneous rate over the elapsed interval.

use rustc_hash::FxHashMap;

/// Stateful converter from monotonically increasing counters to rates.
///
/// State lives for the lifetime of the owning collector instance; it is never
/// reset between cycles.
#[derive(Debug, Default)]
pub struct RateConverter {
    previous: FxHashMap<String, (f64, f64)>,
}

impl RateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert one counter observation into a rate.
    ///
    /// The first observation of a key stores state and yields `None`. Every
    /// later observation with a strictly positive time delta yields
    /// `(value - last) / delta` and updates state. A non-positive delta
    /// yields `None` and leaves the stored pair untouched, so a clock
    /// regression cannot poison the next well-ordered sample.
    pub fn convert(&mut self, key: &str, value: f64, timestamp: f64) -> Option<f64> {
        match self.previous.get(key) {
            Some(&(last_value, last_timestamp)) => {
                let delta = timestamp - last_timestamp;
                if delta > 0.0 {
                    let rate = (value - last_value) / delta;
                    self.previous.insert(key.to_string(), (value, timestamp));
                    Some(rate)
                } else {
                    None
                }
            }
            None => {
                self.previous.insert(key.to_string(), (value, timestamp));
                None
            }
        }
    }

    /// Number of tracked metric keys.
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}
