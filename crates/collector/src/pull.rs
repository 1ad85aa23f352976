//! Pull-side collection: poll one exposition-format endpoint and normalize
//! its samples into a flat, prefixed key/value record for the cycle.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::classify::{AggregationRule, classify, is_counter};
use crate::rate::RateConverter;
use crate::stats::summarize;

/// Static description of one pull source: where its keys go and which tables
/// drive conversion and aggregation.
#[derive(Debug)]
pub struct PullSource {
    /// Short name used in logs and rate-state scoping.
    pub name: &'static str,
    /// Prefix applied to every output key, identifying the origin.
    pub prefix: &'static str,
    pub counters: &'static [&'static str],
    pub aggregations: &'static [AggregationRule],
}

/// The container-level source (per-container resource metrics).
pub const CONTAINER_SOURCE: PullSource = PullSource {
    name: "container",
    prefix: "cnt",
    counters: crate::classify::CONTAINER_COUNTER_METRICS,
    aggregations: crate::classify::CONTAINER_AGGREGATIONS,
};

/// The host-level source (whole-machine metrics, shared across entities).
pub const HOST_SOURCE: PullSource = PullSource {
    name: "host",
    prefix: "host",
    counters: crate::classify::HOST_COUNTER_METRICS,
    aggregations: crate::classify::HOST_AGGREGATIONS,
};

/// Collector for one pull source.
///
/// Owns the per-key rate state for the source, so one instance must live for
/// the whole collection run.
pub struct PullCollector {
    client: reqwest::Client,
    endpoint: String,
    source: &'static PullSource,
    rates: RateConverter,
}

impl PullCollector {
    /// `base_url` is the source's base address; the exposition text is served
    /// under its `/metrics` path.
    pub fn new(client: reqwest::Client, base_url: &str, source: &'static PullSource) -> Self {
        Self {
            client,
            endpoint: format!("{}/metrics", base_url.trim_end_matches('/')),
            source,
            rates: RateConverter::new(),
        }
    }

    /// Run one collection pass against the endpoint.
    ///
    /// `filter` restricts container-scoped sources to one container/instance
    /// identifier; `now` is the cycle timestamp in unix seconds. Transport
    /// failures are logged and yield an empty record; they never propagate.
    pub async fn collect(&mut self, filter: Option<&str>, now: f64) -> FxHashMap<String, f64> {
        match self.fetch().await {
            Ok(body) => self.process(&body, filter, now),
            Err(e) => {
                warn!(
                    "failed to collect {} metrics from {}: {e}",
                    self.source.name, self.endpoint
                );
                FxHashMap::default()
            }
        }
    }

    async fn fetch(&self) -> reqwest::Result<String> {
        self.client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    /// Normalize one raw exposition blob into the cycle's flat record.
    ///
    /// Split from [`collect`] so the pipeline can be exercised on fixed
    /// bodies without a live endpoint.
    pub fn process(&mut self, body: &str, filter: Option<&str>, now: f64) -> FxHashMap<String, f64> {
        let samples = exposition::parse(body);

        let mut record: FxHashMap<String, f64> = FxHashMap::default();
        // Cycle-scoped accumulation of per-instance values per base name.
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for (key, sample) in &samples {
            if let Some(target) = filter {
                // Two label conventions identify the owning container.
                if sample.labels.get("name").is_some_and(|v| v != target) {
                    continue;
                }
                if sample.labels.get("container").is_some_and(|v| v != target) {
                    continue;
                }
            }

            let counter = is_counter(key, self.source.counters);
            let value = if counter {
                match self.rates.convert(&self.state_key(filter, key), sample.value, now) {
                    Some(rate) => rate,
                    // No previous sample yet; nothing to emit this cycle.
                    None => continue,
                }
            } else {
                sample.value
            };

            match classify(sample, self.source.aggregations) {
                Some(base) => {
                    let base = if counter { format!("{base}_rate") } else { base };
                    groups.entry(base).or_default().push(value);
                }
                None => {
                    let out_key = if counter {
                        format!("{key}_rate")
                    } else {
                        key.clone()
                    };
                    record.insert(out_key, value);
                }
            }
        }

        for (base, values) in groups {
            if let Some(summary) = summarize(&values) {
                record.insert(format!("{base}_avg"), summary.avg);
                record.insert(format!("{base}_min"), summary.min);
                record.insert(format!("{base}_max"), summary.max);
                record.insert(format!("{base}_stddev"), summary.stddev);
            }
        }

        record
            .into_iter()
            .map(|(key, value)| (format!("{}_{key}", self.source.prefix), value))
            .collect()
    }

    /// Rate state is scoped per source and, for filtered collection, per
    /// target, so two entities polled from the same endpoint cannot share
    /// counter state.
    fn state_key(&self, filter: Option<&str>, sample_key: &str) -> String {
        match filter {
            Some(target) => format!("{}_{target}_{sample_key}", self.source.name),
            None => format!("{}_{sample_key}", self.source.name),
        }
    }
}
