//! The fixed-interval collection loop.
//!
//! Once per tick: capture the cycle timestamp, poll the host-level source
//! once, then per entity poll the container-level source, snapshot the push
//! cache, merge everything into one flat record and hand it to the sink.
//! Sleep is drift-corrected so the period stays stable regardless of
//! per-cycle processing cost.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;
use crate::flatten::flatten;
use crate::pull::PullCollector;
use crate::push::PushCache;

/// Prefix applied to every flattened push-stream key.
const PUSH_PREFIX: &str = "nf";

/// Cycles between progress log lines.
const PROGRESS_EVERY: u64 = 60;

/// How long to wait for a push listener to close its stream at shutdown.
const LISTENER_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// One monitored network-function instance. Statically configured at
/// startup; immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Output name; also the push-cache key and log file stem.
    pub name: String,
    /// Container identifier used to filter container-level samples.
    pub container: String,
    /// Streaming endpoint URL (`ws://...`).
    pub stream_url: String,
}

/// The merged per-entity, per-cycle record. Sorted keys so downstream column
/// ordering is deterministic.
pub type Record = BTreeMap<String, Value>;

/// Destination for merged records; one log per entity behind the seam.
pub trait RecordSink {
    /// Append one record for an entity. An empty record may be skipped.
    fn write(&mut self, entity: &str, timestamp: DateTime<Utc>, record: &Record) -> Result<()>;

    /// Flush and close all underlying logs.
    fn close(&mut self) -> Result<()>;
}

/// Loop pacing and scope knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Target collection period.
    pub interval: Duration,
    /// Optional total run budget; the loop drains once it is exceeded.
    pub duration: Option<Duration>,
    /// Whether the host-level source is polled at all.
    pub collect_host: bool,
}

/// Owns the whole collection run: both pull collectors, the push cache with
/// its listeners, the entity list and the record sink.
pub struct Orchestrator<S: RecordSink> {
    container: PullCollector,
    host: PullCollector,
    cache: PushCache,
    entities: Vec<Entity>,
    sink: S,
    config: OrchestratorConfig,
    token: CancellationToken,
}

impl<S: RecordSink> Orchestrator<S> {
    pub fn new(
        container: PullCollector,
        host: PullCollector,
        entities: Vec<Entity>,
        sink: S,
        config: OrchestratorConfig,
        token: CancellationToken,
    ) -> Self {
        Self {
            container,
            host,
            cache: PushCache::new(),
            entities,
            sink,
            config,
            token,
        }
    }

    /// Run until the stop token fires or the duration budget is exceeded.
    /// Listeners are stopped and the sink closed before returning.
    pub async fn run(mut self) -> Result<()> {
        let listeners: Vec<JoinHandle<()>> = self
            .entities
            .iter()
            .map(|entity| {
                self.cache.spawn_listener(
                    entity.name.clone(),
                    entity.stream_url.clone(),
                    self.token.clone(),
                )
            })
            .collect();

        let start = Instant::now();
        let mut cycles: u64 = 0;

        while !self.token.is_cancelled() {
            let tick = Instant::now();
            let now = Utc::now();
            let unix = now.timestamp_micros() as f64 / 1e6;

            // Host metrics are machine-wide; fetch once and share across
            // all entities this cycle.
            let host_metrics = if self.config.collect_host {
                self.host.collect(None, unix).await
            } else {
                Default::default()
            };

            for entity in &self.entities {
                let container_metrics = self.container.collect(Some(&entity.container), unix).await;

                let mut record = Record::new();
                for (key, value) in container_metrics {
                    record.insert(key, value.into());
                }
                for (key, value) in &host_metrics {
                    record.insert(key.clone(), (*value).into());
                }
                if let Some(payload) = self.cache.get(&entity.name) {
                    for (key, value) in flatten(&payload) {
                        record.insert(format!("{PUSH_PREFIX}_{key}"), value);
                    }
                }

                self.sink.write(&entity.name, now, &record)?;
            }

            cycles += 1;
            if cycles % PROGRESS_EVERY == 0 {
                info!("collected {cycles} cycles");
            }

            if let Some(budget) = self.config.duration
                && start.elapsed() >= budget
            {
                info!("duration budget reached ({budget:?}), stopping");
                break;
            }

            // Drift correction: sleep only for what is left of the period.
            if let Some(remaining) = self.config.interval.checked_sub(tick.elapsed()) {
                tokio::select! {
                    _ = self.token.cancelled() => break,
                    _ = tokio::time::sleep(remaining) => {}
                }
            }
        }

        self.token.cancel();
        // Give each listener a chance to close its stream cleanly; only
        // abort the ones that do not stop in time.
        for mut listener in listeners {
            if tokio::time::timeout(LISTENER_STOP_TIMEOUT, &mut listener)
                .await
                .is_err()
            {
                warn!("push listener did not stop in time, aborting");
                listener.abort();
            }
        }
        self.sink.close()?;
        info!("collection complete after {cycles} cycles");
        Ok(())
    }
}
