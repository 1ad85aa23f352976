//! Collector: telemetry normalization and aggregation pipeline.
//!
//! This crate turns heterogeneous runtime telemetry into one flat numeric
//! record per monitored entity per collection cycle.
//!
//! ## Core Types
//!
//! - [`RateConverter`] - stateful counter-to-rate conversion across cycles
//! - [`AggregationRule`] - declarative per-instance metric classification
//! - [`Summary`] - avg/min/max/sample-stddev over an aggregation group
//! - [`PullCollector`] - one polled exposition-format source
//! - [`PushCache`] - latest-value cache fed by per-entity stream listeners
//! - [`Orchestrator`] - the fixed-interval collection loop
//!
//! ## Output
//!
//! - [`Record`] - the merged per-entity, per-cycle key/value record
//! - [`RecordSink`] - the seam the orchestrator writes records through

pub mod classify;
pub mod error;
pub mod flatten;
pub mod orchestrator;
pub mod pull;
pub mod push;
pub mod rate;
pub mod stats;

pub use classify::{
    AggregationRule, CONTAINER_AGGREGATIONS, CONTAINER_COUNTER_METRICS, HOST_AGGREGATIONS,
    HOST_COUNTER_METRICS, classify, is_counter,
};
pub use error::{CollectorError, Result};
pub use flatten::flatten;
pub use orchestrator::{Entity, Orchestrator, OrchestratorConfig, Record, RecordSink};
pub use pull::{CONTAINER_SOURCE, HOST_SOURCE, PullCollector, PullSource};
pub use push::PushCache;
pub use rate::RateConverter;
pub use stats::{Summary, summarize};
