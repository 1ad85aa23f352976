//! Declarative metric classification tables.
//!
//! Two kinds of table, both plain data so new metric families can be added
//! without touching parsing or conversion logic:
//!
//! - counter-name sets: which metrics from a source are counters and need
//!   rate conversion before use;
//! - aggregation rules: which metric families are reported once per resource
//!   instance (per CPU core, per interface, per block device) and should be
//!   collapsed into host-agnostic summary statistics.

use exposition::Sample;

/// Recognizes one family of per-instance metrics.
///
/// A rule matches a sample when the metric name starts with `family` and the
/// label set carries `instance_label`. The group base name is the sample's
/// identity key with the instance label removed; all other labels stay, so
/// e.g. per-mode CPU time remains split by mode while the per-core split is
/// collapsed.
#[derive(Debug, Clone, Copy)]
pub struct AggregationRule {
    /// Metric-name prefix identifying the family.
    pub family: &'static str,
    /// Label distinguishing resource instances within the family.
    pub instance_label: &'static str,
}

/// Counter metrics exposed by the container-level source.
pub const CONTAINER_COUNTER_METRICS: &[&str] = &[
    "container_cpu_usage_seconds_total",
    "container_cpu_user_seconds_total",
    "container_cpu_system_seconds_total",
    "container_network_receive_bytes_total",
    "container_network_transmit_bytes_total",
    "container_network_receive_packets_total",
    "container_network_transmit_packets_total",
    "container_network_receive_errors_total",
    "container_network_transmit_errors_total",
    "container_network_receive_packets_dropped_total",
    "container_network_transmit_packets_dropped_total",
    "container_fs_reads_total",
    "container_fs_writes_total",
    "container_fs_read_seconds_total",
    "container_fs_write_seconds_total",
    "container_fs_reads_bytes_total",
    "container_fs_writes_bytes_total",
    "container_blkio_device_usage_total",
];

/// Counter metrics exposed by the host-level source.
pub const HOST_COUNTER_METRICS: &[&str] = &[
    "node_cpu_seconds_total",
    "node_disk_read_bytes_total",
    "node_disk_written_bytes_total",
    "node_disk_reads_completed_total",
    "node_disk_writes_completed_total",
    "node_disk_read_time_seconds_total",
    "node_disk_write_time_seconds_total",
    "node_network_receive_bytes_total",
    "node_network_transmit_bytes_total",
    "node_network_receive_packets_total",
    "node_network_transmit_packets_total",
    "node_network_receive_errs_total",
    "node_network_transmit_errs_total",
    "node_network_receive_drop_total",
    "node_network_transmit_drop_total",
    "node_context_switches_total",
    "node_intr_total",
    "node_forks_total",
    "node_softnet_dropped_total",
    "node_softnet_processed_total",
    "node_vmstat_pgfault",
    "node_vmstat_pgmajfault",
    "node_vmstat_pgpgin",
    "node_vmstat_pgpgout",
];

/// Per-instance families of the container-level source, first match wins.
pub const CONTAINER_AGGREGATIONS: &[AggregationRule] = &[
    AggregationRule {
        family: "container_cpu_",
        instance_label: "cpu",
    },
    AggregationRule {
        family: "container_network_",
        instance_label: "interface",
    },
    AggregationRule {
        family: "container_fs_",
        instance_label: "device",
    },
    AggregationRule {
        family: "container_blkio_",
        instance_label: "device",
    },
];

/// Per-instance families of the host-level source, first match wins.
pub const HOST_AGGREGATIONS: &[AggregationRule] = &[
    AggregationRule {
        family: "node_cpu_",
        instance_label: "cpu",
    },
    AggregationRule {
        family: "node_softnet_",
        instance_label: "cpu",
    },
    AggregationRule {
        family: "node_network_",
        instance_label: "device",
    },
    AggregationRule {
        family: "node_disk_",
        instance_label: "device",
    },
];

/// Whether a sample identity key belongs to a known counter metric.
///
/// Prefix match: labelled counters render their label set after the raw name.
pub fn is_counter(key: &str, counters: &[&str]) -> bool {
    counters.iter().any(|counter| key.starts_with(counter))
}

/// Classify a sample against an ordered rule table.
///
/// Returns the aggregation-group base name for the first matching rule, or
/// `None` when the sample should be emitted individually.
pub fn classify(sample: &Sample, rules: &[AggregationRule]) -> Option<String> {
    rules
        .iter()
        .find(|rule| {
            sample.name.starts_with(rule.family) && sample.labels.contains_key(rule.instance_label)
        })
        .map(|rule| sample.key_without_label(rule.instance_label))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_sample(core: &str, mode: &str) -> Sample {
        let mut sample = Sample::new("node_cpu_seconds_total", 1.0);
        sample.insert_label("cpu", core);
        sample.insert_label("mode", mode);
        sample
    }

    #[test]
    fn test_per_core_samples_share_a_base_name() {
        let a = classify(&cpu_sample("0", "idle"), HOST_AGGREGATIONS).unwrap();
        let b = classify(&cpu_sample("1", "idle"), HOST_AGGREGATIONS).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "node_cpu_seconds_total{mode=\"idle\"}");
    }

    #[test]
    fn test_other_labels_keep_groups_apart() {
        let idle = classify(&cpu_sample("0", "idle"), HOST_AGGREGATIONS).unwrap();
        let user = classify(&cpu_sample("0", "user"), HOST_AGGREGATIONS).unwrap();
        assert_ne!(idle, user);
    }

    #[test]
    fn test_family_match_requires_instance_label() {
        // Same name family but no core label: emitted individually.
        let sample = Sample::new("node_cpu_seconds_total", 1.0);
        assert_eq!(classify(&sample, HOST_AGGREGATIONS), None);
    }

    #[test]
    fn test_unmatched_sample_is_unaggregated() {
        let mut sample = Sample::new("node_memory_MemTotal_bytes", 1.0);
        sample.insert_label("device", "dimm0");
        assert_eq!(classify(&sample, HOST_AGGREGATIONS), None);
    }

    #[test]
    fn test_container_interface_rule() {
        let mut sample = Sample::new("container_network_receive_bytes_total", 1.0);
        sample.insert_label("interface", "eth0");
        sample.insert_label("name", "nf0");
        let base = classify(&sample, CONTAINER_AGGREGATIONS).unwrap();
        assert_eq!(
            base,
            "container_network_receive_bytes_total{name=\"nf0\"}"
        );
    }

    #[test]
    fn test_counter_prefix_match_on_labelled_key() {
        let sample = cpu_sample("0", "idle");
        assert!(is_counter(&sample.key(), HOST_COUNTER_METRICS));
        assert!(!is_counter("node_load1", HOST_COUNTER_METRICS));
    }
}
