//! Metrics components
//!
//! Any number of [`MetricsContributor`]s supply named metric values; the
//! [`MetricsAggregator`] merges them into one mapping, later contributors
//! overriding earlier ones on key collision. The built-in
//! [`SystemMetricsContributor`] reports process-level memory figures from
//! a [`RuntimeStatsSource`], by default backed by `sysinfo`.
//!
//! Sampling happens when `metrics()` is called, never at construction.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::System;

use crate::catalog::{CardinalityPolicy, ComponentDescriptor};
use crate::registry::instance;

use super::capability;

/// A named source of metric values
pub trait MetricsContributor: Send + Sync {
    /// Metric name -> value
    fn metrics(&self) -> BTreeMap<String, Value>;
}

/// A point-in-time memory sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStats {
    /// Total memory in bytes
    pub total_memory: u64,
    /// Free memory in bytes
    pub free_memory: u64,
    /// Used memory in bytes
    pub used_memory: u64,
}

/// External interface for sampling runtime statistics
pub trait RuntimeStatsSource: Send + Sync {
    fn sample(&self) -> RuntimeStats;
}

/// Default stats source backed by `sysinfo`
pub struct SysinfoStats {
    system: Mutex<System>,
}

impl SysinfoStats {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeStatsSource for SysinfoStats {
    fn sample(&self) -> RuntimeStats {
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        system.refresh_memory();
        RuntimeStats {
            total_memory: system.total_memory(),
            free_memory: system.free_memory(),
            used_memory: system.used_memory(),
        }
    }
}

/// Built-in contributor for system memory metrics
///
/// Keys: `mem`, `mem.free`, `heap.used`.
pub struct SystemMetricsContributor {
    source: Arc<dyn RuntimeStatsSource>,
}

impl SystemMetricsContributor {
    /// Contributor over the default `sysinfo` source
    pub fn new() -> Self {
        Self::with_source(Arc::new(SysinfoStats::new()))
    }

    /// Contributor over a custom stats source
    pub fn with_source(source: Arc<dyn RuntimeStatsSource>) -> Self {
        Self { source }
    }
}

impl Default for SystemMetricsContributor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsContributor for SystemMetricsContributor {
    fn metrics(&self) -> BTreeMap<String, Value> {
        let stats = self.source.sample();
        BTreeMap::from([
            ("mem".to_string(), Value::from(stats.total_memory)),
            ("mem.free".to_string(), Value::from(stats.free_memory)),
            ("heap.used".to_string(), Value::from(stats.used_memory)),
        ])
    }
}

/// Aggregates every registered metrics contributor into one mapping
pub struct MetricsAggregator {
    contributors: Vec<Arc<dyn MetricsContributor>>,
}

impl MetricsAggregator {
    pub fn new(contributors: Vec<Arc<dyn MetricsContributor>>) -> Self {
        Self { contributors }
    }

    /// Number of contributing sources
    pub fn contributor_count(&self) -> usize {
        self.contributors.len()
    }

    /// Merge all contributors, later keys overriding earlier ones
    pub fn invoke(&self) -> BTreeMap<String, Value> {
        let mut merged = BTreeMap::new();
        for contributor in &self.contributors {
            merged.extend(contributor.metrics());
        }
        merged
    }
}

/// Descriptor for the built-in system metrics contributor
pub fn system_metrics_descriptor() -> ComponentDescriptor {
    ComponentDescriptor::new(
        "system-metrics",
        capability::METRICS_CONTRIBUTOR,
        |_cx| {
            Ok(instance::<Arc<dyn MetricsContributor>>(Arc::new(
                SystemMetricsContributor::new(),
            )))
        },
    )
    .with_policy(CardinalityPolicy::AllowMultiple)
}

/// Descriptor for the metrics aggregator component
pub fn metrics_aggregator_descriptor() -> ComponentDescriptor {
    ComponentDescriptor::new("metrics", capability::METRICS, |cx| {
        let contributors =
            cx.collect_all::<Arc<dyn MetricsContributor>>(capability::METRICS_CONTRIBUTOR);
        Ok(instance(MetricsAggregator::new(contributors)))
    })
    .with_after(capability::METRICS_CONTRIBUTOR)
}
