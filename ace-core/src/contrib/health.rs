//! Health components
//!
//! Health is reported by any number of [`HealthIndicator`]s, each
//! contributing a named [`Health`] value. The [`HealthAggregator`] is
//! itself a resolved component: its constructor collects every indicator
//! registered so far and merges their reports into one, worst status
//! wins, later indicators overriding earlier ones on name collision.
//!
//! Indicators must not probe anything at construction time; probing
//! happens when `health()` is called.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{CardinalityPolicy, ComponentDescriptor};
use crate::registry::instance;

use super::capability;

/// Overall state reported by an indicator or an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Up,
    Unknown,
    OutOfService,
    Down,
}

impl HealthStatus {
    /// Ordering for worst-wins aggregation (higher is worse)
    fn severity(self) -> u8 {
        match self {
            HealthStatus::Up => 0,
            HealthStatus::Unknown => 1,
            HealthStatus::OutOfService => 2,
            HealthStatus::Down => 3,
        }
    }

    /// The worse of two statuses
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Up => write!(f, "up"),
            HealthStatus::Unknown => write!(f, "unknown"),
            HealthStatus::OutOfService => write!(f, "out_of_service"),
            HealthStatus::Down => write!(f, "down"),
        }
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(HealthStatus::Up),
            "unknown" => Ok(HealthStatus::Unknown),
            "out_of_service" => Ok(HealthStatus::OutOfService),
            "down" => Ok(HealthStatus::Down),
            _ => Err(format!("Unknown health status: {s}")),
        }
    }
}

/// A status with supporting details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Reported status
    pub status: HealthStatus,

    /// Supporting details keyed by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

impl Health {
    /// Healthy
    pub fn up() -> Self {
        Self::with_status(HealthStatus::Up)
    }

    /// Unhealthy
    pub fn down() -> Self {
        Self::with_status(HealthStatus::Down)
    }

    /// Deliberately taken out of service
    pub fn out_of_service() -> Self {
        Self::with_status(HealthStatus::OutOfService)
    }

    /// State could not be determined
    pub fn unknown() -> Self {
        Self::with_status(HealthStatus::Unknown)
    }

    fn with_status(status: HealthStatus) -> Self {
        Self {
            status,
            details: BTreeMap::new(),
        }
    }

    /// Attach a detail entry
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// A named source of health information
pub trait HealthIndicator: Send + Sync {
    /// Name used as the detail key in the aggregate
    fn name(&self) -> &str;

    /// Current health; may probe external resources
    fn health(&self) -> Health;
}

/// Default indicator: always up
///
/// Keeps the health capability meaningful when nothing else contributes.
#[derive(Debug, Default)]
pub struct PingIndicator;

impl HealthIndicator for PingIndicator {
    fn name(&self) -> &str {
        "ping"
    }

    fn health(&self) -> Health {
        Health::up()
    }
}

/// External interface for checking a database connection
///
/// The engine never opens connections itself; the embedding application
/// supplies a checker and the indicator probes it lazily.
pub trait ConnectionCheck: Send + Sync {
    /// Name of the database product or pool
    fn database(&self) -> String;

    /// Validate the connection, returning a reason on failure
    fn validate(&self) -> std::result::Result<(), String>;
}

/// Health indicator backed by a database connection check
pub struct DatabaseIndicator {
    check: Arc<dyn ConnectionCheck>,
}

impl DatabaseIndicator {
    pub fn new(check: Arc<dyn ConnectionCheck>) -> Self {
        Self { check }
    }
}

impl HealthIndicator for DatabaseIndicator {
    fn name(&self) -> &str {
        "db"
    }

    fn health(&self) -> Health {
        match self.check.validate() {
            Ok(()) => Health::up().with_detail("database", self.check.database()),
            Err(reason) => Health::down()
                .with_detail("database", self.check.database())
                .with_detail("error", reason),
        }
    }
}

/// Aggregates every registered health indicator into one report
pub struct HealthAggregator {
    indicators: Vec<Arc<dyn HealthIndicator>>,
}

impl HealthAggregator {
    pub fn new(indicators: Vec<Arc<dyn HealthIndicator>>) -> Self {
        Self { indicators }
    }

    /// Number of contributing indicators
    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    /// Merge all indicator reports
    ///
    /// The aggregate status is the worst individual status; each
    /// indicator's report appears under its name, later registrations
    /// overriding earlier ones on collision.
    pub fn invoke(&self) -> Health {
        let mut status = HealthStatus::Up;
        let mut details = BTreeMap::new();

        for indicator in &self.indicators {
            let health = indicator.health();
            status = status.worst(health.status);
            let value = serde_json::to_value(&health).unwrap_or(Value::Null);
            details.insert(indicator.name().to_string(), value);
        }

        Health { status, details }
    }
}

/// Descriptor for the default ping indicator
pub fn ping_indicator_descriptor() -> ComponentDescriptor {
    ComponentDescriptor::new("ping-indicator", capability::HEALTH_INDICATOR, |_cx| {
        Ok(instance::<Arc<dyn HealthIndicator>>(Arc::new(PingIndicator)))
    })
    .with_policy(CardinalityPolicy::AllowMultiple)
}

/// Descriptor for a database-backed indicator over an external checker
pub fn database_indicator_descriptor(check: Arc<dyn ConnectionCheck>) -> ComponentDescriptor {
    ComponentDescriptor::new("db-indicator", capability::HEALTH_INDICATOR, move |_cx| {
        Ok(instance::<Arc<dyn HealthIndicator>>(Arc::new(
            DatabaseIndicator::new(check.clone()),
        )))
    })
    .with_policy(CardinalityPolicy::AllowMultiple)
}

/// Descriptor for the health aggregator component
pub fn health_aggregator_descriptor() -> ComponentDescriptor {
    ComponentDescriptor::new("health", capability::HEALTH, |cx| {
        let indicators = cx.collect_all::<Arc<dyn HealthIndicator>>(capability::HEALTH_INDICATOR);
        Ok(instance(HealthAggregator::new(indicators)))
    })
    .with_after(capability::HEALTH_INDICATOR)
}
