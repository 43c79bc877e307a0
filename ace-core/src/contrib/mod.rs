//! Built-in components
//!
//! Ready-made descriptors for the common assembly: health, metrics, info
//! and environment components, their contributor interfaces, and the
//! marker-guarded migration status component. Everything here is built on
//! the public engine API; applications with different needs can ignore
//! this module entirely and register their own descriptors.
//!
//! The aggregating components follow one pattern: contributors register
//! under a contributor capability (`health-indicator`,
//! `metrics-contributor`, `info-contributor`) as shared trait objects,
//! and the aggregator's constructor collects whatever activated and
//! merges their outputs, later contributors overriding earlier ones on
//! key collision.

mod env;
mod health;
mod info;
mod metrics;
mod migration;

pub use env::{environment_descriptor, EnvironmentComponent};
pub use health::{
    database_indicator_descriptor, health_aggregator_descriptor, ping_indicator_descriptor,
    ConnectionCheck, DatabaseIndicator, Health, HealthAggregator, HealthIndicator, HealthStatus,
    PingIndicator,
};
pub use info::{
    info_aggregator_descriptor, properties_info_descriptor, vcs_info_descriptor, InfoAggregator,
    InfoContributor, PropertiesInfoContributor, VcsInfoContributor, VcsMetadata,
    VcsMetadataReader, INFO_PROPERTY_PREFIX,
};
pub use metrics::{
    metrics_aggregator_descriptor, system_metrics_descriptor, MetricsAggregator,
    MetricsContributor, RuntimeStats, RuntimeStatsSource, SysinfoStats, SystemMetricsContributor,
};
pub use migration::{
    migration_status_descriptor, MigrationInfoSource, MigrationRecord, MigrationStatus,
};

use crate::catalog::Catalog;
use crate::error::Result;

/// Well-known capability keys
pub mod capability {
    /// Aggregated health report
    pub const HEALTH: &str = "health";
    /// Aggregated metrics mapping
    pub const METRICS: &str = "metrics";
    /// Aggregated info mapping
    pub const INFO: &str = "info";
    /// Environment property view
    pub const ENV: &str = "env";
    /// Migration status
    pub const MIGRATION: &str = "migration";

    /// Health report contributors
    pub const HEALTH_INDICATOR: &str = "health-indicator";
    /// Metrics contributors
    pub const METRICS_CONTRIBUTOR: &str = "metrics-contributor";
    /// Info contributors
    pub const INFO_CONTRIBUTOR: &str = "info-contributor";
}

/// Well-known optional-capability markers
pub mod marker {
    /// Version-control metadata is available
    pub const VCS_METADATA: &str = "vcs-metadata";
    /// A migration library is available
    pub const MIGRATION_LIBRARY: &str = "migration-library";
}

/// Catalog with the standard component set
///
/// Ping indicator, health aggregator, system metrics, metrics aggregator,
/// properties info, info aggregator, and the environment component.
/// Components needing external handles (database checks, VCS readers,
/// migration sources) are registered separately by the application.
pub fn standard_catalog() -> Result<Catalog> {
    let mut catalog = Catalog::new();
    catalog.register_all([
        ping_indicator_descriptor(),
        health_aggregator_descriptor(),
        system_metrics_descriptor(),
        metrics_aggregator_descriptor(),
        properties_info_descriptor(),
        info_aggregator_descriptor(),
        environment_descriptor(),
    ])?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::Resolver;
    use crate::snapshot::EnvSnapshot;

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = standard_catalog().unwrap();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.len(), 7);
    }

    #[test]
    fn test_standard_catalog_resolves() {
        let catalog = standard_catalog().unwrap();
        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        for key in [
            capability::HEALTH,
            capability::METRICS,
            capability::INFO,
            capability::ENV,
        ] {
            assert!(registry.contains(key), "missing capability: {key}");
        }
        assert!(!registry.contains(capability::MIGRATION));
    }
}
