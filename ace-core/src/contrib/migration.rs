//! Migration status component
//!
//! Reports applied schema migrations through an external
//! [`MigrationInfoSource`]. The descriptor is doubly guarded:
//! - it activates only when the migration-library marker is present in
//!   the snapshot (the tool must actually be available), and
//! - it carries the `disable_if_multiple` policy, so two competing
//!   migration sources suppress the capability entirely instead of one
//!   winning arbitrarily.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{CardinalityPolicy, ComponentDescriptor, Condition};
use crate::registry::instance;

use super::{capability, marker};

/// One applied or pending migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Migration version identifier
    pub version: String,
    /// What the migration does
    pub description: String,
    /// Whether it has been applied
    pub applied: bool,
}

/// External interface to a migration tool's bookkeeping
pub trait MigrationInfoSource: Send + Sync {
    /// Known migrations, in application order
    fn migrations(&self) -> Vec<MigrationRecord>;
}

/// Component exposing migration state
pub struct MigrationStatus {
    source: Arc<dyn MigrationInfoSource>,
}

impl MigrationStatus {
    pub fn new(source: Arc<dyn MigrationInfoSource>) -> Self {
        Self { source }
    }

    /// Current migration records from the underlying tool
    pub fn invoke(&self) -> Vec<MigrationRecord> {
        self.source.migrations()
    }
}

/// Descriptor for a migration status component over one source
///
/// `id` distinguishes descriptors when several tools are wired in; they
/// all share the migration capability and suppress each other on
/// ambiguity.
pub fn migration_status_descriptor(
    id: impl Into<String>,
    source: Arc<dyn MigrationInfoSource>,
) -> ComponentDescriptor {
    ComponentDescriptor::new(id, capability::MIGRATION, move |_cx| {
        Ok(instance(MigrationStatus::new(source.clone())))
    })
    .with_condition(Condition::marker_present(marker::MIGRATION_LIBRARY))
    .with_policy(CardinalityPolicy::DisableIfMultiple)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<MigrationRecord>);

    impl MigrationInfoSource for FixedSource {
        fn migrations(&self) -> Vec<MigrationRecord> {
            self.0.clone()
        }
    }

    #[test]
    fn test_status_reports_source_records() {
        let status = MigrationStatus::new(Arc::new(FixedSource(vec![MigrationRecord {
            version: "1".to_string(),
            description: "create schema".to_string(),
            applied: true,
        }])));

        let records = status.invoke();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, "1");
        assert!(records[0].applied);
    }

    #[test]
    fn test_descriptor_is_guarded_and_ambiguity_safe() {
        let descriptor =
            migration_status_descriptor("flyway-status", Arc::new(FixedSource(vec![])));

        assert_eq!(descriptor.capability(), capability::MIGRATION);
        assert_eq!(
            descriptor.policy(),
            CardinalityPolicy::DisableIfMultiple
        );
        assert_eq!(descriptor.conditions().len(), 1);
    }
}
