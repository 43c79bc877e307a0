//! Assembly: the resolution engine
//!
//! Turns a catalog of conditional descriptors plus an environment snapshot
//! into a frozen registry:
//!
//! 1. Order descriptors by dependency (declaration order breaks ties)
//! 2. Evaluate each descriptor's conditions against the snapshot and the
//!    registry built so far
//! 3. Construct eligible components with their resolved dependencies
//! 4. Apply cardinality policies; ambiguous `disable_if_multiple` keys
//!    suppress all their candidates
//! 5. Freeze the registry together with a per-descriptor outcome report
//!
//! The pass is synchronous and single-threaded; it either completes or
//! fails with one descriptive error. There is no partial-success mode.

mod plan;
mod report;
mod resolver;

pub use report::{DescriptorState, ReportEntry, ResolutionReport};
pub use resolver::Resolver;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ComponentDescriptor, Condition};
    use crate::registry::instance;
    use crate::snapshot::EnvSnapshot;

    #[test]
    fn test_pass_over_mixed_outcomes() {
        let mut catalog = Catalog::new();
        catalog
            .register(ComponentDescriptor::new("always", "base", |_cx| {
                Ok(instance("base".to_string()))
            }))
            .unwrap();
        catalog
            .register(
                ComponentDescriptor::new("needs-marker", "extra", |_cx| {
                    Ok(instance("extra".to_string()))
                })
                .with_condition(Condition::marker_present("lib")),
            )
            .unwrap();
        catalog
            .register(
                ComponentDescriptor::new("stacked", "stacked", |cx| {
                    let base: std::sync::Arc<String> = cx.get_as("base").ok_or_else(|| {
                        crate::AceError::CapabilityNotFound {
                            capability: "base".to_string(),
                        }
                    })?;
                    Ok(instance(format!("{base}+stacked")))
                })
                .with_requires("base"),
            )
            .unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        assert!(registry.contains("base"));
        assert!(!registry.contains("extra"));
        let stacked = registry.get_as::<String>("stacked").unwrap();
        assert_eq!(*stacked, "base+stacked");
        assert_eq!(registry.report().entries().len(), 3);
    }
}
