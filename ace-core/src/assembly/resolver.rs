//! The resolution pass
//!
//! A pass takes a catalog and an environment snapshot and produces a
//! frozen registry. Descriptors move through a small state machine:
//!
//! ```text
//! Pending -> ConditionsUnmet                      (skipped, terminal)
//! Pending -> Candidate -> Active                  (registered, terminal)
//! Pending -> Candidate -> Suppressed              (ambiguity, terminal)
//! ```
//!
//! Conditions are evaluated against the snapshot and the registry built so
//! far; a condition that cannot be evaluated is logged and treated as not
//! met. A failing constructor aborts the whole pass; a partial registry
//! is never returned.
//!
//! Ambiguity suppression: candidates for a `disable_if_multiple`
//! capability are held back until every provider of that key has been
//! processed. Exactly one candidate is then activated; two or more are all
//! demoted to `Suppressed` and the key resolves to absent. Consumers are
//! ordered after providers, so the counts they observe are always
//! post-finalization.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::catalog::{CardinalityPolicy, Catalog, ComponentDescriptor};
use crate::error::{AceError, Result};
use crate::registry::{BuildContext, ComponentHandle, ComponentInstance, ComponentSet, Registry};
use crate::snapshot::EnvSnapshot;

use super::plan::AssemblyPlan;
use super::report::{DescriptorState, ReportEntry, ResolutionReport};

/// The resolution engine
///
/// Stateless between passes: every call to [`Resolver::resolve`] operates
/// only on its arguments, so concurrent passes over separate snapshots
/// share nothing.
#[derive(Debug, Default)]
pub struct Resolver;

impl Resolver {
    /// Create a resolver
    pub fn new() -> Self {
        Self
    }

    /// Run one resolution pass
    ///
    /// Returns the frozen registry, or the first fatal error (invalid
    /// catalog, dependency cycle, singleton conflict, constructor
    /// failure). Repeated passes over an identical snapshot yield an
    /// identical registry.
    pub fn resolve(&self, catalog: &Catalog, snapshot: &EnvSnapshot) -> Result<Registry> {
        catalog.validate().map_err(|errors| AceError::InvalidCatalog {
            reason: errors.join("; "),
        })?;

        let plan = AssemblyPlan::build(catalog)?;
        let descriptors = catalog.descriptors();

        let mut states = vec![DescriptorState::Pending; descriptors.len()];
        let mut details: Vec<Option<String>> = vec![None; descriptors.len()];
        let mut components = ComponentSet::new();

        // Candidates awaiting ambiguity finalization, per capability
        let mut deferred: HashMap<&str, Vec<(usize, ComponentInstance)>> = HashMap::new();
        // Unprocessed providers per capability; a key finalizes at zero
        let mut remaining: HashMap<&str, usize> = HashMap::new();
        for descriptor in descriptors {
            *remaining.entry(descriptor.capability()).or_insert(0) += 1;
        }

        for &idx in &plan.order {
            let descriptor = &descriptors[idx];
            let outcome = self.evaluate_descriptor(descriptor, snapshot, &components);

            match outcome {
                Eligibility::Unmet(reason) => {
                    debug!(
                        descriptor = descriptor.id(),
                        capability = descriptor.capability(),
                        %reason,
                        "descriptor skipped"
                    );
                    states[idx] = DescriptorState::ConditionsUnmet;
                    details[idx] = Some(reason);
                }
                Eligibility::Eligible => {
                    states[idx] = DescriptorState::Candidate;
                    let cx = BuildContext::new(snapshot, &components);
                    let instance =
                        descriptor
                            .construct(&cx)
                            .map_err(|err| AceError::ConstructorError {
                                descriptor_id: descriptor.id().to_string(),
                                reason: err.to_string(),
                            })?;

                    match descriptor.policy() {
                        CardinalityPolicy::Singleton => {
                            if let Some(existing) = components.get(descriptor.capability()) {
                                return Err(AceError::CardinalityViolation {
                                    capability: descriptor.capability().to_string(),
                                    first: existing.descriptor_id().to_string(),
                                    second: descriptor.id().to_string(),
                                });
                            }
                            self.activate(descriptor, instance, &mut components);
                            states[idx] = DescriptorState::Active;
                        }
                        CardinalityPolicy::AllowMultiple => {
                            self.activate(descriptor, instance, &mut components);
                            states[idx] = DescriptorState::Active;
                        }
                        CardinalityPolicy::DisableIfMultiple => {
                            deferred
                                .entry(descriptor.capability())
                                .or_default()
                                .push((idx, instance));
                        }
                    }
                }
            }

            // This descriptor's capability has one fewer pending provider;
            // finalize deferred candidates once the last one is processed.
            let capability = descriptor.capability();
            if let Some(left) = remaining.get_mut(capability) {
                *left -= 1;
                if *left == 0 {
                    self.finalize_capability(
                        capability,
                        descriptors,
                        &mut deferred,
                        &mut components,
                        &mut states,
                        &mut details,
                    );
                }
            }
        }

        let entries = descriptors
            .iter()
            .enumerate()
            .map(|(idx, descriptor)| ReportEntry {
                descriptor_id: descriptor.id().to_string(),
                capability: descriptor.capability().to_string(),
                state: states[idx],
                detail: details[idx].take(),
            })
            .collect();
        let report = ResolutionReport::new(entries);
        debug!(pass_id = %report.pass_id, "resolution pass complete: {}", report.summary());

        Ok(Registry::new(components, report))
    }

    /// Evaluate a descriptor's conditions and hard dependencies
    fn evaluate_descriptor(
        &self,
        descriptor: &ComponentDescriptor,
        snapshot: &EnvSnapshot,
        components: &ComponentSet,
    ) -> Eligibility {
        let cx = BuildContext::new(snapshot, components);

        for condition in descriptor.conditions() {
            match condition.evaluate(&cx) {
                Ok(true) => {}
                Ok(false) => {
                    return Eligibility::Unmet(format!("condition not met: {condition}"));
                }
                Err(err) => {
                    warn!(
                        descriptor = descriptor.id(),
                        %condition,
                        error = %err,
                        "condition failed to evaluate; treating as not met"
                    );
                    return Eligibility::Unmet(format!(
                        "condition could not be evaluated ({err}); treated as not met"
                    ));
                }
            }
        }

        for required in descriptor.requires() {
            if cx.count(required) == 0 {
                return Eligibility::Unmet(format!(
                    "required capability '{required}' is not resolved"
                ));
            }
        }

        Eligibility::Eligible
    }

    fn activate(
        &self,
        descriptor: &ComponentDescriptor,
        instance: ComponentInstance,
        components: &mut ComponentSet,
    ) {
        debug!(
            descriptor = descriptor.id(),
            capability = descriptor.capability(),
            "component activated"
        );
        components.insert(ComponentHandle::new(
            descriptor.capability(),
            descriptor.id(),
            instance,
        ));
    }

    /// Promote or suppress deferred candidates for a fully-processed key
    fn finalize_capability(
        &self,
        capability: &str,
        descriptors: &[ComponentDescriptor],
        deferred: &mut HashMap<&str, Vec<(usize, ComponentInstance)>>,
        components: &mut ComponentSet,
        states: &mut [DescriptorState],
        details: &mut [Option<String>],
    ) {
        let Some(mut candidates) = deferred.remove(capability) else {
            return;
        };

        if candidates.len() == 1 {
            if let Some((idx, instance)) = candidates.pop() {
                self.activate(&descriptors[idx], instance, components);
                states[idx] = DescriptorState::Active;
            }
            return;
        }

        let competitors: Vec<&str> = candidates
            .iter()
            .map(|(idx, _)| descriptors[*idx].id())
            .collect();
        debug!(
            capability,
            candidates = ?competitors,
            "ambiguous capability suppressed"
        );
        let reason = format!(
            "suppressed: {} candidates for capability '{}' ({})",
            candidates.len(),
            capability,
            competitors.join(", ")
        );
        for (idx, _instance) in candidates {
            states[idx] = DescriptorState::Suppressed;
            details[idx] = Some(reason.clone());
        }
    }
}

enum Eligibility {
    Eligible,
    Unmet(String),
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::catalog::Condition;
    use crate::registry::instance;

    fn simple(id: &str, capability: &str) -> ComponentDescriptor {
        let label = id.to_string();
        ComponentDescriptor::new(id, capability, move |_cx| Ok(instance(label.clone())))
    }

    #[test]
    fn test_unconditional_descriptor_activates() {
        let mut catalog = Catalog::new();
        catalog.register(simple("ping", "health")).unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        assert!(registry.contains("health"));
        assert_eq!(registry.state_of("ping"), Some(DescriptorState::Active));
    }

    #[test]
    fn test_false_condition_skips_without_error() {
        let mut catalog = Catalog::new();
        catalog
            .register(simple("guarded", "cap").with_condition(Condition::marker_present("lib")))
            .unwrap();
        catalog.register(simple("plain", "other")).unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        assert!(!registry.contains("cap"));
        assert!(registry.contains("other"));
        assert_eq!(
            registry.state_of("guarded"),
            Some(DescriptorState::ConditionsUnmet)
        );
        let detail = registry.report().entry("guarded").unwrap().detail.clone();
        assert!(detail.unwrap().contains("condition not met"));
    }

    #[test]
    fn test_malformed_condition_fails_closed() {
        let mut catalog = Catalog::new();
        catalog
            .register(simple("broken", "cap").with_condition(Condition::property_present("")))
            .unwrap();
        catalog.register(simple("plain", "other")).unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        assert!(!registry.contains("cap"));
        assert!(registry.contains("other"));
        let detail = registry.report().entry("broken").unwrap().detail.clone();
        assert!(detail.unwrap().contains("could not be evaluated"));
    }

    #[test]
    fn test_missing_hard_requirement_skips() {
        let mut catalog = Catalog::new();
        catalog
            .register(simple("consumer", "cap").with_requires("datasource"))
            .unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        assert!(!registry.contains("cap"));
        let detail = registry.report().entry("consumer").unwrap().detail.clone();
        assert!(detail.unwrap().contains("datasource"));
    }

    #[test]
    fn test_hard_requirement_satisfied_in_order() {
        let mut catalog = Catalog::new();
        // Declared consumer-first; ordering must still build provider first
        catalog
            .register(simple("consumer", "cap").with_requires("datasource"))
            .unwrap();
        catalog.register(simple("ds", "datasource")).unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        assert!(registry.contains("cap"));
        assert!(registry.contains("datasource"));
    }

    #[test]
    fn test_singleton_conflict_is_fatal() {
        let mut catalog = Catalog::new();
        catalog.register(simple("first", "exclusive")).unwrap();
        catalog.register(simple("second", "exclusive")).unwrap();

        let err = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap_err();

        assert_eq!(err.error_code(), "CARDINALITY_VIOLATION");
        let msg = err.to_string();
        assert!(msg.contains("first") && msg.contains("second"));
    }

    #[test]
    fn test_conditional_singletons_do_not_conflict() {
        let mut catalog = Catalog::new();
        catalog
            .register(simple("primary", "exclusive").with_condition(Condition::property_equals(
                "mode", "primary",
            )))
            .unwrap();
        catalog
            .register(simple("fallback", "exclusive").with_condition(Condition::property_equals(
                "mode", "fallback",
            )))
            .unwrap();

        let snapshot = EnvSnapshot::builder().with_property("mode", "primary").build();
        let registry = Resolver::new().resolve(&catalog, &snapshot).unwrap();

        assert_eq!(registry.count("exclusive"), 1);
        assert_eq!(
            registry.get("exclusive").unwrap().descriptor_id(),
            "primary"
        );
    }

    #[test]
    fn test_disable_if_multiple_single_candidate_activates() {
        let mut catalog = Catalog::new();
        catalog
            .register(
                simple("only", "migration").with_policy(CardinalityPolicy::DisableIfMultiple),
            )
            .unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        assert_eq!(registry.get_all("migration").len(), 1);
        assert_eq!(registry.state_of("only"), Some(DescriptorState::Active));
    }

    #[test]
    fn test_disable_if_multiple_suppresses_all_candidates() {
        let mut catalog = Catalog::new();
        catalog
            .register(simple("one", "migration").with_policy(CardinalityPolicy::DisableIfMultiple))
            .unwrap();
        catalog
            .register(simple("two", "migration").with_policy(CardinalityPolicy::DisableIfMultiple))
            .unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        assert!(registry.get_all("migration").is_empty());
        assert_eq!(registry.state_of("one"), Some(DescriptorState::Suppressed));
        assert_eq!(registry.state_of("two"), Some(DescriptorState::Suppressed));
        let detail = registry.report().entry("one").unwrap().detail.clone();
        assert!(detail.unwrap().contains("2 candidates"));
    }

    #[test]
    fn test_consumer_observes_post_suppression_count() {
        let mut catalog = Catalog::new();
        catalog
            .register(simple("one", "migration").with_policy(CardinalityPolicy::DisableIfMultiple))
            .unwrap();
        catalog
            .register(simple("two", "migration").with_policy(CardinalityPolicy::DisableIfMultiple))
            .unwrap();
        // Counts the suppressed key: must see zero instances
        catalog
            .register(
                simple("watcher", "watcher")
                    .with_condition(Condition::capability_count("migration", 0)),
            )
            .unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        assert!(registry.contains("watcher"));
    }

    #[test]
    fn test_constructor_failure_aborts_pass() {
        let mut catalog = Catalog::new();
        catalog.register(simple("ok", "first")).unwrap();
        catalog
            .register(ComponentDescriptor::new("boom", "second", |_cx| {
                Err(AceError::ConstructorError {
                    descriptor_id: "boom".to_string(),
                    reason: "refused".to_string(),
                })
            }))
            .unwrap();

        let err = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap_err();

        assert_eq!(err.error_code(), "CONSTRUCTOR_ERROR");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_cycle_detected_before_construction() {
        let constructed = Arc::new(AtomicUsize::new(0));

        let mut catalog = Catalog::new();
        for (id, capability, requires) in
            [("a", "cap-a", "cap-b"), ("b", "cap-b", "cap-a")]
        {
            let counter = constructed.clone();
            catalog
                .register(
                    ComponentDescriptor::new(id, capability, move |_cx| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(instance(()))
                    })
                    .with_requires(requires),
                )
                .unwrap();
        }

        let err = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap_err();

        assert_eq!(err.error_code(), "CYCLIC_DEPENDENCY");
        assert_eq!(constructed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_catalog_rejected() {
        let mut catalog = Catalog::new();
        catalog.register(simple("", "cap")).unwrap();

        let err = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap_err();

        assert_eq!(err.error_code(), "INVALID_CATALOG");
    }

    #[test]
    fn test_repeated_passes_are_identical() {
        let mut catalog = Catalog::new();
        catalog.register(simple("ping", "health-indicator")).unwrap();
        catalog
            .register(simple("aggregator", "health").with_after("health-indicator"))
            .unwrap();
        catalog
            .register(simple("guarded", "cap").with_condition(Condition::marker_present("lib")))
            .unwrap();

        let snapshot = EnvSnapshot::builder().with_marker("lib").build();
        let resolver = Resolver::new();

        let first = resolver.resolve(&catalog, &snapshot).unwrap();
        let second = resolver.resolve(&catalog, &snapshot).unwrap();

        assert_eq!(first.capabilities(), second.capabilities());
        for capability in first.capabilities() {
            let lhs: Vec<&str> = first
                .get_all(capability)
                .iter()
                .map(|h| h.descriptor_id())
                .collect();
            let rhs: Vec<&str> = second
                .get_all(capability)
                .iter()
                .map(|h| h.descriptor_id())
                .collect();
            assert_eq!(lhs, rhs);
        }
    }

    #[test]
    fn test_report_has_entry_per_descriptor() {
        let mut catalog = Catalog::new();
        catalog.register(simple("a", "aa")).unwrap();
        catalog
            .register(simple("b", "bb").with_condition(Condition::marker_present("absent")))
            .unwrap();

        let registry = Resolver::new()
            .resolve(&catalog, &EnvSnapshot::default())
            .unwrap();

        let report = registry.report();
        assert_eq!(report.entries().len(), 2);
        assert!(report.entries().iter().all(|e| e.state.is_terminal()));
    }
}
