//! Component registry
//!
//! The registry is the output of a resolution pass: a mapping from
//! capability key to the active component instance(s) plus provenance
//! (which descriptor produced each instance). It is frozen when the pass
//! completes; after that it is read-only and safe to share across threads.
//!
//! Absence is a first-class outcome. `get` on an unresolved capability
//! returns `None`, `get_all` returns an empty slice, and `require` returns
//! an explicit error. The registry never substitutes a placeholder
//! instance.
//!
//! Instances are type-erased (`Arc<dyn Any + Send + Sync>`). Concrete
//! components are retrieved with [`Registry::get_as`]; components stored
//! as shared trait objects (`Arc<dyn SomeTrait>`) are retrieved with
//! [`Registry::collect_all`], which clones the stored value.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::assembly::{DescriptorState, ResolutionReport};
use crate::error::{AceError, Result};
use crate::snapshot::EnvSnapshot;

/// A type-erased component instance
pub type ComponentInstance = Arc<dyn Any + Send + Sync>;

/// Wrap a value as a component instance
///
/// For components consumed through a trait, store the shared trait object
/// itself: `instance::<Arc<dyn HealthIndicator>>(Arc::new(Ping))`, and
/// retrieve it with `collect_all::<Arc<dyn HealthIndicator>>(..)`.
pub fn instance<T: Any + Send + Sync>(value: T) -> ComponentInstance {
    Arc::new(value)
}

/// An active component with its provenance
#[derive(Clone)]
pub struct ComponentHandle {
    capability: String,
    descriptor_id: String,
    instance: ComponentInstance,
}

impl ComponentHandle {
    pub(crate) fn new(
        capability: impl Into<String>,
        descriptor_id: impl Into<String>,
        instance: ComponentInstance,
    ) -> Self {
        Self {
            capability: capability.into(),
            descriptor_id: descriptor_id.into(),
            instance,
        }
    }

    /// Capability key this instance is registered under
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Descriptor that produced this instance
    pub fn descriptor_id(&self) -> &str {
        &self.descriptor_id
    }

    /// The raw type-erased instance
    pub fn instance(&self) -> &ComponentInstance {
        &self.instance
    }

    /// Downcast the instance to a concrete type
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }
}

impl std::fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("capability", &self.capability)
            .field("descriptor_id", &self.descriptor_id)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered instance storage shared by the frozen registry and the
/// in-pass view
#[derive(Debug, Default)]
pub(crate) struct ComponentSet {
    handles: Vec<ComponentHandle>,
    by_capability: HashMap<String, Vec<usize>>,
}

impl ComponentSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, handle: ComponentHandle) {
        let idx = self.handles.len();
        self.by_capability
            .entry(handle.capability.clone())
            .or_default()
            .push(idx);
        self.handles.push(handle);
    }

    fn indices(&self, capability: &str) -> &[usize] {
        self.by_capability
            .get(capability)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn get(&self, capability: &str) -> Option<&ComponentHandle> {
        self.indices(capability).first().map(|&i| &self.handles[i])
    }

    fn get_all(&self, capability: &str) -> Vec<&ComponentHandle> {
        self.indices(capability)
            .iter()
            .map(|&i| &self.handles[i])
            .collect()
    }

    fn count(&self, capability: &str) -> usize {
        self.indices(capability).len()
    }

    fn len(&self) -> usize {
        self.handles.len()
    }

    fn capabilities(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.by_capability.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}

/// Read-only view handed to conditions and constructors during a pass
///
/// Exposes the environment snapshot and the registry built so far. Counts
/// and lookups reflect only finalized activations; candidates still subject
/// to ambiguity suppression are not visible.
pub struct BuildContext<'a> {
    snapshot: &'a EnvSnapshot,
    components: &'a ComponentSet,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(snapshot: &'a EnvSnapshot, components: &'a ComponentSet) -> Self {
        Self {
            snapshot,
            components,
        }
    }

    /// The environment snapshot for this pass
    pub fn snapshot(&self) -> &EnvSnapshot {
        self.snapshot
    }

    /// First active instance for a capability, if any
    pub fn get(&self, capability: &str) -> Option<&ComponentHandle> {
        self.components.get(capability)
    }

    /// First active instance downcast to a concrete type
    pub fn get_as<T: Any + Send + Sync>(&self, capability: &str) -> Option<Arc<T>> {
        self.components.get(capability).and_then(|h| h.downcast())
    }

    /// Clones of every stored value for a capability, in activation order
    ///
    /// This is the lookup for trait-object components registered as
    /// `Arc<dyn Trait>`.
    pub fn collect_all<T: Any + Send + Sync + Clone>(&self, capability: &str) -> Vec<T> {
        self.components
            .get_all(capability)
            .into_iter()
            .filter_map(|h| h.downcast::<T>())
            .map(|arc| (*arc).clone())
            .collect()
    }

    /// Clone of the first stored value for a capability
    pub fn collect_one<T: Any + Send + Sync + Clone>(&self, capability: &str) -> Option<T> {
        self.components
            .get(capability)
            .and_then(|h| h.downcast::<T>())
            .map(|arc| (*arc).clone())
    }

    /// Number of active instances for a capability
    pub fn count(&self, capability: &str) -> usize {
        self.components.count(capability)
    }

    /// True iff at least one active instance exists for a capability
    pub fn contains(&self, capability: &str) -> bool {
        self.components.count(capability) > 0
    }
}

/// The frozen result of a resolution pass
///
/// Built by exactly one pass, immutable afterwards. For capabilities with
/// multiple instances, `get` returns the first in activation order;
/// `get_all` returns all of them.
#[derive(Debug)]
pub struct Registry {
    components: ComponentSet,
    report: ResolutionReport,
}

impl Registry {
    pub(crate) fn new(components: ComponentSet, report: ResolutionReport) -> Self {
        Self { components, report }
    }

    /// First active instance for a capability, if any
    pub fn get(&self, capability: &str) -> Option<&ComponentHandle> {
        self.components.get(capability)
    }

    /// First active instance, or an explicit error when absent
    pub fn require(&self, capability: &str) -> Result<&ComponentHandle> {
        self.get(capability).ok_or_else(|| AceError::CapabilityNotFound {
            capability: capability.to_string(),
        })
    }

    /// First active instance downcast to a concrete type
    pub fn get_as<T: Any + Send + Sync>(&self, capability: &str) -> Option<Arc<T>> {
        self.get(capability).and_then(|h| h.downcast())
    }

    /// All active instances for a capability, in activation order
    ///
    /// Empty when the capability is absent or was suppressed.
    pub fn get_all(&self, capability: &str) -> Vec<&ComponentHandle> {
        self.components.get_all(capability)
    }

    /// Clones of every stored value for a capability (trait-object lookup)
    pub fn collect_all<T: Any + Send + Sync + Clone>(&self, capability: &str) -> Vec<T> {
        self.components
            .get_all(capability)
            .into_iter()
            .filter_map(|h| h.downcast::<T>())
            .map(|arc| (*arc).clone())
            .collect()
    }

    /// Number of active instances for a capability
    pub fn count(&self, capability: &str) -> usize {
        self.components.count(capability)
    }

    /// True iff at least one active instance exists for a capability
    pub fn contains(&self, capability: &str) -> bool {
        self.count(capability) > 0
    }

    /// All capability keys with at least one active instance, sorted
    pub fn capabilities(&self) -> Vec<&str> {
        self.components.capabilities()
    }

    /// Total number of active instances
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True when no component was activated
    pub fn is_empty(&self) -> bool {
        self.components.len() == 0
    }

    /// Terminal state of a descriptor in the pass that built this registry
    pub fn state_of(&self, descriptor_id: &str) -> Option<DescriptorState> {
        self.report.entry(descriptor_id).map(|e| e.state)
    }

    /// The per-descriptor outcome report for the pass
    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::ReportEntry;

    fn test_registry() -> Registry {
        let mut set = ComponentSet::new();
        set.insert(ComponentHandle::new("health", "ping", instance(42u32)));
        set.insert(ComponentHandle::new(
            "names",
            "first",
            instance("alpha".to_string()),
        ));
        set.insert(ComponentHandle::new(
            "names",
            "second",
            instance("beta".to_string()),
        ));
        let report = ResolutionReport::new(vec![
            ReportEntry {
                descriptor_id: "ping".to_string(),
                capability: "health".to_string(),
                state: DescriptorState::Active,
                detail: None,
            },
            ReportEntry {
                descriptor_id: "skipped".to_string(),
                capability: "metrics".to_string(),
                state: DescriptorState::ConditionsUnmet,
                detail: Some("condition not met".to_string()),
            },
        ]);
        Registry::new(set, report)
    }

    #[test]
    fn test_get_and_downcast() {
        let registry = test_registry();

        let handle = registry.get("health").unwrap();
        assert_eq!(handle.descriptor_id(), "ping");
        assert_eq!(*handle.downcast::<u32>().unwrap(), 42);
        assert!(handle.downcast::<String>().is_none());
    }

    #[test]
    fn test_absence_is_explicit() {
        let registry = test_registry();

        assert!(registry.get("missing").is_none());
        assert!(registry.get_all("missing").is_empty());
        assert_eq!(registry.count("missing"), 0);

        let err = registry.require("missing").unwrap_err();
        assert_eq!(err.error_code(), "CAPABILITY_NOT_FOUND");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_get_all_preserves_activation_order() {
        let registry = test_registry();

        let names: Vec<String> = registry.collect_all("names");
        assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);

        let first = registry.get("names").unwrap();
        assert_eq!(first.descriptor_id(), "first");
    }

    #[test]
    fn test_state_lookup() {
        let registry = test_registry();

        assert_eq!(registry.state_of("ping"), Some(DescriptorState::Active));
        assert_eq!(
            registry.state_of("skipped"),
            Some(DescriptorState::ConditionsUnmet)
        );
        assert_eq!(registry.state_of("unknown"), None);
    }

    #[test]
    fn test_capabilities_sorted() {
        let registry = test_registry();
        assert_eq!(registry.capabilities(), vec!["health", "names"]);
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
    }
}
