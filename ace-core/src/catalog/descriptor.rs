//! Component descriptors
//!
//! A [`ComponentDescriptor`] is the declarative unit the resolver works
//! over: a stable id, the capability it provides, its preconditions, the
//! capabilities it depends on, a cardinality policy, and a construction
//! closure. Descriptors are immutable once registered in a catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Condition;
use crate::error::Result;
use crate::registry::{BuildContext, ComponentInstance};

/// Construction recipe: builds the instance from already-resolved inputs
pub type Constructor =
    Box<dyn Fn(&BuildContext<'_>) -> Result<ComponentInstance> + Send + Sync>;

/// How many active instances a capability key may have, and what happens
/// on conflict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityPolicy {
    /// Exactly one instance; a second unconditional claimant is a fatal
    /// configuration error
    #[default]
    Singleton,

    /// Ambiguity suppresses the capability: if more than one candidate
    /// materializes, none is activated and the key resolves to absent
    DisableIfMultiple,

    /// Any number of instances, kept in activation order
    AllowMultiple,
}

impl fmt::Display for CardinalityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardinalityPolicy::Singleton => write!(f, "singleton"),
            CardinalityPolicy::DisableIfMultiple => write!(f, "disable_if_multiple"),
            CardinalityPolicy::AllowMultiple => write!(f, "allow_multiple"),
        }
    }
}

/// A candidate component: conditions, capability, construction recipe
pub struct ComponentDescriptor {
    id: String,
    capability: String,
    conditions: Vec<Condition>,
    requires: Vec<String>,
    after: Vec<String>,
    policy: CardinalityPolicy,
    constructor: Constructor,
}

impl ComponentDescriptor {
    /// Create a descriptor with defaults (no conditions, no dependencies,
    /// singleton cardinality)
    pub fn new(
        id: impl Into<String>,
        capability: impl Into<String>,
        constructor: impl Fn(&BuildContext<'_>) -> Result<ComponentInstance> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            capability: capability.into(),
            conditions: vec![],
            requires: vec![],
            after: vec![],
            policy: CardinalityPolicy::default(),
            constructor: Box::new(constructor),
        }
    }

    /// Add a precondition (all conditions must hold, in order)
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a hard dependency: the capability must have at least one active
    /// instance, and this descriptor is resolved after all its providers
    pub fn with_requires(mut self, capability: impl Into<String>) -> Self {
        self.requires.push(capability.into());
        self
    }

    /// Add an ordering-only dependency: this descriptor is resolved after
    /// all providers of the capability, which may still end up absent
    ///
    /// This is how aggregators see every contributor that activated.
    pub fn with_after(mut self, capability: impl Into<String>) -> Self {
        self.after.push(capability.into());
        self
    }

    /// Set the cardinality policy
    pub fn with_policy(mut self, policy: CardinalityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stable descriptor id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Capability key this descriptor provides
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Ordered preconditions
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Hard dependencies
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Ordering-only dependencies
    pub fn after(&self) -> &[String] {
        &self.after
    }

    /// Cardinality policy for the provided capability
    pub fn policy(&self) -> CardinalityPolicy {
        self.policy
    }

    /// Run the construction recipe
    pub(crate) fn construct(&self, cx: &BuildContext<'_>) -> Result<ComponentInstance> {
        (self.constructor)(cx)
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("id", &self.id)
            .field("capability", &self.capability)
            .field("conditions", &self.conditions)
            .field("requires", &self.requires)
            .field("after", &self.after)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
