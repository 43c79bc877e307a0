//! Condition predicates
//!
//! A [`Condition`] is declarative data, evaluated by an explicit
//! interpreter against the environment snapshot and the registry built so
//! far. Evaluation is pure and re-evaluable; a condition that cannot be
//! evaluated (malformed reference) returns an error that the resolver
//! treats as "not met"; it never aborts a pass.
//!
//! Count predicates over capabilities participate in dependency ordering:
//! a descriptor counting capability X is resolved after every provider of
//! X, so the counts it observes are final.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AceError, Result};
use crate::registry::BuildContext;

/// A composable predicate over the snapshot and the partial registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Property is set to a non-empty value
    PropertyPresent { key: String },

    /// Property exactly equals a value
    PropertyEquals { key: String, value: String },

    /// Exactly `count` instances of a capability are resolved
    CapabilityCountEquals { capability: String, count: usize },

    /// At least `count` instances of a capability are resolved
    CapabilityCountAtLeast { capability: String, count: usize },

    /// An optional-capability marker is available in the snapshot
    MarkerPresent { marker: String },

    /// Every inner condition holds (vacuously true when empty)
    AllOf { conditions: Vec<Condition> },

    /// At least one inner condition holds
    AnyOf { conditions: Vec<Condition> },

    /// The inner condition does not hold
    Not { condition: Box<Condition> },
}

impl Condition {
    /// Property set to a non-empty value
    pub fn property_present(key: impl Into<String>) -> Self {
        Condition::PropertyPresent { key: key.into() }
    }

    /// Property exactly equal to a value
    pub fn property_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::PropertyEquals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Exactly `count` resolved instances of a capability
    pub fn capability_count(capability: impl Into<String>, count: usize) -> Self {
        Condition::CapabilityCountEquals {
            capability: capability.into(),
            count,
        }
    }

    /// At least `count` resolved instances of a capability
    pub fn capability_at_least(capability: impl Into<String>, count: usize) -> Self {
        Condition::CapabilityCountAtLeast {
            capability: capability.into(),
            count,
        }
    }

    /// Optional-capability marker available
    pub fn marker_present(marker: impl Into<String>) -> Self {
        Condition::MarkerPresent {
            marker: marker.into(),
        }
    }

    /// All conditions hold
    pub fn all_of(conditions: Vec<Condition>) -> Self {
        Condition::AllOf { conditions }
    }

    /// Any condition holds
    pub fn any_of(conditions: Vec<Condition>) -> Self {
        Condition::AnyOf { conditions }
    }

    /// Combine with another condition (both must hold)
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::AllOf { mut conditions } => {
                conditions.push(other);
                Condition::AllOf { conditions }
            }
            first => Condition::AllOf {
                conditions: vec![first, other],
            },
        }
    }

    /// Combine with another condition (either may hold)
    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::AnyOf { mut conditions } => {
                conditions.push(other);
                Condition::AnyOf { conditions }
            }
            first => Condition::AnyOf {
                conditions: vec![first, other],
            },
        }
    }

    /// Invert this condition
    pub fn negate(self) -> Self {
        Condition::Not {
            condition: Box::new(self),
        }
    }

    /// Evaluate against the snapshot and the registry built so far
    ///
    /// Pure and side-effect free. `Err` means the condition itself is
    /// malformed (empty reference); callers are expected to fail closed.
    pub fn evaluate(&self, cx: &BuildContext<'_>) -> Result<bool> {
        match self {
            Condition::PropertyPresent { key } => {
                require_name(key, "property key")?;
                Ok(cx.snapshot().has_property(key))
            }
            Condition::PropertyEquals { key, value } => {
                require_name(key, "property key")?;
                Ok(cx.snapshot().property(key) == Some(value.as_str()))
            }
            Condition::CapabilityCountEquals { capability, count } => {
                require_name(capability, "capability")?;
                Ok(cx.count(capability) == *count)
            }
            Condition::CapabilityCountAtLeast { capability, count } => {
                require_name(capability, "capability")?;
                Ok(cx.count(capability) >= *count)
            }
            Condition::MarkerPresent { marker } => {
                require_name(marker, "marker")?;
                Ok(cx.snapshot().has_marker(marker))
            }
            Condition::AllOf { conditions } => {
                for condition in conditions {
                    if !condition.evaluate(cx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::AnyOf { conditions } => {
                for condition in conditions {
                    if condition.evaluate(cx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not { condition } => Ok(!condition.evaluate(cx)?),
        }
    }

    /// Collect the capability keys this condition observes
    ///
    /// Used to order descriptors after the providers of everything their
    /// conditions count.
    pub fn referenced_capabilities<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Condition::CapabilityCountEquals { capability, .. }
            | Condition::CapabilityCountAtLeast { capability, .. } => {
                out.insert(capability.as_str());
            }
            Condition::AllOf { conditions } | Condition::AnyOf { conditions } => {
                for condition in conditions {
                    condition.referenced_capabilities(out);
                }
            }
            Condition::Not { condition } => condition.referenced_capabilities(out),
            Condition::PropertyPresent { .. }
            | Condition::PropertyEquals { .. }
            | Condition::MarkerPresent { .. } => {}
        }
    }
}

fn require_name(name: &str, what: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AceError::ConditionEvaluation {
            detail: format!("empty {what} reference"),
        });
    }
    Ok(())
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::PropertyPresent { key } => write!(f, "property '{key}' is set"),
            Condition::PropertyEquals { key, value } => {
                write!(f, "property '{key}' equals '{value}'")
            }
            Condition::CapabilityCountEquals { capability, count } => {
                write!(f, "exactly {count} instance(s) of '{capability}'")
            }
            Condition::CapabilityCountAtLeast { capability, count } => {
                write!(f, "at least {count} instance(s) of '{capability}'")
            }
            Condition::MarkerPresent { marker } => {
                write!(f, "optional capability '{marker}' available")
            }
            Condition::AllOf { conditions } => {
                write!(f, "({})", join_conditions(conditions, " and "))
            }
            Condition::AnyOf { conditions } => {
                write!(f, "({})", join_conditions(conditions, " or "))
            }
            Condition::Not { condition } => write!(f, "not ({condition})"),
        }
    }
}

fn join_conditions(conditions: &[Condition], sep: &str) -> String {
    conditions
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{instance, ComponentHandle, ComponentSet};
    use crate::snapshot::EnvSnapshot;

    #[test]
    fn test_property_predicates() {
        let snapshot = EnvSnapshot::builder()
            .with_property("mode", "fast")
            .with_property("blank", "")
            .build();
        let components = ComponentSet::new();
        let cx = BuildContext::new(&snapshot, &components);

        assert!(Condition::property_present("mode").evaluate(&cx).unwrap());
        assert!(!Condition::property_present("blank").evaluate(&cx).unwrap());
        assert!(!Condition::property_present("absent").evaluate(&cx).unwrap());

        assert!(Condition::property_equals("mode", "fast")
            .evaluate(&cx)
            .unwrap());
        assert!(!Condition::property_equals("mode", "slow")
            .evaluate(&cx)
            .unwrap());
        assert!(!Condition::property_equals("absent", "x")
            .evaluate(&cx)
            .unwrap());
    }

    #[test]
    fn test_marker_predicate() {
        let snapshot = EnvSnapshot::builder().with_marker("lib-a").build();
        let components = ComponentSet::new();
        let cx = BuildContext::new(&snapshot, &components);

        assert!(Condition::marker_present("lib-a").evaluate(&cx).unwrap());
        assert!(!Condition::marker_present("lib-b").evaluate(&cx).unwrap());
    }

    #[test]
    fn test_capability_counts() {
        let snapshot = EnvSnapshot::default();
        let mut components = ComponentSet::new();
        components.insert(ComponentHandle::new("migration", "one", instance(1u8)));
        components.insert(ComponentHandle::new("migration", "two", instance(2u8)));
        let cx = BuildContext::new(&snapshot, &components);

        assert!(Condition::capability_count("migration", 2)
            .evaluate(&cx)
            .unwrap());
        assert!(!Condition::capability_count("migration", 1)
            .evaluate(&cx)
            .unwrap());
        assert!(Condition::capability_at_least("migration", 1)
            .evaluate(&cx)
            .unwrap());
        assert!(!Condition::capability_at_least("migration", 3)
            .evaluate(&cx)
            .unwrap());
        assert!(Condition::capability_count("absent", 0)
            .evaluate(&cx)
            .unwrap());

        // "More than one" disable guard
        let at_most_one = Condition::capability_at_least("migration", 2).negate();
        assert!(!at_most_one.evaluate(&cx).unwrap());
    }

    #[test]
    fn test_combinators() {
        let snapshot = EnvSnapshot::builder().with_property("a", "1").build();
        let components = ComponentSet::new();
        let cx = BuildContext::new(&snapshot, &components);

        let both = Condition::property_present("a").and(Condition::property_present("b"));
        assert!(!both.evaluate(&cx).unwrap());

        let either = Condition::property_present("a").or(Condition::property_present("b"));
        assert!(either.evaluate(&cx).unwrap());

        assert!(Condition::all_of(vec![]).evaluate(&cx).unwrap());
        assert!(!Condition::any_of(vec![]).evaluate(&cx).unwrap());

        assert!(Condition::property_present("b")
            .negate()
            .evaluate(&cx)
            .unwrap());
    }

    #[test]
    fn test_malformed_condition_errors() {
        let snapshot = EnvSnapshot::default();
        let components = ComponentSet::new();
        let cx = BuildContext::new(&snapshot, &components);

        let err = Condition::property_present("").evaluate(&cx).unwrap_err();
        assert_eq!(err.error_code(), "CONDITION_EVALUATION");
        assert!(!err.is_fatal());

        // Malformed branch inside a combinator surfaces too
        let nested = Condition::all_of(vec![Condition::marker_present("")]);
        assert!(nested.evaluate(&cx).is_err());
    }

    #[test]
    fn test_referenced_capabilities() {
        let condition = Condition::capability_count("migration", 1)
            .and(Condition::property_present("x"))
            .or(Condition::capability_at_least("pool", 2).negate());

        let mut refs = BTreeSet::new();
        condition.referenced_capabilities(&mut refs);
        assert_eq!(refs, BTreeSet::from(["migration", "pool"]));
    }

    #[test]
    fn test_serialization_round_trip() {
        let condition = Condition::property_equals("mode", "fast")
            .and(Condition::marker_present("lib-a").negate());

        let json = serde_json::to_string(&condition).unwrap();
        assert!(json.contains("\"type\""));
        let parsed: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, condition);
    }

    #[test]
    fn test_display_forms() {
        let condition = Condition::property_present("mode")
            .and(Condition::capability_count("migration", 1));
        assert_eq!(
            condition.to_string(),
            "(property 'mode' is set and exactly 1 instance(s) of 'migration')"
        );
    }
}
