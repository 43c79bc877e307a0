//! Environment component
//!
//! Exposes the pass snapshot's property map as a queryable component. The
//! copy is taken at construction time, so the component reflects exactly
//! the environment the assembly was resolved against.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::catalog::ComponentDescriptor;
use crate::registry::instance;
use crate::snapshot::EnvSnapshot;

use super::capability;

/// Read-only view of the resolution environment's properties
pub struct EnvironmentComponent {
    properties: BTreeMap<String, String>,
}

impl EnvironmentComponent {
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            properties: snapshot.properties().clone(),
        }
    }

    /// The captured property map
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// The property map as JSON values
    pub fn invoke(&self) -> BTreeMap<String, Value> {
        self.properties
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect()
    }
}

/// Descriptor for the environment component
pub fn environment_descriptor() -> ComponentDescriptor {
    ComponentDescriptor::new("env", capability::ENV, |cx| {
        Ok(instance(EnvironmentComponent::from_snapshot(cx.snapshot())))
    })
}
