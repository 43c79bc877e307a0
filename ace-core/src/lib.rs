//! # ACE Core - Activation & Composition Engine
//!
//! ACE decides, for a single assembly pass, which candidate components
//! become active, builds them in dependency order, and exposes them
//! through a typed lookup registry:
//!
//! - **Catalog**: declarative component descriptors: a construction
//!   recipe, its activation conditions, and a cardinality policy
//! - **Snapshot**: immutable view of configuration properties and
//!   available optional libraries at resolution time
//! - **Assembly**: the resolution pass: ordering, condition evaluation,
//!   construction, conflict handling, outcome report
//! - **Registry**: frozen capability -> instance mapping with provenance
//!
//! ## Core Principle
//!
//! Activation is deterministic and fail-safe: the same catalog resolved
//! against the same snapshot always yields the same registry, and an
//! ambiguous capability resolves to *absent* rather than an arbitrary
//! winner.
//!
//! ## Example
//!
//! ```rust
//! use ace_core::{instance, Catalog, ComponentDescriptor, Condition, EnvSnapshot, Resolver};
//!
//! let mut catalog = Catalog::new();
//! catalog
//!     .register(ComponentDescriptor::new("greeter", "greeting", |cx| {
//!         let name = cx.snapshot().property_or("app.name", "world");
//!         Ok(instance(format!("hello {name}")))
//!     }))
//!     .unwrap();
//! catalog
//!     .register(
//!         ComponentDescriptor::new("banner", "banner", |_cx| {
//!             Ok(instance("enabled".to_string()))
//!         })
//!         .with_condition(Condition::property_present("banner.enabled")),
//!     )
//!     .unwrap();
//!
//! let snapshot = EnvSnapshot::builder().with_property("app.name", "ace").build();
//! let registry = Resolver::new().resolve(&catalog, &snapshot).unwrap();
//!
//! // Conditions held: the greeter is active
//! let greeting = registry.get_as::<String>("greeting").unwrap();
//! assert_eq!(*greeting, "hello ace");
//!
//! // Condition false: absence is explicit, not a placeholder
//! assert!(registry.get("banner").is_none());
//! ```

pub mod assembly;
pub mod catalog;
pub mod contrib;
pub mod error;
pub mod registry;
pub mod snapshot;

// Re-export main types
pub use assembly::{DescriptorState, ReportEntry, ResolutionReport, Resolver};
pub use catalog::{CardinalityPolicy, Catalog, ComponentDescriptor, Condition, Constructor};
pub use error::{AceError, ErrorCategory, Result};
pub use registry::{
    instance, BuildContext, ComponentHandle, ComponentInstance, Registry,
};
pub use snapshot::{EnvSnapshot, SnapshotBuilder, SnapshotSource};
