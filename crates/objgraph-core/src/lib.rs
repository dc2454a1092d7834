//! objgraph Core - reflective model-object runtime
//!
//! This crate provides the object-graph consistency engine:
//! - Metamodel registry (classes, attributes, references, opposites)
//! - Arena-allocated model objects with static and dynamic feature storage
//! - Containment & inverse-reference maintenance under arbitrary edits
//! - Resource attachment protocol with an intrinsic ID index
//! - Lazy proxy resolution through a pluggable resolver
//! - Batched notification chains dispatched once per mutation
//! - Invariant checkers and a command/apply boundary
//!
//! The engine is synchronous and not internally synchronized; callers own
//! exclusivity (a `&mut ModelGraph` is the write lock).

pub mod apply;
pub mod commands;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging_facility;
pub mod meta;
pub mod model;
pub mod notify;
pub mod rules;

// Re-export commonly used types
pub use apply::apply;
pub use commands::{Command, CommandResult};
pub use config::GraphConfig;
pub use engine::{
    ModelGraph, ProxyResolver, Resource, ResourceObserver, SameResourceResolver, RESOURCE_CONTENTS,
    UriFragmentResolver,
};
pub use errors::{ExError, ExErrorKind, ModelError, Result};
pub use meta::{ClassDescriptor, DataType, FeatureKind, Metamodel, MetamodelBuilder, StructuralFeature};
pub use model::{ContainerFeatureRef, ModelObject, ModelUri, Value, OPPOSITE_FEATURE_BASE};
pub use notify::{Adapter, EventKind, Notification, NotificationChain, NotificationLog, Notifier};
#[doc(hidden)]
pub use objgraph_core_types;
pub use objgraph_core_types::{ClassId, FeatureId, FeatureKey, ObjectId, ResourceId};
