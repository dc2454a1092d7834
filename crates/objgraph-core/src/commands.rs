//! Command inventory for the `apply()` boundary
//!
//! Every graph mutation has a command form so that edits can be recorded,
//! replayed or generated (the property tests drive the graph this way).

use objgraph_core_types::{ClassId, FeatureKey, ObjectId, ResourceId};
use serde::{Deserialize, Serialize};

use crate::model::{ModelUri, Value};

/// One graph mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Create an unattached object
    CreateObject { class: ClassId },

    /// Create an unresolved proxy for `uri`
    CreateProxy { class: ClassId, uri: ModelUri },

    /// Create an empty resource
    CreateResource { uri: String },

    /// Replace a feature's value
    Set {
        object: ObjectId,
        feature: FeatureKey,
        value: Value,
    },

    /// Return a feature to its unset state
    Unset { object: ObjectId, feature: FeatureKey },

    /// Append to a many-valued feature
    Add {
        object: ObjectId,
        feature: FeatureKey,
        value: Value,
    },

    /// Insert into a many-valued feature at `index`
    Insert {
        object: ObjectId,
        feature: FeatureKey,
        index: usize,
        value: Value,
    },

    /// Append several values as one batch
    AddAll {
        object: ObjectId,
        feature: FeatureKey,
        values: Vec<Value>,
    },

    /// Remove the first occurrence of `value`
    Remove {
        object: ObjectId,
        feature: FeatureKey,
        value: Value,
    },

    /// Remove the element at `index`
    RemoveAt {
        object: ObjectId,
        feature: FeatureKey,
        index: usize,
    },

    /// Move an element within a list
    Move {
        object: ObjectId,
        feature: FeatureKey,
        from: usize,
        to: usize,
    },

    /// Empty a many-valued feature
    Clear { object: ObjectId, feature: FeatureKey },

    /// Append an object to a resource's roots
    AddRoot { resource: ResourceId, object: ObjectId },

    /// Insert an object into a resource's roots at `index`
    InsertRoot {
        resource: ResourceId,
        index: usize,
        object: ObjectId,
    },

    /// Remove an object from a resource's roots
    RemoveRoot { resource: ResourceId, object: ObjectId },

    /// Turn a blank object into a proxy, or clear the proxy marker
    SetProxyUri { object: ObjectId, uri: Option<ModelUri> },

    /// Cut an object's subtree out of the graph
    Delete { object: ObjectId },
}

impl Command {
    /// Operation name used in logs and error reports
    pub fn op_name(&self) -> &'static str {
        match self {
            Command::CreateObject { .. } => "create_object",
            Command::CreateProxy { .. } => "create_proxy",
            Command::CreateResource { .. } => "create_resource",
            Command::Set { .. } => "set",
            Command::Unset { .. } => "unset",
            Command::Add { .. } => "add",
            Command::Insert { .. } => "insert",
            Command::AddAll { .. } => "add_all",
            Command::Remove { .. } => "remove",
            Command::RemoveAt { .. } => "remove_at",
            Command::Move { .. } => "move",
            Command::Clear { .. } => "clear",
            Command::AddRoot { .. } => "add_root",
            Command::InsertRoot { .. } => "insert_root",
            Command::RemoveRoot { .. } => "remove_root",
            Command::SetProxyUri { .. } => "set_proxy_uri",
            Command::Delete { .. } => "delete",
        }
    }

    /// Whether the command can change containment or resource membership
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Command::CreateObject { .. }
                | Command::CreateProxy { .. }
                | Command::CreateResource { .. }
        )
    }
}

/// What a successful command produced
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Object(ObjectId),
    Resource(ResourceId),
    /// Whether a list or root list actually changed
    Changed(bool),
    /// Number of elements a batch add appended
    Count(usize),
    /// Element taken out by `RemoveAt`
    Removed(Value),
    Done,
}
