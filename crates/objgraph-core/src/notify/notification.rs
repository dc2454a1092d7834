use objgraph_core_types::{FeatureId, ObjectId, ResourceId};
use serde::{Deserialize, Serialize};

use crate::model::Value;

/// Source of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Notifier {
    Object(ObjectId),
    Resource(ResourceId),
}

impl From<ObjectId> for Notifier {
    fn from(id: ObjectId) -> Self {
        Notifier::Object(id)
    }
}

impl From<ResourceId> for Notifier {
    fn from(id: ResourceId) -> Self {
        Notifier::Resource(id)
    }
}

impl std::fmt::Display for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notifier::Object(id) => write!(f, "{}", id),
            Notifier::Resource(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Set,
    Unset,
    Add,
    Remove,
    AddMany,
    RemoveMany,
    /// `old_value` holds the previous index as `Value::Int`
    Move,
    /// A proxy was replaced by the object it stands for
    Resolve,
}

impl EventKind {
    /// Whether the event replaces a single value (and so may merge)
    pub fn is_single_change(&self) -> bool {
        matches!(self, EventKind::Set | EventKind::Unset)
    }
}

/// An immutable change record
///
/// `position` is `None` for single-valued features ("no index").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notifier: Notifier,
    pub feature_id: FeatureId,
    pub kind: EventKind,
    pub old_value: Value,
    pub new_value: Value,
    pub position: Option<usize>,
}

impl Notification {
    pub fn new(
        notifier: impl Into<Notifier>,
        feature_id: FeatureId,
        kind: EventKind,
        old_value: Value,
        new_value: Value,
        position: Option<usize>,
    ) -> Self {
        Self {
            notifier: notifier.into(),
            feature_id,
            kind,
            old_value,
            new_value,
            position,
        }
    }

    pub fn set(notifier: impl Into<Notifier>, feature_id: FeatureId, old: Value, new: Value) -> Self {
        Self::new(notifier, feature_id, EventKind::Set, old, new, None)
    }

    /// A SET whose old and new values are equal
    pub fn is_touch(&self) -> bool {
        self.kind == EventKind::Set && self.old_value == self.new_value
    }

    /// Fold a later SET/UNSET of the same notifier and feature into this one
    ///
    /// Keeps this notification's old value and takes the later new value and
    /// kind. Returns `false` (leaving `self` untouched) when the two cannot merge.
    pub fn merge(&mut self, later: &Notification) -> bool {
        if !self.kind.is_single_change()
            || !later.kind.is_single_change()
            || self.notifier != later.notifier
            || self.feature_id != later.feature_id
        {
            return false;
        }
        self.kind = later.kind;
        self.new_value = later.new_value.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(n: usize) -> ObjectId {
        ObjectId::from_index(n)
    }

    #[test]
    fn test_set_then_set_merges_keeping_first_old_value() {
        let mut first = Notification::set(object(1), FeatureId::from_index(0), Value::Int(1), Value::Int(2));
        let second = Notification::set(object(1), FeatureId::from_index(0), Value::Int(2), Value::Int(3));
        assert!(first.merge(&second));
        assert_eq!(first.old_value, Value::Int(1));
        assert_eq!(first.new_value, Value::Int(3));
    }

    #[test]
    fn test_different_feature_does_not_merge() {
        let mut first = Notification::set(object(1), FeatureId::from_index(0), Value::Null, Value::Int(2));
        let second = Notification::set(object(1), FeatureId::from_index(1), Value::Null, Value::Int(3));
        assert!(!first.merge(&second));
        assert_eq!(first.new_value, Value::Int(2));
    }

    #[test]
    fn test_list_events_never_merge() {
        let mut add = Notification::new(
            object(1),
            FeatureId::from_index(0),
            EventKind::Add,
            Value::Null,
            Value::Object(object(2)),
            Some(0),
        );
        let set = Notification::set(object(1), FeatureId::from_index(0), Value::Null, Value::Null);
        assert!(!add.merge(&set));
    }
}
