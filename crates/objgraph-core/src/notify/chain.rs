use smallvec::SmallVec;

use super::notification::Notification;

/// Receiver of dispatched notifications
pub trait NotificationSink {
    fn deliver(&mut self, notification: &Notification);
}

/// Ordered batch of pending notifications for one logical mutation
///
/// A public operation threads a single chain through every internal step
/// and dispatches it once, after all structural updates are complete.
/// A chain of one keeps its notification inline.
#[derive(Debug, Default)]
pub struct NotificationChain {
    pending: SmallVec<[Notification; 1]>,
}

impl NotificationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.pending.iter()
    }

    /// Append a notification
    ///
    /// A SET/UNSET is merged into a pending SET/UNSET of the same notifier and
    /// feature instead of being appended; the return value is `false` then.
    pub fn add(&mut self, notification: Notification) -> bool {
        if self.pending.iter_mut().any(|n| n.merge(&notification)) {
            return false;
        }
        self.pending.push(notification);
        true
    }

    /// Deliver every notification in append order, consuming the chain
    ///
    /// Returns the number delivered; an empty chain delivers nothing.
    pub fn dispatch(self, sink: &mut dyn NotificationSink) -> usize {
        for notification in &self.pending {
            sink.deliver(notification);
        }
        self.pending.len()
    }

    pub fn into_vec(self) -> Vec<Notification> {
        self.pending.into_vec()
    }
}

impl Extend<Notification> for NotificationChain {
    fn extend<I: IntoIterator<Item = Notification>>(&mut self, iter: I) {
        for notification in iter {
            self.add(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use crate::notify::EventKind;
    use objgraph_core_types::{FeatureId, ObjectId};

    struct Collect(Vec<Notification>);

    impl NotificationSink for Collect {
        fn deliver(&mut self, notification: &Notification) {
            self.0.push(notification.clone());
        }
    }

    fn add_event(target: usize) -> Notification {
        Notification::new(
            ObjectId::from_index(0),
            FeatureId::from_index(0),
            EventKind::Add,
            Value::Null,
            Value::Object(ObjectId::from_index(target)),
            Some(target),
        )
    }

    #[test]
    fn test_dispatch_preserves_append_order() {
        let mut chain = NotificationChain::new();
        chain.add(add_event(1));
        chain.add(add_event(2));
        chain.add(add_event(3));
        assert_eq!(chain.len(), 3);

        let mut sink = Collect(Vec::new());
        assert_eq!(chain.dispatch(&mut sink), 3);
        let targets: Vec<_> = sink.0.iter().map(|n| n.position).collect();
        assert_eq!(targets, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_empty_dispatch_is_noop() {
        let mut sink = Collect(Vec::new());
        assert_eq!(NotificationChain::new().dispatch(&mut sink), 0);
        assert!(sink.0.is_empty());
    }

    #[test]
    fn test_single_notification_stays_inline() {
        let mut chain = NotificationChain::new();
        assert!(chain.add(add_event(1)));
        assert!(!chain.pending.spilled());
        assert!(chain.add(add_event(2)));
        assert!(chain.pending.spilled());
        assert_eq!(chain.iter().count(), 2);
    }

    #[test]
    fn test_merge_reports_not_appended() {
        let object = ObjectId::from_index(4);
        let feature = FeatureId::from_index(2);
        let mut chain = NotificationChain::new();
        chain.add(add_event(1));
        assert!(chain.add(Notification::set(object, feature, Value::Null, Value::Int(1))));
        assert!(!chain.add(Notification::set(object, feature, Value::Int(1), Value::Int(2))));
        assert_eq!(chain.len(), 2);
        let merged = chain.into_vec().pop().unwrap();
        assert_eq!(merged.old_value, Value::Null);
        assert_eq!(merged.new_value, Value::Int(2));
    }
}
