use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::chain::NotificationSink;
use super::notification::{Notification, Notifier};

/// Listener attached to a notifier
///
/// Adapters see notifications only after the whole mutation has completed,
/// and never receive the graph, so they cannot re-enter it.
pub trait Adapter {
    fn notify_changed(&mut self, notification: &Notification);
}

impl<F> Adapter for F
where
    F: FnMut(&Notification),
{
    fn notify_changed(&mut self, notification: &Notification) {
        self(notification)
    }
}

/// Recording adapter; clones share one log
///
/// ```
/// use objgraph_core::{Adapter, NotificationLog};
///
/// let log = NotificationLog::new();
/// let boxed: Box<dyn Adapter> = Box::new(log.clone());
/// assert!(log.is_empty());
/// # drop(boxed);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the recorded notifications and start over
    pub fn take(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Adapter for NotificationLog {
    fn notify_changed(&mut self, notification: &Notification) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(notification.clone());
        }
    }
}

/// Adapters keyed by notifier
#[derive(Default)]
pub(crate) struct AdapterRegistry {
    by_notifier: HashMap<Notifier, Vec<Box<dyn Adapter>>>,
}

impl AdapterRegistry {
    pub(crate) fn add(&mut self, notifier: Notifier, adapter: Box<dyn Adapter>) {
        self.by_notifier.entry(notifier).or_default().push(adapter);
    }

    /// Drop every adapter of `notifier`, returning how many there were
    pub(crate) fn remove_all(&mut self, notifier: Notifier) -> usize {
        self.by_notifier.remove(&notifier).map_or(0, |list| list.len())
    }

    pub(crate) fn has_adapters(&self, notifier: Notifier) -> bool {
        self.by_notifier
            .get(&notifier)
            .is_some_and(|list| !list.is_empty())
    }

    pub(crate) fn count(&self, notifier: Notifier) -> usize {
        self.by_notifier.get(&notifier).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.by_notifier.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

impl NotificationSink for AdapterRegistry {
    fn deliver(&mut self, notification: &Notification) {
        if let Some(adapters) = self.by_notifier.get_mut(&notification.notifier) {
            for adapter in adapters.iter_mut() {
                adapter.notify_changed(notification);
            }
        }
    }
}
