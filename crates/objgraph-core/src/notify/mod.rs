//! Change notification: records, chains and adapters

pub mod adapter;
pub mod chain;
pub mod notification;

pub(crate) use adapter::AdapterRegistry;
pub use adapter::{Adapter, NotificationLog};
pub use chain::{NotificationChain, NotificationSink};
pub use notification::{EventKind, Notification, Notifier};
