//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_OBJECT_ID: &str = "object_id";
pub const FIELD_RESOURCE_ID: &str = "resource_id";
pub const FIELD_FEATURE: &str = "feature";
pub const FIELD_PROXY_URI: &str = "proxy_uri";

// Collection sizes
pub const FIELD_CHAIN_LEN: &str = "chain_len";
pub const FIELD_SUBTREE_LEN: &str = "subtree_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_ATTACHED: &str = "attached";
pub const EVENT_DETACHED: &str = "detached";
pub const EVENT_UNRESOLVED: &str = "unresolved";
