//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_SESSION_ID: &str = "session_id";

// Comparison subjects
pub const FIELD_SUBJECT: &str = "subject";
pub const FIELD_TYPE_LABEL: &str = "type_label";

// Collection sizes
pub const FIELD_ORIGINAL_LEN: &str = "original_len";
pub const FIELD_UPDATED_LEN: &str = "updated_len";
pub const FIELD_UNSAFE_OPS: &str = "unsafe_ops";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
