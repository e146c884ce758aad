use slotlint_core_types::SessionId;
use thiserror::Error;

/// Result type alias using LayoutError
pub type Result<T> = std::result::Result<T, LayoutError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and by callers that surface the failure to users.
/// Compatibility findings are never errors; only malformed input and broken
/// internal invariants end up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input
    InvalidInput,
    InvalidLayout,
    MalformedTypeId,
    UnresolvedType,

    // Analysis
    RecursiveType,
    InvariantViolation,

    // Configuration
    InvalidConfig,

    // Integration
    Serialization,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidLayout => "ERR_INVALID_LAYOUT",
            ExErrorKind::MalformedTypeId => "ERR_MALFORMED_TYPE_ID",
            ExErrorKind::UnresolvedType => "ERR_UNRESOLVED_TYPE",
            ExErrorKind::RecursiveType => "ERR_RECURSIVE_TYPE",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and the context
/// (operation, type, field, session) needed to debug a failed comparison.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    type_label: Option<String>,
    field_label: Option<String>,
    session_id: Option<SessionId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            type_label: None,
            field_label: None,
            session_id: None,
            message: String::new(),
            source: None,
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_type_label(mut self, label: impl Into<String>) -> Self {
        self.type_label = Some(label.into());
        self
    }

    pub fn with_field_label(mut self, label: impl Into<String>) -> Self {
        self.field_label = Some(label.into());
        self
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn type_label(&self) -> Option<&str> {
        self.type_label.as_deref()
    }

    pub fn field_label(&self) -> Option<&str> {
        self.field_label.as_deref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(type_label) = &self.type_label {
            write!(f, " (type: {})", type_label)?;
        }
        if let Some(field_label) = &self.field_label {
            write!(f, " (field: {})", field_label)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    // ===== Analysis Errors =====
    #[error("Recursive types are not supported: recursion found in {type_label}")]
    RecursiveType { type_label: String },

    #[error("Invariant violated while comparing {type_label}: {reason}")]
    InvariantViolation { type_label: String, reason: String },

    #[error("Type id {type_id} is not present in the {side} type arena")]
    UnresolvedType { type_id: u32, side: String },

    // ===== Input Errors =====
    #[error("Invalid storage layout: {reason}")]
    InvalidLayout { reason: String },

    #[error("Malformed type identifier `{type_id}`: {reason}")]
    MalformedTypeId { type_id: String, reason: String },

    #[error("Field {field_label} has an invalid {attribute}: {value}")]
    InvalidFieldAttribute {
        field_label: String,
        attribute: String,
        value: String,
    },

    // ===== Configuration Errors =====
    #[error("Invalid comparator options: {reason}")]
    InvalidConfig { reason: String },

    // ===== Integration Errors =====
    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

impl LayoutError {
    /// True for errors raised by the analysis itself rather than by bad input
    pub fn is_fatal_analysis_error(&self) -> bool {
        matches!(
            self,
            LayoutError::RecursiveType { .. } | LayoutError::InvariantViolation { .. }
        )
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(err: serde_json::Error) -> Self {
        LayoutError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for LayoutError {
    fn from(err: toml::de::Error) -> Self {
        LayoutError::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

impl From<LayoutError> for ExError {
    fn from(err: LayoutError) -> Self {
        let message = err.to_string();
        match err {
            LayoutError::RecursiveType { type_label } => ExError::new(ExErrorKind::RecursiveType)
                .with_op("type_change")
                .with_type_label(type_label)
                .with_message(message),

            LayoutError::InvariantViolation { type_label, .. } => {
                ExError::new(ExErrorKind::InvariantViolation)
                    .with_op("type_change")
                    .with_type_label(type_label)
                    .with_message(message)
            }

            LayoutError::UnresolvedType { .. } => {
                ExError::new(ExErrorKind::UnresolvedType).with_message(message)
            }

            LayoutError::InvalidLayout { .. } => ExError::new(ExErrorKind::InvalidLayout)
                .with_op("import_layout")
                .with_message(message),

            LayoutError::MalformedTypeId { type_id, .. } => {
                ExError::new(ExErrorKind::MalformedTypeId)
                    .with_op("parse_type_id")
                    .with_type_label(type_id)
                    .with_message(message)
            }

            LayoutError::InvalidFieldAttribute { field_label, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("import_layout")
                    .with_field_label(field_label)
                    .with_message(message)
            }

            LayoutError::InvalidConfig { .. } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(message)
            }

            LayoutError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_and_op() {
        let err = ExError::new(ExErrorKind::RecursiveType)
            .with_op("compare_layouts")
            .with_message("boom");
        let text = err.to_string();
        assert!(text.starts_with("[ERR_RECURSIVE_TYPE]"));
        assert!(text.contains("compare_layouts"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn test_source_chain() {
        let inner = ExError::new(ExErrorKind::MalformedTypeId);
        let outer = ExError::new(ExErrorKind::InvalidLayout).with_source(inner);
        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(ExErrorKind::MalformedTypeId)
        );
    }
}
