use objgraph_core_types::{ObjectId, ResourceId};
use thiserror::Error;

/// Result type alias using ModelError
pub type Result<T> = std::result::Result<T, ModelError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and structured log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Feature access
    InvalidFeature,
    ImmutableFeature,
    UnsupportedDynamicAccess,

    // Lookup
    NotFound,
    AlreadyExists,
    AbstractClass,

    // Value validation
    TypeMismatch,
    InvalidMultiplicity,
    IndexOutOfBounds,
    DuplicateValue,

    // Structural
    ContainmentCycle,
    ProxyMutation,
    InvariantViolation,

    // Setup
    InvalidMetamodel,
    InvalidConfig,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidFeature => "ERR_INVALID_FEATURE",
            ExErrorKind::ImmutableFeature => "ERR_IMMUTABLE_FEATURE",
            ExErrorKind::UnsupportedDynamicAccess => "ERR_UNSUPPORTED_DYNAMIC_ACCESS",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::AbstractClass => "ERR_ABSTRACT_CLASS",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::InvalidMultiplicity => "ERR_INVALID_MULTIPLICITY",
            ExErrorKind::IndexOutOfBounds => "ERR_INDEX_OUT_OF_BOUNDS",
            ExErrorKind::DuplicateValue => "ERR_DUPLICATE_VALUE",
            ExErrorKind::ContainmentCycle => "ERR_CONTAINMENT_CYCLE",
            ExErrorKind::ProxyMutation => "ERR_PROXY_MUTATION",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::InvalidMetamodel => "ERR_INVALID_METAMODEL",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and rich
/// context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    object_id: Option<ObjectId>,
    resource_id: Option<ResourceId>,
    feature: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            object_id: None,
            resource_id: None,
            feature: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add object context
    pub fn with_object_id(mut self, id: ObjectId) -> Self {
        self.object_id = Some(id);
        self
    }

    /// Add resource context
    pub fn with_resource_id(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    /// Add feature context
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn object_id(&self) -> Option<ObjectId> {
        self.object_id
    }

    pub fn resource_id(&self) -> Option<ResourceId> {
        self.resource_id
    }

    pub fn feature(&self) -> Option<&str> {
        self.feature.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
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
        if let Some(object_id) = self.object_id {
            write!(f, " (object: {})", object_id)?;
        }
        if let Some(resource_id) = self.resource_id {
            write!(f, " (resource: {})", resource_id)?;
        }
        if let Some(feature) = &self.feature {
            write!(f, " (feature: {})", feature)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for graph operations
///
/// Every variant aborts the single operation in progress. Mutations are not
/// transactional: the engine validates before its first write so that these
/// errors surface before any side effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    // ===== Feature Access =====
    /// Feature does not belong to the object's class, or the id is out of range
    #[error("Feature {feature} is not a feature of class {class}")]
    InvalidFeature { class: String, feature: String },

    /// Mutation targets a non-changeable feature
    #[error("Feature {feature} is not changeable")]
    ImmutableFeature { feature: String },

    /// Dynamic-feature access on an object without a property bag
    #[error("Object {object} has no dynamic feature storage")]
    UnsupportedDynamicAccess { object: ObjectId },

    // ===== Lookup =====
    #[error("Object not found: {object}")]
    ObjectNotFound { object: ObjectId },

    #[error("Resource not found: {resource}")]
    ResourceNotFound { resource: ResourceId },

    #[error("Class not found: {class}")]
    ClassNotFound { class: String },

    /// Abstract classes cannot be instantiated
    #[error("Class {class} is abstract")]
    AbstractClass { class: String },

    #[error("A resource with URI {uri} already exists")]
    DuplicateResourceUri { uri: String },

    // ===== Value Validation =====
    #[error("Feature {feature} expects {expected}, got {found}")]
    TypeMismatch {
        feature: String,
        expected: String,
        found: String,
    },

    /// Single-valued operation on a many-valued feature or vice versa
    #[error("Feature {feature} multiplicity mismatch (many-valued: {many})")]
    MultiplicityMismatch { feature: String, many: bool },

    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A replacement list contains the same value twice for a unique feature
    #[error("Feature {feature} is unique but the value list repeats an element")]
    DuplicateValue { feature: String },

    // ===== Structural =====
    /// Containing `object` under `container` would make containment cyclic
    #[error("Containing {object} under {container} would create a containment cycle")]
    ContainmentCycle {
        object: ObjectId,
        container: ObjectId,
    },

    /// Proxies carry no feature data and cannot be linked as containers or roots
    #[error("Object {object} is a proxy and cannot be mutated this way")]
    ProxyMutation { object: ObjectId },

    #[error("Graph invariant violated: {reason}")]
    InvariantViolation { reason: String },

    // ===== Setup =====
    #[error("Invalid metamodel: {reason}")]
    InvalidMetamodel { reason: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ModelError {
    /// Canonical kind of this error
    pub fn kind(&self) -> ExErrorKind {
        match self {
            ModelError::InvalidFeature { .. } => ExErrorKind::InvalidFeature,
            ModelError::ImmutableFeature { .. } => ExErrorKind::ImmutableFeature,
            ModelError::UnsupportedDynamicAccess { .. } => ExErrorKind::UnsupportedDynamicAccess,
            ModelError::ObjectNotFound { .. }
            | ModelError::ResourceNotFound { .. }
            | ModelError::ClassNotFound { .. } => ExErrorKind::NotFound,
            ModelError::AbstractClass { .. } => ExErrorKind::AbstractClass,
            ModelError::DuplicateResourceUri { .. } => ExErrorKind::AlreadyExists,
            ModelError::TypeMismatch { .. } => ExErrorKind::TypeMismatch,
            ModelError::MultiplicityMismatch { .. } => ExErrorKind::InvalidMultiplicity,
            ModelError::IndexOutOfBounds { .. } => ExErrorKind::IndexOutOfBounds,
            ModelError::DuplicateValue { .. } => ExErrorKind::DuplicateValue,
            ModelError::ContainmentCycle { .. } => ExErrorKind::ContainmentCycle,
            ModelError::ProxyMutation { .. } => ExErrorKind::ProxyMutation,
            ModelError::InvariantViolation { .. } => ExErrorKind::InvariantViolation,
            ModelError::InvalidMetamodel { .. } => ExErrorKind::InvalidMetamodel,
            ModelError::InvalidConfig { .. } => ExErrorKind::InvalidConfig,
            ModelError::Internal { .. } => ExErrorKind::Internal,
        }
    }
}

/// Conversion from ModelError to the canonical ExError
impl From<ModelError> for ExError {
    fn from(err: ModelError) -> Self {
        let base = ExError::new(err.kind()).with_message(err.to_string());
        match err {
            ModelError::InvalidFeature { feature, .. }
            | ModelError::ImmutableFeature { feature }
            | ModelError::TypeMismatch { feature, .. }
            | ModelError::MultiplicityMismatch { feature, .. }
            | ModelError::DuplicateValue { feature } => base.with_feature(feature),
            ModelError::UnsupportedDynamicAccess { object }
            | ModelError::ObjectNotFound { object }
            | ModelError::ProxyMutation { object }
            | ModelError::ContainmentCycle { object, .. } => base.with_object_id(object),
            ModelError::ResourceNotFound { resource } => base.with_resource_id(resource),
            _ => base,
        }
    }
}
