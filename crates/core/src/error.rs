/// Domain error taxonomy shared by every layer of the library.
///
/// Store implementations translate backend failures into [`CoreError::Storage`];
/// guarded writes surface [`CoreError::NotFound`] / [`CoreError::AlreadyExists`],
/// and version-guarded writes surface [`CoreError::Conflict`].
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Entity already exists: {entity} with id {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// A guarded write lost a race with a concurrent change.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("External system error ({system}): {message}")]
    ExternalSystem {
        system: &'static str,
        message: String,
    },

    /// The compensating write after an external failure did not apply.
    /// Primary store and external system may now disagree.
    #[error(
        "Compensation failed during {operation}: original error: {original}; \
         compensation error: {compensation}"
    )]
    CompensationFailed {
        operation: &'static str,
        original: String,
        compensation: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] with any displayable id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`CoreError::AlreadyExists`] with any displayable id.
    pub fn already_exists(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    pub fn external(system: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalSystem {
            system,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization: {err}"))
    }
}
