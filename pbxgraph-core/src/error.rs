//! Error types for graph operations

use crate::types::ObjectKind;

/// Errors raised by the node store, the resolver and the mutation operations
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: ObjectKind, name: String },

    #[error("Group not found: '{component}' (while resolving '{path}')")]
    GroupPathNotFound { path: String, component: String },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: ObjectKind, name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize project document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl GraphError {
    pub fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        GraphError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: ObjectKind, name: impl Into<String>) -> Self {
        GraphError::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Lookup misses and duplicate-creation attempts are reported to callers as
    /// descriptive results instead of hard failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GraphError::NotFound { .. }
                | GraphError::GroupPathNotFound { .. }
                | GraphError::AlreadyExists { .. }
        )
    }
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(GraphError::not_found(ObjectKind::Target, "App").is_recoverable());
        assert!(GraphError::already_exists(ObjectKind::Group, "Models").is_recoverable());
        assert!(!GraphError::Validation("self dependency".into()).is_recoverable());
        assert!(!GraphError::InvalidArgument("bad".into()).is_recoverable());
    }

    #[test]
    fn test_group_path_message_names_component() {
        let err = GraphError::GroupPathNotFound {
            path: "Sources/Models/Deep".into(),
            component: "Models".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'Models'"));
        assert!(msg.contains("Sources/Models/Deep"));
    }
}
