use thiserror::Error;

/// Errors produced while validating records and names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid workspace name {name:?}: {reason}")]
    InvalidWorkspaceName { name: String, reason: String },

    #[error("invalid {kind} id {id:?}: {reason}")]
    InvalidId {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("invalid {kind} {id:?}: {reason}")]
    InvalidScope {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("invalid {kind} {id:?}: {reason}")]
    MissingField {
        kind: &'static str,
        id: String,
        reason: String,
    },
}
