use std::fmt;

use keel_types::TypeError;

/// Store operation that was running when an error occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Open,
    Put,
    Get,
    List,
    Scan,
    PutWorkspace,
    GetWorkspace,
    ListWorkspaces,
    Compact,
    Close,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Open => "open",
            Op::Put => "put",
            Op::Get => "get",
            Op::List => "list",
            Op::Scan => "scan",
            Op::PutWorkspace => "workspace put",
            Op::GetWorkspace => "workspace get",
            Op::ListWorkspaces => "workspace list",
            Op::Compact => "compact",
            Op::Close => "close",
        };
        f.write_str(name)
    }
}

/// Underlying cause of a storage fault.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored data failed an integrity check.
    #[error("corrupt log entry at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// A lock was poisoned by a panicking writer.
    #[error("lock poisoned")]
    Poisoned,

    /// An earlier write could not be rolled back, so the log on disk no
    /// longer matches what the store has acknowledged.
    #[error("record log unusable after a failed write at offset {offset}")]
    Unusable { offset: u64 },
}

impl From<bincode::Error> for Fault {
    fn from(err: bincode::Error) -> Self {
        Fault::Serialization(err)
    }
}

/// Errors from store operations.
///
/// `NotFound` and `Invalid` are expected conditions a caller can branch on.
/// `StorageFault` means the backend itself failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record or workspace does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The request was malformed: bad identity, missing scope field, or a
    /// workspace name that fails validation.
    #[error("invalid request: {reason}")]
    Invalid { reason: String },

    /// The backend failed while performing `op`.
    #[error("storage fault during {op} of {kind}{}: {source}", id_suffix(.id))]
    StorageFault {
        op: Op,
        kind: &'static str,
        id: Option<String>,
        source: Fault,
    },
}

fn id_suffix(id: &Option<String>) -> String {
    id.as_deref().map(|id| format!(" {id:?}")).unwrap_or_default()
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    pub fn fault(op: Op, kind: &'static str, id: Option<&str>, source: impl Into<Fault>) -> Self {
        Self::StorageFault {
            op,
            kind,
            id: id.map(str::to_string),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }

    pub fn is_storage_fault(&self) -> bool {
        matches!(self, Self::StorageFault { .. })
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        Self::invalid(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_message_names_operation_and_identity() {
        let err = StoreError::fault(
            Op::Put,
            "build",
            Some("42"),
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        let msg = err.to_string();
        assert!(msg.contains("put of build \"42\""), "{msg}");
        assert!(msg.contains("disk full"), "{msg}");
        assert!(err.is_storage_fault());
    }

    #[test]
    fn fault_without_identity() {
        let err = StoreError::fault(Op::Open, "log", None, Fault::Poisoned);
        assert_eq!(err.to_string(), "storage fault during open of log: lock poisoned");
    }

    #[test]
    fn type_errors_become_invalid() {
        let err: StoreError = keel_types::validate_workspace_name("-x").unwrap_err().into();
        assert!(err.is_invalid());
        assert!(!err.is_not_found());
    }

    #[test]
    fn serialization_fault_keeps_its_source() {
        use std::error::Error;
        let bincode_err: bincode::Error = Box::new(bincode::ErrorKind::SizeLimit);
        let fault = Fault::from(bincode_err);
        assert!(matches!(fault, Fault::Serialization(_)));
        assert!(fault.source().is_some());

        let err = StoreError::fault(Op::Put, "build", Some("1"), fault);
        let chain = err.source().and_then(|fault| fault.source());
        assert!(chain.is_some());
    }

    #[test]
    fn source_chain_is_preserved() {
        use std::error::Error;
        let err = StoreError::fault(Op::Get, "build", Some("1"), Fault::Poisoned);
        assert!(err.source().is_some());
    }
}
