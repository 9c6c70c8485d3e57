use thiserror::Error;
use crate::types::ids::EntryId;

#[derive(Error, Debug)]
pub enum Error {
    // Entry Validation Errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Adjustment must reference an original entry, not another adjustment: {0}")]
    AdjustmentOfAdjustment(EntryId),

    // Backing Store Errors
    #[error("Persistence error ({kind}): {message}")]
    Persistence {
        kind: PersistenceKind,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    // Day-file Errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Corrupt day-file {name}: {reason}")]
    CorruptFile {
        name: String,
        reason: String,
    },

    #[error("Unsupported day-file version: {file_version}, max supported: {max_supported}")]
    UnsupportedFileVersion {
        file_version: u32,
        max_supported: u32,
    },

    // Invariant Errors
    #[error("Invariant violation: {0}")]
    InvariantViolation(InvariantViolation),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(details: impl Into<String>) -> Self {
        Error::Validation(details.into())
    }

    pub fn persistence(kind: PersistenceKind, message: impl Into<String>) -> Self {
        Error::Persistence {
            kind,
            message: message.into(),
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence { .. })
    }
}

/// Sub-kind of a backing-store failure. Retry policy belongs to the caller,
/// which may need to re-authenticate first on `AuthExpired`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PersistenceKind {
    AuthExpired,
    Network,
    Quota,
    Unknown,
}

impl std::fmt::Display for PersistenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PersistenceKind::AuthExpired => "auth_expired",
            PersistenceKind::Network => "network",
            PersistenceKind::Quota => "quota",
            PersistenceKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub invariant: &'static str,
    pub details: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.details)
    }
}
