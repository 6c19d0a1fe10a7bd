//! Unified error type for the card ledger.
//!
//! Every operation either applies its whole effect or returns one of these.
//! Variants carry the key, guard, or amounts involved so the dispatcher can
//! surface them verbatim.

use thiserror::Error;

/// All failures the ledger can report.
#[derive(Debug, Error)]
pub enum Error {
    /// A role, ownership, or lifecycle guard rejected the operation.
    #[error("Permission denied for {action}: {reason}")]
    PermissionDenied {
        /// Operation that was attempted
        action: &'static str,
        /// Which guard failed
        reason: String,
    },

    /// The addressed entity does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Entity class (card, template, user, ...)
        kind: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Creation of an entity whose key is already taken.
    #[error("{kind} '{id}' already exists")]
    AlreadyExists {
        /// Entity class
        kind: &'static str,
        /// Identifier that collided
        id: String,
    },

    /// Unparseable number or boolean, malformed identifier, wrong arity.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument
        message: String,
    },

    /// A debit exceeds the current card balance.
    #[error(
        "Insufficient funds on card '{card_id}': balance money={money} point={point}, requested money={needed_money} point={needed_point}"
    )]
    InsufficientFunds {
        /// Card that would have been debited
        card_id: String,
        /// Current money balance
        money: i64,
        /// Current point balance
        point: i64,
        /// Requested money debit
        needed_money: i64,
        /// Requested point debit
        needed_point: i64,
    },

    /// Stored bytes do not parse into the expected record shape.
    #[error("Corrupt record at '{key}': {message}")]
    CorruptRecord {
        /// Store key holding the bad record
        key: String,
        /// Decoder message
        message: String,
    },

    /// The underlying store failed a get, put, or delete.
    #[error("Storage failure: {message}")]
    StorageFailure {
        /// Store-specific failure description
        message: String,
    },

    /// A multi-key commit failed and could not be rolled back.
    #[error("Inconsistent commit, keys left partially written: {}", .keys.join(", "))]
    Inconsistent {
        /// Keys whose previous value could not be restored
        keys: Vec<String>,
    },

    /// Configuration file or environment problem.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// I/O error while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a [`Error::PermissionDenied`].
    pub fn denied(action: &'static str, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action,
            reason: reason.into(),
        }
    }

    /// Builds a [`Error::NotFound`].
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Builds a [`Error::AlreadyExists`].
    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    /// Builds a [`Error::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Stable name of the error kind, as surfaced by the dispatcher.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "PermissionDenied",
            Self::NotFound { .. } => "NotFound",
            Self::AlreadyExists { .. } => "AlreadyExists",
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::InsufficientFunds { .. } => "InsufficientFunds",
            Self::CorruptRecord { .. } => "CorruptRecord",
            Self::StorageFailure { .. } | Self::Io(_) => "StorageFailure",
            Self::Inconsistent { .. } => "Inconsistent",
            Self::Config { .. } => "Config",
        }
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(value: sea_orm::DbErr) -> Self {
        Self::StorageFailure {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
