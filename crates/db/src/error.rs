//! Typed error type for the traderdb crate.

use std::fmt;

use thiserror::Error;

/// The statement inside a multi-statement write that failed.
///
/// Carried by [`DbError::Transaction`] so callers and logs can tell a failed
/// `COPY` apart from a failed commit without parsing driver messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStep {
    Begin,
    InsertWatchlist,
    RenameWatchlist,
    ClearMemberships,
    InsertMemberships,
    DeleteWatchlist,
    Commit,
}

impl fmt::Display for TxStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin             => write!(f, "begin"),
            Self::InsertWatchlist   => write!(f, "insert watchlist"),
            Self::RenameWatchlist   => write!(f, "rename watchlist"),
            Self::ClearMemberships  => write!(f, "clear memberships"),
            Self::InsertMemberships => write!(f, "insert memberships"),
            Self::DeleteWatchlist   => write!(f, "delete watchlist"),
            Self::Commit            => write!(f, "commit"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    /// A read query failed to execute or its rows failed to decode.
    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i32 },

    /// A write failed part-way; the transaction has already been rolled back.
    #[error("transaction failed at {step}: {source}")]
    Transaction {
        step: TxStep,
        #[source]
        source: sqlx::Error,
    },

    /// A membership row referenced something that does not exist.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("deadline exceeded before the call completed")]
    DeadlineExceeded,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Build a `map_err` adapter that tags a driver error with the write step.
pub(crate) fn at(step: TxStep) -> impl FnOnce(sqlx::Error) -> DbError {
    move |source| DbError::Transaction { step, source }
}
