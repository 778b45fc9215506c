use thiserror::Error;

/// Business-rule refusals. These are structured outcomes reported back to the
/// caller, not defects: the engine validated the request and declined it
/// before touching any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The task already has a completion recorded for today's calendar day.
    #[error("task already completed today")]
    AlreadyCompletedToday,

    /// The shop item is already in the user's inventory.
    #[error("item already unlocked")]
    AlreadyPurchased,

    /// The user's coin balance cannot cover the item cost.
    #[error("not enough coins")]
    InsufficientFunds,

    /// The referenced quest/challenge/shop template does not exist in the catalog.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// The quest or challenge instance is already in a terminal state.
    #[error("instance already completed")]
    AlreadyCompleted,
}

/// Errors that can arise while running engine operations or talking to the
/// storage layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, seed files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present or not owned by
    /// the caller.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// A validated business-rule refusal; no state was changed.
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),
}

impl EngineError {
    /// True when the error is a business refusal rather than an
    /// infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Rejected(_))
    }
}
