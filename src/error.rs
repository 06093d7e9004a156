//! Diagnostic error types for the journal core.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives
//! so a host application can render an error code and a hint next to the message.
//! None of these errors is fatal: the store falls back to defaults and keeps going.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::paths::PathError;

/// Top-level error type for the journal core.
#[derive(Debug, Error, Diagnostic)]
pub enum JournalError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

/// Convenience alias used by fallible top-level APIs.
pub type JournalResult<T> = std::result::Result<T, JournalError>;

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(mirror::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(mirror::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             The in-memory journal stays authoritative for this session; \
             move the data directory aside if the problem persists."
        )
    )]
    Redb { message: String },

    #[error("serialization error for \"{key}\": {message}")]
    #[diagnostic(
        code(mirror::store::serde),
        help("The record could not be encoded as JSON. This is a bug in the caller's types.")
    )]
    Serialization { key: String, message: String },

    #[error("storage quota exceeded writing \"{key}\": {needed} bytes needed, {quota} allowed")]
    #[diagnostic(
        code(mirror::store::quota),
        help(
            "The storage backend is full. Entries with large photos take the most room; \
             the journal keeps working from memory until space is freed."
        )
    )]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Rejections from the domain model. The store state is unchanged when one
/// of these is returned from `dispatch`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ValidationError {
    #[error("intensity {value} is outside 0..=100")]
    #[diagnostic(
        code(mirror::validation::intensity),
        help("Use `Intensity::clamped` for slider input that may overshoot.")
    )]
    IntensityOutOfRange { value: i64 },

    #[error("emotion tag #{index} is blank")]
    #[diagnostic(
        code(mirror::validation::blank_tag),
        help("Remove empty tags before committing the entry.")
    )]
    BlankEmotion { index: usize },

    #[error("growth goal text is blank")]
    #[diagnostic(
        code(mirror::validation::blank_goal),
        help("A seed needs a short intention, e.g. \"When stressed, I will breathe.\"")
    )]
    BlankGoal,

    #[error("entry id is blank")]
    #[diagnostic(
        code(mirror::validation::blank_id),
        help("Leave the id unset to have one generated.")
    )]
    BlankId,

    #[error("entry id \"{id}\" already exists in the history")]
    #[diagnostic(
        code(mirror::validation::duplicate_id),
        help("Entry ids must be unique; leave the id unset to have one generated.")
    )]
    DuplicateId { id: String },

    #[error("entry \"{id}\" already carries a growth goal")]
    #[diagnostic(
        code(mirror::validation::goal_exists),
        help("An entry holds at most one seed. Plant the new seed on a fresh entry.")
    )]
    GoalAlreadyPlanted { id: String },

    #[error("garden is full: {active} seeds growing, limit is {limit}")]
    #[diagnostic(
        code(mirror::validation::garden_full),
        help(
            "Complete an active seed first, or raise `maxActiveGoals` (3, 5 or 7) in preferences."
        )
    )]
    GardenFull { active: usize, limit: usize },

    #[error("max active goals must be 3, 5 or 7, got {value}")]
    #[diagnostic(code(mirror::validation::max_active_goals))]
    InvalidGoalLimit { value: i64 },

    #[error("no frozen capture is waiting for reflection")]
    #[diagnostic(
        code(mirror::validation::no_capture),
        help("Stage a capture with `Action::FreezeCapture` before thawing it.")
    )]
    NoPendingCapture,
}
