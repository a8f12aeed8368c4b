//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`AutorunError`] via `#[from]`.

/// Top-level error for the autorun workspace.
#[derive(Debug, thiserror::Error)]
pub enum AutorunError {
    #[error("validation error")]
    Validation(#[from] ValidationError),
}

/// A rule or catalog violated one of its construction invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The minimum delay is larger than the maximum delay.
    #[error("minimum delay {min} exceeds maximum delay {max}")]
    InvalidDelay { min: u32, max: u32 },

    /// A repeat budget of zero would make the rule unable to ever execute.
    #[error("repeat budget must be at least 1")]
    ZeroRepeat,

    /// Two cardinality modifiers that cannot be combined.
    #[error("cardinality modifiers `{0}` and `{1}` cannot be combined")]
    ConflictingCardinality(&'static str, &'static str),

    /// A requirement rule was registered without any requirement.
    #[error("requirement rule has no requirements")]
    NoRequirements,

    /// A name was supplied but is blank.
    #[error("rule name must not be empty")]
    EmptyName,
}
