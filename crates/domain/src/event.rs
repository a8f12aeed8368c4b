//! Engine events — immutable records of what the runner decided and did.
//!
//! Events are produced while resolving rules, executing interactions and
//! toggling breaks. They carry no behavior; subscribers use them for logging,
//! overlays or tests.

use serde::{Deserialize, Serialize};

use crate::id::SessionId;
use crate::time::{Timestamp, now};

/// How an interaction left the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionChannel {
    /// The engine performed the interaction itself.
    Autonomous,
    /// An observed external event consumed the interaction.
    Intercepted,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEventKind {
    RuleActivated {
        rule: Option<String>,
    },
    RuleDeactivated {
        rule: Option<String>,
    },
    InteractionExecuted {
        rule: Option<String>,
        interaction: String,
        channel: ExecutionChannel,
    },
    /// The rule spent its last repeat.
    RuleCompleted {
        rule: Option<String>,
    },
    /// An intercepted event did not match the interaction the engine wanted.
    InterceptionMismatch {
        expected: String,
        observed: String,
    },
    BreakStarted,
    BreakEnded,
    /// A single rule's evaluation exceeded the per-rule budget.
    SlowRule {
        rule: Option<String>,
        elapsed_ms: u64,
    },
    /// A whole resolution pass exceeded the per-pass budget.
    SlowResolution {
        elapsed_ms: u64,
    },
}

/// An [`EngineEventKind`] stamped with its session and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub session: SessionId,
    pub at: Timestamp,
    #[serde(flatten)]
    pub kind: EngineEventKind,
}

impl EngineEvent {
    /// Stamp `kind` with the current time.
    #[must_use]
    pub fn new(session: SessionId, kind: EngineEventKind) -> Self {
        Self {
            session,
            at: now(),
            kind,
        }
    }
}
