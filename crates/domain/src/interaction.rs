//! Interaction — one pending external effect produced by a rule.
//!
//! An [`Interaction`] is created by a rule's action factory from whatever it
//! read out of the context at that moment. It then leaves the engine through
//! exactly one of two channels:
//! - **executed** by the engine itself (autonomous mode), consuming it, or
//! - **prepared** when an externally observed event with the same label
//!   consumes it (interception mode).
//!
//! If neither happens before the next resolution, it is simply dropped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::Context;

type Effect<S> = Box<dyn FnOnce(&mut Context<S>) + Send>;

/// Lifecycle of an [`Interaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    /// Produced and waiting to be consumed.
    Armed,
    /// Consumed by an observed external event.
    Prepared,
}

/// A labelled, one-shot external effect.
pub struct Interaction<S> {
    label: String,
    effect: Effect<S>,
    state: InteractionState,
}

impl<S> Interaction<S> {
    /// Create an interaction whose autonomous execution runs `effect`.
    pub fn new(
        label: impl Into<String>,
        effect: impl FnOnce(&mut Context<S>) + Send + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            effect: Box::new(effect),
            state: InteractionState::Armed,
        }
    }

    /// Create an interaction that does nothing when executed autonomously.
    ///
    /// Useful when the effect only ever happens through an external event.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self::new(label, |_| {})
    }

    /// Human-readable label, also used to match observed events.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Whether an observed event corresponds to this interaction.
    #[must_use]
    pub fn matches(&self, observed: &ObservedInteraction) -> bool {
        self.label == observed.label
    }

    /// Mark the interaction as consumed by an external event.
    pub fn prepare(&mut self) {
        self.state = InteractionState::Prepared;
    }

    /// Fire the effect. Consumes the interaction so it can only run once.
    pub fn execute(self, ctx: &mut Context<S>) {
        (self.effect)(ctx);
    }
}

impl<S> fmt::Debug for Interaction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("label", &self.label)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// An interaction event observed in the external world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedInteraction {
    pub label: String,
}

impl ObservedInteraction {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_run_effect_against_context_when_executed() {
        let mut ctx = Context::new(0_u32);
        let interaction = Interaction::new("Increment", |ctx: &mut Context<u32>| {
            *ctx.state_mut() += 1;
        });
        interaction.execute(&mut ctx);
        assert_eq!(*ctx.state(), 1);
    }

    #[test]
    fn should_capture_values_at_creation() {
        let mut ctx = Context::new(10_u32);
        let snapshot = *ctx.state();
        let interaction = Interaction::new("Double", move |ctx: &mut Context<u32>| {
            *ctx.state_mut() = snapshot * 2;
        });
        *ctx.state_mut() = 99;
        interaction.execute(&mut ctx);
        assert_eq!(*ctx.state(), 20);
    }

    #[test]
    fn should_start_armed_and_become_prepared() {
        let mut interaction = Interaction::<()>::labelled("Pickpocket");
        assert_eq!(interaction.state(), InteractionState::Armed);
        interaction.prepare();
        assert_eq!(interaction.state(), InteractionState::Prepared);
    }

    #[test]
    fn should_match_observed_event_by_label() {
        let interaction = Interaction::<()>::labelled("Eat Shark");
        assert!(interaction.matches(&ObservedInteraction::new("Eat Shark")));
        assert!(!interaction.matches(&ObservedInteraction::new("Drop Shark")));
    }
}
