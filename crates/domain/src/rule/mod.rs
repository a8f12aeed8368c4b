//! Rules — prioritized condition/action units competing to be "current".
//!
//! A [`Rule`] is one of a closed set of variants sharing a single capability
//! surface:
//! - [`DynamicRule`] — assembled with a builder from predicates, an action
//!   factory and cardinality/delay modifiers,
//! - [`RequirementRule`] — a hard gate that blocks every lower-priority rule
//!   while one of its requirements fails,
//! - [`BreakRule`] — the synthetic noop rule the engine switches to while a
//!   break is active.
//!
//! Priority is purely positional: the engine walks a [`RuleSet`] in order and
//! the first rule that passes wins.

mod dynamic;
mod requirement;
mod set;

pub use dynamic::{DynamicRule, DynamicRuleBuilder};
pub use requirement::{RequirementRule, RequirementRuleBuilder};
pub use set::RuleSet;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::interaction::Interaction;

/// Side-effect-free condition over the context.
pub type Predicate<S> = Arc<dyn Fn(&Context<S>) -> bool + Send + Sync>;

/// Closure run for its side effects on the context.
pub type Hook<S> = Box<dyn Fn(&mut Context<S>) + Send + Sync>;

/// Produces the interaction a rule wants to perform right now.
pub type ActionFactory<S> = Box<dyn Fn(&Context<S>) -> Option<Interaction<S>> + Send + Sync>;

/// Min/max delay bounds in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delay {
    pub min: u32,
    pub max: u32,
}

impl Delay {
    /// No delay at all.
    pub const NONE: Self = Self { min: 0, max: 0 };

    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Random delay of at most `max` ticks with no enforced minimum.
    #[must_use]
    pub const fn up_to(max: u32) -> Self {
        Self { min: 0, max }
    }

    /// Whether any delay applies.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.min == 0 && self.max == 0
    }

    /// Raise `max` to `min` if a dynamic source produced inverted bounds.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            min: self.min,
            max: self.max.max(self.min),
        }
    }
}

/// A rule in the priority list.
pub enum Rule<S> {
    Dynamic(DynamicRule<S>),
    Requirement(RequirementRule<S>),
    Break(BreakRule),
}

impl<S> Rule<S> {
    /// Display name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Dynamic(rule) => rule.name(),
            Self::Requirement(rule) => Some(rule.name()),
            Self::Break(rule) => Some(rule.name()),
        }
    }

    /// Whether the rule's trigger condition holds right now.
    ///
    /// Must be free of side effects: the engine calls it for every rule, in
    /// order, on every resolution pass. The break rule never passes on its
    /// own; the engine switches to it explicitly.
    #[must_use]
    pub fn passes(&self, ctx: &Context<S>) -> bool {
        match self {
            Self::Dynamic(rule) => rule.passes(ctx),
            Self::Requirement(rule) => rule.passes(ctx),
            Self::Break(_) => false,
        }
    }

    /// Whether an already-current rule should stay current even though
    /// [`passes`](Self::passes) no longer holds.
    #[must_use]
    pub fn continues(&self, ctx: &Context<S>) -> bool {
        match self {
            Self::Dynamic(rule) => rule.continues(ctx),
            Self::Requirement(_) | Self::Break(_) => false,
        }
    }

    /// `false` once the repeat budget of the current activation is spent.
    #[must_use]
    pub fn can_execute(&self) -> bool {
        match self {
            Self::Dynamic(rule) => rule.can_execute(),
            Self::Requirement(_) | Self::Break(_) => false,
        }
    }

    /// Produce the interaction to perform, or `None` to show messages instead.
    #[must_use]
    pub fn run(&self, ctx: &Context<S>) -> Option<Interaction<S>> {
        match self {
            Self::Dynamic(rule) => rule.run(ctx),
            Self::Requirement(_) | Self::Break(_) => None,
        }
    }

    /// Restore per-activation state. Idempotent; does not touch context flags.
    pub fn reset(&mut self) {
        if let Self::Dynamic(rule) = self {
            rule.reset();
        }
    }

    /// Restore state that is only reset at the start of a time step.
    pub fn reset_on_tick(&mut self) {
        if let Self::Dynamic(rule) = self {
            rule.reset_on_tick();
        }
    }

    /// Invoked after every successful execution, whatever the channel.
    pub fn callback(&self, ctx: &mut Context<S>) {
        if let Self::Dynamic(rule) = self {
            rule.callback(ctx);
        }
    }

    /// Invoked after the execution that exhausts the repeat budget.
    pub fn complete_callback(&self, ctx: &mut Context<S>) {
        if let Self::Dynamic(rule) = self {
            rule.complete_callback(ctx);
        }
    }

    /// Invoked when an external event consumes the rule's interaction.
    pub fn on_click(&self, ctx: &mut Context<S>) {
        if let Self::Dynamic(rule) = self {
            rule.on_click(ctx);
        }
    }

    pub fn use_repeat(&mut self) {
        if let Self::Dynamic(rule) = self {
            rule.use_repeat();
        }
    }

    /// Executions left in this activation. `u32::MAX` for unbounded rules.
    #[must_use]
    pub fn repeats_left(&self) -> u32 {
        match self {
            Self::Dynamic(rule) => rule.repeats_left(),
            Self::Requirement(_) | Self::Break(_) => 0,
        }
    }

    /// Delay bounds to arm when this rule becomes current.
    #[must_use]
    pub fn delay(&self, ctx: &Context<S>) -> Delay {
        match self {
            Self::Dynamic(rule) => rule.delay(ctx),
            Self::Requirement(_) | Self::Break(_) => Delay::NONE,
        }
    }

    #[must_use]
    pub fn min_delay(&self, ctx: &Context<S>) -> u32 {
        self.delay(ctx).min
    }

    #[must_use]
    pub fn max_delay(&self, ctx: &Context<S>) -> u32 {
        self.delay(ctx).max
    }

    /// Status text to display when [`run`](Self::run) yields nothing.
    #[must_use]
    pub fn messages(&self, ctx: &Context<S>) -> Option<Vec<String>> {
        match self {
            Self::Dynamic(rule) => rule.messages(ctx),
            Self::Requirement(rule) => rule.messages(ctx),
            Self::Break(rule) => Some(rule.messages()),
        }
    }

    /// Noop rules only ever report status, never an interaction.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Dynamic(rule) => rule.is_noop(),
            Self::Requirement(_) | Self::Break(_) => true,
        }
    }

    /// AND an extra guard onto the rule's predicate chain.
    pub fn guard(&mut self, predicate: Predicate<S>) {
        match self {
            Self::Dynamic(rule) => rule.guard(predicate),
            Self::Requirement(rule) => rule.guard(predicate),
            Self::Break(_) => {}
        }
    }
}

impl<S> fmt::Debug for Rule<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Dynamic(_) => "Dynamic",
            Self::Requirement(_) => "Requirement",
            Self::Break(_) => "Break",
        };
        f.debug_struct("Rule")
            .field("kind", &kind)
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

impl<S> From<DynamicRule<S>> for Rule<S> {
    fn from(rule: DynamicRule<S>) -> Self {
        Self::Dynamic(rule)
    }
}

impl<S> From<RequirementRule<S>> for Rule<S> {
    fn from(rule: RequirementRule<S>) -> Self {
        Self::Requirement(rule)
    }
}

impl<S> From<BreakRule> for Rule<S> {
    fn from(rule: BreakRule) -> Self {
        Self::Break(rule)
    }
}

/// Synthetic noop rule shown while a break is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakRule {
    name: String,
    message: String,
}

impl Default for BreakRule {
    fn default() -> Self {
        Self {
            name: "Break".to_string(),
            message: "Taking a break".to_string(),
        }
    }
}

impl BreakRule {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        vec![self.message.clone()]
    }
}
