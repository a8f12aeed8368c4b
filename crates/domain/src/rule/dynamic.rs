//! Dynamic rule — a rule assembled from closures with a builder.

use std::sync::Arc;

use crate::context::Context;
use crate::error::ValidationError;
use crate::interaction::Interaction;

use super::{ActionFactory, Delay, Hook, Predicate};

/// How often a rule may execute before it has to be re-selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cardinality {
    /// Up to `n` executions per activation.
    Repeat(u32),
    /// Never exhausts; keeps re-invoking its action while it passes.
    Many,
    /// One execution per time step, restored at the next tick.
    OncePerTick,
}

impl Cardinality {
    fn budget(self) -> u32 {
        match self {
            Self::Repeat(n) => n,
            Self::Many | Self::OncePerTick => 1,
        }
    }
}

enum DelaySource<S> {
    Fixed(Delay),
    Dynamic(Box<dyn Fn(&Context<S>) -> Delay + Send + Sync>),
}

enum MessageSource<S> {
    Static(Vec<String>),
    Dynamic(Box<dyn Fn(&Context<S>) -> Vec<String> + Send + Sync>),
}

/// A rule built from a predicate chain and an action factory.
///
/// Configuration is fixed once [`DynamicRuleBuilder::build`] returns; the
/// only state that changes afterwards is the repeat counter of the current
/// activation.
pub struct DynamicRule<S> {
    name: Option<String>,
    guards: Vec<Predicate<S>>,
    when: Vec<Predicate<S>>,
    until: Option<Predicate<S>>,
    continues: Option<Predicate<S>>,
    then: Option<ActionFactory<S>>,
    cardinality: Cardinality,
    delay: DelaySource<S>,
    skip_if_null: bool,
    noop: bool,
    messages: Option<MessageSource<S>>,
    on_click: Option<Hook<S>>,
    callback: Option<Hook<S>>,
    on_complete: Option<Hook<S>>,
    repeats_left: u32,
}

impl<S> DynamicRule<S> {
    /// Create a builder for constructing a [`DynamicRule`].
    #[must_use]
    pub fn builder() -> DynamicRuleBuilder<S> {
        DynamicRuleBuilder {
            name: None,
            when: Vec::new(),
            until: None,
            continues: None,
            then: None,
            many: false,
            once_per_tick: false,
            repeat: None,
            delay: DelaySource::Fixed(Delay::NONE),
            skip_if_null: false,
            noop: false,
            messages: None,
            on_click: None,
            callback: None,
            on_complete: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Guards, then the `when` chain, must all hold; `until` must not; the
    /// budget must not be spent. With `skip_if_null`, the action factory must
    /// also produce something.
    ///
    /// A spent once-per-tick budget does not stop the rule from passing: it
    /// stays current, unable to execute, until the next tick restores it.
    #[must_use]
    pub fn passes(&self, ctx: &Context<S>) -> bool {
        self.guards.iter().chain(&self.when).all(|p| p(ctx))
            && !self.until.as_ref().is_some_and(|p| p(ctx))
            && (self.resets_on_tick() || self.can_execute())
            && (!self.skip_if_null || self.run(ctx).is_some())
    }

    #[must_use]
    pub fn continues(&self, ctx: &Context<S>) -> bool {
        self.continues.as_ref().is_some_and(|p| p(ctx))
    }

    #[must_use]
    pub fn can_execute(&self) -> bool {
        self.cardinality == Cardinality::Many || self.repeats_left > 0
    }

    #[must_use]
    pub fn run(&self, ctx: &Context<S>) -> Option<Interaction<S>> {
        if self.noop {
            return None;
        }
        self.then.as_ref().and_then(|factory| factory(ctx))
    }

    /// Restore the repeat budget. Once-per-tick rules only restore on tick.
    pub fn reset(&mut self) {
        if self.cardinality != Cardinality::OncePerTick {
            self.repeats_left = self.cardinality.budget();
        }
    }

    pub fn reset_on_tick(&mut self) {
        if self.cardinality == Cardinality::OncePerTick {
            self.repeats_left = self.cardinality.budget();
        }
    }

    #[must_use]
    pub fn resets_on_tick(&self) -> bool {
        self.cardinality == Cardinality::OncePerTick
    }

    pub fn callback(&self, ctx: &mut Context<S>) {
        if let Some(hook) = &self.callback {
            hook(ctx);
        }
    }

    pub fn complete_callback(&self, ctx: &mut Context<S>) {
        if let Some(hook) = &self.on_complete {
            hook(ctx);
        }
    }

    pub fn on_click(&self, ctx: &mut Context<S>) {
        if let Some(hook) = &self.on_click {
            hook(ctx);
        }
    }

    pub fn use_repeat(&mut self) {
        if self.cardinality != Cardinality::Many {
            self.repeats_left = self.repeats_left.saturating_sub(1);
        }
    }

    #[must_use]
    pub fn repeats_left(&self) -> u32 {
        match self.cardinality {
            Cardinality::Many => u32::MAX,
            Cardinality::Repeat(_) | Cardinality::OncePerTick => self.repeats_left,
        }
    }

    #[must_use]
    pub fn delay(&self, ctx: &Context<S>) -> Delay {
        match &self.delay {
            DelaySource::Fixed(delay) => *delay,
            DelaySource::Dynamic(f) => f(ctx).normalized(),
        }
    }

    #[must_use]
    pub fn messages(&self, ctx: &Context<S>) -> Option<Vec<String>> {
        match self.messages.as_ref()? {
            MessageSource::Static(lines) => Some(lines.clone()),
            MessageSource::Dynamic(f) => Some(f(ctx)),
        }
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.noop
    }

    pub(crate) fn guard(&mut self, predicate: Predicate<S>) {
        self.guards.push(predicate);
    }
}

/// Step-by-step builder for [`DynamicRule`].
pub struct DynamicRuleBuilder<S> {
    name: Option<String>,
    when: Vec<Predicate<S>>,
    until: Option<Predicate<S>>,
    continues: Option<Predicate<S>>,
    then: Option<ActionFactory<S>>,
    many: bool,
    once_per_tick: bool,
    repeat: Option<u32>,
    delay: DelaySource<S>,
    skip_if_null: bool,
    noop: bool,
    messages: Option<MessageSource<S>>,
    on_click: Option<Hook<S>>,
    callback: Option<Hook<S>>,
    on_complete: Option<Hook<S>>,
}

impl<S> DynamicRuleBuilder<S> {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a predicate. Repeated calls are AND-combined.
    #[must_use]
    pub fn when(mut self, predicate: impl Fn(&Context<S>) -> bool + Send + Sync + 'static) -> Self {
        self.when.push(Arc::new(predicate));
        self
    }

    /// Stop passing while `predicate` holds.
    #[must_use]
    pub fn until(mut self, predicate: impl Fn(&Context<S>) -> bool + Send + Sync + 'static) -> Self {
        self.until = Some(Arc::new(predicate));
        self
    }

    /// Keep the rule current while `predicate` holds, even once it stops passing.
    #[must_use]
    pub fn continues(
        mut self,
        predicate: impl Fn(&Context<S>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.continues = Some(Arc::new(predicate));
        self
    }

    /// Set the action factory.
    #[must_use]
    pub fn then(
        mut self,
        factory: impl Fn(&Context<S>) -> Option<Interaction<S>> + Send + Sync + 'static,
    ) -> Self {
        self.then = Some(Box::new(factory));
        self
    }

    /// Stay current and keep executing while the rule passes.
    #[must_use]
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Execute at most once per time step.
    #[must_use]
    pub fn once_per_tick(mut self) -> Self {
        self.once_per_tick = true;
        self
    }

    #[must_use]
    pub fn repeat(mut self, times: u32) -> Self {
        self.repeat = Some(times);
        self
    }

    /// Fixed delay bounds in ticks.
    #[must_use]
    pub fn delay(mut self, min: u32, max: u32) -> Self {
        self.delay = DelaySource::Fixed(Delay::new(min, max));
        self
    }

    /// Delay bounds computed from the context at activation time.
    #[must_use]
    pub fn delay_with(mut self, f: impl Fn(&Context<S>) -> Delay + Send + Sync + 'static) -> Self {
        self.delay = DelaySource::Dynamic(Box::new(f));
        self
    }

    /// Treat a factory that yields nothing as "does not pass".
    #[must_use]
    pub fn skip_if_null(mut self) -> Self {
        self.skip_if_null = true;
        self
    }

    /// Report status messages only, never an interaction.
    #[must_use]
    pub fn noop(mut self) -> Self {
        self.noop = true;
        self
    }

    /// Append a static status line.
    #[must_use]
    pub fn message(mut self, line: impl Into<String>) -> Self {
        if let Some(MessageSource::Static(lines)) = &mut self.messages {
            lines.push(line.into());
        } else {
            self.messages = Some(MessageSource::Static(vec![line.into()]));
        }
        self
    }

    /// Compute status lines from the context.
    #[must_use]
    pub fn messages_with(
        mut self,
        f: impl Fn(&Context<S>) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.messages = Some(MessageSource::Dynamic(Box::new(f)));
        self
    }

    /// Hook fired when an external event consumes this rule's interaction.
    #[must_use]
    pub fn on_click(mut self, hook: impl Fn(&mut Context<S>) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Box::new(hook));
        self
    }

    /// Hook fired after every execution.
    #[must_use]
    pub fn callback(mut self, hook: impl Fn(&mut Context<S>) + Send + Sync + 'static) -> Self {
        self.callback = Some(Box::new(hook));
        self
    }

    /// Hook fired after the execution that exhausts the repeat budget.
    #[must_use]
    pub fn on_complete(mut self, hook: impl Fn(&mut Context<S>) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    /// Consume the builder, validate, and return a [`DynamicRule`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when:
    /// - the name is blank ([`ValidationError::EmptyName`])
    /// - fixed delay bounds are inverted ([`ValidationError::InvalidDelay`])
    /// - `repeat(0)` was requested ([`ValidationError::ZeroRepeat`])
    /// - cardinality modifiers conflict ([`ValidationError::ConflictingCardinality`])
    pub fn build(self) -> Result<DynamicRule<S>, ValidationError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ValidationError::EmptyName);
        }
        if let DelaySource::Fixed(Delay { min, max }) = self.delay
            && min > max
        {
            return Err(ValidationError::InvalidDelay { min, max });
        }
        if self.repeat == Some(0) {
            return Err(ValidationError::ZeroRepeat);
        }
        let custom_repeat = self.repeat.is_some_and(|n| n != 1);
        let cardinality = match (self.many, self.once_per_tick) {
            (true, true) => {
                return Err(ValidationError::ConflictingCardinality(
                    "many",
                    "once_per_tick",
                ));
            }
            (true, false) if custom_repeat => {
                return Err(ValidationError::ConflictingCardinality("many", "repeat"));
            }
            (false, true) if custom_repeat => {
                return Err(ValidationError::ConflictingCardinality(
                    "once_per_tick",
                    "repeat",
                ));
            }
            (true, false) => Cardinality::Many,
            (false, true) => Cardinality::OncePerTick,
            (false, false) => Cardinality::Repeat(self.repeat.unwrap_or(1)),
        };

        Ok(DynamicRule {
            name: self.name,
            guards: Vec::new(),
            when: self.when,
            until: self.until,
            continues: self.continues,
            then: self.then,
            cardinality,
            delay: self.delay,
            skip_if_null: self.skip_if_null,
            noop: self.noop,
            messages: self.messages,
            on_click: self.on_click,
            callback: self.callback,
            on_complete: self.on_complete,
            repeats_left: cardinality.budget(),
        })
    }
}
