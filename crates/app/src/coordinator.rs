//! Runner — turns the engine's decisions into executions.
//!
//! The [`Runner`] owns one [`RuleEngine`] plus everything around it: the
//! rule catalog, the break gate, the statistics tracker and the event
//! publisher. It is driven by two triggers, [`Runner::on_tick`] and
//! [`Runner::on_observed_interaction`], and never spawns anything itself;
//! see [`RunnerService`](crate::service::RunnerService) for the async
//! single-writer wrapper.

use serde::Serialize;

use autorun_domain::context::Context;
use autorun_domain::error::ValidationError;
use autorun_domain::event::{EngineEvent, EngineEventKind, ExecutionChannel};
use autorun_domain::id::SessionId;
use autorun_domain::interaction::{Interaction, ObservedInteraction};
use autorun_domain::rule::{RequirementRule, Rule, RuleSet};
use autorun_domain::statistics::{StatisticLine, StatisticTracker};
use autorun_domain::time::format_ticks;

use crate::config::{BreakConfig, ExecutionStrategy, RunnerConfig};
use crate::engine::{RuleEngine, Slot};
use crate::ports::{BreakGate, EventPublisher, RuleCatalog};

/// What the caller should do with an observed external event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventVerdict {
    /// The event consumed the pending interaction.
    Intercepted,
    /// Block the event: the runner is not ready to act on anything.
    Consume,
    /// Let the event through untouched.
    Pass,
}

/// Serializable snapshot of the runner for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerStatus {
    pub session: SessionId,
    pub enabled: bool,
    pub strategy: ExecutionStrategy,
    pub on_break: bool,
    pub current_rule: Option<String>,
    pub next_interaction: Option<String>,
    pub favored_option: Option<String>,
    pub is_delaying: bool,
    pub repeats_left: u32,
    pub messages: Vec<String>,
    pub runtime: String,
    pub statistics: Vec<StatisticLine>,
}

/// Drives a [`RuleEngine`] from ticks and observed events.
pub struct Runner<C: RuleCatalog, G, P> {
    config: RunnerConfig,
    catalog: C,
    engine: RuleEngine<C::State>,
    gate: G,
    publisher: P,
    statistics: StatisticTracker,
    actions_this_tick: u32,
}

impl<C, G, P> Runner<C, G, P>
where
    C: RuleCatalog,
    C::State: 'static,
    G: BreakGate,
    P: EventPublisher,
{
    /// Build a runner and load the catalog's rules.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] raised by the catalog's setup.
    pub fn new(
        config: RunnerConfig,
        catalog: C,
        context: Context<C::State>,
        mut gate: G,
        publisher: P,
    ) -> Result<Self, ValidationError> {
        gate.configure(&config.breaks);
        let mut runner = Self {
            statistics: StatisticTracker::new(config.tick_duration()),
            engine: RuleEngine::new(context, Vec::new()),
            config,
            catalog,
            gate,
            publisher,
            actions_this_tick: 0,
        };
        runner.refresh()?;
        Ok(runner)
    }

    /// Make delay jitter reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.engine.reseed(seed);
        self
    }

    /// Rebuild the rule list from the catalog.
    ///
    /// The current rule is deactivated. An empty catalog installs a single
    /// requirement that never holds, so the status shows why nothing runs.
    ///
    /// # Errors
    ///
    /// Returns the catalog's [`ValidationError`]; the previous rules stay in
    /// place in that case.
    pub fn refresh(&mut self) -> Result<(), ValidationError> {
        let mut rules = RuleSet::new();
        self.catalog.setup(&mut rules)?;
        if rules.is_empty() {
            rules.add(
                RequirementRule::<C::State>::builder()
                    .must(|_| false, "No rules registered")
                    .build()?,
            );
        }
        tracing::info!(rules = rules.len(), "rules loaded");

        self.statistics.clear_displays();
        self.catalog.statistics(&mut self.statistics);
        self.engine.replace_rules(rules.into_rules());
        self.publish_events();
        Ok(())
    }

    /// Advance one time step.
    #[tracing::instrument(skip(self), fields(session = %self.session()))]
    pub fn on_tick(&mut self) {
        self.engine.context_mut().tick();
        self.actions_this_tick = 0;
        self.engine.tick_rules();

        let in_break = self.in_break();
        if self.config.enabled && self.config.process_on_tick {
            self.engine.resolve(in_break);
        }
        self.engine.update_delay();
        self.execute_autonomous();
        self.catalog
            .collect(self.engine.context_mut(), &mut self.statistics);

        if self.config.enabled && !in_break {
            self.statistics.tick();
        }
        if self.config.breaks.enabled {
            self.gate.tick();
        }
        self.publish_events();
    }

    /// Handle an interaction event observed in the external world.
    #[tracing::instrument(skip(self), fields(session = %self.session()))]
    pub fn on_observed_interaction(&mut self, observed: &ObservedInteraction) -> EventVerdict {
        let verdict = self.intercept(observed);

        if self.config.enabled && self.config.process_on_event {
            let in_break = self.in_break();
            self.engine.resolve(in_break);
        }
        self.execute_autonomous();
        self.catalog
            .collect(self.engine.context_mut(), &mut self.statistics);
        self.publish_events();
        verdict
    }

    fn intercept(&mut self, observed: &ObservedInteraction) -> EventVerdict {
        if !self.config.enabled || self.config.strategy != ExecutionStrategy::Interception {
            return EventVerdict::Pass;
        }
        let Some(expected) = self.favored_option().map(str::to_string) else {
            return if self.config.consume_when_idle {
                EventVerdict::Consume
            } else {
                EventVerdict::Pass
            };
        };

        if let Some(interaction) = self.engine.intercept(observed) {
            self.actions_this_tick += 1;
            self.engine
                .record_execution(interaction.label().to_string(), ExecutionChannel::Intercepted);
            return EventVerdict::Intercepted;
        }

        tracing::warn!(
            expected = %expected,
            observed = %observed.label,
            "favored interaction was not chosen"
        );
        self.publish(EngineEventKind::InterceptionMismatch {
            expected,
            observed: observed.label.clone(),
        });
        EventVerdict::Pass
    }

    /// Fire interactions until the step's budget is spent or nothing is ready.
    fn execute_autonomous(&mut self) {
        if self.config.strategy != ExecutionStrategy::Autonomous {
            return;
        }
        while self.is_ready() {
            self.engine.update_interaction();
            let Some(label) = self.engine.execute_next() else {
                break;
            };
            self.actions_this_tick += 1;
            self.engine
                .record_execution(label, ExecutionChannel::Autonomous);
            let in_break = self.in_break();
            self.engine.resolve(in_break);
        }
    }

    fn in_break(&self) -> bool {
        self.config.breaks.enabled && self.gate.is_active()
    }

    /// Enabled, a rule is current with budget left, no delay is pending and
    /// the step's action budget is not spent.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.config.enabled
            && self.engine.can_execute()
            && !self.engine.is_delaying()
            && self.actions_this_tick < self.config.actions_per_tick
    }

    /// Label of the interaction an intercepted event should match.
    #[must_use]
    pub fn favored_option(&self) -> Option<&str> {
        if self.is_ready() {
            self.engine.next_interaction().map(Interaction::label)
        } else {
            None
        }
    }

    /// Turning the runner off deactivates the current rule. Flags and timers
    /// keep counting down while it is off.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled == enabled {
            return;
        }
        self.config.enabled = enabled;
        tracing::info!(enabled, "runner toggled");
        if !enabled {
            self.engine.deactivate();
        }
        self.publish_events();
    }

    /// Apply new break settings and restart the gate's schedule.
    pub fn configure_breaks(&mut self, breaks: BreakConfig) {
        self.config.breaks = breaks;
        self.gate.configure(&breaks);
    }

    #[must_use]
    pub fn session(&self) -> SessionId {
        self.engine.context().session()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn context(&self) -> &Context<C::State> {
        self.engine.context()
    }

    pub fn context_mut(&mut self) -> &mut Context<C::State> {
        self.engine.context_mut()
    }

    pub fn statistics(&self) -> &StatisticTracker {
        &self.statistics
    }

    pub fn statistics_mut(&mut self) -> &mut StatisticTracker {
        &mut self.statistics
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut G {
        &mut self.gate
    }

    pub fn current_rule(&self) -> Option<&Rule<C::State>> {
        self.engine.current_rule()
    }

    pub fn next_interaction(&self) -> Option<&Interaction<C::State>> {
        self.engine.next_interaction()
    }

    pub fn messages(&self) -> &[String] {
        self.engine.messages()
    }

    #[must_use]
    pub fn is_delaying(&self) -> bool {
        self.engine.is_delaying()
    }

    #[must_use]
    pub fn rule_repeats_left(&self) -> u32 {
        self.engine.repeats_left()
    }

    #[must_use]
    pub fn status(&self) -> RunnerStatus {
        RunnerStatus {
            session: self.session(),
            enabled: self.config.enabled,
            strategy: self.config.strategy,
            on_break: self.engine.current_slot() == Some(Slot::Break),
            current_rule: self
                .engine
                .current_rule()
                .and_then(Rule::name)
                .map(str::to_string),
            next_interaction: self
                .engine
                .next_interaction()
                .map(|i| i.label().to_string()),
            favored_option: self.favored_option().map(str::to_string),
            is_delaying: self.engine.is_delaying(),
            repeats_left: self.engine.repeats_left(),
            messages: self.engine.messages().to_vec(),
            runtime: format_ticks(self.statistics.ticks(), self.config.tick_duration()),
            statistics: self.statistics.lines(),
        }
    }

    fn publish(&self, kind: EngineEventKind) {
        self.publisher.publish(EngineEvent::new(self.session(), kind));
    }

    fn publish_events(&mut self) {
        for kind in self.engine.drain_events() {
            self.publish(kind);
        }
    }
}
