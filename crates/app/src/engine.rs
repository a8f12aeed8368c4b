//! Rule engine — selects, activates and re-validates the current rule.
//!
//! Every trigger (a time step or an observed event) runs the same
//! [`RuleEngine::resolve`] pass:
//!
//! 1. While a break is active, the break rule takes over and nothing else is
//!    considered.
//! 2. Rules are scanned in declared order and the first match wins. The
//!    current rule also matches while its `continues` predicate holds, but a
//!    higher-priority rule that passes still preempts it.
//! 3. A current rule that neither passes nor continues is deactivated;
//!    otherwise its interaction is refreshed against the latest context.
//!
//! The engine never fires interactions on its own. The
//! [`Runner`](crate::coordinator::Runner) decides when to execute and calls
//! back into [`RuleEngine::execute_next`], [`RuleEngine::intercept`] and
//! [`RuleEngine::record_execution`].

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use autorun_domain::context::Context;
use autorun_domain::event::{EngineEventKind, ExecutionChannel};
use autorun_domain::interaction::{Interaction, ObservedInteraction};
use autorun_domain::rule::{BreakRule, Rule};

/// Rule checks slower than this are reported.
pub const SLOW_RULE: Duration = Duration::from_millis(10);
/// Whole resolution passes slower than this are reported.
pub const SLOW_RESOLUTION: Duration = Duration::from_millis(40);

const NOTHING_TO_DO: &str = "Nothing to do (no interaction)";

/// Identity of the current rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Position in the rule list.
    Rule(usize),
    /// The synthetic break rule.
    Break,
}

fn rule_at<'a, S>(rules: &'a [Rule<S>], break_rule: &'a Rule<S>, slot: Slot) -> &'a Rule<S> {
    match slot {
        Slot::Rule(index) => &rules[index],
        Slot::Break => break_rule,
    }
}

fn rule_at_mut<'a, S>(
    rules: &'a mut [Rule<S>],
    break_rule: &'a mut Rule<S>,
    slot: Slot,
) -> &'a mut Rule<S> {
    match slot {
        Slot::Rule(index) => &mut rules[index],
        Slot::Break => break_rule,
    }
}

fn owned_name<S>(rule: &Rule<S>) -> Option<String> {
    rule.name().map(str::to_string)
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Owns the rule list, the context and the current-rule state.
pub struct RuleEngine<S> {
    rules: Vec<Rule<S>>,
    break_rule: Rule<S>,
    context: Context<S>,
    current: Option<Slot>,
    next_interaction: Option<Interaction<S>>,
    messages: Vec<String>,
    is_delaying: bool,
    rng: StdRng,
    events: Vec<EngineEventKind>,
}

impl<S> RuleEngine<S> {
    /// Create an idle engine over `rules` in priority order.
    pub fn new(context: Context<S>, rules: Vec<Rule<S>>) -> Self {
        Self::with_rng(context, rules, StdRng::from_entropy())
    }

    /// Same as [`new`](Self::new) with reproducible delay jitter.
    pub fn with_seed(context: Context<S>, rules: Vec<Rule<S>>, seed: u64) -> Self {
        Self::with_rng(context, rules, StdRng::seed_from_u64(seed))
    }

    fn with_rng(context: Context<S>, rules: Vec<Rule<S>>, rng: StdRng) -> Self {
        Self {
            rules,
            break_rule: BreakRule::default().into(),
            context,
            current: None,
            next_interaction: None,
            messages: Vec::new(),
            is_delaying: false,
            rng,
            events: Vec::new(),
        }
    }

    /// Replace the delay jitter source with a seeded one.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn context(&self) -> &Context<S> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context<S> {
        &mut self.context
    }

    pub fn rules(&self) -> &[Rule<S>] {
        &self.rules
    }

    /// Swap in a freshly built rule list. The current rule is deactivated first.
    pub fn replace_rules(&mut self, rules: Vec<Rule<S>>) {
        self.deactivate();
        self.rules = rules;
    }

    #[must_use]
    pub fn current_slot(&self) -> Option<Slot> {
        self.current
    }

    pub fn current_rule(&self) -> Option<&Rule<S>> {
        self.current
            .map(|slot| rule_at(&self.rules, &self.break_rule, slot))
    }

    pub fn next_interaction(&self) -> Option<&Interaction<S>> {
        self.next_interaction.as_ref()
    }

    /// Status lines shown while the current rule has no interaction.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    #[must_use]
    pub fn is_delaying(&self) -> bool {
        self.is_delaying
    }

    /// Whether a rule is current and has budget left.
    #[must_use]
    pub fn can_execute(&self) -> bool {
        self.current_rule().is_some_and(Rule::can_execute)
    }

    /// Repeats left in the current activation, `1` while idle.
    #[must_use]
    pub fn repeats_left(&self) -> u32 {
        self.current_rule().map_or(1, Rule::repeats_left)
    }

    /// Run one resolution pass. `in_break` is the break gate's verdict.
    pub fn resolve(&mut self, in_break: bool) {
        let started = Instant::now();

        if in_break {
            if self.current != Some(Slot::Break) {
                self.deactivate();
                self.activate(Slot::Break);
            }
            return;
        }
        if self.current == Some(Slot::Break) {
            self.deactivate();
        }

        let mut matched = None;
        for (index, rule) in self.rules.iter().enumerate() {
            let rule_started = Instant::now();
            let is_current = self.current == Some(Slot::Rule(index));
            let hit = rule.passes(&self.context) || (is_current && rule.continues(&self.context));

            let elapsed = rule_started.elapsed();
            if elapsed >= SLOW_RULE {
                tracing::warn!(
                    rule = rule.name().unwrap_or("<unnamed>"),
                    elapsed_ms = elapsed_ms(elapsed),
                    "slow rule check"
                );
                self.events.push(EngineEventKind::SlowRule {
                    rule: owned_name(rule),
                    elapsed_ms: elapsed_ms(elapsed),
                });
            }

            if hit {
                matched = Some(index);
                break;
            }
        }

        let mut activated = false;
        if let Some(index) = matched
            && self.current != Some(Slot::Rule(index))
        {
            self.activate(Slot::Rule(index));
            activated = true;
        }

        if !activated && let Some(slot) = self.current {
            let rule = rule_at(&self.rules, &self.break_rule, slot);
            if rule.passes(&self.context) || rule.continues(&self.context) {
                self.update_interaction();
            } else {
                self.deactivate();
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= SLOW_RESOLUTION {
            tracing::warn!(elapsed_ms = elapsed_ms(elapsed), "slow resolution pass");
            self.events.push(EngineEventKind::SlowResolution {
                elapsed_ms: elapsed_ms(elapsed),
            });
        }
    }

    fn activate(&mut self, slot: Slot) {
        if let Some(previous) = self.current {
            rule_at_mut(&mut self.rules, &mut self.break_rule, previous).reset();
        }
        let rule = rule_at_mut(&mut self.rules, &mut self.break_rule, slot);
        rule.reset();
        let delay = rule.delay(&self.context);
        let name = owned_name(rule);

        self.current = Some(slot);
        self.update_interaction();
        self.context.set_delay_timer(delay.max);
        self.context.set_min_delay_timer(delay.min);
        self.is_delaying = !delay.is_none();

        tracing::debug!(
            rule = name.as_deref().unwrap_or("<unnamed>"),
            min_delay = delay.min,
            max_delay = delay.max,
            "rule activated"
        );
        self.events.push(match slot {
            Slot::Break => EngineEventKind::BreakStarted,
            Slot::Rule(_) => EngineEventKind::RuleActivated { rule: name },
        });
    }

    /// Reset the current rule and forget its interaction and messages.
    pub fn deactivate(&mut self) {
        let Some(slot) = self.current.take() else {
            return;
        };
        let rule = rule_at_mut(&mut self.rules, &mut self.break_rule, slot);
        rule.reset();
        let name = owned_name(rule);
        self.next_interaction = None;
        self.messages.clear();

        tracing::debug!(
            rule = name.as_deref().unwrap_or("<unnamed>"),
            "rule deactivated"
        );
        self.events.push(match slot {
            Slot::Break => EngineEventKind::BreakEnded,
            Slot::Rule(_) => EngineEventKind::RuleDeactivated { rule: name },
        });
    }

    /// Recompute the pending interaction of the current rule.
    ///
    /// Without an interaction (or for noop rules) the rule's messages are
    /// stashed instead, falling back to a generic "nothing to do" notice.
    pub fn update_interaction(&mut self) {
        let Some(slot) = self.current else {
            self.next_interaction = None;
            self.messages.clear();
            return;
        };
        let rule = rule_at(&self.rules, &self.break_rule, slot);
        self.next_interaction = rule.run(&self.context);
        if self.next_interaction.is_none() || rule.is_noop() {
            self.messages = rule.messages(&self.context).unwrap_or_else(|| {
                let target = rule
                    .name()
                    .map_or_else(|| "For unknown rule".to_string(), |n| format!("For \"{n}\""));
                vec![NOTHING_TO_DO.to_string(), target]
            });
        } else {
            self.messages.clear();
        }
    }

    /// Fire the pending interaction against the context.
    ///
    /// Returns its label, or `None` when there was nothing to execute.
    pub fn execute_next(&mut self) -> Option<String> {
        let interaction = self.next_interaction.take()?;
        let label = interaction.label().to_string();
        interaction.execute(&mut self.context);
        Some(label)
    }

    /// Consume the pending interaction if `observed` matches it.
    ///
    /// On a match the interaction is prepared and handed back, and the current
    /// rule's click hook fires. A mismatch leaves the interaction in place.
    pub fn intercept(&mut self, observed: &ObservedInteraction) -> Option<Interaction<S>> {
        if !self
            .next_interaction
            .as_ref()
            .is_some_and(|pending| pending.matches(observed))
        {
            return None;
        }
        let mut interaction = self.next_interaction.take()?;
        interaction.prepare();
        if let Some(slot) = self.current {
            rule_at(&self.rules, &self.break_rule, slot).on_click(&mut self.context);
        }
        Some(interaction)
    }

    /// Bookkeeping after an execution: callback, one repeat, and the
    /// completion hook once the budget is spent.
    pub fn record_execution(&mut self, interaction: String, channel: ExecutionChannel) {
        let Some(slot) = self.current else {
            return;
        };
        let rule = rule_at_mut(&mut self.rules, &mut self.break_rule, slot);
        rule.callback(&mut self.context);
        rule.use_repeat();
        let name = owned_name(rule);
        let completed = !rule.can_execute();
        if completed {
            rule.complete_callback(&mut self.context);
        }

        tracing::debug!(
            rule = name.as_deref().unwrap_or("<unnamed>"),
            interaction = %interaction,
            ?channel,
            "interaction executed"
        );
        self.events.push(EngineEventKind::InteractionExecuted {
            rule: name.clone(),
            interaction,
            channel,
        });
        if completed {
            self.events.push(EngineEventKind::RuleCompleted { rule: name });
        }
    }

    /// Advance the delay gate by one step.
    ///
    /// The minimum delay must run out first. After that, every step ends the
    /// delay with a probability that grows as the maximum delay runs out.
    pub fn update_delay(&mut self) {
        if self.context.min_delay_timer() > 0 {
            return;
        }
        let remaining = self.context.delay_timer();
        let roll = if remaining > 0 {
            self.rng.gen_range(0..=remaining)
        } else {
            0
        };
        if roll == 0 {
            self.is_delaying = false;
            self.context.set_delay_timer(0);
        }
    }

    /// Restore the budget of once-per-tick rules.
    pub fn tick_rules(&mut self) {
        for rule in &mut self.rules {
            rule.reset_on_tick();
        }
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<EngineEventKind> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use autorun_domain::interaction::InteractionState;
    use autorun_domain::rule::{DynamicRule, RequirementRule};

    use super::*;

    type Ctx = Context<Vec<&'static str>>;

    fn rule(name: &str) -> DynamicRule<Vec<&'static str>> {
        DynamicRule::builder()
            .name(name)
            .then(|_| Some(Interaction::labelled("act")))
            .build()
            .unwrap()
    }

    fn build_engine(rules: Vec<Rule<Vec<&'static str>>>) -> RuleEngine<Vec<&'static str>> {
        RuleEngine::with_seed(Context::new(Vec::new()), rules, 7)
    }

    fn current_name<S>(engine: &RuleEngine<S>) -> Option<&str> {
        engine.current_rule().and_then(Rule::name)
    }

    #[test]
    fn should_select_earliest_passing_rule() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("never")
                .when(|_: &Ctx| false)
                .build()
                .unwrap()
                .into(),
            rule("first").into(),
            rule("second").into(),
        ]);
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("first"));
        assert_eq!(engine.current_slot(), Some(Slot::Rule(1)));
    }

    #[test]
    fn should_stay_idle_when_nothing_passes() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .when(|_: &Ctx| false)
                .build()
                .unwrap()
                .into(),
        ]);
        engine.resolve(false);
        assert!(engine.current_rule().is_none());
        assert!(engine.next_interaction().is_none());
        assert!(engine.messages().is_empty());
    }

    #[test]
    fn should_not_reactivate_on_repeated_resolution() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("thrice")
                .repeat(3)
                .then(|_| Some(Interaction::labelled("act")))
                .build()
                .unwrap()
                .into(),
        ]);
        engine.resolve(false);
        engine.record_execution("act".to_string(), ExecutionChannel::Autonomous);
        engine.resolve(false);
        engine.resolve(false);

        assert_eq!(engine.repeats_left(), 2);
        let activations = engine
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, EngineEventKind::RuleActivated { .. }))
            .count();
        assert_eq!(activations, 1);
    }

    #[test]
    fn should_fire_callbacks_per_repeat_then_move_on() {
        let calls = Arc::new(AtomicU32::new(0));
        let completions = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let d = Arc::clone(&completions);
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("limited")
                .repeat(3)
                .then(|_| Some(Interaction::labelled("act")))
                .callback(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .on_complete(move |_| {
                    d.fetch_add(1, Ordering::SeqCst);
                })
                .build()
                .unwrap()
                .into(),
            rule("fallback").into(),
        ]);

        engine.resolve(false);
        for _ in 0..3 {
            assert_eq!(current_name(&engine), Some("limited"));
            assert!(engine.can_execute());
            engine.execute_next();
            engine.record_execution("act".to_string(), ExecutionChannel::Autonomous);
            if engine.can_execute() {
                engine.resolve(false);
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert!(!engine.can_execute());

        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("fallback"));
    }

    #[test]
    fn should_preempt_with_break_and_hold_until_gate_clears() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("work")
                .repeat(2)
                .then(|_| Some(Interaction::labelled("act")))
                .build()
                .unwrap()
                .into(),
        ]);
        engine.resolve(false);
        engine.record_execution("act".to_string(), ExecutionChannel::Autonomous);
        assert_eq!(engine.repeats_left(), 1);

        engine.resolve(true);
        assert_eq!(engine.current_slot(), Some(Slot::Break));
        assert_eq!(engine.messages(), ["Taking a break"]);
        assert!(!engine.can_execute());
        // "work" was reset on the way out.
        assert_eq!(engine.rules()[0].repeats_left(), 2);

        engine.resolve(true);
        assert_eq!(engine.current_slot(), Some(Slot::Break));

        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("work"));

        let kinds = engine.drain_events();
        assert!(kinds.contains(&EngineEventKind::BreakStarted));
        assert!(kinds.contains(&EngineEventKind::BreakEnded));
    }

    #[test]
    fn should_follow_expiring_flag_between_rules() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("A")
                .when(|c: &Ctx| !c.flag("x"))
                .then(|_| Some(Interaction::new("A", |c: &mut Ctx| c.set_flag("x", true, 1))))
                .build()
                .unwrap()
                .into(),
            DynamicRule::builder()
                .name("B")
                .when(|c: &Ctx| c.flag("x"))
                .then(|_| Some(Interaction::labelled("B")))
                .build()
                .unwrap()
                .into(),
        ]);

        assert!(engine.current_rule().is_none());
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("A"));

        assert_eq!(engine.execute_next().as_deref(), Some("A"));
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("B"));

        engine.context_mut().tick();
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("A"));
    }

    #[test]
    fn should_not_stall_on_many_rule_with_empty_target_list() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("drop")
                .many()
                .skip_if_null()
                .then(|c: &Ctx| c.state().first().map(|item| Interaction::labelled(*item)))
                .build()
                .unwrap()
                .into(),
            rule("idle").into(),
        ]);

        engine.context_mut().state_mut().push("Coin pouch");
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("drop"));

        engine.context_mut().state_mut().clear();
        assert!(!engine.rules()[0].passes(engine.context()));
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("idle"));
    }

    #[test]
    fn should_keep_continuing_rule_unless_preempted() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("urgent")
                .when(|c: &Ctx| c.flag("danger"))
                .build()
                .unwrap()
                .into(),
            DynamicRule::builder()
                .name("walk")
                .when(|c: &Ctx| c.flag("start"))
                .continues(|c: &Ctx| c.flag("walking"))
                .build()
                .unwrap()
                .into(),
        ]);
        engine.context_mut().set_flag("start", true, 0);
        engine.context_mut().set_flag("walking", true, 0);
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("walk"));

        engine.context_mut().clear("start");
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("walk"));

        engine.context_mut().set_flag("danger", true, 0);
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("urgent"));

        engine.context_mut().clear("danger");
        engine.resolve(false);
        assert!(engine.current_rule().is_none());
    }

    #[test]
    fn should_block_lower_rules_while_requirement_fails() {
        let mut engine = build_engine(vec![
            RequirementRule::builder()
                .must(|c: &Ctx| !c.state().is_empty(), "Inventory must not be empty")
                .build()
                .unwrap()
                .into(),
            rule("work").into(),
        ]);
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("Requirements"));
        assert_eq!(engine.messages(), ["Inventory must not be empty"]);
        assert!(!engine.can_execute());

        engine.context_mut().state_mut().push("Bread");
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("work"));
    }

    #[test]
    fn should_fall_back_to_generic_messages_without_interaction() {
        let mut engine = build_engine(vec![
            DynamicRule::builder().name("empty").build().unwrap().into(),
        ]);
        engine.resolve(false);
        assert_eq!(
            engine.messages(),
            ["Nothing to do (no interaction)", "For \"empty\""]
        );

        let mut engine = build_engine(vec![DynamicRule::builder().build().unwrap().into()]);
        engine.resolve(false);
        assert_eq!(engine.messages()[1], "For unknown rule");
    }

    #[test]
    fn should_arm_timers_and_hold_through_min_delay() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("slow")
                .delay(2, 2)
                .then(|_| Some(Interaction::labelled("act")))
                .build()
                .unwrap()
                .into(),
        ]);
        engine.resolve(false);
        assert!(engine.is_delaying());
        assert_eq!(engine.context().delay_timer(), 2);
        assert_eq!(engine.context().min_delay_timer(), 2);

        engine.update_delay();
        assert!(engine.is_delaying());

        engine.context_mut().tick();
        engine.context_mut().tick();
        engine.update_delay();
        assert!(!engine.is_delaying());
    }

    #[test]
    fn should_end_random_delay_no_later_than_max() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .delay(0, 5)
                .build()
                .unwrap()
                .into(),
        ]);
        engine.resolve(false);
        for _ in 0..5 {
            engine.context_mut().tick();
            engine.update_delay();
        }
        assert!(!engine.is_delaying());
    }

    #[test]
    fn should_intercept_only_matching_event() {
        let clicked = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&clicked);
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("steal")
                .then(|_| Some(Interaction::labelled("Pickpocket")))
                .on_click(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .build()
                .unwrap()
                .into(),
        ]);
        engine.resolve(false);

        assert!(engine.intercept(&ObservedInteraction::new("Walk here")).is_none());
        assert!(engine.next_interaction().is_some());

        let prepared = engine
            .intercept(&ObservedInteraction::new("Pickpocket"))
            .unwrap();
        assert_eq!(prepared.state(), InteractionState::Prepared);
        assert!(engine.next_interaction().is_none());
        assert_eq!(clicked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_keep_once_per_tick_rule_current_until_next_tick() {
        let mut engine = build_engine(vec![
            DynamicRule::builder()
                .name("open")
                .once_per_tick()
                .delay(1, 1)
                .then(|_| Some(Interaction::labelled("Open")))
                .build()
                .unwrap()
                .into(),
            rule("other").into(),
        ]);
        engine.resolve(false);
        engine.context_mut().tick();
        engine.update_delay();
        assert!(!engine.is_delaying());
        engine.drain_events();

        engine.record_execution("Open".to_string(), ExecutionChannel::Autonomous);
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("open"));
        assert!(!engine.can_execute());

        engine.tick_rules();
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("open"));
        assert!(engine.can_execute());
        assert!(!engine.is_delaying());
        assert!(
            !engine
                .drain_events()
                .iter()
                .any(|e| matches!(e, EngineEventKind::RuleActivated { .. }))
        );
    }

    #[test]
    fn should_deactivate_when_rules_are_replaced() {
        let mut engine = build_engine(vec![rule("old").into()]);
        engine.resolve(false);
        engine.replace_rules(vec![rule("new").into()]);
        assert!(engine.current_rule().is_none());
        engine.resolve(false);
        assert_eq!(current_name(&engine), Some("new"));
    }
}
