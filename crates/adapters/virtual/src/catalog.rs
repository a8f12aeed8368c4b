//! Thieving rule catalog — keeps the thief fed, waits out stuns, opens coin
//! pouches and otherwise pickpockets the target.

use autorun_app::ports::RuleCatalog;
use autorun_domain::context::Context;
use autorun_domain::error::ValidationError;
use autorun_domain::rule::{Delay, DynamicRule, DynamicRuleBuilder, RequirementRule, RuleSet};
use autorun_domain::statistics::StatisticTracker;

use crate::world::{STUNNED, TARGET_MOVED, Thief, ThiefAction, perform};

type Ctx = Context<Thief>;

/// A rule that performs `action`, whichever channel consumes it.
fn act(name: &str, action: ThiefAction) -> DynamicRuleBuilder<Thief> {
    DynamicRule::builder()
        .name(name)
        .then(move |c: &Ctx| Some(action.interaction(c)))
        .on_click(move |c: &mut Ctx| perform(c, action))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThievingCatalog;

impl RuleCatalog for ThievingCatalog {
    type State = Thief;

    fn setup(&self, rules: &mut RuleSet<Thief>) -> Result<(), ValidationError> {
        rules.add(
            RequirementRule::builder()
                .must(
                    |c: &Ctx| !c.state().food_name.trim().is_empty(),
                    "Food must be set in config",
                )
                .must(
                    |c: &Ctx| !c.state().target.trim().is_empty(),
                    "Target NPC must be set in config",
                )
                .build()?,
        );

        // Eating works while stunned, so it goes first.
        rules.add(
            act("Eat food", ThiefAction::Eat)
                .when(|c: &Ctx| c.state().should_eat() && c.state().food > 0)
                .many()
                .build()?,
        );

        rules.add(
            DynamicRule::builder()
                .name("Wait when stunned")
                .noop()
                .when(|c: &Ctx| c.flag(STUNNED))
                .message("Waiting (stunned)")
                .build()?,
        );

        rules.add(
            act("Open coin pouches", ThiefAction::OpenPouches)
                .when(|c: &Ctx| {
                    let thief = c.state();
                    thief.coin_pouches >= thief.max_pouches
                        || (thief.coin_pouches > 0 && thief.food == 0)
                })
                .once_per_tick()
                .build()?,
        );

        rules.group(
            |c: &Ctx| c.state().food == 0,
            |rules| {
                rules.add(
                    DynamicRule::builder()
                        .name("Out of food")
                        .noop()
                        .when(|c: &Ctx| c.state().should_eat())
                        .messages_with(|c: &Ctx| {
                            vec![
                                format!("Out of {}", c.state().food_name),
                                format!("{} hp left", c.state().hp),
                            ]
                        })
                        .build()?,
                );
                Ok(())
            },
        )?;

        rules.add(
            act("Pickpocket", ThiefAction::Pickpocket)
                .delay_with(|c: &Ctx| {
                    if c.flag(TARGET_MOVED) {
                        Delay::up_to(4)
                    } else {
                        Delay::NONE
                    }
                })
                .once_per_tick()
                .build()?,
        );

        Ok(())
    }

    fn statistics(&self, statistics: &mut StatisticTracker) {
        statistics.add_displays(["Success", "Fail", "GP"]);
        statistics.add_per_hour_displays(["GP", "Success"]);
        statistics.add_percentage_display("Success", ["Success", "Fail"]);
        statistics.add_percentage_display("Fail", ["Success", "Fail"]);
    }

    fn collect(&self, context: &mut Context<Thief>, statistics: &mut StatisticTracker) {
        let thief = context.state_mut();
        let (now, before) = (thief.tally, thief.reported);
        for (name, current, previous) in [
            ("Success", now.successes, before.successes),
            ("Fail", now.failures, before.failures),
            ("GP", now.coins, before.coins),
        ] {
            if current != previous {
                let delta = i64::try_from(current.saturating_sub(previous)).unwrap_or(i64::MAX);
                statistics.add(name, delta);
            }
        }
        thief.reported = now;
    }
}
