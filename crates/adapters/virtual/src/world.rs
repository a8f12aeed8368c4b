//! The simulated world — a thief, a target NPC and some dice.
//!
//! [`Thief`] is the domain state carried by the runner's context. Every
//! change to it goes through [`perform`], whether the runner fires the
//! interaction itself or an observed click consumes it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use autorun_domain::context::Context;
use autorun_domain::interaction::Interaction;

use crate::config::SimulationConfig;

/// Hitpoints restored by one food item.
pub const HEAL: u32 = 3;
/// Hitpoints lost when caught.
pub const STUN_DAMAGE: u32 = 2;
/// Ticks spent stunned after getting caught.
pub const STUN_TICKS: u32 = 8;
/// Ticks the target wanders off after a success, one time in ten.
pub const WANDER_TICKS: u32 = 4;
pub const COINS_PER_POUCH: u64 = 40;

pub const STUNNED: &str = "stunned";
pub const TARGET_MOVED: &str = "target-moved";

/// Something the thief can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThiefAction {
    Eat,
    OpenPouches,
    Pickpocket,
}

impl ThiefAction {
    /// Menu label, as an observer of the world would see it.
    #[must_use]
    pub fn label(self, thief: &Thief) -> String {
        match self {
            Self::Eat => format!("Eat {}", thief.food_name),
            Self::OpenPouches => "Open-all Coin pouch".to_string(),
            Self::Pickpocket => format!("Pickpocket {}", thief.target),
        }
    }

    /// Build the interaction that performs this action.
    #[must_use]
    pub fn interaction(self, ctx: &Context<Thief>) -> Interaction<Thief> {
        Interaction::new(self.label(ctx.state()), move |ctx| perform(ctx, self))
    }
}

/// Running counters read by statistics collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub successes: u64,
    pub failures: u64,
    pub coins: u64,
}

/// Domain state of the virtual thieving world.
#[derive(Debug)]
pub struct Thief {
    pub target: String,
    pub food_name: String,
    pub food: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub eat_below_hp: u32,
    pub coin_pouches: u32,
    pub max_pouches: u32,
    pub tally: Tally,
    /// Last tally pushed into the statistics tracker.
    pub reported: Tally,
    success_percent: u32,
    rng: StdRng,
}

impl Thief {
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            target: config.target.clone(),
            food_name: config.food.clone(),
            food: config.food_count,
            hp: config.max_hp,
            max_hp: config.max_hp,
            eat_below_hp: config.eat_below_hp,
            coin_pouches: 0,
            max_pouches: config.max_pouches,
            tally: Tally::default(),
            reported: Tally::default(),
            success_percent: config.success_percent.min(100),
            rng,
        }
    }

    #[must_use]
    pub fn should_eat(&self) -> bool {
        self.hp < self.eat_below_hp
    }

    fn roll(&mut self, percent: u32) -> bool {
        self.rng.gen_range(0..100) < percent
    }
}

impl Default for Thief {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

/// Apply `action` to the world.
pub fn perform(ctx: &mut Context<Thief>, action: ThiefAction) {
    match action {
        ThiefAction::Eat => {
            let thief = ctx.state_mut();
            if thief.food > 0 {
                thief.food -= 1;
                thief.hp = (thief.hp + HEAL).min(thief.max_hp);
            }
        }
        ThiefAction::OpenPouches => {
            let thief = ctx.state_mut();
            thief.tally.coins += u64::from(thief.coin_pouches) * COINS_PER_POUCH;
            thief.coin_pouches = 0;
        }
        ThiefAction::Pickpocket => {
            if ctx.flag(STUNNED) {
                return;
            }
            let thief = ctx.state_mut();
            let percent = thief.success_percent;
            if thief.roll(percent) {
                thief.coin_pouches += 1;
                thief.tally.successes += 1;
                if thief.roll(10) {
                    ctx.set_flag(TARGET_MOVED, true, WANDER_TICKS);
                }
            } else {
                thief.tally.failures += 1;
                thief.hp = thief.hp.saturating_sub(STUN_DAMAGE);
                tracing::debug!(hp = thief.hp, "caught pickpocketing");
                ctx.set_flag(STUNNED, true, STUN_TICKS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(success_percent: u32) -> Context<Thief> {
        Context::new(Thief::new(&SimulationConfig {
            success_percent,
            seed: Some(3),
            ..SimulationConfig::default()
        }))
    }

    #[test]
    fn should_label_actions_with_configured_names() {
        let thief = Thief::default();
        assert_eq!(ThiefAction::Eat.label(&thief), "Eat Bread");
        assert_eq!(ThiefAction::Pickpocket.label(&thief), "Pickpocket Man");
        assert_eq!(ThiefAction::OpenPouches.label(&thief), "Open-all Coin pouch");
    }

    #[test]
    fn should_collect_pouch_on_success() {
        let mut ctx = world(100);
        perform(&mut ctx, ThiefAction::Pickpocket);
        assert_eq!(ctx.state().coin_pouches, 1);
        assert_eq!(ctx.state().tally.successes, 1);
        assert!(!ctx.flag(STUNNED));
    }

    #[test]
    fn should_stun_and_hurt_on_failure() {
        let mut ctx = world(0);
        perform(&mut ctx, ThiefAction::Pickpocket);
        assert_eq!(ctx.state().tally.failures, 1);
        assert_eq!(ctx.state().hp, 8);
        assert_eq!(ctx.flag_ttl(STUNNED), Some(STUN_TICKS));

        // No attempts while stunned.
        perform(&mut ctx, ThiefAction::Pickpocket);
        assert_eq!(ctx.state().tally.failures, 1);
    }

    #[test]
    fn should_heal_without_exceeding_max() {
        let mut ctx = world(100);
        ctx.state_mut().hp = 9;
        perform(&mut ctx, ThiefAction::Eat);
        assert_eq!(ctx.state().hp, 10);
        assert_eq!(ctx.state().food, 9);
    }

    #[test]
    fn should_turn_pouches_into_coins() {
        let mut ctx = world(100);
        ctx.state_mut().coin_pouches = 3;
        perform(&mut ctx, ThiefAction::OpenPouches);
        assert_eq!(ctx.state().coin_pouches, 0);
        assert_eq!(ctx.state().tally.coins, 3 * COINS_PER_POUCH);
    }

    #[test]
    fn should_perform_through_interaction() {
        let mut ctx = world(100);
        let interaction = ThiefAction::Pickpocket.interaction(&ctx);
        assert_eq!(interaction.label(), "Pickpocket Man");
        interaction.execute(&mut ctx);
        assert_eq!(ctx.state().coin_pouches, 1);
    }
}
