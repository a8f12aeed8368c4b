//! # autorun-adapter-virtual
//!
//! Virtual/demo world for the autorun engine: a thief pickpocketing an NPC,
//! with randomized outcomes, stuns, food and coin pouches.
//!
//! ## Provided rules
//!
//! | Priority | Rule | Behaviour |
//! |----------|------|-----------|
//! | 1 | Requirements | Blocks everything until food and target are configured |
//! | 2 | Eat food | Eats while hitpoints are low, even when stunned |
//! | 3 | Wait when stunned | Noop while the `stunned` flag is set |
//! | 4 | Open coin pouches | Once per tick, when pouches are full or food ran out |
//! | 5 | Out of food | Noop while hurt with nothing left to eat |
//! | 6 | Pickpocket | Once per tick, with a short delay after the target wanders |
//!
//! ## Dependency rule
//!
//! Depends on `autorun-app` (port traits) and `autorun-domain` only.

pub mod config;
mod catalog;
mod world;

pub use catalog::ThievingCatalog;
pub use config::SimulationConfig;
pub use world::{Tally, Thief, ThiefAction, perform};
