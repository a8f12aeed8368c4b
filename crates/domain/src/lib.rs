//! # autorun-domain
//!
//! Pure domain model for the autorun rule-resolution engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define the **Context** (domain state plus expiring flags and delay timers)
//! - Define **Interactions** (one-shot labelled effects produced by rules)
//! - Define **Rules** (dynamic, requirement and break rules) and the ordered
//!   **`RuleSet`** catalogs populate
//! - Define **Statistics** (counters with per-hour and percentage displays)
//! - Define **Engine events** (what the runner decided and did)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod context;
pub mod event;
pub mod interaction;
pub mod rule;
pub mod statistics;
