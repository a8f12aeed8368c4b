//! # autorun-app
//!
//! Application layer — the resolution engine, the runner and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `RuleCatalog` — supplies the ordered rules for a concrete world
//!   - `BreakGate` — reports whether an out-of-band pause is active
//!   - `EventPublisher` — receives engine events
//! - Resolve the current rule on every trigger (`RuleEngine`)
//! - Turn decisions into executions, autonomously or by interception (`Runner`)
//! - Serialize all triggers through one task (`RunnerService`)
//! - Provide **in-process infrastructure** (event bus, interval break handler)
//!   that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `autorun-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod break_handler;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod event_bus;
pub mod ports;
pub mod service;
