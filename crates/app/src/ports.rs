//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the resolution core and the outside
//! world: who decides when breaks happen, who supplies the rules, and who
//! listens to what the runner does.

pub mod break_gate;
pub mod catalog;
pub mod event_bus;

pub use break_gate::BreakGate;
pub use catalog::RuleCatalog;
pub use event_bus::EventPublisher;
