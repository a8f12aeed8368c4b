//! Break gate port — an out-of-band pause that preempts every rule.

use crate::config::BreakConfig;

/// Reports whether a break is in progress.
///
/// The runner only consumes the signal; when and how long to pause is the
/// implementation's policy.
pub trait BreakGate {
    /// Whether rule selection should be suspended right now.
    fn is_active(&self) -> bool;

    /// Advance the policy by one time step.
    fn tick(&mut self);

    /// Apply new settings. Implementations should restart their schedule.
    fn configure(&mut self, config: &BreakConfig);
}

impl<T: BreakGate + ?Sized> BreakGate for Box<T> {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn tick(&mut self) {
        (**self).tick();
    }

    fn configure(&mut self, config: &BreakConfig) {
        (**self).configure(config);
    }
}
