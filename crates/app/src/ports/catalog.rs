//! Rule catalog port — the domain-specific source of rules.

use autorun_domain::context::Context;
use autorun_domain::error::ValidationError;
use autorun_domain::rule::RuleSet;
use autorun_domain::statistics::StatisticTracker;

/// Supplies the ordered rules a runner resolves over.
///
/// Adapter crates implement this for a concrete world. The runner calls
/// [`setup`](Self::setup) on start and on every refresh, always with an
/// empty [`RuleSet`].
pub trait RuleCatalog {
    /// Domain state carried by the context.
    type State;

    /// Register rules in priority order, earliest first.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] raised while building a rule.
    fn setup(&self, rules: &mut RuleSet<Self::State>) -> Result<(), ValidationError>;

    /// Configure which statistics are displayed. Nothing by default.
    fn statistics(&self, _statistics: &mut StatisticTracker) {}

    /// Feed world changes into the statistics after each trigger.
    fn collect(&self, _context: &mut Context<Self::State>, _statistics: &mut StatisticTracker) {}
}
