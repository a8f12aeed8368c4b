//! Rule set — the ordered registry rule catalogs populate during setup.

use std::sync::Arc;

use crate::context::Context;
use crate::error::ValidationError;

use super::{Predicate, Rule};

/// Rules in priority order, earliest first.
pub struct RuleSet<S> {
    rules: Vec<Rule<S>>,
    guards: Vec<Predicate<S>>,
}

impl<S> Default for RuleSet<S> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            guards: Vec::new(),
        }
    }
}

impl<S> RuleSet<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule at the lowest priority so far.
    ///
    /// Inside [`group`](Self::group), every enclosing guard is AND-ed onto it.
    pub fn add(&mut self, rule: impl Into<Rule<S>>) {
        let mut rule = rule.into();
        for guard in &self.guards {
            rule.guard(Arc::clone(guard));
        }
        self.rules.push(rule);
    }

    /// Register the rules added by `factory` behind an extra guard.
    ///
    /// Relative order is preserved: grouped rules sit exactly where they
    /// were added. Groups may be nested.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `factory`.
    pub fn group(
        &mut self,
        guard: impl Fn(&Context<S>) -> bool + Send + Sync + 'static,
        factory: impl FnOnce(&mut Self) -> Result<(), ValidationError>,
    ) -> Result<(), ValidationError> {
        self.guards.push(Arc::new(guard));
        let result = factory(self);
        self.guards.pop();
        result
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule<S>> {
        self.rules.iter()
    }

    #[must_use]
    pub fn into_rules(self) -> Vec<Rule<S>> {
        self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::DynamicRule;

    fn named(name: &str) -> DynamicRule<u32> {
        DynamicRule::builder().name(name).build().unwrap()
    }

    #[test]
    fn should_keep_declaration_order() {
        let mut rules = RuleSet::new();
        rules.add(named("first"));
        rules.add(named("second"));
        let names: Vec<_> = rules.iter().filter_map(Rule::name).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn should_guard_only_rules_inside_group() {
        let mut rules = RuleSet::new();
        rules.add(named("before"));
        rules
            .group(
                |c| *c.state() > 0,
                |rules| {
                    rules.add(named("inside"));
                    Ok(())
                },
            )
            .unwrap();
        rules.add(named("after"));

        let ctx = Context::new(0_u32);
        let passing: Vec<_> = rules
            .iter()
            .filter(|r| r.passes(&ctx))
            .filter_map(Rule::name)
            .collect();
        assert_eq!(passing, ["before", "after"]);
    }

    #[test]
    fn should_compose_guards_of_nested_groups() {
        let mut rules = RuleSet::new();
        rules
            .group(
                |c| *c.state() > 1,
                |rules| {
                    rules.group(
                        |c| *c.state() < 3,
                        |rules| {
                            rules.add(named("nested"));
                            Ok(())
                        },
                    )
                },
            )
            .unwrap();

        let rule = rules.iter().next().unwrap();
        assert!(!rule.passes(&Context::new(1)));
        assert!(rule.passes(&Context::new(2)));
        assert!(!rule.passes(&Context::new(3)));
    }

    #[test]
    fn should_propagate_factory_error_and_drop_guard() {
        let mut rules: RuleSet<u32> = RuleSet::new();
        let result = rules.group(|_| false, |_| Err(ValidationError::ZeroRepeat));
        assert!(matches!(result, Err(ValidationError::ZeroRepeat)));

        rules.add(named("unguarded"));
        assert!(rules.iter().next().unwrap().passes(&Context::new(0)));
    }
}
