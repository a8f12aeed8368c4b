//! Requirement rule — a hard gate in front of lower-priority rules.
//!
//! While any requirement fails, the rule wins the priority scan, becomes
//! current as a noop and shows the message of the first failing requirement.
//! Nothing declared after it can become current until every requirement
//! holds again.

use std::sync::Arc;

use crate::context::Context;
use crate::error::ValidationError;

use super::Predicate;

/// Ordered list of `(predicate, failure message)` pairs.
pub struct RequirementRule<S> {
    name: String,
    guards: Vec<Predicate<S>>,
    requirements: Vec<(Predicate<S>, String)>,
}

impl<S> RequirementRule<S> {
    /// Create a builder for constructing a [`RequirementRule`].
    #[must_use]
    pub fn builder() -> RequirementRuleBuilder<S> {
        RequirementRuleBuilder {
            name: None,
            requirements: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether every requirement holds.
    #[must_use]
    pub fn satisfied(&self, ctx: &Context<S>) -> bool {
        self.first_failure(ctx).is_none()
    }

    /// Message of the first requirement that does not hold.
    #[must_use]
    pub fn first_failure(&self, ctx: &Context<S>) -> Option<&str> {
        self.requirements
            .iter()
            .find(|(predicate, _)| !predicate(ctx))
            .map(|(_, message)| message.as_str())
    }

    /// Blocks the scan while the guards hold and a requirement fails.
    #[must_use]
    pub fn passes(&self, ctx: &Context<S>) -> bool {
        self.guards.iter().all(|p| p(ctx)) && !self.satisfied(ctx)
    }

    #[must_use]
    pub fn messages(&self, ctx: &Context<S>) -> Option<Vec<String>> {
        self.first_failure(ctx).map(|message| vec![message.to_string()])
    }

    pub(crate) fn guard(&mut self, predicate: Predicate<S>) {
        self.guards.push(predicate);
    }
}

/// Step-by-step builder for [`RequirementRule`].
pub struct RequirementRuleBuilder<S> {
    name: Option<String>,
    requirements: Vec<(Predicate<S>, String)>,
}

impl<S> RequirementRuleBuilder<S> {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Require `predicate` to hold, showing `message` when it does not.
    #[must_use]
    pub fn must(
        mut self,
        predicate: impl Fn(&Context<S>) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        self.requirements.push((Arc::new(predicate), message.into()));
        self
    }

    /// Consume the builder, validate, and return a [`RequirementRule`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoRequirements`] when no requirement was
    /// added, or [`ValidationError::EmptyName`] for a blank name.
    pub fn build(self) -> Result<RequirementRule<S>, ValidationError> {
        if self.requirements.is_empty() {
            return Err(ValidationError::NoRequirements);
        }
        let name = self.name.unwrap_or_else(|| "Requirements".to_string());
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(RequirementRule {
            name,
            guards: Vec::new(),
            requirements: self.requirements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food_and_target() -> RequirementRule<(bool, bool)> {
        RequirementRule::builder()
            .must(|c: &Context<(bool, bool)>| c.state().0, "Food must be set in config")
            .must(|c: &Context<(bool, bool)>| c.state().1, "Target NPC must be set in config")
            .build()
            .unwrap()
    }

    #[test]
    fn should_default_name_to_requirements() {
        assert_eq!(food_and_target().name(), "Requirements");
    }

    #[test]
    fn should_block_with_first_failing_message() {
        let rule = food_and_target();
        let ctx = Context::new((false, false));
        assert!(rule.passes(&ctx));
        assert!(!rule.satisfied(&ctx));
        assert_eq!(
            rule.messages(&ctx),
            Some(vec!["Food must be set in config".to_string()])
        );

        let ctx = Context::new((true, false));
        assert_eq!(rule.first_failure(&ctx), Some("Target NPC must be set in config"));
    }

    #[test]
    fn should_stop_blocking_once_every_requirement_holds() {
        let rule = food_and_target();
        let ctx = Context::new((true, true));
        assert!(rule.satisfied(&ctx));
        assert!(!rule.passes(&ctx));
        assert!(rule.messages(&ctx).is_none());
    }

    #[test]
    fn should_not_block_when_group_guard_fails() {
        let mut rule = food_and_target();
        rule.guard(Arc::new(|_: &Context<(bool, bool)>| false));
        assert!(!rule.passes(&Context::new((false, false))));
    }

    #[test]
    fn should_reject_empty_requirement_list() {
        let result = RequirementRule::<()>::builder().build();
        assert!(matches!(result, Err(ValidationError::NoRequirements)));
    }
}
