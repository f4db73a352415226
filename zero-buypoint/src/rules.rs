//! Ordered rule tables.
//!
//! Signal detection, labeling, advice lookup and risk scoring all follow a
//! "first rule wins" (or "every rule that fires, in order") pattern. Keeping
//! the rules in a table makes the decision order data that tests can inspect.

use std::fmt;

/// A named `(predicate, outcome)` pair.
pub struct Rule<C, O> {
    /// Stable rule name, used in logs and tests
    pub name: &'static str,
    /// Whether the rule fires for a context
    pub when: fn(&C) -> bool,
    /// Outcome produced when the rule fires
    pub then: fn(&C) -> O,
}

impl<C, O> Rule<C, O> {
    pub const fn new(name: &'static str, when: fn(&C) -> bool, then: fn(&C) -> O) -> Self {
        Self { name, when, then }
    }
}

impl<C, O> Clone for Rule<C, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, O> Copy for Rule<C, O> {}

impl<C, O> fmt::Debug for Rule<C, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Outcome of a rule together with the name of the rule that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<O> {
    pub rule: &'static str,
    pub outcome: O,
}

/// Priority-ordered list of rules.
#[derive(Debug, Clone)]
pub struct RuleTable<C, O> {
    rules: Vec<Rule<C, O>>,
}

impl<C, O> RuleTable<C, O> {
    /// Create a table from rules in priority order.
    pub fn new(rules: Vec<Rule<C, O>>) -> Self {
        Self { rules }
    }

    /// Evaluate rules in order; the first one that fires wins.
    pub fn first_match(&self, ctx: &C) -> Option<Fired<O>> {
        self.rules.iter().find(|rule| (rule.when)(ctx)).map(|rule| Fired {
            rule: rule.name,
            outcome: (rule.then)(ctx),
        })
    }

    /// Evaluate every rule and collect all that fire, preserving order.
    pub fn all_matches(&self, ctx: &C) -> Vec<Fired<O>> {
        self.rules
            .iter()
            .filter(|rule| (rule.when)(ctx))
            .map(|rule| Fired {
                rule: rule.name,
                outcome: (rule.then)(ctx),
            })
            .collect()
    }

    /// Names of all rules that fire for a context, in order.
    pub fn firing_rules(&self, ctx: &C) -> Vec<&'static str> {
        self.rules
            .iter()
            .filter(|rule| (rule.when)(ctx))
            .map(|rule| rule.name)
            .collect()
    }

    /// Rule names in priority order.
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
