// 🪜 Cascade Runner - Ordered rules, first match wins
//
// Counterparty templates and category stages are both ordered lists of
// {matcher, producer} rules. They share this runner so the ordering and the
// "first match wins, later rules are never consulted" contract live in one
// place and every rule can be tested on its own.

use crate::trace::DecisionTrace;
use tracing::debug;

/// A rule's answer plus the human-readable reason it fired
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<O> {
    pub value: O,
    pub reason: String,
}

impl<O> Hit<O> {
    pub fn new(value: O, reason: impl Into<String>) -> Self {
        Hit {
            value,
            reason: reason.into(),
        }
    }
}

/// One step of a cascade
pub trait CascadeRule<I: ?Sized, O> {
    fn name(&self) -> &str;

    /// `None` means "not applicable, try the next rule"
    fn apply(&self, input: &I) -> Option<Hit<O>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeMatch<O> {
    pub stage: String,
    /// Position of the winning rule in the cascade
    pub index: usize,
    pub value: O,
}

/// Evaluate `rules` in order and stop at the first hit.
///
/// The winning rule is always recorded in `trace`; rules that do not apply
/// leave no entry.
pub fn run_cascade<I, O, R>(rules: &[R], input: &I, trace: &mut DecisionTrace) -> Option<CascadeMatch<O>>
where
    I: ?Sized,
    R: CascadeRule<I, O>,
{
    for (index, rule) in rules.iter().enumerate() {
        if let Some(hit) = rule.apply(input) {
            debug!(stage = rule.name(), reason = %hit.reason, "cascade rule matched");
            trace.record(rule.name(), &hit.reason);
            return Some(CascadeMatch {
                stage: rule.name().to_string(),
                index,
                value: hit.value,
            });
        }
    }
    None
}
