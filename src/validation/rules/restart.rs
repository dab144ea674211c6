use super::{OpsRule, RuleContext};
use crate::validation::field::ErrorList;

/// Restart needs nothing beyond a resolved database reference, which the
/// dispatcher has already checked.
pub struct RestartRule;

impl OpsRule for RestartRule {
    fn validate(&self, _ctx: &RuleContext<'_>) -> ErrorList {
        ErrorList::new()
    }
}
