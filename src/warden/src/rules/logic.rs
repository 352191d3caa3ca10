//! Logic combinators over rule nodes
//!
//! And/Or evaluate every child (all initiated, all awaited) because their
//! per-branch work is expected to be cheap or cached; Chain and Race are
//! declared in priority order and stop as soon as the outcome is known, so
//! side effects in later children never happen. This asymmetry is part of
//! the contract, not an optimization detail.

use crate::cache::Resolution;
use crate::engine::options::EngineOptions;
use crate::rules::RuleNode;
use crate::types::{Fault, Invocation, Verdict};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

/// A combinator composed over child rules
#[derive(Debug, Clone)]
pub enum LogicRule {
    /// Allow iff every child allows; children run concurrently
    And(Vec<RuleNode>),

    /// Allow if at least one child allows; children run concurrently
    Or(Vec<RuleNode>),

    /// Sequential evaluation, stopping at the first child that does not
    /// allow and surfacing that child's verdict
    Chain(Vec<RuleNode>),

    /// Sequential evaluation, stopping at the first child that allows; a
    /// leading denial does not skip later children
    Race(Vec<RuleNode>),

    /// Negates a single child; an optional override reason replaces the
    /// plain denial produced when the child allows
    Not {
        /// The negated child
        rule: Box<RuleNode>,
        /// Denial reason surfaced instead of a plain deny
        error: Option<String>,
    },

    /// Unconditional allow
    True,

    /// Unconditional deny
    False,
}

impl LogicRule {
    /// Immediate children of this combinator (not recursively flattened)
    pub fn children(&self) -> &[RuleNode] {
        match self {
            LogicRule::And(rules)
            | LogicRule::Or(rules)
            | LogicRule::Chain(rules)
            | LogicRule::Race(rules) => rules,
            LogicRule::Not { rule, .. } => std::slice::from_ref(rule),
            LogicRule::True | LogicRule::False => &[],
        }
    }

    /// Evaluate the children and return their verdicts in declaration
    /// order.
    ///
    /// And/Or (and Not) evaluate all children concurrently; Chain and Race
    /// evaluate sequentially and return only the verdicts of the children
    /// they actually initiated before short-circuiting.
    pub async fn evaluate(
        &self,
        invocation: &Invocation,
        options: &EngineOptions,
    ) -> Result<Vec<Verdict>, Fault> {
        match self {
            LogicRule::Chain(rules) => {
                let mut verdicts = Vec::with_capacity(rules.len());
                for rule in rules {
                    let verdict = rule.resolve(invocation, options).await?;
                    let allowed = verdict.is_allow();
                    verdicts.push(verdict);
                    if !allowed {
                        break;
                    }
                }
                Ok(verdicts)
            }
            LogicRule::Race(rules) => {
                let mut verdicts = Vec::with_capacity(rules.len());
                for rule in rules {
                    let verdict = rule.resolve(invocation, options).await?;
                    let allowed = verdict.is_allow();
                    verdicts.push(verdict);
                    if allowed {
                        break;
                    }
                }
                Ok(verdicts)
            }
            _ => {
                let pending = self
                    .children()
                    .iter()
                    .map(|rule| rule.resolve(invocation, options));
                join_all(pending).await.into_iter().collect()
            }
        }
    }

    /// Resolve the combinator's overall verdict
    pub fn resolve<'a>(
        &'a self,
        invocation: &'a Invocation,
        options: &'a EngineOptions,
    ) -> BoxFuture<'a, Resolution> {
        match self {
            LogicRule::True => futures::future::ready(Ok(Verdict::Allow)).boxed(),
            LogicRule::False => futures::future::ready(Ok(Verdict::Deny)).boxed(),
            LogicRule::And(_) | LogicRule::Chain(_) => async move {
                let verdicts = self.evaluate(invocation, options).await?;
                if verdicts.iter().all(Verdict::is_allow) {
                    Ok(Verdict::Allow)
                } else {
                    Ok(first_reasoned_denial(&verdicts).unwrap_or(Verdict::Deny))
                }
            }
            .boxed(),
            LogicRule::Or(_) | LogicRule::Race(_) => async move {
                let verdicts = self.evaluate(invocation, options).await?;
                if verdicts.iter().any(Verdict::is_allow) {
                    Ok(Verdict::Allow)
                } else {
                    Ok(first_reasoned_denial(&verdicts).unwrap_or(Verdict::Deny))
                }
            }
            .boxed(),
            LogicRule::Not { error, .. } => async move {
                let verdicts = self.evaluate(invocation, options).await?;
                match verdicts.first() {
                    Some(Verdict::Allow) => Ok(match error {
                        Some(reason) => Verdict::DenyWithReason(reason.clone()),
                        None => Verdict::Deny,
                    }),
                    // A denial (with or without reason) negates to allow;
                    // the child's reason is discarded.
                    Some(_) => Ok(Verdict::Allow),
                    None => Ok(Verdict::Allow),
                }
            }
            .boxed(),
        }
    }
}

/// First denial carrying a reason, in evaluation order
fn first_reasoned_denial(verdicts: &[Verdict]) -> Option<Verdict> {
    verdicts
        .iter()
        .find(|verdict| verdict.reason().is_some())
        .cloned()
}
