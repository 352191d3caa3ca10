//! The rule model: atomic rules, logic combinators, and constructors
//!
//! A rule tree is built from [`RuleNode`]s: either an atomic [`Rule`]
//! wrapping a user predicate or a [`LogicRule`] combinator composed over
//! child nodes. The free functions in this module ([`rule`], [`and`],
//! [`or`], [`chain`], [`race`], [`not`], [`allow`], [`deny`]) are the
//! intended way to declare trees.

pub mod logic;
pub mod rule;

pub use logic::LogicRule;
pub use rule::{CachePolicy, Predicate, Rule};

use crate::cache::Resolution;
use crate::engine::options::EngineOptions;
use crate::types::{Invocation, Verdict};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// A node in a rule tree: an atomic rule or a logic combinator.
///
/// Nodes are cheap to clone and share their underlying rule, so reusing one
/// node in several places references the *same* rule (relevant both for
/// caching and for the tree validator's identity checks).
#[derive(Debug, Clone)]
pub enum RuleNode {
    /// An atomic rule wrapping a predicate
    Rule(Arc<Rule>),
    /// A logic combinator over child nodes
    Logic(Arc<LogicRule>),
}

impl RuleNode {
    /// Evaluate this node for one invocation
    pub fn resolve<'a>(
        &'a self,
        invocation: &'a Invocation,
        options: &'a EngineOptions,
    ) -> BoxFuture<'a, Resolution> {
        match self {
            RuleNode::Rule(rule) => rule.resolve(invocation, options).boxed(),
            RuleNode::Logic(logic) => logic.resolve(invocation, options),
        }
    }

    /// Immediate child nodes (empty for atomic rules)
    pub fn children(&self) -> &[RuleNode] {
        match self {
            RuleNode::Rule(_) => &[],
            RuleNode::Logic(logic) => logic.children(),
        }
    }

    /// Collect every descendant rule's declared fragment, depth-first in
    /// tree order; duplicates are kept.
    pub fn extract_fragments(&self) -> Vec<String> {
        let mut fragments = Vec::new();
        self.collect_fragments(&mut fragments);
        fragments
    }

    fn collect_fragments(&self, fragments: &mut Vec<String>) {
        match self {
            RuleNode::Rule(rule) => {
                if let Some(fragment) = rule.fragment() {
                    fragments.push(fragment.to_string());
                }
            }
            RuleNode::Logic(logic) => {
                for child in logic.children() {
                    child.collect_fragments(fragments);
                }
            }
        }
    }
}

impl From<Rule> for RuleNode {
    fn from(rule: Rule) -> Self {
        RuleNode::Rule(Arc::new(rule))
    }
}

impl From<LogicRule> for RuleNode {
    fn from(logic: LogicRule) -> Self {
        RuleNode::Logic(Arc::new(logic))
    }
}

/// Declare a named atomic rule with the default (no-cache) policy.
///
/// For cache policies or fragments, build through [`Rule::new`] and its
/// `with_*` methods instead.
pub fn rule<F, Fut>(name: impl Into<String>, predicate: F) -> RuleNode
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Verdict>> + Send + 'static,
{
    Rule::new(name, predicate).into()
}

/// Declare an atomic rule with a generated unique name
pub fn rule_anon<F, Fut>(predicate: F) -> RuleNode
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Verdict>> + Send + 'static,
{
    Rule::anonymous(predicate).into()
}

/// Allow iff every child allows; children are evaluated concurrently
pub fn and(rules: impl IntoIterator<Item = RuleNode>) -> RuleNode {
    LogicRule::And(rules.into_iter().collect()).into()
}

/// Allow if at least one child allows; children are evaluated concurrently
pub fn or(rules: impl IntoIterator<Item = RuleNode>) -> RuleNode {
    LogicRule::Or(rules.into_iter().collect()).into()
}

/// Evaluate children in order, stopping at the first that does not allow
pub fn chain(rules: impl IntoIterator<Item = RuleNode>) -> RuleNode {
    LogicRule::Chain(rules.into_iter().collect()).into()
}

/// Evaluate children in order, stopping at the first that allows
pub fn race(rules: impl IntoIterator<Item = RuleNode>) -> RuleNode {
    LogicRule::Race(rules.into_iter().collect()).into()
}

/// Negate a rule
pub fn not(rule: RuleNode) -> RuleNode {
    LogicRule::Not {
        rule: Box::new(rule),
        error: None,
    }
    .into()
}

/// Negate a rule, surfacing `error` instead of a plain denial when the
/// inner rule allows
pub fn not_with_error(rule: RuleNode, error: impl Into<String>) -> RuleNode {
    LogicRule::Not {
        rule: Box::new(rule),
        error: Some(error.into()),
    }
    .into()
}

/// Unconditionally allow
pub fn allow() -> RuleNode {
    LogicRule::True.into()
}

/// Unconditionally deny
pub fn deny() -> RuleNode {
    LogicRule::False.into()
}
