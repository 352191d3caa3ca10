//! Rule-tree validation
//!
//! A tree is valid when no two structurally different rules share a name.
//! Rules are compared by predicate reference identity, never by inspecting
//! their bodies, so reusing the *same* rule under one name anywhere in the
//! tree is fine; declaring a second, distinct rule under an already-seen
//! name is a configuration error.

use crate::error::{Result, WardenError};
use crate::rules::{Rule, RuleNode};
use crate::tree::RuleTree;
use std::collections::HashMap;
use std::sync::Arc;

/// Validate a rule tree before it is compiled against a schema.
///
/// Flattens every reachable atomic rule (recursing through combinators) and
/// reports each conflicting name once, comma-joined, in discovery order.
pub fn validate_rule_tree(tree: &RuleTree) -> Result<()> {
    let mut seen: HashMap<String, Arc<Rule>> = HashMap::new();
    let mut conflicts: Vec<String> = Vec::new();

    for node in tree.nodes() {
        collect(node, &mut seen, &mut conflicts);
    }

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(WardenError::DuplicateRuleNames(conflicts.join(", ")))
    }
}

fn collect(node: &RuleNode, seen: &mut HashMap<String, Arc<Rule>>, conflicts: &mut Vec<String>) {
    match node {
        RuleNode::Rule(rule) => match seen.get(rule.name()) {
            None => {
                seen.insert(rule.name().to_string(), Arc::clone(rule));
            }
            Some(known) if known.equals(rule) => {}
            Some(_) => {
                // report each conflicting name once
                if !conflicts.iter().any(|name| name == rule.name()) {
                    conflicts.push(rule.name().to_string());
                }
            }
        },
        RuleNode::Logic(_) => {
            for child in node.children() {
                collect(child, seen, conflicts);
            }
        }
    }
}
