//! Declarative rule trees
//!
//! A tree maps object types to field rules, with two shortcuts: a single
//! rule may cover every field of a type, or every field of the whole
//! schema. Field maps support a wildcard rule covering any field of the
//! type not listed explicitly. The wildcard is kept separate from the
//! explicit field rules at construction time, so compiling a type never
//! mutates the declared tree.
//!
//! A schema-wide rule and per-type rules are mutually exclusive; a tree
//! declaring both is rejected when it is compiled, like every other
//! configuration mistake.

use crate::rules::RuleNode;
use std::collections::BTreeMap;

/// Field-level rules for one object type
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    fields: BTreeMap<String, RuleNode>,
    wildcard: Option<RuleNode>,
}

impl FieldRules {
    /// Create an empty field map
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a rule to a named field.
    ///
    /// The name `"*"` is the wildcard: it covers every field of the type
    /// not otherwise listed and is never matched against the schema's field
    /// names.
    pub fn field(mut self, name: impl Into<String>, rule: impl Into<RuleNode>) -> Self {
        let name = name.into();
        if name == "*" {
            self.wildcard = Some(rule.into());
        } else {
            self.fields.insert(name, rule.into());
        }
        self
    }

    /// Assign the wildcard rule for this type
    pub fn wildcard(mut self, rule: impl Into<RuleNode>) -> Self {
        self.wildcard = Some(rule.into());
        self
    }

    /// Explicitly listed field rules
    pub fn fields(&self) -> &BTreeMap<String, RuleNode> {
        &self.fields
    }

    /// The wildcard rule, if declared
    pub fn wildcard_rule(&self) -> Option<&RuleNode> {
        self.wildcard.as_ref()
    }
}

/// Rules for one object type: either a single rule covering every field or
/// a per-field map
#[derive(Debug, Clone)]
pub enum TypeRules {
    /// One rule applied to every field of the type
    All(RuleNode),
    /// Per-field rules with an optional wildcard
    Fields(FieldRules),
}

impl From<RuleNode> for TypeRules {
    fn from(rule: RuleNode) -> Self {
        TypeRules::All(rule)
    }
}

impl From<FieldRules> for TypeRules {
    fn from(fields: FieldRules) -> Self {
        TypeRules::Fields(fields)
    }
}

/// A declared rule tree, immutable once validated
#[derive(Debug, Clone, Default)]
pub struct RuleTree {
    global: Option<RuleNode>,
    types: BTreeMap<String, TypeRules>,
}

impl RuleTree {
    /// Create an empty per-type tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one rule to every field of every type
    pub fn global(rule: impl Into<RuleNode>) -> Self {
        Self {
            global: Some(rule.into()),
            types: BTreeMap::new(),
        }
    }

    /// Add rules for an object type
    pub fn with_type(mut self, name: impl Into<String>, rules: impl Into<TypeRules>) -> Self {
        self.types.insert(name.into(), rules.into());
        self
    }

    /// The schema-wide rule, if this tree declares one
    pub fn global_rule(&self) -> Option<&RuleNode> {
        self.global.as_ref()
    }

    /// Per-type rules (empty for a schema-wide tree)
    pub fn types(&self) -> &BTreeMap<String, TypeRules> {
        &self.types
    }

    /// Every rule node declared anywhere in the tree, in declaration order
    pub(crate) fn nodes(&self) -> Vec<&RuleNode> {
        let mut nodes: Vec<&RuleNode> = self.global.iter().collect();
        for rules in self.types.values() {
            match rules {
                TypeRules::All(rule) => nodes.push(rule),
                TypeRules::Fields(fields) => {
                    nodes.extend(fields.fields().values());
                    if let Some(wildcard) = fields.wildcard_rule() {
                        nodes.push(wildcard);
                    }
                }
            }
        }
        nodes
    }
}
