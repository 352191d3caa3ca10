//! Guard compilation
//!
//! [`protect`] is the engine's entry point: it validates a rule tree,
//! checks it against the host schema, and compiles exactly one [`Guard`]
//! per (type, field) pair for every non-introspection object type.
//!
//! Resolution precedence per field: an explicit rule assigned to that exact
//! field, else the type's wildcard rule, else the engine-wide fallback
//! rule. A tree (or type entry) declared as a single rule covers every
//! field it spans. Configuration mistakes (rules targeting unknown types
//! or fields, inconsistent rule-name reuse, a schema-wide rule mixed with
//! per-type rules) fail here, never at request time.

pub mod guard;
pub mod options;

pub use guard::{field_handler, FieldHandler, Guard};
pub use options::{EngineOptions, FallbackError, HashFunction};

use crate::error::{Result, WardenError};
use crate::rules::RuleNode;
use crate::schema::{ObjectType, SchemaInfo};
use crate::tree::{FieldRules, RuleTree, TypeRules};
use crate::types::FieldInfo;
use crate::validate::validate_rule_tree;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Compiled guards, one per (type, field) pair
#[derive(Debug, Clone, Default)]
pub struct GuardMap {
    guards: BTreeMap<String, BTreeMap<String, Guard>>,
}

impl GuardMap {
    /// The guard for `type_name.field_name`, if the schema declares it
    pub fn guard(&self, type_name: &str, field_name: &str) -> Option<&Guard> {
        self.guards.get(type_name)?.get(field_name)
    }

    /// Guarded type names
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.guards.keys().map(String::as_str)
    }

    /// Guards for one type's fields
    pub fn fields(&self, type_name: &str) -> impl Iterator<Item = (&str, &Guard)> {
        self.guards
            .get(type_name)
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(name, guard)| (name.as_str(), guard)))
    }

    /// Total number of compiled guards
    pub fn len(&self) -> usize {
        self.guards.values().map(BTreeMap::len).sum()
    }

    /// Whether no guards were compiled
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, type_name: &str, field_name: &str, guard: Guard) {
        self.guards
            .entry(type_name.to_string())
            .or_default()
            .insert(field_name.to_string(), guard);
    }
}

/// Compile a rule tree against a schema into per-field guards.
///
/// Validates the tree (inconsistent rule-name reuse), rejects rules that
/// target types or fields the schema does not declare, skips
/// introspection-only types, and binds one guard per remaining field.
pub fn protect(schema: &SchemaInfo, tree: &RuleTree, options: EngineOptions) -> Result<GuardMap> {
    validate_rule_tree(tree)?;

    if tree.global_rule().is_some() && !tree.types().is_empty() {
        return Err(WardenError::MixedTreeShape);
    }

    let unknown: Vec<&str> = tree
        .types()
        .keys()
        .map(String::as_str)
        .filter(|name| !schema.contains_type(name))
        .collect();
    if !unknown.is_empty() {
        return Err(WardenError::UnknownTypes(unknown.join(", ")));
    }

    let options = Arc::new(options);
    let mut guards = GuardMap::default();

    for object in schema.objects().filter(|object| !object.is_introspection()) {
        match tree.global_rule() {
            Some(rule) => bind_rule_to_type(&mut guards, object, rule, &options),
            None => match tree.types().get(object.name()) {
                None => {
                    let fallback = options.fallback_rule.clone();
                    bind_rule_to_type(&mut guards, object, &fallback, &options);
                }
                Some(TypeRules::All(rule)) => bind_rule_to_type(&mut guards, object, rule, &options),
                Some(TypeRules::Fields(field_rules)) => {
                    bind_field_rules(&mut guards, object, field_rules, &options)?
                }
            },
        }
    }

    debug!(guards = guards.len(), "compiled field guards");
    Ok(guards)
}

/// Bind one rule to every field of a type
fn bind_rule_to_type(
    guards: &mut GuardMap,
    object: &ObjectType,
    rule: &RuleNode,
    options: &Arc<EngineOptions>,
) {
    for field in object.fields() {
        let info = FieldInfo::new(object.name(), field);
        guards.insert(
            object.name(),
            field,
            Guard::new(rule.clone(), Arc::clone(options), info),
        );
    }
}

/// Bind per-field rules, falling back to the wildcard and then the
/// engine-wide fallback rule
fn bind_field_rules(
    guards: &mut GuardMap,
    object: &ObjectType,
    field_rules: &FieldRules,
    options: &Arc<EngineOptions>,
) -> Result<()> {
    let unknown: Vec<String> = field_rules
        .fields()
        .keys()
        .filter(|field| !object.has_field(field))
        .map(|field| format!("{}.{}", object.name(), field))
        .collect();
    if !unknown.is_empty() {
        return Err(WardenError::UnknownFields(unknown.join(", ")));
    }

    for field in object.fields() {
        let rule = field_rules
            .fields()
            .get(field)
            .or_else(|| field_rules.wildcard_rule())
            .unwrap_or(&options.fallback_rule)
            .clone();
        let info = FieldInfo::new(object.name(), field);
        guards.insert(
            object.name(),
            field,
            Guard::new(rule, Arc::clone(options), info),
        );
    }

    Ok(())
}
