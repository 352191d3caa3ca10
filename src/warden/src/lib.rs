//! # Warden
//!
//! Field-level authorization engine: declarative rule trees compiled into
//! per-field guards.
//!
//! Given a typed API surface (object types exposing named fields) and a
//! tree of access rules attached to those types and fields, Warden
//! produces, for every field, a guard that must allow before the field's
//! handler runs.
//!
//! ## Features
//!
//! - **Atomic rules** wrapping async predicates, with per-request
//!   memoization (`NoCache`, `Contextual`, `Strict`, or a custom key)
//! - **Logic combinators** (`and`, `or`, `chain`, `race`, `not`, plus the
//!   `allow`/`deny` constants) with well-defined concurrency and
//!   short-circuit semantics
//! - **Single-flight caching**: concurrent branches racing for one cache
//!   key share one predicate execution per request
//! - **Eager validation**: inconsistent rule-name reuse and rules targeting
//!   unknown types or fields fail at compile time, never per request
//!
//! ## Example
//!
//! ```rust
//! use serde_json::{json, Value};
//! use warden::{
//!     and, field_handler, protect, rule, CachePolicy, EngineOptions, FieldRules, ObjectType,
//!     RequestContext, Rule, RuleTree, SchemaInfo, Verdict,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = SchemaInfo::new()
//!         .with_object(ObjectType::new("Query").with_fields(["viewer", "stats"]));
//!
//!     let is_authenticated: warden::RuleNode =
//!         Rule::new("is-authenticated", |inv| async move {
//!             Ok(Verdict::from(inv.ctx.get("user").is_some()))
//!         })
//!         .with_cache(CachePolicy::Contextual)
//!         .into();
//!
//!     let tree = RuleTree::new().with_type(
//!         "Query",
//!         FieldRules::new()
//!             .field("viewer", is_authenticated.clone())
//!             .field("stats", and([is_authenticated, rule("is-admin", |inv| async move {
//!                 Ok(Verdict::from(inv.ctx.get("role") == Some(&json!("admin"))))
//!             })])),
//!     );
//!
//!     let guards = protect(&schema, &tree, EngineOptions::default())?;
//!
//!     let handler = field_handler(|_| async { Ok(Value::from("me")) });
//!     let ctx = RequestContext::new(json!({ "user": "alice", "role": "admin" }));
//!     let guard = guards.guard("Query", "viewer").expect("compiled");
//!     let result = guard.invoke(&handler, json!({}), json!({}), &ctx).await?;
//!     assert_eq!(result, json!("me"));
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod rules;
pub mod schema;
pub mod tree;
pub mod types;
pub mod validate;

// Re-export commonly used items
pub use engine::{
    field_handler, protect, EngineOptions, FallbackError, FieldHandler, Guard, GuardMap,
    HashFunction,
};
pub use error::{Result, WardenError};
pub use rules::{
    allow, and, chain, deny, not, not_with_error, or, race, rule, rule_anon, CachePolicy,
    LogicRule, Rule, RuleNode,
};
pub use schema::{ObjectType, SchemaInfo};
pub use tree::{FieldRules, RuleTree, TypeRules};
pub use types::{Fault, FieldInfo, Invocation, RequestContext, Verdict};
pub use validate::validate_rule_tree;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
