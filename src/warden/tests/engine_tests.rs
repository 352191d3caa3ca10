//! End-to-end engine tests
//!
//! Exercises the complete pipeline: rule tree declaration → validation →
//! guard compilation → guarded field invocation with a request context.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden::{
    allow, and, deny, field_handler, not_with_error, protect, rule, CachePolicy, EngineOptions,
    FallbackError, FieldHandler, FieldRules, ObjectType, RequestContext, Rule, RuleTree,
    SchemaInfo, Verdict, WardenError,
};

fn schema() -> SchemaInfo {
    SchemaInfo::new()
        .with_object(ObjectType::new("Query").with_fields(["a", "b"]))
        .with_object(ObjectType::new("User").with_fields(["id", "email"]))
}

fn echo_handler() -> FieldHandler {
    field_handler(|inv| async move { Ok(json!({ "field": inv.info.field_name })) })
}

fn authenticated() -> warden::RuleNode {
    Rule::new("is-authenticated", |inv| async move {
        Ok(Verdict::from(inv.ctx.get("user").is_some()))
    })
    .with_cache(CachePolicy::Contextual)
    .into()
}

// ============================================================================
// GUARD RESOLUTION PRECEDENCE
// ============================================================================

#[tokio::test]
async fn explicit_rule_wins_over_wildcard() {
    let tree = RuleTree::new().with_type(
        "Query",
        FieldRules::new().field("a", allow()).field("*", deny()),
    );
    let guards = protect(&schema(), &tree, EngineOptions::default()).unwrap();
    let handler = echo_handler();
    let ctx = RequestContext::default();

    let allowed = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(allowed, json!({ "field": "a" }));

    let denied = guards
        .guard("Query", "b")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(denied, json!("Not Authorised!"), "wildcard covers unlisted fields");
}

#[tokio::test]
async fn fallback_rule_covers_fields_without_wildcard() {
    let tree = RuleTree::new().with_type("Query", FieldRules::new().field("a", allow()));
    let options = EngineOptions::default().with_fallback_rule(deny());
    let guards = protect(&schema(), &tree, options).unwrap();
    let handler = echo_handler();
    let ctx = RequestContext::default();

    let denied = guards
        .guard("Query", "b")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(denied, json!("Not Authorised!"));

    // A whole type missing from the tree is covered the same way.
    let denied = guards
        .guard("User", "email")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(denied, json!("Not Authorised!"));
}

#[tokio::test]
async fn global_rule_covers_every_field_of_every_type() {
    let guards = protect(&schema(), &RuleTree::global(deny()), EngineOptions::default()).unwrap();
    let handler = echo_handler();
    let ctx = RequestContext::default();

    for (type_name, field_name) in [("Query", "a"), ("Query", "b"), ("User", "id")] {
        let result = guards
            .guard(type_name, field_name)
            .unwrap()
            .invoke(&handler, json!({}), json!({}), &ctx)
            .await
            .unwrap();
        assert_eq!(result, json!("Not Authorised!"), "{type_name}.{field_name}");
    }
}

#[tokio::test]
async fn type_level_rule_covers_all_fields_of_that_type() {
    let tree = RuleTree::new().with_type("User", deny());
    let guards = protect(&schema(), &tree, EngineOptions::default()).unwrap();
    let handler = echo_handler();
    let ctx = RequestContext::default();

    let denied = guards
        .guard("User", "id")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(denied, json!("Not Authorised!"));

    // Types without rules default to the engine fallback (allow).
    let open = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(open, json!({ "field": "a" }));
}

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

#[tokio::test]
async fn misconfigured_trees_never_reach_request_time() {
    let tree = RuleTree::new().with_type("Query", FieldRules::new().field("ghost", allow()));
    let err = protect(&schema(), &tree, EngineOptions::default()).unwrap_err();
    assert!(matches!(err, WardenError::UnknownFields(ref f) if f == "Query.ghost"));

    let tree = RuleTree::new().with_type("Ghost", allow());
    let err = protect(&schema(), &tree, EngineOptions::default()).unwrap_err();
    assert!(matches!(err, WardenError::UnknownTypes(ref t) if t == "Ghost"));
}

// ============================================================================
// CONTEXT-DRIVEN DECISIONS
// ============================================================================

#[tokio::test]
async fn identity_in_the_context_drives_the_verdict() {
    let tree = RuleTree::new().with_type(
        "Query",
        FieldRules::new().field("a", authenticated()).wildcard(deny()),
    );
    let guards = protect(&schema(), &tree, EngineOptions::default()).unwrap();
    let handler = echo_handler();
    let guard = guards.guard("Query", "a").unwrap();

    let signed_in = RequestContext::new(json!({ "user": "alice" }));
    let result = guard
        .invoke(&handler, json!({}), json!({}), &signed_in)
        .await
        .unwrap();
    assert_eq!(result, json!({ "field": "a" }));

    let anonymous = RequestContext::new(json!({}));
    let result = guard
        .invoke(&handler, json!({}), json!({}), &anonymous)
        .await
        .unwrap();
    assert_eq!(result, json!("Not Authorised!"));
}

// ============================================================================
// FALLBACK ERROR SURFACES
// ============================================================================

#[tokio::test]
async fn denied_fields_resolve_to_the_static_fallback_value() {
    let options = EngineOptions::default()
        .with_fallback_error(FallbackError::Static(json!({ "code": "FORBIDDEN" })));
    let guards = protect(&schema(), &RuleTree::global(deny()), options).unwrap();
    let handler = echo_handler();
    let ctx = RequestContext::default();

    let result = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(result, json!({ "code": "FORBIDDEN" }), "never null by omission");
}

#[tokio::test]
async fn fallback_handler_sees_the_fault_and_the_field() {
    let options = EngineOptions::default().with_fallback_error(FallbackError::handler(
        |fault, invocation| async move {
            json!({
                "field": invocation.info.to_string(),
                "fault": fault.map(|f| f.to_string()),
            })
        },
    ));
    let tree = RuleTree::new().with_type(
        "Query",
        FieldRules::new()
            .field("a", deny())
            .field("b", rule("reasoned", |_| async { Ok(Verdict::from("not yours")) })),
    );
    let guards = protect(&schema(), &tree, options).unwrap();
    let handler = echo_handler();
    let ctx = RequestContext::default();

    let plain = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(plain, json!({ "field": "Query.a", "fault": null }));

    let reasoned = guards
        .guard("Query", "b")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(reasoned, json!({ "field": "Query.b", "fault": "not yours" }));
}

// ============================================================================
// ERROR-SURFACING MODES
// ============================================================================

#[tokio::test]
async fn allow_external_errors_surfaces_reasons_verbatim() {
    let tree = RuleTree::new().with_type(
        "Query",
        FieldRules::new()
            .field("a", not_with_error(allow(), "members only"))
            .wildcard(deny()),
    );
    let options = EngineOptions::default().with_allow_external_errors(true);
    let guards = protect(&schema(), &tree, options).unwrap();
    let handler = echo_handler();
    let ctx = RequestContext::default();

    let err = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "members only");

    // Plain denials still collapse to the fallback value.
    let denied = guards
        .guard("Query", "b")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(denied, json!("Not Authorised!"));
}

#[tokio::test]
async fn debug_mode_propagates_predicate_faults() {
    let tree = RuleTree::new().with_type(
        "Query",
        FieldRules::new().field("a", rule("broken", |_| async { Err(anyhow::anyhow!("boom")) })),
    );
    let options = EngineOptions::default().with_debug(true);
    let guards = protect(&schema(), &tree, options).unwrap();
    let handler = echo_handler();
    let ctx = RequestContext::default();

    let err = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn surfaced_faults_keep_their_source_chain() {
    let tree = RuleTree::new().with_type(
        "Query",
        FieldRules::new().field(
            "a",
            rule("session", |_| async {
                let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "socket closed");
                Err(anyhow::Error::new(io).context("session lookup failed"))
            }),
        ),
    );
    let options = EngineOptions::default().with_debug(true);
    let guards = protect(&schema(), &tree, options).unwrap();
    let handler = echo_handler();

    let err = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &RequestContext::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "session lookup failed");
    assert!(
        err.chain().any(|cause| cause.to_string() == "socket closed"),
        "the underlying cause must stay inspectable"
    );
}

#[tokio::test]
async fn predicate_faults_deny_quietly_by_default() {
    let tree = RuleTree::new().with_type(
        "Query",
        FieldRules::new().field("a", rule("broken", |_| async { Err(anyhow::anyhow!("boom")) })),
    );
    let guards = protect(&schema(), &tree, EngineOptions::default()).unwrap();
    let handler = echo_handler();
    let ctx = RequestContext::default();

    let result = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(result, json!("Not Authorised!"), "fault detail stays internal");
}

#[tokio::test]
async fn handler_faults_follow_the_same_policy() {
    let failing: FieldHandler = field_handler(|_| async { Err(anyhow::anyhow!("db down")) });
    let guards = protect(&schema(), &RuleTree::global(allow()), EngineOptions::default()).unwrap();
    let ctx = RequestContext::default();

    let masked = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&failing, json!({}), json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(masked, json!("Not Authorised!"));

    let options = EngineOptions::default().with_allow_external_errors(true);
    let guards = protect(&schema(), &RuleTree::global(allow()), options).unwrap();
    let err = guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&failing, json!({}), json!({}), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "db down");
}

// ============================================================================
// FRAGMENTS & HANDLER INVOCATION
// ============================================================================

#[tokio::test]
async fn guards_expose_fragments_of_their_bound_rule() {
    let owner: warden::RuleNode = Rule::new("owner", |_| async { Ok(Verdict::Allow) })
        .with_fragment("fragment Owner on User { ownerId }")
        .into();
    let tree = RuleTree::new().with_type(
        "User",
        FieldRules::new().field("email", and([authenticated(), owner])),
    );
    let guards = protect(&schema(), &tree, EngineOptions::default()).unwrap();

    assert_eq!(
        guards.guard("User", "email").unwrap().fragments(),
        vec!["fragment Owner on User { ownerId }"]
    );
    assert!(guards.guard("User", "id").unwrap().fragments().is_empty());
}

#[tokio::test]
async fn denied_fields_never_run_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let handler: FieldHandler = field_handler(move |_| {
        let calls = Arc::clone(&counted);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    });

    let guards = protect(&schema(), &RuleTree::global(deny()), EngineOptions::default()).unwrap();
    guards
        .guard("Query", "a")
        .unwrap()
        .invoke(&handler, json!({}), json!({}), &RequestContext::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
