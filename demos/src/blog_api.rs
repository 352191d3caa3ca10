//! Guarding a small blog API surface
//!
//! Declares a schema with queries and mutations, attaches a rule tree with
//! cache policies and combinators, and invokes guarded handlers as two
//! different principals. Run with `RUST_LOG=warden=debug` to watch rule
//! resolution and cache behavior.

use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;
use warden::{
    allow, and, chain, deny, field_handler, not_with_error, protect, CachePolicy, EngineOptions,
    FallbackError, FieldHandler, FieldRules, ObjectType, RequestContext, Rule, RuleNode, RuleTree,
    SchemaInfo, Verdict,
};

fn is_authenticated() -> RuleNode {
    Rule::new("is-authenticated", |inv| async move {
        Ok(Verdict::from(inv.ctx.get("user").is_some()))
    })
    .with_cache(CachePolicy::Contextual)
    .into()
}

fn is_editor() -> RuleNode {
    Rule::new("is-editor", |inv| async move {
        match inv.ctx.get("role").and_then(Value::as_str) {
            Some("editor") => Ok(Verdict::Allow),
            Some(_) => Ok(Verdict::from("editors only")),
            None => Ok(Verdict::Deny),
        }
    })
    .with_cache(CachePolicy::Contextual)
    .into()
}

fn owns_post() -> RuleNode {
    Rule::new("owns-post", |inv| async move {
        let owner = inv.parent.get("authorId");
        Ok(Verdict::from(owner.is_some() && owner == inv.ctx.get("user")))
    })
    .with_cache(CachePolicy::Strict)
    .with_fragment("fragment PostOwner on Post { authorId }")
    .into()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let authenticated = is_authenticated();

    let schema = SchemaInfo::new()
        .with_object(ObjectType::new("Query").with_fields(["feed", "drafts"]))
        .with_object(ObjectType::new("Mutation").with_fields(["publishPost", "deletePost"]))
        .with_object(ObjectType::new("Post").with_fields(["title", "body", "revenue"]));

    let tree = RuleTree::new()
        .with_type(
            "Query",
            FieldRules::new()
                .field("feed", allow())
                .field("drafts", authenticated.clone()),
        )
        .with_type(
            "Mutation",
            FieldRules::new()
                .field("publishPost", chain([authenticated.clone(), is_editor()]))
                .field("deletePost", and([authenticated.clone(), owns_post()]))
                .wildcard(deny()),
        )
        .with_type(
            "Post",
            FieldRules::new()
                .field(
                    "revenue",
                    not_with_error(authenticated, "sign out to see public stats"),
                )
                .wildcard(allow()),
        );

    let options = EngineOptions::default()
        .with_fallback_error(FallbackError::Static(json!({ "error": "access denied" })));
    let guards = protect(&schema, &tree, options)?;
    info!(guards = guards.len(), "rule tree compiled");

    let handler: FieldHandler =
        field_handler(|inv| async move { Ok(json!(format!("resolved {}", inv.info))) });

    let editor = RequestContext::new(json!({ "user": "alice", "role": "editor" }));
    let anonymous = RequestContext::new(json!({}));

    for (label, ctx) in [("editor alice", &editor), ("anonymous", &anonymous)] {
        println!("--- as {label} ---");
        for (type_name, field_name) in [
            ("Query", "feed"),
            ("Query", "drafts"),
            ("Mutation", "publishPost"),
            ("Mutation", "deletePost"),
            ("Post", "revenue"),
        ] {
            let guard = guards.guard(type_name, field_name).expect("guard compiled");
            let result = guard
                .invoke(
                    &handler,
                    json!({ "authorId": "alice" }),
                    json!({}),
                    ctx,
                )
                .await?;
            println!("{type_name}.{field_name} -> {result}");
        }
    }

    Ok(())
}
