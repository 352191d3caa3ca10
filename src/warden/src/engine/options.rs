//! Engine configuration

use crate::rules::{allow, RuleNode};
use crate::types::{Fault, Invocation};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Hash over (parent, args) used to derive strict cache keys
pub type HashFunction = Arc<dyn Fn(&Value, &Value) -> String + Send + Sync>;

/// The value a denied field resolves to
#[derive(Clone)]
pub enum FallbackError {
    /// A fixed value returned for every denial
    Static(Value),

    /// A function of the fault (if any) and the invocation, producing the
    /// field result asynchronously
    Handler(Arc<dyn Fn(Option<Fault>, Invocation) -> BoxFuture<'static, Value> + Send + Sync>),
}

impl FallbackError {
    /// A fixed string message
    pub fn message(message: impl Into<String>) -> Self {
        FallbackError::Static(Value::String(message.into()))
    }

    /// A handler invoked per denial
    pub fn handler<F, Fut>(handler: F) -> Self
    where
        F: Fn(Option<Fault>, Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        FallbackError::Handler(Arc::new(move |fault, invocation| {
            handler(fault, invocation).boxed()
        }))
    }

    /// Produce the field result for a denial
    pub(crate) async fn render(&self, fault: Option<Fault>, invocation: &Invocation) -> Value {
        match self {
            FallbackError::Static(value) => value.clone(),
            FallbackError::Handler(handler) => handler(fault, invocation.clone()).await,
        }
    }
}

impl Default for FallbackError {
    fn default() -> Self {
        FallbackError::message("Not Authorised!")
    }
}

impl fmt::Debug for FallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackError::Static(value) => f.debug_tuple("Static").field(value).finish(),
            FallbackError::Handler(_) => write!(f, "Handler(..)"),
        }
    }
}

/// Engine options applied to every guard compiled from one rule tree
#[derive(Clone)]
pub struct EngineOptions {
    /// Rule applied to fields the tree does not cover
    pub fallback_rule: RuleNode,

    /// Field result for denials
    pub fallback_error: FallbackError,

    /// Propagate predicate faults instead of converting them to denials
    pub debug: bool,

    /// Surface faults and denial reasons verbatim instead of the fallback
    /// error
    pub allow_external_errors: bool,

    /// Hash over (parent, args) for strict cache keys
    pub hash_function: HashFunction,
}

impl EngineOptions {
    /// Set the rule applied to uncovered fields
    pub fn with_fallback_rule(mut self, rule: impl Into<RuleNode>) -> Self {
        self.fallback_rule = rule.into();
        self
    }

    /// Set the field result for denials
    pub fn with_fallback_error(mut self, fallback: FallbackError) -> Self {
        self.fallback_error = fallback;
        self
    }

    /// Toggle debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Toggle verbatim error surfacing
    pub fn with_allow_external_errors(mut self, allow: bool) -> Self {
        self.allow_external_errors = allow;
        self
    }

    /// Replace the strict cache-key hash
    pub fn with_hash_function<F>(mut self, hash: F) -> Self
    where
        F: Fn(&Value, &Value) -> String + Send + Sync + 'static,
    {
        self.hash_function = Arc::new(hash);
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fallback_rule: allow(),
            fallback_error: FallbackError::default(),
            debug: false,
            allow_external_errors: false,
            hash_function: Arc::new(default_hash),
        }
    }
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("fallback_error", &self.fallback_error)
            .field("debug", &self.debug)
            .field("allow_external_errors", &self.allow_external_errors)
            .finish_non_exhaustive()
    }
}

/// Default strict-key hash: BLAKE3 over an unambiguous JSON encoding of
/// parent and args.
///
/// The two values are wrapped in a keyed object before hashing; bare
/// concatenation of the renderings would let adjacent pairs collide
/// (`"1"+"23"` and `"12"+"3"` both read `"123"`).
fn default_hash(parent: &Value, args: &Value) -> String {
    let payload = serde_json::json!({ "parent": parent, "args": args });
    blake3::hash(payload.to_string().as_bytes())
        .to_hex()
        .to_string()
}
