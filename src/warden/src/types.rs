//! Core authorization types

use crate::cache::RequestCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Opaque failure raised inside a user predicate or field handler.
///
/// Faults are reference-counted so that every awaiter of a shared cache
/// entry observes the same failure.
pub type Fault = Arc<anyhow::Error>;

/// Outcome of a single rule evaluation.
///
/// Exactly one of the three variants is produced per evaluation. A denial
/// is an ordinary outcome, not an error: predicates that fail unexpectedly
/// are converted to [`Verdict::Deny`] unless the engine runs in debug mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Access granted
    Allow,
    /// Access denied, no detail
    Deny,
    /// Access denied with a human-readable reason
    DenyWithReason(String),
}

impl Verdict {
    /// Whether this verdict grants access
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    /// The denial reason, if one was given
    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::DenyWithReason(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<bool> for Verdict {
    fn from(allowed: bool) -> Self {
        if allowed {
            Verdict::Allow
        } else {
            Verdict::Deny
        }
    }
}

impl From<&str> for Verdict {
    /// A bare string from a predicate is a denial carrying that reason.
    fn from(reason: &str) -> Self {
        Verdict::DenyWithReason(reason.to_string())
    }
}

impl From<String> for Verdict {
    fn from(reason: String) -> Self {
        Verdict::DenyWithReason(reason)
    }
}

/// Metadata for the field a rule is evaluated against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Name of the object type the field belongs to (e.g. "Query")
    pub type_name: String,

    /// Name of the field itself (e.g. "viewer")
    pub field_name: String,
}

impl FieldInfo {
    /// Create field metadata for `type_name.field_name`
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }
}

impl fmt::Display for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

/// Everything a predicate receives for one evaluation: the parent value the
/// field is resolved on, the field arguments, the request context, and the
/// field metadata.
///
/// Cloning is cheap; the parent and argument payloads are shared.
#[derive(Clone)]
pub struct Invocation {
    /// Parent object the field is being resolved on
    pub parent: Arc<Value>,

    /// Arguments supplied to the field
    pub args: Arc<Value>,

    /// Request-scoped context (identity/session state plus the rule cache)
    pub ctx: RequestContext,

    /// Field metadata
    pub info: FieldInfo,
}

impl Invocation {
    /// Assemble an invocation from owned payloads
    pub fn new(parent: Value, args: Value, ctx: RequestContext, info: FieldInfo) -> Self {
        Self {
            parent: Arc::new(parent),
            args: Arc::new(args),
            ctx,
            info,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("parent", &self.parent)
            .field("args", &self.args)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Request-scoped context handed to every rule evaluation.
///
/// Carries the identity/session payload established by the host before
/// authorization runs, plus the per-request rule cache. The context is
/// cheaply clonable and every clone shares the same cache; two distinct
/// requests must each build their own context so cached verdicts never leak
/// across requests.
#[derive(Clone, Default)]
pub struct RequestContext {
    data: Arc<Value>,
    cache: Arc<OnceLock<RequestCache>>,
}

impl RequestContext {
    /// Create a context for one request carrying the given payload
    pub fn new(data: Value) -> Self {
        Self {
            data: Arc::new(data),
            cache: Arc::new(OnceLock::new()),
        }
    }

    /// The identity/session payload supplied by the host
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Look up a top-level key in the context payload
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The per-request rule cache, created lazily on first use
    pub fn cache(&self) -> &RequestCache {
        self.cache.get_or_init(RequestCache::new)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("data", &self.data)
            .field("cached_rules", &self.cache.get().map_or(0, RequestCache::len))
            .finish()
    }
}
