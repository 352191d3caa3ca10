//! Atomic rules: a named predicate plus a cache policy

use crate::cache::Resolution;
use crate::engine::options::EngineOptions;
use crate::types::{Invocation, Verdict};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// User-supplied predicate deciding one access check.
///
/// Returning `Ok(Verdict)` is an ordinary outcome (including denials with a
/// reason); returning `Err` is a fault and is converted to a plain denial
/// unless the engine runs in debug mode.
pub type Predicate =
    Arc<dyn Fn(Invocation) -> BoxFuture<'static, anyhow::Result<Verdict>> + Send + Sync>;

/// Counter backing generated names for anonymous rules
static ANONYMOUS_RULES: AtomicU64 = AtomicU64::new(0);

/// How a rule's outcome is memoized within one request
#[derive(Clone, Default)]
pub enum CachePolicy {
    /// Re-evaluate the predicate on every reference
    #[default]
    NoCache,

    /// Memoize once per request, keyed by rule name alone; two references
    /// with different arguments share the same cached verdict
    Contextual,

    /// Memoize once per request, keyed by rule name plus a hash of the
    /// parent value and arguments
    Strict,

    /// Memoize under a key computed by a user-supplied function of the
    /// invocation
    Custom(Arc<dyn Fn(&Invocation) -> String + Send + Sync>),
}

impl fmt::Debug for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePolicy::NoCache => write!(f, "NoCache"),
            CachePolicy::Contextual => write!(f, "Contextual"),
            CachePolicy::Strict => write!(f, "Strict"),
            CachePolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// An atomic, named access rule wrapping a predicate.
///
/// Two rules are considered the same rule iff they wrap the identical
/// predicate reference; sharing a name alone does not make them equal. The
/// tree validator relies on exactly this asymmetry to flag inconsistent
/// name reuse.
#[derive(Clone)]
pub struct Rule {
    name: String,
    predicate: Predicate,
    cache: CachePolicy,
    fragment: Option<String>,
}

impl Rule {
    /// Create a named rule with the default (no-cache) policy
    pub fn new<F, Fut>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Verdict>> + Send + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(move |invocation| predicate(invocation).boxed()),
            cache: CachePolicy::default(),
            fragment: None,
        }
    }

    /// Create a rule with a generated unique name
    pub fn anonymous<F, Fut>(predicate: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Verdict>> + Send + 'static,
    {
        let id = ANONYMOUS_RULES.fetch_add(1, Ordering::Relaxed);
        Self::new(format!("rule-{id}"), predicate)
    }

    /// Set the cache policy
    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Declare an additional-data requirement for the interception layer.
    ///
    /// The fragment is opaque to the engine: it is collected and exposed
    /// through guards, never interpreted.
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// The rule's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared fragment, if any
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Whether both rules wrap the identical predicate reference
    pub fn equals(&self, other: &Rule) -> bool {
        Arc::ptr_eq(&self.predicate, &other.predicate)
    }

    /// Evaluate the rule for one invocation, consulting the per-request
    /// cache according to the rule's policy.
    ///
    /// Cacheable rules execute their predicate at most once per key per
    /// request: concurrent resolutions racing for the same key await one
    /// shared execution. Predicate faults are returned only in debug mode;
    /// otherwise they collapse to [`Verdict::Deny`].
    pub async fn resolve(&self, invocation: &Invocation, options: &EngineOptions) -> Resolution {
        let outcome = match self.cache_key(invocation, options) {
            None => (self.predicate)(invocation.clone()).await.map_err(Arc::new),
            Some(key) => {
                trace!(rule = %self.name, %key, "resolving through request cache");
                let predicate = Arc::clone(&self.predicate);
                let shared_invocation = invocation.clone();
                invocation
                    .ctx
                    .cache()
                    .single_flight(&key, move || {
                        async move { predicate(shared_invocation).await.map_err(Arc::new) }
                            .boxed()
                    })
                    .await
            }
        };

        match outcome {
            Ok(verdict) => Ok(verdict),
            Err(fault) if options.debug => Err(fault),
            Err(fault) => {
                debug!(rule = %self.name, %fault, "predicate fault treated as denial");
                Ok(Verdict::Deny)
            }
        }
    }

    /// Compose the cache key for this invocation, or `None` when the
    /// predicate must run every time
    fn cache_key(&self, invocation: &Invocation, options: &EngineOptions) -> Option<String> {
        match &self.cache {
            CachePolicy::NoCache => None,
            CachePolicy::Contextual => Some(self.name.clone()),
            CachePolicy::Strict => {
                let hash = (options.hash_function)(&invocation.parent, &invocation.args);
                Some(format!("{}-{}", self.name, hash))
            }
            CachePolicy::Custom(key_fn) => Some(format!("{}-{}", self.name, key_fn(invocation))),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .field("fragment", &self.fragment)
            .finish_non_exhaustive()
    }
}
