//! Per-field guards
//!
//! A guard is the compiled gate for one (type, field) pair: it holds the
//! resolved rule for that field and the engine options, and decides per
//! invocation whether the wrapped handler runs. Guards are bound once when
//! the rule tree is compiled and reused for the schema's lifetime.

use crate::engine::options::EngineOptions;
use crate::rules::RuleNode;
use crate::types::{Fault, FieldInfo, Invocation, RequestContext, Verdict};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// The field's underlying handler, wrapped by a guard
pub type FieldHandler =
    Arc<dyn Fn(Invocation) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Wrap an async function as a [`FieldHandler`]
pub fn field_handler<F, Fut>(handler: F) -> FieldHandler
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |invocation| handler(invocation).boxed())
}

/// The compiled gate for one field
#[derive(Debug, Clone)]
pub struct Guard {
    rule: RuleNode,
    options: Arc<EngineOptions>,
    info: FieldInfo,
}

impl Guard {
    pub(crate) fn new(rule: RuleNode, options: Arc<EngineOptions>, info: FieldInfo) -> Self {
        Self {
            rule,
            options,
            info,
        }
    }

    /// The field this guard protects
    pub fn field_info(&self) -> &FieldInfo {
        &self.info
    }

    /// The rule bound to this field
    pub fn rule(&self) -> &RuleNode {
        &self.rule
    }

    /// Additional-data requirements declared by the bound rule, for the
    /// interception layer
    pub fn fragments(&self) -> Vec<String> {
        self.rule.extract_fragments()
    }

    /// Run the guard for one request and, if it allows, the wrapped
    /// handler.
    ///
    /// Denials resolve to the configured fallback error value. Denial
    /// reasons and faults are surfaced through the error channel only in
    /// debug mode or when external errors are allowed; otherwise they are
    /// handed to the fallback instead.
    pub async fn invoke(
        &self,
        handler: &FieldHandler,
        parent: Value,
        args: Value,
        ctx: &RequestContext,
    ) -> anyhow::Result<Value> {
        // Materialize the request cache up front so every branch of the
        // rule tree sees the same store.
        ctx.cache();

        let invocation = Invocation::new(parent, args, ctx.clone(), self.info.clone());

        match self.rule.resolve(&invocation, &self.options).await {
            Ok(Verdict::Allow) => match handler(invocation.clone()).await {
                Ok(value) => Ok(value),
                Err(fault) => {
                    debug!(field = %self.info, %fault, "field handler failed");
                    self.denied(Some(Arc::new(fault)), &invocation).await
                }
            },
            Ok(Verdict::Deny) => {
                debug!(field = %self.info, "access denied");
                Ok(self.options.fallback_error.render(None, &invocation).await)
            }
            Ok(Verdict::DenyWithReason(reason)) => {
                debug!(field = %self.info, %reason, "access denied with reason");
                self.denied(Some(Arc::new(anyhow::anyhow!(reason))), &invocation)
                    .await
            }
            // Reachable only in debug mode; resolution converts faults to
            // denials otherwise.
            Err(fault) => Err(anyhow::Error::new(SurfacedFault(fault))),
        }
    }

    /// Apply the error-surfacing policy for a denial that carries detail
    async fn denied(&self, fault: Option<Fault>, invocation: &Invocation) -> anyhow::Result<Value> {
        match fault {
            Some(fault) if self.options.debug || self.options.allow_external_errors => {
                Err(anyhow::Error::new(SurfacedFault(fault)))
            }
            fault => Ok(self.options.fallback_error.render(fault, invocation).await),
        }
    }
}

/// A shared fault re-surfaced through the caller-facing error channel.
///
/// Faults are reference-counted so that cached outcomes stay clonable; this
/// wrapper hands one back to the caller with its source chain intact, so
/// `debug`/`allow_external_errors` expose the full cause for inspection.
#[derive(Debug, Clone)]
struct SurfacedFault(Fault);

impl fmt::Display for SurfacedFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for SurfacedFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &anyhow::Error = &self.0;
        Some(inner.as_ref())
    }
}
