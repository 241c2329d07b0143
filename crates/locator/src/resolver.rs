//! First-visible-wins resolution loop.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use webreplay_core_types::Target;

use crate::candidates::candidate_locators;
use crate::types::{ElementHandle, LocatorKind, LocatorSpec, RoleHint};

/// Why a single strategy probe failed. Probe failures are swallowed by
/// the resolver; only exhaustion surfaces to the caller.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("query could not be constructed: {0}")]
    BadQuery(String),
    #[error("no visible match within timeout")]
    NotVisible,
    #[error("page query failed: {0}")]
    Page(String),
}

/// Minimal page surface the resolver needs: wait for one visible match
/// of a single strategy.
#[async_trait]
pub trait PageQuery: Send + Sync {
    async fn wait_visible(
        &self,
        spec: &LocatorSpec,
        timeout: Duration,
    ) -> Result<ElementHandle, QueryError>;
}

#[async_trait]
impl<T: PageQuery + ?Sized> PageQuery for std::sync::Arc<T> {
    async fn wait_visible(
        &self,
        spec: &LocatorSpec,
        timeout: Duration,
    ) -> Result<ElementHandle, QueryError> {
        (**self).wait_visible(spec, timeout).await
    }
}

/// A successful resolution: the handle plus the strategy that won.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub handle: ElementHandle,
    pub kind: LocatorKind,
}

#[derive(Debug, Clone, Error)]
pub enum LocatorError {
    /// The target carried no usable locator field at all.
    #[error("no locator candidates for target")]
    NoCandidates,
    /// Every candidate was tried without a visible match.
    #[error("all locator strategies exhausted (tried: {})", tried.join(", "))]
    Exhausted { tried: Vec<String> },
}

/// Runs the candidate list against a page, strictly in order.
pub struct ElementResolver<Q> {
    query: Q,
}

impl<Q: PageQuery> ElementResolver<Q> {
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    /// Try each candidate with `timeout` applied per strategy. The first
    /// visible element wins; probe failures are logged and skipped.
    pub async fn resolve(
        &self,
        target: &Target,
        hint: RoleHint,
        timeout: Duration,
    ) -> Result<Resolved, LocatorError> {
        let candidates = candidate_locators(target, hint);
        if candidates.is_empty() {
            return Err(LocatorError::NoCandidates);
        }

        let mut tried = Vec::with_capacity(candidates.len());
        for spec in &candidates {
            debug!(strategy = spec.kind.name(), value = %spec.value, "probing locator");
            match self.query.wait_visible(spec, timeout).await {
                Ok(handle) => {
                    debug!(strategy = spec.kind.name(), "locator resolved");
                    return Ok(Resolved {
                        handle,
                        kind: spec.kind,
                    });
                }
                Err(err) => {
                    debug!(strategy = spec.kind.name(), error = %err, "strategy missed");
                    tried.push(spec.to_string());
                }
            }
        }

        Err(LocatorError::Exhausted { tried })
    }
}
