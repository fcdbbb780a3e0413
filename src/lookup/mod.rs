//! Context lookups
//!
//! A declaration pass never performs I/O for its lookups; it records them as
//! [`MissingContext`] and carries on with a placeholder. This module answers
//! those records through a [`ContextProvider`] and reruns the pass with the
//! answers merged in.
//!
//! With the `aws` feature, [`ec2::Ec2ImageProvider`] resolves image lookups
//! through the EC2 `DescribeImages` API.

#[cfg(feature = "aws")]
pub mod ec2;

#[cfg(feature = "aws")]
pub use ec2::Ec2ImageProvider;

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Config;
use crate::context::{ContextProviderKind, DeclarationContext, MissingContext};
use crate::error::{Error, Result};
use crate::stack::Ec2WithSshStack;

/// Answers missing context of one kind
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Kind of lookup this provider answers
    fn kind(&self) -> ContextProviderKind;

    /// Resolve one lookup to its context value
    async fn resolve(&self, missing: &MissingContext) -> Result<String>;
}

/// Resolve every record `provider` can answer.
///
/// Fails on the first lookup the provider reports an error for, and on any
/// record of a kind the provider does not handle.
pub async fn resolve_missing(
    provider: &dyn ContextProvider,
    missing: &[MissingContext],
) -> Result<DeclarationContext> {
    let mut resolved = DeclarationContext::new();

    for record in missing {
        if record.provider != provider.kind() {
            return Err(Error::ContextLookup {
                key: record.key.clone(),
                message: format!("no provider for {:?} lookups", record.provider),
            });
        }
        if resolved.contains(&record.key) {
            continue;
        }
        let value = provider.resolve(record).await?;
        debug!(key = %record.key, value = %value, "Resolved context");
        resolved.set(record.key.clone(), value);
    }

    Ok(resolved)
}

/// Declare the stack, resolving its lookups through `provider` if needed.
///
/// Returns the stack from the final pass together with the newly resolved
/// entries, which the caller may persist to the context cache.
pub async fn declare_with_lookups(
    config: &Config,
    context: &DeclarationContext,
    project_dir: &Path,
    provider: &dyn ContextProvider,
) -> Result<(Ec2WithSshStack, DeclarationContext)> {
    let stack = Ec2WithSshStack::new(config, context, project_dir)?;
    if !stack.has_missing_context() {
        return Ok((stack, DeclarationContext::new()));
    }

    let resolved = resolve_missing(provider, stack.missing_context()).await?;
    info!(resolved = resolved.len(), "Rerunning declaration with resolved context");

    let mut merged = context.clone();
    merged.merge(resolved.clone());
    let stack = Ec2WithSshStack::new(config, &merged, project_dir)?;

    Ok((stack, resolved))
}
