//! Tests for context lookup resolution
//!
//! Uses an in-memory provider in place of the EC2 API.

mod common;

use async_trait::async_trait;
use common::{context_with_ip, project_with_script, test_config, SCRIPT};
use ec2_ssh_stack::context::{ContextProviderKind, DeclarationContext, MissingContext};
use ec2_ssh_stack::lookup::{declare_with_lookups, resolve_missing, ContextProvider};
use ec2_ssh_stack::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers every image lookup with a fixed id and counts calls
struct FixedImageProvider {
    image_id: &'static str,
    calls: AtomicUsize,
}

impl FixedImageProvider {
    fn new(image_id: &'static str) -> Self {
        Self {
            image_id,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ContextProvider for FixedImageProvider {
    fn kind(&self) -> ContextProviderKind {
        ContextProviderKind::AmiProvider
    }

    async fn resolve(&self, _missing: &MissingContext) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.image_id.to_string())
    }
}

/// Fails every lookup
struct FailingProvider;

#[async_trait]
impl ContextProvider for FailingProvider {
    fn kind(&self) -> ContextProviderKind {
        ContextProviderKind::AmiProvider
    }

    async fn resolve(&self, missing: &MissingContext) -> Result<String> {
        Err(Error::ContextLookup {
            key: missing.key.clone(),
            message: "no matching image".to_string(),
        })
    }
}

#[tokio::test]
async fn test_declare_with_lookups_reruns_with_resolved_image() {
    let project = project_with_script(SCRIPT.as_bytes());
    let provider = FixedImageProvider::new("ami-0fedcba9876543210");

    let (stack, resolved) = declare_with_lookups(
        &test_config(),
        &context_with_ip("203.0.113.5/32"),
        project.path(),
        &provider,
    )
    .await
    .unwrap();

    assert!(!stack.has_missing_context());
    assert_eq!(resolved.len(), 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    let instance = stack.graph().get(&stack.compute.instance).unwrap();
    assert_eq!(instance.properties["ImageId"], "ami-0fedcba9876543210");
}

#[tokio::test]
async fn test_resolved_context_skips_provider() {
    let project = project_with_script(SCRIPT.as_bytes());
    let mut config = test_config();
    config.compute.image.id = Some("ami-pinned".to_string());
    let provider = FixedImageProvider::new("ami-unused");

    let (stack, resolved) = declare_with_lookups(
        &config,
        &context_with_ip("203.0.113.5/32"),
        project.path(),
        &provider,
    )
    .await
    .unwrap();

    assert!(resolved.is_empty());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    let instance = stack.graph().get(&stack.compute.instance).unwrap();
    assert_eq!(instance.properties["ImageId"], "ami-pinned");
}

#[tokio::test]
async fn test_provider_failure_is_context_lookup_error() {
    let project = project_with_script(SCRIPT.as_bytes());
    let err = declare_with_lookups(
        &test_config(),
        &context_with_ip("203.0.113.5/32"),
        project.path(),
        &FailingProvider,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::ContextLookup { .. }));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_precondition_failure_skips_lookup() {
    let project = project_with_script(SCRIPT.as_bytes());
    let provider = FixedImageProvider::new("ami-unused");

    let err = declare_with_lookups(
        &test_config(),
        &DeclarationContext::new(),
        project.path(),
        &provider,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::MissingParameter { .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_resolve_missing_dedupes_keys() {
    let project = project_with_script(SCRIPT.as_bytes());
    let stack = ec2_ssh_stack::stack::Ec2WithSshStack::new(
        &test_config(),
        &context_with_ip("203.0.113.5/32"),
        project.path(),
    )
    .unwrap();
    let mut missing = stack.missing_context().to_vec();
    missing.extend(stack.missing_context().iter().cloned());

    let provider = FixedImageProvider::new("ami-once");
    let resolved = tokio_test::block_on(resolve_missing(&provider, &missing)).unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}
