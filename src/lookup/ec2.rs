//! Machine image lookups against the EC2 API.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client;
use tracing::info;

use super::ContextProvider;
use crate::context::{ContextProviderKind, MissingContext};
use crate::error::{Error, Result};
use crate::stack::UNKNOWN_REGION;

/// Resolves the newest image matching a query's name pattern and owners
#[derive(Debug, Default, Clone)]
pub struct Ec2ImageProvider;

impl Ec2ImageProvider {
    pub fn new() -> Self {
        Self
    }

    /// Create AWS EC2 client
    async fn create_client(region: Option<&str>) -> Client {
        let config = if let Some(region_str) = region {
            aws_config::defaults(BehaviorVersion::latest())
                .region(aws_sdk_ec2::config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::defaults(BehaviorVersion::latest())
                .load()
                .await
        };

        Client::new(&config)
    }
}

#[async_trait]
impl ContextProvider for Ec2ImageProvider {
    fn kind(&self) -> ContextProviderKind {
        ContextProviderKind::AmiProvider
    }

    async fn resolve(&self, missing: &MissingContext) -> Result<String> {
        let region = (missing.region != UNKNOWN_REGION).then_some(missing.region.as_str());
        let client = Self::create_client(region).await;

        let resp = client
            .describe_images()
            .set_owners(Some(missing.query.owners.clone()))
            .filters(
                Filter::builder()
                    .name("name")
                    .values(&missing.query.name_pattern)
                    .build(),
            )
            .filters(Filter::builder().name("image-type").values("machine").build())
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .map_err(|e| Error::ContextLookup {
                key: missing.key.clone(),
                message: format!("Failed to describe images: {}", e),
            })?;

        // ISO 8601 timestamps order lexicographically
        let newest = resp
            .images()
            .iter()
            .filter(|image| image.image_id().is_some())
            .max_by(|a, b| a.creation_date().cmp(&b.creation_date()))
            .ok_or_else(|| Error::ContextLookup {
                key: missing.key.clone(),
                message: format!(
                    "no image named '{}' owned by {}",
                    missing.query.name_pattern,
                    missing.query.owners.join(", ")
                ),
            })?;

        let image_id = newest.image_id().unwrap_or_default().to_string();
        info!(
            image_id = %image_id,
            name = newest.name().unwrap_or_default(),
            created = newest.creation_date().unwrap_or_default(),
            "Resolved machine image"
        );

        Ok(image_id)
    }
}
