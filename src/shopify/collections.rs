//! Custom collections, stored as `<handle>.html` (the description) with a
//! JSON sidecar.

use crate::error::{Result, SyncError};
use crate::resource::ResourceAdapter;
use crate::shopify::client::AdminClient;
use crate::shopify::{title_from_handle, HandleEndpoint};
use crate::sync::local::{resource_path, write_atomic, Layout, LocalFile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

const COLLECTIONS: HandleEndpoint = HandleEndpoint {
    plural: "custom_collections",
    singular: "custom_collection",
};

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub id: u64,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub template_suffix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub title: String,
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_suffix: Option<String>,
}

impl CollectionMetadata {
    pub fn defaults_for(handle: &str) -> Self {
        Self {
            title: title_from_handle(handle),
            published: true,
            sort_order: None,
            template_suffix: None,
        }
    }
}

pub struct Collections {
    client: AdminClient,
}

impl Collections {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceAdapter for Collections {
    type Resource = Collection;
    type Metadata = CollectionMetadata;

    fn resource_name(&self) -> &str {
        "collections"
    }

    fn file_extension(&self) -> &str {
        ".html"
    }

    async fn list_remote(&self) -> Result<Vec<Collection>> {
        COLLECTIONS.list(&self.client).await
    }

    fn handle_of(&self, collection: &Collection) -> String {
        collection.handle.clone()
    }

    fn extract_metadata(&self, collection: &Collection) -> CollectionMetadata {
        CollectionMetadata {
            title: collection.title.clone(),
            published: collection.published_at.is_some(),
            sort_order: collection.sort_order.clone(),
            template_suffix: collection.template_suffix.clone().filter(|s| !s.is_empty()),
        }
    }

    async fn download_one(&self, collection: &Collection, output_dir: &Path) -> Result<()> {
        let path = resource_path(
            output_dir,
            Layout::Flat,
            &collection.handle,
            self.file_extension(),
        )?;
        write_atomic(
            &path,
            collection.body_html.as_deref().unwrap_or_default().as_bytes(),
        )
    }

    async fn upload_one(&self, local: &LocalFile<CollectionMetadata>) -> Result<()> {
        let body_html = tokio::fs::read_to_string(&local.file_path)
            .await
            .map_err(|e| SyncError::io(&local.file_path, e))?;
        let meta = local
            .metadata
            .clone()
            .unwrap_or_else(|| CollectionMetadata::defaults_for(&local.handle));

        let mut collection = json!({
            "handle": local.handle,
            "title": meta.title,
            "body_html": body_html,
            "published": meta.published,
        });
        if let Some(sort_order) = &meta.sort_order {
            collection["sort_order"] = json!(sort_order);
        }
        if let Some(suffix) = &meta.template_suffix {
            collection["template_suffix"] = json!(suffix);
        }

        COLLECTIONS
            .upsert(&self.client, &local.handle, collection)
            .await
    }

    async fn delete_one(&self, collection: &Collection) -> Result<()> {
        COLLECTIONS.delete(&self.client, collection.id).await
    }
}
