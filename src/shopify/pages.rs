//! Online store pages, stored as `<handle>.html` with a JSON sidecar.

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

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: u64,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub template_suffix: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl PageMetadata {
    /// Used when a local page has no sidecar
    pub fn defaults_for(handle: &str) -> Self {
        Self {
            title: title_from_handle(handle),
            published: true,
            template_suffix: None,
            author: None,
        }
    }
}

const PAGES: HandleEndpoint = HandleEndpoint {
    plural: "pages",
    singular: "page",
};

pub struct Pages {
    client: AdminClient,
}

impl Pages {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceAdapter for Pages {
    type Resource = Page;
    type Metadata = PageMetadata;

    fn resource_name(&self) -> &str {
        "pages"
    }

    fn file_extension(&self) -> &str {
        ".html"
    }

    async fn list_remote(&self) -> Result<Vec<Page>> {
        PAGES.list(&self.client).await
    }

    fn handle_of(&self, page: &Page) -> String {
        page.handle.clone()
    }

    fn extract_metadata(&self, page: &Page) -> PageMetadata {
        PageMetadata {
            title: page.title.clone(),
            published: page.published_at.is_some(),
            template_suffix: page.template_suffix.clone().filter(|s| !s.is_empty()),
            author: page.author.clone().filter(|s| !s.is_empty()),
        }
    }

    async fn download_one(&self, page: &Page, output_dir: &Path) -> Result<()> {
        let path = resource_path(output_dir, Layout::Flat, &page.handle, self.file_extension())?;
        write_atomic(&path, page.body_html.as_deref().unwrap_or_default().as_bytes())
    }

    async fn upload_one(&self, local: &LocalFile<PageMetadata>) -> Result<()> {
        let body_html = tokio::fs::read_to_string(&local.file_path)
            .await
            .map_err(|e| SyncError::io(&local.file_path, e))?;
        let meta = local
            .metadata
            .clone()
            .unwrap_or_else(|| PageMetadata::defaults_for(&local.handle));

        let mut page = json!({
            "handle": local.handle,
            "title": meta.title,
            "body_html": body_html,
            "published": meta.published,
        });
        if let Some(suffix) = &meta.template_suffix {
            page["template_suffix"] = json!(suffix);
        }
        if let Some(author) = &meta.author {
            page["author"] = json!(author);
        }

        PAGES.upsert(&self.client, &local.handle, page).await
    }

    async fn delete_one(&self, page: &Page) -> Result<()> {
        PAGES.delete(&self.client, page.id).await
    }
}
