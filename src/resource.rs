//! Resource adapter capability set.
//!
//! One implementation per resource type (theme assets, pages, collections).
//! The sync engine only ever talks to this trait.

use crate::error::Result;
use crate::sync::local::{Layout, LocalFile};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    /// Remote resource as returned by listing
    type Resource: Send + Sync;

    /// Attributes persisted in the `.meta` sidecar
    type Metadata: Serialize + DeserializeOwned + Send + Sync;

    /// Stable lowercase noun, used as output subdirectory and in log text
    fn resource_name(&self) -> &str;

    /// Suffix of local files for this type (empty for tree layouts)
    fn file_extension(&self) -> &str;

    fn layout(&self) -> Layout {
        Layout::Flat
    }

    /// Every remote resource, in listing order.
    async fn list_remote(&self) -> Result<Vec<Self::Resource>>;

    fn handle_of(&self, resource: &Self::Resource) -> String;

    fn extract_metadata(&self, resource: &Self::Resource) -> Self::Metadata;

    /// Write the resource content under `output_dir`. Must be safe to repeat.
    async fn download_one(&self, resource: &Self::Resource, output_dir: &Path) -> Result<()>;

    /// Create or update the remote resource matching `local.handle`.
    async fn upload_one(&self, local: &LocalFile<Self::Metadata>) -> Result<()>;

    /// Remove the remote resource. Must treat "already absent" as success.
    async fn delete_one(&self, resource: &Self::Resource) -> Result<()>;
}
