//! Theme asset adapter.
//!
//! Assets are keyed by their path inside the theme (`assets/app.css`,
//! `templates/index.json`) and laid out on disk as a tree under the fixed
//! set of theme subdirectories.

use crate::error::{Result, SyncError};
use crate::resource::ResourceAdapter;
use crate::shopify::client::AdminClient;
use crate::sync::local::{resource_path, validate_handle, write_atomic, Layout, LocalFile};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

/// Theme content directories, mirroring the remote asset key prefixes.
pub const THEME_SUBDIRS: &[&str] = &[
    "assets",
    "config",
    "layout",
    "locales",
    "sections",
    "snippets",
    "templates",
];

/// Role of the published theme
pub const LIVE_ROLE: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Theme {
    pub id: u64,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub key: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Text content, only present on single-asset fetches
    #[serde(default)]
    pub value: Option<String>,
    /// Base64 binary content, only present on single-asset fetches
    #[serde(default)]
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub theme_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ThemeList {
    themes: Vec<Theme>,
}

#[derive(Deserialize)]
struct AssetList {
    assets: Vec<Asset>,
}

#[derive(Deserialize)]
struct AssetEnvelope {
    asset: Asset,
}

pub struct ThemeAssets {
    client: AdminClient,
    theme: Theme,
}

impl ThemeAssets {
    pub fn new(client: AdminClient, theme: Theme) -> Self {
        Self { client, theme }
    }

    /// Resolve the target theme by name, or the live theme when `name` is `None`.
    ///
    /// An unknown name is fatal and the error lists the available themes.
    pub async fn resolve(client: AdminClient, name: Option<&str>) -> Result<Self> {
        let list: ThemeList = client.get_json("themes.json", &[]).await?;
        let theme = select_theme(list.themes, name)?;
        tracing::info!("Using theme \"{}\" ({}, id {})", theme.name, theme.role, theme.id);
        Ok(Self::new(client, theme))
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    fn assets_path(&self) -> String {
        format!("themes/{}/assets.json", self.theme.id)
    }
}

fn select_theme(themes: Vec<Theme>, name: Option<&str>) -> Result<Theme> {
    let available = || {
        themes
            .iter()
            .map(|t| format!("{} ({})", t.name, t.role))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let found = match name {
        Some(name) => themes.iter().find(|t| t.name.eq_ignore_ascii_case(name)),
        None => themes.iter().find(|t| t.role == LIVE_ROLE),
    };

    match found {
        Some(theme) => Ok(theme.clone()),
        None => {
            let wanted = match name {
                Some(name) => format!("theme \"{}\"", name),
                None => "live theme".to_string(),
            };
            let list = available();
            Err(SyncError::NotFound(if list.is_empty() {
                format!("{}; the store has no themes", wanted)
            } else {
                format!("{}; available themes: {}", wanted, list)
            }))
        }
    }
}

/// True for well-formed keys under one of the theme subdirectories.
fn is_theme_key(key: &str) -> bool {
    let layout = Layout::Tree {
        subdirs: THEME_SUBDIRS,
    };
    validate_handle(key, layout).is_ok()
        && key
            .split_once('/')
            .is_some_and(|(dir, rest)| !rest.is_empty() && THEME_SUBDIRS.contains(&dir))
}

#[async_trait]
impl ResourceAdapter for ThemeAssets {
    type Resource = Asset;
    type Metadata = AssetMetadata;

    fn resource_name(&self) -> &str {
        "themes"
    }

    fn file_extension(&self) -> &str {
        ""
    }

    fn layout(&self) -> Layout {
        Layout::Tree {
            subdirs: THEME_SUBDIRS,
        }
    }

    async fn list_remote(&self) -> Result<Vec<Asset>> {
        let list: AssetList = self.client.get_json(&self.assets_path(), &[]).await?;
        let (keep, skipped): (Vec<_>, Vec<_>) =
            list.assets.into_iter().partition(|a| is_theme_key(&a.key));
        for asset in &skipped {
            tracing::debug!("Skipping asset outside theme directories: {}", asset.key);
        }
        Ok(keep)
    }

    fn handle_of(&self, asset: &Asset) -> String {
        asset.key.clone()
    }

    fn extract_metadata(&self, asset: &Asset) -> AssetMetadata {
        AssetMetadata {
            key: asset.key.clone(),
            content_type: asset.content_type.clone(),
            theme_role: self.theme.role.clone(),
            checksum: asset.checksum.clone(),
            updated_at: asset.updated_at,
        }
    }

    async fn download_one(&self, asset: &Asset, output_dir: &Path) -> Result<()> {
        let path = resource_path(output_dir, self.layout(), &asset.key, "")?;
        let envelope: AssetEnvelope = self
            .client
            .get_json(&self.assets_path(), &[("asset[key]", asset.key.as_str())])
            .await?;
        let fetched = envelope.asset;

        let bytes = match (fetched.value, fetched.attachment) {
            (Some(value), _) => value.into_bytes(),
            (None, Some(attachment)) => {
                BASE64
                    .decode(attachment.trim())
                    .map_err(|e| SyncError::InvalidResource {
                        handle: asset.key.clone(),
                        reason: format!("bad base64 attachment: {}", e),
                    })?
            }
            (None, None) => {
                return Err(SyncError::InvalidResource {
                    handle: asset.key.clone(),
                    reason: "asset has neither value nor attachment".to_string(),
                })
            }
        };

        write_atomic(&path, &bytes)
    }

    async fn upload_one(&self, local: &LocalFile<AssetMetadata>) -> Result<()> {
        let bytes = tokio::fs::read(&local.file_path)
            .await
            .map_err(|e| SyncError::io(&local.file_path, e))?;

        let asset = match String::from_utf8(bytes) {
            Ok(value) => json!({ "key": local.handle, "value": value }),
            Err(e) => json!({ "key": local.handle, "attachment": BASE64.encode(e.into_bytes()) }),
        };

        let _: serde_json::Value = self
            .client
            .put_json(&self.assets_path(), &json!({ "asset": asset }))
            .await?;
        Ok(())
    }

    async fn delete_one(&self, asset: &Asset) -> Result<()> {
        match self
            .client
            .delete(&self.assets_path(), &[("asset[key]", asset.key.as_str())])
            .await
        {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}
