//! Resource adapters for the store Admin REST API.

pub mod client;
pub mod collections;
pub mod pages;
pub mod themes;

pub use client::AdminClient;
pub use collections::Collections;
pub use pages::Pages;
pub use themes::ThemeAssets;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct IdOnly {
    id: u64,
}

/// A handle-addressed REST resource (`pages`, `custom_collections`).
///
/// Lists live at `<plural>.json` under the `<plural>` key, single items at
/// `<plural>/<id>.json` wrapped in `<singular>`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HandleEndpoint {
    pub plural: &'static str,
    pub singular: &'static str,
}

impl HandleEndpoint {
    fn list_path(&self) -> String {
        format!("{}.json", self.plural)
    }

    fn item_path(&self, id: u64) -> String {
        format!("{}/{}.json", self.plural, id)
    }

    fn wrap(&self, fields: Value) -> Value {
        let mut body = serde_json::Map::new();
        body.insert(self.singular.to_string(), fields);
        Value::Object(body)
    }

    pub async fn list<T: DeserializeOwned>(&self, client: &AdminClient) -> Result<Vec<T>> {
        client.get_all(&self.list_path(), self.plural, &[]).await
    }

    /// Remote id of the item with `handle`, if any.
    pub async fn find_id(&self, client: &AdminClient, handle: &str) -> Result<Option<u64>> {
        let found: Vec<IdOnly> = client
            .get_all(
                &self.list_path(),
                self.plural,
                &[("handle", handle), ("fields", "id")],
            )
            .await?;
        Ok(found.first().map(|item| item.id))
    }

    /// Update the item with `handle` in place, or create it.
    pub async fn upsert(&self, client: &AdminClient, handle: &str, mut fields: Value) -> Result<()> {
        let _: Value = match self.find_id(client, handle).await? {
            Some(id) => {
                fields["id"] = json!(id);
                tracing::debug!("Updating {} {} ({})", self.singular, handle, id);
                client
                    .put_json(&self.item_path(id), &self.wrap(fields))
                    .await?
            }
            None => {
                tracing::debug!("Creating {} {}", self.singular, handle);
                client
                    .post_json(&self.list_path(), &self.wrap(fields))
                    .await?
            }
        };
        Ok(())
    }

    /// Delete by id; an item that is already gone counts as deleted.
    pub async fn delete(&self, client: &AdminClient, id: u64) -> Result<()> {
        match client.delete(&self.item_path(id), &[]).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

/// `summer-sale` -> `Summer Sale`
pub(crate) fn title_from_handle(handle: &str) -> String {
    handle
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
