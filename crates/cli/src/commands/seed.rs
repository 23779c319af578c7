//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! items:
//!   - name: Trail Runner
//!     price: "89.99"
//!     user_rating: 4.5
//!   - name: Canvas Tote
//!     price: 24
//!     in_stock: false
//! ```
//!
//! `user_rating` may be omitted; `in_stock` defaults to `true`. The whole file
//! is validated before anything is written.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use shopwave_core::{Price, Rating};
use shopwave_storefront::gateway::{Credential, Gateway};
use shopwave_storefront::models::ShopItemDraft;
use shopwave_storefront::services::{CatalogSync, SyncError};

/// Errors from loading or inserting seed items.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("item {index}: name is empty")]
    EmptyName { index: usize },
    #[error("seed file has no items")]
    Empty,
    #[error("failed to insert \"{name}\": {source}")]
    Insert { name: String, source: SyncError },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedFile {
    items: Vec<SeedItem>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedItem {
    name: String,
    price: Price,
    #[serde(default)]
    user_rating: Option<Rating>,
    #[serde(default = "in_stock_default")]
    in_stock: bool,
}

const fn in_stock_default() -> bool {
    true
}

/// Parse and validate seed YAML.
///
/// # Errors
///
/// Returns an error if the YAML is malformed, a price or rating is out of
/// range, a name is blank, or the list is empty.
pub fn parse(content: &str) -> Result<Vec<ShopItemDraft>, SeedError> {
    let file: SeedFile = serde_yaml::from_str(content)?;
    if file.items.is_empty() {
        return Err(SeedError::Empty);
    }

    file.items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let name = item.name.trim();
            if name.is_empty() {
                return Err(SeedError::EmptyName { index });
            }
            Ok(ShopItemDraft {
                name: name.to_owned(),
                price: item.price,
                user_rating: item.user_rating,
                in_stock: item.in_stock,
            })
        })
        .collect()
}

/// Read and validate a seed file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub async fn load(path: &Path) -> Result<Vec<ShopItemDraft>, SeedError> {
    info!(path = %path.display(), "Loading seed items");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let drafts = parse(&content)?;

    info!(items = drafts.len(), "Seed file validated");
    Ok(drafts)
}

/// Insert every draft as a new catalog item.
///
/// Stops at the first failure; items inserted before it stay.
///
/// # Errors
///
/// Returns an error naming the item the gateway rejected.
pub async fn insert(gateway: &dyn Gateway, drafts: &[ShopItemDraft]) -> Result<usize, SeedError> {
    let catalog = CatalogSync::new(gateway, Credential::Service);

    for draft in drafts {
        catalog
            .create_item(draft)
            .await
            .map_err(|source| SeedError::Insert {
                name: draft.name.clone(),
                source,
            })?;
    }

    info!(inserted = drafts.len(), "Catalog seeded");
    Ok(drafts.len())
}
