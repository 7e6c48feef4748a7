//! Catalog writer.
//!
//! Serializes the assembled catalog as pretty-printed JSON for the
//! storefront. The file is written to a temporary sibling and renamed over
//! the previous version, so readers only ever see a complete document.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::models::Catalog;

/// Write `catalog` to `path`, replacing any previous version.
pub fn write_catalog(catalog: &Catalog, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(catalog)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let tmp = temp_path(path);
    std::fs::write(&tmp, json.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("Failed to replace {}", path.display()));
    }

    tracing::info!(
        path = %path.display(),
        products = catalog.total,
        categories = catalog.categories.len(),
        "catalog written"
    );
    Ok(())
}

/// Read a catalog previously written by [`write_catalog`].
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog: {}", path.display()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}
