//! Reading the intermediate posts file produced by the scraper.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use crate::models::SourcePost;

/// Identifiers end up in image filenames, so they are limited to the
/// characters the image store index accepts.
static POST_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Load the SourcePost array at `path`.
///
/// The file must be a JSON array. Individual records that cannot be read
/// as a post are logged and skipped, as are records whose identifier is
/// blank, unusable in a filename or repeated (first occurrence wins).
pub fn load_posts(path: &Path) -> Result<Vec<SourcePost>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read posts file: {}", path.display()))?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse posts file: {}", path.display()))?;

    let mut posts = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<SourcePost>(record) {
            Ok(post) => posts.push(post),
            Err(err) => {
                tracing::warn!(record = i, error = %err, "skipping unreadable post record");
            }
        }
    }

    Ok(dedupe_posts(posts))
}

pub fn dedupe_posts(posts: Vec<SourcePost>) -> Vec<SourcePost> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(posts.len());

    for mut post in posts {
        let id = post.short_code.trim().to_string();
        if id.is_empty() {
            tracing::warn!("dropping post without an identifier");
            continue;
        }
        if !POST_ID.is_match(&id) {
            tracing::warn!(post = %id, "dropping post with an identifier unusable as a filename");
            continue;
        }
        if !seen.insert(id.clone()) {
            tracing::warn!(post = %id, "dropping duplicate post");
            continue;
        }
        post.short_code = id;
        kept.push(post);
    }

    kept
}
