//! Local image store.
//!
//! Images live flat in one directory, named
//! `{sourceId}_{sequence}_{hash8}.jpg` where `hash8` is the first eight hex
//! digits of the MD5 of the source URL. The name alone identifies a
//! download, so the store doubles as the record of what has already been
//! fetched.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;
use crate::fetch::{FetchOutcome, ImageFetcher};
use crate::models::{LocalImageAsset, SourcePost};
use crate::progress::{ProgressEvent, ProgressReporter};

static ASSET_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_-]+)_(\d+)_([a-f0-9]+)\.jpg$").unwrap());

/// First eight hex digits of the MD5 of `url`.
pub fn url_hash8(url: &str) -> String {
    let digest = format!("{:x}", md5::compute(url.as_bytes()));
    digest[..8].to_string()
}

pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// The asset a remote image of `source_id` is stored as.
pub fn asset_for(images_dir: &Path, source_id: &str, sequence: u32, url: &str) -> LocalImageAsset {
    let hash8 = url_hash8(url);
    let filename = format!("{}_{}_{}.jpg", source_id, sequence, hash8);
    LocalImageAsset {
        source_id: source_id.to_string(),
        sequence,
        path: images_dir.join(&filename),
        filename,
        hash8,
    }
}

/// Recover an asset from a filename in the store, if it follows the scheme.
pub fn parse_filename(images_dir: &Path, filename: &str) -> Option<LocalImageAsset> {
    let caps = ASSET_FILENAME.captures(filename)?;
    Some(LocalImageAsset {
        source_id: caps[1].to_string(),
        sequence: caps[2].parse().ok()?,
        hash8: caps[3].to_string(),
        filename: filename.to_string(),
        path: images_dir.join(filename),
    })
}

/// Downloaded assets grouped by source post id.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    by_source: HashMap<String, Vec<LocalImageAsset>>,
}

impl ImageIndex {
    /// Index every conforming file directly inside `images_dir`. A missing
    /// directory yields an empty index.
    pub fn scan(images_dir: &Path) -> Result<Self> {
        if !images_dir.exists() {
            return Ok(Self::default());
        }

        let mut assets = Vec::new();
        for entry in WalkDir::new(images_dir).min_depth(1).max_depth(1) {
            let entry = entry
                .with_context(|| format!("Failed to read image store {}", images_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if let Some(asset) = parse_filename(images_dir, &name) {
                assets.push(asset);
            }
        }

        Ok(Self::from_assets(assets))
    }

    pub fn from_assets(assets: impl IntoIterator<Item = LocalImageAsset>) -> Self {
        let mut by_source: HashMap<String, Vec<LocalImageAsset>> = HashMap::new();
        for asset in assets {
            by_source
                .entry(asset.source_id.clone())
                .or_default()
                .push(asset);
        }
        for list in by_source.values_mut() {
            list.sort_by(|a, b| {
                a.sequence
                    .cmp(&b.sequence)
                    .then_with(|| a.filename.cmp(&b.filename))
            });
        }
        Self { by_source }
    }

    /// Assets of one post in sequence order; empty when none were downloaded.
    pub fn get(&self, source_id: &str) -> &[LocalImageAsset] {
        self.by_source
            .get(source_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn source_count(&self) -> usize {
        self.by_source.len()
    }

    pub fn image_count(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }
}

/// Counts from one batch download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub posts: u64,
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes: u64,
}

/// Download every remote image of `posts` into the configured store.
///
/// Network failures are logged and counted; file-system failures abort the
/// batch. Requests are throttled: `fetch.delay_ms` between the images of one
/// post and `fetch.pause_ms` after every `fetch.pause_every` posts.
pub async fn download_post_images(
    fetcher: &ImageFetcher,
    posts: &[SourcePost],
    config: &Config,
    progress: &dyn ProgressReporter,
) -> Result<DownloadReport> {
    let images_dir = &config.paths.images_dir;
    std::fs::create_dir_all(images_dir)
        .with_context(|| format!("Failed to create image store {}", images_dir.display()))?;

    let total = posts.len() as u64;
    let mut report = DownloadReport::default();
    let mut requests_since_pause = 0u64;

    for (i, post) in posts.iter().enumerate() {
        let refs = post.image_refs();
        for (j, reference) in refs.iter().enumerate() {
            if !is_remote(reference) {
                continue;
            }
            let asset = asset_for(images_dir, &post.short_code, (j + 1) as u32, reference);

            match fetcher.fetch(reference, &asset.path).await {
                Ok(FetchOutcome::AlreadyPresent) => {
                    tracing::debug!(post = %post.short_code, file = %asset.filename, "image already present");
                    report.skipped += 1;
                    continue;
                }
                Ok(FetchOutcome::Downloaded { bytes }) => {
                    tracing::info!(post = %post.short_code, file = %asset.filename, bytes, "image downloaded");
                    report.downloaded += 1;
                    report.bytes += bytes;
                }
                Err(err) if err.is_fatal() => {
                    return Err(err).with_context(|| {
                        format!("Failed to store image {}", asset.path.display())
                    });
                }
                Err(err) => {
                    tracing::warn!(post = %post.short_code, url = %reference, error = %err, "image download failed");
                    report.failed += 1;
                }
            }
            requests_since_pause += 1;

            if j + 1 < refs.len() && !config.fetch.delay().is_zero() {
                tokio::time::sleep(config.fetch.delay()).await;
            }
        }

        report.posts += 1;
        progress.report(ProgressEvent::Downloading {
            n: report.posts,
            total,
        });

        let at_boundary = (i + 1) % config.fetch.pause_every == 0;
        if at_boundary && i + 1 < posts.len() && requests_since_pause > 0 {
            tracing::info!(pause_ms = config.fetch.pause_ms, "pausing to avoid rate limits");
            tokio::time::sleep(config.fetch.pause()).await;
            requests_since_pause = 0;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn hash8_is_stable_md5_prefix() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(url_hash8(""), "d41d8cd9");
        assert_eq!(url_hash8("https://x/img.jpg").len(), 8);
        assert_eq!(url_hash8("https://x/img.jpg"), url_hash8("https://x/img.jpg"));
        assert_ne!(url_hash8("https://x/a.jpg"), url_hash8("https://x/b.jpg"));
    }

    #[test]
    fn asset_filename_round_trips_through_parser() {
        let dir = PathBuf::from("/store");
        let asset = asset_for(&dir, "Cx_9-k", 2, "https://cdn/a.jpg");
        assert!(asset.filename.starts_with("Cx_9-k_2_"));
        assert!(asset.filename.ends_with(".jpg"));
        let parsed = parse_filename(&dir, &asset.filename).unwrap();
        assert_eq!(parsed, asset);
    }

    #[test]
    fn parser_rejects_foreign_files() {
        let dir = PathBuf::from("/store");
        assert!(parse_filename(&dir, "bw-uc-0001-1.jpg").is_none());
        assert!(parse_filename(&dir, "abc_1_deadbeef.png").is_none());
        assert!(parse_filename(&dir, "abc_1_DEADBEEF.jpg").is_none());
        assert!(parse_filename(&dir, "abc_1_deadbeef.jpg.part").is_none());
    }

    #[test]
    fn scan_groups_and_orders_by_sequence() {
        let tmp = TempDir::new().unwrap();
        for name in [
            "p1_10_aaaaaaaa.jpg",
            "p1_2_bbbbbbbb.jpg",
            "p1_1_cccccccc.jpg",
            "p2_1_dddddddd.jpg",
            "notes.txt",
        ] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }

        let index = ImageIndex::scan(tmp.path()).unwrap();
        assert_eq!(index.source_count(), 2);
        assert_eq!(index.image_count(), 4);
        let seqs: Vec<u32> = index.get("p1").iter().map(|a| a.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 10]);
        assert!(index.get("missing").is_empty());
    }

    #[test]
    fn scan_of_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let index = ImageIndex::scan(&tmp.path().join("nope")).unwrap();
        assert_eq!(index.image_count(), 0);
    }

    #[test]
    fn remote_detection() {
        assert!(is_remote("https://x/a.jpg"));
        assert!(is_remote("http://x/a.jpg"));
        assert!(!is_remote("/images/products/a.jpg"));
    }

    /// Posts whose two image URLs fail before any request is sent, so the
    /// only time that passes is the throttling itself.
    fn unfetchable_posts(count: usize) -> Vec<SourcePost> {
        (0..count)
            .map(|i| SourcePost {
                short_code: format!("p{i}"),
                caption: None,
                display_url: Some("http://".to_string()),
                images: vec!["https://".to_string()],
                timestamp: None,
                url: None,
            })
            .collect()
    }

    async fn timed_download(posts: &[SourcePost]) -> (DownloadReport, std::time::Duration) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::rooted_at(tmp.path());
        config.fetch.delay_ms = 100;
        config.fetch.pause_every = 5;
        config.fetch.pause_ms = 2000;
        let fetcher = ImageFetcher::new(&config.fetch).unwrap();

        let start = tokio::time::Instant::now();
        let report = download_post_images(&fetcher, posts, &config, &NoProgress)
            .await
            .unwrap();
        (report, start.elapsed())
    }

    fn assert_close(elapsed: std::time::Duration, expected_ms: u64) {
        let expected = std::time::Duration::from_millis(expected_ms);
        assert!(
            elapsed >= expected && elapsed < expected + std::time::Duration::from_millis(50),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn throttles_between_images_and_pauses_every_n_posts() {
        // 11 posts: one delay per post, pauses after posts 5 and 10.
        let (report, elapsed) = timed_download(&unfetchable_posts(11)).await;
        assert_eq!(report.posts, 11);
        assert_eq!(report.failed, 22);
        assert_close(elapsed, 11 * 100 + 2 * 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn no_pause_after_the_last_post() {
        // 10 posts: the boundary after post 10 is the end of the batch.
        let (_, elapsed) = timed_download(&unfetchable_posts(10)).await;
        assert_close(elapsed, 10 * 100 + 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn no_throttling_without_requests() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::rooted_at(tmp.path());
        config.fetch.pause_every = 1;
        let fetcher = ImageFetcher::new(&config.fetch).unwrap();
        let posts: Vec<SourcePost> = (0..3)
            .map(|i| SourcePost {
                short_code: format!("p{i}"),
                caption: None,
                display_url: Some("/images/products/local.jpg".to_string()),
                images: vec![],
                timestamp: None,
                url: None,
            })
            .collect();

        let start = tokio::time::Instant::now();
        download_post_images(&fetcher, &posts, &config, &NoProgress)
            .await
            .unwrap();
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    }
}
