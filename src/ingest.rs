//! Pipeline orchestration.
//!
//! Coordinates the full flow: posts file → image download → local image
//! index → assembly → catalog file. Each command prints a short summary on
//! stdout ending in `ok`; per-item detail goes to the log.

use anyhow::Result;
use chrono::Utc;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::assemble::{assemble, AssembleOptions, Assembly};
use crate::config::Config;
use crate::export::write_catalog;
use crate::fetch::ImageFetcher;
use crate::images::{download_post_images, DownloadReport, ImageIndex};
use crate::models::SourcePost;
use crate::posts::load_posts;
use crate::progress::{ProgressEvent, ProgressReporter};

/// Options shared by `build` and `sync`.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Overrides `catalog.seed`.
    pub seed: Option<u64>,
    pub dry_run: bool,
    pub limit: Option<usize>,
}

/// Random source for one run: seeded when a seed is known, else from the OS.
pub fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

fn load_limited(config: &Config, limit: Option<usize>, progress: &dyn ProgressReporter) -> Result<Vec<SourcePost>> {
    let mut posts = load_posts(&config.paths.posts)?;
    if let Some(limit) = limit {
        posts.truncate(limit);
    }
    progress.report(ProgressEvent::Loaded {
        total: posts.len() as u64,
    });
    Ok(posts)
}

/// `catalog download`: fetch remote images of every post into the store.
pub async fn run_download(
    config: &Config,
    limit: Option<usize>,
    progress: &dyn ProgressReporter,
) -> Result<DownloadReport> {
    let posts = load_limited(config, limit, progress)?;
    let fetcher = ImageFetcher::new(&config.fetch)?;
    let report = download_post_images(&fetcher, &posts, config, progress).await?;

    println!("download");
    println!("  posts: {}", report.posts);
    println!("  downloaded: {}", report.downloaded);
    println!("  skipped (already local): {}", report.skipped);
    println!("  failed: {}", report.failed);
    println!("  bytes: {}", report.bytes);
    println!("ok");

    Ok(report)
}

/// `catalog build`: index local images, assemble and write the catalog.
pub fn run_build(
    config: &Config,
    options: &BuildOptions,
    progress: &dyn ProgressReporter,
) -> Result<Assembly> {
    let posts = load_limited(config, options.limit, progress)?;
    let index = ImageIndex::scan(&config.paths.images_dir)?;
    tracing::info!(
        sources = index.source_count(),
        images = index.image_count(),
        "indexed local images"
    );

    let mut rng = make_rng(options.seed.or(config.catalog.seed));
    let now = Utc::now();
    let assembly = assemble(
        &posts,
        &index,
        &AssembleOptions::from_config(config),
        now,
        &mut rng,
        progress,
    );

    if options.dry_run {
        println!("build (dry-run)");
    } else {
        println!("build");
    }
    println!("  posts: {}", posts.len());
    println!("  products: {}", assembly.products.len());
    println!("  skipped (short caption): {}", assembly.skipped_short_caption);
    println!("  skipped (no images): {}", assembly.skipped_no_images);
    println!("  categories: {}", assembly.categories.len());
    println!("  products with local images: {}", assembly.local_image_products);

    if options.dry_run {
        return Ok(assembly);
    }

    let catalog = assembly.clone().into_catalog(now);
    write_catalog(&catalog, &config.paths.catalog)?;
    println!("  catalog: {}", config.paths.catalog.display());
    println!("ok");

    Ok(assembly)
}

/// `catalog sync`: download, then build.
pub async fn run_sync(
    config: &Config,
    options: &BuildOptions,
    progress: &dyn ProgressReporter,
) -> Result<Assembly> {
    run_download(config, options.limit, progress).await?;
    run_build(config, options, progress)
}
