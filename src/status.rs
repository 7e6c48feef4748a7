use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::export::load_catalog;
use crate::images::ImageIndex;
use crate::posts::load_posts;

/// Health of one configured input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStatus {
    pub name: &'static str,
    pub path: PathBuf,
    pub status: String,
    pub healthy: bool,
}

pub fn get_status(config: &Config) -> Vec<PathStatus> {
    let posts = match load_posts(&config.paths.posts) {
        Ok(posts) => PathStatus {
            name: "posts",
            path: config.paths.posts.clone(),
            status: format!("OK ({} posts)", posts.len()),
            healthy: true,
        },
        Err(_) => missing_or_invalid("posts", &config.paths.posts),
    };

    let images = match ImageIndex::scan(&config.paths.images_dir) {
        Ok(index) if config.paths.images_dir.exists() => PathStatus {
            name: "images",
            path: config.paths.images_dir.clone(),
            status: format!(
                "OK ({} images, {} posts)",
                index.image_count(),
                index.source_count()
            ),
            healthy: true,
        },
        Ok(_) => PathStatus {
            name: "images",
            path: config.paths.images_dir.clone(),
            status: "EMPTY (directory does not exist)".to_string(),
            healthy: true,
        },
        Err(_) => missing_or_invalid("images", &config.paths.images_dir),
    };

    let catalog = match load_catalog(&config.paths.catalog) {
        Ok(catalog) => PathStatus {
            name: "catalog",
            path: config.paths.catalog.clone(),
            status: format!(
                "OK ({} products, {} categories, {})",
                catalog.total,
                catalog.categories.len(),
                catalog.processed.format("%Y-%m-%d %H:%M")
            ),
            healthy: true,
        },
        Err(_) => missing_or_invalid("catalog", &config.paths.catalog),
    };

    vec![posts, images, catalog]
}

fn missing_or_invalid(name: &'static str, path: &Path) -> PathStatus {
    let status = if path.exists() {
        "INVALID"
    } else {
        "MISSING"
    };
    PathStatus {
        name,
        path: path.to_path_buf(),
        status: status.to_string(),
        healthy: false,
    }
}

pub fn print_status(config: &Config) -> Result<()> {
    println!("{:<10} {:<48} {:<48} HEALTHY", "NAME", "PATH", "STATUS");
    for entry in get_status(config) {
        println!(
            "{:<10} {:<48} {:<48} {}",
            entry.name,
            entry.path.display().to_string(),
            entry.status,
            entry.healthy
        );
    }
    Ok(())
}
