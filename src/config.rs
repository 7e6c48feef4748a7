use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_posts")]
    pub posts: PathBuf,
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            posts: default_posts(),
            images_dir: default_images_dir(),
            public_prefix: default_public_prefix(),
            catalog: default_catalog(),
        }
    }
}

fn default_posts() -> PathBuf {
    PathBuf::from("data/instagram-inventory.json")
}
fn default_images_dir() -> PathBuf {
    PathBuf::from("public/images/products")
}
fn default_public_prefix() -> String {
    "/images/products".to_string()
}
fn default_catalog() -> PathBuf {
    PathBuf::from("data/boom-warehouse-products.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_pause_every")]
    pub pause_every: usize,
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            delay_ms: default_delay_ms(),
            pause_every: default_pause_every(),
            pause_ms: default_pause_ms(),
            user_agent: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_max_redirects() -> usize {
    5
}
fn default_delay_ms() -> u64 {
    100
}
fn default_pause_every() -> usize {
    10
}
fn default_pause_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_min_caption_len")]
    pub min_caption_len: usize,
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    #[serde(default = "default_featured_ratio")]
    pub featured_ratio: f64,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            min_caption_len: default_min_caption_len(),
            max_images: default_max_images(),
            featured_ratio: default_featured_ratio(),
            location: default_location(),
            seed: None,
        }
    }
}

fn default_min_caption_len() -> usize {
    10
}
fn default_max_images() -> usize {
    3
}
fn default_featured_ratio() -> f64 {
    0.2
}
fn default_location() -> String {
    "Warrensville Heights, OH".to_string()
}

impl Config {
    /// All-defaults configuration, used when no config file is needed.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Same as [`Config::minimal`] but with every path resolved under `root`.
    pub fn rooted_at(root: &Path) -> Self {
        let mut config = Self::minimal();
        config.paths.posts = root.join(&config.paths.posts);
        config.paths.images_dir = root.join(&config.paths.images_dir);
        config.paths.catalog = root.join(&config.paths.catalog);
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog.max_images == 0 {
            anyhow::bail!("catalog.max_images must be > 0");
        }

        if !(0.0..=1.0).contains(&self.catalog.featured_ratio) {
            anyhow::bail!("catalog.featured_ratio must be in [0.0, 1.0]");
        }

        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be > 0");
        }

        if self.fetch.pause_every == 0 {
            anyhow::bail!("fetch.pause_every must be > 0");
        }

        if self.paths.public_prefix.trim().is_empty() {
            anyhow::bail!("paths.public_prefix must not be empty");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.fetch.max_redirects, 5);
        assert_eq!(config.catalog.max_images, 3);
        assert_eq!(config.catalog.min_caption_len, 10);
        assert_eq!(config.paths.public_prefix, "/images/products");
        assert!(config.catalog.seed.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [fetch]
            delay_ms = 0

            [catalog]
            seed = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.delay_ms, 0);
        assert_eq!(config.fetch.pause_ms, 2000);
        assert_eq!(config.catalog.seed, Some(9));
        assert_eq!(config.catalog.location, "Warrensville Heights, OH");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = Config::minimal();
        config.catalog.featured_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::minimal();
        config.catalog.max_images = 0;
        assert!(config.validate().is_err());

        let mut config = Config::minimal();
        config.fetch.pause_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rooted_at_prefixes_paths() {
        let config = Config::rooted_at(Path::new("/srv/shop"));
        assert_eq!(
            config.paths.catalog,
            PathBuf::from("/srv/shop/data/boom-warehouse-products.json")
        );
        assert_eq!(config.paths.public_prefix, "/images/products");
    }

    #[test]
    fn example_config_matches_defaults() {
        let config: Config =
            toml::from_str(include_str!("../config/catalog.example.toml")).unwrap();
        config.validate().unwrap();
        let defaults = Config::minimal();
        assert_eq!(config.paths.catalog, defaults.paths.catalog);
        assert_eq!(config.fetch.pause_every, defaults.fetch.pause_every);
        assert_eq!(config.catalog.featured_ratio, defaults.catalog.featured_ratio);
    }
}
