//! # Boom Catalog CLI (`catalog`)
//!
//! The `catalog` binary turns the scraped posts file into the storefront's
//! product catalog.
//!
//! ## Usage
//!
//! ```bash
//! catalog --config ./config/catalog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catalog download` | Fetch every post's images into the local store |
//! | `catalog build` | Assemble products and categories, write the catalog |
//! | `catalog sync` | `download` followed by `build` |
//! | `catalog extract "<caption>"` | Print the attributes mined from one caption |
//! | `catalog status` | Report the state of the configured paths |
//!
//! ## Examples
//!
//! ```bash
//! # Reproducible catalog from images already on disk
//! catalog build --seed 42 --config ./config/catalog.toml
//!
//! # See what a build would produce without touching the catalog
//! catalog build --dry-run
//!
//! # Full refresh with debug logging
//! RUST_LOG=boom_catalog=debug catalog sync
//! ```

use boom_catalog::config::{self, Config};
use boom_catalog::extract::extract;
use boom_catalog::ingest::{self, BuildOptions};
use boom_catalog::progress::ProgressMode;
use boom_catalog::status;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Boom Catalog CLI: builds the storefront product catalog from scraped
/// posts.
///
/// All commands except `extract` read a TOML configuration file given by
/// `--config`. See `config/catalog.example.toml` for every option.
#[derive(Parser)]
#[command(
    name = "catalog",
    about = "Build the storefront product catalog from scraped posts",
    version,
    long_about = "Boom Catalog reads the scraped posts file, downloads post images into a \
    local store, mines each caption for product attributes (category, condition, price, \
    brand, dimensions, tags) and writes one JSON catalog of products and categories."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/catalog.toml`.
    #[arg(long, global = true, default_value = "./config/catalog.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a terminal and
    /// `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Download post images into the local image store.
    ///
    /// Images already present on disk are skipped without a request, so
    /// reruns only fetch what is missing. Individual failures are logged
    /// and counted; only local file-system errors abort the run.
    Download {
        /// Maximum number of posts to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Assemble the catalog from posts and locally stored images.
    ///
    /// The catalog file is replaced as a whole on every run.
    Build {
        /// Seed for the fallback price, dimension, weight and featured
        /// draws. Overrides `catalog.seed`.
        #[arg(long)]
        seed: Option<u64>,

        /// Print the summary without writing the catalog.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of posts to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Download images, then build the catalog.
    Sync {
        /// Seed for the random fallbacks. Overrides `catalog.seed`.
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum number of posts to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the attributes extracted from a single caption as JSON.
    Extract {
        /// Caption text.
        caption: String,
    },

    /// Show whether the posts file, image store and catalog are usable.
    Status,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that don't require config
    if let Commands::Extract { caption } = &cli.command {
        println!("{}", serde_json::to_string_pretty(&extract(caption))?);
        return Ok(());
    }

    let cfg: Config = config::load_config(&cli.config)?;
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Download { limit } => {
            ingest::run_download(&cfg, limit, progress.as_ref()).await?;
        }
        Commands::Build {
            seed,
            dry_run,
            limit,
        } => {
            let options = BuildOptions {
                seed,
                dry_run,
                limit,
            };
            ingest::run_build(&cfg, &options, progress.as_ref())?;
        }
        Commands::Sync { seed, limit } => {
            let options = BuildOptions {
                seed,
                dry_run: false,
                limit,
            };
            ingest::run_sync(&cfg, &options, progress.as_ref()).await?;
        }
        Commands::Status => {
            status::print_status(&cfg)?;
        }
        Commands::Extract { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
