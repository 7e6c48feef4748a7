//! # Boom Catalog
//!
//! Turns scraped social-media posts into the product catalog the storefront
//! reads.
//!
//! Each post caption is mined for a product name, category, condition
//! grade, price, brand, model, dimensions and tags. Post images are
//! downloaded into a local store keyed by a hash of their URL, and the
//! results are written as one JSON document that replaces the previous
//! catalog wholesale.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌─────────────┐
//! │ Posts file │──▶│  Fetcher  │──▶│ Image store │───┐
//! └─────┬──────┘   └───────────┘   └─────────────┘   ▼
//!       │          ┌───────────┐             ┌───────────┐   ┌──────────────┐
//!       └─────────▶│ Extractor │────────────▶│ Assembler │──▶│ catalog.json │
//!                  └───────────┘             └───────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! catalog download              # fetch post images into the local store
//! catalog build --seed 7        # assemble and write the catalog
//! catalog sync                  # both, in order
//! catalog extract 'Like new Dell laptop $450'
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Posts, images, products, categories |
//! | [`posts`] | Reading the intermediate posts file |
//! | [`extract`] | Caption attribute extraction |
//! | [`fetch`] | Single-image HTTP fetcher |
//! | [`images`] | Local image store and batch download |
//! | [`assemble`] | Product and category assembly |
//! | [`export`] | Catalog writer |
//! | [`ingest`] | Command orchestration |
//! | [`progress`] | Progress reporting |
//! | [`status`] | Path health report |

pub mod assemble;
pub mod config;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod images;
pub mod ingest;
pub mod models;
pub mod posts;
pub mod progress;
pub mod status;
