//! Core data models used throughout the catalog pipeline.
//!
//! These types represent the scraped posts, downloaded images and the
//! products and categories that end up in the storefront catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One scraped social-media post, as stored in the intermediate posts file.
///
/// Scraper exports carry the post code as `shortCode` and often a numeric
/// media `id` next to it; the code wins when both are present.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(try_from = "RawPost")]
pub struct SourcePost {
    #[serde(rename = "shortCode")]
    pub short_code: String,
    pub caption: Option<String>,
    #[serde(rename = "displayUrl")]
    pub display_url: Option<String>,
    pub images: Vec<String>,
    pub timestamp: Option<String>,
    /// Permalink of the post on the source site.
    pub url: Option<String>,
}

/// Wire shape of a post before the identifier is resolved.
#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(rename = "shortCode", default)]
    short_code: Option<String>,
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(rename = "displayUrl", default)]
    display_url: Option<String>,
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl TryFrom<RawPost> for SourcePost {
    type Error = String;

    fn try_from(raw: RawPost) -> Result<Self, Self::Error> {
        let from_id = raw.id.map(|id| match id {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        });
        let short_code = [raw.short_code, from_id]
            .into_iter()
            .flatten()
            .map(|candidate| candidate.trim().to_string())
            .find(|candidate| !candidate.is_empty())
            .ok_or_else(|| "post has neither shortCode nor id".to_string())?;

        Ok(SourcePost {
            short_code,
            caption: raw.caption,
            display_url: raw.display_url,
            images: raw.images.unwrap_or_default(),
            timestamp: raw.timestamp,
            url: raw.url,
        })
    }
}

impl SourcePost {
    /// Every image reference of the post, display URL first.
    pub fn image_refs(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        if let Some(display) = self.display_url.as_deref() {
            if !display.trim().is_empty() {
                refs.push(display);
            }
        }
        for image in &self.images {
            if !image.trim().is_empty() && !refs.contains(&image.as_str()) {
                refs.push(image);
            }
        }
        refs
    }

    /// The single externally hosted image used when nothing was downloaded.
    pub fn display_image(&self) -> Option<&str> {
        self.image_refs().into_iter().next()
    }

    pub fn caption_text(&self) -> &str {
        self.caption.as_deref().unwrap_or_default()
    }
}

/// A downloaded image file in the local image store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImageAsset {
    pub source_id: String,
    pub sequence: u32,
    pub hash8: String,
    pub filename: String,
    pub path: PathBuf,
}

impl LocalImageAsset {
    /// Public URL of the asset under the storefront's image prefix.
    pub fn public_url(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.filename)
    }
}

/// Product categories, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductCategory {
    #[serde(rename = "Appliances")]
    Appliances,
    #[serde(rename = "Computers & Electronics")]
    ComputersElectronics,
    #[serde(rename = "Monitors & Displays")]
    MonitorsDisplays,
    #[serde(rename = "Mobile Devices")]
    MobileDevices,
    #[serde(rename = "Gaming")]
    Gaming,
    #[serde(rename = "Computer Parts")]
    ComputerParts,
    #[serde(rename = "Electronics")]
    Electronics,
}

impl ProductCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ProductCategory::Appliances => "Appliances",
            ProductCategory::ComputersElectronics => "Computers & Electronics",
            ProductCategory::MonitorsDisplays => "Monitors & Displays",
            ProductCategory::MobileDevices => "Mobile Devices",
            ProductCategory::Gaming => "Gaming",
            ProductCategory::ComputerParts => "Computer Parts",
            ProductCategory::Electronics => "Electronics",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Condition grade for used goods, A = best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "Grade A")]
    GradeA,
    #[serde(rename = "Grade B")]
    GradeB,
    #[serde(rename = "Grade C")]
    GradeC,
    #[serde(rename = "Grade D")]
    GradeD,
}

impl Condition {
    pub fn label(&self) -> &'static str {
        match self {
            Condition::GradeA => "Grade A",
            Condition::GradeB => "Grade B",
            Condition::GradeC => "Grade C",
            Condition::GradeD => "Grade D",
        }
    }

    pub fn warranty_months(&self) -> u32 {
        match self {
            Condition::GradeA => 6,
            Condition::GradeB => 3,
            Condition::GradeC | Condition::GradeD => 1,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Physical size in inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// The catalog entity the storefront renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(rename = "compareAtPrice")]
    pub compare_at_price: Option<f64>,
    pub category: ProductCategory,
    pub condition: Condition,
    pub images: Vec<String>,
    #[serde(rename = "inStock")]
    pub in_stock: bool,
    pub is_featured: bool,
    pub warranty_months: u32,
    pub location: String,
    pub weight: u32,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A category record derived from the products of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl Category {
    pub fn from_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slug: slugify(name),
            description: format!("Quality used {} at unbeatable prices.", name.to_lowercase()),
        }
    }
}

/// The whole catalog document read by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub total: usize,
    pub processed: DateTime<Utc>,
}

impl Catalog {
    pub fn new(products: Vec<Product>, categories: Vec<Category>, processed: DateTime<Utc>) -> Self {
        Self {
            total: products.len(),
            products,
            categories,
            processed,
        }
    }
}

/// Lowercase, drop `&`, and join the remaining words with single hyphens.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .replace('&', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
