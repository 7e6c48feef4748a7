//! Caption attribute extraction.
//!
//! Turns the free text of a post caption into structured product
//! attributes. Classification uses ordered keyword rules evaluated
//! top-to-bottom: the first rule with any keyword contained in the
//! lowercased caption wins, regardless of how many keywords other rules
//! would match.
//!
//! Extraction is pure. Values that the caption does not carry (price,
//! dimensions) are reported as `None`; callers fill them in from an
//! injected random source with [`CaptionAttributes::price_or_random`] and
//! [`CaptionAttributes::dimensions_or_random`].

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Condition, Dimensions, ProductCategory};

/// Name used when a caption yields no usable title line.
pub const FALLBACK_NAME: &str = "Electronics Item";

/// Maximum display name length in characters, before the ellipsis.
pub const MAX_NAME_CHARS: usize = 100;

static PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\d+(?:\.\d{2})?)").unwrap());
static NAME_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\d+\.?\d*").unwrap());
static DIMENSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(\d+)"?\s*[x×]\s*(\d+)"?\s*[x×]?\s*(\d+)?""#).unwrap());
static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").unwrap());
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{5,}").unwrap());
static RAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*gb\s*ram").unwrap());
static STORAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(gb|tb)\s*(?:ssd|hdd|storage)").unwrap());
static MODEL_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^x?\d+(?:x\d+)*(?:gb|tb|mb|ghz|mhz|hz|in|ft|lbs?|w|k|p)?$").unwrap()
});

/// An ordered keyword rule: if any keyword occurs in the text, yields `result`.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule<T: 'static> {
    pub keywords: &'static [&'static str],
    pub result: T,
}

impl<T: Copy> KeywordRule<T> {
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

/// Returns the result of the first matching rule.
pub fn first_match<T: Copy>(rules: &[KeywordRule<T>], lowered: &str) -> Option<T> {
    rules
        .iter()
        .find(|rule| rule.matches(lowered))
        .map(|rule| rule.result)
}

pub const CATEGORY_RULES: &[KeywordRule<ProductCategory>] = &[
    KeywordRule {
        keywords: &[
            "refrigerator",
            "fridge",
            "freezer",
            "dishwasher",
            "washer",
            "dryer",
            "microwave",
            "oven",
            "stove",
        ],
        result: ProductCategory::Appliances,
    },
    KeywordRule {
        keywords: &["imac", "macbook", "laptop", "desktop", "computer", "pc"],
        result: ProductCategory::ComputersElectronics,
    },
    KeywordRule {
        keywords: &["monitor", "display", "screen", "tv"],
        result: ProductCategory::MonitorsDisplays,
    },
    KeywordRule {
        keywords: &["iphone", "phone", "mobile", "tablet", "ipad"],
        result: ProductCategory::MobileDevices,
    },
    KeywordRule {
        keywords: &["xbox", "playstation", "nintendo", "gaming", "game"],
        result: ProductCategory::Gaming,
    },
    KeywordRule {
        keywords: &["cpu", "gpu", "ram", "motherboard", "hard drive", "ssd"],
        result: ProductCategory::ComputerParts,
    },
];

pub const DEFAULT_CATEGORY: ProductCategory = ProductCategory::Electronics;

pub const CONDITION_RULES: &[KeywordRule<Condition>] = &[
    KeywordRule {
        keywords: &["new", "unused"],
        result: Condition::GradeA,
    },
    KeywordRule {
        keywords: &["excellent", "like new"],
        result: Condition::GradeA,
    },
    KeywordRule {
        keywords: &["good", "works"],
        result: Condition::GradeB,
    },
    KeywordRule {
        keywords: &["fair", "used"],
        result: Condition::GradeC,
    },
];

pub const DEFAULT_CONDITION: Condition = Condition::GradeB;

/// Known brands as (whole word in lowercased caption, display spelling).
const BRANDS: &[(&str, &str)] = &[
    ("dell", "Dell"),
    ("hp", "HP"),
    ("lenovo", "Lenovo"),
    ("apple", "Apple"),
    ("samsung", "Samsung"),
    ("lg", "LG"),
    ("whirlpool", "Whirlpool"),
    ("frigidaire", "Frigidaire"),
    ("ge", "GE"),
];

/// Dimension defaults for groups a partial match left empty.
const PARTIAL_DIMENSIONS: Dimensions = Dimensions {
    width: 12,
    height: 12,
    depth: 6,
};

/// Structured attributes derived from one caption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionAttributes {
    pub name: String,
    pub description: String,
    pub category: ProductCategory,
    pub condition: Condition,
    pub price: Option<f64>,
    pub dimensions: Option<Dimensions>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub tags: Vec<String>,
    pub specifications: BTreeMap<String, String>,
}

impl CaptionAttributes {
    /// The extracted price, or a random whole-dollar price in `[50, 550)`.
    pub fn price_or_random<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.price.unwrap_or_else(|| random_price(rng))
    }

    /// The extracted dimensions, or random ones within the fallback ranges.
    pub fn dimensions_or_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Dimensions {
        self.dimensions.unwrap_or_else(|| random_dimensions(rng))
    }
}

/// Extract every attribute from a caption.
pub fn extract(caption: &str) -> CaptionAttributes {
    let lowered = caption.to_lowercase();
    let title = extract_title(caption);
    let condition = classify_condition(&lowered);
    let description = extract_description(caption, &title, condition);
    let name = truncate_chars(&title, MAX_NAME_CHARS);

    CaptionAttributes {
        category: classify_category(&lowered),
        condition,
        price: extract_price(caption),
        dimensions: extract_dimensions(caption),
        brand: extract_brand(&lowered),
        model: extract_model(caption),
        tags: extract_tags(caption),
        specifications: extract_specifications(caption),
        description,
        name,
    }
}

pub fn classify_category(lowered: &str) -> ProductCategory {
    first_match(CATEGORY_RULES, lowered).unwrap_or(DEFAULT_CATEGORY)
}

pub fn classify_condition(lowered: &str) -> Condition {
    first_match(CONDITION_RULES, lowered).unwrap_or(DEFAULT_CONDITION)
}

/// First `$<digits>(.<2 digits>)?` in the caption.
pub fn extract_price(caption: &str) -> Option<f64> {
    PRICE
        .captures(caption)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// `W x H [x D]"` in inches. Groups that are missing or zero take the
/// partial-match defaults.
pub fn extract_dimensions(caption: &str) -> Option<Dimensions> {
    let caps = DIMENSIONS.captures(caption)?;
    let group = |index: usize, fallback: u32| {
        caps.get(index)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(fallback)
    };
    Some(Dimensions {
        width: group(1, PARTIAL_DIMENSIONS.width),
        height: group(2, PARTIAL_DIMENSIONS.height),
        depth: group(3, PARTIAL_DIMENSIONS.depth),
    })
}

/// Full title line: the second non-empty line (the first is usually a
/// price banner), else the first, with one price stripped.
pub fn extract_title(caption: &str) -> String {
    let lines: Vec<&str> = caption
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    let chosen = lines
        .get(1)
        .or_else(|| lines.first())
        .copied()
        .unwrap_or(FALLBACK_NAME);

    let stripped = NAME_PRICE.replace(chosen, "");
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Display name: [`extract_title`] capped at [`MAX_NAME_CHARS`].
pub fn extract_name(caption: &str) -> String {
    truncate_chars(&extract_title(caption), MAX_NAME_CHARS)
}

fn truncate_chars(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

/// Caption lines 3 to 5 as a one-line excerpt, with a templated fallback.
pub fn extract_description(caption: &str, name: &str, condition: Condition) -> String {
    let excerpt = caption.split('\n').skip(2).take(3).collect::<Vec<_>>().join(" ");
    let cleaned = DASH_RUN.replace_all(&excerpt, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        format!(
            "Quality {} in {} condition.",
            name.to_lowercase(),
            condition.label().to_lowercase()
        )
    } else {
        cleaned.to_string()
    }
}

/// Every `#word` in order, without the `#`. Repeats are kept.
pub fn extract_tags(caption: &str) -> Vec<String> {
    HASHTAG
        .captures_iter(caption)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn extract_brand(lowered: &str) -> Option<String> {
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    BRANDS
        .iter()
        .find(|(key, _)| words.contains(key))
        .map(|(_, display)| display.to_string())
}

/// First token that looks like a model number: 3 to 10 characters mixing
/// letters and digits, excluding sizes and capacities.
pub fn extract_model(caption: &str) -> Option<String> {
    caption
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .map(|token| token.trim_matches('-'))
        .filter(|token| (3..=10).contains(&token.len()))
        .filter(|token| token.chars().any(|c| c.is_ascii_digit()))
        .filter(|token| token.chars().any(|c| c.is_ascii_alphabetic()))
        .find(|token| !MODEL_NOISE.is_match(token))
        .map(str::to_string)
}

pub fn extract_specifications(caption: &str) -> BTreeMap<String, String> {
    let mut specs = BTreeMap::new();
    if let Some(caps) = RAM.captures(caption) {
        specs.insert("ram".to_string(), format!("{}GB", &caps[1]));
    }
    if let Some(caps) = STORAGE.captures(caption) {
        specs.insert(
            "storage".to_string(),
            format!("{}{}", &caps[1], caps[2].to_uppercase()),
        );
    }
    specs
}

pub fn random_price<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    f64::from(rng.random_range(50u32..550))
}

pub fn random_dimensions<R: Rng + ?Sized>(rng: &mut R) -> Dimensions {
    Dimensions {
        width: rng.random_range(8..28),
        height: rng.random_range(6..21),
        depth: rng.random_range(4..14),
    }
}
