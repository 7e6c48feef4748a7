//! Catalog assembly.
//!
//! Joins caption attributes with the images available for each post and
//! produces the product list plus the categories those products use.
//! Posts without a usable caption or without any resolvable image are
//! skipped, never emitted half-filled.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;

use crate::config::Config;
use crate::extract::{self, CaptionAttributes};
use crate::images::ImageIndex;
use crate::models::{Catalog, Category, Product, ProductCategory, SourcePost};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Prices above this get a struck-through compare-at price.
const COMPARE_AT_THRESHOLD: f64 = 100.0;
const COMPARE_AT_MARKUP: f64 = 1.3;

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub min_caption_len: usize,
    pub max_images: usize,
    pub featured_ratio: f64,
    pub location: String,
    pub public_prefix: String,
}

impl AssembleOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_caption_len: config.catalog.min_caption_len,
            max_images: config.catalog.max_images,
            featured_ratio: config.catalog.featured_ratio,
            location: config.catalog.location.clone(),
            public_prefix: config.paths.public_prefix.clone(),
        }
    }
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self::from_config(&Config::minimal())
    }
}

/// Result of one assembly pass.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub skipped_short_caption: u64,
    pub skipped_no_images: u64,
    /// Products whose images came from the local store.
    pub local_image_products: u64,
}

impl Assembly {
    pub fn into_catalog(self, processed: DateTime<Utc>) -> Catalog {
        Catalog::new(self.products, self.categories, processed)
    }
}

/// Assemble products from `posts` in order.
///
/// Every random field draws from `rng`; `now` stamps `updated_at` and stands
/// in for missing post timestamps.
pub fn assemble<R: Rng + ?Sized>(
    posts: &[SourcePost],
    index: &ImageIndex,
    options: &AssembleOptions,
    now: DateTime<Utc>,
    rng: &mut R,
    progress: &dyn ProgressReporter,
) -> Assembly {
    let total = posts.len() as u64;
    let mut assembly = Assembly::default();
    let mut seen_categories: Vec<ProductCategory> = Vec::new();

    for (i, post) in posts.iter().enumerate() {
        progress.report(ProgressEvent::Assembling {
            n: i as u64 + 1,
            total,
        });

        let caption = post.caption_text();
        if caption.trim().chars().count() < options.min_caption_len {
            tracing::info!(post = %post.short_code, "skipping post: caption missing or too short");
            assembly.skipped_short_caption += 1;
            continue;
        }

        let (images, local) = resolve_images(post, index, options);
        if images.is_empty() {
            tracing::warn!(post = %post.short_code, "skipping post: no images available");
            assembly.skipped_no_images += 1;
            continue;
        }
        if local {
            assembly.local_image_products += 1;
        }

        let attributes = extract::extract(caption);
        let product = build_product(post, &attributes, images, options, now, rng);

        if !seen_categories.contains(&product.category) {
            seen_categories.push(product.category);
        }
        assembly.products.push(product);
    }

    assembly.categories = seen_categories
        .iter()
        .map(|category| Category::from_name(category.name()))
        .collect();
    assembly
}

/// Images for a post: downloaded assets first, else the post's display URL.
/// Capped at `max_images`, in sequence order. The flag is true when the
/// images are local.
pub fn resolve_images(
    post: &SourcePost,
    index: &ImageIndex,
    options: &AssembleOptions,
) -> (Vec<String>, bool) {
    let local: Vec<String> = index
        .get(&post.short_code)
        .iter()
        .take(options.max_images)
        .map(|asset| asset.public_url(&options.public_prefix))
        .collect();
    if !local.is_empty() {
        return (local, true);
    }

    let remote = post
        .display_image()
        .map(|url| vec![url.to_string()])
        .unwrap_or_default();
    (remote, false)
}

pub fn build_product<R: Rng + ?Sized>(
    post: &SourcePost,
    attributes: &CaptionAttributes,
    images: Vec<String>,
    options: &AssembleOptions,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Product {
    let price = attributes.price_or_random(rng);
    let dimensions = attributes.dimensions_or_random(rng);
    let weight = rng.random_range(5..25);
    let is_featured = rng.random::<f64>() < options.featured_ratio;
    let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    Product {
        id: post.short_code.clone(),
        name: attributes.name.clone(),
        description: attributes.description.clone(),
        price,
        compare_at_price: compare_at_price(price),
        category: attributes.category,
        condition: attributes.condition,
        images,
        in_stock: true,
        is_featured,
        warranty_months: attributes.condition.warranty_months(),
        location: options.location.clone(),
        weight,
        dimensions,
        brand: attributes.brand.clone(),
        model: attributes.model.clone(),
        tags: attributes.tags.clone(),
        specifications: attributes.specifications.clone(),
        instagram_url: post.url.clone(),
        created_at: post.timestamp.clone().unwrap_or_else(|| stamp.clone()),
        updated_at: stamp,
    }
}

pub fn compare_at_price(price: f64) -> Option<f64> {
    (price > COMPARE_AT_THRESHOLD).then(|| (price * COMPARE_AT_MARKUP).floor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::parse_filename;
    use crate::models::Condition;
    use crate::progress::NoProgress;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::path::Path;

    fn post(id: &str, caption: &str, display: Option<&str>) -> SourcePost {
        SourcePost {
            short_code: id.to_string(),
            caption: Some(caption.to_string()),
            display_url: display.map(str::to_string),
            images: vec![],
            timestamp: None,
            url: None,
        }
    }

    fn index_of(files: &[&str]) -> ImageIndex {
        let dir = Path::new("/store");
        ImageIndex::from_assets(files.iter().filter_map(|f| parse_filename(dir, f)))
    }

    fn run(posts: &[SourcePost], index: &ImageIndex) -> Assembly {
        let mut rng = SmallRng::seed_from_u64(42);
        assemble(
            posts,
            index,
            &AssembleOptions::default(),
            Utc::now(),
            &mut rng,
            &NoProgress,
        )
    }

    #[test]
    fn end_to_end_single_post() {
        let posts = vec![post(
            "C1",
            "Like new Dell laptop $450\n#tech #dell",
            Some("https://x/img.jpg"),
        )];
        let assembly = run(&posts, &ImageIndex::default());

        assert_eq!(assembly.products.len(), 1);
        let product = &assembly.products[0];
        assert_eq!(product.id, "C1");
        assert_eq!(product.condition, Condition::GradeA);
        assert_eq!(product.category, ProductCategory::ComputersElectronics);
        assert_eq!(product.price, 450.0);
        assert_eq!(product.compare_at_price, Some(585.0));
        assert_eq!(product.images, vec!["https://x/img.jpg"]);
        assert_eq!(product.tags, vec!["tech", "dell"]);
        assert_eq!(product.warranty_months, 6);
        assert_eq!(assembly.local_image_products, 0);
    }

    #[test]
    fn short_captions_are_skipped() {
        let posts = vec![
            post("a", "too short", Some("https://x/a.jpg")),
            post("b", "   tiny    ", Some("https://x/b.jpg")),
            SourcePost {
                caption: None,
                ..post("c", "", Some("https://x/c.jpg"))
            },
        ];
        let assembly = run(&posts, &ImageIndex::default());
        assert!(assembly.products.is_empty());
        assert!(assembly.categories.is_empty());
        assert_eq!(assembly.skipped_short_caption, 3);
    }

    #[test]
    fn posts_without_images_are_dropped() {
        let posts = vec![post("a", "Whirlpool fridge works great", None)];
        let assembly = run(&posts, &ImageIndex::default());
        assert!(assembly.products.is_empty());
        assert_eq!(assembly.skipped_no_images, 1);
        // category of a dropped post does not leak into the category list
        assert!(assembly.categories.is_empty());
    }

    #[test]
    fn local_images_win_and_are_capped() {
        let index = index_of(&[
            "a_4_dddddddd.jpg",
            "a_1_aaaaaaaa.jpg",
            "a_3_cccccccc.jpg",
            "a_2_bbbbbbbb.jpg",
        ]);
        let posts = vec![post("a", "Samsung monitor 27 inch", Some("https://x/a.jpg"))];
        let assembly = run(&posts, &index);

        let product = &assembly.products[0];
        assert_eq!(
            product.images,
            vec![
                "/images/products/a_1_aaaaaaaa.jpg",
                "/images/products/a_2_bbbbbbbb.jpg",
                "/images/products/a_3_cccccccc.jpg",
            ]
        );
        assert_eq!(assembly.local_image_products, 1);
    }

    #[test]
    fn every_product_has_one_to_three_images() {
        let index = index_of(&["p0_1_aaaaaaaa.jpg", "p0_2_bbbbbbbb.jpg"]);
        let posts: Vec<SourcePost> = (0..30)
            .map(|i| {
                let display = if i % 3 == 2 { None } else { Some("https://x/d.jpg") };
                post(&format!("p{i}"), "Used washer and dryer set", display)
            })
            .collect();
        let assembly = run(&posts, &index);
        assert!(!assembly.products.is_empty());
        for product in &assembly.products {
            assert!((1..=3).contains(&product.images.len()));
            assert!(!product.name.is_empty());
        }
    }

    #[test]
    fn categories_are_distinct_in_first_seen_order() {
        let posts = vec![
            post("a", "Xbox series x with two controllers", Some("https://x/a")),
            post("b", "Frigidaire mini fridge, clean", Some("https://x/b")),
            post("c", "Nintendo switch lite bundle", Some("https://x/c")),
        ];
        let assembly = run(&posts, &ImageIndex::default());
        let names: Vec<&str> = assembly.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Gaming", "Appliances"]);
        assert_eq!(assembly.categories[1].slug, "appliances");
    }

    #[test]
    fn featured_ratio_is_roughly_respected() {
        let posts: Vec<SourcePost> = (0..2000)
            .map(|i| post(&format!("p{i}"), "Good working desktop tower", Some("https://x/d")))
            .collect();
        let assembly = run(&posts, &ImageIndex::default());
        let featured = assembly.products.iter().filter(|p| p.is_featured).count();
        assert!((300..500).contains(&featured), "featured = {featured}");
    }

    #[test]
    fn same_seed_same_catalog() {
        let posts = vec![post("a", "Mystery box of cables", Some("https://x/a"))];
        let now = Utc::now();
        let build = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            assemble(
                &posts,
                &ImageIndex::default(),
                &AssembleOptions::default(),
                now,
                &mut rng,
                &NoProgress,
            )
            .products
        };
        assert_eq!(build(7), build(7));
    }

    #[test]
    fn random_fallbacks_stay_in_range() {
        let posts: Vec<SourcePost> = (0..200)
            .map(|i| post(&format!("p{i}"), "Mystery box of cables", Some("https://x/a")))
            .collect();
        let assembly = run(&posts, &ImageIndex::default());
        for product in &assembly.products {
            assert!((50.0..550.0).contains(&product.price));
            assert!((5..25).contains(&product.weight));
            assert!((8..28).contains(&product.dimensions.width));
        }
    }

    #[test]
    fn compare_at_only_above_threshold() {
        assert_eq!(compare_at_price(100.0), None);
        assert_eq!(compare_at_price(99.99), None);
        assert_eq!(compare_at_price(129.99), Some(168.0));
    }

    #[test]
    fn permalink_carries_over() {
        let mut p = post("a", "Good working desktop tower", Some("https://x/a"));
        p.url = Some("https://www.instagram.com/p/a/".to_string());
        let assembly = run(&[p], &ImageIndex::default());
        assert_eq!(
            assembly.products[0].instagram_url.as_deref(),
            Some("https://www.instagram.com/p/a/")
        );

        let value = serde_json::to_value(&run(
            &[post("b", "Good working desktop tower", Some("https://x/b"))],
            &ImageIndex::default(),
        )
        .products[0])
        .unwrap();
        assert!(value.get("instagram_url").is_none());
    }

    #[test]
    fn timestamp_carries_over() {
        let mut p = post("a", "Good working desktop tower", Some("https://x/a"));
        p.timestamp = Some("2024-03-01T12:00:00.000Z".to_string());
        let assembly = run(&[p], &ImageIndex::default());
        assert_eq!(assembly.products[0].created_at, "2024-03-01T12:00:00.000Z");
        assert!(assembly.products[0].updated_at.ends_with('Z'));
    }
}
