use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::html_extractor::{infer_type, ProductDataExtractor};
use crate::images::{normalize_amazon_image, pick_best, ImageCandidates};

/// Product metadata recovered from one page. `color_raw` and `article_type`
/// are raw text; canonicalization is the freeform parser's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_raw: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub article_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ScrapedProduct {
    /// A scrape only fails when neither a name nor an image was found.
    pub fn is_extractable(&self) -> bool {
        self.name.is_some() || self.image_url.is_some()
    }

    /// `"brand, name, colorRaw"` with missing parts skipped, used to prefill
    /// free text for the parser.
    pub fn seed_text(&self) -> String {
        [&self.brand, &self.name, &self.color_raw]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Merges JSON-LD, meta tag, and DOM hints from `html` into one product.
/// Scalars take the JSON-LD value first, then the meta value.
pub fn consolidate(page_url: &str, html: &str) -> ScrapedProduct {
    let extractor = ProductDataExtractor::new(html, page_url);
    let from_ld = extractor.json_ld();
    let from_meta = extractor.meta_tags();

    let name = from_ld.name.clone().or_else(|| from_meta.name.clone());
    let brand = from_ld.brand.clone().or_else(|| from_meta.brand.clone());
    let color_raw = from_ld.color_raw.clone().or_else(|| from_meta.color_raw.clone());

    let mut breadcrumbs: Vec<String> = Vec::new();
    for crumb in from_ld
        .breadcrumbs
        .iter()
        .chain(from_meta.breadcrumbs.iter())
        .cloned()
        .chain(extractor.breadcrumb_links())
    {
        if !breadcrumbs.contains(&crumb) {
            breadcrumbs.push(crumb);
        }
    }

    let mut candidates = ImageCandidates::new();
    let seeds = from_ld
        .images
        .iter()
        .chain(from_meta.images.iter())
        .chain(from_ld.image_url.iter())
        .chain(from_meta.image_url.iter())
        .cloned()
        .chain(extractor.meta_image_sources());
    for seed in seeds {
        candidates.push(&normalize_amazon_image(&seed), page_url);
    }
    extractor.dom_images(&mut candidates);
    let images = candidates.into_vec();

    let image_url = pick_best(&images).or_else(|| images.first().cloned());

    let article_type = from_ld
        .article_type
        .clone()
        .or_else(|| from_meta.article_type.clone())
        .or_else(|| {
            infer_type(
                name.as_deref(),
                brand.as_deref(),
                from_meta.meta_title.as_deref(),
                &breadcrumbs,
            )
        });

    debug!(
        page_url,
        has_name = name.is_some(),
        images = images.len(),
        article_type = ?article_type,
        "consolidated page hints"
    );

    ScrapedProduct {
        name,
        brand,
        color_raw,
        article_type,
        price: from_ld.price.or(from_meta.price),
        currency: from_ld.currency.or(from_meta.currency),
        image_url,
        images,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::classify_color;
    use crate::freeform::{parse_from_product, ProductText};
    use crate::vocab::CanonArticle;

    const PAGE: &str = "https://shop.example.com/products/classic-crew";

    #[test]
    fn json_ld_color_stays_raw_and_classifies_to_navy() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"Product","name":"Classic Crew","color":"Deep Navy"}
            </script></head><body></body></html>"#;
        let product = consolidate(PAGE, html);
        assert_eq!(product.name.as_deref(), Some("Classic Crew"));
        assert_eq!(product.color_raw.as_deref(), Some("Deep Navy"));
        let color = classify_color(&product.color_raw.unwrap().to_lowercase());
        assert_eq!(color.color.map(|c| c.to_string()).as_deref(), Some("Navy"));
    }

    #[test]
    fn json_ld_beats_meta() {
        let html = r#"<html><head>
            <meta property="og:title" content="Meta Title">
            <meta property="og:image" content="https://cdn.example.com/meta.jpg">
            <meta property="product:color" content="Red">
            <script type="application/ld+json">
            {"@type":"Product","name":"LD Name","brand":"Acme","image":"https://cdn.example.com/ld.jpg"}
            </script></head><body></body></html>"#;
        let product = consolidate(PAGE, html);
        assert_eq!(product.name.as_deref(), Some("LD Name"));
        assert_eq!(product.brand.as_deref(), Some("Acme"));
        assert_eq!(product.color_raw.as_deref(), Some("Red"));
        assert_eq!(product.images[0], "https://cdn.example.com/ld.jpg");
        assert_eq!(product.images[1], "https://cdn.example.com/meta.jpg");
        assert_eq!(product.image_url.as_deref(), Some("https://cdn.example.com/ld.jpg"));
    }

    #[test]
    fn meta_only_page() {
        let html = r#"<html><head>
            <meta property="og:title" content="Relaxed Linen Shirt">
            <meta property="og:image" content="/media/linen.webp">
            </head><body><img src="/media/linen_thumb.jpg"></body></html>"#;
        let product = consolidate(PAGE, html);
        assert_eq!(product.name.as_deref(), Some("Relaxed Linen Shirt"));
        assert_eq!(product.image_url.as_deref(), Some("https://shop.example.com/media/linen.webp"));
        assert_eq!(product.article_type.as_deref(), Some("Button-Up Shirt"));
    }

    #[test]
    fn breadcrumbs_drive_type_inference() {
        let html = r#"<html><head><title>The Easy One</title></head><body>
            <nav><a href="/">Home</a><a href="/women">Women</a><a href="/w/jumpsuits">Jumpsuits</a></nav>
            <img src="/media/easy-one.jpg" width="800" height="1000">
            </body></html>"#;
        let product = consolidate(PAGE, html);
        assert_eq!(product.name.as_deref(), Some("The Easy One"));
        assert_eq!(product.article_type.as_deref(), Some("Jumpsuit"));
        assert_eq!(product.image_url.as_deref(), Some("https://shop.example.com/media/easy-one.jpg"));
    }

    #[test]
    fn extraction_failure_rule() {
        let empty = consolidate(PAGE, "<html><body><p>nothing here</p></body></html>");
        assert!(empty.name.is_none() && empty.image_url.is_none() && empty.images.is_empty());
        assert!(!empty.is_extractable());

        let named = ScrapedProduct {
            name: Some("Only A Name".into()),
            ..Default::default()
        };
        assert!(named.is_extractable());
    }

    #[test]
    fn serializes_camel_case_without_empty_fields() {
        let product = ScrapedProduct {
            name: Some("Classic Crew".into()),
            color_raw: Some("Deep Navy".into()),
            article_type: Some("Sweater".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name":"Classic Crew","colorRaw":"Deep Navy","type":"Sweater"})
        );
    }

    #[test]
    fn seed_text_skips_missing_parts() {
        let product = ScrapedProduct {
            brand: Some("Everlane".into()),
            name: Some("Classic Crew".into()),
            color_raw: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(product.seed_text(), "Everlane, Classic Crew");
        assert_eq!(ScrapedProduct::default().seed_text(), "");
    }

    #[test]
    fn consolidated_product_feeds_the_parser() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"Product","name":"Hale Hoodie","brand":"H&M","color":"Hale Navy"}
            </script></head><body></body></html>"#;
        let product = consolidate(PAGE, html);
        let parsed = parse_from_product(&ProductText::from(&product));
        assert_eq!(parsed.article_type, Some(CanonArticle::Hoodie));
        assert_eq!(parsed.color.map(|c| c.to_string()).as_deref(), Some("Navy"));
    }
}
