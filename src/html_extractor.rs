use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::article::classify_article;
use crate::color::extract_color_phrase;
use crate::images::ImageCandidates;

lazy_static! {
    static ref LD_SCRIPT: Selector = Selector::parse("script[type='application/ld+json']").unwrap();
    static ref TITLE: Selector = Selector::parse("title").unwrap();
    static ref IMG: Selector = Selector::parse("img").unwrap();
    static ref BREADCRUMB_LINKS: Selector = Selector::parse(
        "nav a, .breadcrumb a, .breadcrumbs a, ol.breadcrumb li, ol[aria-label='breadcrumb'] li"
    )
    .unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref CATEGORY_SPLIT: Regex = Regex::new(r">|/|\|").unwrap();
    static ref LEADING_DIGITS: Regex = Regex::new(r"^\s*(\d+)").unwrap();
}

const MIN_IMAGE_DIMENSION: u32 = 80;

const LAZY_IMAGE_ATTRS: &[&str] = &[
    "data-zoom-image",
    "data-large_image",
    "data-image",
    "data-src",
    "data-original",
    "data-lazy",
    "src",
];

const META_IMAGE_SOURCES: &[&str] = &[
    "meta[property='og:image']",
    "meta[property='og:image:url']",
    "meta[property='og:image:secure_url']",
    "meta[name='og:image']",
    "meta[name='og:image:url']",
    "meta[name='og:image:secure_url']",
    "meta[name='twitter:image']",
    "meta[name='twitter:image:src']",
    "meta[property='twitter:image']",
    "meta[property='twitter:image:src']",
    "link[rel='image_src']",
];

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

// ==================== JSON-LD VALUES ====================

#[derive(Debug, Clone, PartialEq)]
pub enum LdValue {
    Text(String),
    Number(serde_json::Number),
    /// An object carrying `url`, `contentUrl`, `@id` or `value` (first present wins).
    Reference(String),
}

impl LdValue {
    const REFERENCE_KEYS: [&'static str; 4] = ["url", "contentUrl", "@id", "value"];

    pub fn decode(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(LdValue::Text(s.clone())),
            Value::Number(n) => Some(LdValue::Number(n.clone())),
            Value::Object(map) => Self::REFERENCE_KEYS.iter().find_map(|key| {
                match map.get(*key)? {
                    Value::String(s) => Some(LdValue::Reference(s.clone())),
                    Value::Number(n) => Some(LdValue::Reference(n.to_string())),
                    _ => None,
                }
            }),
            _ => None,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            LdValue::Text(s) | LdValue::Reference(s) => s,
            LdValue::Number(n) => n.to_string(),
        }
    }
}

fn decode_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(LdValue::decode)
        .map(LdValue::into_string)
        .map(|s| collapse(&s))
        .filter(|s| !s.is_empty())
}

/// A plain string, or the `name` of a nested object (`{"name": {...}}` recurses).
fn name_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Object(map) => name_field(map.get("name")),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null | Value::Bool(false) => Vec::new(),
        Value::Array(items) => items.iter().flat_map(string_list).collect(),
        Value::Object(map) => map.get("name").map(string_list).unwrap_or_default(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => vec![s.clone()],
        other => vec![other.to_string()],
    }
}

fn node_types(node: &Value) -> String {
    node.get("@type")
        .or_else(|| node.get("type"))
        .map(string_list)
        .unwrap_or_default()
        .join(",")
        .to_lowercase()
}

// ==================== TYPE INFERENCE ====================

pub fn infer_type_from_text(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    classify_article(&text.to_lowercase())
        .label
        .map(|article| article.to_string())
}

/// Type from a taxonomy value such as `"Men > Knitwear > Cardigans"` or a
/// schema URL. Only the last path segment is considered.
fn type_from_taxonomy(value: Option<&Value>) -> Option<String> {
    string_list(value?).iter().find_map(|raw| {
        let last = CATEGORY_SPLIT.split(raw).last()?.trim();
        if last.is_empty() {
            return None;
        }
        infer_type_from_text(last)
    })
}

pub fn infer_type(
    name: Option<&str>,
    brand: Option<&str>,
    meta_title: Option<&str>,
    breadcrumbs: &[String],
) -> Option<String> {
    let haystack: Vec<&str> = [name, meta_title]
        .into_iter()
        .flatten()
        .chain(breadcrumbs.iter().map(String::as_str))
        .chain(brand)
        .filter(|part| !part.trim().is_empty())
        .collect();
    if haystack.is_empty() {
        return None;
    }
    infer_type_from_text(&haystack.join(" "))
}

// ==================== HINTS ====================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductHints {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub color_raw: Option<String>,
    pub article_type: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub breadcrumbs: Vec<String>,
    pub meta_title: Option<String>,
}

// ==================== EXTRACTOR ====================

pub struct ProductDataExtractor {
    document: Html,
    page_url: String,
}

impl ProductDataExtractor {
    pub fn new(html: &str, page_url: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            page_url: page_url.to_string(),
        }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Product and BreadcrumbList nodes from every `application/ld+json`
    /// block. Malformed blocks are skipped.
    pub fn json_ld(&self) -> ProductHints {
        let mut out = ProductHints::default();
        let mut images = ImageCandidates::new();
        let mut breadcrumbs: Vec<String> = Vec::new();

        for script in self.document.select(&LD_SCRIPT) {
            let text = script.text().collect::<String>();
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let data: Value = match serde_json::from_str(text) {
                Ok(data) => data,
                Err(err) => {
                    debug!(page_url = %self.page_url, error = %err, "skipping malformed JSON-LD block");
                    continue;
                }
            };

            for node in ld_nodes(&data) {
                let types = node_types(node);
                if types.contains("breadcrumblist") {
                    if let Some(Value::Array(entries)) = node.get("itemListElement") {
                        // `item` is often a bare URL; only its object form carries a name.
                        breadcrumbs.extend(entries.iter().filter_map(|entry| {
                            name_field(entry.get("item").filter(|item| item.is_object()))
                                .or_else(|| name_field(entry.get("name")))
                        }));
                    }
                    continue;
                }
                if !types.contains("product") {
                    continue;
                }
                self.read_product_node(node, &mut out, &mut images);
            }
        }

        let mut seen = HashSet::new();
        out.breadcrumbs = breadcrumbs
            .iter()
            .map(|crumb| collapse(crumb))
            .filter(|crumb| seen.insert(crumb.clone()))
            .collect();
        if out.image_url.is_none() {
            out.image_url = images.first().cloned();
        }
        out.images = images.into_vec();
        out
    }

    fn read_product_node(&self, node: &Value, out: &mut ProductHints, images: &mut ImageCandidates) {
        if out.name.is_none() {
            out.name = decode_string(node.get("name"));
        }
        if out.brand.is_none() {
            out.brand = name_field(node.get("brand"));
        }

        if out.color_raw.is_none() {
            out.color_raw = decode_string(node.get("color"));
        }
        if out.color_raw.is_none() {
            if let Some(Value::Array(props)) = node.get("additionalProperty") {
                out.color_raw = props.iter().find_map(|prop| {
                    let name = decode_string(prop.get("name"))?.to_lowercase();
                    if !(name.contains("color") || name.contains("colour")) {
                        return None;
                    }
                    decode_string(prop.get("value"))
                        .or_else(|| decode_string(prop.get("propertyID")))
                        .or_else(|| decode_string(prop.get("description")))
                });
            }
        }
        let description = decode_string(node.get("description"));
        if out.color_raw.is_none() {
            out.color_raw = description.as_deref().and_then(extract_color_phrase);
        }

        if out.article_type.is_none() {
            out.article_type = type_from_taxonomy(node.get("category"))
                .or_else(|| type_from_taxonomy(node.get("additionalType")))
                .or_else(|| {
                    let name = decode_string(node.get("name")).unwrap_or_default();
                    infer_type_from_text(&format!("{} {}", name, description.unwrap_or_default()))
                });
        }

        match node.get("image") {
            Some(Value::Array(items)) => {
                for item in items {
                    self.push_ld_image(item, images);
                }
            }
            Some(item) => self.push_ld_image(item, images),
            None => {}
        }
        if out.image_url.is_none() {
            out.image_url = images.first().cloned();
        }

        let offer = match node.get("offers") {
            Some(Value::Array(offers)) => offers.first(),
            other => other,
        };
        if let Some(offer) = offer {
            if out.price.is_none() {
                out.price = decode_string(offer.get("price"));
            }
            if out.currency.is_none() {
                out.currency = decode_string(offer.get("priceCurrency"));
            }
        }
    }

    fn push_ld_image(&self, item: &Value, images: &mut ImageCandidates) {
        if let Some(raw) = LdValue::decode(item).map(LdValue::into_string) {
            images.push(&raw, &self.page_url);
        }
    }

    fn meta_content(&self, selector: &str) -> Option<String> {
        let selector = Selector::parse(&format!("meta{selector}")).ok()?;
        self.document
            .select(&selector)
            .find_map(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .map(String::from)
    }

    pub fn meta_tags(&self) -> ProductHints {
        let mut out = ProductHints::default();

        let title = self
            .document
            .select(&TITLE)
            .next()
            .map(|el| collapse(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty());
        let meta_title = self
            .meta_content("[property='og:title']")
            .or_else(|| self.meta_content("[name='twitter:title']"))
            .or(title);
        out.name = meta_title.clone();

        let mut images = ImageCandidates::new();
        for selector in [
            "[property='og:image']",
            "[property='og:image:secure_url']",
            "[property='og:image:url']",
            "[name='twitter:image']",
            "[name='twitter:image:src']",
        ] {
            if let Some(raw) = self.meta_content(selector) {
                images.push(&raw, &self.page_url);
            }
        }
        out.image_url = images.first().cloned();
        out.images = images.into_vec();

        let description = self
            .meta_content("[name='description']")
            .or_else(|| self.meta_content("[property='og:description']"))
            .or_else(|| self.meta_content("[name='twitter:description']"));
        let explicit_color = self
            .meta_content("[property='product:color']")
            .or_else(|| self.meta_content("[itemprop='color']"))
            .or_else(|| self.meta_content("[name='color']"));
        out.color_raw = explicit_color
            .or_else(|| description.as_deref().and_then(extract_color_phrase))
            .or_else(|| meta_title.as_deref().and_then(extract_color_phrase))
            .map(|color| collapse(&color));

        out.price = self
            .meta_content("[property='product:price:amount']")
            .or_else(|| self.meta_content("[property='og:price:amount']"));
        out.currency = self
            .meta_content("[property='product:price:currency']")
            .or_else(|| self.meta_content("[property='og:price:currency']"));

        out.article_type = infer_type(out.name.as_deref(), None, meta_title.as_deref(), &[]);
        out.meta_title = meta_title;
        out
    }

    /// Raw values of every OpenGraph/Twitter image tag (under `property` and
    /// `name`) and `link[rel=image_src]`, in document order per source.
    pub fn meta_image_sources(&self) -> Vec<String> {
        META_IMAGE_SOURCES
            .iter()
            .filter_map(|source| Selector::parse(source).ok())
            .flat_map(|selector| {
                self.document
                    .select(&selector)
                    .filter_map(|el| el.value().attr("content").or_else(|| el.value().attr("href")))
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Adds every `<img>` candidate to `into`: first `srcset` entry, lazy-load
    /// attributes, then `src`. Images declared smaller than 80px are skipped.
    pub fn dom_images(&self, into: &mut ImageCandidates) {
        for img in self.document.select(&IMG) {
            if is_declared_thumbnail(&img) {
                continue;
            }
            let value = img.value();
            let srcset_first = value.attr("srcset").and_then(|srcset| {
                srcset
                    .split(',')
                    .filter_map(|part| part.split_whitespace().next())
                    .next()
            });
            let candidates = srcset_first
                .into_iter()
                .chain(LAZY_IMAGE_ATTRS.iter().filter_map(|attr| value.attr(attr)));
            for candidate in candidates {
                into.push(candidate, &self.page_url);
            }
        }
    }

    pub fn breadcrumb_links(&self) -> Vec<String> {
        self.document
            .select(&BREADCRUMB_LINKS)
            .map(|el| collapse(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .collect()
    }
}

fn ld_nodes(data: &Value) -> Vec<&Value> {
    let roots: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    roots
        .into_iter()
        .flat_map(|node| match node.get("@graph") {
            Some(Value::Array(graph)) => graph.iter().collect(),
            _ => vec![node],
        })
        .filter(|node| node.is_object())
        .collect()
}

fn parse_dimension(raw: Option<&str>) -> Option<u32> {
    let caps = LEADING_DIGITS.captures(raw?)?;
    caps.get(1)?.as_str().parse::<u32>().ok().filter(|v| *v > 0)
}

fn is_declared_thumbnail(img: &ElementRef<'_>) -> bool {
    let value = img.value();
    [parse_dimension(value.attr("width")), parse_dimension(value.attr("height"))]
        .into_iter()
        .flatten()
        .any(|dimension| dimension < MIN_IMAGE_DIMENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = "https://shop.example.com/products/classic-crew";

    fn page(head: &str, body: &str) -> String {
        format!("<html><head>{head}</head><body>{body}</body></html>")
    }

    #[test]
    fn decodes_accepted_value_shapes() {
        assert_eq!(LdValue::decode(&json!("a.jpg")), Some(LdValue::Text("a.jpg".into())));
        assert_eq!(
            LdValue::decode(&json!({"contentUrl": "b.jpg", "@id": "x"})),
            Some(LdValue::Reference("b.jpg".into()))
        );
        assert_eq!(
            LdValue::decode(&json!({"url": "c.jpg", "contentUrl": "b.jpg"})).map(LdValue::into_string),
            Some("c.jpg".into())
        );
        assert_eq!(LdValue::decode(&json!(59.5)).map(LdValue::into_string), Some("59.5".into()));
        assert_eq!(LdValue::decode(&json!({"width": 10})), None);
        assert_eq!(LdValue::decode(&json!([1, 2])), None);
    }

    #[test]
    fn reads_product_node() {
        let html = page(
            r#"<script type="application/ld+json">
            {"@context":"https://schema.org","@type":"Product","name":"Classic Crew",
             "brand":{"@type":"Brand","name":"Everlane"},"color":"Deep Navy",
             "image":["/img/crew-front.jpg",{"url":"/img/crew-back.jpg"}],
             "offers":[{"price":68,"priceCurrency":"USD"}]}
            </script>"#,
            "",
        );
        let hints = ProductDataExtractor::new(&html, PAGE).json_ld();
        assert_eq!(hints.name.as_deref(), Some("Classic Crew"));
        assert_eq!(hints.brand.as_deref(), Some("Everlane"));
        assert_eq!(hints.color_raw.as_deref(), Some("Deep Navy"));
        assert_eq!(hints.price.as_deref(), Some("68"));
        assert_eq!(hints.currency.as_deref(), Some("USD"));
        assert_eq!(hints.images.len(), 2);
        assert_eq!(
            hints.image_url.as_deref(),
            Some("https://shop.example.com/img/crew-front.jpg")
        );
    }

    #[test]
    fn color_falls_back_to_properties_then_description() {
        let html = page(
            r#"<script type="application/ld+json">
            [{"@type":"Product","name":"Oxford","additionalProperty":[
                {"name":"Fit","value":"Slim"},{"name":"Colour","value":"Sage Green"}]}]
            </script>"#,
            "",
        );
        let hints = ProductDataExtractor::new(&html, PAGE).json_ld();
        assert_eq!(hints.color_raw.as_deref(), Some("Sage Green"));

        let html = page(
            r#"<script type="application/ld+json">
            {"@type":"Product","name":"Linen Shirt","description":"Breezy linen. Colour: Sky Blue"}
            </script>"#,
            "",
        );
        let hints = ProductDataExtractor::new(&html, PAGE).json_ld();
        assert_eq!(hints.color_raw.as_deref(), Some("Sky Blue"));
    }

    #[test]
    fn type_prefers_category_then_text() {
        let html = page(
            r#"<script type="application/ld+json">
            {"@graph":[{"@type":"Product","name":"The Weekend Piece","category":"Men > Knitwear > Cardigans"},
             {"@type":"BreadcrumbList","itemListElement":[
                {"@type":"ListItem","position":1,"item":{"name":"Men"}},
                {"@type":"ListItem","position":2,"name":"Knitwear"}]}]}
            </script>"#,
            "",
        );
        let hints = ProductDataExtractor::new(&html, PAGE).json_ld();
        assert_eq!(hints.article_type.as_deref(), Some("Cardigan"));
        assert_eq!(hints.breadcrumbs, vec!["Men".to_string(), "Knitwear".to_string()]);

        let html = page(
            r#"<script type="application/ld+json">{"@type":"Product","name":"Heavyweight Hooded Sweatshirt"}</script>"#,
            "",
        );
        let hints = ProductDataExtractor::new(&html, PAGE).json_ld();
        assert_eq!(hints.article_type.as_deref(), Some("Hoodie"));
    }

    #[test]
    fn malformed_json_ld_is_skipped() {
        let html = page(
            r#"<script type="application/ld+json">{"@type":"Product",</script>
               <script type="application/ld+json">{"@type":"Product","name":"Survivor"}</script>"#,
            "",
        );
        let hints = ProductDataExtractor::new(&html, PAGE).json_ld();
        assert_eq!(hints.name.as_deref(), Some("Survivor"));
    }

    #[test]
    fn meta_tags_fill_title_image_and_color() {
        let html = page(
            r#"<title>Ignored Title</title>
               <meta property="og:title" content="Merino Crewneck Sweater | Brand">
               <meta property="og:image" content="/media/sweater.jpg">
               <meta name="twitter:image" content="/media/logo.png">
               <meta name="description" content="Fine merino, available in oatmeal colour.">
               <meta property="product:price:amount" content="120.00">
               <meta property="product:price:currency" content="EUR">"#,
            "",
        );
        let hints = ProductDataExtractor::new(&html, PAGE).meta_tags();
        assert_eq!(hints.name.as_deref(), Some("Merino Crewneck Sweater | Brand"));
        assert_eq!(hints.meta_title, hints.name);
        assert_eq!(hints.images, vec!["https://shop.example.com/media/sweater.jpg".to_string()]);
        assert_eq!(hints.color_raw.as_deref(), Some("oatmeal"));
        assert_eq!(hints.article_type.as_deref(), Some("Sweater"));
        assert_eq!(hints.price.as_deref(), Some("120.00"));
        assert_eq!(hints.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn explicit_meta_color_wins() {
        let html = page(
            r#"<meta property="product:color" content="Forest  Green">
               <meta name="description" content="Colour: Red">"#,
            "",
        );
        let hints = ProductDataExtractor::new(&html, PAGE).meta_tags();
        assert_eq!(hints.color_raw.as_deref(), Some("Forest Green"));
    }

    #[test]
    fn dom_images_use_srcset_and_lazy_attributes() {
        let html = page(
            "",
            r#"<img srcset="/img/a-800.jpg 800w, /img/a-400.jpg 400w" src="/img/a-400.jpg">
               <img data-zoom-image="/img/b-zoom.jpg" src="/img/b.jpg">
               <img src="/img/tiny.jpg" width="40" height="40">
               <img src="/img/badge.svg">
               <img src="/img/c.jpg" width="600px">"#,
        );
        let extractor = ProductDataExtractor::new(&html, PAGE);
        let mut images = ImageCandidates::new();
        extractor.dom_images(&mut images);
        let urls: Vec<&str> = images.as_slice().iter().map(String::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://shop.example.com/img/a-800.jpg",
                "https://shop.example.com/img/a-400.jpg",
                "https://shop.example.com/img/b-zoom.jpg",
                "https://shop.example.com/img/b.jpg",
                "https://shop.example.com/img/c.jpg",
            ]
        );
    }

    #[test]
    fn collects_meta_image_sources_and_breadcrumbs() {
        let html = page(
            r#"<meta name="og:image" content="https://cdn.example.com/a.jpg">
               <link rel="image_src" href="/b.jpg">"#,
            r#"<ol class="breadcrumb"><li>Women</li><li> Dresses </li></ol>"#,
        );
        let extractor = ProductDataExtractor::new(&html, PAGE);
        assert_eq!(
            extractor.meta_image_sources(),
            vec!["https://cdn.example.com/a.jpg".to_string(), "/b.jpg".to_string()]
        );
        assert_eq!(extractor.breadcrumb_links(), vec!["Women".to_string(), "Dresses".to_string()]);
    }

    #[test]
    fn haystack_inference() {
        let crumbs = vec!["Women".to_string(), "Jumpsuits".to_string()];
        assert_eq!(infer_type(Some("The Easy One"), None, None, &crumbs).as_deref(), Some("Jumpsuit"));
        assert_eq!(infer_type(None, None, None, &[]), None);
    }
}
