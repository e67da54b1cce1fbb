use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::article::classify_article;
use crate::color::classify_color;
use crate::consolidate::ScrapedProduct;
use crate::normalize::prepare_for_matching;
use crate::vocab::{normalize_multi_color, to_canon_article, CanonArticle, MultiColor};

/// Confidence assigned when a product's own `colorRaw` / `type` field
/// canonicalizes directly.
pub const DIRECT_FIELD_CONFIDENCE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Confidence {
    #[serde(rename = "type")]
    pub article_type: f32,
    pub color: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParseResult {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub article_type: Option<CanonArticle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<MultiColor>,
    pub confidence: Confidence,
}

/// Text fields a product record may carry into the parser. Deserializes from
/// a `ScrapedProduct`-shaped JSON object; unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductText {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub color_raw: Option<String>,
    #[serde(rename = "type")]
    pub article_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub breadcrumbs: Vec<String>,
}

impl ProductText {
    /// Each non-empty field prepared on its own, so retailer branding on one
    /// field cannot swallow the fields after it.
    fn fields(&self) -> Vec<String> {
        let breadcrumbs = self.breadcrumbs.join(" ");
        [
            self.name.as_deref(),
            self.brand.as_deref(),
            self.color_raw.as_deref(),
            self.article_type.as_deref(),
            self.title.as_deref(),
            self.description.as_deref(),
            Some(breadcrumbs.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(prepare_for_matching)
        .filter(|field| !field.is_empty())
        .collect()
    }
}

impl From<&ScrapedProduct> for ProductText {
    fn from(product: &ScrapedProduct) -> Self {
        Self {
            name: product.name.clone(),
            brand: product.brand.clone(),
            color_raw: product.color_raw.clone(),
            article_type: product.article_type.clone(),
            ..Default::default()
        }
    }
}

pub fn parse_freeform(text: &str) -> ParseResult {
    if text.trim().is_empty() {
        return ParseResult::default();
    }
    classify_prepared(&prepare_for_matching(text))
}

fn classify_prepared(prepared: &str) -> ParseResult {
    let article = classify_article(prepared);
    let color = classify_color(prepared);

    ParseResult {
        article_type: article.label,
        color: color.color,
        confidence: Confidence {
            article_type: article.confidence,
            color: color.confidence,
        },
    }
}

pub fn parse_from_product(input: &ProductText) -> ParseResult {
    let fields = input.fields();
    if fields.is_empty() {
        return ParseResult::default();
    }

    let mut result = classify_prepared(&fields.join(" "));

    if result.color.is_none() {
        if let Some(raw) = input.color_raw.as_deref() {
            if let Some(color) = normalize_multi_color(raw) {
                result.color = Some(color);
                result.confidence.color = result.confidence.color.max(DIRECT_FIELD_CONFIDENCE);
            } else {
                let fallback = classify_color(&prepare_for_matching(raw));
                if let Some(color) = fallback.color {
                    result.color = Some(color);
                    result.confidence.color = fallback.confidence;
                }
            }
        }
    }

    if result.article_type.is_none() {
        if let Some(canonical) = input.article_type.as_deref().and_then(to_canon_article) {
            result.article_type = Some(canonical);
            result.confidence.article_type =
                result.confidence.article_type.max(DIRECT_FIELD_CONFIDENCE);
        }
    }

    debug!(
        article_type = ?result.article_type,
        color = ?result.color.map(|c| c.to_string()),
        "parsed product fields"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::CanonColor;

    #[test]
    fn hoodie_in_hale_navy() {
        let result = parse_freeform("H&M hoodie, Hale Navy, M");
        assert_eq!(result.article_type, Some(CanonArticle::Hoodie));
        assert_eq!(result.color.map(|c| c.to_string()).as_deref(), Some("Navy"));
        assert!(result.confidence.article_type > 0.0);
        assert!(result.confidence.color > 0.0);
    }

    #[test]
    fn composite_cardigan() {
        let result = parse_freeform("Ivory / Off-White cardigan");
        assert_eq!(result.article_type, Some(CanonArticle::Cardigan));
        let color = result.color.unwrap();
        assert_eq!(color.primary(), CanonColor::Ivory);
        assert_eq!(color.secondary(), Some(CanonColor::OffWhite));
        assert_eq!(color.to_string(), "Ivory / Off-White");
    }

    #[test]
    fn labelled_color_beats_price_noise() {
        let result = parse_freeform("Oxford Shirt $59.50 20% off | Color: Navy Blue | J.Crew");
        assert_eq!(result.article_type, Some(CanonArticle::ButtonUpShirt));
        assert_eq!(result.color.map(|c| c.to_string()).as_deref(), Some("Navy"));
        assert!(result.confidence.color >= 0.85);
    }

    #[test]
    fn empty_input_has_zero_confidence() {
        let result = parse_freeform("   ");
        assert_eq!(result, ParseResult::default());
        let result = parse_freeform("gift card");
        assert!(result.article_type.is_none() && result.color.is_none());
        assert_eq!(result.confidence.article_type, 0.0);
        assert_eq!(result.confidence.color, 0.0);
    }

    #[test]
    fn product_fields_fall_back_to_direct_canonicalization() {
        let input = ProductText {
            name: Some("The Everyday Piece".into()),
            article_type: Some("Tee".into()),
            ..Default::default()
        };
        let result = parse_from_product(&input);
        assert_eq!(result.article_type, Some(CanonArticle::TShirt));
        assert!(result.confidence.article_type >= DIRECT_FIELD_CONFIDENCE);
    }

    #[test]
    fn product_fields_use_breadcrumbs() {
        let input = ProductText {
            name: Some("Classic Crew".into()),
            color_raw: Some("Deep Navy".into()),
            breadcrumbs: vec!["Men".into(), "Knitwear".into(), "Cardigans".into()],
            ..Default::default()
        };
        let result = parse_from_product(&input);
        assert_eq!(result.article_type, Some(CanonArticle::Cardigan));
        assert_eq!(result.color.map(|c| c.to_string()).as_deref(), Some("Navy"));
        assert_eq!(result.confidence.color, 0.70);
    }

    #[test]
    fn branded_name_keeps_later_fields() {
        let input = ProductText {
            name: Some("The Weekend Piece | Everlane".into()),
            breadcrumbs: vec!["Women".into(), "Cardigans".into()],
            ..Default::default()
        };
        let result = parse_from_product(&input);
        assert_eq!(result.article_type, Some(CanonArticle::Cardigan));
        assert_eq!(result.confidence.article_type, 0.85);
    }

    #[test]
    fn serializes_with_wire_names() {
        let result = parse_freeform("navy hoodie");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "Hoodie");
        assert_eq!(json["color"], "Navy");
        assert!(json["confidence"]["type"].as_f64().unwrap() > 0.8);
    }

    #[test]
    fn product_text_decodes_scraped_shape() {
        let input: ProductText = serde_json::from_str(
            r#"{"name":"Quarter Zip","colorRaw":"Heather Grey","type":"Sweater","imageUrl":"x"}"#,
        )
        .unwrap();
        assert_eq!(input.color_raw.as_deref(), Some("Heather Grey"));
        let result = parse_from_product(&input);
        assert_eq!(result.article_type, Some(CanonArticle::Sweater));
        assert_eq!(result.color.map(|c| c.to_string()).as_deref(), Some("Light Gray"));
    }
}
