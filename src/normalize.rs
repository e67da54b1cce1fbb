use lazy_static::lazy_static;
use regex::Regex;

const SITE_SUFFIXES: &[&str] = &[
    "amazon",
    "amazon.com",
    "amazon canada",
    "amazon uk",
    "banana republic",
    "banana republic factory",
    "j crew",
    "j.crew",
    "jcrew",
    "uniqlo",
    "uniqlo usa",
    "uniqlo us",
    "uniqlo.com",
    "gap",
    "gap factory",
    "old navy",
    "everlane",
    "h&m",
    "hm",
    "lululemon",
    "nordstrom",
    "nordstrom rack",
    "macy's",
    "macys",
    "target",
    "walmart",
    "mr porter",
    "net a porter",
    "farfetch",
    "matchesfashion",
    "asos",
    "anthropologie",
    "urban outfitters",
    "massimo dutti",
    "patagonia",
    "rei",
    "cos",
    "club monaco",
    "brooks brothers",
    "official site",
    "official store",
    "online store",
    "online shop",
    "shop",
];

lazy_static! {
    static ref PRICE_RE: Regex = Regex::new(r"\$[\d.,]+").unwrap();
    static ref PERCENT_RE: Regex = Regex::new(r"\b\d{1,3}%").unwrap();
    static ref TRADEMARK_RE: Regex = Regex::new("[\u{2122}\u{00ae}\u{2120}]").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    // Hyphen-like dashes only separate when spaced, so "t-shirt" and
    // "off-white" survive.
    static ref SITE_SEPARATOR_RE: Regex =
        Regex::new(r"\s+[-\u{2013}\u{2014}]\s+|\s*[|\u{2022}\u{00b7}:]\s*").unwrap();
    static ref SITE_BRANDING_RE: Regex = {
        let alternation = SITE_SUFFIXES
            .iter()
            .map(|suffix| regex::escape(suffix))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)(?:^|\b|\s)(?:{alternation})(?:\b|\s|$)")).unwrap()
    };
}

/// Removes price and percentage tokens and trademark glyphs, then collapses
/// whitespace. Case is preserved.
pub fn normalize(text: &str) -> String {
    let without_prices = PRICE_RE.replace_all(text, " ");
    let without_percent = PERCENT_RE.replace_all(&without_prices, " ");
    let without_marks = TRADEMARK_RE.replace_all(&without_percent, " ");
    WHITESPACE_RE
        .replace_all(&without_marks, " ")
        .trim()
        .to_string()
}

/// Drops trailing retailer segments ("Linen Shirt | Uniqlo US" -> "Linen Shirt").
/// Stops at the first trailing segment that is not branding and never removes
/// the leading segment. Text is returned untouched when nothing is dropped.
pub fn strip_site_branding(text: &str) -> String {
    let trimmed = text.trim();
    let separators: Vec<(usize, usize)> = SITE_SEPARATOR_RE
        .find_iter(trimmed)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut cut = trimmed.len();
    for &(start, end) in separators.iter().rev() {
        let segment = trimmed[end..cut].trim();
        if segment.is_empty() || SITE_BRANDING_RE.is_match(segment) {
            cut = start;
        } else {
            break;
        }
    }

    let kept = trimmed[..cut].trim();
    if kept.is_empty() {
        trimmed.to_string()
    } else {
        kept.to_string()
    }
}

pub fn normalize_product_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    strip_site_branding(&normalize(text))
}

pub fn prepare_for_matching(text: &str) -> String {
    normalize_product_text(&text.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prices_percentages_and_marks() {
        assert_eq!(
            normalize("Tech Fleece\u{2122} Hoodie  $89.99  30% off"),
            "Tech Fleece Hoodie off"
        );
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn drops_trailing_retailer_segments() {
        assert_eq!(
            strip_site_branding("Supima Cotton Crew Neck T-Shirt | UNIQLO US"),
            "Supima Cotton Crew Neck T-Shirt"
        );
        assert_eq!(
            strip_site_branding("Merino Cardigan - Navy | J.Crew | Official Site"),
            "Merino Cardigan - Navy"
        );
        assert_eq!(strip_site_branding("Linen Shirt \u{2022} Shop"), "Linen Shirt");
    }

    #[test]
    fn keeps_text_without_branding() {
        assert_eq!(
            strip_site_branding("Ivory / Off-White cardigan"),
            "Ivory / Off-White cardigan"
        );
        assert_eq!(strip_site_branding("Color: Navy"), "Color: Navy");
        assert_eq!(strip_site_branding("Gap"), "Gap");
    }

    #[test]
    fn matching_form_is_lowercase() {
        assert_eq!(
            prepare_for_matching("H&M Hoodie, Hale Navy, M"),
            "h&m hoodie, hale navy, m"
        );
    }
}
