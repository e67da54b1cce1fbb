use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};

// ==================== CANONICAL COLORS ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonColor {
    Black,
    Charcoal,
    LightGray,
    White,
    Ivory,
    OffWhite,
    Beige,
    Tan,
    Brown,
    Navy,
    Olive,
    Denim,
    Red,
    Burgundy,
    Orange,
    Rust,
    Yellow,
    Green,
    Teal,
    Blue,
    Purple,
    Pink,
}

impl CanonColor {
    pub const ALL: [CanonColor; 22] = [
        CanonColor::Black,
        CanonColor::Charcoal,
        CanonColor::LightGray,
        CanonColor::White,
        CanonColor::Ivory,
        CanonColor::OffWhite,
        CanonColor::Beige,
        CanonColor::Tan,
        CanonColor::Brown,
        CanonColor::Navy,
        CanonColor::Olive,
        CanonColor::Denim,
        CanonColor::Red,
        CanonColor::Burgundy,
        CanonColor::Orange,
        CanonColor::Rust,
        CanonColor::Yellow,
        CanonColor::Green,
        CanonColor::Teal,
        CanonColor::Blue,
        CanonColor::Purple,
        CanonColor::Pink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonColor::Black => "Black",
            CanonColor::Charcoal => "Charcoal",
            CanonColor::LightGray => "Light Gray",
            CanonColor::White => "White",
            CanonColor::Ivory => "Ivory",
            CanonColor::OffWhite => "Off-White",
            CanonColor::Beige => "Beige",
            CanonColor::Tan => "Tan",
            CanonColor::Brown => "Brown",
            CanonColor::Navy => "Navy",
            CanonColor::Olive => "Olive",
            CanonColor::Denim => "Denim",
            CanonColor::Red => "Red",
            CanonColor::Burgundy => "Burgundy",
            CanonColor::Orange => "Orange",
            CanonColor::Rust => "Rust",
            CanonColor::Yellow => "Yellow",
            CanonColor::Green => "Green",
            CanonColor::Teal => "Teal",
            CanonColor::Blue => "Blue",
            CanonColor::Purple => "Purple",
            CanonColor::Pink => "Pink",
        }
    }
}

impl fmt::Display for CanonColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CanonColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ==================== CANONICAL ARTICLES ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonArticle {
    // Tops
    TShirt,
    LongSleeveShirt,
    PoloShirt,
    ButtonUpShirt,
    Blouse,
    TankTop,
    CropTop,
    Sweatshirt,
    Hoodie,
    Sweater,
    Cardigan,
    Jacket,
    Coat,
    Blazer,
    Vest,
    // Bottoms
    Jeans,
    DressPants,
    Slacks,
    Chinos,
    Joggers,
    Sweatpants,
    Shorts,
    Skirt,
    Leggings,
    CargoPants,
    // One-pieces
    Dress,
    Jumpsuit,
    Rompers,
    Overalls,
    // Shoes
    Sneakers,
    DressShoes,
    Loafers,
    Boots,
    Sandals,
    Heels,
    Flats,
    Slides,
    RunningShoes,
}

impl CanonArticle {
    pub const ALL: [CanonArticle; 38] = [
        CanonArticle::TShirt,
        CanonArticle::LongSleeveShirt,
        CanonArticle::PoloShirt,
        CanonArticle::ButtonUpShirt,
        CanonArticle::Blouse,
        CanonArticle::TankTop,
        CanonArticle::CropTop,
        CanonArticle::Sweatshirt,
        CanonArticle::Hoodie,
        CanonArticle::Sweater,
        CanonArticle::Cardigan,
        CanonArticle::Jacket,
        CanonArticle::Coat,
        CanonArticle::Blazer,
        CanonArticle::Vest,
        CanonArticle::Jeans,
        CanonArticle::DressPants,
        CanonArticle::Slacks,
        CanonArticle::Chinos,
        CanonArticle::Joggers,
        CanonArticle::Sweatpants,
        CanonArticle::Shorts,
        CanonArticle::Skirt,
        CanonArticle::Leggings,
        CanonArticle::CargoPants,
        CanonArticle::Dress,
        CanonArticle::Jumpsuit,
        CanonArticle::Rompers,
        CanonArticle::Overalls,
        CanonArticle::Sneakers,
        CanonArticle::DressShoes,
        CanonArticle::Loafers,
        CanonArticle::Boots,
        CanonArticle::Sandals,
        CanonArticle::Heels,
        CanonArticle::Flats,
        CanonArticle::Slides,
        CanonArticle::RunningShoes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonArticle::TShirt => "T-Shirt",
            CanonArticle::LongSleeveShirt => "Long Sleeve Shirt",
            CanonArticle::PoloShirt => "Polo Shirt",
            CanonArticle::ButtonUpShirt => "Button-Up Shirt",
            CanonArticle::Blouse => "Blouse",
            CanonArticle::TankTop => "Tank Top",
            CanonArticle::CropTop => "Crop Top",
            CanonArticle::Sweatshirt => "Sweatshirt",
            CanonArticle::Hoodie => "Hoodie",
            CanonArticle::Sweater => "Sweater",
            CanonArticle::Cardigan => "Cardigan",
            CanonArticle::Jacket => "Jacket",
            CanonArticle::Coat => "Coat",
            CanonArticle::Blazer => "Blazer",
            CanonArticle::Vest => "Vest",
            CanonArticle::Jeans => "Jeans",
            CanonArticle::DressPants => "Dress Pants",
            CanonArticle::Slacks => "Slacks",
            CanonArticle::Chinos => "Chinos",
            CanonArticle::Joggers => "Joggers",
            CanonArticle::Sweatpants => "Sweatpants",
            CanonArticle::Shorts => "Shorts",
            CanonArticle::Skirt => "Skirt",
            CanonArticle::Leggings => "Leggings",
            CanonArticle::CargoPants => "Cargo Pants",
            CanonArticle::Dress => "Dress",
            CanonArticle::Jumpsuit => "Jumpsuit",
            CanonArticle::Rompers => "Rompers",
            CanonArticle::Overalls => "Overalls",
            CanonArticle::Sneakers => "Sneakers",
            CanonArticle::DressShoes => "Dress Shoes",
            CanonArticle::Loafers => "Loafers",
            CanonArticle::Boots => "Boots",
            CanonArticle::Sandals => "Sandals",
            CanonArticle::Heels => "Heels",
            CanonArticle::Flats => "Flats",
            CanonArticle::Slides => "Slides",
            CanonArticle::RunningShoes => "Running Shoes",
        }
    }
}

impl fmt::Display for CanonArticle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CanonArticle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ==================== MULTI COLOR ====================

/// One or two distinct canonical colors, rendered as `"A"` or `"A / B"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiColor {
    primary: CanonColor,
    secondary: Option<CanonColor>,
}

impl MultiColor {
    pub fn single(color: CanonColor) -> Self {
        Self {
            primary: color,
            secondary: None,
        }
    }

    /// Collapses duplicates in first-seen order and keeps at most two.
    pub fn from_colors<I: IntoIterator<Item = CanonColor>>(colors: I) -> Option<Self> {
        let mut deduped: Vec<CanonColor> = Vec::with_capacity(2);
        for color in colors {
            if !deduped.contains(&color) {
                deduped.push(color);
            }
            if deduped.len() == 2 {
                break;
            }
        }
        let primary = *deduped.first()?;
        Some(Self {
            primary,
            secondary: deduped.get(1).copied(),
        })
    }

    pub fn primary(&self) -> CanonColor {
        self.primary
    }

    pub fn secondary(&self) -> Option<CanonColor> {
        self.secondary
    }

    pub fn colors(&self) -> Vec<CanonColor> {
        std::iter::once(self.primary).chain(self.secondary).collect()
    }
}

impl fmt::Display for MultiColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secondary {
            Some(second) => write!(f, "{} / {}", self.primary, second),
            None => f.write_str(self.primary.as_str()),
        }
    }
}

impl Serialize for MultiColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ==================== ALIAS TABLES ====================

const COLOR_ALIASES: &[(&str, CanonColor)] = &[
    // neutrals
    ("jet black", CanonColor::Black),
    ("faded black", CanonColor::Black),
    ("washed black", CanonColor::Black),
    ("soft black", CanonColor::Black),
    ("charcoal grey", CanonColor::Charcoal),
    ("charcoal gray", CanonColor::Charcoal),
    ("dark grey", CanonColor::Charcoal),
    ("dark gray", CanonColor::Charcoal),
    ("heather gray", CanonColor::LightGray),
    ("heather grey", CanonColor::LightGray),
    ("light grey", CanonColor::LightGray),
    ("grey", CanonColor::LightGray),
    ("gray", CanonColor::LightGray),
    ("silver", CanonColor::LightGray),
    ("stone gray", CanonColor::LightGray),
    ("stone grey", CanonColor::LightGray),
    ("soft white", CanonColor::OffWhite),
    ("off white", CanonColor::OffWhite),
    ("cream", CanonColor::Ivory),
    ("bone", CanonColor::Ivory),
    ("ecru", CanonColor::Ivory),
    ("stone", CanonColor::Beige),
    ("sand", CanonColor::Beige),
    ("oatmeal", CanonColor::Beige),
    ("taupe", CanonColor::Beige),
    ("camel", CanonColor::Tan),
    ("khaki", CanonColor::Tan),
    ("light tan", CanonColor::Tan),
    ("espresso", CanonColor::Brown),
    ("chocolate", CanonColor::Brown),
    // blues and greens
    ("navy blue", CanonColor::Navy),
    ("tapestry navy", CanonColor::Navy),
    ("preppy navy", CanonColor::Navy),
    ("deep navy", CanonColor::Navy),
    ("dark navy", CanonColor::Navy),
    ("midnight navy", CanonColor::Navy),
    ("midnight blue", CanonColor::Navy),
    ("midnight", CanonColor::Navy),
    ("olive green", CanonColor::Olive),
    ("army green", CanonColor::Olive),
    ("hunter green", CanonColor::Olive),
    ("sage green", CanonColor::Olive),
    ("sage", CanonColor::Olive),
    ("indigo", CanonColor::Denim),
    ("emerald", CanonColor::Green),
    ("forest", CanonColor::Green),
    ("forest green", CanonColor::Green),
    ("turquoise", CanonColor::Teal),
    ("aqua", CanonColor::Teal),
    ("cobalt", CanonColor::Blue),
    ("royal", CanonColor::Blue),
    ("royal blue", CanonColor::Blue),
    ("sky blue", CanonColor::Blue),
    ("baby blue", CanonColor::Blue),
    ("light blue", CanonColor::Blue),
    // reds, oranges, yellows
    ("scarlet", CanonColor::Red),
    ("crimson", CanonColor::Red),
    ("maroon", CanonColor::Burgundy),
    ("wine", CanonColor::Burgundy),
    ("oxblood", CanonColor::Burgundy),
    ("burnt orange", CanonColor::Rust),
    ("copper", CanonColor::Rust),
    ("mustard", CanonColor::Yellow),
    ("gold", CanonColor::Yellow),
    // misc
    ("lavender", CanonColor::Purple),
    ("lilac", CanonColor::Purple),
    ("violet", CanonColor::Purple),
    ("dusty pink", CanonColor::Pink),
    ("pastel pink", CanonColor::Pink),
    ("blush", CanonColor::Pink),
    ("magenta", CanonColor::Pink),
    // legacy composite values from the merged vocabulary
    ("ivory / off-white", CanonColor::Ivory),
    ("beige / tan", CanonColor::Beige),
];

const ARTICLE_ALIASES: &[(&str, CanonArticle)] = &[
    // Tops
    ("tee", CanonArticle::TShirt),
    ("tees", CanonArticle::TShirt),
    ("tshirt", CanonArticle::TShirt),
    ("t shirt", CanonArticle::TShirt),
    ("long sleeve tee", CanonArticle::LongSleeveShirt),
    ("long sleeve", CanonArticle::LongSleeveShirt),
    ("long-sleeve", CanonArticle::LongSleeveShirt),
    ("henley", CanonArticle::LongSleeveShirt),
    ("polo", CanonArticle::PoloShirt),
    ("button down", CanonArticle::ButtonUpShirt),
    ("button-down", CanonArticle::ButtonUpShirt),
    ("button up", CanonArticle::ButtonUpShirt),
    ("oxford", CanonArticle::ButtonUpShirt),
    ("shirt", CanonArticle::ButtonUpShirt),
    ("tank", CanonArticle::TankTop),
    ("crop", CanonArticle::CropTop),
    ("crewneck", CanonArticle::Sweatshirt),
    ("hooded sweatshirt", CanonArticle::Hoodie),
    ("pullover", CanonArticle::Sweater),
    ("quarter-zip", CanonArticle::Sweater),
    // Bottoms
    ("denim", CanonArticle::Jeans),
    ("dress pants / slacks", CanonArticle::DressPants),
    ("pleated pants", CanonArticle::DressPants),
    ("trousers", CanonArticle::DressPants),
    ("pants", CanonArticle::DressPants),
    ("chino", CanonArticle::Chinos),
    ("sweat pants", CanonArticle::Sweatpants),
    ("track pants", CanonArticle::Sweatpants),
    ("yoga pants", CanonArticle::Leggings),
    // One-pieces
    ("romper", CanonArticle::Rompers),
    ("overall", CanonArticle::Overalls),
    // Shoes
    ("sneaker", CanonArticle::Sneakers),
    ("tennis shoes", CanonArticle::Sneakers),
    ("slide sandals", CanonArticle::Slides),
    ("runners", CanonArticle::RunningShoes),
    ("trainers", CanonArticle::RunningShoes),
];

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref SLASH_RE: Regex = Regex::new(r"\s*/\s*").unwrap();
    static ref MULTI_COLOR_SPLIT_RE: Regex = Regex::new(r"(?i)[/&+,]|\band\b").unwrap();
    static ref COLOR_LOOKUP: HashMap<String, CanonColor> = {
        let mut map: HashMap<String, CanonColor> = COLOR_ALIASES
            .iter()
            .map(|(alias, color)| (lookup_key(alias), *color))
            .collect();
        for color in CanonColor::ALL {
            map.entry(lookup_key(color.as_str())).or_insert(color);
        }
        map
    };
    static ref ARTICLE_LOOKUP: HashMap<String, CanonArticle> = {
        let mut map: HashMap<String, CanonArticle> = ARTICLE_ALIASES
            .iter()
            .map(|(alias, article)| (lookup_key(alias), *article))
            .collect();
        for article in CanonArticle::ALL {
            map.entry(lookup_key(article.as_str())).or_insert(article);
        }
        map
    };
}

pub fn lookup_key(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let collapsed = WHITESPACE_RE.replace_all(&lowered, " ");
    SLASH_RE.replace_all(&collapsed, " / ").into_owned()
}

// ==================== CANONICALIZATION ====================

pub fn to_canon_color(input: &str) -> Option<CanonColor> {
    let key = lookup_key(input);
    if key.is_empty() {
        return None;
    }
    COLOR_LOOKUP.get(&key).copied()
}

pub fn to_canon_article(input: &str) -> Option<CanonArticle> {
    let key = lookup_key(input);
    if key.is_empty() {
        return None;
    }
    ARTICLE_LOOKUP.get(&key).copied()
}

/// Splits `input` on multi-color separators and resolves each piece with
/// `resolve`. Falls back to resolving the whole string when no piece maps.
pub(crate) fn multi_color_with<F>(input: &str, resolve: F) -> Option<MultiColor>
where
    F: Fn(&str) -> Option<CanonColor>,
{
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let pieces = MULTI_COLOR_SPLIT_RE
        .split(trimmed)
        .filter_map(|segment| resolve(segment));
    MultiColor::from_colors(pieces).or_else(|| resolve(trimmed).map(MultiColor::single))
}

pub fn normalize_multi_color(input: &str) -> Option<MultiColor> {
    multi_color_with(input, to_canon_color)
}

pub fn to_multi_color(input: &str) -> Option<String> {
    normalize_multi_color(input).map(|color| color.to_string())
}

// ==================== HEURISTIC DERIVATION ====================

lazy_static! {
    static ref COLOR_KEYWORDS: Vec<(Regex, CanonColor)> = [
        (r"navy", CanonColor::Navy),
        (r"olive", CanonColor::Olive),
        (r"denim", CanonColor::Denim),
        (r"charcoal", CanonColor::Charcoal),
        (r"gr[ae]y", CanonColor::LightGray),
        (r"off[\s-]white", CanonColor::OffWhite),
        (r"ivory|cream|ecru|bone", CanonColor::Ivory),
        (r"khaki|tan", CanonColor::Tan),
        (r"beige|stone|sand|oatmeal|taupe", CanonColor::Beige),
        (r"blue", CanonColor::Blue),
        (r"green", CanonColor::Green),
        (r"red", CanonColor::Red),
        (r"burgundy|maroon|wine", CanonColor::Burgundy),
        (r"orange|rust", CanonColor::Orange),
        (r"yellow|mustard", CanonColor::Yellow),
        (r"purple|violet|lilac", CanonColor::Purple),
        (r"pink|magenta", CanonColor::Pink),
        (r"brown", CanonColor::Brown),
        (r"black", CanonColor::Black),
        (r"white", CanonColor::White),
    ]
    .into_iter()
    .map(|(pattern, color)| (Regex::new(&format!(r"\b(?:{pattern})\b")).unwrap(), color))
    .collect();
}

/// Standardized facet color for a stored item: the explicit value when given,
/// else the raw scraped text, resolved exactly first and then by keyword.
pub fn derive_color_std(explicit: Option<&str>, raw: Option<&str>) -> Option<CanonColor> {
    let source = explicit.or(raw)?;
    if let Some(color) = to_canon_color(source) {
        return Some(color);
    }
    let key = lookup_key(source);
    COLOR_KEYWORDS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&key))
        .map(|(_, color)| *color)
}

// ==================== LEGACY MIGRATION ====================

/// Maps a stored color that used the merged composite vocabulary onto the
/// split vocabulary. A canonical color derived from `color_raw` wins.
pub fn remap_legacy_color(color_std: &str, color_raw: Option<&str>) -> Option<CanonColor> {
    let mapped = match lookup_key(color_std).as_str() {
        "ivory / off-white" => Some(CanonColor::Ivory),
        "beige / tan" => Some(CanonColor::Beige),
        _ => return to_canon_color(color_std),
    };
    derive_color_std(None, color_raw).or(mapped)
}

pub fn remap_legacy_article(article_type: &str) -> Option<CanonArticle> {
    match lookup_key(article_type).as_str() {
        "dress pants / slacks" => Some(CanonArticle::DressPants),
        _ => to_canon_article(article_type),
    }
}
