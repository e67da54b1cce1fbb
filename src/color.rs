use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::vocab::{multi_color_with, to_canon_color, CanonColor, MultiColor};

const COLOR_PHRASES: &[&str] = &[
    "tapestry navy",
    "midnight navy",
    "navy blue",
    "deep navy",
    "dark navy",
    "midnight blue",
    "royal blue",
    "light blue",
    "sky blue",
    "baby blue",
    "heather gray",
    "heather grey",
    "charcoal gray",
    "charcoal grey",
    "stone gray",
    "light gray",
    "light grey",
    "dark gray",
    "dark grey",
    "off white",
    "soft white",
    "forest green",
    "sage green",
    "army green",
    "hunter green",
    "olive green",
    "jet black",
    "faded black",
    "washed black",
    "soft black",
    "dusty pink",
    "pastel pink",
    "burnt orange",
];

const BASE_COLORS: &[&str] = &[
    "black", "white", "navy", "blue", "green", "olive", "red", "maroon", "pink", "purple",
    "gray", "grey", "silver", "gold", "khaki", "camel", "stone", "taupe", "burgundy", "teal",
    "mustard", "orange", "yellow", "beige", "ivory", "cream", "tan", "brown", "charcoal",
    "rust",
];

const LABEL_WINDOW_WORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTier {
    Label,
    Phrase,
    Base,
}

impl ColorTier {
    pub fn confidence(&self) -> f32 {
        match self {
            ColorTier::Label => 0.85,
            ColorTier::Phrase => 0.70,
            ColorTier::Base => 0.50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorMatch {
    pub color: Option<MultiColor>,
    pub confidence: f32,
    pub tier: Option<ColorTier>,
}

impl ColorMatch {
    fn hit(color: MultiColor, tier: ColorTier) -> Self {
        Self {
            color: Some(color),
            confidence: tier.confidence(),
            tier: Some(tier),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none()
    }
}

struct Vocabulary {
    pattern: Regex,
    color: CanonColor,
    tier: ColorTier,
}

#[derive(Debug, Clone, Copy)]
struct Mention {
    start: usize,
    end: usize,
    color: CanonColor,
    tier: ColorTier,
}

lazy_static! {
    static ref LABEL_RE: Regex =
        Regex::new(r"(?i)\bcolou?r\b\s*[:=-]?\s*([a-z][a-z /&+,'-]{1,40})").unwrap();
    static ref JOINER_RE: Regex = Regex::new(r"(?i)^\s*(?:[/&+,]|and)\s*$").unwrap();
    static ref WORD_RE: Regex = Regex::new(r"[a-z]+(?:-[a-z]+)*").unwrap();
    // Longest phrases first so "navy blue" claims its span before "navy".
    static ref VOCABULARY: Vec<Vocabulary> = {
        let mut phrases: Vec<&str> = COLOR_PHRASES.to_vec();
        phrases.sort_by(|a, b| b.len().cmp(&a.len()));
        let phrase_entries = phrases.into_iter().filter_map(|phrase| {
            let color = to_canon_color(phrase)?;
            let body = phrase
                .split(' ')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"[\s-]+");
            Some(Vocabulary {
                pattern: Regex::new(&format!(r"(?i)\b{body}\b")).unwrap(),
                color,
                tier: ColorTier::Phrase,
            })
        });
        let base_entries = BASE_COLORS.iter().filter_map(|word| {
            Some(Vocabulary {
                pattern: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).unwrap(),
                color: to_canon_color(word)?,
                tier: ColorTier::Base,
            })
        });
        phrase_entries.chain(base_entries).collect()
    };
}

fn scan_mentions(text: &str) -> Vec<Mention> {
    let mut mentions: Vec<Mention> = Vec::new();
    for entry in VOCABULARY.iter() {
        for found in entry.pattern.find_iter(text) {
            let overlaps = mentions
                .iter()
                .any(|m| found.start() < m.end && m.start < found.end());
            if !overlaps {
                mentions.push(Mention {
                    start: found.start(),
                    end: found.end(),
                    color: entry.color,
                    tier: entry.tier,
                });
            }
        }
    }
    mentions.sort_by_key(|m| m.start);
    mentions
}

/// The run of mentions around `anchor` that are joined only by composite
/// separators, e.g. "ivory / off-white".
fn composite_around(text: &str, mentions: &[Mention], anchor: usize) -> Option<MultiColor> {
    let joined = |left: &Mention, right: &Mention| JOINER_RE.is_match(&text[left.end..right.start]);

    let mut first = anchor;
    while first > 0 && joined(&mentions[first - 1], &mentions[first]) {
        first -= 1;
    }
    let mut last = anchor;
    while last + 1 < mentions.len() && joined(&mentions[last], &mentions[last + 1]) {
        last += 1;
    }
    MultiColor::from_colors(mentions[first..=last].iter().map(|m| m.color))
}

fn match_tier(text: &str, mentions: &[Mention], tier: ColorTier) -> Option<MultiColor> {
    let anchor = mentions.iter().position(|m| m.tier == tier)?;
    composite_around(text, mentions, anchor)
}

/// Longest leading word run of `piece` that is a known color or alias.
fn resolve_prefix(piece: &str) -> Option<CanonColor> {
    let lowered = piece.to_lowercase();
    let words: Vec<&str> = WORD_RE.find_iter(&lowered).map(|m| m.as_str()).collect();
    (1..=words.len())
        .rev()
        .find_map(|n| to_canon_color(&words[..n].join(" ")))
}

pub fn match_label(text: &str) -> Option<MultiColor> {
    let captured = LABEL_RE.captures(text)?.get(1)?.as_str().trim();
    if captured.is_empty() {
        return None;
    }
    multi_color_with(captured, resolve_prefix).or_else(|| {
        // Only a mention right after the label counts as labelled.
        let lowered = captured.to_lowercase();
        let window_end = WORD_RE
            .find_iter(&lowered)
            .nth(LABEL_WINDOW_WORDS)
            .map_or(captured.len(), |word| word.start());
        let mentions = scan_mentions(captured);
        match mentions.first() {
            Some(first) if first.start < window_end => composite_around(captured, &mentions, 0),
            _ => None,
        }
    })
}

pub fn match_phrase(text: &str) -> Option<MultiColor> {
    match_tier(text, &scan_mentions(text), ColorTier::Phrase)
}

pub fn match_base(text: &str) -> Option<MultiColor> {
    match_tier(text, &scan_mentions(text), ColorTier::Base)
}

/// Runs the label, phrase, and base tiers in priority order; the first tier
/// that yields a canonical color wins regardless of where it sits in the text.
pub fn classify_color(text: &str) -> ColorMatch {
    if text.trim().is_empty() {
        return ColorMatch::default();
    }
    if let Some(color) = match_label(text) {
        return ColorMatch::hit(color, ColorTier::Label);
    }
    let mentions = scan_mentions(text);
    [ColorTier::Phrase, ColorTier::Base]
        .into_iter()
        .find_map(|tier| match_tier(text, &mentions, tier).map(|color| ColorMatch::hit(color, tier)))
        .unwrap_or_default()
}

/// Loose color phrase from descriptive copy ("Colour: Deep Navy",
/// "available in sage colour", "olive color"). The phrase is returned raw.
pub fn extract_color_phrase(text: &str) -> Option<String> {
    lazy_static! {
        static ref PATTERNS: Vec<Regex> = vec![
            Regex::new(r"(?i)(?:color|colour)\s*[:\-]\s*([A-Za-z0-9 \-/]+)").unwrap(),
            Regex::new(r"(?i)available in\s+([A-Za-z0-9 \-/]+)\s+(?:color|colour)").unwrap(),
            Regex::new(r"(?i)\b([A-Za-z][A-Za-z0-9 \-/]+)\s+(?:color|colour)\b").unwrap(),
        ];
        static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
    }
    PATTERNS.iter().find_map(|pattern| {
        let captured = pattern.captures(text)?.get(1)?.as_str();
        let cleaned = SPACES.replace_all(captured, " ").trim().to_string();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    })
}
