use lazy_static::lazy_static;
use regex::Regex;

use crate::vocab::{to_canon_article, CanonArticle};

/// One row of the ordered rule table. `label` is resolved through the article
/// alias table; `confidence` is the fixed weight reported on a hit.
pub struct ArticleRule {
    pub label: &'static str,
    pub patterns: Vec<Regex>,
    /// Spans blanked out before `patterns` run, e.g. brand names that reuse
    /// the garment word.
    pub masks: Vec<Regex>,
    pub confidence: f32,
}

impl ArticleRule {
    pub fn matches(&self, text: &str) -> bool {
        if self.masks.is_empty() {
            return self.patterns.iter().any(|p| p.is_match(text));
        }
        let masked = self
            .masks
            .iter()
            .fold(text.to_string(), |acc, mask| mask.replace_all(&acc, " ").into_owned());
        self.patterns.iter().any(|p| p.is_match(&masked))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArticleMatch {
    pub label: Option<CanonArticle>,
    pub confidence: f32,
}

// Most specific silhouette first. A row never moves below a more generic row
// whose patterns it overlaps ("hooded" sits above "sweatshirt", "dress shoes"
// above "dress", "shorts" above "jeans").
const RULES: &[(&str, &[&str], f32)] = &[
    // dresses named after a top ("tank dress", "shirt dress")
    (
        "dress",
        &[r"\b(?:tank|slip|shirt|sweater|hoodie|polo|tee|t[-\s]?shirt)\s+dress(?:es)?\b"],
        0.8,
    ),
    ("quarter-zip", &[r"quarter[-\s]?zip", r"1/4\s?zip", r"half[-\s]?zip", r"zip[-\s]?neck"], 0.9),
    ("hoodie", &[r"hoodie", r"\bhooded\b", r"\bhoody\b"], 0.85),
    ("cardigan", &[r"cardigan"], 0.85),
    ("sweatshirt", &[r"sweat\s?shirt"], 0.85),
    ("sweater", &[r"sweater", r"pullover", r"jumper"], 0.75),
    // footwear
    ("running shoes", &[r"running\s+shoes?", r"\btrainers?\b", r"\brunners\b"], 0.85),
    ("sneakers", &[r"sneakers?", r"tennis\s+shoes?"], 0.85),
    ("dress shoes", &[r"dress\s+shoes?", r"oxford\s+shoes?", r"derby\s+shoes?", r"\bbrogues?\b"], 0.8),
    ("loafers", &[r"loafers?", r"moccasins?"], 0.85),
    ("boots", &[r"\bboots\b", r"\b(?:chelsea|combat|ankle|hiking|rain|work)\s+boot\b"], 0.8),
    ("slides", &[r"\bslides\b", r"slide\s+sandals?"], 0.8),
    ("sandals", &[r"sandals?\b"], 0.8),
    ("heels", &[r"\bheels\b", r"\bpumps\b", r"stiletto"], 0.8),
    ("flats", &[r"ballet\s+flats?", r"\bflats\b"], 0.75),
    // one-pieces
    ("jumpsuit", &[r"jumpsuit", r"boiler\s?suit"], 0.85),
    ("romper", &[r"rompers?", r"playsuit"], 0.85),
    ("overalls", &[r"overalls?\b", r"dungarees"], 0.85),
    // tailored bottoms that would otherwise read as "dress"
    ("dress pants", &[r"dress\s+(?:pants?|trousers?)", r"pleated\s+(?:pants?|trousers?)"], 0.8),
    ("slacks", &[r"\bslacks\b"], 0.8),
    // tops
    ("button-down", &[r"button[-\s]?(?:down|up)", r"\boxford\b", r"dress\s+shirt", r"flannel\s+shirt"], 0.75),
    ("polo", &[r"polo\s+shirts?", r"\bpolos?\b"], 0.8),
    ("long sleeve", &[r"long[-\s]?sleeve", r"henley"], 0.7),
    ("t-shirt", &[r"\bt[-\s]?shirts?\b", r"\btees?\b"], 0.7),
    ("crop top", &[r"crop(?:ped)?\s+top"], 0.8),
    ("tank top", &[r"tank\s+top", r"\btank\b", r"camisole", r"\bcami\b"], 0.75),
    ("blouse", &[r"blouse"], 0.8),
    ("coat", &[r"dress\s+coats?\b"], 0.8),
    ("dress", &[r"\bdress(?:es)?\b", r"\bgown\b"], 0.75),
    // outerwear
    ("blazer", &[r"blazer", r"sport\s?coat"], 0.8),
    ("vest", &[r"\bvest\b", r"\bgilet\b"], 0.75),
    ("coat", &[r"coat\b", r"overcoat", r"trench", r"parka", r"puffer", r"anorak", r"down\s+jacket"], 0.75),
    ("jacket", &[r"jacket", r"bomber", r"windbreaker"], 0.7),
    ("crewneck", &[r"crew[-\s]?neck", r"mock[-\s]?neck"], 0.7),
    // bottoms
    ("shorts", &[r"\bshorts\b"], 0.75),
    ("cargo pants", &[r"cargo\s+(?:pants?|trousers?)", r"\bcargos\b"], 0.8),
    ("joggers", &[r"joggers?\b"], 0.8),
    ("sweatpants", &[r"sweat\s?pants?", r"track\s?pants?"], 0.8),
    ("leggings", &[r"leggings?", r"yoga\s+pants?"], 0.8),
    ("jeans", &[r"\bjeans?\b", r"\bdenim\b"], 0.7),
    ("chinos", &[r"chinos?\b", r"\bkhakis\b"], 0.7),
    ("skirt", &[r"skirts?\b"], 0.75),
    ("pants", &[r"trousers?\b", r"\bpants?\b"], 0.6),
    // generic catch-all
    ("shirt", &[r"\bshirts?\b"], 0.5),
];

// Brand names that would otherwise fire a rule.
const RULE_MASKS: &[(&str, &[&str])] = &[("polo", &[r"\bpolo\s+(?:by\s+)?ralph(?:\s+lauren)?\b"])];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .collect()
}

lazy_static! {
    pub static ref ARTICLE_RULES: Vec<ArticleRule> = RULES
        .iter()
        .map(|(label, patterns, confidence)| ArticleRule {
            label: *label,
            patterns: compile(patterns),
            masks: RULE_MASKS
                .iter()
                .filter(|(masked, _)| masked == label)
                .flat_map(|(_, masks)| compile(masks))
                .collect(),
            confidence: *confidence,
        })
        .collect();
}

/// First rule (in table order) with any matching pattern.
pub fn match_rule(text: &str) -> Option<&'static ArticleRule> {
    ARTICLE_RULES
        .iter()
        .find(|rule| rule.matches(text))
}

/// Classifies `text` into a canonical article. A matched label that does not
/// canonicalize is dropped, and its confidence with it.
pub fn classify_article(text: &str) -> ArticleMatch {
    match_rule(text)
        .and_then(|rule| {
            to_canon_article(rule.label).map(|label| ArticleMatch {
                label: Some(label),
                confidence: rule.confidence,
            })
        })
        .unwrap_or_default()
}
