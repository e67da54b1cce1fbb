use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::vocab::{derive_color_std, to_canon_article, CanonArticle, CanonColor};

/// A field in a partial update: left out, explicitly cleared, or set.
///
/// Fields of this type need `#[serde(default)]` so that a missing key decodes
/// to `Absent` while an explicit `null` decodes to `Null`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Patch<U> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }

    pub fn into_option(self) -> Option<Option<T>> {
        match self {
            Patch::Absent => None,
            Patch::Null => Some(None),
            Patch::Value(v) => Some(Some(v)),
        }
    }
}

impl Patch<String> {
    pub fn trimmed(self) -> Self {
        match self {
            Patch::Value(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Patch::Null
                } else {
                    Patch::Value(trimmed.to_string())
                }
            }
            other => other,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Value(v) => v.serialize(serializer),
            _ => serializer.serialize_none(),
        }
    }
}

/// Partial update of an item's scraped/parsed attributes, decoded once at
/// the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemAttributesPatch {
    pub name: Patch<String>,
    pub brand: Patch<String>,
    pub color_raw: Patch<String>,
    pub color: Patch<String>,
    pub color_std: Patch<String>,
    pub article_type: Patch<String>,
    pub image_url: Patch<String>,
    pub original_url: Patch<String>,
}

/// The patch after trimming and canonicalization, ready to persist.
/// `Absent` fields must be left untouched by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAttributes {
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub brand: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub color_raw: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub color_std: Patch<CanonColor>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub article_type: Patch<CanonArticle>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub image_url: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub original_url: Patch<String>,
}

impl ItemAttributesPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn resolve(self) -> ResolvedAttributes {
        let color_raw_in = self.color_raw.trimmed();
        let color = self.color.trimmed();
        let color_std_in = self.color_std.trimmed();

        // colorRaw falls back to the plain `color` field.
        let color_raw = if color_raw_in.is_present() {
            color_raw_in
        } else {
            color.clone()
        };

        let color_std = if color_std_in.is_present() || color.is_present() || color_raw.is_present() {
            let source = match color_std_in {
                Patch::Null => None,
                _ => color.value().or_else(|| color_raw.value()).map(String::as_str),
            };
            match derive_color_std(color_std_in.value().map(String::as_str), source) {
                Some(canonical) => Patch::Value(canonical),
                None => Patch::Null,
            }
        } else {
            Patch::Absent
        };

        let article_type = match self.article_type.trimmed() {
            Patch::Value(raw) => match to_canon_article(&raw) {
                Some(article) => Patch::Value(article),
                None => Patch::Absent,
            },
            Patch::Null => Patch::Null,
            Patch::Absent => Patch::Absent,
        };

        ResolvedAttributes {
            name: self.name.trimmed(),
            brand: self.brand.trimmed(),
            color_raw,
            color_std,
            article_type,
            image_url: self.image_url.trimmed(),
            original_url: self.original_url.trimmed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> ItemAttributesPatch {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn distinguishes_absent_null_and_value() {
        let patch = decode(r#"{"name":"Classic Crew","brand":null}"#);
        assert_eq!(patch.name, Patch::Value("Classic Crew".to_string()));
        assert_eq!(patch.brand, Patch::Null);
        assert_eq!(patch.color_raw, Patch::Absent);
        assert!(decode("{}").is_empty());
    }

    #[test]
    fn blank_strings_clear() {
        let resolved = decode(r#"{"name":"   ","imageUrl":" https://cdn.example.com/a.png "}"#).resolve();
        assert_eq!(resolved.name, Patch::Null);
        assert_eq!(
            resolved.image_url,
            Patch::Value("https://cdn.example.com/a.png".to_string())
        );
    }

    #[test]
    fn derives_color_std_from_raw() {
        let resolved = decode(r#"{"colorRaw":"Hale Navy"}"#).resolve();
        assert_eq!(resolved.color_raw, Patch::Value("Hale Navy".to_string()));
        assert_eq!(resolved.color_std, Patch::Value(CanonColor::Navy));

        let resolved = decode(r#"{"color":"Heather Grey"}"#).resolve();
        assert_eq!(resolved.color_raw, Patch::Value("Heather Grey".to_string()));
        assert_eq!(resolved.color_std, Patch::Value(CanonColor::LightGray));
    }

    #[test]
    fn explicit_color_std_wins_and_null_clears() {
        let resolved = decode(r#"{"colorStd":"Black","colorRaw":"Hale Navy"}"#).resolve();
        assert_eq!(resolved.color_std, Patch::Value(CanonColor::Black));

        let resolved = decode(r#"{"colorStd":null,"colorRaw":"Hale Navy"}"#).resolve();
        assert_eq!(resolved.color_std, Patch::Null);

        let resolved = decode(r#"{"name":"No color"}"#).resolve();
        assert_eq!(resolved.color_std, Patch::Absent);
    }

    #[test]
    fn article_type_is_canonicalized() {
        let resolved = decode(r#"{"articleType":"hooded sweatshirt"}"#).resolve();
        assert_eq!(resolved.article_type, Patch::Value(CanonArticle::Hoodie));
        let resolved = decode(r#"{"articleType":"scarf"}"#).resolve();
        assert_eq!(resolved.article_type, Patch::Absent);
        let resolved = decode(r#"{"articleType":null}"#).resolve();
        assert_eq!(resolved.article_type, Patch::Null);
    }

    #[test]
    fn resolved_output_skips_absent_fields() {
        let resolved = decode(r#"{"brand":null,"articleType":"tee"}"#).resolve();
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json, serde_json::json!({"brand": null, "articleType": "T-Shirt"}));
    }

    #[test]
    fn into_option_nests_presence() {
        let patch = decode(r#"{"brand":null,"name":"Crew"}"#);
        assert_eq!(patch.color_raw.clone().into_option(), None);
        assert_eq!(patch.brand.clone().into_option(), Some(None));
        assert_eq!(patch.name.clone().into_option(), Some(Some("Crew".to_string())));
    }
}
