use serde::{Deserialize, Deserializer, Serialize};

/// A catalog item that may still need a product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub brand: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CatalogRecord {
    pub fn new(id: impl Into<String>, brand: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            brand: brand.into(),
            name: name.into(),
            image_url: None,
        }
    }

    /// True when `image_url` is null or empty, the same rows the catalog filters select.
    pub fn lacks_image(&self) -> bool {
        self.image_url.as_deref().map_or(true, str::is_empty)
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.brand, self.name)
    }
}

/// Which records a run should pick up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub brand: Option<String>,
    pub limit: Option<usize>,
    pub only_missing_image: bool,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            brand: None,
            limit: None,
            only_missing_image: true,
        }
    }
}

// Row ids come back as integers from some tables and as uuids from others.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "record id must be a string or number, got {}",
            other
        ))),
    }
}
