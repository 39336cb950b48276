//! Catalog source model.

use serde::{Deserialize, Serialize};

/// One entry from the upstream catalog's `/v1/sources` listing.
///
/// Sources are owned by the catalog service and refreshed on every regulator
/// tick; the control plane keeps no authoritative copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub source_name: String,
    pub image_count: u64,
    #[serde(default)]
    pub display_name: String,
    pub source_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialises_full_entry() {
        let source: Source = serde_json::from_str(
            r#"{
                "source_name": "flickr",
                "image_count": 500000000,
                "display_name": "Flickr",
                "source_url": "https://www.flickr.com"
            }"#,
        )
        .unwrap();
        assert_eq!(source.source_name, "flickr");
        assert_eq!(source.image_count, 500_000_000);
    }

    #[test]
    fn display_name_is_optional() {
        let source: Source = serde_json::from_str(
            r#"{"source_name": "example", "image_count": 5000000, "source_url": "example.com"}"#,
        )
        .unwrap();
        assert_eq!(source.display_name, "");
    }

    #[test]
    fn missing_image_count_is_rejected() {
        let result: Result<Source, _> = serde_json::from_str(
            r#"{"source_name": "example", "source_url": "example.com"}"#,
        );
        assert!(result.is_err());
    }
}
