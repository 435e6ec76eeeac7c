// src/viewer_config.rs
use crate::exif_data::TagGroups;
use crate::utils::resource_url;
use gloo_net::http::Request;
use serde::Deserialize;

pub const CONFIG_PATH: &str = "public/config.json";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub map: MapSettings,
    pub extraction: ExtractionSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// XYZ tile template, e.g. `https://tile.openstreetmap.org/{z}/{x}/{y}.png`
    pub tile_url: String,
    pub zoom: f64,
    pub marker_icon: String,
    /// Fraction of the icon size; `[0.5, 1.0]` pins the bottom-center.
    pub marker_anchor: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub tag_groups: TagGroups,
    pub timeout_ms: u32,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            tile_url: String::from("https://tile.openstreetmap.org/{z}/{x}/{y}.png"),
            zoom: 14.0,
            marker_icon: String::from("public/marker-icon.svg"),
            marker_anchor: [0.5, 1.0],
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            tag_groups: TagGroups::default(),
            timeout_ms: 10_000,
        }
    }
}

impl MapSettings {
    /// Marker icon URL with the deployment base path applied. Absolute URLs
    /// are passed through.
    pub fn marker_icon_url(&self) -> String {
        let icon = self.marker_icon.trim();
        if icon.starts_with("http://") || icon.starts_with("https://") || icon.starts_with("data:")
        {
            icon.to_string()
        } else {
            resource_url(icon)
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Fetch `public/config.json`.
    pub async fn load() -> Result<Self, String> {
        let url = resource_url(CONFIG_PATH);
        let resp = Request::get(&url)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch {}: {:?}", url, e))?;
        if !resp.ok() {
            return Err(format!("{} returned HTTP {}", url, resp.status()));
        }
        let text = resp
            .text()
            .await
            .map_err(|e| format!("Failed to read {}: {:?}", url, e))?;
        Self::from_json(&text).map_err(|e| format!("Invalid {}: {}", url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.map.zoom, 14.0);
        assert_eq!(config.map.marker_anchor, [0.5, 1.0]);
        assert!(config.map.tile_url.contains("{z}/{x}/{y}"));
        assert_eq!(config.extraction.timeout_ms, 10_000);
        assert_eq!(config.extraction.tag_groups, TagGroups::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json(
            r#"{ "map": { "zoom": 16 }, "extraction": { "tag_groups": { "xmp": false } } }"#,
        )
        .unwrap();

        assert_eq!(config.map.zoom, 16.0);
        assert_eq!(config.map.marker_icon, "public/marker-icon.svg");
        assert!(!config.extraction.tag_groups.xmp);
        assert!(config.extraction.tag_groups.tiff);
        assert_eq!(config.extraction.timeout_ms, 10_000);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(
            ViewerConfig::from_json("{}").unwrap(),
            ViewerConfig::default()
        );
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(ViewerConfig::from_json(r#"{ "map": { "zoom": "far" } }"#).is_err());
    }

    #[test]
    fn test_marker_icon_url_passthrough() {
        let settings = MapSettings {
            marker_icon: "https://cdn.example.org/pin.png".to_string(),
            ..MapSettings::default()
        };
        assert_eq!(settings.marker_icon_url(), "https://cdn.example.org/pin.png");
    }
}
