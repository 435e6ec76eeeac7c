// src/exif_data.rs
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Vendor-specific maker note blob.
pub const MAKER_NOTE_KEY: &str = "MakerNote";
/// Embedded JPEG thumbnail bytes from IFD1.
pub const THUMBNAIL_KEY: &str = "thumbnail";

/// Tag name -> value, ordered by name for display.
pub type MetadataMap = BTreeMap<String, TagValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Number(f64),
    Text(String),
    Structured(serde_json::Value),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Number(n) => write!(f, "{}", n),
            TagValue::Text(s) => f.write_str(s),
            TagValue::Structured(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinate {
    /// Both halves must be present, finite and in range. (0, 0) is a valid
    /// position and is accepted.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        let (latitude, longitude) = (latitude?, longitude?);
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for GpsCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Which tag groups the parser decodes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TagGroups {
    pub tiff: bool,
    pub gps: bool,
    pub xmp: bool,
    pub jfif: bool,
}

impl Default for TagGroups {
    fn default() -> Self {
        Self {
            tiff: true,
            gps: true,
            xmp: true,
            jfif: true,
        }
    }
}

impl TagGroups {
    pub fn reads_exif(&self) -> bool {
        self.tiff || self.gps
    }
}

/// Drop the noisy entries (maker note, thumbnail bytes) before display.
pub fn filter_metadata(raw: &MetadataMap) -> MetadataMap {
    raw.iter()
        .filter(|(key, _)| key.as_str() != MAKER_NOTE_KEY && key.as_str() != THUMBNAIL_KEY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
