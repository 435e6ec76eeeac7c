// src/viewer_state.rs
use crate::exif_data::{filter_metadata, GpsCoordinate, MetadataMap};
use crate::extraction::{ExtractError, Extracted, ExtractionSequence};

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataPanel {
    Idle,
    Reading,
    /// Filtered entries, ready for display.
    Loaded(MetadataMap),
    Failed(String),
}

/// Display state of the viewer page, independent of the DOM.
#[derive(Debug)]
pub struct ViewerState {
    pub file_name: Option<String>,
    pub panel: MetadataPanel,
    pub coordinate: Option<GpsCoordinate>,
    sequence: ExtractionSequence,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            file_name: None,
            panel: MetadataPanel::Idle,
            coordinate: None,
            sequence: ExtractionSequence::default(),
        }
    }
}

impl ViewerState {
    /// A new file was picked. Returns the generation its extraction must
    /// report back with.
    pub fn begin_selection(&mut self, file_name: String) -> u64 {
        self.file_name = Some(file_name);
        self.panel = MetadataPanel::Reading;
        self.coordinate = None;
        self.sequence.begin()
    }

    /// Apply an extraction result. Returns false when the result belongs to a
    /// superseded selection and was dropped.
    pub fn finish(&mut self, generation: u64, result: Result<Extracted, ExtractError>) -> bool {
        if !self.sequence.is_current(generation) {
            log::debug!("Discarding stale extraction #{}", generation);
            return false;
        }

        match result {
            Ok(extracted) => {
                log::info!(
                    "Extracted {} tags, GPS: {}",
                    extracted.metadata.len(),
                    extracted
                        .coordinate
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "none".to_string())
                );
                self.panel = MetadataPanel::Loaded(filter_metadata(&extracted.metadata));
                self.coordinate = extracted.coordinate;
            }
            Err(e) => {
                log::warn!("Metadata extraction failed: {}", e);
                self.panel = MetadataPanel::Failed(e.to_string());
                self.coordinate = None;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif_data::{TagValue, THUMBNAIL_KEY};
    use crate::exif_parser::ParseError;

    fn extracted(latitude: f64, longitude: f64) -> Extracted {
        let mut metadata = MetadataMap::new();
        metadata.insert("Make".to_string(), TagValue::Text("Sony".to_string()));
        metadata.insert(
            THUMBNAIL_KEY.to_string(),
            TagValue::Structured(serde_json::json!([255, 216])),
        );
        Extracted {
            metadata,
            coordinate: Some(GpsCoordinate {
                latitude,
                longitude,
            }),
        }
    }

    #[test]
    fn test_success_filters_and_sets_coordinate() {
        let mut state = ViewerState::default();
        let generation = state.begin_selection("sf.jpg".to_string());
        assert_eq!(state.panel, MetadataPanel::Reading);

        assert!(state.finish(generation, Ok(extracted(37.7749, -122.4194))));
        match &state.panel {
            MetadataPanel::Loaded(tags) => {
                assert_eq!(tags.len(), 1);
                assert!(!tags.contains_key(THUMBNAIL_KEY));
            }
            other => panic!("unexpected panel {:?}", other),
        }
        assert!(state.coordinate.is_some());
        assert_eq!(state.file_name.as_deref(), Some("sf.jpg"));
    }

    #[test]
    fn test_failure_clears_coordinate() {
        let mut state = ViewerState::default();
        let first = state.begin_selection("a.jpg".to_string());
        state.finish(first, Ok(extracted(1.0, 2.0)));
        assert!(state.coordinate.is_some());

        let second = state.begin_selection("broken.jpg".to_string());
        assert!(state.finish(second, Err(ParseError::Empty.into())));
        assert_eq!(state.panel, MetadataPanel::Failed("file is empty".to_string()));
        assert!(state.coordinate.is_none());
    }

    #[test]
    fn test_no_gps_hides_map() {
        let mut state = ViewerState::default();
        let generation = state.begin_selection("plain.png".to_string());
        state.finish(
            generation,
            Ok(Extracted {
                metadata: MetadataMap::new(),
                coordinate: None,
            }),
        );
        assert_eq!(state.panel, MetadataPanel::Loaded(MetadataMap::new()));
        assert!(state.coordinate.is_none());
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut state = ViewerState::default();
        let slow = state.begin_selection("slow.jpg".to_string());
        let fast = state.begin_selection("fast.jpg".to_string());

        assert!(state.finish(fast, Ok(extracted(48.8566, 2.3522))));
        assert!(!state.finish(slow, Ok(extracted(51.5074, -0.1278))));

        assert_eq!(
            state.coordinate,
            Some(GpsCoordinate {
                latitude: 48.8566,
                longitude: 2.3522
            })
        );
    }

    #[test]
    fn test_selection_clears_previous_location() {
        let mut state = ViewerState::default();
        let generation = state.begin_selection("a.jpg".to_string());
        state.finish(generation, Ok(extracted(10.0, 20.0)));

        state.begin_selection("b.jpg".to_string());
        assert!(state.coordinate.is_none());
        assert_eq!(state.panel, MetadataPanel::Reading);
    }
}
