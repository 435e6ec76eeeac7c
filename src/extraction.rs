// src/extraction.rs
use crate::exif_data::{GpsCoordinate, MetadataMap, TagGroups};
use crate::exif_parser::{self, ParseError};
use crate::viewer_config::ExtractionSettings;
use futures_util::future::{select, Either};
use gloo::file::futures::read_as_bytes;
use gloo::file::{File, FileReadError};
use gloo::timers::future::TimeoutFuture;
use thiserror::Error;

/// Full tag set plus the result of the dedicated GPS read.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub metadata: MetadataMap,
    pub coordinate: Option<GpsCoordinate>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not read file: {0}")]
    Read(#[from] FileReadError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("reading the file timed out after {ms} ms")]
    TimedOut { ms: u32 },
}

/// Run both reads over the same bytes. Either one failing fails the whole
/// extraction.
pub fn extract_from_bytes(bytes: &[u8], groups: &TagGroups) -> Result<Extracted, ExtractError> {
    let metadata = exif_parser::parse_tags(bytes, groups)?;
    let coordinate = exif_parser::extract_gps(bytes)?;
    Ok(Extracted {
        metadata,
        coordinate,
    })
}

/// Read a browser file and extract its metadata, bounded by the configured
/// timeout.
pub async fn extract_file(
    file: &File,
    settings: &ExtractionSettings,
) -> Result<Extracted, ExtractError> {
    let read = Box::pin(read_as_bytes(file));
    let timeout = Box::pin(TimeoutFuture::new(settings.timeout_ms));

    let bytes = match select(read, timeout).await {
        Either::Left((result, _)) => result?,
        Either::Right(_) => {
            return Err(ExtractError::TimedOut {
                ms: settings.timeout_ms,
            })
        }
    };

    log::info!("Read {} ({} bytes)", file.name(), bytes.len());
    extract_from_bytes(&bytes, &settings.tag_groups)
}

/// Monotonic tag for extraction attempts; only the latest may update state.
#[derive(Debug, Default)]
pub struct ExtractionSequence {
    latest: u64,
}

impl ExtractionSequence {
    pub fn begin(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif_data::{filter_metadata, MAKER_NOTE_KEY, THUMBNAIL_KEY};
    use crate::exif_parser::fixtures::*;

    #[test]
    fn test_extract_san_francisco_scenario() {
        let extracted = extract_from_bytes(&tiff_with_gps(), &TagGroups::default()).unwrap();

        assert_eq!(extracted.metadata.len(), 20);
        let filtered = filter_metadata(&extracted.metadata);
        assert_eq!(filtered.len(), 18);
        assert!(!filtered.contains_key(MAKER_NOTE_KEY));
        assert!(!filtered.contains_key(THUMBNAIL_KEY));

        let coord = extracted.coordinate.unwrap();
        assert!((coord.latitude - 37.7749).abs() < 1e-6);
        assert!((coord.longitude + 122.4194).abs() < 1e-6);
    }

    #[test]
    fn test_extract_without_exif() {
        let bytes = jpeg(&[jfif_segment()]);
        let extracted = extract_from_bytes(&bytes, &TagGroups::default()).unwrap();
        assert!(extracted.metadata.len() <= 6);
        assert_eq!(extracted.coordinate, None);
    }

    #[test]
    fn test_extract_corrupt_is_idempotent() {
        let bytes = b"\x00\x01garbage\xff\xfe".to_vec();
        for _ in 0..3 {
            let result = extract_from_bytes(&bytes, &TagGroups::default());
            assert!(matches!(result, Err(ExtractError::Parse(ParseError::Exif(_)))));
        }
    }

    #[test]
    fn test_gps_read_ignores_group_settings() {
        let no_gps_tags = TagGroups {
            gps: false,
            ..TagGroups::default()
        };
        let extracted = extract_from_bytes(&tiff_with_gps(), &no_gps_tags).unwrap();
        assert!(!extracted.metadata.contains_key("GPSLatitude"));
        assert!(extracted.coordinate.is_some());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ExtractError::TimedOut { ms: 500 }.to_string(),
            "reading the file timed out after 500 ms"
        );
        assert_eq!(
            ExtractError::from(ParseError::Empty).to_string(),
            "file is empty"
        );
    }

    #[test]
    fn test_sequence() {
        let mut sequence = ExtractionSequence::default();
        let first = sequence.begin();
        assert!(sequence.is_current(first));

        let second = sequence.begin();
        assert!(second > first);
        assert!(!sequence.is_current(first));
        assert!(sequence.is_current(second));
    }
}
