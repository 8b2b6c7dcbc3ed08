//! Playlist document import/export.
//!
//! The export document is a standalone pretty-printed JSON array in exactly
//! the persisted wire format; import parses the same shape. Anything whose
//! top level is not an array of entry-shaped records is rejected without
//! touching the queue.

use serde_json::Value;

use crate::error::{Error, Result, TransferError};
use crate::store::StoredEntry;

/// Suggested file name for exported playlist documents.
pub const EXPORT_FILE_NAME: &str = "ad_free_player_playlist.json";

/// Parse an uploaded playlist document into wire-format entries.
///
/// Entries are trusted as-is: unknown fields are ignored and missing fields
/// fill their defaults. The relative order of the document is preserved.
///
/// # Errors
///
/// `TransferError::MalformedDocument` when the input is not valid JSON, its
/// top-level value is not an array, or an element is not entry-shaped.
pub fn parse_document(document: &str) -> Result<Vec<StoredEntry>> {
    let value: Value = serde_json::from_str(document).map_err(|e| {
        Error::Transfer(TransferError::MalformedDocument {
            reason: e.to_string(),
        })
    })?;

    if !value.is_array() {
        return Err(Error::Transfer(TransferError::MalformedDocument {
            reason: "top-level value is not an array".to_string(),
        }));
    }

    serde_json::from_value(value).map_err(|e| {
        Error::Transfer(TransferError::MalformedDocument {
            reason: e.to_string(),
        })
    })
}

/// Render wire-format entries as a downloadable document.
///
/// # Errors
///
/// `TransferError::EmptyQueue` when there is nothing to export.
pub fn render_document(entries: &[StoredEntry]) -> Result<String> {
    if entries.is_empty() {
        return Err(Error::Transfer(TransferError::EmptyQueue));
    }
    Ok(serde_json::to_string_pretty(entries)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> Vec<StoredEntry> {
        vec![
            StoredEntry {
                id: "aaaaaaaaaaa".to_string(),
                has_error: false,
                error_code: None,
                title: "First".to_string(),
                title_loaded: true,
            },
            StoredEntry {
                id: "bbbbbbbbbbb".to_string(),
                has_error: true,
                error_code: Some(150),
                title: "Video 2".to_string(),
                title_loaded: false,
            },
        ]
    }

    #[test]
    fn test_render_then_parse_roundtrip() {
        let entries = sample();
        let document = render_document(&entries).unwrap();
        let parsed = parse_document(&document).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_render_is_pretty_printed() {
        let document = render_document(&sample()).unwrap();
        assert!(document.starts_with("[\n"));
        assert!(document.contains("\"hasError\": true"));
        assert!(document.contains("\"errorCode\": 150"));
    }

    #[test]
    fn test_render_empty_queue_is_rejected() {
        let err = render_document(&[]).unwrap_err();
        assert!(matches!(err, Error::Transfer(TransferError::EmptyQueue)));
    }

    #[test]
    fn test_parse_rejects_non_array_top_level() {
        for document in [r#"{"id":"aaaaaaaaaaa"}"#, "42", r#""playlist""#, "null"] {
            let err = parse_document(document).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::Transfer(TransferError::MalformedDocument { .. })
                ),
                "document: {document}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_document("[{not json").unwrap_err();
        assert!(matches!(
            err,
            Error::Transfer(TransferError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_non_entry_elements() {
        let err = parse_document("[1, 2, 3]").unwrap_err();
        assert!(matches!(
            err,
            Error::Transfer(TransferError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_parse_fills_missing_fields() {
        let parsed = parse_document(r#"[{"id":"ccccccccccc"}]"#).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, "ccccccccccc");
        assert!(!parsed[0].has_error);
        assert!(!parsed[0].title_loaded);
    }

    #[test]
    fn test_parse_accepts_empty_array() {
        assert!(parse_document("[]").unwrap().is_empty());
    }
}
