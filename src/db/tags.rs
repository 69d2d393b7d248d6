//! Encoding of the `images.tags` column.
//!
//! Tags are written as a JSON array of strings, so a tag may contain any
//! character. Older databases stored tags joined with `,`; that form is still
//! read, and the row is rewritten as JSON on its next tag edit.

use serde_json::Value;

use crate::error::{GalleryError, Result};

pub fn encode_tags(tags: &[String]) -> String {
    Value::Array(tags.iter().cloned().map(Value::String).collect()).to_string()
}

pub fn decode_tags(fingerprint: &str, raw: Option<&str>) -> Result<Vec<String>> {
    let raw = raw.unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    // Bracketed text that is not JSON is a legacy list whose first tag starts with '['
    if raw.starts_with('[') && raw.ends_with(']') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
            return items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) if s.trim().is_empty() => None,
                    Value::String(s) => Some(Ok(s)),
                    other => Some(Err(GalleryError::TagEncoding {
                        fingerprint: fingerprint.to_string(),
                        reason: format!("non-string tag {}", other),
                    })),
                })
                .collect();
        }
    }

    Ok(decode_legacy(raw))
}

fn decode_legacy(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
