//! Filename and identifier checks run before any key is derived.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{UploadError, UploadResult};

/// Longest accepted filename, in characters.
pub const MAX_FILENAME_LEN: usize = 255;

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

static RESERVED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])(\.|$)").expect("valid reserved-name regex")
});

/// Whether `filename` is safe to embed in an object key.
///
/// ```
/// use parcel_core::validation::is_valid_filename;
///
/// assert!(is_valid_filename("data.csv"));
/// assert!(!is_valid_filename("../../etc/passwd"));
/// assert!(!is_valid_filename("nul.txt"));
/// ```
#[must_use]
pub fn is_valid_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename.chars().count() <= MAX_FILENAME_LEN
        && !filename.contains("../")
        && !filename.contains(FORBIDDEN_CHARS)
        && !RESERVED_NAME.is_match(filename)
}

/// Require a present, safe filename.
pub fn validate_filename(filename: Option<&str>) -> UploadResult<&str> {
    let filename = required("filename", filename)?;
    if is_valid_filename(filename) {
        Ok(filename)
    } else {
        Err(UploadError::validation(
            "filename",
            format!("Invalid filename: {filename}"),
        ))
    }
}

/// Require a present, non-blank identifier.
pub fn required<'a>(field: &str, value: Option<&'a str>) -> UploadResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(UploadError::validation(field, format!("{field} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_ordinary_names() {
        for name in ["data.csv", "report 2024.pdf", "a", "CONSOLE.txt", "lpt0", ".hidden"] {
            assert!(is_valid_filename(name), "{name}");
        }
        assert!(is_valid_filename(&"é".repeat(255)));
    }

    #[test]
    fn test_should_reject_unsafe_names() {
        let cases = [
            "",
            "../../etc/passwd",
            "a/../b",
            "what?.txt",
            "x<y",
            "pipe|name",
            "c:drive",
            "quote\"d",
            "star*",
            "CON",
            "con.txt",
            "Aux.log",
            "COM1",
            "lpt9.csv",
        ];
        for name in cases {
            assert!(!is_valid_filename(name), "{name}");
        }
        assert!(!is_valid_filename(&"a".repeat(256)));
    }

    #[test]
    fn test_should_report_field_for_missing_filename() {
        let err = validate_filename(None).unwrap_err();
        assert!(matches!(err, UploadError::Validation { ref field, .. } if field == "filename"));
        assert!(validate_filename(Some("   ")).is_err());
        assert_eq!(validate_filename(Some("ok.bin")).unwrap(), "ok.bin");
    }
}
