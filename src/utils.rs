//! Helpers for filenames, timestamps, CSV escaping and output directories.

use chrono::{SecondsFormat, Utc};
use std::borrow::Cow;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Filename used when a URL has no usable last path segment.
const FALLBACK_FILENAME: &str = "document.pdf";

/// Derive the local filename for a document URL.
///
/// Takes the last path segment with any query string or fragment removed,
/// percent-decodes it, and appends `.pdf` unless the segment already ends with it. The extension
/// check ignores case and never re-cases the name.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(local_filename("https://x.org/docs/report?v=2"), "report.pdf");
/// assert_eq!(local_filename("https://x.org/docs/report.PDF"), "report.PDF");
/// ```
pub fn local_filename(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.last())
            .map(decode_segment)
            .unwrap_or_default(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or_default()
            .to_string(),
    };

    if segment.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else if ends_with_ignore_ascii_case(&segment, ".pdf") {
        segment
    } else {
        format!("{segment}.pdf")
    }
}

/// Percent-decode a path segment. Segments that decode to invalid UTF-8 or
/// to something containing a path separator are kept encoded.
fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) if !decoded.contains(['/', '\\']) => decoded.into_owned(),
        _ => segment.to_string(),
    }
}

/// Case-insensitive ASCII suffix test.
pub fn ends_with_ignore_ascii_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Current time as an ISO-8601 UTC timestamp with second precision.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (backing off to a char boundary) with
/// an ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_filename_strips_query_and_appends_extension() {
        assert_eq!(local_filename("https://x.org/docs/report?v=2"), "report.pdf");
    }

    #[test]
    fn test_local_filename_keeps_uppercase_extension() {
        assert_eq!(local_filename("https://x.org/docs/report.PDF"), "report.PDF");
    }

    #[test]
    fn test_local_filename_plain_pdf() {
        assert_eq!(
            local_filename("https://www.who.int/docs/default-source/diabetes-2024.pdf"),
            "diabetes-2024.pdf"
        );
        assert_eq!(local_filename("https://x.org/a/b.pdf#page=3"), "b.pdf");
    }

    #[test]
    fn test_local_filename_decodes_percent_escapes() {
        assert_eq!(
            local_filename("https://x.org/files/Type%202%20diabetes.pdf"),
            "Type 2 diabetes.pdf"
        );
        assert_eq!(local_filename("https://x.org/files/caf%C3%A9"), "café.pdf");
    }

    #[test]
    fn test_local_filename_keeps_encoded_separators() {
        assert_eq!(local_filename("https://x.org/a%2F..%2Fb.pdf"), "a%2F..%2Fb.pdf");
        assert_eq!(local_filename("https://x.org/a%5Cb.pdf"), "a%5Cb.pdf");
        assert_eq!(local_filename("https://x.org/bad%FF.pdf"), "bad%FF.pdf");
    }

    #[test]
    fn test_local_filename_trailing_slash_falls_back() {
        assert_eq!(local_filename("https://x.org/docs/"), "document.pdf");
        assert_eq!(local_filename("https://x.org"), "document.pdf");
    }

    #[test]
    fn test_ends_with_ignore_ascii_case() {
        assert!(ends_with_ignore_ascii_case("a.PdF", ".pdf"));
        assert!(!ends_with_ignore_ascii_case("pdf", ".pdf"));
        assert!(!ends_with_ignore_ascii_case("é", ".pdf"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_utc_timestamp_shape() {
        let ts = utc_timestamp();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[10..11], "T");
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 100), "short");
        let long = "a".repeat(500);
        let result = truncate_for_log(&long, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
