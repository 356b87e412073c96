//! Filename sanitising and content-type extension lookup.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::{ATTACHMENT_FILE_STEM, MAX_FILENAME_CHARS};

/// Characters that are unsafe in a path component on common filesystems.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\x00-\x1F\x7F/\\:*?"<>|]"#).expect("valid regex"));

/// Runs of whitespace, collapsed to a single space.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Known MIME types and the extension used when a part has no filename.
const EXTENSIONS: &[(&str, &str)] = &[
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/csv", "csv"),
    ("text/calendar", "ics"),
    ("text/rtf", "rtf"),
    ("text/xml", "xml"),
    ("application/rtf", "rtf"),
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("application/json", "json"),
    ("application/xml", "xml"),
    ("application/msword", "doc"),
    ("application/vnd.ms-excel", "xls"),
    ("application/vnd.ms-outlook", "msg"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/bmp", "bmp"),
    ("image/tiff", "tif"),
    ("message/rfc822", "eml"),
    ("message/global", "eml"),
];

/// Extension used for parts of unknown type.
pub const DEFAULT_EXTENSION: &str = "bin";

/// Extension for a MIME type, or [`DEFAULT_EXTENSION`] when unknown.
///
/// # Examples
/// ```
/// use mailsplit_mime::filename::extension_for_mime_type;
///
/// assert_eq!(extension_for_mime_type("application/pdf"), "pdf");
/// assert_eq!(extension_for_mime_type("IMAGE/JPEG"), "jpg");
/// assert_eq!(extension_for_mime_type("application/x-unknown"), "bin");
/// ```
#[must_use]
pub fn extension_for_mime_type(mime_type: &str) -> &'static str {
    EXTENSIONS
        .iter()
        .find(|(t, _)| t.eq_ignore_ascii_case(mime_type))
        .map(|(_, ext)| *ext)
        .unwrap_or(DEFAULT_EXTENSION)
}

/// Make a suggested filename safe to use as the last component of an output path.
///
/// - Unicode is NFC-normalised
/// - Path separators, control and reserved characters become `_`
/// - Whitespace runs collapse to one space; leading/trailing dots and spaces are removed
/// - The name is bounded to [`MAX_FILENAME_CHARS`], keeping the extension
///
/// Returns `None` if nothing usable remains.
///
/// # Examples
/// ```
/// use mailsplit_mime::filename::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("_.._etc_passwd"));
/// assert_eq!(sanitize_filename("  Q3  report.pdf ").as_deref(), Some("Q3 report.pdf"));
/// assert_eq!(sanitize_filename(" . "), None);
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> Option<String> {
    let normalized: String = name.nfc().collect();
    let replaced = UNSAFE_CHARS.replace_all(&normalized, "_");
    let collapsed = WHITESPACE_RUN.replace_all(&replaced, " ");
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c.is_whitespace());

    if trimmed.is_empty() || trimmed == "_" {
        return None;
    }

    Some(truncate_keeping_extension(trimmed, MAX_FILENAME_CHARS))
}

fn truncate_keeping_extension(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().count() < max_chars / 4 => {
            let keep = max_chars - ext.chars().count() - 1;
            let stem: String = stem.chars().take(keep).collect();
            format!("{}.{ext}", stem.trim_end())
        }
        _ => name.chars().take(max_chars).collect(),
    }
}

/// Build the suggested filename for an attachment.
///
/// Uses the declared name when there is one (adding an extension derived
/// from the MIME type if the name has none), otherwise `attachment.<ext>`.
#[must_use]
pub fn attachment_filename(declared: Option<&str>, mime_type: &str) -> String {
    let ext = extension_for_mime_type(mime_type);
    match declared.and_then(sanitize_filename) {
        Some(name) if has_extension(&name) => name,
        Some(name) => truncate_keeping_extension(&format!("{name}.{ext}"), MAX_FILENAME_CHARS),
        None => format!("{ATTACHMENT_FILE_STEM}.{ext}"),
    }
}

fn has_extension(name: &str) -> bool {
    matches!(name.rsplit_once('.'), Some((stem, ext)) if !stem.is_empty() && !ext.is_empty())
}
