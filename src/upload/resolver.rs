//! Destination and filename rules for uploaded images.
//!
//! Filenames are `<original name with spaces as underscores><unix millis>.<ext>`.
//! The millisecond timestamp is the only source of uniqueness.

use chrono::Utc;

use super::ImageMime;

/// Directory, relative to the working directory, that receives every upload.
pub const IMAGES_DIR: &str = "images";

/// Extension written when the MIME type is not in the table.
pub const MISSING_EXTENSION: &str = "undefined";

/// Metadata of a file part as it arrives in the request.
#[derive(Clone, Copy, Debug)]
pub struct IncomingFile<'a> {
    pub original_name: &'a str,
    pub mime_type: &'a str,
}

impl<'a> IncomingFile<'a> {
    pub fn new(original_name: &'a str, mime_type: &'a str) -> Self {
        Self {
            original_name,
            mime_type,
        }
    }
}

pub fn resolve_destination(_file: &IncomingFile<'_>) -> &'static str {
    IMAGES_DIR
}

pub fn resolve_filename(file: &IncomingFile<'_>) -> String {
    resolve_filename_at(file, Utc::now().timestamp_millis())
}

/// Same as [`resolve_filename`] with an explicit timestamp in milliseconds.
///
/// Never fails: an unknown MIME type produces `<name><millis>.undefined`.
/// Callers that care reject those types before resolving.
pub fn resolve_filename_at(file: &IncomingFile<'_>, timestamp_millis: i64) -> String {
    let name = file.original_name.replace(' ', "_");
    let extension = ImageMime::from_mime_type(file.mime_type)
        .map(ImageMime::extension)
        .unwrap_or(MISSING_EXTENSION);
    format!("{name}{timestamp_millis}.{extension}")
}
