//! Mapping from Drive-native mime types to downloadable export formats.

pub const GOOGLE_VIDEO: &str = "application/vnd.google-apps.video";
pub const GOOGLE_AUDIO: &str = "application/vnd.google-apps.audio";

/// Drive-native types with no meaningful single-file export.
pub const BLACKLISTED_MIME_TYPES: [&str; 4] = [
    "application/vnd.google-apps.unknown",
    "application/vnd.google-apps.drive-sdk",
    "application/vnd.google-apps.map",
    "application/vnd.google-apps.folder",
];

/// Format a file is exported to.
///
/// Everything that is not recognized as video or audio is exported as a
/// PDF document, even when that does not match the source content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Video,
    Audio,
    Document,
}

impl ExportFormat {
    pub fn from_source_mime(source_mime: &str) -> Self {
        match source_mime {
            GOOGLE_VIDEO => ExportFormat::Video,
            GOOGLE_AUDIO => ExportFormat::Audio,
            _ => ExportFormat::Document,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Video => "video/mp4",
            ExportFormat::Audio => "audio/mp3",
            ExportFormat::Document => "application/pdf",
        }
    }

    /// File extension, the three-letter suffix of the export mime type.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Video => "mp4",
            ExportFormat::Audio => "mp3",
            ExportFormat::Document => "pdf",
        }
    }
}

/// Export mime type and file extension for a source mime type.
pub fn export_mime_for(source_mime: &str) -> (&'static str, &'static str) {
    let format = ExportFormat::from_source_mime(source_mime);
    (format.mime_type(), format.extension())
}

/// Whether files of this type must be skipped entirely.
pub fn is_blacklisted(mime_type: &str) -> bool {
    BLACKLISTED_MIME_TYPES.contains(&mime_type)
}
