// src/fs/detection.rs
//! File type detection using magic numbers and extension-based fallback.

use std::{fmt, path::Path};

use infer::{Infer, MatcherType};
use mime_guess::MimeGuess;

/// High-level file categories.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum FileCategory {
    Image,
    Audio,
    Video,
    Document,
    Binary,
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileCategory::Image => "Image",
            FileCategory::Audio => "Audio",
            FileCategory::Video => "Video",
            FileCategory::Document => "Document",
            FileCategory::Binary => "Binary",
        };
        write!(f, "{}", s)
    }
}

/// Holds a detected MIME type + category.
#[derive(Debug, Clone)]
pub struct FileType {
    pub mime: String,
    pub category: FileCategory,
}

impl FileType {
    pub fn is_audio(&self) -> bool {
        self.category == FileCategory::Audio
    }
}

/// Detect MIME type & category for a given file path.
pub fn detect_file_type(path: &Path) -> std::io::Result<FileType> {
    // 1. Magic-number sniffing
    if let Some(kind) = Infer::new().get_from_path(path)? {
        let category = match kind.matcher_type() {
            MatcherType::Image => FileCategory::Image,
            MatcherType::Audio => FileCategory::Audio,
            MatcherType::Video => FileCategory::Video,
            _ => FileCategory::Binary,
        };
        return Ok(FileType {
            mime: kind.mime_type().to_string(),
            category,
        });
    }

    // 2. Extension-based lookup for headerless formats
    let mime = MimeGuess::from_path(path).first_or_octet_stream().to_string();
    Ok(FileType {
        category: category_for_mime(&mime),
        mime,
    })
}

fn category_for_mime(mime: &str) -> FileCategory {
    match mime.split('/').next().unwrap_or("application") {
        "image" => FileCategory::Image,
        "audio" => FileCategory::Audio,
        "video" => FileCategory::Video,
        "text" | "application" => FileCategory::Document,
        _ => FileCategory::Binary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mime_prefix_maps_to_category() {
        assert_eq!(category_for_mime("audio/mpeg"), FileCategory::Audio);
        assert_eq!(category_for_mime("text/plain"), FileCategory::Document);
        assert_eq!(category_for_mime("application/octet-stream"), FileCategory::Document);
        assert_eq!(category_for_mime("font/woff"), FileCategory::Binary);
    }

    #[test]
    fn text_file_is_not_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"just some words")
            .unwrap();

        let detected = detect_file_type(&path).unwrap();
        assert!(!detected.is_audio());
        assert_eq!(detected.mime, "text/plain");
    }

    #[test]
    fn extension_fallback_recognizes_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.mp3");
        std::fs::File::create(&path).unwrap().write_all(&[0u8; 16]).unwrap();

        let detected = detect_file_type(&path).unwrap();
        assert!(detected.is_audio());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(detect_file_type(&dir.path().join("nope.mp3")).is_err());
    }
}
