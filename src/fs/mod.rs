// src/fs/mod.rs
//! Filesystem module - asset type detection.

pub mod detection;

pub use detection::{detect_file_type, FileCategory, FileType};
