//! Shared types used between the rendition cache and the synchronizer.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::path::PathBuf;

/// Bytes that cannot appear raw inside one segment of a relative URL.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode a `/`-separated relative path for use in `href`/`src`.
pub fn url_path(relative_path: &str) -> String {
    relative_path
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Where the content of an output file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Copy (or link) an existing file.
    Copy(PathBuf),
    /// Write a buffer produced in memory.
    Bytes(Vec<u8>),
}

/// One file a gallery page needs next to its `index.html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Path relative to the gallery's output directory, `/`-separated.
    pub relative_path: String,
    pub source: FileSource,
}

impl OutputFile {
    pub fn new(relative_path: impl Into<String>, source: FileSource) -> Self {
        Self {
            relative_path: relative_path.into(),
            source,
        }
    }
}
