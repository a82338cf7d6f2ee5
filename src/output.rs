//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Scan
//!
//! Galleries lead with a positional index and title; media items follow
//! indented under their gallery, with the source directory as a context line.
//!
//! ```text
//! 001 photos (2 media)
//!     Source: /home/me/photos
//!     001 (IMG_0001.jpg)
//!     002 Sunset at sea
//!         Source: IMG_0002.Sunset_at_sea.jpg
//!         Tags: sea, sun
//!     001 Holidays (1 media)
//!         Source: /home/me/photos/Holidays
//!         001 (clip.mp4) [video]
//! ```
//!
//! ## Build
//!
//! One line per gallery, then one symbol per file:
//!
//! ```text
//! photos (2 media) ..==.
//! Holidays (1 media) ==!
//! ```
//!
//! | Symbol | Meaning |
//! |---|---|
//! | `.` | file written |
//! | `=` | file unchanged |
//! | `!` | rendition or file failed (details in the log) |
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::CacheStats;
use crate::media::MediaItem;
use crate::scan::Gallery;
use crate::sync::{ProgressEvent, SyncStats};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format a gallery header: positional index, title and media count.
///
/// ```text
/// 001 Holidays (5 media)
/// ```
fn gallery_header(index: usize, title: &str, count: usize) -> String {
    format!("{} {} ({} media)", format_index(index), title, count)
}

/// Format a media line: titled items show their title, untitled ones the
/// file name in parens.
///
/// ```text
/// 001 The Sunset        // titled
/// 001 (IMG_0001.jpg)    // untitled, the file name IS the identity
/// ```
fn media_line(index: usize, item: &MediaItem) -> String {
    let file_name = item.file_name();
    let title = item.title();
    let base = if title != file_name {
        format!("{} {}", format_index(index), title)
    } else {
        format!("{} ({})", format_index(index), file_name)
    };
    if item.is_video() {
        format!("{} [video]", base)
    } else {
        base
    }
}

// ============================================================================
// Scan output
// ============================================================================

fn format_gallery(gallery: &Gallery, index: usize, depth: usize, lines: &mut Vec<String>) {
    let base = indent(depth);
    lines.push(format!(
        "{}{}",
        base,
        gallery_header(index, &gallery.title, gallery.media.len())
    ));
    match &gallery.source_dir {
        Some(dir) => lines.push(format!("{}    Source: {}", base, dir.display())),
        None => lines.push(format!("{}    Source: (by date)", base)),
    }

    for (i, item) in gallery.media.iter().enumerate() {
        let line = media_line(i + 1, item);
        lines.push(format!("{}    {}", base, line));
        let file_name = item.file_name();
        if item.title() != file_name {
            lines.push(format!("{}        Source: {}", base, file_name));
        }
        if !item.tags.is_empty() {
            lines.push(format!("{}        Tags: {}", base, item.tags.join(", ")));
        }
    }

    for (i, child) in gallery.subgalleries.iter().enumerate() {
        format_gallery(child, i + 1, depth + 1, lines);
    }
}

/// Format the gallery tree found by a scan.
pub fn format_scan_tree(gallery: &Gallery) -> Vec<String> {
    let mut lines = Vec::new();
    format_gallery(gallery, 1, 0, &mut lines);
    lines
}

/// Print the gallery tree to stdout.
pub fn print_scan_tree(gallery: &Gallery) {
    for line in format_scan_tree(gallery) {
        println!("{}", line);
    }
}

// ============================================================================
// Build progress
// ============================================================================

/// Turns progress events into terminal text, one gallery per line.
#[derive(Debug, Default)]
pub struct ProgressFormatter {
    mid_line: bool,
}

impl ProgressFormatter {
    fn line_break(&self) -> &'static str {
        if self.mid_line { "\n" } else { "" }
    }

    /// Text to print for `event`, without a trailing newline.
    pub fn format(&mut self, event: &ProgressEvent) -> String {
        let text = match event {
            ProgressEvent::GalleryStarted {
                title, media_count, ..
            } => format!("{}{} ({} media) ", self.line_break(), title, media_count),
            ProgressEvent::FileWritten { .. } => ".".to_string(),
            ProgressEvent::FileSkipped { .. } => "=".to_string(),
            ProgressEvent::RenditionFailed { .. } | ProgressEvent::FileFailed { .. } => {
                "!".to_string()
            }
            ProgressEvent::GalleryFailed { title, error } => {
                let text = format!("{}{}: {}\n", self.line_break(), title, error);
                self.mid_line = false;
                return text;
            }
        };
        self.mid_line = true;
        text
    }

    /// Text that ends the current line, if one is open.
    pub fn finish(&mut self) -> &'static str {
        let text = self.line_break();
        self.mid_line = false;
        text
    }
}

/// Format the closing summary of a build.
pub fn format_build_summary(sync: &SyncStats, cache: &CacheStats) -> Vec<String> {
    vec![format!("Cache: {}", cache), format!("Output: {}", sync)]
}

/// Print the closing summary of a build to stdout.
pub fn print_build_summary(sync: &SyncStats, cache: &CacheStats) {
    for line in format_build_summary(sync, cache) {
        println!("{}", line);
    }
}
