//! Gallery tree building.
//!
//! Walks a source directory and produces a [`Gallery`] tree: one node per
//! directory, each owning its media items and child galleries.
//!
//! ## Directory Structure
//!
//! ```text
//! photos/                          # Root gallery
//! ├── pellicule.toml               # Build configuration (optional)
//! ├── .thumbnail.jpg               # Explicit gallery thumbnail (optional)
//! ├── IMG_0001.jpg                 # Photo
//! ├── IMG_0002.Sunset_at_sea.JPG   # Photo with a caption
//! ├── clip.mp4                     # Video...
//! ├── clip.jpg                     # ...and its poster (not listed as a photo)
//! ├── _drafts/                     # Skipped (leading underscore)
//! ├── .cache/                      # Renditions, skipped (leading dot)
//! └── Holidays/                    # Child gallery
//!     ├── index.html               # Written by a previous build
//!     └── beach.jpg
//! ```
//!
//! ## Rules
//!
//! - Photos are `jpg`/`jpeg`, videos `mp4`, extension case ignored.
//! - Names starting with `.` or `_` are skipped, files and directories alike.
//! - Entries are visited in file name order.
//! - A subdirectory becomes a child gallery only if [`is_gallery`] holds.
//!
//! ## Read-back
//!
//! A page generated by an earlier build carries [`INDEX_MARKER`] at the start
//! of its second line. Such a page is trusted as a source of the gallery's
//! title and of a hand-edited thumbnail URL, so those edits survive a rebuild.

use crate::config::GalleryConfig;
use crate::media::MediaItem;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Start of line 2 of every generated `index.html`.
pub const INDEX_MARKER: &str = "<html class=\"pellicule\"";

/// File name of an explicit gallery thumbnail.
pub const THUMBNAIL_OVERRIDE: &str = ".thumbnail.jpg";

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

/// What represents a gallery on its parent's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum GalleryThumbnail {
    /// `.thumbnail.jpg` in the gallery directory.
    Override(PathBuf),
    /// Index into the gallery's media.
    Media(usize),
    /// URL read back from a hand-edited `index.html`, used as is.
    External(String),
}

/// A directory-backed node of the gallery tree.
#[derive(Debug, Clone, Serialize)]
pub struct Gallery {
    /// `None` for galleries synthesized by [`group_by_date`].
    pub source_dir: Option<PathBuf>,
    /// Path segment under the parent's output directory.
    pub url: String,
    pub title: String,
    pub media: Vec<MediaItem>,
    pub subgalleries: Vec<Gallery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<GalleryThumbnail>,
}

impl Gallery {
    fn synthetic(name: String, media: Vec<MediaItem>) -> Self {
        let thumbnail = (!media.is_empty()).then_some(GalleryThumbnail::Media(0));
        Self {
            source_dir: None,
            url: name.clone(),
            title: name,
            media,
            subgalleries: Vec::new(),
            thumbnail,
        }
    }

    /// Media items in this gallery and all descendants.
    pub fn media_count(&self) -> usize {
        self.media.len()
            + self
                .subgalleries
                .iter()
                .map(Gallery::media_count)
                .sum::<usize>()
    }
}

/// Title and thumbnail read back from a generated `index.html`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexMetadata {
    pub title: Option<String>,
    pub thumbnail_src: Option<String>,
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

fn is_photo(path: &Path) -> bool {
    path.is_file() && has_extension(path, PHOTO_EXTENSIONS)
}

fn is_video(path: &Path) -> bool {
    path.is_file() && has_extension(path, VIDEO_EXTENSIONS)
}

fn is_skipped(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory entries in file name order, skipped names removed.
fn collect_entries(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| !is_skipped(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

/// Whether `dir` holds a generated `index.html` or at least one photo.
pub fn is_gallery(dir: &Path) -> bool {
    if read_index(dir).is_some() {
        return true;
    }
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .any(|e| is_photo(&e.path())),
        Err(_) => false,
    }
}

fn unescape_html(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let len = text[start..].find(close)?;
    Some(&text[start..start + len])
}

/// Read title and thumbnail from `dir/index.html`, if it was generated by a
/// build (marker on line 2).
pub fn read_index(dir: &Path) -> Option<IndexMetadata> {
    let content = fs::read_to_string(dir.join("index.html")).ok()?;
    let root_line = content.lines().nth(1)?;
    if !root_line.starts_with(INDEX_MARKER) {
        return None;
    }

    let title = between(&content, "<title>", "</title>")
        .map(unescape_html)
        .filter(|t| !t.is_empty());
    let thumbnail_src = between(root_line, "data-thumbnail-src=\"", "\"")
        .map(unescape_html)
        .filter(|s| !s.is_empty());

    Some(IndexMetadata {
        title,
        thumbnail_src,
    })
}

/// A read-back thumbnail is external unless a build produced it.
fn is_external_thumbnail(src: &str) -> bool {
    !src.starts_with("data:") && !src.starts_with(".cache/") && !src.contains("/.cache/")
}

/// Build the gallery tree rooted at `dir`.
///
/// `max_depth` counts levels including this one: `None` is unlimited and
/// `Some(1)` does not descend. `recursive = false` also stops at this level.
pub fn build(
    dir: &Path,
    config: &GalleryConfig,
    recursive: bool,
    max_depth: Option<u32>,
) -> Result<Gallery, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }
    let entries = collect_entries(dir)?;

    let photos: Vec<&PathBuf> = entries.iter().filter(|p| is_photo(p)).collect();
    let videos: Vec<&PathBuf> = entries.iter().filter(|p| is_video(p)).collect();

    // name.mp4 + name.jpg: the JPEG becomes the poster
    let mut posters: BTreeMap<&Path, &Path> = BTreeMap::new();
    for video in &videos {
        if let Some(poster) = photos
            .iter()
            .find(|photo| photo.file_stem() == video.file_stem())
        {
            posters.insert(video.as_path(), poster.as_path());
        }
    }

    let mut media = Vec::with_capacity(photos.len() + videos.len());
    for entry in &entries {
        if is_video(entry) {
            let poster = posters.get(entry.as_path()).map(|p| p.to_path_buf());
            media.push(MediaItem::video(entry, poster));
        } else if is_photo(entry) && !posters.values().any(|p| *p == entry.as_path()) {
            media.push(MediaItem::photo(entry));
        }
    }

    if let Some(field) = &config.tags_field {
        for item in &mut media {
            item.load_tags(field);
        }
    }

    let index = read_index(dir);
    let override_path = dir.join(THUMBNAIL_OVERRIDE);
    let external = index
        .as_ref()
        .and_then(|i| i.thumbnail_src.clone())
        .filter(|src| is_external_thumbnail(src));
    let thumbnail = if override_path.is_file() {
        Some(GalleryThumbnail::Override(override_path))
    } else if let Some(src) = external {
        Some(GalleryThumbnail::External(src))
    } else if !media.is_empty() {
        Some(GalleryThumbnail::Media(0))
    } else {
        None
    };

    let dir_name = file_name(dir);
    let title = index
        .and_then(|i| i.title)
        .unwrap_or_else(|| dir_name.clone());

    let descend = recursive && max_depth.is_none_or(|d| d > 1);
    let mut subgalleries = Vec::new();
    if descend {
        let child_depth = max_depth.map(|d| d - 1);
        for subdir in entries.iter().filter(|p| p.is_dir()) {
            if !is_gallery(subdir) {
                debug!(path = ?subdir, "not a gallery, skipping");
                continue;
            }
            subgalleries.push(build(subdir, config, recursive, child_depth)?);
        }
    }

    debug!(
        path = ?dir,
        media = media.len(),
        subgalleries = subgalleries.len(),
        "scanned gallery"
    );

    Ok(Gallery {
        source_dir: Some(dir.to_path_buf()),
        url: dir_name,
        title,
        media,
        subgalleries,
        thumbnail,
    })
}

fn output_names(item: &MediaItem) -> Vec<String> {
    let name = item.output_name();
    match item.rendition_output_name() {
        Some(still) if still != name => vec![name, still],
        _ => vec![name],
    }
}

/// Prefix items whose output files would collide with an earlier item's
/// with `2-`, `3-`, ... until they are unique.
fn disambiguate(media: &mut [MediaItem]) {
    let mut taken = HashSet::new();
    for item in media.iter_mut() {
        let mut n = 1;
        while output_names(item).iter().any(|name| taken.contains(name)) {
            n += 1;
            item.set_output_prefix(format!("{n}-"));
        }
        taken.extend(output_names(item));
    }
}

/// Regroup the root's media by capture day.
///
/// Media of the root and of its direct subgalleries are pooled and bucketed
/// by the calendar day of their capture date. Each day becomes a child
/// gallery titled and addressed `YYYY-MM-DD`, in ascending order. The root
/// keeps no media of its own. Items pooled from different directories that
/// share a file name get distinct output names.
pub fn group_by_date(mut gallery: Gallery) -> Gallery {
    let mut pool = std::mem::take(&mut gallery.media);
    for child in std::mem::take(&mut gallery.subgalleries) {
        pool.extend(child.media);
    }

    let mut buckets: BTreeMap<NaiveDate, Vec<MediaItem>> = BTreeMap::new();
    for mut item in pool {
        let date = match item.capture_date() {
            Some(date) => date.date(),
            None => {
                warn!(path = ?item.original_path(), "no capture date");
                NaiveDate::default()
            }
        };
        buckets.entry(date).or_default().push(item);
    }

    gallery.subgalleries = buckets
        .into_iter()
        .map(|(date, mut media)| {
            disambiguate(&mut media);
            Gallery::synthetic(date.format("%Y-%m-%d").to_string(), media)
        })
        .collect();
    if matches!(gallery.thumbnail, Some(GalleryThumbnail::Media(_))) {
        gallery.thumbnail = None;
    }
    gallery
}
