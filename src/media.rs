//! Media items: one photo or video inside a gallery.
//!
//! A [`MediaItem`] is created by the [scan](crate::scan) and lives only for
//! one run. Its metadata slot starts empty and is filled the first time the
//! item is asked for it, either by the rendition cache (which already holds
//! the file bytes) or by date grouping.

use crate::metadata::MediaMetadata;
use crate::naming::parse_media_name;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Photo, or video with an optional poster image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    /// `poster` is the same-named JPEG next to the video, used for renditions.
    Video { poster: Option<PathBuf> },
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaItem {
    original_path: PathBuf,
    pub kind: MediaKind,
    pub tags: Vec<String>,
    /// Prepended to output file names when the item shares a gallery with
    /// another file of the same name.
    #[serde(skip_serializing_if = "String::is_empty")]
    output_prefix: String,
    #[serde(skip)]
    metadata: Option<MediaMetadata>,
}

impl MediaItem {
    pub fn photo(path: impl Into<PathBuf>) -> Self {
        Self::new(path.into(), MediaKind::Photo)
    }

    pub fn video(path: impl Into<PathBuf>, poster: Option<PathBuf>) -> Self {
        Self::new(path.into(), MediaKind::Video { poster })
    }

    fn new(original_path: PathBuf, kind: MediaKind) -> Self {
        Self {
            original_path,
            kind,
            tags: Vec::new(),
            output_prefix: String::new(),
            metadata: None,
        }
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn file_name(&self) -> String {
        self.original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name of the original in the output directory.
    pub fn output_name(&self) -> String {
        format!("{}{}", self.output_prefix, self.file_name())
    }

    /// Name renditions are stored under in the output `.cache`.
    pub fn rendition_output_name(&self) -> Option<String> {
        let name = self.rendition_source()?.file_name()?.to_string_lossy();
        Some(format!("{}{}", self.output_prefix, name))
    }

    pub fn set_output_prefix(&mut self, prefix: impl Into<String>) {
        self.output_prefix = prefix.into();
    }

    pub fn is_video(&self) -> bool {
        matches!(self.kind, MediaKind::Video { .. })
    }

    /// Caption from the file name, see [`crate::naming`].
    pub fn title(&self) -> String {
        parse_media_name(&self.file_name()).title
    }

    /// CSS classes for the item's figure: `has-title` when the file name
    /// carries a caption, then the kind.
    pub fn classes(&self) -> Vec<&'static str> {
        let mut classes = Vec::with_capacity(2);
        if parse_media_name(&self.file_name()).has_title {
            classes.push("has-title");
        }
        classes.push(if self.is_video() { "video" } else { "photo" });
        classes
    }

    /// The still image renditions are generated from.
    pub fn rendition_source(&self) -> Option<&Path> {
        match &self.kind {
            MediaKind::Photo => Some(&self.original_path),
            MediaKind::Video { poster } => poster.as_deref(),
        }
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// Metadata of the rendition source, read from disk on first access.
    ///
    /// Unreadable files and items without a still image yield empty metadata.
    pub fn metadata(&mut self) -> &MediaMetadata {
        if self.metadata.is_none() {
            let meta = match self.rendition_source().map(std::fs::read) {
                Some(Ok(bytes)) => MediaMetadata::from_bytes(&bytes),
                Some(Err(e)) => {
                    debug!(path = ?self.original_path, error = %e, "metadata unreadable");
                    MediaMetadata::default()
                }
                None => MediaMetadata::default(),
            };
            self.metadata = Some(meta);
        }
        self.metadata.get_or_insert_with(MediaMetadata::default)
    }

    /// Metadata, parsed from `bytes` of the rendition source if not yet loaded.
    pub fn metadata_from_bytes(&mut self, bytes: &[u8]) -> &MediaMetadata {
        self.metadata
            .get_or_insert_with(|| MediaMetadata::from_bytes(bytes))
    }

    /// Fill `tags` from a metadata text field. Videos without a poster stay
    /// untagged.
    pub fn load_tags(&mut self, field: &str) {
        let tags = self.metadata().tags(field);
        self.tags = tags;
    }

    /// When the media was captured: the EXIF date, else the file's mtime in
    /// local time.
    pub fn capture_date(&mut self) -> Option<NaiveDateTime> {
        if let Some(date) = self.metadata().capture_date {
            return Some(date);
        }
        let modified = std::fs::metadata(&self.original_path)
            .and_then(|m| m.modified())
            .ok()?;
        Some(DateTime::<Local>::from(modified).naive_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ExifSpec, encode_jpeg, with_exif, write_jpeg};
    use chrono::{Datelike, NaiveDate};
    use tempfile::TempDir;

    #[test]
    fn photo_title_and_classes() {
        let item = MediaItem::photo("/g/test.Title_with_spaces.jpg");
        assert_eq!(item.title(), "Title with spaces");
        assert_eq!(item.classes(), vec!["has-title", "photo"]);

        let plain = MediaItem::photo("/g/test.jpg");
        assert_eq!(plain.title(), "test.jpg");
        assert_eq!(plain.classes(), vec!["photo"]);
    }

    #[test]
    fn video_classes_and_source() {
        let item = MediaItem::video("/g/clip.mp4", Some("/g/clip.jpg".into()));
        assert_eq!(item.classes(), vec!["video"]);
        assert_eq!(item.rendition_source(), Some(Path::new("/g/clip.jpg")));

        let bare = MediaItem::video("/g/clip.mp4", None);
        assert_eq!(bare.rendition_source(), None);
    }

    #[test]
    fn output_prefix_renames_outputs_only() {
        let mut item = MediaItem::video("/g/clip.Beach.mp4", Some("/g/clip.Beach.jpg".into()));
        assert_eq!(item.output_name(), "clip.Beach.mp4");

        item.set_output_prefix("2-");
        assert_eq!(item.output_name(), "2-clip.Beach.mp4");
        assert_eq!(item.rendition_output_name().as_deref(), Some("2-clip.Beach.jpg"));
        assert_eq!(item.file_name(), "clip.Beach.mp4");
        assert_eq!(item.title(), "Beach");
    }

    #[test]
    fn metadata_is_loaded_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        let jpeg = with_exif(
            &encode_jpeg(20, 10),
            &ExifSpec {
                orientation: Some(3),
                ..Default::default()
            },
        );
        std::fs::write(&path, &jpeg).unwrap();

        let mut item = MediaItem::photo(&path);
        assert!(!item.has_metadata());
        assert_eq!(
            item.metadata().orientation,
            crate::imaging::Orientation::Rotate180
        );

        // Later changes on disk are not seen by a loaded item
        write_jpeg(&path, 20, 10);
        assert_eq!(
            item.metadata().orientation,
            crate::imaging::Orientation::Rotate180
        );
    }

    #[test]
    fn missing_file_has_empty_metadata() {
        let mut item = MediaItem::photo("/nonexistent/a.jpg");
        assert_eq!(item.metadata(), &MediaMetadata::default());
        assert_eq!(item.capture_date(), None);
    }

    #[test]
    fn tags_from_configured_field() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        let jpeg = with_exif(
            &encode_jpeg(20, 10),
            &ExifSpec {
                description: Some("tag, test".into()),
                ..Default::default()
            },
        );
        std::fs::write(&path, &jpeg).unwrap();

        let mut item = MediaItem::photo(&path);
        item.load_tags("ImageDescription");
        assert_eq!(item.tags, vec!["tag", "test"]);
    }

    #[test]
    fn capture_date_prefers_exif() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        let jpeg = with_exif(
            &encode_jpeg(20, 10),
            &ExifSpec {
                date_time: Some("2019:03:02 10:00:00".into()),
                ..Default::default()
            },
        );
        std::fs::write(&path, &jpeg).unwrap();

        let mut item = MediaItem::photo(&path);
        assert_eq!(
            item.capture_date().unwrap().date(),
            NaiveDate::from_ymd_opt(2019, 3, 2).unwrap()
        );
    }

    #[test]
    fn capture_date_falls_back_to_mtime() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        write_jpeg(&path, 20, 10);
        let mtime = filetime::FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&path, mtime).unwrap();

        let mut item = MediaItem::photo(&path);
        // 2020-09-13 UTC; local time zones keep it within a day
        let date = item.capture_date().unwrap();
        assert_eq!((date.year(), date.month()), (2020, 9));
    }
}
