//! Incremental output synchronization.
//!
//! Writes a [`Gallery`] tree to an output directory: one `index.html` per
//! gallery plus every file its page refers to. Pages are always rewritten;
//! everything else is touched only when it is out of date.
//!
//! ## Output Structure
//!
//! ```text
//! site/
//! ├── index.html
//! ├── IMG_0001.jpg                      # Original (copy or symlink)
//! ├── .cache/
//! │   ├── w=250,h=250,IMG_0001.jpg      # Thumbnail
//! │   └── w=1600,h=1200,IMG_0001.jpg    # Full-size rendition (if configured)
//! └── Holidays/
//!     └── ...
//! ```
//!
//! Rendition names mirror the source `.cache`, so generating in place
//! (output directory = input directory) finds every file already there.
//!
//! ## Update Rule
//!
//! A destination is (re)written iff
//! - it does not exist, or
//! - its source was modified after it, or
//! - symlink mode is on and the destination is not a symlink.
//!
//! In-memory renditions compare contents instead of times. A destination that
//! *is* its source (in-place generation) is never touched.
//!
//! ## Failures
//!
//! A file that cannot be read or copied is reported and skipped; the rest of
//! the gallery is still written. Only a directory or page that cannot be
//! written aborts the gallery, and then only its own subtree.

use crate::cache::{RenditionCache, cache_url};
use crate::config::BuildConfig;
use crate::generate::{ChildCard, ItemView, PageView, render_page};
use crate::imaging::{ImageBackend, RenditionRequest, RustBackend};
use crate::media::MediaItem;
use crate::scan::{Gallery, GalleryThumbnail};
use crate::types::{FileSource, OutputFile, url_path};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use filetime::FileTime;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Cannot create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Progress reported while writing, one event per gallery or file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    GalleryStarted {
        title: String,
        output_dir: PathBuf,
        media_count: usize,
    },
    FileWritten {
        path: PathBuf,
    },
    FileSkipped {
        path: PathBuf,
    },
    RenditionFailed {
        source: PathBuf,
        request: RenditionRequest,
        error: String,
    },
    /// A media file was unreadable or could not be copied; it is left out.
    FileFailed {
        path: PathBuf,
        error: String,
    },
    /// A subtree was abandoned; its siblings are still written.
    GalleryFailed {
        title: String,
        error: String,
    },
}

/// Counts for one synchronization run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub galleries: u32,
    pub written: u32,
    pub skipped: u32,
    pub failed_renditions: u32,
    pub failed_files: u32,
    pub failed_galleries: u32,
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} galleries, {} files written, {} unchanged",
            self.galleries, self.written, self.skipped
        )?;
        if self.failed_renditions > 0 {
            write!(f, ", {} renditions failed", self.failed_renditions)?;
        }
        if self.failed_files > 0 {
            write!(f, ", {} files failed", self.failed_files)?;
        }
        if self.failed_galleries > 0 {
            write!(f, ", {} galleries failed", self.failed_galleries)?;
        }
        Ok(())
    }
}

/// Whether `dest` is `source` itself rather than a copy or link of it.
fn is_same_file(source: &Path, dest: &Path) -> bool {
    let dest_is_link = fs::symlink_metadata(dest).is_ok_and(|m| m.file_type().is_symlink());
    if dest_is_link {
        return false;
    }
    match (fs::canonicalize(source), fs::canonicalize(dest)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(unix)]
fn link(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::canonicalize(source)?, dest)
}

#[cfg(not(unix))]
fn link(source: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(source, dest).map(|_| ())
}

/// Bring `dest` up to date with `source`. Returns whether it was written.
pub fn sync_file(source: &FileSource, dest: &Path, symlinks: bool) -> io::Result<bool> {
    match source {
        FileSource::Copy(src) => {
            if is_same_file(src, dest) {
                return Ok(false);
            }
            let existing = fs::symlink_metadata(dest).ok();
            let stale = match &existing {
                None => true,
                Some(meta) => {
                    let source_mtime = FileTime::from_last_modification_time(&fs::metadata(src)?);
                    (symlinks && !meta.file_type().is_symlink())
                        || source_mtime > FileTime::from_last_modification_time(meta)
                }
            };
            if !stale {
                return Ok(false);
            }
            if existing.is_some() {
                fs::remove_file(dest)?;
            }
            if symlinks {
                link(src, dest)?;
            } else {
                fs::copy(src, dest)?;
                let mtime = FileTime::from_last_modification_time(&fs::metadata(src)?);
                filetime::set_file_mtime(dest, mtime)?;
            }
            Ok(true)
        }
        FileSource::Bytes(bytes) => {
            let is_link = fs::symlink_metadata(dest).is_ok_and(|m| m.file_type().is_symlink());
            if !is_link && fs::read(dest).is_ok_and(|existing| existing == *bytes) {
                return Ok(false);
            }
            if is_link {
                fs::remove_file(dest)?;
            }
            fs::write(dest, bytes)?;
            Ok(true)
        }
    }
}

fn data_uri(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes))
}

/// A child's thumbnail URL as seen from the parent page.
fn child_relative(url: &str, src: &str) -> String {
    if src.starts_with("data:") || src.starts_with('/') || src.contains("://") {
        src.to_string()
    } else {
        format!("{}/{}", url, src)
    }
}

/// Writes gallery trees, rendering through a shared [`RenditionCache`].
pub struct Synchronizer<'a, B: ImageBackend = RustBackend> {
    config: &'a BuildConfig,
    cache: &'a mut RenditionCache<B>,
    progress: Option<Sender<ProgressEvent>>,
    stats: SyncStats,
}

impl<'a, B: ImageBackend> Synchronizer<'a, B> {
    pub fn new(config: &'a BuildConfig, cache: &'a mut RenditionCache<B>) -> Self {
        Self {
            config,
            cache,
            progress: None,
            stats: SyncStats::default(),
        }
    }

    /// Report progress on `tx`. The channel closes when the synchronizer is
    /// dropped.
    pub fn with_progress(mut self, tx: Sender<ProgressEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.progress {
            // A closed receiver only means nobody is listening
            let _ = tx.send(event);
        }
    }

    /// Write `gallery` into `output_dir`, then its children while
    /// `recursive` holds and `max_depth` allows.
    ///
    /// Returns the gallery's thumbnail URL relative to `output_dir`.
    pub fn write(
        &mut self,
        gallery: &mut Gallery,
        output_dir: &Path,
        recursive: bool,
        max_depth: Option<u32>,
    ) -> Result<Option<String>, SyncError> {
        self.write_gallery(gallery, output_dir, None, recursive, max_depth)
    }

    fn write_gallery(
        &mut self,
        gallery: &mut Gallery,
        output_dir: &Path,
        parent_title: Option<&str>,
        recursive: bool,
        max_depth: Option<u32>,
    ) -> Result<Option<String>, SyncError> {
        fs::create_dir_all(output_dir).map_err(|source| SyncError::CreateDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        self.stats.galleries += 1;
        self.emit(ProgressEvent::GalleryStarted {
            title: gallery.title.clone(),
            output_dir: output_dir.to_path_buf(),
            media_count: gallery.media.len(),
        });

        let mut files = Vec::new();
        // Positions match `gallery.media`; unreadable items are `None`
        let mut items = Vec::with_capacity(gallery.media.len());
        for item in &mut gallery.media {
            let view = match fs::metadata(item.original_path()) {
                Ok(_) => Some(self.media_item(item, &mut files)),
                Err(e) => {
                    self.file_failed(item.original_path(), &e);
                    None
                }
            };
            items.push(view);
        }

        let thumbnail_src = match &gallery.thumbnail {
            Some(GalleryThumbnail::Media(i)) => items
                .get(*i)
                .and_then(Option::as_ref)
                .and_then(|v| v.thumbnail_src.clone()),
            Some(GalleryThumbnail::Override(path)) => {
                let mut item = MediaItem::photo(path);
                self.thumbnail(&mut item, &mut files)
            }
            Some(GalleryThumbnail::External(url)) => Some(url.clone()),
            None => None,
        };

        let descend = recursive && max_depth.is_none_or(|d| d > 1);
        let child_depth = max_depth.map(|d| d.saturating_sub(1));
        let mut children = Vec::with_capacity(gallery.subgalleries.len());
        for child in &mut gallery.subgalleries {
            // Per-date galleries only exist in the output, so they are
            // written whatever the depth
            if !descend && child.source_dir.is_some() {
                continue;
            }
            let child_dir = output_dir.join(&child.url);
            let written =
                self.write_gallery(child, &child_dir, Some(&gallery.title), recursive, child_depth);
            let child_src = match written {
                Ok(src) => src,
                Err(e) => {
                    warn!(gallery = %child.title, error = %e, "gallery not written");
                    self.stats.failed_galleries += 1;
                    self.emit(ProgressEvent::GalleryFailed {
                        title: child.title.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            let url = url_path(&child.url);
            children.push(ChildCard {
                thumbnail_src: child_src.map(|src| child_relative(&url, &src)),
                url,
                title: child.title.clone(),
            });
        }

        let page = render_page(&PageView {
            title: gallery.title.clone(),
            parent_title: parent_title.map(String::from),
            thumbnail_src: thumbnail_src.clone(),
            children,
            items: items.into_iter().flatten().collect(),
        });
        let index = output_dir.join("index.html");
        fs::write(&index, page).map_err(|source| SyncError::Write {
            path: index.clone(),
            source,
        })?;
        self.stats.written += 1;
        self.emit(ProgressEvent::FileWritten { path: index });

        for file in files {
            self.write_file(output_dir, &file)?;
        }

        Ok(thumbnail_src)
    }

    fn write_file(&mut self, output_dir: &Path, file: &OutputFile) -> Result<(), SyncError> {
        let dest = output_dir.join(&file.relative_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| SyncError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        match sync_file(&file.source, &dest, self.config.output.symlinks) {
            Ok(true) => {
                debug!(path = ?dest, "written");
                self.stats.written += 1;
                self.emit(ProgressEvent::FileWritten { path: dest });
            }
            Ok(false) => {
                self.stats.skipped += 1;
                self.emit(ProgressEvent::FileSkipped { path: dest });
            }
            Err(e) => self.file_failed(&dest, &e),
        }
        Ok(())
    }

    fn file_failed(&mut self, path: &Path, error: &io::Error) {
        warn!(?path, %error, "file skipped");
        self.stats.failed_files += 1;
        self.emit(ProgressEvent::FileFailed {
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }

    fn rendition_failed(&mut self, item: &MediaItem, request: RenditionRequest, error: String) {
        warn!(path = ?item.original_path(), %request, %error, "rendition skipped");
        self.stats.failed_renditions += 1;
        self.emit(ProgressEvent::RenditionFailed {
            source: item.original_path().to_path_buf(),
            request,
            error,
        });
    }

    /// Thumbnail URL for `item`, queuing its file unless embedded.
    ///
    /// Embedded thumbnails are rendered in memory and never cached.
    fn thumbnail(&mut self, item: &mut MediaItem, files: &mut Vec<OutputFile>) -> Option<String> {
        let name = item.rendition_output_name()?;
        let request = self.config.thumbnail_request();
        if self.config.thumbnails.embed {
            return match self.cache.render(item, request) {
                Ok(bytes) => Some(data_uri(&bytes)),
                Err(e) => {
                    self.rendition_failed(item, request, e.to_string());
                    None
                }
            };
        }
        match self.cache.materialize(item, request) {
            Ok(source) => {
                let path = cache_url(&name, request);
                let url = url_path(&path);
                files.push(OutputFile::new(path, source));
                Some(url)
            }
            Err(e) => {
                self.rendition_failed(item, request, e.to_string());
                None
            }
        }
    }

    /// Page entry for `item`, queuing the original and its renditions.
    fn media_item(&mut self, item: &mut MediaItem, files: &mut Vec<OutputFile>) -> ItemView {
        let name = item.output_name();
        files.push(OutputFile::new(
            name.clone(),
            FileSource::Copy(item.original_path().to_path_buf()),
        ));

        let thumbnail_src = self.thumbnail(item, files);

        let mut href = url_path(&name);
        if let (Some(request), false) = (self.config.full_request(), item.is_video()) {
            match self.cache.materialize(item, request) {
                Ok(source) => {
                    let path = cache_url(&name, request);
                    href = url_path(&path);
                    files.push(OutputFile::new(path, source));
                }
                Err(e) => self.rendition_failed(item, request, e.to_string()),
            }
        }

        ItemView {
            href,
            thumbnail_src,
            title: item.title(),
            classes: item.classes(),
            tags: item.tags.clone(),
        }
    }
}
