//! Rendition cache for incremental builds.
//!
//! Decoding a full-size camera JPEG is the bottleneck of a build. This module
//! keeps every generated rendition next to its source, so an unchanged photo
//! costs one `stat` per rendition on the next run.
//!
//! # Design
//!
//! ## Cache paths
//!
//! A rendition of `dir/photo.jpg` lives at
//!
//! ```text
//! dir/.cache/w=<width>,h=<height>[,c],photo.jpg
//! ```
//!
//! where `,c` marks a crop-to-fill request. The name is the whole cache key:
//! two requests share a file only if width, height and crop all match. The
//! same relative name is used in the generated site, so the output mirrors
//! the source cache.
//!
//! ## Invalidation
//!
//! A cache file is **fresh** iff it exists and its mtime is not older than
//! the source's mtime. Nothing else is compared: touching a source forces
//! regeneration, and restoring an old source over a newer cache does not.
//!
//! ## Writes
//!
//! New renditions are written to a temporary sibling and renamed into place,
//! so an interrupted build never leaves a truncated file that looks fresh.
//! The `.cache` directory is tagged with a standard `CACHEDIR.TAG` so backup
//! tools skip it.
//!
//! When the source directory is read-only the rendition is still produced in
//! memory; [`RenditionCache::materialize`] hands it to the synchronizer as
//! bytes instead of a path.

use crate::imaging::{
    BackendError, ImageBackend, Quality, RenditionRequest, RustBackend, render_rendition,
    select_source,
};
use crate::media::MediaItem;
use crate::types::FileSource;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Name of the cache directory inside each source directory.
pub const CACHE_DIR: &str = ".cache";

const CACHEDIR_TAG: &str = "Signature: 8a477f597d28d172789f06886806bc55\n\
# This file is a cache directory tag created by pellicule.\n\
# For information about cache directory tags, see https://bford.info/cachedir/\n";

#[derive(Error, Debug)]
pub enum RenditionError {
    #[error("{0} has no still image to render")]
    NoSource(PathBuf),
    #[error("Cannot read {path}: {source}")]
    ReadSource { path: PathBuf, source: io::Error },
    #[error("Cannot render {path}: {source}")]
    Image { path: PathBuf, source: BackendError },
    #[error("Cannot write cache file {path}: {source}")]
    WriteCache { path: PathBuf, source: io::Error },
    #[error("Cannot read cache file {path}: {source}")]
    ReadCache { path: PathBuf, source: io::Error },
}

/// Cache file name for `file_name` at `request`: `w=…,h=…[,c],file_name`.
pub fn cache_file_name(file_name: &str, request: RenditionRequest) -> String {
    format!("{},{}", request.cache_key(), file_name)
}

/// Relative path of a rendition inside a gallery: `.cache/w=…,h=…[,c],name`.
///
/// Pages reference it through [`crate::types::url_path`].
pub fn cache_url(file_name: &str, request: RenditionRequest) -> String {
    format!("{}/{}", CACHE_DIR, cache_file_name(file_name, request))
}

/// Absolute cache path of a rendition of `source`.
pub fn cache_path(source: &Path, request: RenditionRequest) -> PathBuf {
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(CACHE_DIR).join(cache_file_name(&name, request))
}

/// Whether `cache` exists and is at least as new as `source`.
///
/// A source whose mtime cannot be read is treated as changed.
pub fn is_fresh(cache: &Path, source: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(cache), modified(source)) {
        (Some(cache_mtime), Some(source_mtime)) => cache_mtime >= source_mtime,
        _ => false,
    }
}

/// Create `dir/.cache` with its `CACHEDIR.TAG` if missing.
pub fn ensure_cache_dir(dir: &Path) -> io::Result<PathBuf> {
    let cache_dir = dir.join(CACHE_DIR);
    fs::create_dir_all(&cache_dir)?;
    let tag = cache_dir.join("CACHEDIR.TAG");
    if !tag.exists() {
        fs::write(&tag, CACHEDIR_TAG)?;
    }
    Ok(cache_dir)
}

/// Write `bytes` to `path` through a temporary sibling and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp{}", file_name, std::process::id()));
    let result = fs::File::create(&tmp)
        .and_then(|mut file| file.write_all(bytes).and_then(|_| file.sync_all()))
        .and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub generated: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn generate(&mut self) {
        self.generated += 1;
    }

    pub fn fail(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.generated + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.generated,
                self.total()
            )?;
        } else {
            write!(f, "{} generated", self.generated)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

/// Outcome of bringing one cache entry up to date.
enum Ensured {
    Fresh(PathBuf),
    Written(PathBuf, Vec<u8>),
    Unwritable(PathBuf, Vec<u8>, io::Error),
}

/// Produces renditions of media items, reusing fresh cache files.
pub struct RenditionCache<B: ImageBackend = RustBackend> {
    backend: B,
    quality: Quality,
    stats: CacheStats,
}

impl RenditionCache<RustBackend> {
    pub fn new() -> Self {
        Self::with_backend(RustBackend::new())
    }
}

impl Default for RenditionCache<RustBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ImageBackend> RenditionCache<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            quality: Quality::default(),
            stats: CacheStats::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Return the rendition's bytes, regenerating the cache file if stale.
    ///
    /// If the cache file cannot be written the bytes are still returned.
    pub fn ensure_rendition(
        &mut self,
        media: &mut MediaItem,
        request: RenditionRequest,
    ) -> Result<Vec<u8>, RenditionError> {
        match self.ensure(media, request)? {
            Ensured::Fresh(path) => {
                fs::read(&path).map_err(|source| RenditionError::ReadCache { path, source })
            }
            Ensured::Written(_, bytes) => Ok(bytes),
            Ensured::Unwritable(path, bytes, e) => {
                warn!(?path, error = %e, "rendition not cached");
                Ok(bytes)
            }
        }
    }

    /// Return the path of an up-to-date cache file for the rendition.
    pub fn ensure_rendition_path(
        &mut self,
        media: &mut MediaItem,
        request: RenditionRequest,
    ) -> Result<PathBuf, RenditionError> {
        match self.ensure(media, request)? {
            Ensured::Fresh(path) | Ensured::Written(path, _) => Ok(path),
            Ensured::Unwritable(path, _, source) => {
                Err(RenditionError::WriteCache { path, source })
            }
        }
    }

    /// The rendition as something the synchronizer can write: the cache
    /// file when it exists, otherwise the bytes produced in memory.
    pub fn materialize(
        &mut self,
        media: &mut MediaItem,
        request: RenditionRequest,
    ) -> Result<FileSource, RenditionError> {
        match self.ensure(media, request)? {
            Ensured::Fresh(path) | Ensured::Written(path, _) => Ok(FileSource::Copy(path)),
            Ensured::Unwritable(path, bytes, e) => {
                warn!(?path, error = %e, "source directory not writable, rendering in memory");
                Ok(FileSource::Bytes(bytes))
            }
        }
    }

    /// Produce the rendition in memory without touching the cache.
    pub fn render(
        &mut self,
        media: &mut MediaItem,
        request: RenditionRequest,
    ) -> Result<Vec<u8>, RenditionError> {
        let source = media
            .rendition_source()
            .ok_or_else(|| RenditionError::NoSource(media.original_path().to_path_buf()))?
            .to_path_buf();

        let result = self.render_source(media, &source, request);
        match &result {
            Ok(_) => self.stats.generate(),
            Err(_) => self.stats.fail(),
        }
        result
    }

    fn render_source(
        &self,
        media: &mut MediaItem,
        source: &Path,
        request: RenditionRequest,
    ) -> Result<Vec<u8>, RenditionError> {
        let original = fs::read(source).map_err(|e| RenditionError::ReadSource {
            path: source.to_path_buf(),
            source: e,
        })?;
        let image_err = |e: BackendError| RenditionError::Image {
            path: source.to_path_buf(),
            source: e,
        };

        let meta = media.metadata_from_bytes(&original);
        let selected = select_source(
            &self.backend,
            &original,
            meta,
            (request.width, request.height),
        )
        .map_err(image_err)?;
        debug!(path = ?source, %request, kind = ?selected.kind, "rendering");
        render_rendition(&self.backend, &selected, request, self.quality).map_err(image_err)
    }

    fn ensure(
        &mut self,
        media: &mut MediaItem,
        request: RenditionRequest,
    ) -> Result<Ensured, RenditionError> {
        let source = media
            .rendition_source()
            .ok_or_else(|| RenditionError::NoSource(media.original_path().to_path_buf()))?
            .to_path_buf();
        let path = cache_path(&source, request);

        if is_fresh(&path, &source) {
            trace!(?path, "cache hit");
            self.stats.hit();
            return Ok(Ensured::Fresh(path));
        }

        let bytes = self.render(media, request)?;
        let dir = source.parent().unwrap_or_else(|| Path::new(""));
        match ensure_cache_dir(dir).and_then(|_| write_atomic(&path, &bytes)) {
            Ok(()) => Ok(Ensured::Written(path, bytes)),
            Err(e) => Ok(Ensured::Unwritable(path, bytes, e)),
        }
    }
}
