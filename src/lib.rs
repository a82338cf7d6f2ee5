//! # Pellicule
//!
//! An incremental static photo gallery generator. Point it at a directory of
//! JPEGs (and MP4s) and it writes a browsable site: one page per directory,
//! thumbnails, optional full-size renditions, and the originals.
//!
//! # Architecture
//!
//! Data flows one way through a single build:
//!
//! ```text
//! scan      photos/  →  Gallery tree          (directories → galleries, files → media)
//! cache     media    →  .cache/w=…,h=…,name   (cheapest source → rendition)
//! sync      tree     →  site/                 (index.html + changed files only)
//! ```
//!
//! Nothing is persisted between runs except the files themselves. An
//! unchanged photo costs one `stat` per rendition and one per output file.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Builds the gallery tree; reads back titles from earlier builds; per-date grouping |
//! | [`media`] | One photo or video: title, classes, lazily loaded metadata |
//! | [`metadata`] | EXIF orientation, capture date, embedded thumbnail, MPF preview size, tags |
//! | [`imaging`] | MPF parsing, source selection, orientation, resampling, JPEG encoding |
//! | [`cache`] | Rendition cache next to each source, invalidated by mtime |
//! | [`sync`] | Writes pages and brings every referenced file up to date |
//! | [`generate`] | Renders `index.html` with Maud |
//! | [`config`] | `pellicule.toml` loading, merging with CLI flags, validation |
//! | [`naming`] | Caption convention `name.Caption_words.jpg` |
//! | [`output`] | CLI output formatting |
//! | [`types`] | Files shared between cache and sync, page URL encoding |
//!
//! # Design Decisions
//!
//! ## Cheapest Sufficient Source
//!
//! Most camera JPEGs carry two smaller copies of themselves: a ~160 px EXIF
//! thumbnail and often a ~1920 px MPF preview. A 250 px thumbnail never needs
//! the 24 MP primary image. The [`imaging`] module picks the smallest
//! embedded image that still covers the requested box and only decodes the
//! original when nothing else will do.
//!
//! ## Cache Beside the Source
//!
//! Renditions live in a `.cache` directory next to the photos, under names
//! that encode the request. Moving or copying a photo directory keeps its
//! cache, and generating the site in place reuses every file as is.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time HTML
//! macro system:
//!
//! - **Compile-time checking**: malformed HTML is a build error, not a runtime surprise.
//! - **XSS-safe by default**: all interpolation is auto-escaped.
//! - **Zero runtime files**: no template directory to ship or get out of sync.

pub mod cache;
pub mod config;
pub mod generate;
pub mod imaging;
pub mod media;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod scan;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
