//! Full builds through the public API: config, scan, cache and sync.

use image::{ImageEncoder, RgbImage};
use pellicule::cache::RenditionCache;
use pellicule::config;
use pellicule::scan::{self, INDEX_MARKER};
use pellicule::sync::{SyncStats, Synchronizer};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, buf).unwrap();
}

fn photos() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp.path().join("photos/IMG_0001.jpg"), 800, 600);
    write_jpeg(&tmp.path().join("photos/IMG_0002.Sunset_at_sea.jpg"), 600, 800);
    write_jpeg(&tmp.path().join("photos/Holidays/beach.jpg"), 500, 500);
    fs::create_dir_all(tmp.path().join("photos/_drafts")).unwrap();
    write_jpeg(&tmp.path().join("photos/_drafts/skip.jpg"), 100, 100);
    tmp
}

fn build_site(input: &Path, output: &Path) -> SyncStats {
    let config = config::load_config(input, None, None).unwrap();
    let mut gallery = scan::build(input, &config.gallery, true, config.gallery.max_depth).unwrap();
    let mut cache = RenditionCache::new();
    let mut sync = Synchronizer::new(&config, &mut cache);
    sync.write(&mut gallery, output, true, config.gallery.max_depth)
        .unwrap();
    sync.stats().clone()
}

// ============================================================================
// Full build
// ============================================================================

#[test]
fn builds_nested_site() {
    let tmp = photos();
    let input = tmp.path().join("photos");
    let out = tmp.path().join("site");

    let gallery = scan::build(&input, &Default::default(), true, None).unwrap();
    assert_eq!(gallery.media.len(), 2);
    assert_eq!(gallery.subgalleries.len(), 1);
    assert_eq!(gallery.subgalleries[0].title, "Holidays");

    let stats = build_site(&input, &out);
    assert_eq!(stats.galleries, 2);
    assert_eq!(stats.failed_renditions, 0);

    for dir in [out.clone(), out.join("Holidays")] {
        let page = fs::read_to_string(dir.join("index.html")).unwrap();
        assert!(page.lines().nth(1).unwrap().starts_with(INDEX_MARKER));
    }
    for thumb in [
        ".cache/w=250,h=250,IMG_0001.jpg",
        ".cache/w=250,h=250,IMG_0002.Sunset_at_sea.jpg",
        "Holidays/.cache/w=250,h=250,beach.jpg",
    ] {
        let (w, h) = image::image_dimensions(out.join(thumb)).unwrap();
        assert!(w <= 250 && h <= 250, "{thumb} is {w}x{h}");
        assert!(w == 250 || h == 250, "{thumb} is {w}x{h}");
    }
    assert!(!out.join("_drafts").exists());

    let root = fs::read_to_string(out.join("index.html")).unwrap();
    assert!(root.contains("Sunset at sea"));
    assert!(root.contains(r#"href="Holidays/""#));
}

#[test]
fn rebuild_only_rewrites_pages() {
    let tmp = photos();
    let input = tmp.path().join("photos");
    let out = tmp.path().join("site");

    let first = build_site(&input, &out);
    let second = build_site(&input, &out);

    assert_eq!(second.written, 2);
    assert_eq!(second.skipped, first.written - 2);
}

#[test]
fn config_file_changes_thumbnail_size() {
    let tmp = photos();
    let input = tmp.path().join("photos");
    let out = tmp.path().join("site");
    fs::write(
        input.join(config::CONFIG_FILE),
        "[thumbnails]\nwidth = 100\nheight = 100\n",
    )
    .unwrap();

    build_site(&input, &out);
    assert_eq!(
        image::image_dimensions(out.join(".cache/w=100,h=100,IMG_0001.jpg")).unwrap(),
        (100, 75)
    );
}

#[test]
fn generated_output_is_not_rescanned_as_media() {
    let tmp = photos();
    let input = tmp.path().join("photos");

    build_site(&input, &input);
    let gallery = scan::build(&input, &Default::default(), true, None).unwrap();

    assert_eq!(gallery.media.len(), 2);
    assert_eq!(gallery.subgalleries.len(), 1);
    assert_eq!(gallery.subgalleries[0].media.len(), 1);
}

// ============================================================================
// Gallery detection
// ============================================================================

#[test]
fn gallery_detection() {
    let tmp = TempDir::new().unwrap();
    let upper = tmp.path().join("upper");
    write_jpeg(&upper.join("a.JPG"), 10, 10);
    let empty = tmp.path().join("empty");
    fs::create_dir(&empty).unwrap();

    assert!(scan::is_gallery(&upper));
    assert!(!scan::is_gallery(&empty));
}
