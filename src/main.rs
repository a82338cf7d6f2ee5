use clap::{Parser, Subcommand};
use pellicule::cache::RenditionCache;
use pellicule::config::{self, BuildConfig};
use pellicule::sync::Synchronizer;
use pellicule::{output, scan};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "pellicule")]
#[command(version, about = "Incremental static photo gallery generator")]
#[command(long_about = "\
Incremental static photo gallery generator

Every directory holding JPEGs becomes a gallery page. Thumbnails are taken
from the cheapest embedded image that is large enough (EXIF thumbnail, MPF
preview) and cached next to the photos, so rebuilding an unchanged tree only
rewrites the pages.

Source layout:

  photos/
  ├── pellicule.toml               # Build config (optional)
  ├── .thumbnail.jpg               # Gallery thumbnail override (optional)
  ├── IMG_0001.jpg                 # Photo
  ├── IMG_0002.Sunset_at_sea.jpg   # Photo captioned \"Sunset at sea\"
  ├── clip.mp4 + clip.jpg          # Video with its poster
  ├── _drafts/                     # Ignored (leading underscore)
  └── Holidays/                    # Child gallery

Run 'pellicule gen-config' to print a documented pellicule.toml.")]
struct Cli {
    /// Config file to use instead of <INPUT>/pellicule.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by commands that build the gallery tree.
#[derive(clap::Args, Clone)]
struct TreeArgs {
    /// Source directory
    input: PathBuf,

    /// Only the input directory itself, no child galleries
    #[arg(long)]
    no_recursive: bool,

    /// Number of directory levels to include (1 = input only)
    #[arg(long)]
    max_depth: Option<u32>,

    /// Regroup media into one gallery per capture day
    #[arg(long)]
    per_date: bool,

    /// Metadata field holding comma-separated tags, e.g. ImageDescription
    #[arg(long)]
    tags_field: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the site
    Build {
        #[command(flatten)]
        tree: TreeArgs,

        /// Output directory (default: the input directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Symlink originals and renditions instead of copying
        #[arg(long)]
        symlinks: bool,

        /// Inline thumbnails into the pages as data: URIs
        #[arg(long)]
        embed: bool,

        /// Center-crop thumbnails to fill their box
        #[arg(long)]
        crop: bool,
    },
    /// Print the gallery tree without writing anything
    Scan {
        #[command(flatten)]
        tree: TreeArgs,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock pellicule.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Config values set on the command line, as a TOML overlay.
fn cli_overlay(tree: &TreeArgs, symlinks: bool, embed: bool, crop: bool) -> toml::Value {
    let mut thumbnails = toml::Table::new();
    if embed {
        thumbnails.insert("embed".into(), true.into());
    }
    if crop {
        thumbnails.insert("crop".into(), true.into());
    }

    let mut gallery = toml::Table::new();
    if tree.per_date {
        gallery.insert("per_date".into(), true.into());
    }
    if let Some(depth) = tree.max_depth {
        gallery.insert("max_depth".into(), toml::Value::Integer(depth.into()));
    }
    if let Some(field) = &tree.tags_field {
        gallery.insert("tags_field".into(), field.clone().into());
    }

    let mut out = toml::Table::new();
    if symlinks {
        out.insert("symlinks".into(), true.into());
    }

    let mut root = toml::Table::new();
    for (name, table) in [("thumbnails", thumbnails), ("gallery", gallery), ("output", out)] {
        if !table.is_empty() {
            root.insert(name.into(), toml::Value::Table(table));
        }
    }
    toml::Value::Table(root)
}

fn load_tree(
    tree: &TreeArgs,
    config: &BuildConfig,
) -> Result<scan::Gallery, Box<dyn std::error::Error>> {
    let recursive = !tree.no_recursive;
    let gallery = scan::build(&tree.input, &config.gallery, recursive, config.gallery.max_depth)?;
    Ok(if config.gallery.per_date {
        scan::group_by_date(gallery)
    } else {
        gallery
    })
}

fn run_build(
    tree: &TreeArgs,
    output_dir: &Path,
    config: &BuildConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut gallery = load_tree(tree, config)?;
    debug!(media = gallery.media_count(), "gallery tree built");

    let mut cache = RenditionCache::new();
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        let mut progress = output::ProgressFormatter::default();
        let mut stdout = std::io::stdout();
        for event in rx {
            print!("{}", progress.format(&event));
            let _ = stdout.flush();
        }
        print!("{}", progress.finish());
    });

    let mut sync = Synchronizer::new(config, &mut cache).with_progress(tx);
    let result = sync.write(
        &mut gallery,
        output_dir,
        !tree.no_recursive,
        config.gallery.max_depth,
    );
    let sync_stats = sync.stats().clone();
    // Closes the channel so the printer drains and exits
    drop(sync);
    printer
        .join()
        .map_err(|_| "progress printer panicked")?;
    result?;

    output::print_build_summary(&sync_stats, cache.stats());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Build {
            tree,
            output,
            symlinks,
            embed,
            crop,
        } => {
            let overlay = cli_overlay(tree, *symlinks, *embed, *crop);
            let config = config::load_config(&tree.input, cli.config.as_deref(), Some(overlay))?;
            let output_dir = output.clone().unwrap_or_else(|| tree.input.clone());
            println!("==> Building {} \u{2192} {}", tree.input.display(), output_dir.display());
            run_build(tree, &output_dir, &config)?;
        }
        Command::Scan { tree, json } => {
            let overlay = cli_overlay(tree, false, false, false);
            let config = config::load_config(&tree.input, cli.config.as_deref(), Some(overlay))?;
            let gallery = load_tree(tree, &config)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&gallery)?);
            } else {
                output::print_scan_tree(&gallery);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
