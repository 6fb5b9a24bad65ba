use clap::{ArgGroup, Parser};
use log::{info, warn};
use std::path::PathBuf;

mod compose;
mod dendrogram;
mod error;
mod figure;
mod linkage;
mod manifest;
mod matrix;
mod render;

use compose::ClusteredHeatmapComposer;
use dendrogram::LinkageDendrogram;
use error::Result;
use linkage::Method;
use manifest::{Format, Manifest};
use matrix::DataMatrix;

#[derive(Parser)]
#[command(name = "dendromap")]
#[command(about = "Render a matrix as a clustered heatmap with row and column dendrograms.", long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["matrix", "manifest"])))]
struct Args {
    // Input Options
    /// Load the matrix from this FILE.
    #[arg(short = 'i', long = "matrix", value_name = "FILE")]
    matrix: Option<PathBuf>,

    /// Resolve the matrix through this manifest FILE of id,path rows.
    #[arg(short = 'm', long = "manifest", value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Identifier to look up in the manifest.
    #[arg(
        short = 'k',
        long = "key",
        value_name = "ID",
        requires = "manifest",
        required_unless_present_any = ["matrix", "list"]
    )]
    key: Option<String>,

    /// Print the manifest entries and exit.
    #[arg(long = "list", requires = "manifest")]
    list: bool,

    /// Delimited format of the manifest and matrix files (csv or tsv).
    #[arg(short = 'f', long = "format", value_name = "FORMAT", default_value = "csv")]
    format: String,

    // Output Options
    /// Write the figure to this FILE (SVG, PNG, HTML or JSON based on extension).
    #[arg(short = 'o', long = "out", value_name = "FILE", required_unless_present = "list")]
    out: Option<PathBuf>,

    /// Figure title (defaults to the matrix file name).
    #[arg(short = 'T', long = "title", value_name = "STRING")]
    title: Option<String>,

    /// Set the width in pixels of the figure.
    #[arg(short = 'x', long = "width", value_name = "N", default_value_t = compose::DEFAULT_SIZE)]
    width: u32,

    /// Set the height in pixels of the figure.
    #[arg(short = 'y', long = "height", value_name = "N", default_value_t = compose::DEFAULT_SIZE)]
    height: u32,

    // Clustering Options
    /// Linkage used to merge clusters (single, complete or average).
    #[arg(short = 'L', long = "linkage", value_name = "METHOD", default_value = "complete")]
    linkage: Method,

    /// Colour dendrogram subtrees joined below this height (default: 70% of the tallest merge).
    #[arg(long = "color-threshold", value_name = "F")]
    color_threshold: Option<f64>,

    // Threading
    /// Number of threads to use for parallel operations.
    #[arg(short = 't', long = "threads", value_name = "N")]
    threads: Option<usize>,

    // Logging
    /// Verbosity level (0 = error, 1 = info, 2 = debug).
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 1)]
    verbose: u8,
}

fn run(args: &Args) -> Result<()> {
    // Validated before any file is opened.
    let format: Format = args.format.parse()?;

    let matrix_path = match (&args.matrix, &args.manifest) {
        (Some(path), _) => path.clone(),
        (None, Some(manifest_path)) => {
            info!("Loading manifest {:?}...", manifest_path);
            let manifest = Manifest::open(manifest_path, &args.format)?;
            info!("Manifest has {} entries", manifest.len());
            if args.list {
                println!("id\tpath");
                for (id, path) in manifest.entries() {
                    println!("{}\t{}", id, path);
                }
                return Ok(());
            }
            if manifest.is_empty() {
                warn!("Manifest {:?} has no entries", manifest_path);
            }
            // clap guarantees a key when neither --matrix nor --list is given.
            let key = args.key.as_deref().unwrap_or_default();
            let resolved = manifest.resolve(key)?;
            info!("Resolved '{}' to {:?}", key, resolved);
            resolved
        }
        (None, None) => unreachable!("clap requires --matrix or --manifest"),
    };

    info!("Loading matrix {:?}...", matrix_path);
    let matrix = DataMatrix::load(&matrix_path, format)?;
    info!("Matrix is {}x{}", matrix.rows(), matrix.cols());

    let title = args.title.clone().unwrap_or_else(|| {
        matrix_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let generator = LinkageDendrogram {
        method: args.linkage,
        color_threshold: args.color_threshold,
    };
    let composer = ClusteredHeatmapComposer::new(generator).with_size(args.width, args.height);
    let figure = composer.compose(&matrix, &title)?;

    if let Some(out) = &args.out {
        render::show(&figure, out)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if let Some(threads) = args.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            warn!("Could not configure {} threads: {}", threads, e);
        }
    }

    info!("Starting visualization...");

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    info!("Done.");
}
