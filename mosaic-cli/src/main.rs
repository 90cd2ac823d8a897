use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

mod commands;

/// Tile mosaic catalog CLI tool
#[derive(Parser)]
#[command(name = "mosaic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing the tiles
    #[arg(short, long, env = "MOSAIC_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Maximum elevation tiles in cache
    #[arg(
        short,
        long,
        env = "MOSAIC_CACHE_SIZE",
        default_value = "100",
        global = true
    )]
    cache_size: u64,

    /// Catalog file (defaults to <data-dir>/mosaic.json)
    #[arg(long, env = "MOSAIC_INDEX", global = true)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the data directory and write the catalog
    Index {
        /// Store frame paths relative to the data directory
        #[arg(
            long,
            env = "MOSAIC_RELATIVE_PATHS",
            default_value_t = true,
            action = clap::ArgAction::Set,
            value_parser = clap::builder::BoolishValueParser::new()
        )]
        relative_paths: bool,

        /// Print each skipped file
        #[arg(short, long)]
        verbose: bool,
    },

    /// Query frames from the catalog
    Query {
        /// Region as min_lat,min_lon,max_lat,max_lon
        #[arg(long, value_delimiter = ',', num_args = 4)]
        bbox: Option<Vec<f64>>,

        /// Finest resolution to include, in metres
        #[arg(long)]
        min_resolution: Option<f64>,

        /// Coarsest resolution to include, in metres
        #[arg(long)]
        max_resolution: Option<f64>,

        /// Only frames from this source (repeatable)
        #[arg(short, long)]
        source: Vec<String>,

        /// Result order
        #[arg(long, value_enum, default_value = "natural")]
        order: commands::query::Order,

        /// Print paths resolved against the data directory
        #[arg(short, long)]
        resolve: bool,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the sources and coverage of the catalog
    List,

    /// Decode a base-34 number or an RPF frame file name
    FrameId {
        /// Base-34 digits or a frame file name (e.g. X340S0A1.ON2)
        value: String,

        /// Frame name uses the six-character CIB numbering
        #[arg(long)]
        cib: bool,
    },

    /// Query elevation for a single coordinate
    Elevation {
        /// Latitude in decimal degrees
        #[arg(long)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long)]
        lon: f64,

        /// Use bilinear interpolation for sub-pixel accuracy
        #[arg(short, long)]
        interpolate: bool,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mosaic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = commands::Settings {
        data_dir: cli.data_dir,
        cache_size: cli.cache_size,
        index: cli.index,
    };

    match cli.command {
        Commands::Index {
            relative_paths,
            verbose,
        } => commands::index::run(settings, relative_paths, verbose),
        Commands::Query {
            bbox,
            min_resolution,
            max_resolution,
            source,
            order,
            resolve,
            json,
        } => commands::query::run(
            settings,
            commands::query::Filters {
                bbox,
                min_resolution,
                max_resolution,
                sources: source,
                order,
            },
            resolve,
            json,
        ),
        Commands::List => commands::list::run(settings),
        Commands::FrameId { value, cib } => commands::frame_id::run(&value, cib),
        Commands::Elevation {
            lat,
            lon,
            interpolate,
            json,
        } => commands::elevation::run(settings, lat, lon, interpolate, json),
    }
}
