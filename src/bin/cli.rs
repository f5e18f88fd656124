//! trip-insights CLI - cluster and summarize a route document
//!
//! Usage:
//!   trip-insights list <routes.json>
//!   trip-insights analyze <routes.json> [--collection <name>] [--epsilon <deg>] [--min-points <n>] [--pretty]
//!   trip-insights trips <routes.json> [--collection <name>] [--pretty]
//!
//! Results are written to stdout as JSON; logs go to stderr
//! (set `RUST_LOG=debug` for per-step counts).

use clap::{Parser, Subcommand};
use log::{error, warn};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use trip_insights::{
    ClusterConfig, CollectionAnalysis, MapRegion, Result, TripEngine, TripSummary,
};

#[derive(Parser)]
#[command(name = "trip-insights")]
#[command(about = "Density clustering and trip statistics for GPS trip traces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the collections of a route document
    List {
        /// Route document (JSON object keyed by collection name)
        file: PathBuf,
    },

    /// Cluster a collection and compute its statistics
    Analyze {
        /// Route document (JSON object keyed by collection name)
        file: PathBuf,

        /// Collection to analyze (defaults to the first one)
        #[arg(short, long)]
        collection: Option<String>,

        /// Density neighborhood radius in degrees
        #[arg(long, default_value = "0.0005")]
        epsilon: f64,

        /// Neighborhood size that makes a core point
        #[arg(long, default_value = "8")]
        min_points: usize,
    },

    /// Summarize each trip of a collection
    Trips {
        /// Route document (JSON object keyed by collection name)
        file: PathBuf,

        /// Collection to summarize (defaults to the first one)
        #[arg(short, long)]
        collection: Option<String>,
    },
}

#[derive(Serialize)]
struct CollectionInfo<'a> {
    name: &'a str,
    trips: usize,
    coordinates: usize,
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    #[serde(flatten)]
    analysis: &'a CollectionAnalysis,
    region: Option<MapRegion>,
    /// Hour labels for the waypoint clusters, index-aligned
    entry_hours: Vec<String>,
}

#[derive(Serialize)]
struct TripsOutput<'a> {
    collection: &'a str,
    trips: Vec<TripRow>,
}

#[derive(Serialize)]
struct TripRow {
    #[serde(flatten)]
    summary: TripSummary,
    duration: String,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List { file } => {
            let engine = load_engine(&file, None)?;
            let infos: Vec<CollectionInfo> = engine
                .document()
                .collections
                .iter()
                .map(|c| CollectionInfo {
                    name: &c.name,
                    trips: c.trips.len(),
                    coordinates: c.coordinate_count(),
                })
                .collect();
            print_json(&infos, cli.pretty)
        }
        Commands::Analyze {
            file,
            collection,
            epsilon,
            min_points,
        } => {
            let mut engine = load_engine(&file, collection.as_deref())?;
            engine.set_config(ClusterConfig {
                epsilon_degrees: epsilon,
                min_points,
                ..Default::default()
            })?;

            let analysis = engine.analysis()?;
            let output = AnalyzeOutput {
                analysis: &analysis,
                region: engine.map_region()?,
                entry_hours: analysis
                    .attributions
                    .all
                    .iter()
                    .map(|a| a.most_likely_hour.label())
                    .collect(),
            };
            print_json(&output, cli.pretty)
        }
        Commands::Trips { file, collection } => {
            let engine = load_engine(&file, collection.as_deref())?;
            let trips = engine
                .trip_summaries()?
                .into_iter()
                .map(|summary| TripRow {
                    duration: summary.duration_label(),
                    summary,
                })
                .collect();
            let output = TripsOutput {
                collection: engine.active_collection()?.name.as_str(),
                trips,
            };
            print_json(&output, cli.pretty)
        }
    }
}

/// Load a route document and select a collection.
fn load_engine(file: &PathBuf, collection: Option<&str>) -> Result<TripEngine> {
    let mut engine = TripEngine::new();
    let report = engine.load_path(file)?;
    if !report.is_clean() {
        warn!(
            "Skipped {} coordinates, {} trips, {} collections and kept {} untimed coordinates while loading {}",
            report.skipped_coordinates,
            report.skipped_trips,
            report.skipped_collections,
            report.untimed_coordinates,
            file.display()
        );
    }
    if let Some(name) = collection {
        engine.select(name)?;
    }
    Ok(engine)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
