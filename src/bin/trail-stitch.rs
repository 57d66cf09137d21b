//! trail-stitch - Debug tool for trail stitching
//!
//! Usage:
//!   trail-stitch <fragments.json> [--output <file>] [--tolerance-km <km>]
//!
//! The input is a JSON array of fragments:
//!   [{"id": "w1", "name": "Blue Trail", "coordinates": [[lon, lat], ...]}, ...]
//!
//! Fragments are grouped by name and stitched; one line per resulting chain
//! is printed with its length and start/end coordinates.

use clap::Parser;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use trail_stitcher::{group_by_name, Segment, StitchConfig, StitchResult, StitchStrategy, Stitcher};

#[derive(Parser)]
#[command(name = "trail-stitch")]
#[command(about = "Stitch trail fragments into continuous paths", long_about = None)]
struct Cli {
    /// JSON file containing an array of fragments
    input: PathBuf,

    /// Write stitched segments to this JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON stitch configuration (flags below override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum endpoint gap in kilometers
    #[arg(long)]
    tolerance_km: Option<f64>,

    /// Merge strategy: rescan or endpoint-index
    #[arg(long)]
    strategy: Option<StitchStrategy>,

    /// Enable verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli)?;
    let fragments = load_fragments(&cli.input)?;
    println!("Loaded {} fragments from {}", fragments.len(), cli.input.display());

    let groups = group_by_name(fragments);
    let stitcher = Stitcher::new(config);
    let results = stitcher.stitch_trails(&groups).map_err(|e| e.to_string())?;

    println!("\n{}", "=".repeat(60));
    for result in results.values() {
        print_result(result);
    }
    println!("{}", "=".repeat(60));

    let disconnected = results.values().filter(|r| !r.is_fully_connected()).count();
    println!(
        "{} trails, {} fully connected, {} with leftover fragments",
        results.len(),
        results.len() - disconnected,
        disconnected
    );

    if let Some(path) = &cli.output {
        let segments: Vec<&Segment> = results.values().flat_map(|r| r.chains()).collect();
        write_json(path, &segments)?;
        println!("Wrote {} segments to {}", segments.len(), path.display());
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<StitchConfig, String> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("reading {}: {}", path.display(), e))?;
            StitchConfig::from_json(&json).map_err(|e| e.to_string())?
        }
        None => StitchConfig::default(),
    };
    if let Some(km) = cli.tolerance_km {
        config = config.with_tolerance_km(km);
    }
    if let Some(strategy) = cli.strategy {
        config = config.with_strategy(strategy);
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn load_fragments(path: &Path) -> Result<Vec<Segment>, String> {
    let file = File::open(path).map_err(|e| format!("opening {}: {}", path.display(), e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("parsing {}: {}", path.display(), e))
}

fn write_json(path: &Path, segments: &[&Segment]) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("creating {}: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, segments).map_err(|e| e.to_string())?;
    writer.flush().map_err(|e| e.to_string())
}

fn print_result(result: &StitchResult) {
    println!(
        "{} ({} chain(s), {} merges, {:.3} km)",
        result.trail(),
        result.chains().len(),
        result.merges(),
        result.total_length_km()
    );
    for chain in result.chains() {
        let (start, end) = (chain.start(), chain.end());
        println!(
            "  {:<24} {:>5} pts {:>9.3} km  Start {:.6},{:.6}  End {:.6},{:.6}",
            chain.id,
            chain.points.len(),
            chain.length_km(),
            start.longitude,
            start.latitude,
            end.longitude,
            end.latitude
        );
    }
}
