//! haloc - replay recorded descriptor streams through the loop closure matcher.

mod config;
mod runner;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use giztoy_haloc::{HalocConfig, Hasher, Matcher, ProjectionBasis};
use tracing_subscriber::EnvFilter;

use crate::runner::{ReplayOptions, replay};

/// Loop closure candidate retrieval via image hashing.
#[derive(Parser, Debug)]
#[command(name = "haloc")]
#[command(about = "Loop closure candidate retrieval via image hashing")]
struct Cli {
    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Feed a recorded descriptor stream through a matcher
    Replay(ReplayArgs),
    /// Generate a projection basis and write it as JSON
    Basis(BasisArgs),
}

/// Engine shape, from a config file and/or flags.
#[derive(Args, Debug)]
struct EngineArgs {
    /// Engine config file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of projection vectors
    #[arg(long)]
    num_proj: Option<usize>,

    /// Projection vector length and per-image descriptor cap
    #[arg(long)]
    max_desc: Option<usize>,

    /// Random seed (default: time-derived)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Recording file (YAML or JSON) with per-frame descriptors
    input: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Use a basis file instead of generating one
    #[arg(long)]
    basis: Option<PathBuf>,

    /// Candidates to return per frame
    #[arg(short = 'k', long, default_value_t = 3)]
    candidates: usize,

    /// Ignore the ids of this many preceding frames
    #[arg(long, default_value_t = 0)]
    ignore_recent: usize,

    /// Write the JSON report to a file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BasisArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Output file (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay(args) => run_replay(args),
        Commands::Basis(args) => run_basis(args),
    }
}

fn load_engine_config(args: &EngineArgs) -> Result<HalocConfig> {
    config::load_config(args.config.as_deref(), args.num_proj, args.max_desc, args.seed)
}

fn run_replay(args: ReplayArgs) -> Result<()> {
    let recording = config::load_recording(&args.input)?;

    let mut matcher = match &args.basis {
        Some(path) => {
            let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
            let basis = ProjectionBasis::from_json(&data)?;
            Matcher::with_basis(basis, args.engine.seed)
        }
        None => Matcher::new(&load_engine_config(&args.engine)?)?,
    };
    tracing::info!(
        frames = recording.frames.len(),
        seed = matcher.hasher().seed(),
        "replaying"
    );

    let report = replay(
        &mut matcher,
        &recording,
        &ReplayOptions {
            num_candidates: args.candidates,
            ignore_recent: args.ignore_recent,
        },
    );

    for frame in &report.frames {
        if frame.candidates.is_empty() {
            println!("{}: {}", frame.id, frame.status);
            continue;
        }
        let list: Vec<String> = frame
            .candidates
            .iter()
            .map(|c| format!("{} ({:.4})", c.id, c.similarity))
            .collect();
        println!("{}: {}", frame.id, list.join(", "));
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_vec_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn run_basis(args: BasisArgs) -> Result<()> {
    let cfg = load_engine_config(&args.engine)?;
    // Built the same way a Matcher with this config would build it.
    let mut hasher = Hasher::new(&cfg)?;
    let basis = hasher.basis()?;
    tracing::info!(
        num_proj = basis.num_proj(),
        max_desc = basis.max_desc(),
        orthogonality_error = basis.orthogonality_error(),
        "basis generated"
    );

    let json = basis.to_json()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?
        }
        None => println!("{}", String::from_utf8_lossy(&json)),
    }
    Ok(())
}
