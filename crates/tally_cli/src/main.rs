//! Tally CLI
//!
//! Run counting-label scenes in the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tally_animation::{Easing, DEFAULT_EASING_RATE};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod runner;
mod terminal;

use config::{SceneFile, SCENE_FILE};
use runner::RunOptions;

#[derive(Parser)]
#[command(name = "tally")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Counting label animations in the terminal", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in demo labels
    Demo {
        /// Print final values only, without colors or redraws
        #[arg(long)]
        plain: bool,

        /// Ticks per second
        #[arg(short, long)]
        tick_rate: Option<u32>,
    },

    /// Run a scene file
    Run {
        /// Scene file
        #[arg(default_value = SCENE_FILE)]
        scene: PathBuf,

        /// Print final values only, without colors or redraws
        #[arg(long)]
        plain: bool,

        /// Ticks per second
        #[arg(short, long)]
        tick_rate: Option<u32>,
    },

    /// Print sampled values of an easing curve
    Curve {
        /// linear, ease-in, ease-out or ease-in-out
        easing: Easing,

        /// Curve exponent
        #[arg(short, long, default_value_t = DEFAULT_EASING_RATE)]
        rate: f64,

        /// Number of intervals to sample
        #[arg(short, long, default_value = "10")]
        samples: u32,
    },

    /// Write the demo scene to a file
    Init {
        /// Output path
        #[arg(default_value = SCENE_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Demo { plain, tick_rate } => run(&SceneFile::demo(), plain, tick_rate),
        Commands::Run {
            scene,
            plain,
            tick_rate,
        } => {
            let scene = SceneFile::load(&scene)?;
            run(&scene, plain, tick_rate)
        }
        Commands::Curve {
            easing,
            rate,
            samples,
        } => print_curve(easing, rate, samples),
        Commands::Init { path, force } => init_scene(&path, force),
    }
}

fn run(scene: &SceneFile, plain: bool, tick_rate: Option<u32>) -> Result<()> {
    let stdout = io::stdout();
    let ansi = !plain && stdout.is_terminal();
    if !plain && !ansi {
        warn!("stdout is not a terminal, printing final values only");
    }

    let options = RunOptions { ansi, tick_rate };
    runner::run_scene(scene, &options, &mut stdout.lock())
}

fn print_curve(easing: Easing, rate: f64, samples: u32) -> Result<()> {
    if samples == 0 {
        anyhow::bail!("--samples must be at least 1");
    }

    let mut out = io::stdout().lock();
    writeln!(out, "{} (rate {})", easing, rate)?;
    for i in 0..=samples {
        let t = f64::from(i) / f64::from(samples);
        let value = easing.apply(t, rate);
        let bar = "#".repeat((value.clamp(0.0, 1.0) * 40.0).round() as usize);
        writeln!(out, "{:>5.2}  {:>8.4}  {}", t, value, bar)?;
    }
    Ok(())
}

fn init_scene(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let content = SceneFile::demo().to_toml()?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote {}", path.display());
    Ok(())
}
