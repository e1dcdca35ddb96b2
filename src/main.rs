//! `nyalang` command line.
//!
//! ```text
//! nyalang build <src> [-o out.nyx] [--name NAME]
//! nyalang run <src> [args...]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use nyalang::{CompileOptions, Unit};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nyalang", about = "NyaLang compiler", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Log compiler progress at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file into a program image
    Build {
        /// Path to the .nya source file
        src: PathBuf,
        /// Output path (defaults to the source path with a .nyx extension)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Image name used when the source has no Title
        #[arg(long)]
        name: Option<String>,
    },
    /// Compile a source file and run its entry point
    Run {
        /// Path to the .nya source file
        src: PathBuf,
        /// Arguments passed to the entry point
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load(src: &Path, options: CompileOptions) -> Result<Unit> {
    let source = std::fs::read_to_string(src).with_context(|| format!("failed to read {}", src.display()))?;
    let mut unit = Unit::with_options(options);
    unit.add_source(src.display().to_string(), source)?;
    unit.build().with_context(|| format!("failed to compile {}", src.display()))?;
    Ok(unit)
}

fn default_name(src: &Path) -> String {
    src.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| CompileOptions::default().assembly_name)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Commands::Build { src, out, name } => {
            let name = name.unwrap_or_else(|| default_name(&src));
            let unit = load(&src, CompileOptions::default().with_assembly_name(name))?;
            let out = out.unwrap_or_else(|| src.with_extension("nyx"));
            unit.save(&out).with_context(|| format!("failed to write {}", out.display()))?;
            info!(out = %out.display(), "wrote program image");
        }
        Commands::Run { src, args } => {
            let options = CompileOptions::default().with_assembly_name(default_name(&src));
            let unit = load(&src, options)?;
            if let Some(value) = unit.run(&args)? {
                println!("{value}");
            }
        }
    }
    Ok(())
}
