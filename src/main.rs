//! # sketchc CLI Entry Point
//!
//! Parses arguments with clap and routes them to the library.
//!
//! ## Commands
//! - **Build**: `compile`
//! - **Sketch**: `new`, `board attach`
//! - **Setup**: `config init`, `completion`

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use sketchc::build::{BuildPathResolver, CompileRequest, compile_sketch};
use sketchc::config::Settings;
use sketchc::props::PropertySource;
use sketchc::sketch::{CpuMetadata, Sketch, SketchMetadata};
use sketchc::toolchain::{ArduinoCli, Fqbn};
use sketchc::ui;

#[derive(Parser)]
#[command(name = "sketchc")]
#[command(about = "Build orchestrator for Arduino sketches", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Show debug logs and stream compiler output
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Settings file (default: ./sketchc.toml, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a sketch
    Compile(CompileArgs),
    /// Create a new sketch
    New {
        /// Sketch directory; its name becomes the sketch name
        path: PathBuf,
    },
    /// Manage the board attached to a sketch
    Board {
        #[command(subcommand)]
        op: BoardOp,
    },
    /// Manage the settings file
    Config {
        #[command(subcommand)]
        op: ConfigOp,
    },
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

#[derive(Args)]
struct CompileArgs {
    /// Fully Qualified Board Name, e.g. arduino:avr:uno
    #[arg(short = 'b', long)]
    fqbn: Option<String>,
    /// Sketch directory or its primary .ino file
    sketch: PathBuf,
    /// Copy artifacts into this directory after a successful build
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Build here instead of the temporary build directory
    #[arg(long, value_name = "DIR")]
    build_path: Option<PathBuf>,
    /// Copy artifacts into <sketch>/build/<fqbn>
    #[arg(short = 'e', long)]
    export_binaries: bool,
    /// Override a build property (repeat for each property)
    #[arg(long = "build-property", value_name = "KEY=VALUE")]
    build_property: Vec<String>,
    /// Deprecated: several comma-separated properties
    #[arg(long = "build-properties", value_name = "PAIRS")]
    build_properties: Vec<String>,
    /// Extra library folders, comma-separated
    #[arg(long, value_delimiter = ',', value_name = "DIRS")]
    libraries: Vec<PathBuf>,
    /// Wipe the build directory first
    #[arg(long)]
    clean: bool,
    /// Show what would be executed without running
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum BoardOp {
    /// Record the board in the sketch's sketch.json
    Attach {
        fqbn: String,
        #[arg(default_value = ".")]
        sketch: PathBuf,
        /// Serial port the board is connected to
        #[arg(short, long)]
        port: Option<String>,
        /// Human-readable board name
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigOp {
    /// Write the effective settings to a sketchc.toml
    Init {
        /// Target directory (default: the user config dir)
        #[arg(long, value_name = "DIR")]
        dest_dir: Option<PathBuf>,
        /// Replace an existing file
        #[arg(long)]
        overwrite: bool,
    },
}

/// Both property flags in the order they appeared on the command line.
fn property_sources(matches: &ArgMatches) -> Vec<PropertySource> {
    let mut indexed = Vec::new();
    for (id, combined) in [("build_property", false), ("build_properties", true)] {
        let (Some(values), Some(indices)) =
            (matches.get_many::<String>(id), matches.indices_of(id))
        else {
            continue;
        };
        for (value, index) in values.zip(indices) {
            let source = if combined {
                PropertySource::Combined(value.clone())
            } else {
                PropertySource::Single(value.clone())
            };
            indexed.push((index, source));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, source)| source).collect()
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sketchc=debug" } else { "sketchc=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli, &matches) {
        eprintln!("{} {:#}", "x".red(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, matches: &ArgMatches) -> Result<()> {
    match &cli.command {
        Commands::Compile(args) => {
            let properties = matches
                .subcommand_matches("compile")
                .map(property_sources)
                .unwrap_or_default();
            let settings = Settings::load(cli.config_file.as_deref())?;
            compile(args, properties, &settings, cli.verbose)
        }
        Commands::New { path } => {
            let sketch = Sketch::create(path)?;
            println!("Sketch created in: {}", sketch.root().display());
            Ok(())
        }
        Commands::Board {
            op:
                BoardOp::Attach {
                    fqbn,
                    sketch,
                    port,
                    name,
                },
        } => {
            let fqbn = Fqbn::parse(fqbn)?;
            let mut sketch = Sketch::load(sketch)?;
            sketch.save_metadata(SketchMetadata {
                cpu: Some(CpuMetadata {
                    fqbn: fqbn.to_string(),
                    name: name.clone(),
                    port: port.clone(),
                }),
            })?;
            println!(
                "{} Board {} attached to {}",
                "✓".green(),
                fqbn.to_string().cyan(),
                sketch.name()
            );
            Ok(())
        }
        Commands::Config {
            op: ConfigOp::Init {
                dest_dir,
                overwrite,
            },
        } => {
            let settings = Settings::load(cli.config_file.as_deref())?;
            let dir = match dest_dir {
                Some(dir) => dir.clone(),
                None => dirs::config_dir()
                    .map(|d| d.join("sketchc"))
                    .context("Cannot determine the user config directory, pass --dest-dir")?,
            };
            let path = settings.write_to(&dir, *overwrite)?;
            println!("Config file written to: {}", path.display());
            Ok(())
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn compile(
    args: &CompileArgs,
    properties: Vec<PropertySource>,
    settings: &Settings,
    verbose: bool,
) -> Result<()> {
    let start = Instant::now();
    let request = CompileRequest {
        sketch_path: args.sketch.clone(),
        fqbn: args.fqbn.clone(),
        properties,
        build_path: args.build_path.clone(),
        output_dir: args.output_dir.clone(),
        export_binaries: args.export_binaries,
        always_export: settings.sketch.always_export_binaries,
        libraries: args.libraries.clone(),
        clean: args.clean,
        dry_run: args.dry_run,
        verbose,
    };

    let cli = ArduinoCli::new(&settings.compiler.cli_path);
    let resolver = BuildPathResolver::new()?;
    let outcome = compile_sketch(&request, &resolver, &cli, &cli)?;

    println!("{} Sketch: {}", "→".dimmed(), outcome.sketch.root().display());
    println!("{} Board: {}", "→".dimmed(), outcome.fqbn.to_string().cyan());
    if verbose {
        println!(
            "{} Build path: {}",
            "→".dimmed(),
            outcome.paths.primary_dir().display()
        );
        for property in outcome.properties.iter() {
            println!("{} Property: {}", "→".dimmed(), property.to_arg());
        }
    }

    if args.dry_run {
        println!();
        println!("{} {}", "DRY RUN".yellow().bold(), "(nothing was compiled)".dimmed());
        println!("   Would execute: {}", outcome.command.join(" "));
        return Ok(());
    }

    println!();
    println!(
        "{} Build successful! ({:.2}s)",
        "✓".green(),
        start.elapsed().as_secs_f64()
    );
    if let Some(artifacts) = &outcome.artifacts {
        let table = ui::artifact_table(artifacts, outcome.paths.export_dir());
        if !table.is_empty() {
            table.print();
        }
    }
    Ok(())
}
