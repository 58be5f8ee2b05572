//! Command line front end for apiweave.

use std::{io, path::PathBuf, process};

use anyhow::{Context, Result};
use clap::Parser;
use libapiweave::{Config, ExtensionRegistry, Pipeline, registry::OUTPUT_FORMATS};
use tokio::runtime::Runtime;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Command line arguments.
struct Cli {
    /// Configuration file describing the module, its platform passes and external links
    #[arg(long, short, default_value = "apiweave.json", env = "APIWEAVE_CONFIG")]
    config: PathBuf,

    /// Output format, overriding the configuration file
    #[arg(long, short)]
    format: Option<String>,

    /// Output directory, overriding the configuration file
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Do not fetch remote external link indexes
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Suppress warnings and the summary line
    #[arg(long, short, default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,

    /// Log pipeline progress
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    /// List available output formats and exit
    #[arg(long, default_value_t = false)]
    list_formats: bool,
}

/// Set up tracing. `APIWEAVE_LOG` takes precedence over the verbosity flags.
fn init_logging(cli: &Cli) {
    let default = if cli.quiet {
        "off"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("APIWEAVE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

/// Load the configuration file and apply command line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_path(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(format) = &cli.format {
        config = config.with_format(format);
    }
    if let Some(output) = &cli.output {
        config = config.with_output_dir(output);
    }
    if cli.offline {
        config = config.with_offline(true);
    }
    Ok(config)
}

/// Execute a documentation run.
fn run(cli: &Cli) -> Result<()> {
    let registry = ExtensionRegistry::install_global(ExtensionRegistry::builtin()?)?;
    debug!(plugins = ?registry.plugins(), "registry ready");

    if cli.list_formats {
        for name in registry.names(&OUTPUT_FORMATS) {
            println!("{name}");
        }
        return Ok(());
    }

    let config = load_config(cli)?;
    let pipeline = Pipeline::new(registry, config)?;
    let runtime = Runtime::new()?;
    let report = runtime.block_on(pipeline.run())?;

    // Diagnostics have already been logged as warnings.
    if !cli.quiet {
        println!(
            "{} pages written to {} ({} warnings)",
            report.pages,
            report.output_dir.display(),
            report.diagnostics.len()
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
