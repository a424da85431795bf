use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use streamcat::config::{Config, OutputFormat};

/// Audit and summarise the amazon, hulu, netflix and disney catalogs.
#[derive(Debug, Parser)]
#[command(name = "streamcat", version)]
struct Cli {
    /// Config file (defaults to ./streamcat.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the five source tables
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Export every result relation into this directory
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Also print and export the unified relation
    #[arg(long)]
    unified: bool,

    /// Keep only the N most divisive titles
    #[arg(long)]
    top: Option<usize>,

    /// Drop titles seen fewer than N times from the divisive ranking
    #[arg(long)]
    min_samples: Option<usize>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.sources.data_dir = dir.clone();
        }
        if let Some(dir) = &self.out {
            config.output.dir = Some(dir.clone());
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.unified {
            config.output.include_unified = true;
        }
        if let Some(top) = self.top {
            config.analysis.divisive.limit = Some(top);
        }
        if let Some(n) = self.min_samples {
            config.analysis.divisive.min_samples = n;
        }
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("streamcat error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let mut config = Config::load_from(cli.config.as_deref()).context("failed to load config")?;
    cli.apply(&mut config);
    config.validate().context("invalid command-line override")?;

    let report = streamcat::run(&config).context("analysis failed")?;

    for (name, df) in report.frames()? {
        println!("{name}\n{df}\n");
    }

    if let Some(dir) = &config.output.dir {
        report
            .write_to(dir, config.output.format)
            .with_context(|| format!("failed to export results to {}", dir.display()))?;
    }
    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;
    Ok(())
}

#[cfg(test)]
mod test_cli {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "streamcat",
            "--data-dir",
            "catalogs",
            "--out",
            "results",
            "--format",
            "parquet",
            "--top",
            "10",
            "--min-samples",
            "2",
            "--unified",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.sources.data_dir, PathBuf::from("catalogs"));
        assert_eq!(config.output.dir, Some(PathBuf::from("results")));
        assert_eq!(config.output.format, OutputFormat::Parquet);
        assert_eq!(config.analysis.divisive.limit, Some(10));
        assert_eq!(config.analysis.divisive.min_samples, 2);
        assert!(config.output.include_unified);
    }
}
