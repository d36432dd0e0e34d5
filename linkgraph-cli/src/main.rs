//! linkgraph CLI - Rebuild the content reference graph
//!
//! Scans a search-store index of content documents, turns every parent
//! reference into a keyed edge and bulk-loads the edges into a link alias.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::*;
use config::LinkgraphConfig;
use output::OutputFormat;

/// Rebuild the content reference graph from a search store.
#[derive(Parser)]
#[command(name = "linkgraph")]
#[command(author, version)]
#[command(about = "Rebuild the content reference graph from a search store")]
#[command(
    long_about = "linkgraph scans the file index one time window at a time, canonicalizes\ncontent identifiers and upserts one keyed edge per parent reference into\nthe link alias. Re-running a window rewrites the same keys."
)]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  linkgraph plan --years 2021 --monthly       Show the partitions and queries
  linkgraph export --years 2016-2018,2020     Load four years
  linkgraph export --continue-on-error        Keep going past failed partitions
  linkgraph pairs -n 20                       Print the first 20 written links")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file (default: ./.linkgraphrc.toml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract edges partition by partition and load them into the link alias
    Export(export::ExportArgs),

    /// Print written links as `from to` lines
    Pairs(pairs::PairsArgs),

    /// Show partitions and scan requests without contacting the store
    Plan(plan::PlanArgs),
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug,hyper=info,hyper_util=info,reqwest=info"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = LinkgraphConfig::resolve(cli.config.as_deref())?;

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    match command {
        Commands::Export(args) => export::run(args, &config, format).await,
        Commands::Pairs(args) => pairs::run(args, &config, format).await,
        Commands::Plan(args) => plan::run(args, &config, format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_flags() {
        let cli = Cli::try_parse_from([
            "linkgraph",
            "export",
            "--years",
            "2016-2018,2020",
            "--monthly",
            "--digest",
            "sha256",
            "--flush-interval",
            "30",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Export(args)) => {
                assert_eq!(args.years, Some(YearList(vec![2016, 2017, 2018, 2020])));
                assert!(args.monthly);
                assert_eq!(args.digest, Some(linkgraph_core::KeyDigest::Sha256));
                assert_eq!(args.flush_interval, Some(30));
            }
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn test_bad_year_list_rejected() {
        assert!(Cli::try_parse_from(["linkgraph", "plan", "--years", "2018-2016"]).is_err());
        assert!(Cli::try_parse_from(["linkgraph", "plan", "--years", "2147483647"]).is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(Cli::try_parse_from(["linkgraph", "export", "--page-size", "0"]).is_err());
        assert!(Cli::try_parse_from(["linkgraph", "export", "--page-size", "1"]).is_ok());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["linkgraph", "-v", "-q", "plan"]).is_err());
    }
}
