//! Export command - Rebuild the reference graph partition by partition
//!
//! Scans the source index one time window at a time, turns every reference
//! into a keyed edge and bulk-loads the edges into the destination alias.

use crate::commands::{parse_year_list, ConnectionArgs, YearList};
use crate::config::{Connection, LinkgraphConfig};
use crate::output::{Output, OutputFormat, TableDisplay};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use linkgraph_core::partition::plan;
use linkgraph_core::KeyDigest;
use linkgraph_store::{
    FailurePolicy, PartitionOutcome, PartitionStatus, PipelineDriver, PipelineSettings,
    SearchClient, SinkReport, StoreError, WriteFailure,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Write failures kept for the summary; the rest are only counted.
const MAX_REPORTED_FAILURES: usize = 20;

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Years to load, e.g. `2016-2018,2020`
    #[arg(long, value_parser = parse_year_list)]
    pub years: Option<YearList>,

    /// Split every year into monthly partitions
    #[arg(long)]
    pub monthly: bool,

    /// Record failed partitions and keep going instead of aborting
    #[arg(long)]
    pub continue_on_error: bool,

    /// Index scanned for documents
    #[arg(long)]
    pub source_index: Option<String>,

    /// Destination write alias
    #[arg(long)]
    pub alias: Option<String>,

    /// Documents per scan page
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub page_size: Option<u64>,

    /// Flush the write buffer at this many encoded bytes
    #[arg(long)]
    pub flush_bytes: Option<usize>,

    /// Flush the write buffer after this many seconds
    #[arg(long, value_name = "SECS")]
    pub flush_interval: Option<u64>,

    /// Digest used for edge keys (sha1, sha256)
    #[arg(long)]
    pub digest: Option<KeyDigest>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Result of an export run.
#[derive(Debug, Serialize)]
pub struct ExportReport {
    pub source_index: String,
    pub alias: String,
    pub digest: KeyDigest,
    pub partitions: Vec<PartitionOutcome>,
    pub totals: SinkReport,
    /// First write failures, in the order they happened.
    pub failures: Vec<WriteFailure>,
    pub duration_ms: u64,
}

impl ExportReport {
    pub fn failed_partitions(&self) -> usize {
        self.partitions.iter().filter(|p| p.is_failed()).count()
    }
}

impl TableDisplay for ExportReport {
    fn to_table(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "{} {} -> {} ({})",
            "Export".green().bold(),
            self.source_index.cyan(),
            self.alias.cyan(),
            self.digest
        ));
        lines.push(String::new());
        lines.push(format!(
            "  {:<10} {:>10} {:>10} {:>10} {:>10} {:>8} {:>10}",
            "Partition", "Matched", "Documents", "Attempted", "Written", "Failed", "Time"
        ));

        for outcome in &self.partitions {
            match &outcome.status {
                PartitionStatus::Completed {
                    matched,
                    documents,
                    report,
                } => {
                    let failed = if report.failed > 0 {
                        report.failed.to_string().red().to_string()
                    } else {
                        "0".to_string()
                    };
                    lines.push(format!(
                        "  {:<10} {:>10} {:>10} {:>10} {:>10} {:>8} {:>10}",
                        outcome.partition,
                        matched.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
                        documents,
                        report.attempted,
                        report.succeeded,
                        failed,
                        format_duration(report.duration_ms)
                    ));
                }
                PartitionStatus::Failed {
                    error,
                    documents,
                    report,
                } => {
                    lines.push(format!(
                        "  {:<10} {:>10} {:>10} {:>10} {:>10} {:>8} {:>10}",
                        outcome.partition,
                        "FAILED".red().bold(),
                        documents,
                        report.attempted,
                        report.succeeded,
                        report.failed,
                        format_duration(report.duration_ms)
                    ));
                    lines.push(format!("  {:<10} {}", "", error.dimmed()));
                }
            }
        }

        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push(format!("{}:", "Write failures".yellow()));
            for failure in &self.failures {
                lines.push(format!(
                    "  {} {} -> {} '{}': {}",
                    failure.key.dimmed(),
                    failure.edge.from,
                    failure.edge.to,
                    failure.edge.name,
                    failure.reason
                ));
            }
            let unlisted = self.totals.failed.saturating_sub(self.failures.len() as u64);
            if unlisted > 0 {
                lines.push(format!("  ... and {} more", unlisted));
            }
        }

        lines.push(String::new());
        lines.push(format!(
            "{}: {} attempted, {} written, {} failed, {} retried in {} batches",
            "Total".cyan(),
            self.totals.attempted,
            self.totals.succeeded,
            self.totals.failed,
            self.totals.retried,
            self.totals.batches
        ));
        lines.push(format!("({} ms)", self.duration_ms).dimmed().to_string());

        lines.join("\n")
    }
}

fn format_duration(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

/// Combine command-line flags with the configuration file.
pub fn settings(args: &ExportArgs, config: &LinkgraphConfig) -> PipelineSettings {
    let mut sink = config.sink_config();
    if let Some(alias) = &args.alias {
        sink.alias = alias.clone();
    }
    if let Some(bytes) = args.flush_bytes {
        sink.flush_bytes = bytes;
    }
    if let Some(secs) = args.flush_interval {
        sink.flush_interval = Duration::from_secs(secs);
    }

    let on_failure = if args.continue_on_error || config.run.continue_on_error {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };

    PipelineSettings {
        source_index: args
            .source_index
            .clone()
            .unwrap_or_else(|| config.source_index().to_string()),
        page_size: args
            .page_size
            .map(|n| n as usize)
            .unwrap_or_else(|| config.page_size()),
        keep_alive: config.keep_alive().to_string(),
        sink,
        digest: args.digest.unwrap_or_else(|| config.key_digest()),
        on_failure,
    }
}

/// Run the export command.
///
/// The summary is rendered even when the run was aborted; the command then
/// fails with the abort error, or if any partition failed.
pub async fn run(args: ExportArgs, config: &LinkgraphConfig, format: OutputFormat) -> Result<()> {
    let start = Instant::now();

    let years = args
        .years
        .clone()
        .map(|y| y.0)
        .unwrap_or_else(|| config.years());
    let partitions =
        plan(&years, args.monthly || config.run.monthly).context("Invalid partition plan")?;
    let settings = settings(&args, config);

    let conn: Connection = args.connection.into();
    let source = SearchClient::new(config.source_options(&conn))
        .context("Failed to create source client")?;
    let destination = SearchClient::new(config.destination_options(&conn))
        .context("Failed to create destination client")?;

    let source_index = settings.source_index.clone();
    let alias = settings.sink.alias.clone();
    let digest = settings.digest;

    let (tx, mut rx) = mpsc::unbounded_channel::<WriteFailure>();
    let collector = tokio::spawn(async move {
        let mut kept = Vec::new();
        while let Some(failure) = rx.recv().await {
            if kept.len() < MAX_REPORTED_FAILURES {
                kept.push(failure);
            }
        }
        kept
    });

    let driver = PipelineDriver::new(Arc::new(source), Arc::new(destination), settings)
        .with_failure_channel(tx);
    let result = driver.run(&partitions).await;
    drop(driver);

    let failures = collector.await.context("Failure collector stopped")?;
    let (summary, aborted) = match result {
        Ok(summary) => (summary, None),
        Err(StoreError::Aborted { summary, source }) => (*summary, Some(*source)),
        Err(e) => return Err(e).context("Export aborted"),
    };

    let report = ExportReport {
        source_index,
        alias,
        digest,
        totals: summary.totals(),
        partitions: summary.partitions,
        failures,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    let failed = report.failed_partitions();
    let total = report.partitions.len();

    Output::new(report, format).render()?;

    if let Some(e) = aborted {
        return Err(anyhow::Error::new(e).context("Export aborted"));
    }
    if failed > 0 {
        anyhow::bail!("{} of {} partitions failed", failed, total);
    }
    Ok(())
}
