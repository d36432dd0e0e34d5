//! Pairs command - Dump written links as `from to` lines
//!
//! Scans the destination with a match-all selection and prints one pair per
//! line (JSON lines with `--format json`). The cursor is released as soon as
//! the limit is reached.

use crate::commands::ConnectionArgs;
use crate::config::{Connection, LinkgraphConfig};
use crate::output::{JsonOutput, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use linkgraph_store::{LinkPair, ScanCursor, ScanRequest, SearchBackend, SearchClient};
use std::io::{BufWriter, Write};
use std::sync::Arc;

/// Pairs printed when `--limit` is not given.
pub const DEFAULT_LIMIT: usize = 1000;

#[derive(Args, Debug, Clone)]
pub struct PairsArgs {
    /// Index or alias to scan (defaults to the destination alias)
    #[arg(long)]
    pub index: Option<String>,

    /// Stop after this many pairs
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

fn render(pair: &LinkPair, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format!("{} {}", pair.from, pair.to),
        OutputFormat::Json => JsonOutput::line(pair),
    }
}

/// Write up to `limit` pairs from `backend` to `out`; returns the count.
pub async fn dump<W: Write>(
    backend: Arc<dyn SearchBackend>,
    request: &ScanRequest,
    limit: usize,
    format: OutputFormat,
    out: &mut W,
) -> Result<usize> {
    let mut scan = ScanCursor::<LinkPair>::open(backend, request)
        .await
        .with_context(|| format!("Failed to scan {}", request.index))?;

    let mut written = 0;
    'pages: while written < limit {
        let Some(page) = scan.next_page().await? else {
            break;
        };
        for pair in page {
            if written == limit {
                break 'pages;
            }
            writeln!(out, "{}", render(&pair, format))?;
            written += 1;
        }
    }

    scan.close().await;
    out.flush()?;
    Ok(written)
}

/// Run the pairs command.
pub async fn run(args: PairsArgs, config: &LinkgraphConfig, format: OutputFormat) -> Result<()> {
    let index = args
        .index
        .clone()
        .unwrap_or_else(|| config.alias().to_string());
    let request = ScanRequest::link_pairs(&index, config.page_size(), config.keep_alive());

    let conn: Connection = args.connection.into();
    let client = SearchClient::new(config.destination_options(&conn))
        .context("Failed to create destination client")?;

    let mut out = BufWriter::new(std::io::stdout());
    let written = dump(Arc::new(client), &request, args.limit, format, &mut out).await?;
    tracing::debug!("Printed {} pairs from {}", written, index);
    Ok(())
}
