//! Plan command - Preview partitions and their scan requests
//!
//! Nothing is contacted: this only shows what `export` would ask the source
//! index for, partition by partition.

use crate::commands::{parse_year_list, YearList};
use crate::config::LinkgraphConfig;
use crate::output::{Output, OutputFormat, TableDisplay};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use linkgraph_core::partition::plan;
use linkgraph_store::ScanRequest;
use serde::Serialize;
use serde_json::Value;

#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Years to plan, e.g. `2016-2018,2020`
    #[arg(long, value_parser = parse_year_list)]
    pub years: Option<YearList>,

    /// Split every year into monthly partitions
    #[arg(long)]
    pub monthly: bool,
}

#[derive(Debug, Serialize)]
pub struct PlannedPartition {
    pub partition: String,
    /// Inclusive lower bound.
    pub gte: String,
    /// Exclusive upper bound.
    pub lt: String,
    /// Opening search request body.
    pub body: Value,
}

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub index: String,
    pub keep_alive: String,
    pub partitions: Vec<PlannedPartition>,
}

impl TableDisplay for PlanReport {
    fn to_table(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "{} {} partitions on {} (scroll {})",
            "Plan:".green().bold(),
            self.partitions.len(),
            self.index.cyan(),
            self.keep_alive
        ));

        for planned in &self.partitions {
            lines.push(String::new());
            lines.push(format!(
                "{}  [{}, {})",
                planned.partition.bold(),
                planned.gte,
                planned.lt
            ));
            let body = serde_json::to_string_pretty(&planned.body).unwrap_or_default();
            for line in body.lines() {
                lines.push(format!("  {}", line.dimmed()));
            }
        }

        lines.join("\n")
    }
}

/// Build the plan without printing it.
pub fn build(args: &PlanArgs, config: &LinkgraphConfig) -> Result<PlanReport> {
    let years = args
        .years
        .clone()
        .map(|y| y.0)
        .unwrap_or_else(|| config.years());
    let partitions =
        plan(&years, args.monthly || config.run.monthly).context("Invalid partition plan")?;

    let index = config.source_index().to_string();
    let partitions = partitions
        .iter()
        .map(|partition| {
            let (gte, lt) = partition.bounds();
            let request =
                ScanRequest::documents(&index, partition, config.page_size(), config.keep_alive());
            PlannedPartition {
                partition: partition.to_string(),
                gte,
                lt,
                body: request.body(),
            }
        })
        .collect();

    Ok(PlanReport {
        index,
        keep_alive: config.keep_alive().to_string(),
        partitions,
    })
}

/// Run the plan command.
pub async fn run(args: PlanArgs, config: &LinkgraphConfig, format: OutputFormat) -> Result<()> {
    let report = build(&args, config)?;
    Output::new(report, format).render()
}
