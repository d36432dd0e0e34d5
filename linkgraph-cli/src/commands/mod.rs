//! Command implementations for linkgraph CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod export;
pub mod pairs;
pub mod plan;

use clap::Args;
use linkgraph_core::partition::parse_years;

use crate::config::Connection;

/// Endpoint and credentials, shared by commands that contact a cluster.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Search-store endpoint (overrides the config file)
    #[arg(long, env = "LINKGRAPH_URL")]
    pub url: Option<String>,

    /// Basic-auth user name
    #[arg(long, env = "LINKGRAPH_USERNAME")]
    pub username: Option<String>,

    /// Basic-auth password
    #[arg(long, env = "LINKGRAPH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl From<ConnectionArgs> for Connection {
    fn from(args: ConnectionArgs) -> Self {
        Connection {
            url: args.url,
            username: args.username,
            password: args.password,
        }
    }
}

/// Years given on the command line, e.g. `2016-2018,2020`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearList(pub Vec<i32>);

/// Parse and validate a year list
pub fn parse_year_list(s: &str) -> Result<YearList, String> {
    parse_years(s).map(YearList).map_err(|e| e.to_string())
}
