//! CLI commands and argument parsing

use crate::types::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line client for MediaWiki-style APIs
#[derive(Parser, Debug)]
#[command(name = "wikiclient")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// URL of the api.php endpoint (overrides the config file)
    #[arg(short, long, global = true)]
    pub api_url: Option<String>,

    /// Session configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output (same as `--log-level debug`)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level, overriding `--verbose`
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Full-text search
    Search {
        /// Search terms
        query: String,

        /// Maximum pages to print
        #[arg(long)]
        limit: Option<usize>,

        /// Namespaces to search (repeatable)
        #[arg(short, long)]
        namespace: Vec<i32>,
    },

    /// Enumerate pages selected by a query descriptor
    ///
    /// Example: '{"type": "category_members", "title": "Physics"}'
    List {
        /// Query descriptor (JSON)
        descriptor: String,

        /// Maximum pages to print
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Revision history of a page, newest first
    Revisions {
        /// Page title
        title: String,

        /// Maximum revisions to print
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Follow a redirect chain to its target
    Redirect {
        /// Title of the first page
        title: String,
    },

    /// Purge the server-side cache of pages
    Purge {
        /// Page titles
        #[arg(required = true)]
        titles: Vec<String>,

        /// Update the links tables as well
        #[arg(long)]
        force_link_update: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
