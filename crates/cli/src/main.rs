//! Utilization recorder CLI
//!
//! Reads recorded container samples back out of the sorted-set store:
//! streaming exports for analysis, single-series views, and key listings.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{export, keys, show};

/// Utilization recorder CLI
#[derive(Parser)]
#[command(name = "utilctl")]
#[command(author, version, about = "CLI for the container utilization recorder", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub store: client::StoreArgs,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export every matching series to a file, one row per sample
    Export {
        /// Key pattern to scan
        #[arg(long, env = "KEY_GLOB", default_value = "util:*")]
        pattern: String,

        /// Output file path
        #[arg(long, short, env = "CSV_FILE", default_value = "cpu_metrics.csv")]
        output: String,

        /// File format
        #[arg(long = "as", default_value = "csv")]
        file_format: export::FileFormat,
    },

    /// Show one container's series
    Show {
        /// Pod name
        pod: String,

        /// Container name
        container: String,

        /// Only show the most recent N samples
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// List recorded series
    Keys {
        /// Key pattern to scan
        #[arg(long, default_value = "util:*")]
        pattern: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = client::connect(&cli.store).await?;

    match cli.command {
        Commands::Export {
            pattern,
            output,
            file_format,
        } => {
            export::export_series(store, &pattern, &output, file_format).await?;
        }
        Commands::Show {
            pod,
            container,
            limit,
        } => {
            show::show_series(store, &pod, &container, limit, cli.format).await?;
        }
        Commands::Keys { pattern } => {
            keys::list_keys(store, &pattern, cli.format).await?;
        }
    }

    Ok(())
}
