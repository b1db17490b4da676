//! CLI argument parsing for batchd

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::domain::Priority;

#[derive(Parser, Debug)]
#[command(name = "batchd")]
#[command(author, version, about = "Priority-ordered, rate-limited batch ingestion daemon", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server and scheduler
    Serve {
        /// Address to listen on (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Submit ids to a running server
    Submit {
        /// Priority of the ingestion (HIGH, MEDIUM or LOW, any case)
        #[arg(short, long, default_value = "MEDIUM")]
        priority: Priority,

        /// Item ids to ingest
        ids: Vec<u64>,
    },

    /// Show the status of an ingestion
    Status {
        /// Ingestion ID
        #[arg(required = true)]
        ingestion_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for status
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit() {
        let cli = Cli::parse_from(["batchd", "submit", "--priority", "high", "1", "2", "3"]);
        match cli.command {
            Command::Submit { priority, ids } => {
                assert_eq!(priority, Priority::High);
                assert_eq!(ids, vec![1, 2, 3]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_status_defaults_to_text() {
        let cli = Cli::parse_from(["batchd", "-v", "status", "abc"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Status { ingestion_id, format } => {
                assert_eq!(ingestion_id, "abc");
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_submit_priority_defaults_to_medium() {
        let cli = Cli::parse_from(["batchd", "submit", "1"]);
        match cli.command {
            Command::Submit { priority, .. } => assert_eq!(priority, Priority::Medium),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_priority() {
        assert!(Cli::try_parse_from(["batchd", "submit", "--priority", "urgent", "1"]).is_err());
    }
}
