//! CLI commands and argument parsing

use crate::feed::{SearchMode, DEFAULT_SEARCH_COUNT};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Human-paced feed fetcher
#[derive(Parser, Debug)]
#[command(name = "feedpace")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of items to collect
    #[arg(short = 'n', long, global = true, default_value_t = DEFAULT_SEARCH_COUNT)]
    pub count: usize,

    /// Disable all pacing delays
    #[arg(long, global = true)]
    pub no_pacing: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect a user's timeline
    Timeline {
        /// User id, or screen name (`@name` forces a lookup)
        user: String,
    },

    /// Collect search results
    Search {
        /// Query text
        query: String,

        /// Search mode: popular, latest, or date_range
        #[arg(short, long, default_value = "popular")]
        mode: SearchMode,

        /// First day of a date range search (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Last day of a date range search (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_timeline() {
        let cli = Cli::parse_from(["feedpace", "--count", "30", "timeline", "42"]);
        assert_eq!(cli.count, 30);
        assert!(!cli.no_pacing);
        assert!(matches!(cli.command, Commands::Timeline { ref user } if user == "42"));
    }

    #[test]
    fn test_parse_timeline_screen_name() {
        let cli = Cli::parse_from(["feedpace", "timeline", "@rustlang"]);
        assert!(matches!(cli.command, Commands::Timeline { ref user } if user == "@rustlang"));
    }

    #[test]
    fn test_parse_search_date_range() {
        let cli = Cli::parse_from([
            "feedpace",
            "search",
            "rust lang",
            "--mode",
            "date-range",
            "--since",
            "2024-01-01",
            "--until",
            "2024-01-31",
            "--no-pacing",
        ]);
        assert!(cli.no_pacing);
        assert_eq!(cli.count, DEFAULT_SEARCH_COUNT);
        match cli.command {
            Commands::Search {
                query,
                mode,
                since,
                until,
            } => {
                assert_eq!(query, "rust lang");
                assert_eq!(mode, SearchMode::DateRange);
                assert_eq!(since, NaiveDate::from_ymd_opt(2024, 1, 1));
                assert_eq!(until, NaiveDate::from_ymd_opt(2024, 1, 31));
            }
            other => panic!("Expected search, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_mode() {
        assert!(Cli::try_parse_from(["feedpace", "search", "q", "--mode", "oldest"]).is_err());
    }
}
