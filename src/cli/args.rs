//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// typeload - fetch, cache and publish TypeScript declarations
///
/// Resolves packages against an ESM registry, walks their declaration
/// graphs and writes the result where an editor or `tsc` can read it.
#[derive(Parser, Debug)]
#[command(name = "typeload")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TYPELOAD_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the declarations of one or more libraries
    Load(LoadArgs),

    /// Load declarations for every package a source file imports
    Analyze(AnalyzeArgs),

    /// Inspect or clear the declaration cache
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the load command
#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// Library names (e.g. lodash, @vapor-ui/core)
    #[arg(required = true)]
    pub libraries: Vec<String>,

    /// Write declarations under this directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Load libraries missing from the allow-list too
    #[arg(long)]
    pub any: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the analyze command
#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Source file to scan, or `-` for stdin
    pub file: PathBuf,

    /// Write declarations under this directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show entry count, size and hit rate
    Stats {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List cached entries, oldest first
    List {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove the entry cached for a URL
    Remove {
        /// Source URL of the declaration file
        url: String,
    },

    /// Remove every entry in the cache namespace
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Also remove the declarations typeload wrote under this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for reports and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// One item per line
    Plain,
}

impl OutputFormat {
    /// Whether stdout must carry only the formatted output
    pub fn is_machine(&self) -> bool {
        !matches!(self, Self::Table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_load() {
        let cli = Cli::parse_from(["typeload", "load", "lodash", "@vapor-ui/core", "--any"]);
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.libraries, vec!["lodash", "@vapor-ui/core"]);
                assert!(args.any);
                assert!(args.out.is_none());
                assert_eq!(args.format, OutputFormat::Table);
            }
            _ => panic!("expected Load command"),
        }
    }

    #[test]
    fn cli_load_requires_library() {
        assert!(Cli::try_parse_from(["typeload", "load"]).is_err());
    }

    #[test]
    fn cli_parses_analyze_stdin() {
        let cli = Cli::parse_from(["typeload", "analyze", "-", "--out", "types", "-f", "json"]);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.file, PathBuf::from("-"));
                assert_eq!(args.out, Some(PathBuf::from("types")));
                assert_eq!(args.format, OutputFormat::Json);
            }
            _ => panic!("expected Analyze command"),
        }
    }

    #[test]
    fn cli_parses_cache_clear() {
        let cli = Cli::parse_from(["typeload", "cache", "clear", "--yes"]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Clear { yes, out },
            }) => {
                assert!(yes);
                assert!(out.is_none());
            }
            _ => panic!("expected cache clear"),
        }
    }

    #[test]
    fn cli_parses_config_default_action() {
        let cli = Cli::parse_from(["typeload", "config"]);
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs { action: None })
        ));
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["typeload", "config", "path"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["typeload", "-vv", "config", "path"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn output_format_machine() {
        assert!(!OutputFormat::Table.is_machine());
        assert!(OutputFormat::Json.is_machine());
        assert!(OutputFormat::Plain.is_machine());
    }
}
