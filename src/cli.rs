//! Command-line interface definitions using clap
//!
//! Operator commands run against the configured store and cache directly.
//! Link creation here skips admission control.

use clap::{Parser, Subcommand};

/// LinkPulse - short-code resolution and link analytics
#[derive(Parser)]
#[command(name = "linkpulse")]
#[command(version)]
#[command(about = "Short-code resolution and link analytics core", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a short code to its destination
    Resolve {
        short_code: String,

        /// Also record a click for this resolution
        #[arg(long)]
        record: bool,
    },

    /// Create a short link
    Create {
        /// Destination URL (http or https)
        url: String,

        /// Custom short code (generated if omitted)
        #[arg(long)]
        code: Option<String>,

        /// Owner user id
        #[arg(long)]
        user: Option<i64>,
    },

    /// Print dashboard statistics as JSON
    Stats {
        /// Owner user id (global stats if omitted)
        #[arg(long)]
        user: Option<i64>,

        /// Bypass the stats cache
        #[arg(long)]
        fresh: bool,
    },

    /// Apply pending database migrations
    Migrate,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let cli = Cli::parse_from([
            "linkpulse",
            "create",
            "https://example.com",
            "--code",
            "abc123",
            "--user",
            "7",
        ]);
        match cli.command {
            Commands::Create { url, code, user } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(code.as_deref(), Some("abc123"));
                assert_eq!(user, Some(7));
            }
            _ => panic!("expected create"),
        }
        assert_eq!(cli.config, "config.toml");
    }

    #[test]
    fn test_parse_config_generate() {
        let cli = Cli::parse_from(["linkpulse", "-c", "x.toml", "config", "generate", "-o", "out.toml"]);
        assert_eq!(cli.config, "x.toml");
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommands::Generate { output: Some(_), force: false }
            }
        ));
    }
}
