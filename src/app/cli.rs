//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// midclick - three-finger trackpad tap as middle click
#[derive(Parser, Debug)]
#[command(name = "midclick")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the middle-click session until interrupted
    Run,

    /// Check multitouch devices and Accessibility permissions
    Check {
        /// Show the system Accessibility prompt if not yet trusted
        #[arg(long)]
        prompt: bool,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_run_command() {
        let args = vec!["midclick", "run"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Commands::Run));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_check_command_defaults() {
        let args = vec!["midclick", "check"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Check { prompt } => assert!(!prompt),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_check_command_with_prompt() {
        let args = vec!["midclick", "check", "--prompt"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Check { prompt } => assert!(prompt),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_init_command() {
        let args = vec!["midclick", "init", "--force"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Init { force } => assert!(force),
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_parse_init_command_defaults() {
        let args = vec!["midclick", "init"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Init { force } => assert!(!force),
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show() {
        let args = vec!["midclick", "config", "show"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Config {
                action: ConfigAction::Show,
            } => {}
            _ => panic!("Expected Config Show"),
        }
    }

    #[test]
    fn test_cli_parse_config_reset() {
        let args = vec!["midclick", "config", "reset", "--force"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Config {
                action: ConfigAction::Reset { force },
            } => assert!(force),
            _ => panic!("Expected Config Reset"),
        }
    }

    #[test]
    fn test_cli_global_verbose_flag() {
        let args = vec!["midclick", "--verbose", "run"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_verbose_shorthand() {
        let args = vec!["midclick", "-v", "run"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_global_config_flag() {
        let args = vec!["midclick", "--config", "/path/to/config.toml", "run"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_invalid_command_fails() {
        let args = vec!["midclick", "invalid-command"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_no_command_fails() {
        let args = vec!["midclick"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        assert!(subcommands.contains(&"run"));
        assert!(subcommands.contains(&"check"));
        assert!(subcommands.contains(&"init"));
        assert!(subcommands.contains(&"config"));
    }
}
