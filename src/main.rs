use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sumo_export::cli::run::ExportArgs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sumo-export")]
#[command(about = "Export search results to compressed JSON archives", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a time range (the default command)
    Export(ExportArgs),
    /// Store API credentials for later exports
    Setup,
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config to ~/.config/sumo-export/config.yml
    Init {
        /// Print to stdout instead of writing the file
        #[arg(long)]
        stdout: bool,
    },
    /// Check that the config file parses and validates
    Validate,
}

/// Export flags given before a subcommand would be silently dropped.
fn check_flag_placement(cli: &Cli) -> Result<(), String> {
    if cli.command.is_some() && cli.export != ExportArgs::default() {
        return Err(
            "export flags must come after `export`, or be used without a subcommand".to_string(),
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sumo_export=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    check_flag_placement(&cli)?;

    let config_path = sumo_export::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Export(args)) => {
            sumo_export::cli::run::run(config_path, args).await?;
        }
        None => {
            sumo_export::cli::run::run(config_path, cli.export).await?;
        }
        Some(Commands::Setup) => {
            sumo_export::cli::setup::setup()?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                sumo_export::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                sumo_export::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_bare_flags_run_export() {
        let cli = parse(&["sumo-export", "--start", "2020-01-01"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.export.start.as_deref(), Some("2020-01-01"));
        assert!(check_flag_placement(&cli).is_ok());
    }

    #[test]
    fn test_flags_after_export_subcommand() {
        let cli = parse(&["sumo-export", "export", "--start", "2020-01-01"]);
        match &cli.command {
            Some(Commands::Export(args)) => assert_eq!(args.start.as_deref(), Some("2020-01-01")),
            _ => panic!("expected export subcommand"),
        }
        assert!(check_flag_placement(&cli).is_ok());
    }

    #[test]
    fn test_flags_before_subcommand_are_rejected() {
        let cli = parse(&["sumo-export", "--start", "2020-01-01", "export"]);
        assert!(check_flag_placement(&cli).is_err());

        let cli = parse(&["sumo-export", "--bucket", "archive", "setup"]);
        assert!(check_flag_placement(&cli).is_err());
    }

    #[test]
    fn test_config_path_allowed_before_subcommand() {
        let cli = parse(&["sumo-export", "--config", "c.yml", "setup"]);
        assert!(check_flag_placement(&cli).is_ok());
    }
}
