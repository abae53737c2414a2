//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Compose Enterprise Search configuration and converge its config secret
#[derive(Parser, Debug)]
#[command(name = "ents-config")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compose and render the configuration file
    Render(commands::render::RenderArgs),
    /// Converge the config secret of an Enterprise Search manifest in a state directory
    Reconcile(commands::reconcile::ReconcileArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Render(args) => commands::render::execute(args),
            Commands::Reconcile(args) => commands::reconcile::execute(args),
        }
    }
}

/// `RUST_LOG` takes precedence over `--log-level` when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render_with_association() {
        let cli = Cli::try_parse_from([
            "ents-config",
            "render",
            "--es-url",
            "https://es:9200",
            "--es-username",
            "elastic",
            "--es-password",
            "pw",
            "--es-ca",
        ])
        .unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.es_url.as_deref(), Some("https://es:9200"));
                assert!(args.es_ca);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_es_ca_requires_es_url() {
        let result = Cli::try_parse_from(["ents-config", "render", "--es-ca"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_reconcile() {
        let cli = Cli::try_parse_from([
            "ents-config",
            "--log-level",
            "debug",
            "reconcile",
            "--manifest",
            "ents.yaml",
            "--state-dir",
            "/tmp/state",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Reconcile(_)));
    }
}
