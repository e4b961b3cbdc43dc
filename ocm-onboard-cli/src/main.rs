//! ocm-onboard CLI
//!
//! Command-line client for the KubeStellar cluster onboarding plugin

mod api;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ocm-onboard", author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Plugin server address (defaults to the config file value)
    #[arg(short, long)]
    server: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long)]
    output: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a cluster to the hub
    Onboard {
        /// Cluster name
        name: String,
        /// Kubeconfig to upload; without it the server looks the name up in
        /// its own kubeconfig
        #[arg(short, long)]
        kubeconfig: Option<PathBuf>,
    },
    /// Remove a cluster from the hub
    Detach {
        /// Cluster name
        name: String,
        /// Continue even if the hub does not know the cluster
        #[arg(short, long)]
        force: bool,
        /// Request local resource cleanup
        #[arg(long)]
        cleanup: bool,
        /// Request a backup before removal
        #[arg(long)]
        backup: bool,
    },
    /// Show a cluster's status and event log
    Status {
        /// Cluster name
        name: String,
        /// Poll until the running workflow finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// List tracked clusters
    List,
    /// Show a cluster's event log
    Events {
        /// Cluster name
        name: String,
    },
    /// Show plugin health
    Health,
    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = match config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            output::print_warning(&format!("Ignoring CLI config: {}", e));
            config::Config::default()
        }
    };

    let server = cli.server.as_deref().unwrap_or(&config.default_server);
    let format = OutputFormat::parse(cli.output.as_deref().unwrap_or(&config.default_output));
    let api_client = api::ApiClient::new(server, &config.api_base);

    // Execute command
    let result = match cli.command {
        Commands::Onboard { name, kubeconfig } => {
            commands::cluster::onboard(&api_client, &name, kubeconfig, format).await
        }
        Commands::Detach {
            name,
            force,
            cleanup,
            backup,
        } => commands::cluster::detach(&api_client, &name, force, cleanup, backup, format).await,
        Commands::Status { name, watch } => {
            let interval = Duration::from_secs(config.watch_interval_secs.max(1));
            commands::cluster::status(&api_client, &name, watch, interval, format).await
        }
        Commands::List => commands::cluster::list(&api_client, format).await,
        Commands::Events { name } => commands::cluster::events(&api_client, &name, format).await,
        Commands::Health => commands::health::health(&api_client, format).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

/// Generate shell completions
fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut io::stdout());
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
    fn test_parse_detach_flags() {
        let cli = Cli::parse_from(["ocm-onboard", "-o", "json", "detach", "prod-1", "--force"]);
        assert_eq!(cli.output.as_deref(), Some("json"));
        match cli.command {
            Commands::Detach { name, force, cleanup, .. } => {
                assert_eq!(name, "prod-1");
                assert!(force);
                assert!(!cleanup);
            }
            _ => panic!("expected detach"),
        }
    }
}
