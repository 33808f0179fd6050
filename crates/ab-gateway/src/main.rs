mod admin;
mod auth;
mod bootstrap;
mod cli;
mod daemon_state;
mod doctor;
mod launcher;
mod policies_runner;
mod socket_registry;
mod state;
mod ws;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            let (config, _config_path) = cli::load_config()?;
            init_tracing(&config.observability);
            bootstrap::run_server(Arc::new(config)).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = cli::load_config()?;
            let passed = doctor::run(&config, &config_path);
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config()?;
            let issues = config.validate();
            if issues.is_empty() {
                println!("{config_path}: no issues");
            } else {
                for issue in &issues {
                    println!("{issue}");
                }
            }
            let has_errors = issues.iter().any(|i| i.severity == ab_domain::config::ConfigSeverity::Error);
            if has_errors {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config()?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Command::Version) => {
            println!("agentbrokerd {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(observability: &ab_domain::config::ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(observability.filter.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if observability.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
