use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use seon_topology::network::ProviderCapabilities;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "seon", version, about = "SEON topology resolver")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a topology configuration into a provisioning plan.
    Resolve {
        /// Path to the topology configuration file.
        #[arg(long)]
        config: PathBuf,

        /// Environment to resolve.
        #[arg(long)]
        env: String,

        /// Output format for the plan.
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Availability zones the provisioning backend declares available.
        #[arg(long = "available-azs", value_delimiter = ',')]
        available_azs: Option<Vec<String>>,
    },

    /// Validate a topology configuration without emitting a plan.
    Check {
        /// Path to the topology configuration file.
        #[arg(long)]
        config: PathBuf,

        /// Environment to dry-run. Checks every environment when omitted.
        #[arg(long)]
        env: Option<String>,

        /// Availability zones the provisioning backend declares available.
        #[arg(long = "available-azs", value_delimiter = ',')]
        available_azs: Option<Vec<String>>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Yaml,
    Json,
}

fn capabilities(available_azs: Option<Vec<String>>) -> ProviderCapabilities {
    match available_azs {
        Some(available_azs) => ProviderCapabilities { available_azs },
        None => ProviderCapabilities::default(),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Resolve {
            config,
            env,
            format,
            available_azs,
        } => commands::resolve::run(&config, &env, format, capabilities(available_azs))?,

        Command::Check {
            config,
            env,
            available_azs,
        } => commands::check::run(&config, env.as_deref(), capabilities(available_azs))?,
    }

    Ok(())
}
