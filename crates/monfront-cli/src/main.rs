mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{actions::ActionsSubcommand, config::ConfigSubcommand};
use monfront_core::config::CONFIG_FILE;
use monfront_core::types::UserType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "monfront",
    about = "Monitoring frontend controllers: validate, authorize, execute",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, env = "MONFRONT_CONFIG", default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config with a fresh super-admin session
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP server
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Inspect and validate the config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Inspect the registered actions
    Actions {
        #[command(subcommand)]
        subcommand: ActionsSubcommand,
    },

    /// Run one action offline against the configured seed data
    Check {
        /// Action name, e.g. discovery.disable
        action: String,

        /// Request parameter; repeat for lists (`-p druleids[]=5 -p druleids[]=7`)
        #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Run as this configured session instead of a synthetic user
        #[arg(long, conflicts_with = "user_type")]
        session: Option<String>,

        /// User type of the synthetic caller
        #[arg(long, default_value = "super_admin")]
        user_type: UserType,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let config = cli.config.as_path();
    let result = match cli.command {
        Commands::Init { force } => cmd::init::run(config, force),
        Commands::Serve { port, bind } => cmd::serve::run(config, port, bind),
        Commands::Config { subcommand } => cmd::config::run(config, subcommand, cli.json),
        Commands::Actions { subcommand } => cmd::actions::run(config, subcommand, cli.json),
        Commands::Check {
            action,
            params,
            session,
            user_type,
        } => cmd::check::run(config, &action, &params, session.as_deref(), user_type, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
