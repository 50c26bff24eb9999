//! samtv: command-line remote for Samsung SmartView TVs (2014+ models).
//!
//! Pairs with the TV, sends remote key presses over the encrypted SmartView
//! channel and shows the device description.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use config::{Config, Overrides};

/// samtv: SmartView TV remote
#[derive(Parser)]
#[command(name = "samtv", version, about = "A CLI remote for Samsung smart TVs (2014+ models)")]
struct Cli {
    /// TV IP address or host name
    #[arg(long, global = true, env = "SAMTV_SERVER")]
    server: Option<String>,

    /// SmartView device UUID
    #[arg(long = "device-uuid", global = true, env = "SAMTV_DEVICE_UUID")]
    device_uuid: Option<String>,

    /// SmartView session key (32 hex characters)
    #[arg(long = "session-key", global = true, env = "SAMTV_SESSION_KEY")]
    session_key: Option<String>,

    /// SmartView session ID
    #[arg(long = "session-id", global = true, env = "SAMTV_SESSION_ID")]
    session_id: Option<i64>,

    /// Config file path (`/dev/null` disables the config file)
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one or several keys to the TV (`_` pauses)
    Key {
        /// List the known key identifiers
        #[arg(short, long)]
        list: bool,

        /// Key identifiers, e.g. KEY_VOLUP
        #[arg(required_unless_present = "list")]
        keys: Vec<String>,
    },

    /// Pair with the TV
    Pair {
        /// PIN shown on the TV (0 requests the PIN page, negative closes it)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        pin: i32,

        /// Request a PIN even if session data is already configured
        #[arg(long)]
        force: bool,

        /// Write the pairing result to the config file
        #[arg(long)]
        save: bool,
    },

    /// Show the TV's device description
    Describe {
        /// Print the raw description as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load config file; flags and environment override it.
    let config_path = config::resolve_path(cli.config.as_deref());
    let loaded = match &config_path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    };
    let mut cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("samtv: {e:#}");
            std::process::exit(1);
        }
    };
    cfg.apply(&Overrides {
        server: cli.server.clone(),
        device_uuid: cli.device_uuid.clone(),
        session_key: cli.session_key.clone(),
        session_id: cli.session_id,
        debug: cli.debug,
    });

    // Initialize tracing.
    let default_filter = if cfg.debug {
        "samtv=debug,samtv_cli=debug,samtv_client=debug,samtv_core=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cfg.debug)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Key { list, keys } => commands::key::run(&cfg, &keys, list).await,
        Command::Pair { pin, force, save } => {
            commands::pair::run(&cfg, config_path.as_deref(), pin, force, save).await
        }
        Command::Describe { json } => commands::describe::run(&cfg, json).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("samtv: {e:#}");
        std::process::exit(1);
    }
}
