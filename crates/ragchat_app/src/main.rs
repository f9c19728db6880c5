mod platform;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use platform::logging::LogDestination;

#[derive(Parser)]
#[command(
    name = "ragchat",
    version,
    about = "Terminal client for a retrieval-augmented chat backend"
)]
struct Cli {
    /// Path to the TOML config file; defaults apply when it does not exist.
    #[arg(long, default_value = "./ragchat.toml")]
    config: PathBuf,

    /// Backend base URL, overriding the config file.
    #[arg(long)]
    base_url: Option<String>,

    /// Where log output goes, overriding the config file.
    #[arg(long, value_enum)]
    log: Option<LogDestination>,

    /// Directory holding the persisted session state.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Print what the backend reports about itself and exit.
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = platform::config::load_config(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.backend.base_url = base_url;
    }
    if let Some(destination) = cli.log {
        config.logging.destination = destination;
    }
    if let Some(state_dir) = cli.state_dir {
        config.state_dir = state_dir;
    }

    platform::logging::initialize(config.logging.destination, config.logging.level_filter());

    if cli.check {
        return platform::app::check_backend(&config);
    }
    platform::app::run_app(config)
}
