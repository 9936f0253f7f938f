use crate::config::PluginConfig;
use crate::error::LaunchError;
use crate::streamdeck::{LaunchArgs, run_session};
use tracing::{error, info};

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables from a .env file next to the plugin, if any
    dotenvy::dotenv().ok();

    if let Err(e) = try_run() {
        error!("Plugin exited with error: {}", e);
        std::process::exit(1);
    }
}

fn try_run() -> Result<(), LaunchError> {
    let args = LaunchArgs::parse(std::env::args().skip(1))?;

    let config = PluginConfig::from_env();
    info!(config = ?config, "Plugin config initialized");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_session(args, config))?;

    info!("Plugin shut down cleanly");
    Ok(())
}
