use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use identity_agent::config::endpoint::EndpointSettings;
use identity_agent::config::loader::load_config;
use identity_agent::config::settings::ServiceConfig;
use identity_agent::fetcher::{Fetcher, HttpFetcher};
use identity_agent::refresh::RefreshScheduler;
use identity_agent::sources::managed_identity::fetch_credential;
use identity_agent::utils::logging::{self, LogLevel};

#[derive(Debug, Parser)]
#[command(
    name = "identity-agent",
    about = "Managed identity credential refresh agent"
)]
struct Args {
    /// Optional YAML settings file
    #[arg(long, env = "IDENTITY_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load settings (defaults when no file is given)
    let cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    // 2. Logging
    logging::run(&cfg, args.log_level)?;

    // 3. Endpoint settings from the process environment
    let endpoint = EndpointSettings::from_env();

    // 4. Shared transport
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);

    let attempts = cfg.settings.attempt_policy();
    let policy = cfg.settings.refresh_policy();

    // 5. Initial credential
    let credential = fetch_credential(&fetcher, &endpoint, &attempts).await?;
    info!(
        "initial credential acquired, expires at {}",
        credential.expires_on
    );

    // 6. Background refresh until shutdown
    let cancel = CancellationToken::new();
    let scheduler = RefreshScheduler::new(fetcher, endpoint, attempts, policy);
    let handle = scheduler.start(
        credential,
        Box::new(|outcome| {
            match outcome {
                Ok(credential) => {
                    info!("credential refreshed, expires at {}", credential.expires_on);
                }
                Err(e) => error!("credential refresh failed: {e}"),
            }
            Ok(())
        }),
        cancel.clone(),
    )?;

    info!("identity agent running");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    cancel.cancel();
    handle.join().await;
    Ok(())
}
