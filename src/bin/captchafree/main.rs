//! captchafree CLI entry point.

mod cli;

use captchafree::{
    short_address, AppConfig, DisplayState, FileStore, Gate, HttpProvider, HttpProviderConfig,
    VerificationFlow, WalletSession,
};
use clap::Parser;
use cli::{Cli, Command};
use color_eyre::eyre::eyre;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = cli.to_config()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("captchafree v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(FileStore::open(&config.storage_dir)?);
    let flow = VerificationFlow::new(store, config.verification.clone())?;

    match cli.command {
        Command::Status { address } => {
            let mut gate = Gate::new(config.chain.clone(), flow.validity());
            print_state(&address, gate.mount_from(&flow, &address)?);
        }
        Command::Verify { address, .. } => verify(&config, &flow, address).await?,
        Command::Clear { address } => {
            flow.clear(&address)?;
            println!("Cleared verification for {}", short_address(&address));
        }
    }

    Ok(())
}

async fn verify(
    config: &AppConfig,
    flow: &VerificationFlow,
    address: Option<String>,
) -> color_eyre::Result<()> {
    let mut gate = Gate::new(config.chain.clone(), flow.validity());

    if config.verification.demo_mode {
        let address = address.ok_or_else(|| eyre!("--address is required in demo mode"))?;
        if !gate.mount_from(flow, &address)?.is_unlocked() {
            gate.begin()?;
            match flow.verify_simulated(&address) {
                Ok(record) => gate.succeed(record)?,
                Err(e) => gate.fail(&e)?,
            };
        }
        return finish(&address, gate.state());
    }

    let provider = Arc::new(HttpProvider::new(HttpProviderConfig {
        rpc_url: config.rpc.url.clone(),
        request_timeout: config.rpc.timeout(),
    })?);
    info!("Using wallet node at {}", provider.rpc_url());
    let session = WalletSession::connect(provider, config.chain.clone()).await?;
    let address = address.unwrap_or_else(|| session.address().to_string());

    if !gate.mount_from(flow, &address)?.is_unlocked() {
        gate.attempt(flow, Some(&session), &address).await?;
    }
    session.disconnect();

    finish(&address, gate.state())
}

fn finish(address: &str, state: &DisplayState) -> color_eyre::Result<()> {
    print_state(address, state);
    match state {
        DisplayState::Failed { message } => Err(eyre!("{message}")),
        _ => Ok(()),
    }
}

fn print_state(address: &str, state: &DisplayState) {
    let who = short_address(address);
    match state {
        DisplayState::Verified {
            record,
            expires_at,
            explorer_url,
        } => {
            println!("Humanity verified for {who}");
            println!("  transaction: {}", record.transaction_hash);
            println!("  valid until: {}", expires_at.to_rfc3339());
            println!("  view: {explorer_url}");
        }
        DisplayState::Failed { message } => println!("Verification failed for {who}: {message}"),
        DisplayState::Unverified => println!("{who} is not verified"),
        DisplayState::Loading | DisplayState::Pending => println!("{who}: checking..."),
    }
}
