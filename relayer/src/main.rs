// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # crossmint Relayer
//!
//! Entry point for the `crossmint-relayer` binary. Parses CLI arguments,
//! initializes logging and metrics, deploys a devnet and relays between its
//! two chains.
//!
//! Subcommands:
//!
//! - `run`          relay on an interval and serve HTTP until Ctrl-C
//! - `simulate`     scripted round trip, prints a JSON report
//! - `check-config` validate a config file
//! - `version`      print build version information

mod api;
mod cli;
mod config;
mod devnet;
mod logging;
mod metrics;
mod relay;

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal;

use crossmint_contracts::CollateralToken;
use crossmint_protocol::Address;

use cli::{Commands, CrossmintRelayerCli};
use config::RelayerConfig;
use devnet::Devnet;
use logging::LogFormat;
use metrics::RelayerMetrics;
use relay::Relayer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CrossmintRelayerCli::parse();

    match cli.command {
        Commands::Run(args) => run_relayer(args).await,
        Commands::Simulate(args) => simulate(args),
        Commands::CheckConfig(args) => check_config(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Relays on an interval and serves the HTTP endpoints.
async fn run_relayer(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        args.log.log_level.as_deref(),
        LogFormat::from_str_lossy(&args.log.log_format),
    )?;

    let mut config = RelayerConfig::load_or_default(args.config.as_deref())?;
    if let Some(port) = args.metrics_port {
        config.metrics_port = port;
    }
    if let Some(interval) = args.poll_interval_ms {
        config.poll_interval_ms = interval;
    }
    config.validate()?;

    tracing::info!(
        home = %config.home_chain_id,
        target = %config.target_chain_id,
        poll_interval_ms = config.poll_interval_ms,
        metrics_port = config.metrics_port,
        max_attempts = config.max_attempts,
        "starting crossmint-relayer"
    );

    let metrics = Arc::new(RelayerMetrics::new().context("failed to register metrics")?);
    let devnet = Devnet::from_config(&config).context("failed to deploy devnet")?;
    let relayer = Arc::new(Mutex::new(
        Relayer::new(devnet, Arc::clone(&metrics)).with_max_attempts(config.max_attempts),
    ));

    let state = api::AppState {
        version: version_string(),
        relayer: Arc::clone(&relayer),
    };
    let router = api::create_router(state, Arc::clone(&metrics));
    let addr = format!("0.0.0.0:{}", config.metrics_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", addr))?;
    tracing::info!(%addr, "HTTP server listening");

    let relay_ref = Arc::clone(&relayer);
    let poll = std::time::Duration::from_millis(config.poll_interval_ms);
    let relay_loop = tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll);
        loop {
            interval.tick().await;
            relay_ref.lock().tick();
        }
    });

    tokio::select! {
        res = axum::serve(listener, router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        res = shutdown_signal() => {
            res?;
            tracing::info!("shutdown signal received");
        }
    }

    relay_loop.abort();
    tracing::info!("crossmint-relayer stopped");
    Ok(())
}

/// Deposit, relay the mint, burn everything, relay the release; print a
/// JSON report and the final metrics.
fn simulate(args: cli::SimulateArgs) -> Result<()> {
    logging::init_logging(
        args.log.log_level.as_deref(),
        LogFormat::from_str_lossy(&args.log.log_format),
    )?;

    let config = RelayerConfig::load_or_default(args.config.as_deref())?;
    if !config.seed_accounts.contains_key(&args.account) {
        bail!("account {:?} is not a seed account in the config", args.account);
    }
    let metrics = Arc::new(RelayerMetrics::new().context("failed to register metrics")?);
    let devnet = Devnet::from_config(&config).context("failed to deploy devnet")?;
    let mut relayer =
        Relayer::new(devnet, Arc::clone(&metrics)).with_max_attempts(config.max_attempts);

    let user = Address::derive(&args.account);
    let unit = 10u128
        .checked_pow(u32::from(config.collateral_decimals))
        .context("collateral decimals too large")?;
    let deposit = u128::from(args.deposit)
        .checked_mul(unit)
        .context("deposit overflows")?;
    let before = relayer.devnet().collateral.balance_of(&user);

    relayer
        .devnet_mut()
        .deposit(user, deposit)
        .context("deposit failed")?;
    tracing::info!(%user, deposit, "step 1: collateral deposited");

    let mint_tick = relayer.tick();
    let minted = relayer.devnet().stable.balance_of(&user);
    if mint_tick.minted != 1 {
        bail!("authorization was not relayed: {:?}", mint_tick);
    }
    tracing::info!(%user, minted, "step 2: stable asset minted on target");

    relayer
        .devnet_mut()
        .burn(user, minted)
        .context("burn failed")?;
    tracing::info!(%user, burned = minted, "step 3: stable asset burned");

    let release_tick = relayer.tick();
    if release_tick.released != 1 {
        bail!("burn was not relayed: {:?}", release_tick);
    }
    let after = relayer.devnet().collateral.balance_of(&user);
    let released = after + deposit - before;
    tracing::info!(%user, released, "step 4: collateral released");

    let collateral = relayer.devnet().collateral.address();
    let price = relayer.devnet().oracle.get_asset_price(&collateral)?;

    let report = serde_json::json!({
        "account": args.account,
        "collateral_price": price.to_string(),
        "deposited": deposit.to_string(),
        "minted": minted.to_string(),
        "released": released.to_string(),
        "round_trip_exact": after == before,
        "status": relayer.status(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!();
    print!("{}", metrics.encode()?);
    Ok(())
}

/// Validates a config file and prints the effective configuration.
fn check_config(args: cli::CheckConfigArgs) -> Result<()> {
    let config = RelayerConfig::load(&args.path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("config OK: {}", args.path.display());
    Ok(())
}

fn version_string() -> String {
    format!(
        "{} (protocol {})",
        env!("CARGO_PKG_VERSION"),
        crossmint_protocol::config::PROTOCOL_VERSION,
    )
}

/// Prints version information to stdout.
fn print_version() {
    println!("crossmint-relayer {}", env!("CARGO_PKG_VERSION"));
    println!("protocol          {}", crossmint_protocol::config::PROTOCOL_VERSION);
}

/// Waits for Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?;
        tokio::select! {
            res = signal::ctrl_c() => res.context("failed to install Ctrl-C handler")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    signal::ctrl_c()
        .await
        .context("failed to install Ctrl-C handler")?;
    Ok(())
}
