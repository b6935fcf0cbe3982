use cropd_log as logging;

macro_rules! log_at {
    ($level:expr, $($arg:tt)*) => {{
        if crate::logging::enabled($level) {
            crate::logging::log($level, module_path!(), file!(), line!(), format_args!($($arg)*));
        }
    }};
}

macro_rules! log_error {
    ($($arg:tt)*) => {{
        log_at!(crate::logging::Level::Error, $($arg)*);
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        log_at!(crate::logging::Level::Warn, $($arg)*);
    }};
}

macro_rules! log_info {
    ($($arg:tt)*) => {{
        log_at!(crate::logging::Level::Info, $($arg)*);
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        log_at!(crate::logging::Level::Debug, $($arg)*);
    }};
}

pub mod clock;
pub mod config;
pub mod service;

use std::sync::Arc;
use std::time::Duration;

use cropd_consensus::{hash256_to_hex, select, ChainParams};
use cropd_pow::verify_genesis;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::clock::PeerTimeClock;
use crate::config::{CliAction, Config};
use crate::service::MasternodeService;

pub async fn run_entry() -> Result<(), String> {
    match config::parse_args().map_err(|err| err.to_string())? {
        CliAction::PrintHelp => {
            println!("{}", config::usage());
            Ok(())
        }
        CliAction::PrintVersion => {
            println!("cropd {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliAction::Run(config) => run_with_config(config).await,
    }
}

async fn run_with_config(config: Config) -> Result<(), String> {
    logging::init(logging::LogConfig {
        level: config.log_level,
        format: config.log_format,
        timestamps: config.log_timestamps,
        directives: config.log_directives.clone(),
    });
    for key in &config.ignored_keys {
        log_warn!(
            "Ignoring unknown key '{key}' in {}",
            config.conf_path.display()
        );
    }

    log_info!(
        "Startup: begin (network={}, conf={})",
        config.network,
        config.conf_path.display()
    );
    let params = match select(config.network, verify_genesis) {
        Ok(params) => params,
        Err(err) => {
            log_error!("Chain parameters rejected: {err}");
            return Err(err.to_string());
        }
    };
    log_startup_params(params);

    let service = Arc::new(MasternodeService::new(params.clone(), config.election));
    let clock = Arc::new(PeerTimeClock::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = match signal(SignalKind::terminate()) {
                    Ok(signal) => signal,
                    Err(err) => {
                        log_warn!("failed to install SIGTERM handler: {err}");
                        let _ = tokio::signal::ctrl_c().await;
                        let _ = shutdown_tx.send(true);
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }

            log_info!("Signal received; requesting shutdown.");
            let _ = shutdown_tx.send(true);
        });
    }

    let sweeper = tokio::spawn(sweep_loop(
        Arc::clone(&service),
        clock,
        Duration::from_secs(config.sweep_interval_secs),
        shutdown_rx.clone(),
    ));
    let status = tokio::spawn(status_loop(
        Arc::clone(&service),
        Duration::from_secs(config.status_interval_secs),
        shutdown_rx,
    ));
    log_info!(
        "Startup: ready (sweep every {}s, cooldown {}%, score offset {})",
        config.sweep_interval_secs,
        config.election.cooldown_percent,
        config.election.score_offset
    );

    let _ = tokio::join!(sweeper, status);
    drop(shutdown_tx);
    log_info!("Shutdown complete.");
    Ok(())
}

fn log_startup_params(params: &ChainParams) {
    log_info!(
        "Chain parameters: network={} genesis={} port={} rpcport={}",
        params.network,
        hash256_to_hex(&params.consensus.hash_genesis_block),
        params.default_port,
        params.rpc_port
    );
    log_debug!(
        "Masternode payments from height {}, last PoW block {}, PoS from {}",
        params.masternode.payment_start_height,
        params.consensus.last_pow_height,
        params.consensus.pos_start_height
    );
}

async fn sweep_loop(
    service: Arc<MasternodeService>,
    clock: Arc<PeerTimeClock>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        if *shutdown.borrow() {
            break;
        }
        if let Err(err) = service.sweep(clock.as_ref()) {
            log_warn!("Masternode sweep failed: {err}");
        }
    }
}

async fn status_loop(
    service: Arc<MasternodeService>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        if *shutdown.borrow() {
            break;
        }
        let registry = service.registry();
        match (registry.len(), registry.count_enabled()) {
            (Ok(total), Ok(enabled)) => {
                log_info!("Masternodes: {total} known, {enabled} enabled")
            }
            (Err(err), _) | (_, Err(err)) => {
                log_warn!("Masternode status unavailable: {err}")
            }
        }
    }
}
