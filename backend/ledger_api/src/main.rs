//! Milestone escrow ledger service: entry point.
//!
//! Hosts one in-process [`EscrowLedger`] behind an Axum REST API. Payouts go
//! to an external HTTP endpoint and every ledger event is journaled to SQLite
//! by a background task.

mod api;
mod config;
mod db;
mod errors;
mod events;
mod journal;
mod payout;

use std::sync::Arc;
use std::time::Duration;

use milestone_escrow::{EscrowLedger, Identity, SystemClock};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use payout::HttpPayoutGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let pool = db::init_pool(&config.database_url).await?;

    // ─── Event journal ────────────────────────────────────
    let shutdown = CancellationToken::new();
    let (sink, journal_task) = journal::start(pool.clone(), shutdown.clone());

    // ─── Ledger ───────────────────────────────────────────
    let gateway = HttpPayoutGateway::new(
        config.payout_url.clone(),
        Duration::from_secs(config.payout_timeout_secs),
    )?;
    let ledger = Arc::new(EscrowLedger::new(
        Identity::new(config.authority_id.clone()),
        Arc::new(gateway),
        Arc::new(SystemClock),
        Arc::new(sink),
    ));
    info!(authority = %ledger.authority(), payout_url = %config.payout_url, "ledger ready");

    // ─── REST API ─────────────────────────────────────────
    let app = api::router(Arc::new(api::ApiState { ledger, pool }));

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    shutdown.cancel();
    journal_task.await?;
    Ok(())
}
