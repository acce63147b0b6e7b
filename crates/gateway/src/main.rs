//! Shiftline gateway: WebSocket relay plus REST API on one port.

mod config;
mod error;
mod http;
mod ws;

use tracing::info;
use tracing_subscriber::EnvFilter;

use automation::SchedulerConfig;
use database::Database;
use relay::{Relay, RelayConfig};

use crate::config::GatewayConfig;
use crate::http::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    db.migrate().await.expect("failed to run migrations");

    let relay = Relay::new(RelayConfig::default().with_ring_timeout(config.ring_timeout));

    // Held for the life of the process; dropping it would not stop the
    // loops, but shutdown() on ctrl-c would.
    let _scheduler = if config.automation_enabled {
        Some(automation::scheduler::start(
            db.clone(),
            SchedulerConfig::default().with_absent_run_time(config.absent_run_time),
        ))
    } else {
        info!("attendance automation disabled");
        None
    };

    let state = AppState { db, relay };
    let app = http::router(state);

    info!(addr = %config.addr, "Shiftline gateway listening");
    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, app).await.expect("server error");
}
