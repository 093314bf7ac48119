//! ==============================================================================
//! main.rs - garden monitor entry point
//! ==============================================================================
//!
//! purpose:
//!     runs the sensor polling session behind the dashboard json api.
//!
//! responsibilities:
//!     - load host.toml (or defaults) and set up logging
//!     - build the sensor store chosen in config (in-memory mock or rest)
//!     - start the polling session (immediate fetch, then every interval)
//!     - serve the api until ctrl-c, then stop the session
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────┐
//!     │                     garden monitor                        │
//!     │  ┌───────────────┐   ┌──────────────┐   ┌─────────────┐  │
//!     │  │ refresh timer │   │  web server  │   │snapshot echo│  │
//!     │  │ (60s cycle)   │   │ (port 3000)  │   │ (optional)  │  │
//!     │  └───────┬───────┘   └──────┬───────┘   └──────┬──────┘  │
//!     │          └──────────────────┼──────────────────┘         │
//!     │                     ┌───────┴────────┐                   │
//!     │                     │ polling session│ <- session.rs     │
//!     │                     └───────┬────────┘                   │
//!     └─────────────────────────────┼────────────────────────────┘
//!                                   │ SensorStore
//!                       ┌───────────┴───────────┐
//!                       ▼                       ▼
//!                ┌─────────────┐         ┌─────────────┐
//!                │ mock store  │   or    │ http store  │
//!                │ (in-memory) │         │ (rest api)  │
//!                └─────────────┘         └─────────────┘
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use garden_monitor::config::{HostConfig, StoreBackend};
use garden_monitor::session::SessionView;
use garden_monitor::{logging, server, HttpSensorStore, MockSensorStore, PollingSession, SensorStore};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: configuration and logging
    let (config, origin) = HostConfig::load_or_default();
    logging::init(&config.logging);
    origin.log();
    config.log_summary();

    // step 2: sensor store
    let store: Arc<dyn SensorStore> = match config.store.backend {
        StoreBackend::Mock => Arc::new(MockSensorStore::seeded(config.latency_profile())),
        StoreBackend::Http => Arc::new(
            HttpSensorStore::new(&config.store.base_url)
                .context("failed to configure http sensor store")?,
        ),
    };

    // step 3: polling session
    let session = Arc::new(PollingSession::with_tokio(store, config.session_options()));
    if config.logging.show_sensor_data {
        tokio::spawn(log_snapshots(session.subscribe()));
    }
    session.start();

    // step 4: web server until ctrl-c
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "dashboard api listening");

    let result = server::serve(listener, session.clone(), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await;

    session.stop();
    result
}

/// echo every new snapshot, one line per sensor
async fn log_snapshots(mut views: tokio::sync::watch::Receiver<SessionView>) {
    let mut last = None;
    while views.changed().await.is_ok() {
        let snapshot = views.borrow_and_update().snapshot.clone();
        if last.as_ref() == Some(&snapshot) {
            continue;
        }
        for reading in snapshot.readings() {
            tracing::info!(
                sensor = %reading.sensor_id,
                value = reading.value,
                unit = %reading.unit,
                status = ?reading.status,
                "reading"
            );
        }
        last = Some(snapshot);
    }
}
