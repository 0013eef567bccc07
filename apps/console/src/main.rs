use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livedeck_console::config::Config;
use livedeck_console::rest::RestClient;
use livedeck_console::ws::WsTransport;
use livedeck_sync::effects::SessionEffect;
use livedeck_sync::session::StreamStatus;
use livedeck_sync::{SessionController, SyncConfig};

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing — env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let rest = Arc::new(RestClient::new(&config.api_url));
    let transport = Arc::new(WsTransport::new(&config.ws_url));

    let sync_config = SyncConfig {
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        moderator: config.moderator,
    };

    let controller = SessionController::new(
        config.stream_id.as_str(),
        sync_config,
        rest.clone(),
        rest.clone(),
        rest,
        transport,
    );

    tracing::info!(
        stream_id = %config.stream_id,
        api_url = %config.api_url,
        moderator = config.moderator,
        "livedeck-console configured"
    );

    let mut effects = controller.subscribe_effects();

    controller
        .start()
        .await
        .expect("failed to open livestream session");

    let session = controller.session();
    tracing::info!(
        view_id = %session.view_id,
        status = ?session.status,
        "session open"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
            effect = effects.recv() => {
                match effect {
                    Ok(SessionEffect::ViewerStatsChanged(stats)) => {
                        tracing::info!(
                            current = stats.current,
                            peak = stats.peak,
                            min = stats.min,
                            "viewers"
                        );
                    }
                    Ok(SessionEffect::SnapshotApplied) => {
                        let (pinned, unpinned) = controller.comment_partitions();
                        let elapsed = controller
                            .session()
                            .elapsed(chrono::Utc::now())
                            .map(|d| d.num_seconds())
                            .unwrap_or(0);
                        tracing::info!(
                            pinned = pinned.len(),
                            unpinned = unpinned.len(),
                            elapsed_secs = elapsed,
                            "session refreshed"
                        );
                    }
                    Ok(SessionEffect::StatusChanged(status)) => {
                        tracing::info!(?status, "stream status changed");
                        if status == StreamStatus::Ended {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "console lagged behind session effects");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    controller.teardown().await;
    tracing::info!("session closed");
}
