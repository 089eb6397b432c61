use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::{signal, sync::mpsc, time};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fireguard::{
    api::ApiClient,
    auth::{AuthGateway, AuthService, HttpAuthGateway},
    config::Config,
    dashboard::{DashboardState, Synchronizer},
    live::LiveChannel,
    session::{FileSessionStore, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent — env vars may be set externally)
    let _ = dotenvy::dotenv();

    // Initialise tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env()?;

    // Session store, gateway client, auth flows
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&config.session_file));
    let client = ApiClient::new(
        config.api_base_url.clone(),
        store.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let gateway: Arc<dyn AuthGateway> = Arc::new(HttpAuthGateway::new(client));
    let auth = AuthService::new(gateway.clone(), store);

    // Resume the stored session, or log in with configured credentials.
    // An invalid stored token reads as "no session" (fail-safe logout).
    let user = match auth.current_user().await {
        Some(user) => user,
        None => match (&config.login_email, &config.login_password) {
            (Some(email), Some(password)) => auth.login(email, password).await?,
            _ => bail!("no stored session; set LOGIN_EMAIL and LOGIN_PASSWORD to authenticate"),
        },
    };
    info!(username = %user.username, "session established");

    // Shared dashboard state and the synchronizer consuming channel events
    let state = DashboardState::new(config.history_capacity);
    let (events_tx, events_rx) = mpsc::channel(64);

    {
        let channel = LiveChannel::new(
            config.ws_url.clone(),
            user.id,
            events_tx,
            Duration::from_secs(config.reconnect_base_secs),
            Duration::from_secs(config.reconnect_max_secs),
        );
        tokio::spawn(channel.run());
    }

    {
        let synchronizer = Synchronizer::new(state.clone(), gateway, user.id);
        tokio::spawn(synchronizer.run(events_rx));
    }

    // Periodic status log so a headless run shows what the dashboard holds
    {
        let state = state.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                let history = state.history().await;
                let latest = history.last().map(|r| r.value);
                let connection = state.connection().await;
                let alerts = state.alerts().await.len();
                info!(
                    connection = ?connection,
                    readings = history.len(),
                    latest_temp = ?latest,
                    alerts,
                    "dashboard status"
                );
            }
        });
    }

    shutdown_signal().await;
    info!(
        readings = state.history().await.len(),
        alerts = state.alerts().await.len(),
        "shutting down"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
