use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::models::Alert;
use crate::auth::AuthGateway;
use crate::error::Result;
use crate::history::{Reading, ReadingHistory};
use crate::live::{ChannelEvent, ConnectionState, PushEnvelope};

/// Envelope kind that carries a sensor reading.
const NOTIFICATION: &str = "notification";

/// Seed value for the two initial chart points, in °C.
const SEED_VALUE: f64 = 24.0;

/// Dashboard views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Temperature,
    Alerts,
}

/// Shared dashboard state: the reading history fed by pushes, the alert list
/// fed by pulls, and the channel's connection state.
///
/// Cheaply cloneable (`Arc` inside) so display code and the synchronizer task
/// can hold the same handle. The two collections are independently sourced
/// and only eventually consistent with each other; neither update path ever
/// drops data the other produced.
#[derive(Clone)]
pub struct DashboardState {
    inner: Arc<StateInner>,
}

struct StateInner {
    history: RwLock<ReadingHistory>,
    alerts: RwLock<Vec<Alert>>,
    connection: RwLock<ConnectionState>,
    /// Ticket counter for alert refreshes
    refresh_seq: AtomicU64,
    /// Highest refresh ticket whose response has been applied
    applied_seq: AtomicU64,
}

impl DashboardState {
    /// State with the conventional two seed points at 24 °C.
    pub fn new(history_capacity: usize) -> Self {
        let now = Utc::now();
        Self::with_history(ReadingHistory::with_seed(
            history_capacity,
            [
                Reading { timestamp: now, value: SEED_VALUE },
                Reading { timestamp: now, value: SEED_VALUE },
            ],
        ))
    }

    pub fn with_history(history: ReadingHistory) -> Self {
        Self {
            inner: Arc::new(StateInner {
                history: RwLock::new(history),
                alerts: RwLock::new(Vec::new()),
                connection: RwLock::new(ConnectionState::Disconnected),
                refresh_seq: AtomicU64::new(0),
                applied_seq: AtomicU64::new(0),
            }),
        }
    }

    pub async fn history(&self) -> Vec<Reading> {
        self.inner.history.read().await.snapshot()
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.inner.alerts.read().await.clone()
    }

    pub async fn connection(&self) -> ConnectionState {
        *self.inner.connection.read().await
    }

    pub async fn append_reading(&self, reading: Reading) {
        self.inner.history.write().await.append(reading);
    }

    pub async fn set_connection(&self, state: ConnectionState) {
        *self.inner.connection.write().await = state;
    }

    /// Take a refresh ticket. Tickets are strictly increasing, so responses
    /// can be applied in issue order regardless of completion order.
    pub fn begin_refresh(&self) -> u64 {
        self.inner.refresh_seq.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Replace the alert list wholesale — unless a response with a newer
    /// ticket already landed, in which case this stale one is discarded.
    /// Returns whether the list was replaced.
    pub async fn complete_refresh(&self, seq: u64, alerts: Vec<Alert>) -> bool {
        let mut guard = self.inner.alerts.write().await;
        if seq <= self.inner.applied_seq.load(Ordering::Acquire) {
            debug!(seq, "discarding stale alert refresh");
            return false;
        }
        *guard = alerts;
        self.inner.applied_seq.store(seq, Ordering::Release);
        true
    }
}

/// Merges the two update sources into [`DashboardState`]: push-received
/// readings are appended to the history, and every push (plus the first visit
/// to the alerts tab) re-pulls the alert list from the gateway.
pub struct Synchronizer {
    state: DashboardState,
    gateway: Arc<dyn AuthGateway>,
    user_id: Uuid,
}

impl Synchronizer {
    pub fn new(state: DashboardState, gateway: Arc<dyn AuthGateway>, user_id: Uuid) -> Self {
        Self { state, gateway, user_id }
    }

    /// Consumes channel events serially until the sender side is dropped.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self, mut events: mpsc::Receiver<ChannelEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("live channel event stream ended");
    }

    pub async fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connecting => {
                self.state.set_connection(ConnectionState::Connecting).await;
            }
            ChannelEvent::Open => {
                self.state.set_connection(ConnectionState::Connected).await;
            }
            ChannelEvent::Closed => {
                // Known history and alerts survive a dropped channel.
                self.state.set_connection(ConnectionState::Disconnected).await;
            }
            ChannelEvent::Push(envelope) => self.on_push(envelope).await,
        }
    }

    /// Handle one push. Notifications append a reading; every envelope kind,
    /// recognized or not, then invalidates the pulled alert list.
    pub async fn on_push(&self, envelope: PushEnvelope) {
        if envelope.kind == NOTIFICATION {
            match envelope.data {
                Some(data) => {
                    info!(value = data.estado, "reading received");
                    self.state
                        .append_reading(Reading {
                            timestamp: data.activacion,
                            value: data.estado,
                        })
                        .await;
                }
                None => warn!("notification without data payload"),
            }
        } else {
            debug!(kind = %envelope.kind, "ignoring push payload");
        }

        if let Err(e) = self.refresh_alerts().await {
            warn!(error = %e, "alert refresh failed; keeping previous list");
        }
    }

    /// Pull the full alert list and replace the cached one. Overlapping
    /// refreshes are allowed; ticket ordering keeps a slow early response
    /// from clobbering a newer one. A failed pull leaves the list untouched.
    pub async fn refresh_alerts(&self) -> Result<bool> {
        let seq = self.state.begin_refresh();
        let alerts = self.gateway.alerts(self.user_id).await?;
        Ok(self.state.complete_refresh(seq, alerts).await)
    }

    /// View switch. The alerts tab fetches only on first visit while the
    /// list is still empty; afterwards pushes keep it current.
    pub async fn select_tab(&self, tab: Tab) {
        if tab == Tab::Alerts && self.state.alerts().await.is_empty() {
            if let Err(e) = self.refresh_alerts().await {
                warn!(error = %e, "initial alert fetch failed");
            }
        }
    }
}
