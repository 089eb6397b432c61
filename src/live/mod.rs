use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Lifecycle of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Inbound push envelope. Only `type == "notification"` carries a reading;
/// other envelope kinds are delivered upstream unchanged so the synchronizer
/// can apply its "any push refreshes alerts" rule.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Option<PushData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushData {
    /// Sensor reading in °C (gateway wire name)
    pub estado: f64,
    /// Activation timestamp, ISO-8601 (gateway wire name)
    pub activacion: chrono::DateTime<chrono::Utc>,
}

/// Events forwarded from the channel task to the synchronizer task.
/// All dashboard state writes happen on the receiving side, so the socket
/// task never touches shared state directly.
#[derive(Debug)]
pub enum ChannelEvent {
    Connecting,
    Open,
    Push(PushEnvelope),
    Closed,
}

/// One push connection per authenticated session, with reconnection.
///
/// The observed protocol: on open the client sends a single plain-text
/// introduction (fire-and-forget, no acknowledgment); thereafter the server
/// pushes JSON envelopes. A drop re-enters `Connecting` after an
/// exponentially backed-off delay, capped and reset on a successful open.
pub struct LiveChannel {
    ws_url: String,
    user_id: Uuid,
    events: mpsc::Sender<ChannelEvent>,
    reconnect_base: Duration,
    reconnect_max: Duration,
}

impl LiveChannel {
    pub fn new(
        ws_url: impl Into<String>,
        user_id: Uuid,
        events: mpsc::Sender<ChannelEvent>,
        reconnect_base: Duration,
        reconnect_max: Duration,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            user_id,
            events,
            reconnect_base,
            reconnect_max,
        }
    }

    /// Runs the connect/reconnect loop until the event receiver is dropped.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self) {
        let mut delay = self.reconnect_base;

        loop {
            if self.events.send(ChannelEvent::Connecting).await.is_err() {
                return;
            }

            match self.serve_connection().await {
                Ok(was_open) => {
                    if was_open {
                        delay = self.reconnect_base;
                    }
                }
                Err(e) => warn!(error = %e, "live channel connection failed"),
            }

            if self.events.send(ChannelEvent::Closed).await.is_err() {
                return;
            }

            debug!(delay_secs = delay.as_secs(), "reconnecting after delay");
            time::sleep(delay).await;
            delay = next_delay(delay, self.reconnect_max);
        }
    }

    /// Dial, introduce ourselves, then pump frames upstream until the
    /// connection drops. Returns whether the handshake ever completed.
    async fn serve_connection(&self) -> Result<bool> {
        let (ws, _) = connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| Error::channel(e.to_string()))?;
        info!(url = %self.ws_url, "live channel connected");

        let (mut write, mut read) = ws.split();

        // Introduction is fire-and-forget; the server never acknowledges it.
        let intro = format!("client connected: {}", self.user_id);
        if let Err(e) = write.send(Message::Text(intro.into())).await {
            return Err(Error::channel(e.to_string()));
        }

        if self.events.send(ChannelEvent::Open).await.is_err() {
            return Ok(true);
        }

        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<PushEnvelope>(text.as_str()) {
                    Ok(envelope) => {
                        if self.events.send(ChannelEvent::Push(envelope)).await.is_err() {
                            return Ok(true);
                        }
                    }
                    Err(e) => warn!(error = %e, "dropping unparseable push frame"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {} // ping/pong handled by tungstenite, binary ignored
                Err(e) => return Err(Error::channel(e.to_string())),
            }
        }

        info!("live channel closed by server");
        Ok(true)
    }
}

/// Exponential backoff step, capped at `max`.
fn next_delay(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::accept_async;

    #[test]
    fn backoff_doubles_until_capped() {
        let max = Duration::from_secs(60);
        let mut d = Duration::from_secs(1);
        let mut observed = Vec::new();
        for _ in 0..8 {
            d = next_delay(d, max);
            observed.push(d.as_secs());
        }
        assert_eq!(observed, vec![2, 4, 8, 16, 32, 60, 60, 60]);
    }

    #[test]
    fn notification_envelope_parses_wire_names() {
        let json = r#"{"type":"notification","data":{"estado":31,"activacion":"2024-01-01T10:00:00Z"}}"#;
        let envelope: PushEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.kind, "notification");
        let data = envelope.data.unwrap();
        assert_eq!(data.estado, 31.0);
        assert_eq!(data.activacion.to_rfc3339(), "2024-01-01T10:00:00+00:00");
    }

    #[test]
    fn envelope_without_data_still_parses() {
        let envelope: PushEnvelope =
            serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(envelope.kind, "heartbeat");
        assert!(envelope.data.is_none());
    }

    /// Full exchange against a one-shot in-process websocket server:
    /// dial → intro received → notification pushed → server closes.
    #[tokio::test]
    async fn channel_introduces_itself_and_forwards_pushes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            let intro = ws.next().await.unwrap().unwrap();
            let intro_text = match intro {
                Message::Text(t) => t.as_str().to_owned(),
                other => panic!("expected text intro, got {other:?}"),
            };

            ws.send(Message::Text(
                r#"{"type":"notification","data":{"estado":31,"activacion":"2024-01-01T10:00:00Z"}}"#
                    .into(),
            ))
            .await
            .unwrap();
            ws.send(Message::Close(None)).await.unwrap();

            intro_text
        });

        let user_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(16);
        let channel = LiveChannel::new(
            format!("ws://{addr}"),
            user_id,
            tx,
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let runner = tokio::spawn(channel.run());

        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connecting)));
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Open)));

        match rx.recv().await {
            Some(ChannelEvent::Push(envelope)) => {
                assert_eq!(envelope.kind, "notification");
                assert_eq!(envelope.data.unwrap().estado, 31.0);
            }
            other => panic!("expected push, got {other:?}"),
        }
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Closed)));

        let intro_text = server.await.unwrap();
        assert_eq!(intro_text, format!("client connected: {user_id}"));

        // Dropping the receiver stops the reconnect loop.
        drop(rx);
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn dial_failure_reports_closed_and_retries() {
        // Nothing is listening on this port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::channel(16);
        let channel = LiveChannel::new(
            format!("ws://{addr}"),
            Uuid::new_v4(),
            tx,
            Duration::from_millis(10),
            Duration::from_millis(40),
        );
        let runner = tokio::spawn(channel.run());

        // First attempt: Connecting then Closed, no Open in between.
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connecting)));
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Closed)));
        // Supervisor re-enters Connecting on its own.
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Connecting)));

        drop(rx);
        runner.await.unwrap();
    }
}
