//! Reconnecting consumer for the livepoll gateway.
//!
//! Maintains one logical connection. The transport walks
//! `Disconnected -> Connecting -> Open` and falls back to `Disconnected`
//! on close or error, arming the backoff timer only while waiting for the
//! next attempt. There is no replay of missed events: after every re-open
//! the consumer receives [`ClientEvent::Reconnected`] and is expected to
//! run a one-time authoritative refresh to heal the gap.

use futures_util::{SinkExt, StreamExt};
use livepoll_models::WsEvent;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const BACKOFF_INITIAL_MS: u64 = 1_000;
const BACKOFF_CAP_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Open,
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A canonical gateway event.
    Event(WsEvent),
    /// An untyped frame, tolerated as an opaque log line.
    Legacy(String),
    /// The connection was re-established after a drop. Missed events are
    /// gone; refresh authoritative state now.
    Reconnected,
}

/// Doubling reconnect delay: 1s, 2s, 4s, 8s, then capped at 10s.
#[derive(Debug, Default)]
struct Backoff {
    attempts: u32,
}

impl Backoff {
    fn next_delay(&mut self) -> Duration {
        let ms = BACKOFF_INITIAL_MS
            .saturating_mul(1_u64 << self.attempts.min(10))
            .min(BACKOFF_CAP_MS);
        self.attempts = self.attempts.saturating_add(1);
        Duration::from_millis(ms)
    }

    fn reset(&mut self) {
        self.attempts = 0;
    }
}

fn parse_frame(text: &str) -> ClientEvent {
    match serde_json::from_str::<WsEvent>(text) {
        Ok(event) => ClientEvent::Event(event),
        Err(_) => ClientEvent::Legacy(text.to_string()),
    }
}

pub struct GatewayClient {
    events: mpsc::Receiver<ClientEvent>,
    state: watch::Receiver<TransportState>,
    task: JoinHandle<()>,
}

impl GatewayClient {
    /// Start the connection task. It keeps reconnecting until the client
    /// is dropped.
    pub fn connect(url: impl Into<String>) -> Self {
        let url = url.into();
        let (event_tx, events) = mpsc::channel(64);
        let (state_tx, state) = watch::channel(TransportState::Disconnected);
        let task = tokio::spawn(run(url, event_tx, state_tx));
        Self {
            events,
            state,
            task,
        }
    }

    /// Next event from the gateway; `None` once the task has stopped.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.recv().await
    }

    pub fn transport_state(&self) -> TransportState {
        *self.state.borrow()
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    url: String,
    events: mpsc::Sender<ClientEvent>,
    state: watch::Sender<TransportState>,
) {
    let mut backoff = Backoff::default();
    let mut was_open = false;

    loop {
        let _ = state.send(TransportState::Connecting);
        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                let _ = state.send(TransportState::Open);
                backoff.reset();
                tracing::info!(%url, "gateway connection open");

                if was_open && events.send(ClientEvent::Reconnected).await.is_err() {
                    return;
                }
                was_open = true;

                if pump(stream, &events).await == PumpExit::ConsumerGone {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "gateway connect failed");
            }
        }

        let _ = state.send(TransportState::Disconnected);
        if events.is_closed() {
            return;
        }
        tokio::time::sleep(backoff.next_delay()).await;
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PumpExit {
    Closed,
    ConsumerGone,
}

async fn pump(
    mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: &mpsc::Sender<ClientEvent>,
) -> PumpExit {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if events.send(parse_frame(text.as_str())).await.is_err() {
                    return PumpExit::ConsumerGone;
                }
            }
            Ok(Message::Ping(data)) => {
                if stream.send(Message::Pong(data)).await.is_err() {
                    return PumpExit::Closed;
                }
            }
            Ok(Message::Close(_)) => return PumpExit::Closed,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "gateway read error");
                return PumpExit::Closed;
            }
        }
    }
    PumpExit::Closed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_to_the_cap_and_resets() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 10_000, 10_000]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(1_000));
    }

    #[test]
    fn canonical_frames_parse_into_events() {
        let frame = r#"{"type":"vote-delta","pollId":4,"optionOrder":1,"voterUserId":null,"ts":99}"#;
        match parse_frame(frame) {
            ClientEvent::Event(WsEvent::VoteDelta {
                poll_id,
                option_order,
                voter_user_id,
                ts,
            }) => {
                assert_eq!(poll_id, 4);
                assert_eq!(option_order, 1);
                assert_eq!(voter_user_id, None);
                assert_eq!(ts, 99);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn untyped_frames_fall_back_to_opaque_lines() {
        match parse_frame("Hello from the old frontend!") {
            ClientEvent::Legacy(line) => assert_eq!(line, "Hello from the old frontend!"),
            other => panic!("unexpected parse: {other:?}"),
        }
        // JSON without the tag is still legacy, not an error.
        match parse_frame(r#"{"ping":true}"#) {
            ClientEvent::Legacy(_) => {}
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
