use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use livepoll_core::AppState;
use livepoll_models::WsEvent;
use tokio::sync::broadcast::error::RecvError;

/// One gateway session: registered on the event bus for its lifetime,
/// pumping bus events out as JSON text frames. Any failure to write, or
/// falling behind the session buffer, drops the connection; the client is
/// expected to reconnect and refresh.
pub(crate) async fn handle_connection(socket: WebSocket, state: AppState) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let mut events = state.event_bus.register_session(&session_id);
    tracing::info!(%session_id, "gateway session opened");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        // Legacy hello frames and other client chatter are
                        // opaque log lines, never parsed.
                        tracing::debug!(%session_id, frame = %text, "ignoring inbound frame");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(%session_id, error = %e, "gateway read error");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let Some(frame) = event_frame(&event) else { continue };
                        if sender.send(Message::Text(frame.into())).await.is_err() {
                            // Transport no longer writable: drop silently,
                            // never surface to the writer that published.
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%session_id, skipped, "session fell behind, dropping it");
                        break;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    state.event_bus.unregister_session(&session_id);
    tracing::info!(%session_id, "gateway session closed");
}

fn event_frame(event: &WsEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::event_frame;
    use livepoll_models::WsEvent;

    #[test]
    fn frames_carry_the_canonical_tagged_shape() {
        let frame = event_frame(&WsEvent::PollDeleted { poll_id: 3, ts: 9 }).expect("frame");
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "poll-deleted");
        assert_eq!(value["pollId"], 3);
    }
}
