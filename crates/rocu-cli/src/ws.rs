use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use rocu_session::{handle_vehicle_text, LinkHandle, SessionState};

/// Per-connection outbound queue depth. An observer that falls this far
/// behind starts missing telemetry updates.
const OUTBOUND_QUEUE: usize = 32;

/// Telemetry observer: receives every normalized frame, anything it sends is ignored.
pub async fn observer_socket(ws: WebSocket, session: Arc<SessionState>) {
    let (mut sender, mut receiver) = ws.split();
    let (link, mut rx) = LinkHandle::channel(OUTBOUND_QUEUE);
    let id = link.id();
    session.add_observer(link);
    info!(observer = id, clients = session.observer_count(), "telemetry observer connected");

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    loop {
        tokio::select! {
            out = rx.recv() => {
                let Some(text) = out else { break };
                if let Err(e) = sender.send(Message::Text(text)).await {
                    debug!(observer = id, "observer send failed: {}", e);
                    break;
                }
            }
            _ = &mut recv_task => break,
        }
    }

    recv_task.abort();
    session.remove_observer(id);
    info!(observer = id, clients = session.observer_count(), "telemetry observer disconnected");
}

/// Vehicle (simulator) link: inbound text is telemetry, outbound is commands.
/// A new vehicle connection replaces the current one.
pub async fn vehicle_socket(ws: WebSocket, session: Arc<SessionState>) {
    let (mut sender, mut receiver) = ws.split();
    let (link, mut rx) = LinkHandle::channel(OUTBOUND_QUEUE);
    let id = link.id();
    if let Some(prev) = session.attach_vehicle(link).await {
        warn!(vehicle = id, replaced = prev.id(), "vehicle link replaced");
    } else {
        info!(vehicle = id, "vehicle connected");
    }

    let inbound = session.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_vehicle_text(&inbound, &text);
                }
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    loop {
        tokio::select! {
            out = rx.recv() => {
                let Some(text) = out else { break };
                if let Err(e) = sender.send(Message::Text(text)).await {
                    debug!(vehicle = id, "vehicle send failed: {}", e);
                    break;
                }
            }
            _ = &mut recv_task => break,
        }
    }

    recv_task.abort();
    if session.detach_vehicle(id).await {
        info!(vehicle = id, "vehicle disconnected");
    }
}
