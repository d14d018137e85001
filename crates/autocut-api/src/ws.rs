//! WebSocket progress subscriptions.
//!
//! `GET /ws/jobs/{id}`: the subscriber first receives a snapshot of the
//! job's current state (the checkpoint), then every future event until the
//! job reaches a terminal state. Protocol pings keep the connection alive;
//! clients echo back.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use autocut_models::{JobId, JobStatus, ProgressMessage};

use crate::metrics;
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket progress endpoint.
pub async fn ws_job_progress(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    metrics::record_ws_connection();
    ws.on_upgrade(move |socket| handle_progress_socket(socket, state, JobId::from_string(job_id)))
}

async fn handle_progress_socket(socket: WebSocket, state: AppState, job_id: JobId) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the snapshot so no event can fall between.
    let mut events = state.hub.subscribe(&job_id);

    let record = match state.store.get(&job_id).await {
        Some(r) => r,
        None => {
            let msg = ProgressMessage::error("job not found");
            let _ = send_json(&mut sender, &msg).await;
            return;
        }
    };

    info!(job_id = %job_id, status = %record.status, "Progress subscriber connected");

    // Checkpoint snapshot.
    let snapshot = snapshot_message(&record);
    let terminal = snapshot.is_terminal();
    if !send_json(&mut sender, &snapshot).await || terminal {
        let _ = sender.close().await;
        return;
    }

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    heartbeat.reset();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(message) => {
                        let terminal = message.is_terminal();
                        if !send_json(&mut sender, &message).await {
                            warn!(job_id = %job_id, "Subscriber send failed, closing");
                            break;
                        }
                        if terminal {
                            break;
                        }
                    }
                    // Coalescing: a lagged subscriber skips to the most
                    // recent events; the terminal one is never dropped.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(job_id = %job_id, skipped, "Subscriber lagged, coalescing");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = heartbeat.tick() => {
                if !send_json(&mut sender, &ProgressMessage::Ping).await {
                    break;
                }
            }
            client = receiver.next() => {
                match client {
                    Some(Ok(Message::Close(_))) | None => {
                        info!(job_id = %job_id, "Subscriber closed connection");
                        break;
                    }
                    // Echoed keepalives and client pongs are both fine.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(job_id = %job_id, error = %e, "Subscriber socket error");
                        break;
                    }
                }
            }
        }
    }

    let _ = sender.close().await;
}

/// Current-state message for a newly connected subscriber.
fn snapshot_message(record: &autocut_models::JobRecord) -> ProgressMessage {
    match &record.status {
        JobStatus::Completed => match &record.report {
            Some(report) => ProgressMessage::result(report.clone()),
            None => ProgressMessage::error("completed job has no report"),
        },
        JobStatus::Failed { reason } => ProgressMessage::error(reason.clone()),
        JobStatus::Cancelled => ProgressMessage::error("cancelled"),
        status => ProgressMessage::progress(status.progress(), record.message.clone()),
    }
}

async fn send_json(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    message: &ProgressMessage,
) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(_) => false,
    }
}
