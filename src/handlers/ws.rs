//! Axum WebSocket handler
//!
//! One WebSocket connection is one conversation session: the upgrade
//! creates the session, bootstrap, pipeline and dispatcher, then pumps
//! frames between the socket and the pipeline until either side closes.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::events::OutboundEvent;
use crate::core::pipeline::{ConversationPipeline, EventDispatcher, dispatcher::AppMessage};
use crate::state::AppState;

const CHANNEL_BUFFER_SIZE: usize = 256;

/// Frames sent back to the client application.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    /// Session established and ready for app messages.
    #[serde(rename = "ready")]
    Ready { session_id: String },
    /// An event from the merged outbound stream.
    #[serde(rename = "event")]
    Event { event: OutboundEvent },
    /// A recoverable error (e.g. an unparseable frame).
    #[serde(rename = "error")]
    Error { message: String },
}

/// WebSocket conversation handler
/// Upgrades the HTTP connection to WebSocket for a conversation session
pub async fn ws_agent_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("WebSocket conversation upgrade requested");
    ws.on_upgrade(move |socket| handle_agent_socket(socket, state))
}

/// Manage one WebSocket conversation session end to end.
async fn handle_agent_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let bootstrap = app_state.new_bootstrap();
    let session_id = bootstrap.session().id().to_string();
    info!(session = %session_id, "WebSocket conversation established");

    let (pipeline, mut out_rx) = ConversationPipeline::spawn(
        bootstrap.session().clone(),
        app_state.classifier.clone(),
        app_state.generator.clone(),
        app_state.config.smart_turn_timeout_ms,
    );
    let mut dispatcher =
        EventDispatcher::new(bootstrap, pipeline, app_state.config.idle_timeout());

    let (message_tx, mut message_rx) = mpsc::channel::<OutgoingMessage>(CHANNEL_BUFFER_SIZE);

    // Outgoing frames: serialize and send, no batching.
    let sender_task = tokio::spawn(async move {
        while let Some(message) = message_rx.recv().await {
            let json_str = match serde_json::to_string(&message) {
                Ok(json_str) => json_str,
                Err(e) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json_str.into())).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    // Pump the pipeline's outbound stream into the socket. Ends when the
    // pipeline shuts down and the last gate/branch sender is dropped.
    let pump_task = {
        let message_tx = message_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                if message_tx
                    .send(OutgoingMessage::Event { event })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        })
    };

    let _ = message_tx
        .send(OutgoingMessage::Ready {
            session_id: session_id.clone(),
        })
        .await;
    dispatcher.on_client_connected().await;

    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                debug!("Received text frame: {} bytes", text.len());
                match serde_json::from_str::<AppMessage>(&text) {
                    Ok(message) => dispatcher.on_app_message(message).await,
                    Err(e) => {
                        warn!("Failed to parse app message: {}", e);
                        let _ = message_tx
                            .send(OutgoingMessage::Error {
                                message: format!("Invalid message format: {e}"),
                            })
                            .await;
                    }
                }
            }
            Ok(Message::Binary(data)) => {
                debug!("Ignoring binary frame: {} bytes", data.len());
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session = %session_id, "WebSocket closed by client");
                break;
            }
            Err(e) => {
                warn!(session = %session_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    dispatcher.on_disconnected();
    pump_task.abort();
    sender_task.abort();
    info!(session = %session_id, "WebSocket conversation terminated");
}
