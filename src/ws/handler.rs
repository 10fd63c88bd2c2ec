//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::relay::{ConnectionId, HubHandle};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, hub: HubHandle) {
    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<ServerMsg>();

    let connection = match hub.connect(outbound_tx) {
        Ok(connection) => connection,
        Err(e) => {
            error!(error = %e, "Failed to register connection");
            return;
        }
    };
    info!(connection = %connection, "New socket connection");

    // Spawn writer task: outbound queue -> WebSocket
    let writer_handle = tokio::spawn(write_outbound(connection, ws_sink, outbound_rx));

    read_inbound(connection, ws_stream, &hub).await;

    // Cleanup on disconnect
    let _ = hub.disconnect(connection);
    writer_handle.abort();

    info!(connection = %connection, "WebSocket connection closed");
}

/// Writer loop: drains the connection's outbound queue in order
async fn write_outbound(
    connection: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerMsg>,
) {
    while let Some(msg) = outbound_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(connection = %connection, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Reader loop: WebSocket -> hub, preserving per-connection order
async fn read_inbound(
    connection: ConnectionId,
    mut ws_stream: SplitStream<WebSocket>,
    hub: &HubHandle,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let forwarded = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Subscribe(room)) => hub.subscribe(connection, room),
                    Ok(ClientMsg::GameAction(action)) => hub.action(connection, action),
                    Err(e) => {
                        warn!(connection = %connection, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                if forwarded.is_err() {
                    debug!(connection = %connection, "Hub stopped");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection = %connection, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection = %connection, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection = %connection, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection = %connection, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection = %connection, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
