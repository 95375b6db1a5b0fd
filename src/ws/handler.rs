//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{Outbox, Session};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (session, outbound_rx) = state.game.connect();
    let connection_id = session.id();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();

    run_session(
        session,
        ws_sink,
        ws_stream,
        outbound_rx,
        state.config.input_rate_limit,
    )
    .await;

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    mut session: Session,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: Outbox,
    input_rate_limit: u32,
) {
    let connection_id = session.id();
    let rate_limiter = ConnectionRateLimiter::new(input_rate_limit);

    // Spawn writer task: events and latest room view -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> session state machine
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(connection_id = %connection_id, "Rate limited input message");
                    session.reject("rate_limited", "too many messages");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => session.handle(client_msg),
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                        session.reject("malformed", e.to_string());
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
                session.reject("unsupported", "binary frames are not supported");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection_id = %connection_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Same cleanup for a clean close and an abrupt drop
    session.close();

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
