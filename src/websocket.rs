// ABOUTME: WebSocket transport for the event channel: upgrade, hello handshake, room membership
// ABOUTME: Forwards room traffic to each connection and cleans up membership on disconnect
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # WebSocket integration
//!
//! Every client (kiosk, assistant desk, calling screen) opens one socket
//! and sends a hello naming who it is:
//!
//! - `hello-staff` with a staff JWT (and optionally the desk it operates)
//!   joins the company room and the desk room
//! - `hello-public` with a session id and a company id joins the session
//!   room and the company room (the calling screen renders company events)
//!
//! After the hello the traffic is one-way: serialized [`QueueEvent`]s
//! published by the coordinator. Delivery is at-most-once; a reconnecting
//! client re-reads state through `GET /api/public/tickets`.
//!
//! [`QueueEvent`]: crate::events::QueueEvent

use crate::auth::AuthManager;
use crate::constants::limits;
use crate::events::{ChannelManager, Room};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Messages a client may send over the socket
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WsClientMessage {
    /// Staff hello: JWT plus the desk this connection operates, if any
    #[serde(rename = "hello-staff")]
    HelloStaff {
        token: String,
        #[serde(default)]
        desk_id: Option<Uuid>,
    },
    /// Public hello: anonymous session joining its company's screen feed
    #[serde(rename = "hello-public")]
    HelloPublic { session_id: Uuid, company_id: Uuid },
}

/// Control messages the server sends outside of queue events
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum WsServerMessage {
    #[serde(rename = "welcome")]
    Welcome { rooms: Vec<String> },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Handle one upgraded WebSocket for its whole lifetime
pub async fn handle_connection(
    socket: WebSocket,
    channels: Arc<ChannelManager>,
    auth: Arc<AuthManager>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(limits::CONNECTION_SEND_BUFFER);

    let connection_id = channels.connect(tx.clone());

    // Forward room traffic to the peer until it goes away
    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_tx.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&text, connection_id, &channels, &auth, &tx);
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    send_task.abort();
    channels.disconnect(connection_id);
    debug!(%connection_id, "websocket closed");
}

fn handle_client_message(
    text: &str,
    connection_id: Uuid,
    channels: &ChannelManager,
    auth: &AuthManager,
    tx: &mpsc::Sender<String>,
) {
    let parsed: WsClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            send_control(
                tx,
                &WsServerMessage::Error {
                    message: format!("invalid message: {e}"),
                },
            );
            return;
        }
    };

    match parsed {
        WsClientMessage::HelloStaff { token, desk_id } => match auth.validate(&token) {
            Ok(claims) => {
                let mut rooms = Vec::new();
                if let Some(company_id) = claims.company_id {
                    let room = Room::Company(company_id);
                    channels.join(connection_id, room);
                    rooms.push(room.to_string());
                }
                if let Some(desk_id) = desk_id {
                    let room = Room::Desk(desk_id);
                    channels.join(connection_id, room);
                    rooms.push(room.to_string());
                }
                trace!(%connection_id, staff = %claims.sub, "staff hello accepted");
                send_control(tx, &WsServerMessage::Welcome { rooms });
            }
            Err(e) => {
                warn!(%connection_id, error = %e, "staff hello rejected");
                send_control(
                    tx,
                    &WsServerMessage::Error {
                        message: e.message,
                    },
                );
            }
        },
        WsClientMessage::HelloPublic {
            session_id,
            company_id,
        } => {
            let session_room = Room::Session(session_id);
            let company_room = Room::Company(company_id);
            channels.join(connection_id, session_room);
            channels.join(connection_id, company_room);
            send_control(
                tx,
                &WsServerMessage::Welcome {
                    rooms: vec![session_room.to_string(), company_room.to_string()],
                },
            );
        }
    }
}

fn send_control(tx: &mpsc::Sender<String>, message: &WsServerMessage) {
    match serde_json::to_string(message) {
        Ok(json) => {
            if tx.try_send(json).is_err() {
                debug!("control message dropped, connection buffer full or closed");
            }
        }
        Err(e) => warn!(error = %e, "failed to serialize control message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let session = Uuid::new_v4();
        let company = Uuid::new_v4();
        let json = format!(
            r#"{{"type":"hello-public","session_id":"{session}","company_id":"{company}"}}"#
        );
        let msg: WsClientMessage = serde_json::from_str(&json).unwrap();
        match msg {
            WsClientMessage::HelloPublic {
                session_id,
                company_id,
            } => {
                assert_eq!(session_id, session);
                assert_eq!(company_id, company);
            }
            WsClientMessage::HelloStaff { .. } => panic!("wrong variant"),
        }

        let json = r#"{"type":"hello-staff","token":"abc"}"#;
        let msg: WsClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            WsClientMessage::HelloStaff { token, desk_id } => {
                assert_eq!(token, "abc");
                assert!(desk_id.is_none());
            }
            WsClientMessage::HelloPublic { .. } => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_server_message_wire_shape() {
        let msg = WsServerMessage::Welcome {
            rooms: vec!["company:x".into()],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "welcome");
    }
}
