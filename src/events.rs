// ABOUTME: Transport-agnostic event channel: rooms, named queue events, publisher seam
// ABOUTME: ChannelManager fans events out to connected clients; RecordingPublisher captures them for tests
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Event Channel
//!
//! The coordinator publishes [`QueueEvent`]s to [`Room`]s through the
//! [`EventPublisher`] seam after each committed transition. Delivery is
//! at-most-once and fire-and-forget: a send failure is logged and the
//! disconnected client resynchronizes through `get_tickets` on reconnect.
//!
//! Rooms:
//! - `Room::Company` — staff desks and calling screens of one tenant
//! - `Room::Session` — one anonymous public client
//! - `Room::Desk` — the single connection serving a desk

use crate::models::{Desk, Ticket};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Audience scope for a published event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "room", content = "id", rename_all = "lowercase")]
pub enum Room {
    /// All staff/screen connections of a company
    Company(Uuid),
    /// One anonymous public session
    Session(Uuid),
    /// The connection currently operating a desk
    Desk(Uuid),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Company(id) => write!(f, "company:{id}"),
            Self::Session(id) => write!(f, "session:{id}"),
            Self::Desk(id) => write!(f, "desk:{id}"),
        }
    }
}

/// Named real-time events, serialized with a `type` tag matching the wire
/// names in [`crate::constants::events`].
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueueEvent {
    /// A ticket entered the queue (audience: company staff room)
    #[serde(rename = "ticket-created")]
    TicketCreated { ticket: Ticket },
    /// A ticket was assigned to a desk (audience: the ticket's session)
    #[serde(rename = "ticket-called")]
    TicketCalled { ticket: Ticket, desk_id: Uuid },
    /// A desk started serving a ticket (audience: company room)
    #[serde(rename = "desk-occupied")]
    DeskOccupied { desk: Desk, ticket: Ticket },
    /// The ticket holder signalled they are on their way (audience: serving desk)
    #[serde(rename = "cliente-en-camino")]
    ClienteEnCamino { desk_id: Uuid, ticket_id: Uuid },
    /// Service finished, holder is prompted to score (audience: session)
    #[serde(rename = "ticket-done")]
    TicketDone { ticket: Ticket },
    /// Ticket left the queue before completion (audience: company + session)
    #[serde(rename = "ticket-cancelled")]
    TicketCancelled { ticket_id: Uuid },
}

/// Publisher seam between the coordinator and the transport.
///
/// `publish` must never block or await: the coordinator calls it right
/// after a state mutation commits, sometimes while still holding the
/// per-company lock.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, room: &Room, event: &QueueEvent);
}

/// Outbound message handed to a connection's forwarding task
pub type OutboundEvent = String;

/// Connection handle registered with the channel manager
#[derive(Debug)]
struct Connection {
    tx: mpsc::Sender<OutboundEvent>,
    rooms: HashSet<Room>,
}

/// Fans events out to WebSocket connections, grouped by room.
///
/// Membership mutation happens on (dis)connect; publishes are lock-free
/// sends into each member's bounded outbound buffer. A full buffer drops
/// the event for that client only.
#[derive(Debug, Default)]
pub struct ChannelManager {
    connections: DashMap<Uuid, Connection>,
    rooms: DashMap<Room, HashSet<Uuid>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and its outbound sender. Returns the connection id.
    pub fn connect(&self, tx: mpsc::Sender<OutboundEvent>) -> Uuid {
        let connection_id = Uuid::new_v4();
        self.connections.insert(
            connection_id,
            Connection {
                tx,
                rooms: HashSet::new(),
            },
        );
        debug!(%connection_id, "event channel connection registered");
        connection_id
    }

    /// Join a room. Unknown connection ids are ignored (the socket already closed).
    pub fn join(&self, connection_id: Uuid, room: Room) {
        if let Some(mut conn) = self.connections.get_mut(&connection_id) {
            conn.rooms.insert(room);
        } else {
            return;
        }
        self.rooms.entry(room).or_default().insert(connection_id);
        // A disconnect can interleave between the two map updates above;
        // re-check liveness so the room never keeps a dead connection id
        if !self.connections.contains_key(&connection_id) {
            self.remove_member(&room, connection_id);
            return;
        }
        trace!(%connection_id, %room, "joined room");
    }

    /// Drop a connection and remove it from every room it joined
    pub fn disconnect(&self, connection_id: Uuid) {
        if let Some((_, conn)) = self.connections.remove(&connection_id) {
            for room in &conn.rooms {
                self.remove_member(room, connection_id);
            }
            debug!(%connection_id, "event channel connection removed");
        }
    }

    /// Number of live members in a room
    pub fn room_size(&self, room: &Room) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }

    /// Number of rooms currently tracked (operational visibility)
    pub fn tracked_rooms(&self) -> usize {
        self.rooms.len()
    }

    /// Drop one member from a room, deleting the room entry once empty so
    /// short-lived session rooms do not accumulate
    fn remove_member(&self, room: &Room, connection_id: Uuid) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&connection_id);
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());
    }
}

impl EventPublisher for ChannelManager {
    fn publish(&self, room: &Room, event: &QueueEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(%room, error = %e, "failed to serialize queue event");
                return;
            }
        };

        let Some(members) = self.rooms.get(room) else {
            trace!(%room, "publish to empty room");
            return;
        };

        for connection_id in members.iter() {
            if let Some(conn) = self.connections.get(connection_id) {
                // try_send keeps the publish path non-blocking; a full
                // buffer means the client is too slow and misses the event
                if let Err(e) = conn.tx.try_send(payload.clone()) {
                    debug!(%connection_id, %room, error = %e, "dropping event for slow or closed connection");
                }
            }
        }
    }
}

/// Test double that records every published (room, event) pair in order.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    recorded: Mutex<Vec<(Room, QueueEvent)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far, in publish order
    pub fn events(&self) -> Vec<(Room, QueueEvent)> {
        self.recorded.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        if let Ok(mut g) = self.recorded.lock() {
            g.clear();
        }
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, room: &Room, event: &QueueEvent) {
        if let Ok(mut g) = self.recorded.lock() {
            g.push((*room, event.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ticket;

    fn ticket() -> Ticket {
        Ticket::new(Uuid::new_v4(), 1, Uuid::new_v4(), None)
    }

    #[test]
    fn test_event_wire_names() {
        use crate::constants::events as names;

        let event = QueueEvent::ClienteEnCamino {
            desk_id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], names::CLIENTE_EN_CAMINO);

        let event = QueueEvent::TicketCreated { ticket: ticket() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], names::TICKET_CREATED);
        assert_eq!(json["ticket"]["status"], "WAITING");

        let event = QueueEvent::TicketCancelled {
            ticket_id: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], names::TICKET_CANCELLED);

        let t = ticket();
        let called = serde_json::to_value(QueueEvent::TicketCalled {
            ticket: t.clone(),
            desk_id: Uuid::new_v4(),
        })
        .unwrap();
        assert_eq!(called["type"], names::TICKET_CALLED);
        let occupied = serde_json::to_value(QueueEvent::DeskOccupied {
            desk: Desk::new(t.company_id, "1"),
            ticket: t.clone(),
        })
        .unwrap();
        assert_eq!(occupied["type"], names::DESK_OCCUPIED);
        let done = serde_json::to_value(QueueEvent::TicketDone { ticket: t }).unwrap();
        assert_eq!(done["type"], names::TICKET_DONE);
    }

    #[tokio::test]
    async fn test_room_membership_and_publish() {
        let manager = ChannelManager::new();
        let (tx, mut rx) = mpsc::channel(8);
        let company = Uuid::new_v4();

        let conn = manager.connect(tx);
        manager.join(conn, Room::Company(company));
        assert_eq!(manager.room_size(&Room::Company(company)), 1);

        manager.publish(
            &Room::Company(company),
            &QueueEvent::TicketCancelled {
                ticket_id: Uuid::new_v4(),
            },
        );
        let delivered = rx.recv().await.unwrap();
        assert!(delivered.contains("ticket-cancelled"));

        // Other rooms see nothing
        manager.publish(
            &Room::Session(Uuid::new_v4()),
            &QueueEvent::TicketCancelled {
                ticket_id: Uuid::new_v4(),
            },
        );
        assert!(rx.try_recv().is_err());

        manager.disconnect(conn);
        assert_eq!(manager.room_size(&Room::Company(company)), 0);
    }

    #[test]
    fn test_disconnect_drops_empty_rooms() {
        let manager = ChannelManager::new();
        for _ in 0..100 {
            let (tx, _rx) = mpsc::channel(1);
            let conn = manager.connect(tx);
            manager.join(conn, Room::Session(Uuid::new_v4()));
            manager.disconnect(conn);
        }
        assert_eq!(manager.tracked_rooms(), 0);

        // A room keeps its entry while any member remains
        let (tx_a, _rx_a) = mpsc::channel(1);
        let (tx_b, _rx_b) = mpsc::channel(1);
        let room = Room::Company(Uuid::new_v4());
        let a = manager.connect(tx_a);
        let b = manager.connect(tx_b);
        manager.join(a, room);
        manager.join(b, room);
        manager.disconnect(a);
        assert_eq!(manager.tracked_rooms(), 1);
        assert_eq!(manager.room_size(&room), 1);
        manager.disconnect(b);
        assert_eq!(manager.tracked_rooms(), 0);
    }

    #[test]
    fn test_join_after_disconnect_leaves_no_trace() {
        let manager = ChannelManager::new();
        let (tx, _rx) = mpsc::channel(1);
        let conn = manager.connect(tx);
        manager.disconnect(conn);

        manager.join(conn, Room::Session(Uuid::new_v4()));
        assert_eq!(manager.tracked_rooms(), 0);
    }

    #[test]
    fn test_publish_to_closed_connection_is_silent() {
        let manager = ChannelManager::new();
        let (tx, rx) = mpsc::channel(1);
        let conn = manager.connect(tx);
        let room = Room::Desk(Uuid::new_v4());
        manager.join(conn, room);
        drop(rx);

        // Must not panic or error; the failure is logged only
        manager.publish(
            &room,
            &QueueEvent::TicketCancelled {
                ticket_id: Uuid::new_v4(),
            },
        );
    }
}
