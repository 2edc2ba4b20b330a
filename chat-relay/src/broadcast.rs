//! Fan-out of frames to every open connection.
//!
//! Each live WebSocket is represented by a [`Connection`]: the sending half of
//! an unbounded channel drained by that socket's writer task. Publishing only
//! enqueues, so a slow or broken peer never holds up the others.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::message::Frame;

pub type ConnectionId = u64;

/// Returned by [`Outbound::send`] when the peer can no longer receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// Anything the broadcaster can push frames to.
pub trait Outbound {
    fn id(&self) -> ConnectionId;

    fn is_open(&self) -> bool;

    fn send(&self, frame: Frame) -> Result<(), Disconnected>;
}

/// What happened to a single publish across the connection set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Sends `frame` to every open connection, skipping closed ones.
///
/// A failed send is counted and logged; it never stops delivery to the rest.
pub fn broadcast<'a, C, I>(frame: &Frame, connections: I) -> Delivery
where
    C: Outbound + 'a,
    I: IntoIterator<Item = &'a C>,
{
    let mut delivery = Delivery::default();
    for connection in connections {
        if !connection.is_open() {
            delivery.skipped += 1;
            continue;
        }
        match connection.send(frame.clone()) {
            Ok(()) => delivery.delivered += 1,
            Err(Disconnected) => {
                debug!(connection = connection.id(), "dropping frame for closed connection");
                delivery.failed += 1;
            }
        }
    }
    delivery
}

#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Frame>,
}

impl Outbound for Connection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, frame: Frame) -> Result<(), Disconnected> {
        self.tx.send(frame).map_err(|_| Disconnected)
    }
}

/// Every connection currently attached to the relay.
#[derive(Default)]
pub struct ConnectionSet {
    connections: DashMap<ConnectionId, Connection>,
    next_id: AtomicU64,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new connection and returns the receiver its writer drains.
    pub fn open(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Frame>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(id, Connection { id, tx });
        debug!(connection = id, total = self.connections.len(), "connection opened");
        (id, rx)
    }

    pub fn close(&self, id: ConnectionId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            debug!(connection = id, total = self.connections.len(), "connection closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Publishes `frame` to every open connection.
    ///
    /// Senders are cloned out first so no map shard stays locked during sends.
    pub fn publish(&self, frame: &Frame) -> Delivery {
        let targets: Vec<Connection> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        broadcast(frame, &targets)
    }
}
