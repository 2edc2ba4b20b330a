use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    broadcast::{ConnectionId, ConnectionSet, Delivery},
    message::{ClientEvent, Frame, decode_event, encode_snapshot},
    registry::{Participant, RegisterError, Registry},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct HubOptions {
    /// Treat a connection dropping without an exit event as an implicit leave.
    pub prune_on_close: bool,
}

/// Per-connection state kept by the socket task between events.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    identity: Option<String>,
}

impl Session {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Id of the participant this connection last spoke for, unless it has left.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

/// Outcome of handling one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Left {
        removed: Option<Participant>,
        delivery: Delivery,
    },
    Relayed(Delivery),
    Ignored,
    Malformed,
}

pub struct ChatHub {
    registry: Registry,
    connections: ConnectionSet,
    options: HubOptions,
}

impl ChatHub {
    pub fn new(options: HubOptions) -> Self {
        Self {
            registry: Registry::new(),
            connections: ConnectionSet::new(),
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    /// Registration does not touch the connection set; nobody is notified until
    /// the next join or leave.
    pub async fn register(&self, name: &str) -> Result<Participant, RegisterError> {
        let participant = self.registry.register(name).await?;
        info!(id = %participant.id, name = %participant.name, "participant registered");
        Ok(participant)
    }

    /// Attaches a connection and pushes the current roster to everyone.
    pub async fn join(&self) -> (Session, mpsc::UnboundedReceiver<Frame>) {
        let (id, rx) = self.connections.open();
        let delivery = self
            .registry
            .with_snapshot(|roster| self.publish_roster(roster))
            .await;
        info!(connection = id, recipients = delivery.delivered, "connection joined");
        (
            Session {
                id,
                identity: None,
            },
            rx,
        )
    }

    /// Handles one frame received on `session`'s connection.
    pub async fn dispatch(&self, session: &mut Session, frame: Frame) -> Dispatched {
        let event = match decode_event(&frame) {
            Ok(event) => event,
            Err(err) => {
                warn!(connection = session.id, error = %err, bytes = frame.len(), "dropping malformed frame");
                return Dispatched::Malformed;
            }
        };

        if let Some(id) = event.sender_id() {
            session.identity = Some(id.to_string());
        }

        match event {
            ClientEvent::Leave { user } => {
                let (removed, delivery) = self.leave(&user.id).await;
                session.identity = None;
                Dispatched::Left { removed, delivery }
            }
            ClientEvent::Relay { .. } => {
                let delivery = self.connections.publish(&frame);
                debug!(
                    connection = session.id,
                    recipients = delivery.delivered,
                    "relayed message"
                );
                Dispatched::Relayed(delivery)
            }
            ClientEvent::Unknown => {
                debug!(connection = session.id, "ignoring unrecognised event");
                Dispatched::Ignored
            }
        }
    }

    /// Detaches the connection. With `prune_on_close`, a participant that never
    /// sent an exit event is removed as if it had.
    pub async fn part(&self, session: Session) -> Option<Participant> {
        self.connections.close(session.id);

        let identity = session.identity.filter(|_| self.options.prune_on_close)?;
        let (removed, _) = self.leave(&identity).await;
        if let Some(participant) = &removed {
            info!(connection = session.id, name = %participant.name, "pruned participant after disconnect");
        }
        removed
    }

    async fn leave(&self, id: &str) -> (Option<Participant>, Delivery) {
        let (removed, delivery) = self
            .registry
            .remove_with(id, |roster| self.publish_roster(roster))
            .await;
        match &removed {
            Some(participant) => info!(id, name = %participant.name, "participant left"),
            None => debug!(id, "leave for unknown participant"),
        }
        (removed, delivery)
    }

    fn publish_roster(&self, roster: &[Participant]) -> Delivery {
        match encode_snapshot(roster) {
            Ok(frame) => self.connections.publish(&frame),
            Err(err) => {
                warn!(error = %err, "failed to encode roster");
                Delivery::default()
            }
        }
    }
}
