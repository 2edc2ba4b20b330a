//! Drives one upgraded WebSocket.
//!
//! The socket is split: a writer task owns the sink and drains the
//! connection's channel, while the reader loop below hands every data frame to
//! the hub in the order it arrived.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    broadcast::ConnectionId,
    hub::{ChatHub, Session},
    message::Frame,
};

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(bytes) => Message::Binary(bytes),
        }
    }
}

pub async fn run(socket: WebSocket, hub: Arc<ChatHub>) {
    let (sink, stream) = socket.split();
    let (mut session, outbox) = hub.join().await;
    let connection = session.id();

    let writer = tokio::spawn(write_frames(sink, outbox, connection));
    read_frames(stream, &hub, &mut session).await;

    let pruned = hub.part(session).await;
    writer.abort();

    info!(
        connection,
        pruned = ?pruned.as_ref().map(|participant| participant.name.as_str()),
        "connection ended"
    );
}

async fn read_frames(mut stream: SplitStream<WebSocket>, hub: &ChatHub, session: &mut Session) {
    while let Some(message) = stream.next().await {
        let frame = match message {
            Ok(Message::Text(text)) => Frame::Text(text),
            Ok(Message::Binary(bytes)) => Frame::Binary(bytes),
            // Pongs to client pings are queued by the transport itself.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(reason)) => {
                debug!(connection = session.id(), ?reason, "client closed connection");
                break;
            }
            Err(err) => {
                warn!(connection = session.id(), error = %err, "websocket receive failed");
                break;
            }
        };
        hub.dispatch(session, frame).await;
    }
}

async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbox: mpsc::UnboundedReceiver<Frame>,
    connection: ConnectionId,
) {
    while let Some(frame) = outbox.recv().await {
        if let Err(err) = sink.send(frame.into()).await {
            debug!(connection, error = %err, "failed to deliver frame; closing writer");
            break;
        }
    }
}
