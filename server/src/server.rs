use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use system::serde_json::Value;
use system::{validate_drawing, ClientMessage, ConnectionId, NameSubmission, ServerMessage};

use super::connection::{ConnectionCommand, ConnectionEvent};
use crate::connection_tx_storage::{ConnectionTxStorage, Delivery};
use crate::session_registry::SessionRegistry;

pub type ServerTx = UnboundedSender<ConnectionCommand>;

/// Owns every piece of shared state. Only the task started by `spawn_server` touches it, so
/// commands from all connections are applied one at a time, in arrival order.
struct Server {
    registry: SessionRegistry,
    connections: ConnectionTxStorage,
}

impl Server {
    fn new() -> Self {
        Self {
            registry: SessionRegistry::new(),
            connections: ConnectionTxStorage::new(),
        }
    }

    fn handle_connection_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { tx } => {
                let connection_id = self.connections.connect(tx);
                log::info!(
                    "Connection {} established ({} live)",
                    connection_id,
                    self.connections.len()
                );
                self.send(connection_id, ConnectionEvent::Connected { connection_id });
            }
            ConnectionCommand::Disconnect { from } => self.disconnect(&from),
            ConnectionCommand::ClientMessage { from, message } => {
                if self.connections.contains(&from) {
                    self.handle_client_message(from, message);
                } else {
                    log::debug!("Ignoring message from closed connection {}", from);
                }
            }
        }
    }

    fn handle_client_message(&mut self, from: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::SubmitName(NameSubmission { name }) => {
                let assigned = self.registry.submit_name(from, &name);
                self.send(
                    from,
                    ConnectionEvent::ServerMessage(ServerMessage::NameAssigned(assigned)),
                );
            }
            ClientMessage::Drawing(payload) => match validate_drawing(&payload) {
                Ok(stroke) => {
                    log::trace!(
                        "Connection {} ({:?}) drew {:?}",
                        from,
                        self.registry.name_of(&from),
                        stroke
                    );
                    self.route(&from, payload);
                }
                Err(err) => log::debug!("Dropping drawing from connection {}: {}", from, err),
            },
        }
    }

    /// Relays an accepted drawing payload, untouched, to every connection except its origin.
    fn route(&mut self, from: &ConnectionId, payload: Value) {
        let event = ConnectionEvent::ServerMessage(ServerMessage::DrawingData(payload));
        for closed in self.connections.broadcast(&event, from) {
            self.disconnect(&closed);
        }
    }

    fn send(&mut self, to: ConnectionId, event: ConnectionEvent) {
        if self.connections.send(&to, event) == Delivery::Closed {
            self.disconnect(&to);
        }
    }

    fn disconnect(&mut self, connection_id: &ConnectionId) {
        if self.connections.remove(connection_id).is_none() {
            return;
        }
        match self.registry.remove(connection_id) {
            Some(name) => log::info!(
                "Connection {} ({:?}) disconnected, {} names in use",
                connection_id,
                name,
                self.registry.len()
            ),
            None => log::info!("Connection {} disconnected", connection_id),
        }
    }
}

pub fn spawn_server() -> ServerTx {
    let (srv_tx, mut srv_rx) = unbounded_channel::<ConnectionCommand>();

    tokio::spawn(async move {
        let mut server = Box::new(Server::new());

        while let Some(command) = srv_rx.recv().await {
            server.handle_connection_command(command);
        }
        log::info!("Server stopped: every sender is gone");
    });

    srv_tx
}
