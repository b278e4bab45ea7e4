use crate::connection::ConnectionEvent;
use std::collections::HashMap;
use std::num::Wrapping;
use system::ConnectionId;
use tokio::sync::mpsc::error::TrySendError;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ConnectionEvent>;

/// Result of handing one event to one connection's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The queue was full and the event was dropped for this connection only.
    Dropped,
    /// The connection is gone and should be reaped.
    Closed,
    Unknown,
}

/// Outbound queues of every live connection, keyed by the id handed out on connect.
pub struct ConnectionTxStorage {
    connection_id_source: Wrapping<ConnectionId>,
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_id_source: Wrapping(0),
            connection_txs: HashMap::new(),
        }
    }

    pub fn connect(&mut self, tx: ConnectionTx) -> ConnectionId {
        let connection_id = self.new_connection_id();
        self.connection_txs.insert(connection_id, tx);
        connection_id
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(connection_id)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connection_txs.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connection_txs.len()
    }

    pub fn send(&mut self, to: &ConnectionId, event: ConnectionEvent) -> Delivery {
        if let Some(tx) = self.connection_txs.get_mut(to) {
            match tx.try_send(event) {
                Ok(()) => Delivery::Queued,
                Err(TrySendError::Full(_)) => {
                    log::warn!("Outbound queue of connection {} is full, dropping", to);
                    Delivery::Dropped
                }
                Err(TrySendError::Closed(_)) => Delivery::Closed,
            }
        } else {
            log::warn!("Tried to send to unknown connection {}", to);
            Delivery::Unknown
        }
    }

    /// Queues `event` for every connection but `without`. Returns the connections found closed.
    pub fn broadcast(&mut self, event: &ConnectionEvent, without: &ConnectionId) -> Vec<ConnectionId> {
        let targets = self
            .connection_txs
            .keys()
            .filter(|connection_id| *connection_id != without)
            .copied()
            .collect::<Vec<_>>();

        targets
            .into_iter()
            .filter(|connection_id| self.send(connection_id, event.clone()) == Delivery::Closed)
            .collect()
    }

    /// Skips ids still in use, so a wrapped counter never aliases a live connection.
    fn new_connection_id(&mut self) -> ConnectionId {
        loop {
            self.connection_id_source += Wrapping(1);
            let candidate = self.connection_id_source.0;
            if !self.connection_txs.contains_key(&candidate) {
                break candidate;
            }
        }
    }
}

impl Default for ConnectionTxStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use system::ServerMessage;
    use tokio::sync::mpsc::channel;

    fn event(name: &str) -> ConnectionEvent {
        ConnectionEvent::ServerMessage(ServerMessage::NameAssigned(name.into()))
    }

    #[test]
    fn it_hands_out_distinct_ids() {
        let mut storage = ConnectionTxStorage::new();
        let (tx, _rx) = channel(1);
        let first = storage.connect(tx.clone());
        let second = storage.connect(tx);
        assert_ne!(first, second);
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn it_skips_live_ids_after_wrapping() {
        let mut storage = ConnectionTxStorage::new();
        let (tx, _rx) = channel(1);
        let first = storage.connect(tx.clone());
        storage.connection_id_source = Wrapping(first.wrapping_sub(1));
        let next = storage.connect(tx);
        assert_eq!(next, first + 1);
    }

    #[test]
    fn it_reports_full_and_closed_queues() {
        let mut storage = ConnectionTxStorage::new();
        let (tx, rx) = channel(1);
        let id = storage.connect(tx);

        assert_eq!(storage.send(&id, event("a")), Delivery::Queued);
        assert_eq!(storage.send(&id, event("b")), Delivery::Dropped);
        drop(rx);
        assert_eq!(storage.send(&id, event("c")), Delivery::Closed);
        assert_eq!(storage.send(&(id + 1), event("d")), Delivery::Unknown);
    }

    #[test]
    fn it_broadcasts_to_everyone_but_origin() {
        let mut storage = ConnectionTxStorage::new();
        let (origin_tx, mut origin_rx) = channel(4);
        let (peer_tx, mut peer_rx) = channel(4);
        let (gone_tx, gone_rx) = channel(4);
        let origin = storage.connect(origin_tx);
        storage.connect(peer_tx);
        let gone = storage.connect(gone_tx);
        drop(gone_rx);

        let closed = storage.broadcast(&event("stroke"), &origin);
        assert_eq!(closed, vec![gone]);
        assert!(peer_rx.try_recv().is_ok());
        assert!(origin_rx.try_recv().is_err());
    }
}
