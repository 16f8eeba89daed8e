//! Connection registry with one ordered outbox per connection

use crate::protocol::ServerMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

pub type ConnectionId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error("Connection {0} is closed")]
    Closed(ConnectionId),
}

pub type HubResult<T> = Result<T, HubError>;

/// Fan-out point for server messages.
///
/// Messages to one connection are delivered in the order they were sent.
/// Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct Hub {
    connections: Arc<Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>>,
    next_id: Arc<AtomicU64>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection; the receiver drains its outbox
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.lock().await.insert(id, tx);
        info!(connection = id, "Client connected");
        (id, rx)
    }

    pub async fn disconnect(&self, id: ConnectionId) {
        if self.connections.lock().await.remove(&id).is_some() {
            info!(connection = id, "Client disconnected");
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn send(&self, id: ConnectionId, message: ServerMessage) -> HubResult<()> {
        let mut connections = self.connections.lock().await;
        let tx = connections.get(&id).ok_or(HubError::UnknownConnection(id))?;
        if tx.send(message).is_err() {
            connections.remove(&id);
            return Err(HubError::Closed(id));
        }
        Ok(())
    }

    /// Queue `message` for every connection except `except`.
    ///
    /// Returns the connections that could not be reached; they are dropped
    /// from the registry.
    pub async fn broadcast(&self, message: &ServerMessage, except: Option<ConnectionId>) -> Vec<ConnectionId> {
        let mut connections = self.connections.lock().await;
        let mut failed = Vec::new();
        let mut delivered = 0;
        for (id, tx) in connections.iter() {
            if Some(*id) == except {
                continue;
            }
            match tx.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => failed.push(*id),
            }
        }

        for id in &failed {
            connections.remove(id);
        }
        debug!(delivered, failed = failed.len(), "Broadcast");
        failed
    }
}
