use std::{net::SocketAddr, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::SendError};
use uuid::Uuid;

use crate::settings::{Framing, ServerSettings};

#[derive(Debug, Clone)]
pub struct ServerContext {
    pub framing: Framing,
    pub read_buffer_size: usize,
    pub idle_timeout: Option<Duration>,
}

impl ServerContext {
    pub fn new(settings: &ServerSettings, read_buffer_size: usize) -> Self {
        ServerContext {
            framing: settings.framing,
            read_buffer_size,
            idle_timeout: settings.idle_timeout(),
        }
    }
}

/// Sending side of a session's outbound queue. Payloads are fully formatted
/// before they are queued so every recipient gets identical bytes.
#[derive(Debug, Clone)]
pub struct ReplySender(pub mpsc::UnboundedSender<String>);

impl ReplySender {
    pub fn send(&self, payload: String) -> Result<(), SendError<String>> {
        self.0.send(payload)
    }
}

/// What the registry knows about one active session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub connection_id: Uuid,
    pub nickname: String,
    pub connected_at: DateTime<Utc>,
    pub client_host: Option<SocketAddr>,
    pub sender: ReplySender,
}

impl SessionHandle {
    pub fn new(connection_id: Uuid, client_host: Option<SocketAddr>, sender: ReplySender) -> Self {
        SessionHandle {
            connection_id,
            nickname: String::new(),
            connected_at: Utc::now(),
            client_host,
            sender,
        }
    }
}
