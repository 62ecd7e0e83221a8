//! Bidirectional message channel to the interview backend
//!
//! A [`Connector`] opens a [`Channel`]: an outbound sender of
//! [`ClientMessage`]s and an inbound receiver of [`ServerMessage`]s. The
//! inbound side closing means the connection is gone.

pub mod memory;
pub mod messages;
pub mod ws;

use anyhow::Result;
use tokio::sync::mpsc;

pub use memory::{MemoryBackend, MemoryConnector};
pub use messages::{AlignmentPayload, ClientMessage, ServerMessage, Speaker};
pub use ws::WsConnector;

/// An open connection, exclusively owned by the session controller
pub struct Channel {
    pub outbound: mpsc::Sender<ClientMessage>,
    pub inbound: mpsc::Receiver<ServerMessage>,
}

#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Open the channel
    async fn connect(&self) -> Result<Channel>;

    /// Endpoint description for logging
    fn endpoint(&self) -> &str;
}
