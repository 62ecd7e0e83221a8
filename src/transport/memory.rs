use anyhow::{bail, Result};
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::messages::{ClientMessage, ServerMessage};
use super::{Channel, Connector};

/// In-process connector handing out one pre-wired channel
///
/// The opposite ends are returned as a [`MemoryBackend`], which plays the
/// server role.
pub struct MemoryConnector {
    channel: Mutex<Option<Channel>>,
}

/// Server side of a [`MemoryConnector`]
pub struct MemoryBackend {
    pub from_client: mpsc::Receiver<ClientMessage>,
    pub to_client: mpsc::Sender<ServerMessage>,
}

impl MemoryConnector {
    pub fn pair() -> (Self, MemoryBackend) {
        let (outbound_tx, outbound_rx) = mpsc::channel(256);
        let (inbound_tx, inbound_rx) = mpsc::channel(256);

        let connector = Self {
            channel: Mutex::new(Some(Channel {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })),
        };

        let backend = MemoryBackend {
            from_client: outbound_rx,
            to_client: inbound_tx,
        };

        (connector, backend)
    }
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Channel> {
        let channel = match self.channel.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => bail!("Memory connector is poisoned"),
        };

        match channel {
            Some(channel) => Ok(channel),
            None => bail!("Memory channel already used"),
        }
    }

    fn endpoint(&self) -> &str {
        "memory"
    }
}

impl MemoryBackend {
    pub async fn send(&self, message: ServerMessage) -> Result<()> {
        if self.to_client.send(message).await.is_err() {
            bail!("Client side of the memory channel is closed");
        }
        Ok(())
    }

    pub async fn recv(&mut self) -> Option<ClientMessage> {
        self.from_client.recv().await
    }
}
