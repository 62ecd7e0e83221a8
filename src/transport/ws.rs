use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::messages::{ClientMessage, ServerMessage};
use super::{Channel, Connector};

/// Websocket connection to the interview backend
pub struct WsConnector {
    url: String,
    auth_token: Option<String>,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }
}

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Channel> {
        info!("Connecting to interview backend at {}", self.url);

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .context("Invalid backend URL")?;

        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .context("Invalid auth token")?;
            request.headers_mut().insert("Authorization", value);
        }

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .context("Failed to connect to interview backend")?;

        info!("Connected to interview backend");

        let (mut write, mut read) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientMessage>(100);
        let (inbound_tx, inbound_rx) = mpsc::channel::<ServerMessage>(100);

        // Writer: serializes in send order, so sequence order is preserved
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize {} message: {}", message.event_name(), e);
                        continue;
                    }
                };

                if let Err(e) = write.send(Message::Text(json.into())).await {
                    error!("Failed to send {} message: {}", message.event_name(), e);
                    break;
                }
            }

            if let Err(e) = write.close().await {
                debug!("Websocket close: {}", e);
            }
            debug!("Websocket writer stopped");
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(message) => {
                                if inbound_tx.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Failed to parse server message: {}", e),
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!("Backend closed the connection: {:?}", frame);
                        break;
                    }
                    Ok(Message::Binary(data)) => {
                        warn!("Ignoring {} byte binary frame", data.len());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Websocket receive failed: {}", e);
                        break;
                    }
                }
            }
            debug!("Websocket reader stopped");
        });

        Ok(Channel {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
