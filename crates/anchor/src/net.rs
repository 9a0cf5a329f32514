//! Point-to-point peer channel
//!
//! The collection round needs exactly one primitive from the network:
//! send a tagged payload to a peer and wait for its reply. Leaders use
//! [`WsPeerChannel`]; every validator runs a [`PeerServer`] that
//! dispatches inbound requests to registered handlers by protocol tag.
//! Sender authentication is the transport's concern.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use borsh::{BorshDeserialize, BorshSerialize};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, connect_async, tungstenite::Message};

/// Default bound on one request/response exchange
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type HandlerMap = Arc<RwLock<HashMap<String, Arc<dyn RequestHandler>>>>;

#[derive(BorshSerialize, BorshDeserialize)]
struct RequestEnvelope {
    protocol: String,
    payload: Vec<u8>,
}

/// Request/response primitive consumed by the signature collector
#[async_trait]
pub trait PeerChannel: Send + Sync {
    async fn request(&self, addr: &str, protocol: &str, payload: &[u8])
        -> anyhow::Result<Vec<u8>>;
}

/// Handles one protocol's inbound requests on the server side
pub trait RequestHandler: Send + Sync {
    fn handle(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Websocket-backed peer channel, one connection per request
pub struct WsPeerChannel {
    timeout: Duration,
}

impl WsPeerChannel {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for WsPeerChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerChannel for WsPeerChannel {
    async fn request(
        &self,
        addr: &str,
        protocol: &str,
        payload: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        let url = format!("ws://{addr}");
        let exchange = async {
            let (ws_stream, _) = connect_async(&url).await?;
            let (mut sender, mut receiver) = ws_stream.split();

            let envelope = borsh::to_vec(&RequestEnvelope {
                protocol: protocol.to_string(),
                payload: payload.to_vec(),
            })?;
            sender.send(Message::Binary(envelope)).await?;

            while let Some(msg) = receiver.next().await {
                match msg? {
                    Message::Binary(data) => return Ok(data),
                    Message::Close(_) => bail!("peer closed before replying"),
                    _ => {}
                }
            }
            bail!("connection ended before reply")
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| anyhow!("request to {addr} timed out"))?
    }
}

/// Accepts peer connections and dispatches requests by protocol tag
pub struct PeerServer {
    handlers: HandlerMap,
}

impl PeerServer {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register(&self, protocol: &str, handler: Arc<dyn RequestHandler>) {
        self.handlers.write().insert(protocol.to_string(), handler);
    }

    /// Start listening; returns once the listener is bound.
    pub async fn start(&self, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("peer server listening on {}", addr);

        let handlers = self.handlers.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        let handlers = handlers.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_peer_connection(stream, handlers).await {
                                tracing::warn!("peer connection from {} failed: {}", peer_addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("accept error: {}", e);
                    }
                }
            }
        });

        Ok(())
    }
}

impl Default for PeerServer {
    fn default() -> Self {
        Self::new()
    }
}

async fn serve_peer_connection(stream: TcpStream, handlers: HandlerMap) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut sender, mut receiver) = ws_stream.split();

    while let Some(msg) = receiver.next().await {
        match msg? {
            Message::Binary(data) => {
                let envelope: RequestEnvelope = match borsh::from_slice(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::warn!("dropping malformed request envelope: {}", e);
                        continue;
                    }
                };
                let handler = handlers.read().get(&envelope.protocol).cloned();
                match handler {
                    Some(handler) => match handler.handle(&envelope.payload) {
                        Ok(reply) => sender.send(Message::Binary(reply)).await?,
                        Err(e) => {
                            tracing::warn!("handler for {} failed: {:#}", envelope.protocol, e);
                        }
                    },
                    None => {
                        tracing::warn!("no handler registered for {}", envelope.protocol);
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}
