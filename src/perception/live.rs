//! Perception link over the Gemini Live websocket
//!
//! `connect` opens the socket, sends the setup frame and waits for
//! `setupComplete` before handing back a [`PerceptionLink`]. Two pump tasks
//! then move frames between the socket and the link channels; when either
//! side stops, the shared cancellation token stops the other.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::protocol::{
    build_audio_message, build_tool_response_message, parse_server_message, FunctionResponse,
    OutboundMessage, PerceptionEvent, SetupMessage,
};
use crate::config::PerceptionConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error("Failed to connect to perception endpoint: {0}")]
    Connect(String),
    #[error("Perception setup failed: {0}")]
    Setup(String),
    #[error("Perception setupComplete timeout ({0}s)")]
    SetupTimeout(u64),
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sending half of an open perception link
#[derive(Debug, Clone)]
pub struct PerceptionSender {
    outbound: mpsc::Sender<OutboundMessage>,
}

impl PerceptionSender {
    pub fn new(outbound: mpsc::Sender<OutboundMessage>) -> Self {
        Self { outbound }
    }

    /// Queue one audio frame. A full queue drops the frame; returns false then.
    pub fn send_audio(&self, pcm: Vec<u8>) -> bool {
        self.outbound.try_send(OutboundMessage::Audio(pcm)).is_ok()
    }

    pub fn acknowledge(&self, response: FunctionResponse) {
        if let Err(e) = self.outbound.try_send(OutboundMessage::ToolResponse(response)) {
            warn!("Could not queue tool acknowledgement: {}", e);
        }
    }

    pub fn close(&self) {
        let _ = self.outbound.try_send(OutboundMessage::Close);
    }
}

/// An open perception session
#[derive(Debug)]
pub struct PerceptionLink {
    pub sender: PerceptionSender,
    pub events: mpsc::Receiver<PerceptionEvent>,
}

impl PerceptionLink {
    /// Link backed by plain channels, for in-process transports
    pub fn channel_pair() -> (
        PerceptionLink,
        mpsc::Receiver<OutboundMessage>,
        mpsc::Sender<PerceptionEvent>,
    ) {
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let link = PerceptionLink {
            sender: PerceptionSender::new(outbound_tx),
            events: event_rx,
        };
        (link, outbound_rx, event_tx)
    }
}

#[async_trait]
pub trait PerceptionConnector: Send + Sync {
    /// Open a session. Resolves once the endpoint confirmed the setup.
    async fn connect(&self, setup: SetupMessage) -> Result<PerceptionLink, PerceptionError>;
}

pub struct GeminiLiveConnector {
    config: PerceptionConfig,
    api_key: String,
}

impl GeminiLiveConnector {
    pub fn new(config: PerceptionConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.into(),
        }
    }

    async fn await_setup_complete(&self, ws_stream: &mut WsStream) -> Result<(), PerceptionError> {
        let timeout = Duration::from_secs(self.config.setup_timeout_secs);
        let wait = async {
            while let Some(frame) = ws_stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) if text.contains("setupComplete") => return Ok(()),
                    Ok(WsMessage::Binary(data)) if data.first() == Some(&b'{') => {
                        if std::str::from_utf8(&data).map_or(false, |t| t.contains("setupComplete")) {
                            return Ok(());
                        }
                    }
                    Ok(WsMessage::Close(frame)) => {
                        return Err(PerceptionError::Setup(format!(
                            "connection closed before setupComplete: {:?}",
                            frame
                        )));
                    }
                    Err(e) => {
                        return Err(PerceptionError::Setup(format!(
                            "websocket error before setupComplete: {}",
                            e
                        )));
                    }
                    Ok(other) => debug!("Setup phase frame ignored: {:?}", other),
                }
            }
            Err(PerceptionError::Setup("stream ended before setupComplete".to_string()))
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| PerceptionError::SetupTimeout(self.config.setup_timeout_secs))?
    }
}

#[async_trait]
impl PerceptionConnector for GeminiLiveConnector {
    async fn connect(&self, setup: SetupMessage) -> Result<PerceptionLink, PerceptionError> {
        let url = format!("{}?key={}", self.config.ws_url, self.api_key);
        info!("🎙️ Connecting to perception endpoint (model: {})", setup.setup.model);

        let (mut ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| PerceptionError::Connect(e.to_string()))?;

        let setup_json = serde_json::to_string(&setup)?;
        ws_stream
            .send(WsMessage::Text(setup_json))
            .await
            .map_err(|e| PerceptionError::Setup(format!("failed to send setup: {}", e)))?;

        self.await_setup_complete(&mut ws_stream).await?;
        info!("✅ Perception setup complete, streaming audio");

        let (ws_sink, ws_source) = ws_stream.split();
        let (link, outbound_rx, event_tx) = PerceptionLink::channel_pair();
        let cancel = CancellationToken::new();

        tokio::spawn(outbound_loop(outbound_rx, ws_sink, cancel.clone()));
        tokio::spawn(inbound_loop(ws_source, event_tx, cancel));

        Ok(link)
    }
}

async fn outbound_loop(
    mut rx: mpsc::Receiver<OutboundMessage>,
    mut ws_sink: SplitSink<WsStream, WsMessage>,
    cancel: CancellationToken,
) {
    let mut audio_frames: u64 = 0;

    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let json = match msg {
            OutboundMessage::Audio(pcm) => {
                audio_frames += 1;
                perf_trace!("Sending audio frame #{} ({} bytes)", audio_frames, pcm.len());
                serde_json::to_string(&build_audio_message(&pcm))
            }
            OutboundMessage::ToolResponse(response) => {
                debug!("Acknowledging tool call {} ({})", response.id, response.name);
                serde_json::to_string(&build_tool_response_message(&[response]))
            }
            OutboundMessage::Close => {
                let _ = ws_sink.send(WsMessage::Close(None)).await;
                break;
            }
        };

        match json {
            Ok(json) => {
                if ws_sink.send(WsMessage::Text(json)).await.is_err() {
                    warn!("Websocket send failed, stopping outbound loop");
                    break;
                }
            }
            Err(e) => error!("Failed to serialize outbound message: {}", e),
        }
    }

    cancel.cancel();
    debug!("Perception outbound loop terminated after {} audio frames", audio_frames);
}

async fn inbound_loop(
    mut ws_source: SplitStream<WsStream>,
    event_tx: mpsc::Sender<PerceptionEvent>,
    cancel: CancellationToken,
) {
    let close_reason = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break None,
            frame = ws_source.next() => frame,
        };

        let text = match frame {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Binary(data))) if data.first() == Some(&b'{') => {
                match String::from_utf8(data) {
                    Ok(text) => text,
                    Err(_) => continue,
                }
            }
            Some(Ok(WsMessage::Close(frame))) => {
                break frame.map(|f| f.reason.to_string());
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                let _ = event_tx
                    .send(PerceptionEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                cancel.cancel();
                return;
            }
            None => break None,
        };

        for event in parse_server_message(&text) {
            if event_tx.send(event).await.is_err() {
                cancel.cancel();
                return;
            }
        }
    };

    let _ = event_tx
        .send(PerceptionEvent::Closed {
            reason: close_reason,
        })
        .await;
    cancel.cancel();
    debug!("Perception inbound loop terminated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sender_queues_messages_in_order() {
        let (link, mut outbound, _events) = PerceptionLink::channel_pair();

        assert!(link.sender.send_audio(vec![1, 2]));
        link.sender.acknowledge(FunctionResponse {
            id: "c1".to_string(),
            name: "identify_speaker_activity".to_string(),
            response: json!({ "acknowledged": true }),
        });
        link.sender.close();

        assert_eq!(outbound.recv().await, Some(OutboundMessage::Audio(vec![1, 2])));
        assert!(matches!(outbound.recv().await, Some(OutboundMessage::ToolResponse(r)) if r.id == "c1"));
        assert_eq!(outbound.recv().await, Some(OutboundMessage::Close));
    }

    #[tokio::test]
    async fn test_full_queue_drops_audio() {
        let (outbound_tx, _outbound_rx) = mpsc::channel(1);
        let sender = PerceptionSender::new(outbound_tx);

        assert!(sender.send_audio(vec![0; 4]));
        assert!(!sender.send_audio(vec![0; 4]));
    }
}
