use super::messages::{AudioMessage, ServerMessage, TerminateMessage};
use super::token::TokenProvider;
use crate::error::DictationError;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout_at;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Connection parameters for the streaming transcription service
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// WebSocket endpoint URL
    pub endpoint: String,
    /// Sample rate advertised to the service
    pub sample_rate: u32,
    /// Bound on connect + session-begin acknowledgment
    pub handshake_timeout: Duration,
}

/// Session acknowledgment details from the service
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub expires_at: String,
}

/// Event pushed by the connection reader
#[derive(Debug)]
pub enum StreamEvent {
    Message(ServerMessage),
    /// The connection closed or errored; `reason` is best-effort
    Closed { reason: Option<String> },
}

/// One WebSocket connection to the streaming transcription service.
///
/// Owns the write half; the read half is drained by a background task that
/// pushes decoded messages to the channel handed to `begin`. The client never
/// reconnects mid-session: a reconnect would risk duplicated or lost audio,
/// so a transport failure ends the session and the caller starts a fresh one.
pub struct StreamingClient {
    config: StreamingConfig,
    sink: Option<WsSink>,
    reader_task: Option<JoinHandle<()>>,
    terminated: bool,
}

impl StreamingClient {
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            config,
            sink: None,
            reader_task: None,
            terminated: false,
        }
    }

    /// Open the connection and await the session-begin acknowledgment.
    ///
    /// Fetches one short-lived token, dials the service, and waits for
    /// `SessionBegins` within the handshake timeout. All failures map to
    /// `SessionStart`; the caller retries with a fresh session.
    pub async fn begin(
        &mut self,
        tokens: &dyn TokenProvider,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<SessionInfo, DictationError> {
        let token = tokens.fetch_token().await?;
        let url = format!(
            "{}?sample_rate={}&token={}",
            self.config.endpoint, self.config.sample_rate, token.token
        );

        let deadline = tokio::time::Instant::now() + self.config.handshake_timeout;

        let (ws, _) = timeout_at(deadline, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                DictationError::SessionStart("websocket connect timed out".to_string())
            })?
            .map_err(|e| {
                DictationError::SessionStart(format!("websocket connect failed: {}", e))
            })?;

        let (sink, mut stream) = ws.split();
        self.sink = Some(sink);

        // The service must acknowledge the session before any audio flows.
        let info = loop {
            let msg = timeout_at(deadline, stream.next())
                .await
                .map_err(|_| {
                    DictationError::SessionStart(
                        "timed out waiting for session acknowledgment".to_string(),
                    )
                })?
                .ok_or_else(|| {
                    DictationError::SessionStart(
                        "connection closed before session began".to_string(),
                    )
                })?
                .map_err(|e| {
                    DictationError::SessionStart(format!("handshake failed: {}", e))
                })?;

            match msg {
                Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::SessionBegins {
                        session_id,
                        expires_at,
                    }) => {
                        break SessionInfo {
                            session_id,
                            expires_at,
                        }
                    }
                    Ok(ServerMessage::Error { error }) => {
                        return Err(DictationError::SessionStart(format!(
                            "service refused session: {}",
                            error
                        )))
                    }
                    Ok(_) => warn!("unexpected message before session began"),
                    Err(e) => warn!("unparseable handshake message: {}", e),
                },
                Message::Close(_) => {
                    return Err(DictationError::SessionStart(
                        "connection closed during handshake".to_string(),
                    ))
                }
                _ => {}
            }
        };

        info!(
            "transcription session began: {} (expires {})",
            info.session_id, info.expires_at
        );

        self.reader_task = Some(tokio::spawn(read_loop(stream, events)));

        Ok(info)
    }

    /// Transmit one audio buffer, in arrival order.
    ///
    /// A no-op once the connection is closed or terminate has been issued.
    pub async fn send_audio(&mut self, pcm_base64: &str) -> Result<(), DictationError> {
        if self.terminated {
            return Ok(());
        }
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };

        let payload = serde_json::to_string(&AudioMessage {
            audio_data: pcm_base64,
        })
        .map_err(|e| DictationError::Transport(format!("encode failed: {}", e)))?;

        sink.send(Message::Text(payload))
            .await
            .map_err(|e| DictationError::Transport(format!("audio send failed: {}", e)))
    }

    /// Request graceful closure. No audio is sent after this.
    pub async fn send_terminate(&mut self) -> Result<(), DictationError> {
        self.terminated = true;
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };

        let payload = serde_json::to_string(&TerminateMessage {
            terminate_session: true,
        })
        .map_err(|e| DictationError::Transport(format!("encode failed: {}", e)))?;

        sink.send(Message::Text(payload))
            .await
            .map_err(|e| DictationError::Transport(format!("terminate send failed: {}", e)))
    }

    /// Drop the connection without waiting for acknowledgment.
    pub async fn force_close(&mut self) {
        self.terminated = true;
        if let Some(mut sink) = self.sink.take() {
            let _ = sink.close().await;
        }
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }
}

async fn read_loop(mut stream: WsStream, events: mpsc::Sender<StreamEvent>) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(m) => {
                    if events.send(StreamEvent::Message(m)).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!("skipping unparseable transcription message: {}", e),
            },
            Ok(Message::Close(frame)) => {
                let reason = frame.map(|f| format!("{} {}", f.code, f.reason));
                let _ = events.send(StreamEvent::Closed { reason }).await;
                return;
            }
            Ok(_) => {}
            Err(e) => {
                let _ = events
                    .send(StreamEvent::Closed {
                        reason: Some(e.to_string()),
                    })
                    .await;
                return;
            }
        }
    }
    let _ = events.send(StreamEvent::Closed { reason: None }).await;
}
