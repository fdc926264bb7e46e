use crate::agent::{ ChatSession, RenderError, RenderSink, TurnOutcome };
use crate::llm::chat::{ ChatClient, ChatError };
use crate::models::chat::Turn;
use crate::models::websocket::{ ClientMessage, ServerMessage };

use std::error::Error;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::{ TcpListener, TcpStream };
use tokio::io::{ AsyncRead, AsyncWrite };

use tokio_tungstenite::{ accept_async, WebSocketStream };
use tokio_tungstenite::tungstenite::protocol::Message;

use lazy_static::lazy_static;
use governor::{ RateLimiter, Quota, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };

use log::{ info, warn, error, debug };
use futures::stream::SplitSink;
use futures::{ SinkExt, StreamExt };

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;

lazy_static! {
    static ref CONNECTION_LIMITER: RateLimiter<NotKeyed, InMemoryState, DefaultClock> =
        RateLimiter::direct(Quota::per_second(NonZeroU32::new(10).unwrap()));
}

/// Paints a session's turns onto one websocket connection.
struct WebSocketSink<S> {
    tx: SplitSink<WebSocketStream<S>, Message>,
}

impl<S> WebSocketSink<S> where S: AsyncRead + AsyncWrite + Unpin + Send {
    async fn send(&mut self, msg: &ServerMessage) -> Result<(), RenderError> {
        let json = serde_json::to_string(msg)?;
        self.tx.send(Message::Text(json)).await?;
        Ok(())
    }
}

#[async_trait]
impl<S> RenderSink for WebSocketSink<S> where S: AsyncRead + AsyncWrite + Unpin + Send {
    async fn render(&mut self, turn: &Turn) -> Result<(), RenderError> {
        self.send(&ServerMessage::from(turn)).await
    }

    async fn render_processing(&mut self) -> Result<(), RenderError> {
        self.send(&ServerMessage::Processing).await
    }

    async fn render_failure(&mut self, error: &ChatError) -> Result<(), RenderError> {
        self.send(&(ServerMessage::Error {
            message: format!("Error processing message: {}", error),
        })).await
    }
}

pub async fn start_ws_server(
    addr: &str,
    client: Arc<dyn ChatClient>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("WS server listening on: {}", addr);
    serve(listener, client).await
}

/// Accepts connections until the listener fails. Each connection is one session.
pub async fn serve(
    listener: TcpListener,
    client: Arc<dyn ChatClient>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    loop {
        let (stream, peer) = listener.accept().await?;

        if CONNECTION_LIMITER.check().is_err() {
            warn!("Global connection rate limit exceeded for {}. Dropping connection.", peer);
            continue;
        }

        info!("Incoming connection from: {}", peer);
        let client_clone = Arc::clone(&client);

        tokio::spawn(async move {
            if let Err(e) = process_connection(peer, stream, client_clone).await {
                error!("Failed to process connection for {}: {}", peer, e);
            }
        });
    }
}

async fn process_connection(
    peer: SocketAddr,
    stream: TcpStream,
    client: Arc<dyn ChatClient>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match accept_async(stream).await {
        Ok(ws) => {
            handle_connection(peer, ws, client).await;
            Ok(())
        }
        Err(e) => {
            error!("Handshake failed for {}: {}", peer, e);
            Err(Box::new(e) as _)
        }
    }
}

pub async fn handle_connection<S>(
    peer: SocketAddr,
    websocket: WebSocketStream<S>,
    client: Arc<dyn ChatClient>
)
    where S: AsyncRead + AsyncWrite + Unpin + Send
{
    info!("New WebSocket connection: {}", peer);

    let (tx, mut rx) = websocket.split();
    let mut sink = WebSocketSink { tx };
    let mut session = ChatSession::new(client);
    info!("Assigned session ID {} to {}", session.id(), peer);

    let hello = ServerMessage::Session {
        session_id: session.id().to_string(),
    };
    if let Err(e) = sink.send(&hello).await {
        error!("Error sending session id to {}: {}", peer, e);
        return;
    }

    while let Some(msg) = rx.next().await {
        match msg {
            Ok(message) => {
                if message.len() > MAX_MESSAGE_SIZE {
                    warn!(
                        "Message from {} exceeds size limit ({} > {})",
                        peer,
                        message.len(),
                        MAX_MESSAGE_SIZE
                    );
                    let error_msg = ServerMessage::Error {
                        message: "Message too large".to_string(),
                    };
                    if sink.send(&error_msg).await.is_err() {
                        error!("Failed to send size limit error to {}", peer);
                    }
                    break;
                }

                match message {
                    Message::Text(text) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Chat { content }) => {
                                match session.process_message(content.as_deref(), &mut sink).await {
                                    Ok(TurnOutcome::Failed(e)) => {
                                        debug!("Turn failed for {}: {}", peer, e);
                                    }
                                    Ok(_) => {}
                                    Err(e) => {
                                        error!("Error rendering to {}: {}", peer, e);
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                error!("Failed to parse message from {}: {}", peer, e);
                                let error_msg = ServerMessage::Error {
                                    message: format!("Failed to parse message: {}", e),
                                };
                                if let Err(e) = sink.send(&error_msg).await {
                                    error!("Error sending parse error to {}: {}", peer, e);
                                    break;
                                }
                            }
                        }
                    }
                    Message::Close(_) => {
                        info!("Received close frame from {}", peer);
                        break;
                    }
                    Message::Ping(ping_data) => {
                        if sink.tx.send(Message::Pong(ping_data)).await.is_err() {
                            error!("Failed to send pong to {}", peer);
                            break;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Binary(_) => {
                        warn!("Ignoring binary message from {}", peer);
                    }
                    Message::Frame(_) => {}
                }
            }
            Err(e) => {
                match e {
                    | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::Protocol(_)
                    | tokio_tungstenite::tungstenite::Error::Utf8 => {
                        info!("WebSocket connection closed or protocol error for {}: {}", peer, e);
                    }
                    tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                        io_err.kind() == std::io::ErrorKind::ConnectionReset
                    => {
                        info!("WebSocket connection reset by peer {}", peer);
                    }
                    tokio_tungstenite::tungstenite::Error::Capacity(ref cap_err) => {
                        error!("WebSocket capacity error for {}: {}", peer, cap_err);
                        let error_msg = ServerMessage::Error {
                            message: "Server capacity error".to_string(),
                        };
                        let _ = sink.send(&error_msg).await;
                    }
                    _ => {
                        error!("Error receiving message from {}: {}", peer, e);
                    }
                }
                break;
            }
        }
    }
    info!(
        "WebSocket connection closed for {} (Session ID: {}, {} turns)",
        peer,
        session.id(),
        session.transcript().len()
    );
}
