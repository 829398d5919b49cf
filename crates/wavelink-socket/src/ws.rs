//! Production [`Transport`] over `tokio-tungstenite`.
//!
//! Each open connection gets one pump task that owns the WebSocket:
//! it forwards [`Frame`]s from the engine to the wire and wire
//! messages back as [`TransportEvent`]s. Dropping the engine's
//! outgoing sender ends the pump and closes the socket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use wavelink_core::constants::CLOSE_CODE_ABNORMAL;

use crate::errors::TransportError;
use crate::transport::{Connection, Frame, Transport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Channel capacity for both directions of a connection.
const CHANNEL_CAPACITY: usize = 64;

/// WebSocket client transport.
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Connection, TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
            let _ = request.headers_mut().insert(name, value);
        }

        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        debug!(url, "websocket open");

        let (outgoing_tx, outgoing_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let _ = tokio::spawn(pump(ws, outgoing_rx, events_tx));

        Ok(Connection {
            outgoing: outgoing_tx,
            events: events_rx,
        })
    }
}

/// Owns the WebSocket for one connection's lifetime.
async fn pump(
    ws: WsStream,
    mut outgoing: mpsc::Receiver<Frame>,
    events: mpsc::Sender<TransportEvent>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            frame = outgoing.recv() => match frame {
                Some(Frame::Text(text)) => {
                    trace!(len = text.len(), "sending frame");
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(Frame::Close(code)) => {
                    // start the close handshake; keep draining until the
                    // server completes it
                    let _ = ws_tx
                        .send(Message::Close(Some(CloseFrame {
                            code: CloseCode::from(code),
                            reason: "".into(),
                        })))
                        .await;
                }
                None => {
                    let _ = ws_tx.close().await;
                    break;
                }
            },
            message = ws_rx.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if events
                        .send(TransportEvent::Message(text.to_string()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((CLOSE_CODE_ABNORMAL, String::new()));
                    let _ = events.send(TransportEvent::Closed { code, reason }).await;
                    break;
                }
                // tungstenite answers pings itself; binary frames are
                // not part of this protocol
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let reason = e.to_string();
                    let _ = events.send(TransportEvent::Error(reason.clone())).await;
                    let _ = events
                        .send(TransportEvent::Closed {
                            code: CLOSE_CODE_ABNORMAL,
                            reason,
                        })
                        .await;
                    break;
                }
                None => {
                    let _ = events
                        .send(TransportEvent::Closed {
                            code: CLOSE_CODE_ABNORMAL,
                            reason: "connection reset".into(),
                        })
                        .await;
                    break;
                }
            },
        }
    }
    debug!("websocket pump finished");
}
