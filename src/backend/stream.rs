//! Websocket pump
//!
//! Turns a duplex socket into an outbound text sender plus an inbound event
//! receiver, so the session channel never touches the socket directly.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::core::TransportError;

/// Event read from the streaming channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    Text(String),
    /// The socket is gone; nothing follows
    Closed(String),
}

/// Handle to one open streaming channel
#[derive(Debug)]
pub struct StreamConnection {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<StreamMessage>,
}

/// The far side of an in-memory [`StreamConnection`]
#[derive(Debug)]
pub struct StreamPeer {
    pub received: mpsc::UnboundedReceiver<String>,
    pub sender: mpsc::UnboundedSender<StreamMessage>,
}

impl StreamConnection {
    /// Connected pair without a socket, for fakes and tests
    pub fn pair() -> (StreamConnection, StreamPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            StreamConnection {
                outbound: out_tx,
                inbound: in_rx,
            },
            StreamPeer {
                received: out_rx,
                sender: in_tx,
            },
        )
    }

    /// Split into the two halves; the pump keeps running while both live
    pub fn split(
        self,
    ) -> (
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<StreamMessage>,
    ) {
        (self.outbound, self.inbound)
    }
}

/// Connect and spawn the pump task
///
/// The handshake is awaited here so a refused connection surfaces as an
/// error instead of an immediate `Closed` event.
pub(crate) async fn open(url: &str) -> Result<StreamConnection, TransportError> {
    let (mut ws_stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;
    tracing::debug!(url, "Stream connected");

    let (send_tx, mut send_rx) = mpsc::unbounded_channel::<String>();
    let (recv_tx, recv_rx) = mpsc::unbounded_channel::<StreamMessage>();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                outbound = send_rx.recv() => {
                    match outbound {
                        Some(text) => {
                            if let Err(err) = ws_stream.send(Message::Text(text)).await {
                                let _ = recv_tx.send(StreamMessage::Closed(format!("send failed: {err}")));
                                break;
                            }
                        }
                        None => {
                            // Owner dropped the connection
                            let _ = ws_stream.close(None).await;
                            break;
                        }
                    }
                }
                inbound = ws_stream.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            let _ = recv_tx.send(StreamMessage::Text(text));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .as_ref()
                                .map(|f| format!("close:{} {}", f.code, f.reason))
                                .unwrap_or_else(|| "closed".to_string());
                            let _ = recv_tx.send(StreamMessage::Closed(reason));
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            let _ = recv_tx.send(StreamMessage::Closed(err.to_string()));
                            break;
                        }
                        None => {
                            let _ = recv_tx.send(StreamMessage::Closed("eof".to_string()));
                            break;
                        }
                    }
                }
            }
        }
        tracing::debug!("Stream pump stopped");
    });

    Ok(StreamConnection {
        outbound: send_tx,
        inbound: recv_rx,
    })
}
