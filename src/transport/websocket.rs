use super::{Connector, EventSink, Link, LinkEvent};
use crate::error::{BridgeError, Result};
use log::{debug, info, warn};
use std::io;
use std::net::TcpStream;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use tungstenite::client::IntoClientRequest;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

enum Outgoing {
    Text(String),
    Close,
}

/// Opens `ws://` links to the remote engine on a dedicated I/O thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(&self, endpoint: &str, sink: EventSink) -> Result<Box<dyn Link>> {
        let request = endpoint
            .into_client_request()
            .map_err(|e| BridgeError::Connect {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = channel::<Outgoing>();
        let endpoint = endpoint.to_string();

        thread::Builder::new()
            .name("netjs-link".to_string())
            .spawn(move || match tungstenite::connect(request) {
                Ok((socket, _response)) => {
                    info!(target: "transport", "websocket handshake with {} complete", endpoint);
                    pump(socket, rx, &sink);
                    sink(LinkEvent::Closed);
                }
                Err(e) => {
                    warn!(target: "transport", "websocket connect to {} failed: {}", endpoint, e);
                    sink(LinkEvent::Failed(e.to_string()));
                }
            })?;

        Ok(Box::new(WebSocketLink { tx }))
    }
}

struct WebSocketLink {
    tx: Sender<Outgoing>,
}

impl Link for WebSocketLink {
    fn send_text(&mut self, text: &str) -> Result<()> {
        self.tx
            .send(Outgoing::Text(text.to_string()))
            .map_err(|_| BridgeError::LinkClosed)
    }

    fn close(&mut self) {
        let _ = self.tx.send(Outgoing::Close);
    }
}

fn pump(mut socket: WebSocket<MaybeTlsStream<TcpStream>>, rx: Receiver<Outgoing>, sink: &EventSink) {
    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        if let Err(e) = stream.set_read_timeout(Some(POLL_INTERVAL)) {
            warn!(target: "transport", "could not set read timeout: {}", e);
        }
    }

    sink(LinkEvent::Opened);

    loop {
        loop {
            match rx.try_recv() {
                Ok(Outgoing::Text(text)) => {
                    if let Err(e) = socket.send(Message::Text(text)) {
                        warn!(target: "transport", "websocket write failed: {}", e);
                    }
                }
                Ok(Outgoing::Close) | Err(TryRecvError::Disconnected) => {
                    debug!(target: "transport", "closing websocket");
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => sink(LinkEvent::Message(text)),
            Ok(Message::Close(_)) => {
                info!(target: "transport", "remote engine closed the connection");
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                return;
            }
            Err(e) => {
                warn!(target: "transport", "websocket read failed: {}", e);
                return;
            }
        }
    }
}
