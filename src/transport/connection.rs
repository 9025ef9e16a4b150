use super::messages::Command;
use super::{Connector, EventSink, Link};
use log::{debug, info, trace, warn};
use std::collections::VecDeque;

/// Lifecycle of the single connection a session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Unconnected,
    Connecting,
    Open,
    Closed,
}

/// Owns the link to the remote engine and the commands waiting for it.
pub struct Transport {
    state: Connection,
    outbound: VecDeque<Command>,
    link: Option<Box<dyn Link>>,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            state: Connection::Unconnected,
            outbound: VecDeque::new(),
            link: None,
        }
    }

    pub fn state(&self) -> Connection {
        self.state
    }

    /// Starts opening the link. The outcome arrives later as a link event.
    pub fn connect(
        &mut self,
        endpoint: &str,
        connector: &dyn Connector,
        sink: EventSink,
    ) -> crate::error::Result<()> {
        match self.state {
            Connection::Closed => {
                debug!(target: "transport", "connect to {} ignored: transport closed", endpoint);
                return Ok(());
            }
            Connection::Connecting | Connection::Open => {
                debug!(target: "transport", "connect to {} ignored: already {:?}", endpoint, self.state);
                return Ok(());
            }
            Connection::Unconnected => {}
        }

        info!(target: "transport", "connecting to {}", endpoint);
        self.state = Connection::Connecting;
        match connector.open(endpoint, sink) {
            Ok(link) => {
                self.link = Some(link);
                Ok(())
            }
            Err(e) => {
                self.state = Connection::Unconnected;
                Err(e)
            }
        }
    }

    /// The link finished its handshake: send `start`, then everything buffered.
    pub fn on_open(&mut self) {
        if self.state != Connection::Connecting {
            debug!(target: "transport", "open reported while {:?}", self.state);
            return;
        }
        self.state = Connection::Open;
        info!(
            target: "transport",
            "connection open, flushing {} buffered command(s)",
            self.outbound.len()
        );

        self.transmit(&Command::Start);
        while let Some(cmd) = self.outbound.pop_front() {
            self.transmit(&cmd);
        }
    }

    /// Handshake failed. Buffered commands stay queued for a later connect.
    pub fn on_connect_failed(&mut self) {
        if self.state == Connection::Connecting {
            self.state = Connection::Unconnected;
        }
        self.link = None;
    }

    /// Remote side went away.
    pub fn on_closed(&mut self) {
        self.state = Connection::Closed;
        self.link = None;
        self.outbound.clear();
    }

    pub fn send(&mut self, cmd: Command) {
        match self.state {
            Connection::Open => self.transmit(&cmd),
            Connection::Unconnected | Connection::Connecting => {
                trace!(target: "transport", "buffering {:?}", cmd);
                self.outbound.push_back(cmd);
            }
            Connection::Closed => {
                debug!(target: "transport", "dropping {:?}: transport closed", cmd);
            }
        }
    }

    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        if self.state != Connection::Closed {
            info!(target: "transport", "transport closed");
        }
        self.state = Connection::Closed;
        self.outbound.clear();
    }

    // Best effort: a failed write never reaches the caller.
    fn transmit(&mut self, cmd: &Command) {
        let Some(link) = self.link.as_mut() else {
            warn!(target: "transport", "no link for {:?}", cmd);
            return;
        };
        let text = match cmd.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(target: "transport", "failed to encode {:?}: {}", cmd, e);
                return;
            }
        };
        trace!(target: "transport", "-> {}", text);
        if let Err(e) = link.send_text(&text) {
            warn!(target: "transport", "send failed, command dropped: {}", e);
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
