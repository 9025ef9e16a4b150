mod connection;
mod messages;
mod websocket;

use crate::error::Result;

pub use connection::{Connection, Transport};
pub use messages::{BreakpointStatus, Command, Inbound, PausePayload};
pub use websocket::WebSocketConnector;

/// Something that happened on the link, reported from its I/O thread.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Opened,
    Message(String),
    Failed(String),
    Closed,
}

/// Callback the link's I/O thread uses to hand events to the session loop.
pub type EventSink = Box<dyn Fn(LinkEvent) + Send + 'static>;

/// Write half of an established (or establishing) link: one JSON text per call.
pub trait Link: Send {
    fn send_text(&mut self, text: &str) -> Result<()>;
    fn close(&mut self);
}

/// Opens links. Completion is reported through the sink, never by blocking.
pub trait Connector {
    fn open(&self, endpoint: &str, sink: EventSink) -> Result<Box<dyn Link>>;
}
