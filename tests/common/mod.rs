#![allow(dead_code)]

use netjs_debugger::dap::{DapServer, SinkFactory};
use netjs_debugger::transport::{Connector, EventSink, Link, LinkEvent};
use netjs_debugger::{BridgeError, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Connector whose links record every transmitted frame.
#[derive(Clone, Default)]
pub struct SpyConnector {
    pub sent: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl SpyConnector {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Transmitted commands, decoded.
    pub fn commands(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands()
            .iter()
            .map(|c| c["command"].as_str().unwrap().to_string())
            .collect()
    }
}

impl Connector for SpyConnector {
    fn open(&self, endpoint: &str, _sink: EventSink) -> Result<Box<dyn Link>> {
        if self.fail {
            return Err(BridgeError::Connect {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(Box::new(SpyLink {
            sent: self.sent.clone(),
        }))
    }
}

struct SpyLink {
    sent: Arc<Mutex<Vec<String>>>,
}

impl Link for SpyLink {
    fn send_text(&mut self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn close(&mut self) {}
}

pub fn noop_sink() -> EventSink {
    Box::new(|_event: LinkEvent| {})
}

pub fn noop_sink_factory() -> SinkFactory {
    Box::new(noop_sink)
}

pub fn test_server(spy: &SpyConnector) -> DapServer<Vec<u8>> {
    DapServer::new(Vec::new(), Box::new(spy.clone()), noop_sink_factory())
}

/// Splits `Content-Length` framed output into JSON messages.
pub fn frames(bytes: &[u8]) -> Vec<Value> {
    let text = std::str::from_utf8(bytes).unwrap();
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("Content-Length: ") {
        let after = &rest[start + "Content-Length: ".len()..];
        let header_end = after.find("\r\n\r\n").unwrap();
        let len: usize = after[..header_end].parse().unwrap();
        let body = &after[header_end + 4..header_end + 4 + len];
        out.push(serde_json::from_str(body).unwrap());
        rest = &after[header_end + 4 + len..];
    }
    out
}

pub fn pause_message(event: &str, frames: usize, locals: Value) -> String {
    let frames: Vec<Value> = (0..frames)
        .map(|i| {
            serde_json::json!({
                "index": i,
                "name": format!("fn{}", i),
                "file": "src/app.js",
                "line": 10 + i,
            })
        })
        .collect();
    let count = frames.len();
    serde_json::json!({
        "event": event,
        "stack": { "frames": frames, "count": count },
        "scopes": [
            { "name": "Locals", "variables": locals },
            { "name": "Globals", "variables": { "version": "1.0" } },
        ],
    })
    .to_string()
}
