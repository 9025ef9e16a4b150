mod protocol;
mod server;

use crate::error::{BridgeError, Result};
use crate::transport::{EventSink, LinkEvent, WebSocketConnector};
use log::{debug, info, warn};
use std::io::{self, BufReader};
use std::sync::mpsc::{channel, Sender};
use std::thread;

pub use protocol::{DapMessage, DapMessageContent};
pub use server::{read_message, write_message, DapServer, SinkFactory};

/// Everything the session loop reacts to, in arrival order.
enum Inbox {
    Client(DapMessage),
    Link(LinkEvent),
    ClientGone,
}

pub fn run_dap_mode() -> Result<()> {
    info!(target: "dap", "DAP server starting");

    let (tx, rx) = channel::<Inbox>();
    spawn_client_reader(tx.clone())?;

    let make_sink = move || -> EventSink {
        let tx = tx.clone();
        Box::new(move |event: LinkEvent| {
            let _ = tx.send(Inbox::Link(event));
        })
    };

    let mut server = DapServer::new(
        io::stdout(),
        Box::new(WebSocketConnector),
        Box::new(make_sink),
    );
    let mut msg_count = 0u64;

    while let Ok(item) = rx.recv() {
        match item {
            Inbox::Client(msg) => {
                msg_count += 1;
                match msg.content {
                    DapMessageContent::Request { command, arguments } => {
                        if !server.dispatch(msg.seq, command, arguments) {
                            break;
                        }
                    }
                    other => debug!(target: "dap", "ignoring non-request message: {:?}", other),
                }
            }
            Inbox::Link(event) => server.handle_link_event(event),
            Inbox::ClientGone => {
                info!(target: "dap", "client stream closed");
                break;
            }
        }
    }

    server.shutdown();
    info!(target: "dap", "DAP server exiting after {} message(s)", msg_count);
    Ok(())
}

fn spawn_client_reader(tx: Sender<Inbox>) -> Result<()> {
    thread::Builder::new()
        .name("dap-stdin".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(io::stdin());
            loop {
                match read_message(&mut reader) {
                    Ok(Some(msg)) => {
                        if tx.send(Inbox::Client(msg)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e @ (BridgeError::Framing(_) | BridgeError::Json(_))) => {
                        warn!(target: "dap", "skipping unreadable client message: {}", e);
                    }
                    Err(e) => {
                        warn!(target: "dap", "client read failed: {}", e);
                        break;
                    }
                }
            }
            let _ = tx.send(Inbox::ClientGone);
        })?;
    Ok(())
}
