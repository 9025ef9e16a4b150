// Stand-in remote engine for manual runs: cargo run --bin netjs-mock-engine
//
// Walks a fake 20 line `main.js`, answers breakpoint commands with validation
// events and every resume with a pause (or `end` when it runs off the file).

use clap::Parser;
use log::{info, warn};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::net::{TcpListener, TcpStream};
use tungstenite::{Message, WebSocket};

const PROGRAM: &str = "main.js";
const LAST_LINE: i64 = 20;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fake NetJS engine speaking the bridge's WebSocket protocol")]
struct Args {
    #[clap(long, default_value = "127.0.0.1:9229")]
    listen: String,
}

struct Engine {
    line: i64,
    depth: i64,
    breakpoints: BTreeSet<i64>,
}

impl Engine {
    fn new() -> Self {
        Self {
            line: 1,
            depth: 0,
            breakpoints: BTreeSet::new(),
        }
    }

    fn pause(&self, event: &str) -> Value {
        let name = if self.depth > 0 { "helper" } else { "main" };
        let mut frames = vec![json!({
            "index": 0,
            "name": name,
            "file": PROGRAM,
            "line": self.line,
        })];
        if self.depth > 0 {
            frames.push(json!({ "index": 1, "name": "main", "file": PROGRAM, "line": 3 }));
        }
        let count = frames.len();
        json!({
            "event": event,
            "stack": { "frames": frames, "count": count },
            "scopes": [
                { "name": "Locals", "variables": { "line": self.line, "depth": self.depth } },
                { "name": "Globals", "variables": { "program": PROGRAM, "config": { "verbose": true } } },
            ],
        })
    }

    fn handle(&mut self, cmd: &Value) -> Vec<Value> {
        let line_arg = cmd.get("line").and_then(Value::as_i64).unwrap_or(0);
        match cmd.get("command").and_then(Value::as_str).unwrap_or("") {
            "start" => vec![self.pause("stopOnEntry")],
            "setBreakpoint" => {
                let verified = (1..=LAST_LINE).contains(&line_arg);
                if verified {
                    self.breakpoints.insert(line_arg);
                }
                vec![json!({
                    "event": "breakpointValidated",
                    "breakpoint": { "id": cmd.get("id"), "line": line_arg, "verified": verified },
                })]
            }
            "clearBreakpoint" => {
                self.breakpoints.remove(&line_arg);
                Vec::new()
            }
            "clearBreakpoints" => {
                self.breakpoints.clear();
                Vec::new()
            }
            "continue" => match self.breakpoints.range(self.line + 1..).next() {
                Some(&line) => {
                    self.line = line;
                    vec![self.pause("stopOnBreakpoint")]
                }
                None => vec![
                    json!({ "event": "output", "text": "program finished", "file": PROGRAM, "line": LAST_LINE }),
                    json!({ "event": "end" }),
                ],
            },
            "stepInto" => {
                self.depth += 1;
                self.step()
            }
            "stepOut" => {
                self.depth = (self.depth - 1).max(0);
                self.step()
            }
            "stepOver" => self.step(),
            other => {
                warn!("unknown command {:?}", other);
                Vec::new()
            }
        }
    }

    fn step(&mut self) -> Vec<Value> {
        if self.line >= LAST_LINE {
            return vec![json!({ "event": "end" })];
        }
        self.line += 1;
        vec![self.pause("stopOnStep")]
    }
}

fn serve(mut socket: WebSocket<TcpStream>) -> tungstenite::Result<()> {
    let mut engine = Engine::new();
    loop {
        let text = match socket.read()? {
            Message::Text(text) => text,
            Message::Close(_) => return Ok(()),
            _ => continue,
        };
        info!("<- {}", text);
        let cmd: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!("bad command: {}", e);
                continue;
            }
        };
        for reply in engine.handle(&cmd) {
            let reply = reply.to_string();
            info!("-> {}", reply);
            socket.send(Message::Text(reply))?;
        }
    }
}

fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let listener = TcpListener::bind(&args.listen)?;
    info!("mock engine listening on ws://{}", args.listen);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        match tungstenite::accept(stream) {
            Ok(socket) => {
                info!("bridge connected");
                if let Err(e) = serve(socket) {
                    warn!("session ended: {}", e);
                }
            }
            Err(e) => warn!("handshake failed: {}", e),
        }
    }
    Ok(())
}
