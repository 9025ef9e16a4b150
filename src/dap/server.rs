use super::protocol::{
    DapMessage, DapMessageContent, EvaluateArguments, LaunchArguments, ScopesArguments,
    SetBreakpointsArguments, StackTraceArguments, VariablesArguments,
};
use crate::debugger::{BreakpointReason, Notification, Session, THREAD_ID};
use crate::error::{BridgeError, Result};
use crate::transport::{Connector, EventSink, LinkEvent};
use log::{debug, info, trace, warn, LevelFilter};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::io::{self, BufRead, Read, Write};
use std::path::Path;

const DEFAULT_LEVELS: usize = 1000;
const MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;
const ADAPTER_DATA: &str = "netjs-adapter-data";

/// Builds a fresh sink for each link the session opens.
pub type SinkFactory = Box<dyn Fn() -> EventSink>;

pub struct DapServer<W: Write> {
    seq: u64,
    writer: W,
    session: Session,
    connector: Box<dyn Connector>,
    make_sink: SinkFactory,
}

impl<W: Write> DapServer<W> {
    pub fn new(writer: W, connector: Box<dyn Connector>, make_sink: SinkFactory) -> Self {
        Self {
            seq: 0,
            writer,
            session: Session::new(),
            connector,
            make_sink,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn send_response(
        &mut self,
        request_seq: u64,
        command: String,
        success: bool,
        body: Option<Value>,
    ) {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "response".to_string(),
            content: DapMessageContent::Response {
                request_seq,
                success,
                command,
                message: None,
                body,
            },
        };
        self.send_message(&msg);
    }

    pub fn send_event(&mut self, event: &str, body: Option<Value>) {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "event".to_string(),
            content: DapMessageContent::Event {
                event: event.to_string(),
                body,
            },
        };
        self.send_message(&msg);
    }

    fn send_message(&mut self, msg: &DapMessage) {
        if let Err(e) = write_message(&mut self.writer, msg) {
            warn!(target: "dap", "failed to write DAP message: {}", e);
        }
    }

    /// Handles one client request. Returns false once the client disconnected.
    pub fn dispatch(&mut self, seq: u64, command: String, arguments: Option<Value>) -> bool {
        debug!(target: "dap", "request #{} {}", seq, command);
        match command.as_str() {
            "initialize" => self.handle_initialize(seq, command),
            "launch" => self.handle_launch(seq, command, arguments),
            "attach" | "configurationDone" => self.send_response(seq, command, true, None),
            "setBreakpoints" => self.handle_set_breakpoints(seq, command, arguments),
            "threads" => self.handle_threads(seq, command),
            "stackTrace" => self.handle_stack_trace(seq, command, arguments),
            "scopes" => self.handle_scopes(seq, command, arguments),
            "variables" => self.handle_variables(seq, command, arguments),
            "continue" => self.handle_continue(seq, command, false),
            "reverseContinue" => self.handle_continue(seq, command, true),
            "next" => {
                self.session.step_over();
                self.send_response(seq, command, true, None);
            }
            "stepIn" => {
                self.session.step_into();
                self.send_response(seq, command, true, None);
            }
            "stepOut" => {
                self.session.step_out();
                self.send_response(seq, command, true, None);
            }
            "evaluate" => self.handle_evaluate(seq, command, arguments),
            "disconnect" => {
                self.session.close();
                self.send_response(seq, command, true, None);
                return false;
            }
            _ => {
                warn!(target: "dap", "unhandled DAP command: {}", command);
                self.send_response(seq, command, false, None);
            }
        }
        self.flush_notifications();
        true
    }

    pub fn handle_link_event(&mut self, event: LinkEvent) {
        self.session.handle_link_event(event);
        self.flush_notifications();
    }

    pub fn shutdown(&mut self) {
        self.session.close();
    }

    pub fn handle_initialize(&mut self, seq: u64, command: String) {
        let body = json!({
            "supportsConfigurationDoneRequest": true,
            "supportsEvaluateForHovers": true,
            "supportsStepBack": false,
            "supportsFunctionBreakpoints": false,
            "supportsConditionalBreakpoints": false,
            "supportsSetVariable": false,
        });
        self.send_response(seq, command, true, Some(body));
        self.send_event("initialized", None);
    }

    pub fn handle_launch(&mut self, seq: u64, command: String, args: Option<Value>) {
        let args: LaunchArguments = parse_arguments(&command, args);
        if args.trace {
            log::set_max_level(LevelFilter::Trace);
        }
        info!(target: "dap", "launch {} (localRoot {:?})", args.program, args.local_root);

        let sink = (self.make_sink)();
        self.session.launch(
            &args.program,
            args.local_root.as_deref(),
            self.connector.as_ref(),
            sink,
        );
        self.send_response(seq, command, true, None);
    }

    pub fn handle_set_breakpoints(&mut self, seq: u64, command: String, args: Option<Value>) {
        let args: SetBreakpointsArguments = parse_arguments(&command, args);
        let path = args.source.path.clone().unwrap_or_default();
        let lines = args.requested_lines();

        let breakpoints: Vec<Value> = self
            .session
            .set_breakpoints(&path, &lines)
            .into_iter()
            .map(|bp| {
                json!({
                    "id": bp.id,
                    "verified": bp.verified,
                    "line": bp.line,
                })
            })
            .collect();

        self.send_response(
            seq,
            command,
            true,
            Some(json!({ "breakpoints": breakpoints })),
        );
    }

    pub fn handle_threads(&mut self, seq: u64, command: String) {
        self.send_response(
            seq,
            command,
            true,
            Some(json!({
                "threads": [
                    {
                        "id": THREAD_ID,
                        "name": "thread 1"
                    }
                ]
            })),
        );
    }

    pub fn handle_stack_trace(&mut self, seq: u64, command: String, args: Option<Value>) {
        let args: StackTraceArguments = parse_arguments(&command, args);
        let start = args.start_frame.unwrap_or(0);
        let levels = match args.levels {
            Some(0) | None => DEFAULT_LEVELS,
            Some(n) => n,
        };

        let stack = self.session.stack(start, levels);
        let frames: Vec<Value> = stack
            .frames
            .iter()
            .map(|f| {
                json!({
                    "id": f.index,
                    "name": f.name,
                    "source": source_json(&f.file),
                    "line": f.line,
                    "column": 1,
                })
            })
            .collect();

        self.send_response(
            seq,
            command,
            true,
            Some(json!({
                "stackFrames": frames,
                "totalFrames": stack.count,
            })),
        );
    }

    pub fn handle_scopes(&mut self, seq: u64, command: String, args: Option<Value>) {
        let args: ScopesArguments = parse_arguments(&command, args);
        let scopes: Vec<Value> = self
            .session
            .scopes(args.frame_id)
            .into_iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "variablesReference": s.handle,
                    "expensive": false,
                })
            })
            .collect();

        self.send_response(seq, command, true, Some(json!({ "scopes": scopes })));
    }

    pub fn handle_variables(&mut self, seq: u64, command: String, args: Option<Value>) {
        let args: VariablesArguments = parse_arguments(&command, args);
        let variables: Vec<Value> = self
            .session
            .variables(args.variables_reference)
            .into_iter()
            .map(|v| {
                json!({
                    "name": v.name,
                    "type": v.type_name,
                    "value": v.value,
                    "variablesReference": 0,
                })
            })
            .collect();

        self.send_response(
            seq,
            command,
            true,
            Some(json!({ "variables": variables })),
        );
    }

    pub fn handle_continue(&mut self, seq: u64, command: String, reverse: bool) {
        self.session.continue_execution(reverse);
        self.send_response(
            seq,
            command,
            true,
            Some(json!({"allThreadsContinued": true})),
        );
    }

    pub fn handle_evaluate(&mut self, seq: u64, command: String, args: Option<Value>) {
        let args: EvaluateArguments = parse_arguments(&command, args);
        let result = self
            .session
            .evaluate(&args.expression, args.context.as_deref());
        self.send_response(
            seq,
            command,
            true,
            Some(json!({
                "result": result,
                "variablesReference": 0,
            })),
        );
    }

    /// Sends every queued notification; called only after a handler returned.
    fn flush_notifications(&mut self) {
        for notification in self.session.drain_notifications() {
            let (event, body) = notification_event(notification);
            self.send_event(event, body);
        }
    }
}

fn notification_event(notification: Notification) -> (&'static str, Option<Value>) {
    match notification {
        Notification::Stopped { reason } => (
            "stopped",
            Some(json!({
                "reason": reason.as_str(),
                "threadId": THREAD_ID,
                "allThreadsStopped": true,
            })),
        ),
        Notification::Breakpoint {
            reason,
            breakpoint,
            source,
        } => {
            let mut bp = Map::new();
            bp.insert("id".to_string(), json!(breakpoint.id));
            if reason == BreakpointReason::Removed {
                bp.insert("verified".to_string(), json!(false));
            } else {
                bp.insert("verified".to_string(), json!(breakpoint.verified));
                bp.insert("line".to_string(), json!(breakpoint.line));
            }
            if let Some(path) = source {
                bp.insert("source".to_string(), source_json(&path));
            }
            (
                "breakpoint",
                Some(json!({
                    "reason": reason.as_str(),
                    "breakpoint": bp,
                })),
            )
        }
        Notification::Output {
            category,
            text,
            file,
            line,
            column,
        } => {
            let mut body = Map::new();
            body.insert("category".to_string(), json!(category));
            body.insert("output".to_string(), json!(format!("{}\n", text)));
            if let Some(path) = file {
                body.insert("source".to_string(), source_json(&path));
            }
            if let Some(line) = line {
                body.insert("line".to_string(), json!(line));
            }
            if let Some(column) = column {
                body.insert("column".to_string(), json!(column));
            }
            ("output", Some(Value::Object(body)))
        }
        Notification::Terminated => ("terminated", None),
    }
}

fn source_json(path: &str) -> Value {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    json!({
        "name": name,
        "path": path,
        "adapterData": ADAPTER_DATA,
    })
}

fn parse_arguments<T: DeserializeOwned + Default>(command: &str, args: Option<Value>) -> T {
    match args {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(target: "dap", "bad arguments for {}: {}", command, e);
            T::default()
        }),
        None => T::default(),
    }
}

/// Writes one `Content-Length` framed message.
pub fn write_message<W: Write>(writer: &mut W, msg: &DapMessage) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", json.len(), json)?;
    writer.flush()?;
    trace!(target: "dap", "sent {} bytes", json.len());
    Ok(())
}

/// Reads one framed message. `Ok(None)` means the client closed the stream.
///
/// A `Framing` error leaves the reader at the start of the next message, so
/// the caller can log it and keep reading.
pub fn read_message<R: BufRead>(reader: &mut R) -> Result<Option<DapMessage>> {
    let mut content_length: Option<usize> = None;
    let mut bad_header: Option<String> = None;
    let mut line = String::new();

    // The header block always runs to its blank line before any error is returned.
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let header = line.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }
        if let Some(value) = header.strip_prefix("Content-Length:") {
            match value.trim().parse() {
                Ok(len) => content_length = Some(len),
                Err(_) => bad_header = Some(value.trim().to_string()),
            }
        }
    }

    if let Some(value) = bad_header {
        return Err(BridgeError::Framing(format!("bad Content-Length: {}", value)));
    }
    let len = content_length
        .ok_or_else(|| BridgeError::Framing("missing Content-Length header".to_string()))?;
    if len > MAX_CONTENT_LENGTH {
        let skipped = io::copy(&mut reader.by_ref().take(len as u64), &mut io::sink())?;
        debug!(target: "dap", "skipped {} byte(s) of an oversized message", skipped);
        return Err(BridgeError::Framing(format!(
            "Content-Length {} exceeds the {} byte limit",
            len, MAX_CONTENT_LENGTH
        )));
    }
    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer)?;
    Ok(Some(serde_json::from_slice(&buffer)?))
}
