use super::breakpoints::{Breakpoint, Breakpoints};
use super::context::{ExecutionState, StackSnapshot, Variable};
use super::handles::VariableHandles;
use super::stepping::{RunMode, StopReason};
use crate::parser::{parse_repl_command, ReplCommand};
use crate::transport::{
    BreakpointStatus, Command, Connection, Connector, EventSink, Inbound, LinkEvent, PausePayload,
    Transport,
};
use log::{debug, info, warn};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointReason {
    Changed,
    New,
    Removed,
}

impl BreakpointReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakpointReason::Changed => "changed",
            BreakpointReason::New => "new",
            BreakpointReason::Removed => "removed",
        }
    }
}

/// Something the controller must be told about, queued until the handler
/// that produced it has returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Stopped {
        reason: StopReason,
    },
    Breakpoint {
        reason: BreakpointReason,
        breakpoint: Breakpoint,
        source: Option<String>,
    },
    Output {
        category: &'static str,
        text: String,
        file: Option<String>,
        line: Option<i64>,
        column: Option<i64>,
    },
    Terminated,
}

/// A scope of the current pause with the handle its variables are fetched by.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeRef {
    pub name: String,
    pub handle: i64,
}

/// One debug connection: the only owner and mutator of the breakpoint
/// registry, the pause cache and the handle table.
pub struct Session {
    transport: Transport,
    breakpoints: Breakpoints,
    state: ExecutionState,
    handles: VariableHandles,
    local_root: Option<String>,
    last_source: Option<String>,
    pending: VecDeque<Notification>,
    terminated: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            transport: Transport::new(),
            breakpoints: Breakpoints::new(),
            state: ExecutionState::new(),
            handles: VariableHandles::new(),
            local_root: None,
            last_source: None,
            pending: VecDeque::new(),
            terminated: false,
        }
    }

    pub fn connection(&self) -> Connection {
        self.transport.state()
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn launch(
        &mut self,
        endpoint: &str,
        local_root: Option<&str>,
        connector: &dyn Connector,
        sink: EventSink,
    ) {
        info!(target: "session", "launching {} (local root {:?})", endpoint, local_root);
        self.local_root = local_root.map(|root| root.trim_end_matches('/').to_string());

        if let Err(e) = self.transport.connect(endpoint, connector, sink) {
            self.report_connect_failure(&e.to_string());
        }
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    // ---- breakpoints

    pub fn set_breakpoint(&mut self, path: &str, line: i64) -> Breakpoint {
        let bp = self.breakpoints.add(path, line);
        self.transport.send(Command::SetBreakpoint {
            id: bp.id,
            file: path.to_string(),
            line,
        });
        bp
    }

    pub fn clear_breakpoint(&mut self, path: &str, line: i64) -> Option<Breakpoint> {
        let bp = self.breakpoints.remove(path, line)?;
        self.transport.send(Command::ClearBreakpoint {
            file: path.to_string(),
            line,
        });
        Some(bp)
    }

    pub fn clear_all_breakpoints(&mut self, path: &str) {
        self.breakpoints.clear_file(path);
        self.transport.send(Command::ClearBreakpoints {
            file: path.to_string(),
        });
    }

    /// Replaces every breakpoint of `path` with one per line, in order.
    pub fn set_breakpoints(&mut self, path: &str, lines: &[i64]) -> Vec<Breakpoint> {
        self.last_source = Some(path.to_string());
        self.clear_all_breakpoints(path);
        lines
            .iter()
            .map(|&line| self.set_breakpoint(path, line))
            .collect()
    }

    // ---- execution control

    pub fn resume(&mut self, mode: RunMode) {
        debug!(target: "session", "resume {:?}", mode);
        self.transport.send(mode.command());
    }

    pub fn continue_execution(&mut self, reverse: bool) {
        self.resume(RunMode::Continue { reverse });
    }

    pub fn step_into(&mut self) {
        self.resume(RunMode::StepInto);
    }

    pub fn step_out(&mut self) {
        self.resume(RunMode::StepOut);
    }

    pub fn step_over(&mut self) {
        self.resume(RunMode::StepOver);
    }

    // ---- inspection

    pub fn stack(&self, start: usize, levels: usize) -> StackSnapshot {
        self.state.stack(start, levels)
    }

    pub fn scopes(&mut self, frame_ref: i64) -> Vec<ScopeRef> {
        let names: Vec<String> = self
            .state
            .scopes(frame_ref)
            .iter()
            .map(|scope| scope.name.clone())
            .collect();
        names
            .into_iter()
            .map(|name| {
                let handle = self.handles.allocate(&name, frame_ref);
                ScopeRef { name, handle }
            })
            .collect()
    }

    pub fn variables(&self, handle: i64) -> Vec<Variable> {
        match self.handles.resolve(handle) {
            Some(key) => self.state.lookup_variables(key),
            None => {
                debug!(target: "session", "variables handle {} is unknown or stale", handle);
                Vec::new()
            }
        }
    }

    pub fn evaluate(&mut self, expression: &str, context: Option<&str>) -> String {
        if context == Some("repl") {
            match parse_repl_command(expression) {
                Some(ReplCommand::New(line)) => {
                    if let Some(source) = self.current_source() {
                        let bp = self.set_breakpoint(&source, line);
                        self.notify(Notification::Breakpoint {
                            reason: BreakpointReason::New,
                            breakpoint: bp,
                            source: Some(source),
                        });
                        return "breakpoint created".to_string();
                    }
                }
                Some(ReplCommand::Del(line)) => {
                    if let Some(source) = self.current_source() {
                        if let Some(bp) = self.clear_breakpoint(&source, line) {
                            self.notify(Notification::Breakpoint {
                                reason: BreakpointReason::Removed,
                                breakpoint: bp,
                                source: None,
                            });
                            return "breakpoint deleted".to_string();
                        }
                    }
                }
                None => {}
            }
        }
        format!(
            "evaluate(context: '{}', '{}')",
            context.unwrap_or("undefined"),
            expression
        )
    }

    /// File the REPL breakpoint commands act on, once a pause or a
    /// `setBreakpoints` has named one.
    pub fn current_source(&self) -> Option<String> {
        self.state
            .top_frame()
            .map(|frame| frame.file.clone())
            .or_else(|| self.last_source.clone())
    }

    // ---- remote events

    pub fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Opened => self.transport.on_open(),
            LinkEvent::Message(text) => self.handle_inbound(&text),
            LinkEvent::Failed(reason) => {
                self.transport.on_connect_failed();
                self.report_connect_failure(&reason);
            }
            LinkEvent::Closed => {
                if self.transport.state() != Connection::Closed {
                    info!(target: "session", "remote engine disconnected");
                    self.transport.on_closed();
                    self.terminate();
                }
            }
        }
    }

    pub fn handle_inbound(&mut self, text: &str) {
        let inbound = match Inbound::decode(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(target: "session", "ignoring undecodable message: {}", e);
                return;
            }
        };

        match inbound {
            Inbound::StopOnEntry(payload) => self.record_pause(StopReason::Entry, payload),
            Inbound::StopOnStep(payload) => self.record_pause(StopReason::Step, payload),
            Inbound::StopOnBreakpoint(payload) => {
                self.record_pause(StopReason::Breakpoint, payload)
            }
            Inbound::StopOnException(payload) => {
                self.record_pause(StopReason::Exception, payload)
            }
            Inbound::BreakpointValidated { breakpoint } => self.apply_validation(breakpoint),
            Inbound::Output {
                text,
                file,
                line,
                column,
            } => {
                let file = file.map(|f| self.localize(&f));
                self.notify(Notification::Output {
                    category: "console",
                    text,
                    file,
                    line,
                    column,
                });
            }
            Inbound::End => self.terminate(),
            Inbound::Unknown => {
                warn!(target: "session", "ignoring message with unknown event: {}", text);
            }
        }
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }

    fn record_pause(&mut self, reason: StopReason, payload: PausePayload) {
        let PausePayload { mut stack, scopes } = payload;
        for frame in &mut stack.frames {
            frame.file = self.localize(&frame.file);
        }
        debug!(
            target: "session",
            "paused ({}) with {} frame(s), {} scope(s)",
            reason.as_str(),
            stack.frames.len(),
            scopes.len()
        );
        self.state.record_pause(stack, scopes);
        self.handles.supersede();
        self.notify(Notification::Stopped { reason });
    }

    fn apply_validation(&mut self, status: BreakpointStatus) {
        if !self
            .breakpoints
            .validate(status.id, status.line, status.verified)
        {
            debug!(target: "session", "validation for breakpoint {} no longer registered", status.id);
        }
        self.notify(Notification::Breakpoint {
            reason: BreakpointReason::Changed,
            breakpoint: Breakpoint {
                id: status.id,
                line: status.line,
                verified: status.verified,
            },
            source: None,
        });
    }

    // `end` and a remote close can both arrive; the client hears one `terminated`.
    fn terminate(&mut self) {
        if self.terminated {
            debug!(target: "session", "already terminated");
            return;
        }
        self.terminated = true;
        self.notify(Notification::Terminated);
    }

    fn report_connect_failure(&mut self, reason: &str) {
        warn!(target: "session", "could not connect to the remote engine: {}", reason);
        self.notify(Notification::Output {
            category: "stderr",
            text: format!("could not connect to the remote engine: {}", reason),
            file: None,
            line: None,
            column: None,
        });
    }

    fn localize(&self, file: &str) -> String {
        match &self.local_root {
            Some(root) => format!("{}/{}", root, file),
            None => file.to_string(),
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.pending.push_back(notification);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
