use crate::debugger::{Scope, StackSnapshot};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Outbound instruction for the remote engine. None of these are acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    Start,
    SetBreakpoint { id: u64, file: String, line: i64 },
    ClearBreakpoint { file: String, line: i64 },
    ClearBreakpoints { file: String },
    Continue { reverse: bool },
    StepInto,
    StepOut,
    StepOver,
}

impl Command {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BreakpointStatus {
    pub id: u64,
    pub line: i64,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PausePayload {
    pub stack: StackSnapshot,
    #[serde(default)]
    pub scopes: Vec<Scope>,
}

/// Inbound message from the remote engine, discriminated by its `event` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Inbound {
    BreakpointValidated {
        breakpoint: BreakpointStatus,
    },
    StopOnEntry(PausePayload),
    StopOnStep(PausePayload),
    StopOnBreakpoint(PausePayload),
    StopOnException(PausePayload),
    Output {
        text: String,
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        line: Option<i64>,
        #[serde(default)]
        column: Option<i64>,
    },
    End,
    #[serde(other)]
    Unknown,
}

impl Inbound {
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
