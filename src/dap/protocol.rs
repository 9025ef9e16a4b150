use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct DapMessage {
    pub seq: u64,
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub content: DapMessageContent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DapMessageContent {
    Request {
        command: String,
        arguments: Option<Value>,
    },
    Response {
        request_seq: u64,
        success: bool,
        command: String,
        message: Option<String>,
        body: Option<Value>,
    },
    Event {
        event: String,
        body: Option<Value>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchArguments {
    /// WebSocket URL of the remote engine.
    pub program: String,
    pub local_root: Option<String>,
    #[serde(default)]
    pub trace: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct Source {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SourceBreakpoint {
    pub line: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetBreakpointsArguments {
    #[serde(default)]
    pub source: Source,
    pub lines: Option<Vec<i64>>,
    pub breakpoints: Option<Vec<SourceBreakpoint>>,
}

impl SetBreakpointsArguments {
    /// Requested lines; the legacy `lines` array wins when both are present.
    pub fn requested_lines(&self) -> Vec<i64> {
        match (&self.lines, &self.breakpoints) {
            (Some(lines), _) => lines.clone(),
            (None, Some(bps)) => bps.iter().map(|bp| bp.line).collect(),
            (None, None) => Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceArguments {
    pub start_frame: Option<usize>,
    pub levels: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesArguments {
    #[serde(default)]
    pub frame_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesArguments {
    #[serde(default)]
    pub variables_reference: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct EvaluateArguments {
    #[serde(default)]
    pub expression: String,
    pub context: Option<String>,
}
