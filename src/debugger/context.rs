use super::handles::ScopeKey;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StackFrame {
    pub index: i64,
    pub name: String,
    pub file: String,
    pub line: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StackSnapshot {
    pub frames: Vec<StackFrame>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scope {
    pub name: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

/// A flat, display-ready variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub type_name: &'static str,
    pub value: String,
}

impl Variable {
    pub fn from_value(name: &str, value: &Value) -> Self {
        let (type_name, value) = match value {
            Value::Null => ("null", "null".to_string()),
            Value::Bool(b) => ("boolean", b.to_string()),
            Value::Number(n) => ("number", n.to_string()),
            Value::String(s) => ("string", s.clone()),
            // No nested expansion: structured values are shown as compact JSON.
            Value::Array(_) | Value::Object(_) => ("object", value.to_string()),
        };
        Self {
            name: name.to_string(),
            type_name,
            value,
        }
    }
}

/// The most recent pause: stack and scopes, always replaced together.
#[derive(Default)]
struct PauseState {
    stack: StackSnapshot,
    scopes: Vec<Scope>,
}

pub struct ExecutionState {
    pause: Option<PauseState>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self { pause: None }
    }

    pub fn record_pause(&mut self, stack: StackSnapshot, scopes: Vec<Scope>) {
        self.pause = Some(PauseState { stack, scopes });
    }

    pub fn has_paused(&self) -> bool {
        self.pause.is_some()
    }

    /// Frames `start .. start + levels`, clamped; `count` is the full depth.
    pub fn stack(&self, start: usize, levels: usize) -> StackSnapshot {
        let Some(pause) = &self.pause else {
            return StackSnapshot::default();
        };
        let frames = &pause.stack.frames;
        let begin = start.min(frames.len());
        let end = begin.saturating_add(levels).min(frames.len());
        StackSnapshot {
            frames: frames[begin..end].to_vec(),
            count: pause.stack.count,
        }
    }

    pub fn top_frame(&self) -> Option<&StackFrame> {
        self.pause.as_ref()?.stack.frames.first()
    }

    // The remote engine sends one scope list per pause, so the frame
    // reference cannot narrow it down.
    pub fn scopes(&self, _frame_ref: i64) -> &[Scope] {
        self.pause
            .as_ref()
            .map(|p| p.scopes.as_slice())
            .unwrap_or(&[])
    }

    pub fn lookup_variables(&self, key: &ScopeKey) -> Vec<Variable> {
        self.scopes(key.frame_ref)
            .iter()
            .find(|scope| scope.name == key.scope_name)
            .map(|scope| {
                scope
                    .variables
                    .iter()
                    .map(|(name, value)| Variable::from_value(name, value))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}
