mod breakpoints;
mod context;
mod handles;
mod session;
mod stepping;

pub use breakpoints::{Breakpoint, Breakpoints};
pub use context::{ExecutionState, Scope, StackFrame, StackSnapshot, Variable};
pub use handles::{ScopeKey, VariableHandles, START_HANDLE};
pub use session::{BreakpointReason, Notification, ScopeRef, Session};
pub use stepping::{RunMode, StopReason};

/// The remote target has exactly one thread of control.
pub const THREAD_ID: i64 = 1;
