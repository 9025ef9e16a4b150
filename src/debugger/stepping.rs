use crate::transport::Command;

/// Ways to resume the remote target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunMode {
    Continue { reverse: bool },
    StepOver,
    StepInto,
    StepOut,
}

impl RunMode {
    pub fn command(self) -> Command {
        match self {
            RunMode::Continue { reverse } => Command::Continue { reverse },
            RunMode::StepOver => Command::StepOver,
            RunMode::StepInto => Command::StepInto,
            RunMode::StepOut => Command::StepOut,
        }
    }
}

/// Why the remote target paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Entry,
    Step,
    Breakpoint,
    Exception,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Entry => "entry",
            StopReason::Step => "step",
            StopReason::Breakpoint => "breakpoint",
            StopReason::Exception => "exception",
        }
    }
}
