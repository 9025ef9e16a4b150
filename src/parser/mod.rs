mod commands;

pub use commands::{parse_repl_command, ReplCommand};
