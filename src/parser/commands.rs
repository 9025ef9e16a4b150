/// Breakpoint commands understood by the evaluate request in `repl` context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    New(i64), // new <line>
    Del(i64), // del <line>
}

/// Parse `new <line>` / `del <line>`. Anything else is not a command.
pub fn parse_repl_command(expression: &str) -> Option<ReplCommand> {
    let mut lexer = shlex::Shlex::new(expression.trim());
    let verb = lexer.next()?;
    let line: i64 = lexer.next()?.parse().ok()?;
    if line < 0 || lexer.next().is_some() || lexer.had_error {
        return None;
    }

    match verb.as_str() {
        "new" => Some(ReplCommand::New(line)),
        "del" => Some(ReplCommand::Del(line)),
        _ => None,
    }
}
