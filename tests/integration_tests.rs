mod common;

use common::{noop_sink, pause_message, SpyConnector};
use netjs_debugger::debugger::{
    BreakpointReason, ExecutionState, Notification, Scope, Session, StackFrame, StackSnapshot,
    StopReason, VariableHandles, Variable, START_HANDLE,
};
use netjs_debugger::parser::{parse_repl_command, ReplCommand};
use netjs_debugger::transport::{Command, Connection, Inbound, LinkEvent};
use serde_json::json;

fn open_session(spy: &SpyConnector) -> Session {
    let mut session = Session::new();
    session.launch("ws://127.0.0.1:9229", None, spy, noop_sink());
    session.handle_link_event(LinkEvent::Opened);
    session
}

fn snapshot(depth: usize) -> StackSnapshot {
    let frames = (0..depth)
        .map(|i| StackFrame {
            index: i as i64,
            name: format!("frame{}", i),
            file: "a.js".to_string(),
            line: i as i64 + 1,
        })
        .collect();
    StackSnapshot {
        frames,
        count: depth,
    }
}

fn scope(name: &str, variables: serde_json::Value) -> Scope {
    Scope {
        name: name.to_string(),
        variables: variables.as_object().cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod breakpoint_tests {
    use super::*;

    #[test]
    fn test_ids_increase_across_clears() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);

        let first = session.set_breakpoint("a.js", 5);
        let second = session.set_breakpoint("a.js", 6);
        assert!(session.clear_breakpoint("a.js", 5).is_some());
        session.clear_all_breakpoints("a.js");
        let third = session.set_breakpoint("a.js", 5);
        let fourth = session.set_breakpoint("b.js", 1);

        let ids = [first.id, second.id, third.id, fourth.id];
        assert_eq!(ids, [1, 2, 3, 4], "Ids should never be reused");
        assert!(!third.verified, "New breakpoints start unverified");
    }

    #[test]
    fn test_clear_missing_breakpoint_is_silent() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);
        let before = spy.commands().len();

        assert_eq!(session.clear_breakpoint("a.js", 42), None);
        assert_eq!(spy.commands().len(), before, "No command should be issued");
    }

    #[test]
    fn test_clear_existing_breakpoint_sends_command() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);

        let bp = session.set_breakpoint("a.js", 7);
        let removed = session.clear_breakpoint("a.js", 7).expect("Breakpoint should exist");
        assert_eq!(removed.id, bp.id);
        assert!(!session.breakpoints().contains("a.js", 7));

        let last = spy.commands().pop().unwrap();
        assert_eq!(last, json!({"command": "clearBreakpoint", "file": "a.js", "line": 7}));
    }

    #[test]
    fn test_clear_all_sends_one_command_without_entries() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);

        session.clear_all_breakpoints("never-seen.js");
        assert_eq!(
            spy.commands(),
            vec![
                json!({"command": "start"}),
                json!({"command": "clearBreakpoints", "file": "never-seen.js"}),
            ]
        );
    }

    #[test]
    fn test_set_breakpoints_replaces_file_entries() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);

        session.set_breakpoints("a.js", &[3, 8]);
        let bps = session.set_breakpoints("a.js", &[3, 9]);

        assert_eq!(bps.iter().map(|b| b.id).collect::<Vec<_>>(), vec![3, 4]);
        let lines: Vec<i64> = session.breakpoints().for_file("a.js").iter().map(|b| b.line).collect();
        assert_eq!(lines, vec![3, 9], "Resubmission should not duplicate lines");
    }

    #[test]
    fn test_validation_updates_registry_and_notifies() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);
        session.set_breakpoint("a.js", 5);

        session.handle_inbound(
            r#"{"event":"breakpointValidated","breakpoint":{"id":1,"line":6,"verified":true}}"#,
        );

        let bp = &session.breakpoints().for_file("a.js")[0];
        assert!(bp.verified);
        assert_eq!(bp.line, 6);

        let notes = session.drain_notifications();
        assert_eq!(notes.len(), 1);
        match &notes[0] {
            Notification::Breakpoint {
                reason, breakpoint, ..
            } => {
                assert_eq!(*reason, BreakpointReason::Changed);
                assert_eq!((breakpoint.id, breakpoint.line, breakpoint.verified), (1, 6, true));
            }
            other => panic!("Unexpected notification {:?}", other),
        }
    }
}

#[cfg(test)]
mod transport_tests {
    use super::*;

    #[test]
    fn test_buffered_commands_flush_after_start() {
        let spy = SpyConnector::default();
        let mut session = Session::new();
        session.launch("ws://127.0.0.1:9229", None, &spy, noop_sink());
        assert_eq!(session.connection(), Connection::Connecting);

        session.set_breakpoint("a.js", 5);
        session.step_over();
        session.continue_execution(true);
        assert!(spy.commands().is_empty(), "Nothing is sent before the link opens");

        session.handle_link_event(LinkEvent::Opened);
        assert_eq!(session.connection(), Connection::Open);
        assert_eq!(
            spy.commands(),
            vec![
                json!({"command": "start"}),
                json!({"command": "setBreakpoint", "id": 1, "file": "a.js", "line": 5}),
                json!({"command": "stepOver"}),
                json!({"command": "continue", "reverse": true}),
            ]
        );
    }

    #[test]
    fn test_commands_before_launch_are_buffered() {
        let spy = SpyConnector::default();
        let mut session = Session::new();
        session.set_breakpoints("a.js", &[2]);
        assert_eq!(session.connection(), Connection::Unconnected);

        session.launch("ws://127.0.0.1:9229", None, &spy, noop_sink());
        session.handle_link_event(LinkEvent::Opened);

        assert_eq!(
            spy.command_names(),
            vec!["start", "clearBreakpoints", "setBreakpoint"]
        );
    }

    #[test]
    fn test_sends_after_close_are_dropped() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);
        session.close();
        assert_eq!(session.connection(), Connection::Closed);

        session.step_into();
        session.set_breakpoint("a.js", 1);
        assert_eq!(spy.command_names(), vec!["start"]);
    }

    #[test]
    fn test_connect_failure_reported_once() {
        let spy = SpyConnector::failing();
        let mut session = Session::new();
        session.launch("ws://127.0.0.1:1", None, &spy, noop_sink());

        assert_eq!(session.connection(), Connection::Unconnected);
        let notes = session.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert!(matches!(
            &notes[0],
            Notification::Output { category: "stderr", .. }
        ));
    }

    #[test]
    fn test_async_connect_failure_keeps_buffer() {
        let spy = SpyConnector::default();
        let mut session = Session::new();
        session.launch("ws://127.0.0.1:9229", None, &spy, noop_sink());
        session.step_out();

        session.handle_link_event(LinkEvent::Failed("refused".to_string()));
        assert_eq!(session.connection(), Connection::Unconnected);
        assert_eq!(session.drain_notifications().len(), 1);

        session.launch("ws://127.0.0.1:9229", None, &spy, noop_sink());
        session.handle_link_event(LinkEvent::Opened);
        assert_eq!(spy.command_names(), vec!["start", "stepOut"]);
    }

    #[test]
    fn test_remote_close_terminates() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);

        session.handle_link_event(LinkEvent::Closed);
        assert_eq!(session.connection(), Connection::Closed);
        assert_eq!(session.drain_notifications(), vec![Notification::Terminated]);
    }

    #[test]
    fn test_end_then_close_terminates_once() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);

        session.handle_inbound(r#"{"event":"end"}"#);
        let mut seen = session.drain_notifications();
        session.handle_link_event(LinkEvent::Closed);
        seen.extend(session.drain_notifications());

        assert_eq!(session.connection(), Connection::Closed);
        assert_eq!(
            seen,
            vec![Notification::Terminated],
            "End followed by a remote close should terminate only once"
        );
    }

    #[test]
    fn test_each_stop_event_maps_to_its_reason() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);

        for event in ["stopOnEntry", "stopOnStep", "stopOnBreakpoint", "stopOnException"] {
            session.handle_inbound(&pause_message(event, 1, json!({})));
        }
        let reasons: Vec<StopReason> = session
            .drain_notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Stopped { reason } => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                StopReason::Entry,
                StopReason::Step,
                StopReason::Breakpoint,
                StopReason::Exception,
            ]
        );
        assert_eq!(session.stack(0, 10).count, 1);
    }

    #[test]
    fn test_command_shapes() {
        assert_eq!(
            serde_json::to_value(Command::ClearBreakpoints { file: "x.js".into() }).unwrap(),
            json!({"command": "clearBreakpoints", "file": "x.js"})
        );
        assert_eq!(
            serde_json::to_value(Command::StepInto).unwrap(),
            json!({"command": "stepInto"})
        );
    }

    #[test]
    fn test_inbound_decoding() {
        let msg = pause_message("stopOnException", 2, json!({"x": 1}));
        let payload = match Inbound::decode(&msg).unwrap() {
            Inbound::StopOnException(payload) => payload,
            other => panic!("Expected stopOnException, got {:?}", other),
        };
        assert_eq!(payload.stack.count, 2);
        assert_eq!(payload.scopes.len(), 2);

        assert_eq!(
            Inbound::decode(r#"{"event":"somethingNew","stack":{}}"#).unwrap(),
            Inbound::Unknown
        );
        assert!(Inbound::decode("not json").is_err());
    }

    #[test]
    fn test_unknown_and_garbage_messages_ignored() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);

        session.handle_inbound(r#"{"event":"heartbeat"}"#);
        session.handle_inbound("{{{");
        assert!(session.drain_notifications().is_empty());
    }
}

#[cfg(test)]
mod execution_state_tests {
    use super::*;

    #[test]
    fn test_stack_before_pause_is_empty() {
        let state = ExecutionState::new();
        let stack = state.stack(0, 20);
        assert!(stack.frames.is_empty());
        assert_eq!(stack.count, 0);
        assert!(state.scopes(0).is_empty());
        assert!(!state.has_paused());
    }

    #[test]
    fn test_stack_pagination() {
        let mut state = ExecutionState::new();
        state.record_pause(snapshot(5), vec![]);

        let top = state.stack(0, 3);
        assert_eq!(top.frames.len(), 3);
        assert_eq!(top.count, 5);
        assert_eq!(top.frames[0].name, "frame0");

        let all = state.stack(0, 100);
        assert_eq!(all.frames.len(), 5);

        let tail = state.stack(3, 10);
        assert_eq!(tail.frames.iter().map(|f| f.index).collect::<Vec<_>>(), vec![3, 4]);

        assert!(state.stack(9, 2).frames.is_empty());
    }

    #[test]
    fn test_pause_replaces_stack_and_scopes_together() {
        let mut state = ExecutionState::new();
        state.record_pause(snapshot(3), vec![scope("Locals", json!({"a": 1}))]);
        state.record_pause(snapshot(1), vec![scope("Closure", json!({"b": 2}))]);

        assert_eq!(state.stack(0, 10).count, 1);
        let names: Vec<&str> = state.scopes(7).iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Closure"], "Scopes ignore the frame and follow the last pause");
    }

    #[test]
    fn test_variable_classification() {
        let vars: Vec<Variable> = [
            ("n", json!(0)),
            ("s", json!("")),
            ("b", json!(false)),
            ("z", json!(null)),
            ("o", json!({"k": [1, 2]})),
        ]
        .iter()
        .map(|(name, value)| Variable::from_value(name, value))
        .collect();

        let shown: Vec<(&str, &str)> = vars
            .iter()
            .map(|v| (v.type_name, v.value.as_str()))
            .collect();
        assert_eq!(
            shown,
            vec![
                ("number", "0"),
                ("string", ""),
                ("boolean", "false"),
                ("null", "null"),
                ("object", r#"{"k":[1,2]}"#),
            ]
        );
    }
}

#[cfg(test)]
mod handle_tests {
    use super::*;

    #[test]
    fn test_handles_are_forward_only_and_generation_scoped() {
        let mut handles = VariableHandles::new();
        let a = handles.allocate("Locals", 1);
        let b = handles.allocate("Globals", 1);
        assert_eq!(a, START_HANDLE);
        assert_eq!(b, START_HANDLE + 1);
        assert_eq!(handles.resolve(a).unwrap().to_string(), "Locals_1");

        handles.supersede();
        assert!(handles.resolve(a).is_none(), "Stale handles must miss");
        let c = handles.allocate("Locals", 1);
        assert!(c > b, "Handles are never reused");
        assert!(handles.resolve(999).is_none());
    }

    #[test]
    fn test_locals_handle_resolves_until_next_pause() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);
        session.handle_inbound(&pause_message("stopOnEntry", 2, json!({"count": 3, "name": "x"})));

        let scopes = session.scopes(1);
        let locals = scopes.iter().find(|s| s.name == "Locals").unwrap();
        let vars = session.variables(locals.handle);
        let pairs: Vec<(&str, &str)> = vars
            .iter()
            .map(|v| (v.name.as_str(), v.value.as_str()))
            .collect();
        assert_eq!(pairs, vec![("count", "3"), ("name", "x")]);

        session.handle_inbound(&pause_message("stopOnStep", 1, json!({"count": 4})));
        assert!(session.variables(locals.handle).is_empty());
    }

    #[test]
    fn test_local_root_prefixes_frame_files() {
        let spy = SpyConnector::default();
        let mut session = Session::new();
        session.launch("ws://127.0.0.1:9229", Some("/home/dev/project/"), &spy, noop_sink());
        session.handle_link_event(LinkEvent::Opened);
        session.handle_inbound(&pause_message("stopOnBreakpoint", 1, json!({})));

        let stack = session.stack(0, 1);
        assert_eq!(stack.frames[0].file, "/home/dev/project/src/app.js");
        assert_eq!(
            session.drain_notifications(),
            vec![Notification::Stopped {
                reason: StopReason::Breakpoint
            }]
        );
    }
}

#[cfg(test)]
mod framing_tests {
    use super::*;
    use netjs_debugger::dap::{read_message, DapMessageContent};
    use netjs_debugger::BridgeError;
    use std::io::Cursor;

    fn frame(body: &str) -> String {
        format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
    }

    const THREADS: &str = r#"{"seq":2,"type":"request","command":"threads"}"#;

    #[test]
    fn test_bad_length_header_keeps_stream_in_sync() {
        let input = format!(
            "Content-Length: nope\r\nContent-Type: application/json\r\n\r\n{}",
            frame(THREADS)
        );
        let mut reader = Cursor::new(input.into_bytes());

        match read_message(&mut reader) {
            Err(BridgeError::Framing(msg)) => assert!(msg.contains("nope"), "got {}", msg),
            other => panic!("Expected a framing error, got {:?}", other),
        }

        let next = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(next.seq, 2, "The following frame should still be readable");
        match next.content {
            DapMessageContent::Request { command, .. } => assert_eq!(command, "threads"),
            other => panic!("Expected a request, got {:?}", other),
        }
        assert!(read_message(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let mut reader = Cursor::new(b"Content-Length: 99999999999\r\n\r\n{}".to_vec());
        match read_message(&mut reader) {
            Err(BridgeError::Framing(msg)) => assert!(msg.contains("limit"), "got {}", msg),
            other => panic!("Expected a framing error, got {:?}", other),
        }
        assert!(read_message(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_missing_length_is_framing_error() {
        let input = format!("X-Other: 1\r\n\r\n{}", frame(THREADS));
        let mut reader = Cursor::new(input.into_bytes());
        assert!(matches!(read_message(&mut reader), Err(BridgeError::Framing(_))));
    }
}

#[cfg(test)]
mod repl_tests {
    use super::*;

    #[test]
    fn test_repl_grammar() {
        assert_eq!(parse_repl_command("new 10"), Some(ReplCommand::New(10)));
        assert_eq!(parse_repl_command("  del   4 "), Some(ReplCommand::Del(4)));
        assert_eq!(parse_repl_command("new"), None);
        assert_eq!(parse_repl_command("new ten"), None);
        assert_eq!(parse_repl_command("new 3 4"), None);
        assert_eq!(parse_repl_command("x + 1"), None);
    }

    #[test]
    fn test_repl_new_without_known_source_echoes() {
        let spy = SpyConnector::default();
        let mut session = open_session(&spy);

        assert_eq!(session.current_source(), None);
        assert_eq!(
            session.evaluate("new 3", Some("repl")),
            "evaluate(context: 'repl', 'new 3')"
        );
        assert_eq!(
            session.evaluate("del 3", Some("repl")),
            "evaluate(context: 'repl', 'del 3')"
        );
        assert!(session.drain_notifications().is_empty());
        assert_eq!(spy.command_names(), vec!["start"], "No breakpoint should reach the engine");
    }

    #[test]
    fn test_evaluate_outside_repl_echoes() {
        let mut session = Session::new();
        assert_eq!(
            session.evaluate("new 10", Some("hover")),
            "evaluate(context: 'hover', 'new 10')"
        );
        assert!(session.drain_notifications().is_empty());
    }
}
