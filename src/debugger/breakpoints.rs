use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub id: u64,
    pub line: i64,
    pub verified: bool,
}

/// Breakpoints per source file, in the order they were set.
///
/// Ids come from a counter that only moves forward, so an id is never handed
/// out twice within a session even after its breakpoint is cleared.
pub struct Breakpoints {
    by_file: HashMap<String, Vec<Breakpoint>>,
    next_id: u64,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self {
            by_file: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, path: &str, line: i64) -> Breakpoint {
        let bp = Breakpoint {
            id: self.next_id,
            line,
            verified: false,
        };
        self.next_id += 1;
        self.by_file
            .entry(path.to_string())
            .or_default()
            .push(bp.clone());
        debug!(target: "session", "breakpoint {} set at {}:{}", bp.id, path, line);
        bp
    }

    pub fn remove(&mut self, path: &str, line: i64) -> Option<Breakpoint> {
        let bps = self.by_file.get_mut(path)?;
        let index = bps.iter().position(|bp| bp.line == line)?;
        let bp = bps.remove(index);
        debug!(target: "session", "breakpoint {} removed from {}:{}", bp.id, path, line);
        Some(bp)
    }

    pub fn clear_file(&mut self, path: &str) {
        self.by_file.remove(path);
    }

    /// Applies a validation report. Returns false when the id is no longer held.
    pub fn validate(&mut self, id: u64, line: i64, verified: bool) -> bool {
        for bp in self.by_file.values_mut().flatten() {
            if bp.id == id {
                bp.line = line;
                bp.verified = verified;
                return true;
            }
        }
        false
    }

    pub fn for_file(&self, path: &str) -> &[Breakpoint] {
        self.by_file.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, path: &str, line: i64) -> bool {
        self.for_file(path).iter().any(|bp| bp.line == line)
    }
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self::new()
    }
}
