use std::collections::HashMap;
use std::fmt;

/// First handle value handed out; small numbers stay free for the client.
pub const START_HANDLE: i64 = 1000;

/// The scope a variables handle stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeKey {
    pub scope_name: String,
    pub frame_ref: i64,
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.scope_name, self.frame_ref)
    }
}

/// Forward-only handle allocator. Every pause starts a new generation and
/// handles minted in an older one stop resolving.
pub struct VariableHandles {
    generation: u64,
    next: i64,
    table: HashMap<i64, (u64, ScopeKey)>,
}

impl VariableHandles {
    pub fn new() -> Self {
        Self {
            generation: 0,
            next: START_HANDLE,
            table: HashMap::new(),
        }
    }

    pub fn allocate(&mut self, scope_name: &str, frame_ref: i64) -> i64 {
        let handle = self.next;
        self.next += 1;
        self.table.insert(
            handle,
            (
                self.generation,
                ScopeKey {
                    scope_name: scope_name.to_string(),
                    frame_ref,
                },
            ),
        );
        handle
    }

    pub fn resolve(&self, handle: i64) -> Option<&ScopeKey> {
        match self.table.get(&handle) {
            Some((generation, key)) if *generation == self.generation => Some(key),
            _ => None,
        }
    }

    pub fn supersede(&mut self) {
        self.generation += 1;
        self.table.clear();
    }
}

impl Default for VariableHandles {
    fn default() -> Self {
        Self::new()
    }
}
