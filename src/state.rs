//! Per-command activation state exposed to external consumers.
//!
//! The state machine and AI poll this table every frame, so lookups come in
//! two forms: by name (hash lookup, tolerant of typos) and by a precomputed
//! numeric index (O(1) array access for the hot path). Both forms always
//! agree within a frame.

use hashbrown::HashMap;

use crate::command::CommandList;

/// Activation state for one command: an active flag plus a frame countdown.
/// Invariant: `active` is true exactly while frames remain on the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandState {
    pub active: bool,
    /// Frames elapsed since activation.
    pub elapsed: u32,
    /// Buffer duration the command was activated with.
    pub buffer: u32,
}

impl CommandState {
    fn activate(&mut self, buffer_frames: u32) {
        self.active = true;
        self.elapsed = 0;
        self.buffer = buffer_frames;
    }

    /// Advance the countdown one frame; clears `active` when the buffer is
    /// spent. A command activated with a 10-frame buffer reads active for
    /// exactly 10 frames including the activation frame.
    fn tick(&mut self) {
        if !self.active {
            return;
        }
        self.elapsed += 1;
        if self.elapsed >= self.buffer {
            self.active = false;
        }
    }
}

/// Activation states for every command of one registered set, in
/// registration order.
#[derive(Debug, Clone)]
pub struct CommandStateTable {
    states: Vec<CommandState>,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl CommandStateTable {
    pub fn new(commands: &CommandList) -> Self {
        let names: Vec<String> = commands.iter().map(|d| d.name.clone()).collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            states: vec![CommandState::default(); names.len()],
            names,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Is the named command currently active? An unknown name is a content
    /// mismatch, not an engine fault: it logs a warning and reads inactive.
    pub fn is_active(&self, name: &str) -> bool {
        match self.index.get(name) {
            Some(&i) => self.states[i].active,
            None => {
                log::warn!("Querying nonexistent command name \"{name}\"");
                false
            }
        }
    }

    /// Index form of [`is_active`](Self::is_active). Out-of-range indices
    /// (stale after a definition-set reload) log and read inactive.
    pub fn is_active_by_index(&self, index: usize) -> bool {
        match self.states.get(index) {
            Some(state) => state.active,
            None => {
                log::warn!("Querying nonexistent command lookup index {index}");
                false
            }
        }
    }

    /// Resolve a name to its O(1) lookup index, once, outside the hot path.
    pub fn resolve_lookup_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Force a command active for `buffer_frames`, bypassing input matching.
    /// Used by AI decision logic and debug tooling.
    pub fn force_active(&mut self, name: &str, buffer_frames: u32) {
        match self.index.get(name) {
            Some(&i) => self.states[i].activate(buffer_frames),
            None => log::warn!("Forcing nonexistent command name \"{name}\" active"),
        }
    }

    /// Force the `number`-th registered command active. Returns false when
    /// the number is out of range.
    pub fn force_active_by_number(&mut self, number: usize, buffer_frames: u32) -> bool {
        match self.states.get_mut(number) {
            Some(state) => {
                state.activate(buffer_frames);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_active(&mut self, command: usize, buffer_frames: u32) {
        if let Some(state) = self.states.get_mut(command) {
            state.activate(buffer_frames);
        }
    }

    /// Decay every active state by one frame.
    pub(crate) fn tick(&mut self) {
        for state in &mut self.states {
            state.tick();
        }
    }

    /// Clear all activation state (match reset).
    pub(crate) fn clear(&mut self) {
        for state in &mut self.states {
            *state = CommandState::default();
        }
    }

    /// Command names in registration order (the netplay wire order).
    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    /// States in registration order.
    pub(crate) fn states(&self) -> &[CommandState] {
        &self.states
    }

    /// Replace every state wholesale (netplay adoption). Caller has already
    /// validated that the snapshot shape matches this table.
    pub(crate) fn overwrite(&mut self, states: impl IntoIterator<Item = CommandState>) {
        for (slot, state) in self.states.iter_mut().zip(states) {
            *slot = state;
        }
    }
}
