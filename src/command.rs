//! Command definitions: named input patterns the engine recognizes.
//!
//! Definitions are loaded once per match registration and read-only
//! thereafter. In-flight match attempts reference them by index, never by
//! pointer, so an attempt can never outlive or alias its definition.

use serde::{Deserialize, Serialize};

use crate::step::InputStep;

/// One ordered list of steps plus its timing windows. A command may carry
/// several sequences as alternatives; completing any one activates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSequence {
    pub steps: Vec<InputStep>,
    /// Total frames the whole sequence may take before the attempt expires.
    pub time_budget: u32,
    /// Frames the command stays reported active after completion.
    pub buffer_frames: u32,
}

impl InputSequence {
    pub fn new(steps: Vec<InputStep>, time_budget: u32, buffer_frames: u32) -> Self {
        Self {
            steps,
            time_budget,
            buffer_frames,
        }
    }
}

/// A named command: one or more alternative input sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    pub sequences: Vec<InputSequence>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, sequences: Vec<InputSequence>) -> Self {
        Self {
            name: name.into(),
            sequences,
        }
    }

    /// Convenience for the common single-sequence case.
    pub fn single(name: impl Into<String>, sequence: InputSequence) -> Self {
        Self::new(name, vec![sequence])
    }
}

/// Ordered set of command definitions for one player. Registration order is
/// canonical: it fixes lookup indices and the netplay wire order, so both
/// netplay peers must build their lists identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandList {
    definitions: Vec<CommandDefinition>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition. A duplicate name is logged and dropped: lookups
    /// are by name, and silently shadowing an earlier entry would make
    /// name- and index-based queries disagree.
    pub fn push(&mut self, definition: CommandDefinition) {
        if self.definitions.iter().any(|d| d.name == definition.name) {
            log::warn!(
                "Dropping duplicate command definition \"{}\"",
                definition.name
            );
            return;
        }
        self.definitions.push(definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CommandDefinition> {
        self.definitions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.definitions.iter()
    }
}

impl FromIterator<CommandDefinition> for CommandList {
    fn from_iter<T: IntoIterator<Item = CommandDefinition>>(iter: T) -> Self {
        let mut list = CommandList::new();
        for definition in iter {
            list.push(definition);
        }
        list
    }
}
