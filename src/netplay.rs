//! Netplay wire codec for command activation states.
//!
//! Instead of exchanging raw button samples every frame, a netplay peer
//! serializes its command state table and the remote side adopts it
//! wholesale. Both sides must have registered identical command sets in
//! identical order; any shape mismatch is a desync and must abort the
//! session rather than let the simulations drift apart.
//!
//! Wire format, little-endian, one record per command in registration
//! order (count implicit from the receiver's own registration):
//!
//! ```text
//! name_len: u32, name_bytes: utf8, is_active: u32, elapsed: u32, buffer: u32
//! ```

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::engine::{CommandEngine, CommandSetId};
use crate::state::{CommandState, CommandStateTable};

/// Fatal desync conditions. Recovering from any of these would silently
/// diverge the two simulations, so the netplay session must be torn down.
#[derive(Debug, thiserror::Error)]
pub enum NetplayError {
    /// Payload ended before every registered command was decoded.
    #[error("payload truncated: expected states for {expected} commands")]
    Truncated { expected: usize },

    /// Payload carried more records than the receiver has registered.
    #[error("payload carries more than the {expected} registered commands")]
    TrailingData { expected: usize },

    /// Command at `index` does not match the receiver's registration order.
    #[error("command order mismatch at index {index}: expected \"{expected}\", got \"{received}\"")]
    NameMismatch {
        index: usize,
        expected: String,
        received: String,
    },

    /// A command name on the wire was not valid UTF-8.
    #[error("command name at index {index} is not valid UTF-8")]
    InvalidName { index: usize },

    /// The handle does not refer to a live command set.
    #[error("stale or unregistered command set handle")]
    StaleHandle,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A decoded remote state table, ready to be adopted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStateSnapshot {
    entries: Vec<SnapshotEntry>,
}

/// One command's state as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub name: String,
    pub active: bool,
    pub elapsed: u32,
    pub buffer: u32,
}

impl CommandStateSnapshot {
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }
}

/// Serialize a state table in wire order.
pub fn encode_states<W: Write>(table: &CommandStateTable, writer: &mut W) -> io::Result<()> {
    for (name, state) in table.names().iter().zip(table.states()) {
        writer.write_u32::<LittleEndian>(name.len() as u32)?;
        writer.write_all(name.as_bytes())?;
        writer.write_u32::<LittleEndian>(state.active as u32)?;
        writer.write_u32::<LittleEndian>(state.elapsed)?;
        writer.write_u32::<LittleEndian>(state.buffer)?;
    }
    Ok(())
}

/// Decode a peer's state table, validating shape against the receiver's own
/// registration. The record count is implicit: exactly one per registered
/// command, in the same order.
pub fn decode_states<R: Read>(
    reader: &mut R,
    local: &CommandStateTable,
) -> Result<CommandStateSnapshot, NetplayError> {
    let expected = local.len();
    let mut entries = Vec::with_capacity(expected);

    for (index, expected_name) in local.names().iter().enumerate() {
        let entry = read_entry(reader, index).map_err(|e| match e {
            NetplayError::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
                NetplayError::Truncated { expected }
            }
            other => other,
        })?;
        if &entry.name != expected_name {
            return Err(NetplayError::NameMismatch {
                index,
                expected: expected_name.clone(),
                received: entry.name,
            });
        }
        entries.push(entry);
    }

    let mut rest = [0u8; 1];
    if reader.read(&mut rest)? != 0 {
        return Err(NetplayError::TrailingData { expected });
    }

    Ok(CommandStateSnapshot { entries })
}

fn read_entry<R: Read>(reader: &mut R, index: usize) -> Result<SnapshotEntry, NetplayError> {
    let name_len = reader.read_u32::<LittleEndian>()? as usize;
    let mut name_bytes = vec![0u8; name_len];
    reader.read_exact(&mut name_bytes)?;
    let name =
        String::from_utf8(name_bytes).map_err(|_| NetplayError::InvalidName { index })?;

    let active = reader.read_u32::<LittleEndian>()? != 0;
    let elapsed = reader.read_u32::<LittleEndian>()?;
    let buffer = reader.read_u32::<LittleEndian>()?;
    Ok(SnapshotEntry {
        name,
        active,
        elapsed,
        buffer,
    })
}

impl CommandEngine {
    /// Serialize a player's command states for the netplay transport.
    pub fn encode_command_states(&self, id: CommandSetId) -> Result<Vec<u8>, NetplayError> {
        let table = self.state_table(id).ok_or(NetplayError::StaleHandle)?;
        let mut bytes = Vec::new();
        encode_states(table, &mut bytes)?;
        Ok(bytes)
    }

    /// Replace a player's command states wholesale with a peer's payload.
    /// Validates the payload shape first; an error here means the session
    /// has desynced and must be aborted.
    pub fn apply_remote_command_states(
        &mut self,
        id: CommandSetId,
        payload: &[u8],
    ) -> Result<(), NetplayError> {
        let snapshot = {
            let table = self.state_table(id).ok_or(NetplayError::StaleHandle)?;
            decode_states(&mut &payload[..], table)?
        };
        let table = self.state_table_mut(id).ok_or(NetplayError::StaleHandle)?;
        table.overwrite(snapshot.entries.iter().map(|e| CommandState {
            active: e.active,
            elapsed: e.elapsed,
            buffer: e.buffer,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandDefinition, CommandList, InputSequence};
    use crate::step::{Button, InputStep, StepTarget};

    fn command_list(names: &[&str]) -> CommandList {
        names
            .iter()
            .map(|name| {
                CommandDefinition::single(
                    *name,
                    InputSequence::new(
                        vec![InputStep::press(StepTarget::Button(Button::A))],
                        1,
                        1,
                    ),
                )
            })
            .collect()
    }

    fn table(names: &[&str]) -> CommandStateTable {
        CommandStateTable::new(&command_list(names))
    }

    #[test]
    fn test_round_trip_reproduces_states() {
        let mut table = table(&["fireball", "uppercut", "throw"]);
        table.force_active("uppercut", 12);
        table.force_active("throw", 3);

        let mut bytes = Vec::new();
        encode_states(&table, &mut bytes).unwrap();
        let snapshot = decode_states(&mut &bytes[..], &table).unwrap();

        let entries = snapshot.entries();
        assert_eq!(entries.len(), 3);
        assert!(!entries[0].active);
        assert!(entries[1].active);
        assert_eq!(entries[1].buffer, 12);
        assert!(entries[2].active);
        assert_eq!(entries[2].buffer, 3);
    }

    #[test]
    fn test_count_mismatch_is_fatal() {
        let sender = table(&["fireball"]);
        let receiver = table(&["fireball", "uppercut"]);

        let mut bytes = Vec::new();
        encode_states(&sender, &mut bytes).unwrap();
        let result = decode_states(&mut &bytes[..], &receiver);
        assert!(matches!(result, Err(NetplayError::Truncated { expected: 2 })));

        // Too many records is just as fatal.
        let mut bytes = Vec::new();
        encode_states(&receiver, &mut bytes).unwrap();
        let result = decode_states(&mut &bytes[..], &sender);
        assert!(matches!(result, Err(NetplayError::TrailingData { .. })));
    }

    #[test]
    fn test_name_mismatch_is_fatal() {
        let sender = table(&["fireball"]);
        let receiver = table(&["uppercut"]);

        let mut bytes = Vec::new();
        encode_states(&sender, &mut bytes).unwrap();
        let result = decode_states(&mut &bytes[..], &receiver);
        assert!(matches!(result, Err(NetplayError::NameMismatch { index: 0, .. })));
    }

    #[test]
    fn test_truncated_payload_is_fatal() {
        let table = table(&["fireball"]);
        let mut bytes = Vec::new();
        encode_states(&table, &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 2);

        let result = decode_states(&mut &bytes[..], &table);
        assert!(matches!(result, Err(NetplayError::Truncated { .. })));
    }

    #[test]
    fn test_engine_adopts_remote_states() {
        let mut sender = CommandEngine::new();
        let sender_id = sender.register(0, command_list(&["fireball", "uppercut"]));
        sender.force_command_active(sender_id, "fireball", 8);

        let mut receiver = CommandEngine::new();
        let receiver_id = receiver.register(0, command_list(&["fireball", "uppercut"]));

        let payload = sender.encode_command_states(sender_id).unwrap();
        receiver
            .apply_remote_command_states(receiver_id, &payload)
            .unwrap();

        assert!(receiver.is_command_active(receiver_id, "fireball"));
        assert!(!receiver.is_command_active(receiver_id, "uppercut"));
    }
}
