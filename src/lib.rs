//! Fightcore Input - Deterministic command recognition
//!
//! This crate turns raw per-frame controller samples for up to two players
//! into discrete, named command activation events: quarter-circle motions,
//! charge moves, button holds. The character state machine and AI poll the
//! resulting activation states instead of reading raw input.
//!
//! # Architecture
//!
//! - [`InputSampler`] - folds raw button/direction state (plus AI injection)
//!   into a per-frame bitmask per controller
//! - [`evaluate`] - answers whether a single step is satisfied this frame
//! - [`CommandEngine`] - tracks competing partial matches per player and
//!   promotes completed sequences to active command states
//! - [`CommandStateTable`] - activation flags polled by name or by a
//!   precomputed lookup index
//! - [`netplay`] - serializes command states so a remote peer adopts them
//!   verbatim instead of re-deriving them from raw input
//!
//! Everything is single-threaded and synchronous: the engine advances
//! exactly once per fixed simulation tick, players in fixed order, so two
//! netplay peers running the same inputs stay bit-identical.

pub mod command;
pub mod engine;
pub mod mask;
pub mod netplay;
pub mod state;
pub mod step;

pub use command::{CommandDefinition, CommandList, InputSequence};
pub use engine::{CommandEngine, CommandSetId};
pub use mask::{CONTROLLER_COUNT, InputMask, InputSampler, MASK_BITS, RawInput};
pub use netplay::{CommandStateSnapshot, NetplayError, SnapshotEntry, decode_states, encode_states};
pub use state::{CommandState, CommandStateTable};
pub use step::{
    Button, Direction, DirectionGroup, EvalContext, Facing, InputStep, StepOutcome, StepQualifier,
    StepTarget, evaluate,
};
