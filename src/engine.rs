//! The command engine: per-player attempt tracking over the live input
//! stream.
//!
//! Each frame, for each player, the engine decays activation buffers,
//! advances every in-flight match attempt through zero or more steps, and
//! spawns new attempts wherever a sequence's first step just became
//! satisfied. Players update in fixed order (0 then 1) so two netplay peers
//! running the same inputs reach bit-identical state.
//!
//! Attempts move `Spawned -> Matching -> {Completed | Expired | Ruined}`;
//! only completion touches the state table, the other two are silent
//! discards.

use smallvec::SmallVec;

use crate::command::{CommandList, InputSequence};
use crate::mask::{CONTROLLER_COUNT, InputMask, InputSampler, RawInput};
use crate::state::CommandStateTable;
use crate::step::{EvalContext, Facing, StepQualifier, evaluate, is_target_satisfied};

/// Opaque handle to a registered command set. Handles from before a
/// re-registration go stale and read as inactive instead of aliasing the
/// replacement set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSetId {
    slot: usize,
    generation: u32,
}

impl CommandSetId {
    /// Which player slot this handle refers to.
    pub fn player(&self) -> usize {
        self.slot
    }
}

/// One in-progress, partially-matched instance of a command sequence.
/// References its definition by index only.
#[derive(Debug, Clone, Copy)]
struct MatchAttempt {
    command: usize,
    sequence: usize,
    step: usize,
    /// Frames since the attempt spawned, measured against the sequence's
    /// time budget.
    elapsed: u32,
}

/// What became of an attempt after one frame of advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    /// Still matching; keep for next frame.
    Matching,
    /// Sequence finished; command has been activated.
    Completed,
    /// Time budget exceeded.
    Expired,
    /// Hard failure (release-too-early); no partial credit.
    Ruined,
}

impl Advance {
    fn removes(self) -> bool {
        !matches!(self, Advance::Matching)
    }
}

/// Everything registered for one player: definitions, activation states,
/// and in-flight attempts.
struct CommandSet {
    commands: CommandList,
    states: CommandStateTable,
    attempts: SmallVec<[MatchAttempt; 8]>,
    /// One-attempt-in-flight guard, per definition.
    processing: Vec<bool>,
    facing: Facing,
    generation: u32,
    /// Sampler frame of the last update; makes `update` idempotent within a
    /// frame.
    last_update_frame: u64,
}

impl CommandSet {
    fn new(commands: CommandList, generation: u32) -> Self {
        let states = CommandStateTable::new(&commands);
        let processing = vec![false; commands.len()];
        Self {
            commands,
            states,
            attempts: SmallVec::new(),
            processing,
            facing: Facing::Right,
            generation,
            last_update_frame: 0,
        }
    }

    fn reset(&mut self) {
        self.attempts.clear();
        self.processing.iter_mut().for_each(|p| *p = false);
        self.states.clear();
    }

    fn update(&mut self, ctx: &EvalContext<'_>) {
        self.states.tick();
        self.advance_attempts(ctx);
        self.spawn_attempts(ctx);
    }

    fn advance_attempts(&mut self, ctx: &EvalContext<'_>) {
        let mut i = 0;
        while i < self.attempts.len() {
            let mut attempt = self.attempts[i];
            let result = advance_attempt(
                &mut attempt,
                &self.commands,
                &mut self.states,
                ctx,
            );
            if result.removes() {
                self.processing[attempt.command] = false;
                self.attempts.remove(i);
            } else {
                self.attempts[i] = attempt;
                i += 1;
            }
        }
    }

    fn spawn_attempts(&mut self, ctx: &EvalContext<'_>) {
        for (command_index, definition) in self.commands.iter().enumerate() {
            if self.processing[command_index] {
                continue;
            }
            for (sequence_index, sequence) in definition.sequences.iter().enumerate() {
                let Some(first) = sequence.steps.first() else {
                    continue;
                };
                let outcome = evaluate(first, ctx);
                if !outcome.active {
                    continue;
                }

                // A one-step sequence triggers without ever becoming an
                // attempt.
                if sequence.steps.len() == 1 {
                    self.states.set_active(command_index, sequence.buffer_frames);
                    continue;
                }

                let mut attempt = MatchAttempt {
                    command: command_index,
                    sequence: sequence_index,
                    step: if outcome.step_over { 1 } else { 0 },
                    elapsed: 0,
                };

                // Unless the next step would re-consume the very same press
                // edge, give the fresh attempt one advance in its spawn
                // frame so simultaneous inputs are not stalled a frame.
                let mut result = Advance::Matching;
                if attempt.step == 0 || !is_same_step_as_before(sequence, attempt.step) {
                    result = advance_attempt(
                        &mut attempt,
                        &self.commands,
                        &mut self.states,
                        ctx,
                    );
                }
                if !result.removes() {
                    self.processing[command_index] = true;
                    self.attempts.push(attempt);
                }
            }
        }
    }
}

/// A fresh step identical in qualifier and target to the press just
/// completed must wait for the next frame: a single press edge may not
/// satisfy two consecutive press steps. Double-tap commands (two Press-A
/// steps in a row) depend on this exact timing.
fn is_same_step_as_before(sequence: &InputSequence, step: usize) -> bool {
    debug_assert!(step > 0 && step < sequence.steps.len());
    let previous = &sequence.steps[step - 1];
    let current = &sequence.steps[step];
    previous.qualifier == StepQualifier::Press
        && current.qualifier == previous.qualifier
        && current.target == previous.target
}

fn advance_attempt(
    attempt: &mut MatchAttempt,
    commands: &CommandList,
    states: &mut CommandStateTable,
    ctx: &EvalContext<'_>,
) -> Advance {
    let Some(definition) = commands.get(attempt.command) else {
        return Advance::Expired;
    };
    let sequence = &definition.sequences[attempt.sequence];

    // A release step with a hold requirement is exempt from the budget
    // clock while it waits; everything else ticks against the budget.
    let waiting_on_charge = matches!(
        sequence.steps[attempt.step].qualifier,
        StepQualifier::Release { min_hold } if min_hold > 0
    );
    if !waiting_on_charge {
        attempt.elapsed += 1;
        if attempt.elapsed > sequence.time_budget {
            return Advance::Expired;
        }
    }

    loop {
        // A step directly after a hold step only counts while the held
        // target is still down this frame.
        if attempt.step > 0 {
            let previous = &sequence.steps[attempt.step - 1];
            if previous.qualifier == StepQualifier::Hold
                && !is_target_satisfied(&previous.target, ctx.current, ctx.facing)
            {
                return Advance::Matching;
            }
        }

        let step = &sequence.steps[attempt.step];
        let outcome = evaluate(step, ctx);
        if outcome.ruined {
            return Advance::Ruined;
        }
        if !outcome.active {
            return Advance::Matching;
        }
        if !outcome.step_over {
            return Advance::Matching;
        }

        attempt.step += 1;
        if attempt.step == sequence.steps.len() {
            states.set_active(attempt.command, sequence.buffer_frames);
            return Advance::Completed;
        }
        if is_same_step_as_before(sequence, attempt.step) {
            return Advance::Matching;
        }
    }
}

/// The command-recognition engine for both players.
///
/// Drive it once per simulation tick: [`sample`](Self::sample) with the
/// frame's raw input, then [`update`](Self::update) for player 0 and
/// player 1, then let the state machine poll the query methods.
pub struct CommandEngine {
    sampler: InputSampler,
    slots: [Option<CommandSet>; CONTROLLER_COUNT],
    generations: [u32; CONTROLLER_COUNT],
}

impl CommandEngine {
    pub fn new() -> Self {
        Self {
            sampler: InputSampler::new(),
            slots: [None, None],
            generations: [0; CONTROLLER_COUNT],
        }
    }

    /// Register a player's command set, replacing any previous registration
    /// for that slot. The returned handle is required for every query; old
    /// handles for the slot go stale.
    ///
    /// # Panics
    /// Panics if `player` is not 0 or 1.
    pub fn register(&mut self, player: usize, commands: CommandList) -> CommandSetId {
        assert!(player < CONTROLLER_COUNT, "player slot out of range");
        self.generations[player] += 1;
        let generation = self.generations[player];
        self.slots[player] = Some(CommandSet::new(commands, generation));
        CommandSetId {
            slot: player,
            generation,
        }
    }

    /// Capture this frame's raw input for both controllers. Call exactly
    /// once per simulation tick, before the per-player updates.
    pub fn sample(&mut self, inputs: &[RawInput; CONTROLLER_COUNT]) {
        self.sampler.sample(inputs);
    }

    /// Advance one player's command matching against the sampled frame.
    /// Idempotent within a frame: a second call before the next `sample` is
    /// a no-op, so attempts can never double-advance.
    pub fn update(&mut self, player: usize) {
        let frame = self.sampler.frame();
        let Some(set) = self.slots.get_mut(player).and_then(Option::as_mut) else {
            return;
        };
        if set.last_update_frame == frame {
            return;
        }
        set.last_update_frame = frame;

        let ctx = EvalContext::from_sampler(&self.sampler, player, set.facing);
        set.update(&ctx);
    }

    /// Convenience: sample and update both players in the fixed order the
    /// deterministic simulation requires.
    pub fn tick(&mut self, inputs: &[RawInput; CONTROLLER_COUNT]) {
        self.sample(inputs);
        for player in 0..CONTROLLER_COUNT {
            self.update(player);
        }
    }

    /// Clear a player's attempts and activation states atomically (match
    /// reset). Call between frames, never mid-evaluation.
    pub fn reset(&mut self, id: CommandSetId) {
        if let Some(set) = self.set_mut(id) {
            set.reset();
        }
    }

    pub fn is_command_active(&self, id: CommandSetId, name: &str) -> bool {
        self.set(id).is_some_and(|set| set.states.is_active(name))
    }

    pub fn is_command_active_by_index(&self, id: CommandSetId, index: usize) -> bool {
        self.set(id)
            .is_some_and(|set| set.states.is_active_by_index(index))
    }

    /// Resolve a name to its O(1) lookup index for hot-path polling.
    pub fn resolve_lookup_index(&self, id: CommandSetId, name: &str) -> Option<usize> {
        self.set(id)
            .and_then(|set| set.states.resolve_lookup_index(name))
    }

    /// Force a command active for `buffer_frames` without any input match
    /// (AI and debug tooling).
    pub fn force_command_active(&mut self, id: CommandSetId, name: &str, buffer_frames: u32) {
        if let Some(set) = self.set_mut(id) {
            set.states.force_active(name, buffer_frames);
        }
    }

    /// Force the `number`-th registered command active (debug tooling).
    /// Returns false when the number is out of range or the handle is stale.
    pub fn force_command_number_active(
        &mut self,
        id: CommandSetId,
        number: usize,
        buffer_frames: u32,
    ) -> bool {
        self.set_mut(id)
            .is_some_and(|set| set.states.force_active_by_number(number, buffer_frames))
    }

    /// Number of commands registered under this handle.
    pub fn command_count(&self, id: CommandSetId) -> usize {
        self.set(id).map_or(0, |set| set.states.len())
    }

    /// Update facing whenever the owning character turns; forward/backward
    /// targets resolve against it.
    pub fn set_facing(&mut self, id: CommandSetId, facing: Facing) {
        if let Some(set) = self.set_mut(id) {
            set.facing = facing;
        }
    }

    /// Force mask bits on for one controller for exactly one frame, folded
    /// into the next `sample` (AI or scripted input injection).
    pub fn inject_input(&mut self, player: usize, mask: InputMask) {
        if player < CONTROLLER_COUNT {
            self.sampler.inject_override(player, mask);
        }
    }

    /// Enable or disable a controller entirely; disabled controllers sample
    /// as all-zero.
    pub fn set_controller_enabled(&mut self, player: usize, enabled: bool) {
        if player < CONTROLLER_COUNT {
            self.sampler.set_enabled(player, enabled);
        }
    }

    /// Gate a controller's button bits while leaving directions live.
    pub fn set_buttons_allowed(&mut self, player: usize, allowed: bool) {
        if player < CONTROLLER_COUNT {
            self.sampler.set_buttons_allowed(player, allowed);
        }
    }

    pub(crate) fn state_table(&self, id: CommandSetId) -> Option<&CommandStateTable> {
        self.set(id).map(|set| &set.states)
    }

    pub(crate) fn state_table_mut(&mut self, id: CommandSetId) -> Option<&mut CommandStateTable> {
        self.set_mut(id).map(|set| &mut set.states)
    }

    fn set(&self, id: CommandSetId) -> Option<&CommandSet> {
        let set = self.slots.get(id.slot).and_then(Option::as_ref)?;
        if set.generation != id.generation {
            log::warn!(
                "Stale command set handle for player {} (generation {} != {})",
                id.slot,
                id.generation,
                set.generation
            );
            return None;
        }
        Some(set)
    }

    fn set_mut(&mut self, id: CommandSetId) -> Option<&mut CommandSet> {
        let set = self.slots.get_mut(id.slot).and_then(Option::as_mut)?;
        if set.generation != id.generation {
            log::warn!(
                "Stale command set handle for player {} (generation {} != {})",
                id.slot,
                id.generation,
                set.generation
            );
            return None;
        }
        Some(set)
    }
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new()
    }
}
