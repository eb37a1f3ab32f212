//! Input steps and the per-frame step evaluator.
//!
//! A step is the atomic unit of a command definition: a target (button,
//! direction, direction group, or an AND-combo of sub-steps) tagged with
//! hold/press/release semantics. [`evaluate`] answers, for a single frame,
//! whether the step is satisfied, whether the owning attempt should advance
//! past it, and whether the attempt is ruined outright (a charge released
//! too early).
//!
//! Evaluation is a pure function of the step and an [`EvalContext`]; it
//! never mutates sampler or attempt state.

use serde::{Deserialize, Serialize};

use crate::mask::{InputMask, MASK_BITS};

/// Attack buttons plus start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    A,
    B,
    C,
    X,
    Y,
    Z,
    Start,
}

impl Button {
    fn mask(self) -> InputMask {
        match self {
            Button::A => InputMask::A,
            Button::B => InputMask::B,
            Button::C => InputMask::C,
            Button::X => InputMask::X,
            Button::Y => InputMask::Y,
            Button::Z => InputMask::Z,
            Button::Start => InputMask::START,
        }
    }
}

/// A single direction target. Forward/backward (and their diagonals) are
/// resolved against the character's facing at evaluation time; up/down are
/// raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Forward,
    Backward,
    DownForward,
    DownBackward,
    UpForward,
    UpBackward,
}

/// A "multi" direction group: satisfied by any of the three variants that
/// share the group's axis (e.g. AnyForward = forward, up-forward, or
/// down-forward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionGroup {
    AnyUp,
    AnyDown,
    AnyForward,
    AnyBackward,
}

impl DirectionGroup {
    fn variants(self) -> [Direction; 3] {
        match self {
            DirectionGroup::AnyUp => [Direction::Up, Direction::UpForward, Direction::UpBackward],
            DirectionGroup::AnyDown => {
                [Direction::Down, Direction::DownForward, Direction::DownBackward]
            }
            DirectionGroup::AnyForward => {
                [Direction::Forward, Direction::UpForward, Direction::DownForward]
            }
            DirectionGroup::AnyBackward => {
                [Direction::Backward, Direction::UpBackward, Direction::DownBackward]
            }
        }
    }

    /// The axis bit shared by every variant of the group, used to measure
    /// how long the group had been held before a release.
    fn axis_mask(self, facing: Facing) -> InputMask {
        match self {
            DirectionGroup::AnyUp => InputMask::UP,
            DirectionGroup::AnyDown => InputMask::DOWN,
            DirectionGroup::AnyForward => facing.forward_bit(),
            DirectionGroup::AnyBackward => facing.backward_bit(),
        }
    }
}

/// Which horizontal direction the owning character faces. Determines how
/// forward/backward targets map onto the raw left/right bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    fn forward_bit(self) -> InputMask {
        match self {
            Facing::Right => InputMask::RIGHT,
            Facing::Left => InputMask::LEFT,
        }
    }

    fn backward_bit(self) -> InputMask {
        match self {
            Facing::Right => InputMask::LEFT,
            Facing::Left => InputMask::RIGHT,
        }
    }
}

/// What a step matches against the input mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepTarget {
    Button(Button),
    Direction(Direction),
    Group(DirectionGroup),
    /// AND-group of sub-steps that must all be satisfied in the same frame
    /// (e.g. two buttons pressed simultaneously). Evaluated structurally;
    /// the owning step's qualifier is ignored, each sub-step carries its
    /// own.
    Combo(Vec<InputStep>),
}

/// Hold/press/release semantics for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepQualifier {
    /// Satisfied while the target is held. Always reports step-over; the
    /// attempt's hold-sustain rule enforces holding across later steps.
    Hold,
    /// Rising edge: satisfied on the first frame the target appears.
    Press,
    /// Falling edge. With nonzero `min_hold`, letting go before that many
    /// consecutive held frames ruins the whole attempt (charge timing).
    Release { min_hold: u32 },
}

/// One atomic unit of a command's input sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputStep {
    pub target: StepTarget,
    pub qualifier: StepQualifier,
}

impl InputStep {
    pub fn new(target: StepTarget, qualifier: StepQualifier) -> Self {
        Self { target, qualifier }
    }

    pub fn press(target: StepTarget) -> Self {
        Self::new(target, StepQualifier::Press)
    }

    pub fn hold(target: StepTarget) -> Self {
        Self::new(target, StepQualifier::Hold)
    }

    pub fn release(target: StepTarget, min_hold: u32) -> Self {
        Self::new(target, StepQualifier::Release { min_hold })
    }
}

/// Everything a single step evaluation may read.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub current: InputMask,
    pub previous: InputMask,
    pub facing: Facing,
    /// Consecutive-hold counters as of the previous frame (see
    /// [`crate::mask::InputSampler::prev_hold_frames`]).
    pub prev_hold_frames: &'a [u32; MASK_BITS],
}

impl<'a> EvalContext<'a> {
    /// Borrow one controller's view of the sampler for this frame.
    pub fn from_sampler(
        sampler: &'a crate::mask::InputSampler,
        controller: usize,
        facing: Facing,
    ) -> Self {
        Self {
            current: sampler.current(controller),
            previous: sampler.previous(controller),
            facing,
            prev_hold_frames: sampler.prev_hold_frames(controller),
        }
    }
}

/// Result of evaluating one step for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// The step is satisfied this frame.
    pub active: bool,
    /// The attempt should advance past this step.
    pub step_over: bool,
    /// The attempt must be discarded (release-too-early).
    pub ruined: bool,
}

/// Is `target` satisfied by `mask`? Direction targets compare the four
/// dpad bits exactly: down-forward does not satisfy a plain forward target.
pub(crate) fn is_target_satisfied(target: &StepTarget, mask: InputMask, facing: Facing) -> bool {
    match target {
        StepTarget::Button(button) => mask.contains(button.mask()),
        StepTarget::Direction(direction) => mask.dpad() == direction_mask(*direction, facing),
        StepTarget::Group(group) => group
            .variants()
            .iter()
            .any(|d| mask.dpad() == direction_mask(*d, facing)),
        StepTarget::Combo(sub_steps) => sub_steps
            .iter()
            .all(|s| is_target_satisfied(&s.target, mask, facing)),
    }
}

fn direction_mask(direction: Direction, facing: Facing) -> InputMask {
    match direction {
        Direction::Up => InputMask::UP,
        Direction::Down => InputMask::DOWN,
        Direction::Forward => facing.forward_bit(),
        Direction::Backward => facing.backward_bit(),
        Direction::DownForward => InputMask::DOWN | facing.forward_bit(),
        Direction::DownBackward => InputMask::DOWN | facing.backward_bit(),
        Direction::UpForward => InputMask::UP | facing.forward_bit(),
        Direction::UpBackward => InputMask::UP | facing.backward_bit(),
    }
}

/// Frames the target had been continuously held, as of the frame before the
/// release edge. For multi-bit direction targets this is the shortest hold
/// among the required bits; for groups, the hold of the shared axis bit.
fn held_duration(target: &StepTarget, ctx: &EvalContext<'_>) -> u32 {
    let bits = match target {
        StepTarget::Button(button) => button.mask(),
        StepTarget::Direction(direction) => direction_mask(*direction, ctx.facing),
        StepTarget::Group(group) => group.axis_mask(ctx.facing),
        // Combos recurse through `evaluate`; each sub-step measures its own.
        StepTarget::Combo(_) => return 0,
    };
    bits.iter()
        .map(|bit| ctx.prev_hold_frames[bit.bit_index()])
        .min()
        .unwrap_or(0)
}

/// Evaluate one step against one frame of input.
pub fn evaluate(step: &InputStep, ctx: &EvalContext<'_>) -> StepOutcome {
    if let StepTarget::Combo(sub_steps) = &step.target {
        return evaluate_combo(sub_steps, ctx);
    }

    let now = is_target_satisfied(&step.target, ctx.current, ctx.facing);
    let before = is_target_satisfied(&step.target, ctx.previous, ctx.facing);

    match step.qualifier {
        StepQualifier::Hold => StepOutcome {
            active: now,
            step_over: true,
            ruined: false,
        },
        StepQualifier::Press => StepOutcome {
            active: now && !before,
            step_over: true,
            ruined: false,
        },
        StepQualifier::Release { min_hold } => {
            let edge = before && !now;
            if !edge {
                return StepOutcome::default();
            }
            if min_hold > 0 && held_duration(&step.target, ctx) < min_hold {
                StepOutcome {
                    active: false,
                    step_over: false,
                    ruined: true,
                }
            } else {
                StepOutcome {
                    active: true,
                    step_over: true,
                    ruined: false,
                }
            }
        }
    }
}

fn evaluate_combo(sub_steps: &[InputStep], ctx: &EvalContext<'_>) -> StepOutcome {
    let mut all_active = true;
    let mut all_over = true;
    for sub in sub_steps {
        let outcome = evaluate(sub, ctx);
        if outcome.ruined {
            return outcome;
        }
        all_active &= outcome.active;
        all_over &= outcome.step_over;
    }
    StepOutcome {
        active: all_active && !sub_steps.is_empty(),
        step_over: all_active && all_over,
        ruined: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        current: InputMask,
        previous: InputMask,
        facing: Facing,
        holds: &'a [u32; MASK_BITS],
    ) -> EvalContext<'a> {
        EvalContext {
            current,
            previous,
            facing,
            prev_hold_frames: holds,
        }
    }

    const NO_HOLDS: [u32; MASK_BITS] = [0; MASK_BITS];

    #[test]
    fn test_press_requires_rising_edge() {
        let step = InputStep::press(StepTarget::Button(Button::A));
        let fresh = ctx(InputMask::A, InputMask::empty(), Facing::Right, &NO_HOLDS);
        assert!(evaluate(&step, &fresh).active);

        let held = ctx(InputMask::A, InputMask::A, Facing::Right, &NO_HOLDS);
        assert!(!evaluate(&step, &held).active);
    }

    #[test]
    fn test_hold_is_level_triggered() {
        let step = InputStep::hold(StepTarget::Direction(Direction::Down));
        let held = ctx(InputMask::DOWN, InputMask::DOWN, Facing::Right, &NO_HOLDS);
        let outcome = evaluate(&step, &held);
        assert!(outcome.active);
        assert!(outcome.step_over);
    }

    #[test]
    fn test_direction_equality_is_exact() {
        let step = InputStep::press(StepTarget::Direction(Direction::Forward));
        let diagonal = ctx(
            InputMask::RIGHT | InputMask::DOWN,
            InputMask::empty(),
            Facing::Right,
            &NO_HOLDS,
        );
        assert!(!evaluate(&step, &diagonal).active);
    }

    #[test]
    fn test_facing_resolves_forward() {
        let step = InputStep::press(StepTarget::Direction(Direction::Forward));
        let right = ctx(InputMask::RIGHT, InputMask::empty(), Facing::Right, &NO_HOLDS);
        assert!(evaluate(&step, &right).active);

        let left_facing = ctx(InputMask::RIGHT, InputMask::empty(), Facing::Left, &NO_HOLDS);
        assert!(!evaluate(&step, &left_facing).active);

        let back = InputStep::press(StepTarget::Direction(Direction::Backward));
        assert!(evaluate(&back, &left_facing).active);
    }

    #[test]
    fn test_group_matches_any_variant() {
        let step = InputStep::hold(StepTarget::Group(DirectionGroup::AnyForward));
        for mask in [
            InputMask::RIGHT,
            InputMask::RIGHT | InputMask::UP,
            InputMask::RIGHT | InputMask::DOWN,
        ] {
            let c = ctx(mask, InputMask::empty(), Facing::Right, &NO_HOLDS);
            assert!(evaluate(&step, &c).active);
        }
        let wrong = ctx(InputMask::LEFT, InputMask::empty(), Facing::Right, &NO_HOLDS);
        assert!(!evaluate(&step, &wrong).active);
    }

    #[test]
    fn test_release_edge_without_min_hold() {
        let step = InputStep::release(StepTarget::Button(Button::B), 0);
        let released = ctx(InputMask::empty(), InputMask::B, Facing::Right, &NO_HOLDS);
        let outcome = evaluate(&step, &released);
        assert!(outcome.active);
        assert!(!outcome.ruined);
    }

    #[test]
    fn test_release_too_early_ruins() {
        let step = InputStep::release(StepTarget::Button(Button::B), 30);
        let mut holds = NO_HOLDS;
        holds[InputMask::B.bit_index()] = 29;
        let released = ctx(InputMask::empty(), InputMask::B, Facing::Right, &holds);
        let outcome = evaluate(&step, &released);
        assert!(outcome.ruined);
        assert!(!outcome.active);

        holds[InputMask::B.bit_index()] = 30;
        let released = ctx(InputMask::empty(), InputMask::B, Facing::Right, &holds);
        let outcome = evaluate(&step, &released);
        assert!(outcome.active);
        assert!(!outcome.ruined);
    }

    #[test]
    fn test_combo_requires_all_sub_steps() {
        let step = InputStep::hold(StepTarget::Combo(vec![
            InputStep::press(StepTarget::Button(Button::A)),
            InputStep::press(StepTarget::Button(Button::B)),
        ]));
        let both = ctx(
            InputMask::A | InputMask::B,
            InputMask::empty(),
            Facing::Right,
            &NO_HOLDS,
        );
        let outcome = evaluate(&step, &both);
        assert!(outcome.active);
        assert!(outcome.step_over);

        let only_a = ctx(InputMask::A, InputMask::empty(), Facing::Right, &NO_HOLDS);
        assert!(!evaluate(&step, &only_a).active);
    }
}
