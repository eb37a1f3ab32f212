//! Per-frame controller input sampling.
//!
//! Once per simulation tick the [`InputSampler`] folds each controller's raw
//! button/direction state (plus any one-frame override injection) into an
//! [`InputMask`]. The previous frame's mask is retained for press/release
//! edge detection, and per-bit consecutive-hold counters are maintained so
//! release steps can check how long an input had been held before letting go.

use bitflags::bitflags;

/// Number of controllers the engine samples.
pub const CONTROLLER_COUNT: usize = 2;

/// Number of distinct bits in an [`InputMask`].
pub const MASK_BITS: usize = 11;

bitflags! {
    /// One controller's input state for one frame.
    ///
    /// Six attack buttons, start, and the four raw dpad directions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputMask: u16 {
        const A = 1 << 0;
        const B = 1 << 1;
        const C = 1 << 2;
        const X = 1 << 3;
        const Y = 1 << 4;
        const Z = 1 << 5;

        const START = 1 << 6;

        const LEFT = 1 << 7;
        const RIGHT = 1 << 8;
        const UP = 1 << 9;
        const DOWN = 1 << 10;
    }
}

impl InputMask {
    /// All four raw direction bits.
    pub const DPAD: InputMask = InputMask::LEFT
        .union(InputMask::RIGHT)
        .union(InputMask::UP)
        .union(InputMask::DOWN);

    /// All button bits (attack buttons plus start).
    pub const BUTTONS: InputMask = InputMask::A
        .union(InputMask::B)
        .union(InputMask::C)
        .union(InputMask::X)
        .union(InputMask::Y)
        .union(InputMask::Z)
        .union(InputMask::START);

    /// Just the direction portion of this mask.
    pub fn dpad(self) -> InputMask {
        self & Self::DPAD
    }

    /// Bit position of a single-bit mask (for hold-counter indexing).
    pub(crate) fn bit_index(self) -> usize {
        debug_assert_eq!(self.bits().count_ones(), 1);
        self.bits().trailing_zeros() as usize
    }
}

/// Raw per-controller input state handed in by the platform layer each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
    pub c: bool,
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub start: bool,
}

impl RawInput {
    /// Fold the raw booleans into a mask.
    pub fn to_mask(self) -> InputMask {
        let mut mask = InputMask::empty();
        let mut set = |bit: InputMask, held: bool| {
            if held {
                mask |= bit;
            }
        };
        set(InputMask::A, self.a);
        set(InputMask::B, self.b);
        set(InputMask::C, self.c);
        set(InputMask::X, self.x);
        set(InputMask::Y, self.y);
        set(InputMask::Z, self.z);
        set(InputMask::START, self.start);
        set(InputMask::LEFT, self.left);
        set(InputMask::RIGHT, self.right);
        set(InputMask::UP, self.up);
        set(InputMask::DOWN, self.down);
        mask
    }
}

/// Per-controller sampler state: current/previous masks, one-frame override
/// injection, enable/lock gates, and consecutive-hold counters.
#[derive(Debug, Clone)]
struct ControllerChannel {
    current: InputMask,
    previous: InputMask,
    /// Bits forced on for exactly one frame (AI or scripted injection).
    /// Consumed and cleared by the next `sample` call.
    override_mask: InputMask,
    /// Disabled controllers contribute an all-zero mask.
    enabled: bool,
    /// When false, button bits are stripped from raw input while directions
    /// still pass through (cutscene-style button gate).
    buttons_allowed: bool,
    /// Frames each bit has been continuously held, as of the current frame.
    hold_frames: [u32; MASK_BITS],
    /// Hold counters as of the previous frame. A release edge reads these:
    /// the current-frame counter has already been reset to zero.
    prev_hold_frames: [u32; MASK_BITS],
}

impl ControllerChannel {
    fn new() -> Self {
        Self {
            current: InputMask::empty(),
            previous: InputMask::empty(),
            override_mask: InputMask::empty(),
            enabled: true,
            buttons_allowed: true,
            hold_frames: [0; MASK_BITS],
            prev_hold_frames: [0; MASK_BITS],
        }
    }

    fn sample(&mut self, raw: RawInput) {
        self.previous = self.current;

        let mut mask = if self.enabled {
            raw.to_mask()
        } else {
            InputMask::empty()
        };
        if !self.buttons_allowed {
            mask &= !InputMask::BUTTONS;
        }
        // Injected bits bypass the gates: they come from the engine itself,
        // not the player.
        mask |= self.override_mask;
        self.override_mask = InputMask::empty();

        self.current = mask;

        self.prev_hold_frames = self.hold_frames;
        for bit in 0..MASK_BITS {
            if self.current.bits() & (1 << bit) != 0 {
                self.hold_frames[bit] += 1;
            } else {
                self.hold_frames[bit] = 0;
            }
        }
    }
}

/// Samples both controllers once per frame and owns the resulting masks.
#[derive(Debug, Clone)]
pub struct InputSampler {
    channels: [ControllerChannel; CONTROLLER_COUNT],
    frame: u64,
}

impl InputSampler {
    pub fn new() -> Self {
        Self {
            channels: [ControllerChannel::new(), ControllerChannel::new()],
            frame: 0,
        }
    }

    /// Capture this frame's input for both controllers. Always succeeds;
    /// a disabled controller simply samples as all-zero.
    pub fn sample(&mut self, inputs: &[RawInput; CONTROLLER_COUNT]) {
        for (channel, raw) in self.channels.iter_mut().zip(inputs) {
            channel.sample(*raw);
        }
        self.frame += 1;
    }

    /// Monotonic frame counter, incremented by each `sample` call.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn current(&self, controller: usize) -> InputMask {
        self.channels[controller].current
    }

    pub fn previous(&self, controller: usize) -> InputMask {
        self.channels[controller].previous
    }

    /// Consecutive-hold counters as of the previous frame; what a release
    /// edge reads to learn how long the input had been held.
    pub fn prev_hold_frames(&self, controller: usize) -> &[u32; MASK_BITS] {
        &self.channels[controller].prev_hold_frames
    }

    /// Force bits on for exactly one frame, folded into the next `sample`.
    /// Used by AI decision logic and scripted input playback.
    pub fn inject_override(&mut self, controller: usize, mask: InputMask) {
        self.channels[controller].override_mask |= mask;
    }

    /// Enable or disable a controller entirely (e.g. during an input lock).
    pub fn set_enabled(&mut self, controller: usize, enabled: bool) {
        self.channels[controller].enabled = enabled;
    }

    /// Gate button bits while leaving directions live.
    pub fn set_buttons_allowed(&mut self, controller: usize, allowed: bool) {
        self.channels[controller].buttons_allowed = allowed;
    }
}

impl Default for InputSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press_a() -> RawInput {
        RawInput {
            a: true,
            ..RawInput::default()
        }
    }

    #[test]
    fn test_sample_edges() {
        let mut sampler = InputSampler::new();
        sampler.sample(&[press_a(), RawInput::default()]);
        assert!(sampler.current(0).contains(InputMask::A));
        assert!(!sampler.previous(0).contains(InputMask::A));
        assert_eq!(sampler.current(1), InputMask::empty());

        sampler.sample(&[press_a(), RawInput::default()]);
        assert!(sampler.current(0).contains(InputMask::A));
        assert!(sampler.previous(0).contains(InputMask::A));
    }

    #[test]
    fn test_override_lasts_one_frame() {
        let mut sampler = InputSampler::new();
        sampler.inject_override(0, InputMask::X);
        sampler.sample(&[RawInput::default(), RawInput::default()]);
        assert!(sampler.current(0).contains(InputMask::X));

        sampler.sample(&[RawInput::default(), RawInput::default()]);
        assert!(!sampler.current(0).contains(InputMask::X));
    }

    #[test]
    fn test_disabled_controller_is_all_zero() {
        let mut sampler = InputSampler::new();
        sampler.set_enabled(0, false);
        sampler.sample(&[press_a(), RawInput::default()]);
        assert_eq!(sampler.current(0), InputMask::empty());
    }

    #[test]
    fn test_button_gate_passes_directions() {
        let mut sampler = InputSampler::new();
        sampler.set_buttons_allowed(0, false);
        let raw = RawInput {
            a: true,
            down: true,
            ..RawInput::default()
        };
        sampler.sample(&[raw, RawInput::default()]);
        assert_eq!(sampler.current(0), InputMask::DOWN);
    }

    #[test]
    fn test_hold_counters_track_consecutive_frames() {
        let mut sampler = InputSampler::new();
        for _ in 0..3 {
            sampler.sample(&[press_a(), RawInput::default()]);
        }
        sampler.sample(&[RawInput::default(), RawInput::default()]);

        // At the release frame the live counter is reset but the previous
        // frame's value is still readable.
        let idx = InputMask::A.bit_index();
        assert_eq!(sampler.prev_hold_frames(0)[idx], 3);
    }
}
