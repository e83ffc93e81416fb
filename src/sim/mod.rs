//! The deterministic fixed-point simulation.
//!
//! Everything in this module is integer arithmetic over a fixed-point scale
//! of [`FIXED_SCALE`] units per world unit. No floating point appears
//! anywhere in the simulation, the state hash, or the wire codec: IEEE-754
//! rounding differs across CPUs, compilers and optimisation flags, and a
//! single divergent ULP at frame N corrupts every subsequent state.
//!
//! The simulation also never reads a clock. The caller is the sole
//! timekeeper; the core's only notion of time is the frame counter inside
//! [`SimState`].
//!
//! [`SimState`] is a plain value: copying it produces a fully independent
//! snapshot with no aliasing, which is what makes O(1) snapshot save and
//! restore possible in the rollback session.

mod step;

pub use step::step;

use serde::{Deserialize, Serialize};

use crate::rng::XorShift32;
use crate::{Frame, RiposteResult};

// =============================================================================
// TUNING CONSTANTS (fixed-point integers)
// =============================================================================

/// Fixed-point units per world unit.
pub const FIXED_SCALE: i32 = 1000;

/// Simulation rate in ticks per second.
pub const TICKS_PER_SECOND: u32 = 60;

/// Left arena bound.
pub const MIN_X: i32 = 0;
/// Right arena bound.
pub const MAX_X: i32 = 20_000;
/// Floor height.
pub const GROUND_Y: i32 = 0;

/// Player AABB width.
pub const PLAYER_WIDTH: i32 = 600;
/// Player AABB height.
pub const PLAYER_HEIGHT: i32 = 900;

/// Player 1 spawn X.
pub const P1_START_X: i32 = 4_000;
/// Player 2 spawn X.
pub const P2_START_X: i32 = 16_000;
/// Spawn Y for both players.
pub const START_Y: i32 = 0;

/// Horizontal distance covered per tick of held Left/Right.
pub const MOVE_SPEED_PER_TICK: i32 = 300;
/// Per-tick change to vertical velocity.
pub const GRAVITY_PER_TICK: i32 = -40;
/// Initial upward velocity of a jump.
pub const JUMP_VELOCITY_PER_TICK: i32 = 500;

/// Attack hitbox width.
pub const ATTACK_HITBOX_WIDTH: i32 = 700;
/// Attack hitbox height.
pub const ATTACK_HITBOX_HEIGHT: i32 = 700;
/// Ticks the attack hitbox stays open.
pub const ATTACK_ACTIVE_FRAMES: u32 = 5;
/// Minimum ticks between attack starts. Always at least
/// [`ATTACK_ACTIVE_FRAMES`]: the active window closes before the cooldown.
pub const ATTACK_COOLDOWN_FRAMES: u32 = 30;
/// HP removed by a landed attack.
pub const ATTACK_DAMAGE: u32 = 25;
/// Ticks a defender is locked out after being hit.
pub const HITSTUN_FRAMES: u32 = 20;
/// Starting HP.
pub const DEFAULT_HP: u32 = 100;

/// What a player is currently doing.
///
/// The discriminants are part of the state-hash contract and must not be
/// reordered.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum ActionState {
    /// Standing still.
    #[default]
    Idle = 0,
    /// Moving left or right on the ground.
    Run = 1,
    /// Airborne from a jump.
    Jump = 2,
    /// Attack window open or recovering.
    Attack = 3,
    /// Locked out after being hit.
    Hitstun = 4,
}

impl std::fmt::Display for ActionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "Idle",
            Self::Run => "Run",
            Self::Jump => "Jump",
            Self::Attack => "Attack",
            Self::Hitstun => "Hitstun",
        };
        write!(f, "{}", label)
    }
}

/// The complete state of one player.
///
/// Positions and velocities are fixed-point integers ([`FIXED_SCALE`] units
/// per world unit). All fields are public: this is a plain value the caller
/// may inspect freely, and the step function is the only sanctioned way to
/// advance it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerState {
    /// Horizontal position of the AABB's left edge, in fixed units.
    pub x: i32,
    /// Vertical position of the AABB's bottom edge, in fixed units.
    pub y: i32,
    /// Horizontal velocity in fixed units per tick.
    pub vx: i32,
    /// Vertical velocity in fixed units per tick.
    pub vy: i32,
    /// Facing direction: `+1` right, `-1` left.
    pub facing: i32,
    /// Current action.
    pub action: ActionState,
    /// Remaining hitstun lockout, in ticks.
    pub hitstun_frames: u32,
    /// Remaining hit points, in `[0, DEFAULT_HP]`.
    pub hp: u32,
    /// Ticks until another attack may start.
    pub attack_cooldown_frames: u32,
    /// Ticks the current attack hitbox remains open.
    pub attack_active_frames: u32,
    /// Whether the current attack has already landed. Cleared on attack
    /// start, set on the first hit, and otherwise retained.
    pub attack_has_hit: bool,
}

impl PlayerState {
    /// A grounded, idle player at the given spawn position and facing.
    #[must_use]
    pub const fn spawn(x: i32, facing: i32) -> Self {
        Self {
            x,
            y: START_Y,
            vx: 0,
            vy: 0,
            facing,
            action: ActionState::Idle,
            hitstun_frames: 0,
            hp: DEFAULT_HP,
            attack_cooldown_frames: 0,
            attack_active_frames: 0,
            attack_has_hit: false,
        }
    }
}

impl Default for PlayerState {
    /// Player 1's spawn state.
    fn default() -> Self {
        Self::spawn(P1_START_X, 1)
    }
}

/// A complete simulation snapshot: frame counter, both players, and the
/// PRNG state.
///
/// `SimState` is `Copy`. Snapshot rings and the rollback session rely on
/// this: every save and load is a plain value copy, never a shared
/// reference, so a restored snapshot cannot alias the live state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimState {
    /// The number of steps applied so far.
    pub frame: Frame,
    /// Player 1.
    pub p1: PlayerState,
    /// Player 2.
    pub p2: PlayerState,
    /// The simulation's PRNG, carried as part of the state so random draws
    /// roll back with everything else.
    pub rng: XorShift32,
}

impl SimState {
    /// Creates the frame-0 state for a match: both players at their spawn
    /// positions facing each other, full HP, PRNG seeded from `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RiposteError::InvalidSeed`] for a zero seed.
    pub fn new(seed: u32) -> RiposteResult<Self> {
        Ok(Self {
            frame: Frame::ZERO,
            p1: PlayerState::spawn(P1_START_X, 1),
            p2: PlayerState::spawn(P2_START_X, -1),
            rng: XorShift32::new(seed)?,
        })
    }
}

impl Default for SimState {
    /// The frame-0 state with seed 1. Used where a placeholder value is
    /// needed (for example to pre-fill snapshot ring slots); real matches
    /// should construct through [`SimState::new`] with their own seed.
    fn default() -> Self {
        Self {
            frame: Frame::ZERO,
            p1: PlayerState::spawn(P1_START_X, 1),
            p2: PlayerState::spawn(P2_START_X, -1),
            rng: XorShift32::default(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::RiposteError;

    #[test]
    fn new_rejects_zero_seed() {
        assert_eq!(SimState::new(0).unwrap_err(), RiposteError::InvalidSeed);
    }

    #[test]
    fn new_spawns_facing_each_other() {
        let state = SimState::new(1).unwrap();
        assert_eq!(state.frame, Frame::ZERO);
        assert_eq!(state.p1.x, P1_START_X);
        assert_eq!(state.p2.x, P2_START_X);
        assert_eq!(state.p1.facing, 1);
        assert_eq!(state.p2.facing, -1);
        assert_eq!(state.p1.hp, DEFAULT_HP);
        assert_eq!(state.p2.hp, DEFAULT_HP);
        assert_eq!(state.rng.state(), 1);
    }

    #[test]
    fn copies_do_not_alias() {
        let mut state = SimState::new(5).unwrap();
        let snapshot = state;
        state.p1.x += 300;
        state.frame += 1;
        assert_eq!(snapshot.p1.x, P1_START_X);
        assert_eq!(snapshot.frame, Frame::ZERO);
    }

    #[test]
    fn default_matches_seed_one() {
        assert_eq!(SimState::default(), SimState::new(1).unwrap());
    }

    #[test]
    fn cooldown_covers_active_window() {
        // The attack window must close before another attack can start.
        assert!(ATTACK_COOLDOWN_FRAMES >= ATTACK_ACTIVE_FRAMES);
    }

    #[test]
    fn action_state_display() {
        assert_eq!(format!("{}", ActionState::Idle), "Idle");
        assert_eq!(format!("{}", ActionState::Hitstun), "Hitstun");
    }
}
