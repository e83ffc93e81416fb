//! The pure simulation step.

use crate::input::Buttons;
use crate::sim::{
    ActionState, PlayerState, SimState, ATTACK_ACTIVE_FRAMES, ATTACK_COOLDOWN_FRAMES,
    ATTACK_DAMAGE, ATTACK_HITBOX_HEIGHT, ATTACK_HITBOX_WIDTH, GRAVITY_PER_TICK, GROUND_Y,
    HITSTUN_FRAMES, JUMP_VELOCITY_PER_TICK, MAX_X, MIN_X, MOVE_SPEED_PER_TICK, PLAYER_HEIGHT,
    PLAYER_WIDTH,
};

/// Advances the simulation by exactly one tick.
///
/// Pure: the function reads nothing but its arguments, writes nothing but
/// its return value, and never touches a clock, allocator or environment.
/// It operates on a local copy of `prev` and returns it.
///
/// Phases run in a fixed order, each applied to player 1 and then player 2:
///
/// 1. frame counter increment;
/// 2. counter tick: attack cooldown decays toward zero; hitstun decays and
///    releases the player to `Idle` when it expires;
/// 3. attack start: a pressed Attack outside hitstun with an expired
///    cooldown opens the hit window and rearms the has-hit flag;
/// 4. movement and jump: hitstun suppresses all of it; held Left/Right
///    moves and faces the player, entering `Run` unless airborne or
///    attacking; releasing both drops `Run` back to `Idle`; Jump from the
///    ground sets the upward velocity; X is clamped to the arena;
/// 5. gravity and integration: vertical velocity accumulates gravity,
///    position integrates velocity, and landing grounds the player;
/// 6. attack-window countdown: the hit window shrinks, closing the attack
///    back to `Idle` when it empties;
/// 7. hit resolution: **both** hit tests are evaluated against the same
///    post-phase-6 state before either result is applied, so a trade stays
///    a trade and neither player gains an invisible ordering advantage.
///
/// Button bits outside the defined mask are ignored. Given the constant
/// ranges, no intermediate value can overflow `i32`.
#[must_use]
pub fn step(prev: SimState, p1_input: Buttons, p2_input: Buttons) -> SimState {
    let mut next = prev;

    next.frame += 1;

    tick_counters(&mut next.p1);
    tick_counters(&mut next.p2);

    try_start_attack(&mut next.p1, p1_input);
    try_start_attack(&mut next.p2, p2_input);

    apply_movement(&mut next.p1, p1_input);
    apply_movement(&mut next.p2, p2_input);

    integrate_gravity(&mut next.p1);
    integrate_gravity(&mut next.p2);

    tick_attack_window(&mut next.p1);
    tick_attack_window(&mut next.p2);

    // Simultaneous resolution: evaluate both tests before applying either.
    let p1_lands = attack_lands(&next.p1, &next.p2);
    let p2_lands = attack_lands(&next.p2, &next.p1);
    if p1_lands {
        next.p1.attack_has_hit = true;
        apply_hit(&mut next.p2);
    }
    if p2_lands {
        next.p2.attack_has_hit = true;
        apply_hit(&mut next.p1);
    }

    next
}

fn tick_counters(player: &mut PlayerState) {
    player.attack_cooldown_frames = player.attack_cooldown_frames.saturating_sub(1);
    if player.hitstun_frames > 0 {
        player.hitstun_frames -= 1;
        if player.hitstun_frames == 0 {
            player.action = ActionState::Idle;
        }
    }
}

fn try_start_attack(player: &mut PlayerState, input: Buttons) {
    if player.action != ActionState::Hitstun
        && input.contains(Buttons::ATTACK)
        && player.attack_cooldown_frames == 0
    {
        player.action = ActionState::Attack;
        player.attack_active_frames = ATTACK_ACTIVE_FRAMES;
        player.attack_cooldown_frames = ATTACK_COOLDOWN_FRAMES;
        player.attack_has_hit = false;
    }
}

fn apply_movement(player: &mut PlayerState, input: Buttons) {
    // Hitstun suppresses all movement, including jumps.
    if player.hitstun_frames > 0 {
        return;
    }

    if input.contains(Buttons::RIGHT) {
        player.x += MOVE_SPEED_PER_TICK;
        player.facing = 1;
        if !matches!(player.action, ActionState::Jump | ActionState::Attack) {
            player.action = ActionState::Run;
        }
    } else if input.contains(Buttons::LEFT) {
        player.x -= MOVE_SPEED_PER_TICK;
        player.facing = -1;
        if !matches!(player.action, ActionState::Jump | ActionState::Attack) {
            player.action = ActionState::Run;
        }
    } else if player.action == ActionState::Run {
        player.action = ActionState::Idle;
    }

    if input.contains(Buttons::JUMP) && player.y == GROUND_Y && player.action != ActionState::Jump
    {
        player.vy = JUMP_VELOCITY_PER_TICK;
        player.action = ActionState::Jump;
    }

    player.x = player.x.clamp(MIN_X, MAX_X - PLAYER_WIDTH);
}

fn integrate_gravity(player: &mut PlayerState) {
    player.vy += GRAVITY_PER_TICK;
    player.y += player.vy;
    if player.y <= GROUND_Y {
        player.y = GROUND_Y;
        player.vy = 0;
        if player.action == ActionState::Jump {
            player.action = ActionState::Idle;
        }
    }
}

fn tick_attack_window(player: &mut PlayerState) {
    if player.attack_active_frames > 0 {
        player.attack_active_frames -= 1;
        if player.attack_active_frames == 0 && player.action == ActionState::Attack {
            player.action = ActionState::Idle;
        }
    }
}

/// Whether `attacker`'s open hit window overlaps `defender`'s hurtbox.
///
/// Overlap is strict on both axes: touching edges do not hit.
fn attack_lands(attacker: &PlayerState, defender: &PlayerState) -> bool {
    if attacker.attack_active_frames == 0 || attacker.attack_has_hit {
        return false;
    }

    // The hitbox sits flush against the attacker's body on the facing side.
    let (hit_left, hit_right) = if attacker.facing > 0 {
        let left = attacker.x + PLAYER_WIDTH;
        (left, left + ATTACK_HITBOX_WIDTH)
    } else {
        let right = attacker.x;
        (right - ATTACK_HITBOX_WIDTH, right)
    };
    let hit_bottom = attacker.y;
    let hit_top = attacker.y + ATTACK_HITBOX_HEIGHT;

    let hurt_left = defender.x;
    let hurt_right = defender.x + PLAYER_WIDTH;
    let hurt_bottom = defender.y;
    let hurt_top = defender.y + PLAYER_HEIGHT;

    hit_left < hurt_right && hurt_left < hit_right && hit_bottom < hurt_top && hurt_bottom < hit_top
}

fn apply_hit(defender: &mut PlayerState) {
    defender.hp = defender.hp.saturating_sub(ATTACK_DAMAGE);
    defender.hitstun_frames = HITSTUN_FRAMES;
    defender.action = ActionState::Hitstun;
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
    use crate::sim::{DEFAULT_HP, P1_START_X, P2_START_X};

    fn initial() -> SimState {
        SimState::new(1).unwrap()
    }

    /// Steps `n` frames with fixed inputs.
    fn run(mut state: SimState, p1: Buttons, p2: Buttons, n: u32) -> SimState {
        for _ in 0..n {
            state = step(state, p1, p2);
        }
        state
    }

    #[test]
    fn step_is_pure() {
        let before = initial();
        let _ = step(before, Buttons::RIGHT, Buttons::LEFT);
        assert_eq!(before, initial());
    }

    #[test]
    fn frame_advances_by_one() {
        let next = step(initial(), Buttons::NEUTRAL, Buttons::NEUTRAL);
        assert_eq!(next.frame, 1u32);
    }

    #[test]
    fn walking_moves_and_faces() {
        let next = step(initial(), Buttons::RIGHT, Buttons::LEFT);
        assert_eq!(next.p1.x, P1_START_X + MOVE_SPEED_PER_TICK);
        assert_eq!(next.p1.facing, 1);
        assert_eq!(next.p1.action, ActionState::Run);
        assert_eq!(next.p2.x, P2_START_X - MOVE_SPEED_PER_TICK);
        assert_eq!(next.p2.facing, -1);
        assert_eq!(next.p2.action, ActionState::Run);
    }

    #[test]
    fn releasing_movement_returns_to_idle() {
        let state = step(initial(), Buttons::RIGHT, Buttons::NEUTRAL);
        let state = step(state, Buttons::NEUTRAL, Buttons::NEUTRAL);
        assert_eq!(state.p1.action, ActionState::Idle);
    }

    #[test]
    fn x_clamps_to_arena() {
        // Walk left long past the wall.
        let state = run(initial(), Buttons::LEFT, Buttons::NEUTRAL, 200);
        assert_eq!(state.p1.x, MIN_X);
        // And right past the far wall.
        let state = run(initial(), Buttons::RIGHT, Buttons::NEUTRAL, 200);
        assert_eq!(state.p1.x, MAX_X - PLAYER_WIDTH);
    }

    #[test]
    fn jump_arc_returns_to_ground() {
        let mut state = step(initial(), Buttons::JUMP, Buttons::NEUTRAL);
        assert_eq!(state.p1.action, ActionState::Jump);
        assert_eq!(state.p1.y, JUMP_VELOCITY_PER_TICK + GRAVITY_PER_TICK);

        let mut peak = 0;
        let mut airborne = 0;
        while state.p1.y > GROUND_Y {
            peak = peak.max(state.p1.y);
            airborne += 1;
            state = step(state, Buttons::NEUTRAL, Buttons::NEUTRAL);
            assert!(airborne < 120, "jump never landed");
        }
        assert!(peak > 0);
        assert_eq!(state.p1.y, GROUND_Y);
        assert_eq!(state.p1.vy, 0);
        assert_eq!(state.p1.action, ActionState::Idle);
    }

    #[test]
    fn no_double_jump_while_airborne() {
        let state = step(initial(), Buttons::JUMP, Buttons::NEUTRAL);
        let vy_after_first = state.p1.vy;
        // Holding jump while airborne must not re-trigger.
        let state = step(state, Buttons::JUMP, Buttons::NEUTRAL);
        assert!(state.p1.vy < vy_after_first);
        assert_eq!(state.p1.action, ActionState::Jump);
    }

    /// Walks P2 into attack range of P1 and returns the state.
    fn adjacent() -> SimState {
        // P2 walks left until one step inside P1's reach.
        let mut state = initial();
        while state.p2.x - (state.p1.x + PLAYER_WIDTH) >= ATTACK_HITBOX_WIDTH {
            state = step(state, Buttons::NEUTRAL, Buttons::LEFT);
        }
        state
    }

    #[test]
    fn attack_in_range_lands() {
        let state = adjacent();
        let hit = step(state, Buttons::ATTACK, Buttons::NEUTRAL);
        assert_eq!(hit.p2.hp, DEFAULT_HP - ATTACK_DAMAGE);
        assert_eq!(hit.p2.action, ActionState::Hitstun);
        assert_eq!(hit.p2.hitstun_frames, HITSTUN_FRAMES);
        assert!(hit.p1.attack_has_hit);
    }

    #[test]
    fn attack_out_of_range_whiffs() {
        let miss = step(initial(), Buttons::ATTACK, Buttons::NEUTRAL);
        assert_eq!(miss.p2.hp, DEFAULT_HP);
        assert!(!miss.p1.attack_has_hit);
        assert_eq!(miss.p1.action, ActionState::Attack);
    }

    #[test]
    fn touching_edges_do_not_hit() {
        // Park P2's hurtbox exactly at the hitbox's right edge.
        let mut state = initial();
        state.p2.x = state.p1.x + PLAYER_WIDTH + ATTACK_HITBOX_WIDTH;
        let next = step(state, Buttons::ATTACK, Buttons::NEUTRAL);
        assert_eq!(next.p2.hp, DEFAULT_HP, "edge contact must not score a hit");
        // One fixed unit closer and it connects.
        state.p2.x -= 1;
        let next = step(state, Buttons::ATTACK, Buttons::NEUTRAL);
        assert_eq!(next.p2.hp, DEFAULT_HP - ATTACK_DAMAGE);
    }

    #[test]
    fn at_most_one_hit_per_swing() {
        let mut state = step(adjacent(), Buttons::ATTACK, Buttons::NEUTRAL);
        assert_eq!(state.p2.hp, DEFAULT_HP - ATTACK_DAMAGE);
        // Stay in range for the rest of the active window; the swing must
        // not connect again.
        for _ in 0..ATTACK_ACTIVE_FRAMES {
            state = step(state, Buttons::NEUTRAL, Buttons::NEUTRAL);
        }
        assert_eq!(state.p2.hp, DEFAULT_HP - ATTACK_DAMAGE);
    }

    #[test]
    fn cooldown_blocks_rapid_attacks() {
        let mut state = step(adjacent(), Buttons::ATTACK, Buttons::NEUTRAL);
        let hp_after_first = state.p2.hp;
        // Mashing attack during cooldown does nothing.
        for _ in 0..(ATTACK_COOLDOWN_FRAMES - 1) {
            state = step(state, Buttons::ATTACK, Buttons::NEUTRAL);
            assert_eq!(state.p2.hp, hp_after_first);
        }
        // First frame past the cooldown connects again (P2 has left
        // hitstun by then and stands still).
        let state = step(state, Buttons::ATTACK, Buttons::NEUTRAL);
        assert_eq!(state.p2.hp, hp_after_first - ATTACK_DAMAGE);
    }

    #[test]
    fn hitstun_suppresses_movement_and_attacks() {
        let state = step(adjacent(), Buttons::ATTACK, Buttons::NEUTRAL);
        let stunned_x = state.p2.x;
        let next = step(state, Buttons::NEUTRAL, Buttons::RIGHT | Buttons::ATTACK);
        assert_eq!(next.p2.x, stunned_x);
        assert_eq!(next.p2.action, ActionState::Hitstun);
        assert!(!next.p2.attack_has_hit);
    }

    #[test]
    fn hitstun_expires_to_idle() {
        let mut state = step(adjacent(), Buttons::ATTACK, Buttons::NEUTRAL);
        for _ in 0..HITSTUN_FRAMES {
            state = step(state, Buttons::NEUTRAL, Buttons::NEUTRAL);
        }
        assert_eq!(state.p2.hitstun_frames, 0);
        assert_eq!(state.p2.action, ActionState::Idle);
    }

    #[test]
    fn simultaneous_hits_trade() {
        // Face the players toward each other in mutual range and have both
        // attack on the same frame: both must take damage.
        let mut state = initial();
        state.p1.x = 9_000;
        state.p2.x = 9_000 + PLAYER_WIDTH + ATTACK_HITBOX_WIDTH - 1;
        let traded = step(state, Buttons::ATTACK, Buttons::ATTACK);
        assert_eq!(traded.p1.hp, DEFAULT_HP - ATTACK_DAMAGE);
        assert_eq!(traded.p2.hp, DEFAULT_HP - ATTACK_DAMAGE);
        assert_eq!(traded.p1.action, ActionState::Hitstun);
        assert_eq!(traded.p2.action, ActionState::Hitstun);
        assert!(traded.p1.attack_has_hit);
        assert!(traded.p2.attack_has_hit);
    }

    #[test]
    fn hp_floors_at_zero() {
        let mut state = adjacent();
        state.p2.hp = ATTACK_DAMAGE - 1;
        let next = step(state, Buttons::ATTACK, Buttons::NEUTRAL);
        assert_eq!(next.p2.hp, 0);
    }

    #[test]
    fn undefined_button_bits_are_ignored() {
        let noisy = Buttons::from_bits(Buttons::RIGHT.bits() | 0xFF10);
        let clean = step(initial(), Buttons::RIGHT, Buttons::NEUTRAL);
        let with_noise = step(initial(), noisy, Buttons::NEUTRAL);
        assert_eq!(clean, with_noise);
    }

    #[test]
    fn rng_state_is_untouched_by_stepping() {
        let state = run(initial(), Buttons::RIGHT, Buttons::LEFT, 100);
        assert_eq!(state.rng.state(), 1);
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod property_tests {
    use super::*;
    use crate::sim::{DEFAULT_HP, MAX_X, MIN_X, PLAYER_WIDTH};
    use proptest::prelude::*;

    fn arbitrary_buttons() -> impl Strategy<Value = Buttons> {
        any::<u16>().prop_map(Buttons::from_bits)
    }

    proptest! {
        /// Stepping preserves every documented state invariant for any
        /// input sequence.
        #[test]
        fn prop_invariants_hold(
            seed in 1u32..,
            inputs in proptest::collection::vec((arbitrary_buttons(), arbitrary_buttons()), 0..200),
        ) {
            let mut state = SimState::new(seed).unwrap();
            for (p1, p2) in inputs {
                state = step(state, p1, p2);
                for player in [&state.p1, &state.p2] {
                    prop_assert!(player.x >= MIN_X);
                    prop_assert!(player.x <= MAX_X - PLAYER_WIDTH);
                    prop_assert!(player.y >= 0);
                    prop_assert!(player.hp <= DEFAULT_HP);
                    prop_assert!(player.facing == 1 || player.facing == -1);
                }
                prop_assert_ne!(state.rng.state(), 0);
            }
        }

        /// The same state and inputs always step to the same result.
        #[test]
        fn prop_step_is_deterministic(
            seed in 1u32..,
            inputs in proptest::collection::vec((arbitrary_buttons(), arbitrary_buttons()), 1..100),
        ) {
            let mut a = SimState::new(seed).unwrap();
            let mut b = SimState::new(seed).unwrap();
            for (p1, p2) in inputs {
                a = step(a, p1, p2);
                b = step(b, p1, p2);
                prop_assert_eq!(a, b);
            }
        }
    }
}
