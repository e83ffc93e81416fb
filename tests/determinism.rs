//! Determinism guarantees: golden fingerprints and bit-identical replays.

mod common;

use common::{ground_truth, scripted_p1, scripted_p2};
use riposte_netcode::{
    play, play_and_checksum, state_checksum, step, ActionState, ReplayRecorder, SimState,
};

/// The pinned fingerprint of the scripted duel after 1000 frames with
/// seed 1. This is the crate's primary regression anchor: any change to the
/// step function, the hash recipe, or the constants moves it.
const GOLDEN_CHECKSUM: u32 = 0x05B8_356C;

#[test]
fn golden_checksum_for_scripted_duel() {
    let state = ground_truth(1, 1000);
    assert_eq!(state_checksum(&state), GOLDEN_CHECKSUM);
}

#[test]
fn golden_run_final_state_facts() {
    // Independent cross-checks on the same run, so a golden failure can be
    // localised: both players end parked at the left wall, untouched.
    let state = ground_truth(1, 1000);
    assert_eq!(state.frame.raw(), 1000);
    assert_eq!(state.p1.x, 0);
    assert_eq!(state.p2.x, 0);
    assert_eq!(state.p1.y, 0);
    assert_eq!(state.p2.y, 0);
    assert_eq!(state.p1.action, ActionState::Run);
    assert_eq!(state.p2.action, ActionState::Idle);
    assert_eq!(state.p1.facing, -1);
    assert_eq!(state.p2.facing, -1);
    assert_eq!(state.p1.hp, 100);
    assert_eq!(state.p2.hp, 100);
    assert!(!state.p1.attack_has_hit);
    assert_eq!(state.rng.state(), 1);
}

#[test]
fn independent_runs_are_bit_identical() {
    let first = ground_truth(0xBEEF, 500);
    let second = ground_truth(0xBEEF, 500);
    assert_eq!(first, second);
    assert_eq!(state_checksum(&first), state_checksum(&second));
}

#[test]
fn recorded_replay_reproduces_the_run() {
    let seed = 0x5EED_0001;
    let mut recorder = ReplayRecorder::new(seed).unwrap();
    let mut live = SimState::new(seed).unwrap();
    for frame in 0..1000u32 {
        let (p1, p2) = (scripted_p1(frame), scripted_p2(frame));
        recorder.append(p1, p2);
        live = step(live, p1, p2);
    }

    let replay = recorder.build();
    assert_eq!(replay.len(), 1000);

    let replayed = play(&replay).unwrap();
    assert_eq!(replayed, live);
    assert_eq!(
        play_and_checksum(&replay).unwrap(),
        state_checksum(&live)
    );
    // Playing again from the same immutable value changes nothing.
    assert_eq!(play(&replay).unwrap(), replayed);
}

#[test]
fn playback_to_a_prefix_is_a_prefix_of_the_run() {
    let mut recorder = ReplayRecorder::new(1).unwrap();
    for frame in 0..300u32 {
        recorder.append(scripted_p1(frame), scripted_p2(frame));
    }
    // Building at 300 frames and replaying gives exactly the 300-frame
    // ground truth, independent of what gets recorded afterwards.
    let at_300 = recorder.build();
    for frame in 300..400u32 {
        recorder.append(scripted_p1(frame), scripted_p2(frame));
    }
    assert_eq!(play(&at_300).unwrap(), ground_truth(1, 300));
    assert_eq!(play(&recorder.build()).unwrap(), ground_truth(1, 400));
}

#[test]
fn different_seeds_diverge_only_in_the_rng() {
    // The scripted duel never draws from the PRNG, so two seeds produce
    // identical player states but distinct fingerprints: the PRNG word is
    // part of the hashed state.
    let a = ground_truth(1, 200);
    let b = ground_truth(2, 200);
    assert_eq!(a.p1, b.p1);
    assert_eq!(a.p2, b.p2);
    assert_ne!(state_checksum(&a), state_checksum(&b));
}
