//! Shared fixtures for the integration tests.

#![allow(dead_code)] // not every test binary uses every helper

use riposte_netcode::{step, Buttons, SimState};

/// Player 1's scripted inputs for the reference duel: run right, hop over
/// the midpoint, keep running, throw a couple of attacks, then walk back.
pub fn scripted_p1(frame: u32) -> Buttons {
    match frame {
        0..=49 => Buttons::RIGHT,
        50 => Buttons::JUMP,
        51..=149 => Buttons::RIGHT,
        150..=199 => {
            if frame % 20 == 0 {
                Buttons::ATTACK
            } else {
                Buttons::NEUTRAL
            }
        },
        _ => Buttons::LEFT,
    }
}

/// Player 2's scripted inputs: retreat to the left wall, a burst of jumps,
/// then idle.
pub fn scripted_p2(frame: u32) -> Buttons {
    match frame {
        0..=99 => Buttons::LEFT,
        100..=119 => Buttons::JUMP,
        _ => Buttons::NEUTRAL,
    }
}

/// The fully-confirmed run of the scripted duel.
pub fn ground_truth(seed: u32, frames: u32) -> SimState {
    let mut state = SimState::new(seed).expect("non-zero seed");
    for frame in 0..frames {
        state = step(state, scripted_p1(frame), scripted_p2(frame));
    }
    state
}
