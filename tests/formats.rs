//! The two binary surfaces end to end: RPLK replay files and RBN1 input
//! packets, including hostile-input rejection.

mod common;

use common::{ground_truth, scripted_p1, scripted_p2};
use riposte_netcode::prelude::*;
use riposte_netcode::wire::{self, PacketInputs, MAX_PACKET_SIZE};

#[test]
fn replay_file_survives_disk_and_reproduces_the_match() {
    let mut recorder = ReplayRecorder::new(1).unwrap();
    for frame in 0..300u32 {
        recorder.append(scripted_p1(frame), scripted_p2(frame));
    }
    let replay = recorder.build();

    let mut file = Vec::new();
    write_replay(&mut file, &replay).unwrap();
    let restored = read_replay(&mut file.as_slice()).unwrap();

    assert_eq!(restored, replay);
    assert_eq!(play(&restored).unwrap(), ground_truth(1, 300));
    assert_eq!(
        play_and_checksum(&restored).unwrap(),
        state_checksum(&ground_truth(1, 300))
    );
}

#[test]
fn replay_file_rejects_payload_corruption() {
    let mut recorder = ReplayRecorder::new(9).unwrap();
    for frame in 0..64u32 {
        recorder.append(scripted_p1(frame), scripted_p2(frame));
    }
    let mut file = Vec::new();
    write_replay(&mut file, &recorder.build()).unwrap();

    // Flip a single bit somewhere in the payload.
    let payload_start = 32;
    let mut corrupted = file.clone();
    corrupted[payload_start + 17] ^= 0x20;
    let err = read_replay(&mut corrupted.as_slice()).unwrap_err();
    assert!(matches!(
        err,
        RiposteError::Corrupt {
            reason: CorruptReason::ChecksumMismatch { .. }
        }
    ));

    // Truncation is reported as an early end of stream, not corruption.
    let err = read_replay(&mut file[..file.len() - 3].as_ref()).unwrap_err();
    assert_eq!(
        err,
        RiposteError::Truncated {
            context: "replay payload"
        }
    );
}

#[test]
fn packet_carries_the_sessions_recent_inputs() {
    // A sender shipping its last 8 local inputs with an acked frame and a
    // desync fingerprint, the way a transport layer would each tick.
    let state = ground_truth(1, 120);
    let inputs: PacketInputs = (112..120).map(scripted_p1).collect();
    let packet = InputPacket {
        start_frame: Frame::new(112),
        ack_frame: Frame::new(117),
        checksum: Some(ChecksumReport {
            frame: Frame::new(120),
            checksum: state_checksum(&state),
        }),
        inputs,
    };

    let mut buffer = [0u8; MAX_PACKET_SIZE];
    let written = packet.encode(&mut buffer).unwrap();
    let received = wire::decode(&buffer[..written]).unwrap();
    assert_eq!(received, packet);

    // The receiver feeds the redundant run into its session; gaps from
    // lost earlier packets are subsumed.
    let mut session = RollbackSession::new(SimState::new(1).unwrap(), 64, PlayerSide::P2).unwrap();
    for (offset, input) in received.inputs.iter().enumerate() {
        session
            .set_remote_input(received.start_frame + offset as u32, *input)
            .unwrap();
    }
    // The fingerprint is opaque to the codec and intact for comparison.
    assert_eq!(
        received.checksum.unwrap().checksum,
        state_checksum(&state)
    );
}

#[test]
fn hostile_packets_are_dropped_not_propagated() {
    let packet = InputPacket {
        start_frame: Frame::new(40),
        ack_frame: Frame::new(39),
        checksum: None,
        inputs: PacketInputs::from_slice(&[Buttons::ATTACK, Buttons::NEUTRAL]),
    };
    let mut buffer = [0u8; MAX_PACKET_SIZE];
    let written = packet.encode(&mut buffer).unwrap();
    let clean = &buffer[..written];

    assert!(wire::decode(clean).is_some());

    // Every single-bit corruption of the header metadata must be dropped
    // or decode to a packet that still matches its own declared layout;
    // none may panic.
    for index in 0..written {
        for bit in 0..8 {
            let mut corrupted = clean.to_vec();
            corrupted[index] ^= 1 << bit;
            let _ = wire::decode(&corrupted);
        }
    }

    // The specific rejections the protocol pins down.
    let mut bad_magic = clean.to_vec();
    bad_magic[0] = b'X';
    assert!(wire::decode(&bad_magic).is_none());

    let mut reserved_flag = clean.to_vec();
    reserved_flag[5] |= 0x80;
    assert!(wire::decode(&reserved_flag).is_none());

    assert!(wire::decode(&clean[..written - 1]).is_none());
}
