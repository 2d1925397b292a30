//! Fuzz target for Payload::from_frame
//!
//! Feeds arbitrary CBOR under every opcode:
//! - Malformed CBOR data
//! - Type confusion (payload of one event under another's opcode)
//! - Names that break the length or character rules
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use bytes::Bytes;
use easel_proto::{Frame, FrameHeader, Opcode, Payload};
use libfuzzer_sys::fuzz_target;

const OPCODES: [Opcode; 13] = [
    Opcode::UpdateUsername,
    Opcode::UpdateAvatar,
    Opcode::CreateRoom,
    Opcode::JoinRoom,
    Opcode::LeaveRoom,
    Opcode::ListRooms,
    Opcode::RoomCreated,
    Opcode::RoomJoined,
    Opcode::RoomLeft,
    Opcode::RoomList,
    Opcode::RoomNameTaken,
    Opcode::RoomNotFound,
    Opcode::Error,
];

fuzz_target!(|data: &[u8]| {
    for opcode in OPCODES {
        let frame = Frame::new(FrameHeader::new(opcode), Bytes::copy_from_slice(data));

        if let Ok(payload) = Payload::from_frame(&frame) {
            assert_eq!(payload.opcode(), opcode);
        }
    }
});
