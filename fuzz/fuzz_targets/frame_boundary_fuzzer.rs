//! Fuzz target for frame header boundary conditions
//!
//! # Strategy
//!
//! - Magic bytes: Valid, off-by-one, all-zeros, all-ones, random
//! - Version: Valid (0x01), zero, max, random
//! - Payload size: Zero, small, at-max, just-over-max, u32::MAX, random
//! - Stream chunking: the same bytes fed to `take_from` in arbitrary pieces
//!
//! # Invariants
//!
//! - `payload_size > MAX_PAYLOAD_SIZE` (64 KiB) MUST be rejected
//! - Invalid magic bytes MUST return `ProtocolError::InvalidMagic`
//! - Decoding never panics
//! - Encoded size MUST equal 16 + payload length
//! - Chunked stream decoding yields the same frame as whole-buffer decoding

#![no_main]

use arbitrary::Arbitrary;
use bytes::BytesMut;
use easel_proto::{Frame, FrameHeader, Opcode, ProtocolError};
use libfuzzer_sys::fuzz_target;

const MAGIC: [u8; 4] = FrameHeader::MAGIC.to_be_bytes();

#[derive(Debug, Clone, Arbitrary)]
struct BoundaryFrame {
    magic: MagicBytes,
    version: VersionBytes,
    opcode: u16,
    request_id: u32,
    payload_size: PayloadSize,
    chunk: u8,
}

#[derive(Debug, Clone, Arbitrary)]
enum MagicBytes {
    Valid,
    OffByOne(u8),
    AllZeros,
    AllOnes,
    Random([u8; 4]),
}

#[derive(Debug, Clone, Arbitrary)]
enum VersionBytes {
    Valid,
    Zero,
    Max,
    Random(u8),
}

#[derive(Debug, Clone, Arbitrary)]
enum PayloadSize {
    Zero,
    Small(u8),
    AtMaxBoundary,
    JustOverMax,
    MaxU32,
    Random(u32),
}

fuzz_target!(|boundary: BoundaryFrame| {
    let max = FrameHeader::MAX_PAYLOAD_SIZE;
    let payload_size = match boundary.payload_size {
        PayloadSize::Zero => 0,
        PayloadSize::Small(s) => u32::from(s),
        PayloadSize::AtMaxBoundary => max,
        PayloadSize::JustOverMax => max.saturating_add(1),
        PayloadSize::MaxU32 => u32::MAX,
        PayloadSize::Random(r) => r,
    };

    let actual_payload_size = payload_size.min(max + 1) as usize;
    let mut buffer = vec![0u8; FrameHeader::SIZE + actual_payload_size];

    match boundary.magic {
        MagicBytes::Valid => buffer[0..4].copy_from_slice(&MAGIC),
        MagicBytes::OffByOne(offset) => {
            buffer[0..4].copy_from_slice(&MAGIC);
            let idx = (offset % 4) as usize;
            buffer[idx] = buffer[idx].wrapping_add(1);
        },
        MagicBytes::AllZeros => buffer[0..4].fill(0),
        MagicBytes::AllOnes => buffer[0..4].fill(0xFF),
        MagicBytes::Random(bytes) => buffer[0..4].copy_from_slice(&bytes),
    }

    buffer[4] = match boundary.version {
        VersionBytes::Valid => FrameHeader::VERSION,
        VersionBytes::Zero => 0,
        VersionBytes::Max => u8::MAX,
        VersionBytes::Random(v) => v,
    };
    buffer[6..8].copy_from_slice(&boundary.opcode.to_be_bytes());
    buffer[8..12].copy_from_slice(&boundary.request_id.to_be_bytes());
    buffer[12..16].copy_from_slice(&payload_size.to_be_bytes());

    let whole = Frame::decode(&buffer);
    match &whole {
        Ok(frame) => {
            assert_eq!(buffer[0..4], MAGIC);
            assert!(payload_size <= max);
            assert_eq!(frame.request_id(), boundary.request_id);
            assert_eq!(frame.header.opcode(), boundary.opcode);
        },
        Err(ProtocolError::InvalidMagic) => assert_ne!(buffer[0..4], MAGIC),
        Err(_) => {},
    }

    // Stream the same bytes in chunks.
    let chunk = usize::from(boundary.chunk).max(1);
    let mut stream = BytesMut::new();
    let mut streamed = None;
    for piece in buffer.chunks(chunk) {
        stream.extend_from_slice(piece);
        match Frame::take_from(&mut stream) {
            Ok(Some(frame)) => {
                streamed = Some(frame);
                break;
            },
            Ok(None) => {},
            Err(_) => break,
        }
    }
    if let Ok(frame) = &whole {
        assert_eq!(streamed.as_ref(), Some(frame));
    }

    if let Some(opcode) = Opcode::from_u16(boundary.opcode) {
        let mut header = FrameHeader::new(opcode);
        header.set_request_id(boundary.request_id);
        let frame = Frame::new(header, vec![0xAA; actual_payload_size.min(1000)]);

        let mut encoded = Vec::new();
        if frame.encode(&mut encoded).is_err() {
            return;
        }
        assert_eq!(encoded.len(), FrameHeader::SIZE + frame.payload.len());

        let decoded = Frame::decode(&encoded).expect("encoded frame decodes");
        assert_eq!(decoded, frame);
    }
});
