//! Frame type combining header and payload.
//!
//! A `Frame` is the transport-layer packet consisting of:
//! - 16-byte raw binary header (Big Endian)
//! - Variable-length raw bytes (already CBOR-encoded)
//!
//! This is a pure data holder. For typed messages see `Payload::into_frame()`
//! and `Payload::from_frame()`.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    FrameHeader, Opcode,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame (transport layer)
///
/// Layout on the wire:
/// `[FrameHeader: 16 bytes, raw binary] + [payload: variable bytes]`
///
/// # Invariants
///
/// - `payload.len()` matches `header.payload_size()`. Enforced by
///   [`Frame::new`] and verified by [`Frame::decode`].
/// - `payload.len()` never exceeds [`FrameHeader::MAX_PAYLOAD_SIZE`] on the
///   wire. Oversized frames are rejected by [`Frame::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header
    pub header: FrameHeader,

    /// Raw payload bytes (already CBOR-encoded)
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame, setting the header's payload size from `payload`.
    ///
    /// Size is not validated here; oversized frames fail in [`Frame::encode`].
    #[must_use]
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let payload_len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
        header.payload_size = payload_len.to_be_bytes();

        Self { header, payload }
    }

    /// Opcode of this frame. `None` if unrecognized.
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode> {
        self.header.opcode_enum()
    }

    /// Request token carried by this frame.
    #[must_use]
    pub fn request_id(&self) -> u32 {
        self.header.request_id()
    }

    /// Total encoded size (header plus payload).
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.len()
    }

    /// Encode frame into buffer
    ///
    /// Writes: `[header (16 bytes)] + [payload (variable)]`
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if payload exceeds `MAX_PAYLOAD_SIZE`
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        debug_assert_eq!(self.payload.len(), self.header.payload_size() as usize);

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Decode a single frame from a complete buffer.
    ///
    /// Trailing bytes after the frame are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError` if header parsing fails (magic, version, size limit)
    /// - `ProtocolError::FrameTruncated` if fewer payload bytes than claimed
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let payload_size = header.payload_size() as usize;
        let total_size = FrameHeader::SIZE + payload_size;

        let Some(payload) = bytes.get(FrameHeader::SIZE..total_size) else {
            #[cfg_attr(not(fuzzing), allow(unexpected_cfgs))]
            #[cfg(fuzzing)]
            {
                let _ = payload_size; // Proves we hit this branch
            }

            return Err(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        };

        Ok(Self { header: *header, payload: Bytes::copy_from_slice(payload) })
    }

    /// Split the next complete frame off the front of a stream buffer.
    ///
    /// Returns `Ok(None)` when `buf` does not yet hold a whole frame; the
    /// caller reads more bytes and tries again. Consumed bytes are removed from
    /// `buf`, partial frames are left in place.
    ///
    /// # Errors
    ///
    /// Header validation errors. The stream cannot be resynchronized after
    /// one, so callers should drop the connection.
    pub fn take_from(buf: &mut BytesMut) -> Result<Option<Self>> {
        if buf.len() < FrameHeader::SIZE {
            return Ok(None);
        }

        let header = *FrameHeader::from_bytes(&buf[..])?;
        let total_size = FrameHeader::SIZE + header.payload_size() as usize;

        if buf.len() < total_size {
            buf.reserve(total_size - buf.len());
            return Ok(None);
        }

        let mut chunk = buf.split_to(total_size);
        chunk.advance(FrameHeader::SIZE);

        Ok(Some(Self { header, payload: chunk.freeze() }))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for Frame {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            (any::<FrameHeader>(), prop::collection::vec(any::<u8>(), 0..512))
                .prop_map(|(header, payload_bytes)| Self::new(header, payload_bytes))
                .boxed()
        }
    }

    proptest! {
        #[test]
        fn frame_round_trip(frame in any::<Frame>()) {
            let mut wire = Vec::new();
            frame.encode(&mut wire).expect("should encode");

            let parsed = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame, parsed);
        }

        #[test]
        fn take_from_handles_any_split(frame in any::<Frame>(), split in 0usize..600) {
            let mut wire = Vec::new();
            frame.encode(&mut wire).expect("should encode");
            let split = split.min(wire.len());

            let mut buf = BytesMut::from(&wire[..split]);
            let early = Frame::take_from(&mut buf).expect("prefix is valid");
            if split < wire.len() {
                prop_assert!(early.is_none());
                buf.extend_from_slice(&wire[split..]);
                let parsed = Frame::take_from(&mut buf).expect("should decode");
                prop_assert_eq!(parsed, Some(frame));
            } else {
                prop_assert_eq!(early, Some(frame));
            }
            prop_assert!(buf.is_empty());
        }
    }

    #[test]
    fn new_sets_payload_size() {
        let frame = Frame::new(FrameHeader::new(Opcode::JoinRoom), vec![1, 2, 3, 4]);
        assert_eq!(frame.header.payload_size(), 4);
        assert_eq!(frame.encoded_len(), 20);
    }

    #[test]
    fn reject_truncated_frame() {
        let mut header = FrameHeader::new(Opcode::CreateRoom);
        header.set_payload_size(100);

        let result = Frame::decode(&header.to_bytes());
        assert_eq!(result, Err(ProtocolError::FrameTruncated { expected: 100, actual: 0 }));
    }

    #[test]
    fn take_from_leaves_following_frames() {
        let first = Frame::new(FrameHeader::new(Opcode::UpdateUsername), vec![0xAA]);
        let second = Frame::new(FrameHeader::new(Opcode::CreateRoom), vec![0xBB, 0xCC]);

        let mut buf = BytesMut::new();
        first.encode(&mut buf).expect("encode");
        second.encode(&mut buf).expect("encode");

        assert_eq!(Frame::take_from(&mut buf).expect("decode"), Some(first));
        assert_eq!(Frame::take_from(&mut buf).expect("decode"), Some(second));
        assert_eq!(Frame::take_from(&mut buf).expect("decode"), None);
    }

    #[test]
    fn take_from_rejects_garbage() {
        let mut buf = BytesMut::from(&[0u8; 32][..]);
        assert_eq!(Frame::take_from(&mut buf), Err(ProtocolError::InvalidMagic));
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let payload = vec![0u8; FrameHeader::MAX_PAYLOAD_SIZE as usize + 1];
        let frame = Frame::new(FrameHeader::new(Opcode::RoomList), payload);

        let mut wire = Vec::new();
        assert!(matches!(frame.encode(&mut wire), Err(ProtocolError::PayloadTooLarge { .. })));
        assert!(wire.is_empty());
    }
}
