//! Length-prefixed frame codec.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// Size of the length prefix, in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Default maximum accepted frame size (64 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Codec for the thin-protocol envelope: a `u32` little-endian length prefix
/// followed by exactly that many payload bytes.
///
/// The encoder emits exactly `4 + len` bytes per frame. The decoder never
/// yields a short frame: it buffers until the full header and then the full
/// payload have arrived, and treats end-of-stream mid-frame as fatal.
#[derive(Debug)]
pub struct FrameCodec {
    /// Maximum frame size to accept in either direction.
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a codec with the default maximum frame size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Create a codec with a custom maximum frame size.
    #[must_use]
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        // Strict bitwise-OR reconstruction of the little-endian prefix; the
        // four source bytes occupy non-overlapping bit ranges.
        let len = (usize::from(src[3]) << 24)
            | (usize::from(src[2]) << 16)
            | (usize::from(src[1]) << 8)
            | usize::from(src[0]);

        if len > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        if src.len() < FRAME_HEADER_SIZE + len {
            // Reserve up front so the remainder arrives into one allocation.
            src.reserve(FRAME_HEADER_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(FRAME_HEADER_SIZE);
        let frame = src.split_to(len);

        tracing::trace!(len, "decoded frame");

        Ok(Some(frame))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(CodecError::TruncatedFrame {
                buffered: src.len(),
            }),
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = item.len();

        if len > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        dst.reserve(FRAME_HEADER_SIZE + len);

        dst.put_u8((len & 0xFF) as u8);
        dst.put_u8(((len >> 8) & 0xFF) as u8);
        dst.put_u8(((len >> 16) & 0xFF) as u8);
        dst.put_u8(((len >> 24) & 0xFF) as u8);

        dst.put_slice(&item);

        tracing::trace!(len, "encoded frame");

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_emits_header_plus_payload() {
        let mut codec = FrameCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(Bytes::from_static(b"ping"), &mut dst).unwrap();

        assert_eq!(dst.len(), FRAME_HEADER_SIZE + 4);
        assert_eq!(&dst[..4], &[4, 0, 0, 0]);
        assert_eq!(&dst[4..], b"ping");
    }

    #[test]
    fn test_length_prefix_is_little_endian() {
        let mut codec = FrameCodec::new();
        let mut dst = BytesMut::new();
        let payload = Bytes::from(vec![0u8; 0x0102]);
        codec.encode(payload, &mut dst).unwrap();

        assert_eq!(&dst[..4], &[0x02, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Bytes::new(), &mut buf).unwrap();

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert!(frame.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_waits_for_full_header() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x05u8, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_waits_for_full_payload() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x05u8, 0x00, 0x00, 0x00, b'a', b'b'][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"cde");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"abcde");
    }

    #[test]
    fn test_decode_two_frames_back_to_back() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Bytes::from_static(b"one"), &mut buf).unwrap();
        codec.encode(Bytes::from_static(b"four"), &mut buf).unwrap();

        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"one");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"four");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_eof_mid_frame_is_fatal() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x05u8, 0x00, 0x00, 0x00, b'a'][..]);

        let err = codec.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedFrame { buffered: 5 }));
    }

    #[test]
    fn test_eof_at_frame_boundary_is_clean() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_oversized_frame_rejected_both_directions() {
        let mut codec = FrameCodec::new().with_max_frame_size(8);

        let mut dst = BytesMut::new();
        let err = codec.encode(Bytes::from(vec![0u8; 9]), &mut dst).unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { size: 9, max: 8 }));

        let mut buf = BytesMut::from(&[0x09u8, 0x00, 0x00, 0x00][..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { size: 9, max: 8 }));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_arbitrary_payloads(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let mut codec = FrameCodec::new();
            let mut buf = BytesMut::new();
            codec.encode(Bytes::from(payload.clone()), &mut buf).unwrap();

            prop_assert_eq!(buf.len(), FRAME_HEADER_SIZE + payload.len());

            let frame = codec.decode(&mut buf).unwrap().unwrap();
            prop_assert_eq!(&frame[..], &payload[..]);
            prop_assert!(buf.is_empty());
        }
    }
}
