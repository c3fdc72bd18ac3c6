//! CBOR encoding of frames for byte-oriented channels.
//!
//! The streams themselves exchange typed frames. Transports that move raw
//! bytes use these helpers at the channel boundary.

use crate::error::{CodecError, CodecResult};
use crate::messages::{ClientFrame, ServerFrame};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes any serializable frame to CBOR.
pub fn encode_frame<T: Serialize>(frame: &T) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(frame, &mut buf).map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buf)
}

/// Decodes a frame from CBOR bytes.
pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    if bytes.is_empty() {
        return Err(CodecError::UnexpectedEof);
    }
    ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

/// Trait for frames that can be moved over a byte channel.
pub trait FrameCodec: Sized {
    /// Encode this frame to CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;

    /// Decode a frame from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl FrameCodec for ClientFrame {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        encode_frame(self)
    }

    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        decode_frame(bytes)
    }
}

impl FrameCodec for ServerFrame {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        encode_frame(self)
    }

    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        decode_frame(bytes)
    }
}
