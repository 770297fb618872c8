//! Wire framing for the status service's IPC socket
//!
//! Frame format: [4-byte opcode LE][4-byte length LE][JSON payload]

use super::RpcError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum payload size; real frames are well under 1 KB
pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

/// Frame opcodes understood by the status service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Initial version/identity exchange
    Handshake,
    /// Command or event payload
    Frame,
    /// Remote is closing the connection
    Close,
    Ping,
    Pong,
}

impl Opcode {
    fn to_u32(self) -> u32 {
        match self {
            Opcode::Handshake => 0,
            Opcode::Frame => 1,
            Opcode::Close => 2,
            Opcode::Ping => 3,
            Opcode::Pong => 4,
        }
    }

    fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Opcode::Handshake),
            1 => Some(Opcode::Frame),
            2 => Some(Opcode::Close),
            3 => Some(Opcode::Ping),
            4 => Some(Opcode::Pong),
            _ => None,
        }
    }
}

/// Encode a frame into a byte buffer
pub fn encode_frame(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u32;
    let mut framed = Vec::with_capacity(8 + payload.len());
    framed.extend_from_slice(&opcode.to_u32().to_le_bytes());
    framed.extend_from_slice(&len.to_le_bytes());
    framed.extend_from_slice(payload);
    framed
}

/// Decode a frame from a byte buffer
///
/// Returns (opcode, payload, remaining_bytes) on success, or None if not
/// enough data has arrived yet
pub fn decode_frame(buffer: &[u8]) -> Result<Option<(Opcode, Vec<u8>, &[u8])>, RpcError> {
    // Need the full 8-byte header first
    if buffer.len() < 8 {
        return Ok(None);
    }

    let opcode_bytes: [u8; 4] = buffer[0..4]
        .try_into()
        .map_err(|_| RpcError::InvalidFrame("invalid opcode bytes".into()))?;
    let opcode = Opcode::from_u32(u32::from_le_bytes(opcode_bytes))
        .ok_or_else(|| RpcError::InvalidFrame(format!("unknown opcode {:?}", opcode_bytes)))?;

    let len_bytes: [u8; 4] = buffer[4..8]
        .try_into()
        .map_err(|_| RpcError::InvalidFrame("invalid length bytes".into()))?;
    let payload_len = u32::from_le_bytes(len_bytes);

    if payload_len > MAX_FRAME_SIZE {
        return Err(RpcError::FrameTooLarge {
            size: payload_len,
            max: MAX_FRAME_SIZE,
        });
    }

    let total_len = 8 + payload_len as usize;
    if buffer.len() < total_len {
        return Ok(None);
    }

    let payload = buffer[8..total_len].to_vec();
    let remaining = &buffer[total_len..];

    Ok(Some((opcode, payload, remaining)))
}

/// Write a frame to a stream
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    opcode: Opcode,
    payload: &[u8],
) -> Result<(), RpcError> {
    let framed = encode_frame(opcode, payload);
    writer.write_all(&framed).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a frame from a stream
///
/// Returns Ok(None) on clean EOF before the first header byte
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Option<(Opcode, Vec<u8>)>, RpcError> {
    let mut header = [0u8; 8];

    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let opcode_word = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let opcode = Opcode::from_u32(opcode_word)
        .ok_or_else(|| RpcError::InvalidFrame(format!("unknown opcode {}", opcode_word)))?;
    let payload_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if payload_len > MAX_FRAME_SIZE {
        return Err(RpcError::FrameTooLarge {
            size: payload_len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload).await?;

    Ok(Some((opcode, payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn frame_roundtrip() {
        let payload = br#"{"cmd":"SET_ACTIVITY"}"#;
        let encoded = encode_frame(Opcode::Frame, payload);

        let (opcode, decoded, remaining) = decode_frame(&encoded)
            .expect("decode failed")
            .expect("frame incomplete");
        assert_eq!(opcode, Opcode::Frame);
        assert_eq!(decoded, payload);
        assert!(remaining.is_empty());
    }

    #[test]
    fn decode_keeps_trailing_bytes() {
        let mut buffer = encode_frame(Opcode::Handshake, b"{}");
        buffer.extend_from_slice(&encode_frame(Opcode::Ping, b"{}"));

        let (opcode, _, remaining) = decode_frame(&buffer).unwrap().unwrap();
        assert_eq!(opcode, Opcode::Handshake);

        let (opcode, _, remaining) = decode_frame(remaining).unwrap().unwrap();
        assert_eq!(opcode, Opcode::Ping);
        assert!(remaining.is_empty());
    }

    #[test]
    fn incomplete_frame_is_not_an_error() {
        let encoded = encode_frame(Opcode::Frame, b"{\"k\":1}");
        assert!(decode_frame(&encoded[..3]).unwrap().is_none());
        assert!(decode_frame(&encoded[..encoded.len() - 1]).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_rejected() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&1u32.to_le_bytes());
        buffer.extend_from_slice(&(MAX_FRAME_SIZE + 1).to_le_bytes());

        assert!(matches!(
            decode_frame(&buffer),
            Err(RpcError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn unknown_opcode_rejected() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&99u32.to_le_bytes());
        buffer.extend_from_slice(&0u32.to_le_bytes());

        assert!(matches!(
            decode_frame(&buffer),
            Err(RpcError::InvalidFrame(_))
        ));
    }

    proptest! {
        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = decode_frame(&bytes);
        }
    }
}
