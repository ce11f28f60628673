//! APDU Framing
//!
//! Command layout: `CLA INS P1 P2 Lc data`. Signing payloads larger than a
//! frame are split into chunks; the chunk tag travels in `P1`.
//! Response layout: `data SW1 SW2`.

use crate::error::DeviceError;
use crate::types::DerivationPath;

/// Maximum payload bytes per signing chunk
pub const CHUNK_SIZE: usize = 250;

/// Deepest derivation path the header can carry
pub const MAX_PATH_DEPTH: usize = 10;

/// Position of a chunk in a signing sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkTag {
    Init = 0x00,
    Add = 0x01,
    Last = 0x02,
}

/// One signing frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub tag: ChunkTag,
    pub payload: Vec<u8>,
}

/// APDU command sent to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    /// Encode to raw bytes
    pub fn encode(&self) -> Result<Vec<u8>, DeviceError> {
        if self.data.len() > u8::MAX as usize {
            return Err(DeviceError::WrongLength);
        }
        let mut raw = Vec::with_capacity(5 + self.data.len());
        raw.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2, self.data.len() as u8]);
        raw.extend_from_slice(&self.data);
        Ok(raw)
    }

    /// Decode raw bytes (used by device simulators)
    pub fn decode(raw: &[u8]) -> Result<Self, DeviceError> {
        if raw.len() < 5 {
            return Err(DeviceError::WrongLength);
        }
        let len = raw[4] as usize;
        if raw.len() != 5 + len {
            return Err(DeviceError::WrongLength);
        }
        Ok(Self {
            cla: raw[0],
            ins: raw[1],
            p1: raw[2],
            p2: raw[3],
            data: raw[5..].to_vec(),
        })
    }
}

/// APDU response: payload plus 16-bit status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    pub data: Vec<u8>,
    pub status: u16,
}

impl ApduResponse {
    pub fn parse(raw: &[u8]) -> Result<Self, DeviceError> {
        if raw.len() < 2 {
            return Err(DeviceError::InvalidResponse(format!(
                "response too short: {} bytes",
                raw.len()
            )));
        }
        let split = raw.len() - 2;
        Ok(Self {
            data: raw[..split].to_vec(),
            status: u16::from_be_bytes([raw[split], raw[split + 1]]),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut raw = self.data.clone();
        raw.extend_from_slice(&self.status.to_be_bytes());
        raw
    }
}

/// Serialize a derivation path: component count, then big-endian indices
pub fn serialize_path(path: &DerivationPath) -> Result<Vec<u8>, DeviceError> {
    if path.is_empty() || path.len() > MAX_PATH_DEPTH {
        return Err(DeviceError::InvalidData);
    }
    let mut header = Vec::with_capacity(1 + 4 * path.len());
    header.push(path.len() as u8);
    for index in path.indices() {
        header.extend_from_slice(&index.to_be_bytes());
    }
    Ok(header)
}

/// Split a message into `chunk_size` pieces; an empty message yields none
pub fn split_chunks(message: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    message.chunks(chunk_size.max(1)).collect()
}

/// Frames for one signing call: the path header tagged `Init`, then the
/// message chunks tagged `Add` with the final one tagged `Last`.
pub fn signing_chunks(path: &DerivationPath, message: &[u8]) -> Result<Vec<Chunk>, DeviceError> {
    let mut chunks = vec![Chunk {
        tag: ChunkTag::Init,
        payload: serialize_path(path)?,
    }];

    let pieces = split_chunks(message, CHUNK_SIZE);
    if pieces.is_empty() {
        chunks.push(Chunk {
            tag: ChunkTag::Last,
            payload: Vec::new(),
        });
        return Ok(chunks);
    }

    let last = pieces.len() - 1;
    for (i, piece) in pieces.into_iter().enumerate() {
        chunks.push(Chunk {
            tag: if i == last { ChunkTag::Last } else { ChunkTag::Add },
            payload: piece.to_vec(),
        });
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_header() {
        let header = serialize_path(&DerivationPath::polkadot(0, 0)).unwrap();
        assert_eq!(header.len(), 1 + 5 * 4);
        assert_eq!(header[0], 5);
        assert_eq!(&header[1..5], &[0x80, 0x00, 0x00, 0x2c]);
        assert_eq!(&header[5..9], &[0x80, 0x00, 0x01, 0x62]);
    }

    #[test]
    fn test_path_too_deep() {
        let path = DerivationPath::new(vec![0; MAX_PATH_DEPTH + 1]);
        assert_eq!(serialize_path(&path), Err(DeviceError::InvalidData));
    }

    #[test]
    fn test_signing_chunks_tags() {
        let message = vec![7u8; CHUNK_SIZE * 2 + 10];
        let chunks = signing_chunks(&DerivationPath::polkadot(0, 0), &message).unwrap();

        let tags: Vec<ChunkTag> = chunks.iter().map(|c| c.tag).collect();
        assert_eq!(tags, vec![ChunkTag::Init, ChunkTag::Add, ChunkTag::Add, ChunkTag::Last]);
        assert_eq!(chunks[3].payload.len(), 10);
    }

    #[test]
    fn test_single_chunk_message_is_last() {
        let chunks = signing_chunks(&DerivationPath::polkadot(0, 0), b"abc").unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].tag, ChunkTag::Last);
        assert_eq!(chunks[1].payload, b"abc");
    }

    #[test]
    fn test_command_encoding() {
        let cmd = ApduCommand {
            cla: 0x90,
            ins: 0x02,
            p1: ChunkTag::Add as u8,
            p2: 0x00,
            data: vec![1, 2, 3],
        };
        let raw = cmd.encode().unwrap();
        assert_eq!(raw, vec![0x90, 0x02, 0x01, 0x00, 0x03, 1, 2, 3]);
        assert_eq!(ApduCommand::decode(&raw).unwrap(), cmd);
    }

    #[test]
    fn test_response_parse() {
        let resp = ApduResponse::parse(&[0xaa, 0xbb, 0x90, 0x00]).unwrap();
        assert_eq!(resp.data, vec![0xaa, 0xbb]);
        assert_eq!(resp.status, 0x9000);
        assert!(ApduResponse::parse(&[0x90]).is_err());
    }
}
