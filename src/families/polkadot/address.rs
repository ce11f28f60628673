//! SS58 Addresses
//!
//! Format: base58(prefix || public_key || checksum), where the checksum is
//! the first two bytes of Blake2b-512("SS58PRE" || prefix || public_key).

use blake2::{Blake2b512, Digest};
use std::fmt;

use crate::error::{ErrorCode, HawalaError, HawalaResult};

/// A 32-byte account id under a network prefix
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ss58Address {
    pub public_key: [u8; 32],
    pub prefix: u16,
}

impl Ss58Address {
    pub fn new(public_key: [u8; 32], prefix: u16) -> Self {
        Self { public_key, prefix }
    }

    /// Parse an SS58 string, checking length and checksum
    pub fn parse(s: &str) -> HawalaResult<Self> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| invalid_address(format!("Invalid base58: {}", e)))?;

        if bytes.len() < 35 {
            return Err(invalid_address("Address too short"));
        }

        let (prefix, prefix_len) = if bytes[0] < 64 {
            (bytes[0] as u16, 1)
        } else if bytes[0] < 128 {
            // 14-bit identifier, low byte split across both bytes
            let lower = (bytes[0] << 2) | (bytes[1] >> 6);
            let upper = bytes[1] & 0x3f;
            (lower as u16 | (upper as u16) << 8, 2)
        } else {
            return Err(invalid_address("Invalid prefix"));
        };

        let pk_end = prefix_len + 32;
        if bytes.len() != pk_end + 2 {
            return Err(invalid_address("Invalid address length"));
        }

        let computed = compute_ss58_checksum(&bytes[..pk_end]);
        if bytes[pk_end..] != computed {
            return Err(invalid_address("Invalid checksum"));
        }

        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&bytes[prefix_len..pk_end]);
        Ok(Self { public_key, prefix })
    }

    pub fn to_ss58(&self) -> String {
        let mut data = Vec::with_capacity(36);
        if self.prefix < 64 {
            data.push(self.prefix as u8);
        } else {
            data.push((((self.prefix & 0x00fc) >> 2) as u8) | 0x40);
            data.push(((self.prefix >> 8) as u8) | (((self.prefix & 0x0003) as u8) << 6));
        }
        data.extend_from_slice(&self.public_key);
        let checksum = compute_ss58_checksum(&data);
        data.extend_from_slice(&checksum);
        bs58::encode(data).into_string()
    }
}

impl fmt::Display for Ss58Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ss58())
    }
}

fn compute_ss58_checksum(data: &[u8]) -> [u8; 2] {
    const SS58_PREFIX: &[u8] = b"SS58PRE";

    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(data);
    let hash = hasher.finalize();

    [hash[0], hash[1]]
}

fn invalid_address(msg: impl Into<String>) -> HawalaError {
    HawalaError::new(ErrorCode::InvalidAddress, msg)
}

/// Whether `address` is a well-formed SS58 address for `prefix`
pub fn is_valid_address(address: &str, prefix: u16) -> bool {
    matches!(Ss58Address::parse(address), Ok(a) if a.prefix == prefix)
}

/// Public key behind an SS58 address
pub fn public_key_of(address: &str) -> HawalaResult<[u8; 32]> {
    Ss58Address::parse(address).map(|a| a.public_key)
}
