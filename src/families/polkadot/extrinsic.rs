//! Extrinsic Encoding
//!
//! SCALE encoding of the calls this wallet issues, the signing payload
//! handed to the device, and the signed extrinsic submitted to the network.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

type Blake2b256 = Blake2b<U32>;

/// Payloads above this size are signed through their Blake2b-256 hash
pub const MAX_UNHASHED_PAYLOAD: usize = 256;

/// Signed extrinsic, format version 4
const SIGNED_EXTRINSIC_V4: u8 = 0x84;
/// MultiAddress::Id
const MULTI_ADDRESS_ID: u8 = 0x00;
/// MultiSignature::Ed25519
const MULTI_SIGNATURE_ED25519: u8 = 0x00;

// =============================================================================
// Call Indices
// =============================================================================

/// Pallet positions in a runtime's call enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallIndices {
    pub balances: u8,
    pub staking: u8,
}

impl CallIndices {
    pub const POLKADOT: CallIndices = CallIndices { balances: 5, staking: 7 };
    pub const KUSAMA: CallIndices = CallIndices { balances: 4, staking: 6 };
}

mod method {
    pub const TRANSFER_ALLOW_DEATH: u8 = 0;
    pub const TRANSFER_KEEP_ALIVE: u8 = 3;

    pub const BOND: u8 = 0;
    pub const BOND_EXTRA: u8 = 1;
    pub const UNBOND: u8 = 2;
    pub const WITHDRAW_UNBONDED: u8 = 3;
    pub const NOMINATE: u8 = 5;
    pub const CHILL: u8 = 6;
    pub const SET_CONTROLLER: u8 = 8;
    pub const PAYOUT_STAKERS: u8 = 18;
    pub const REBOND: u8 = 19;
}

// =============================================================================
// Calls
// =============================================================================

/// Where staking rewards are paid
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RewardDestination {
    #[default]
    Staked,
    Stash,
    Controller,
    Account(String),
}

/// A call this wallet can sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolkadotCall {
    TransferAllowDeath { dest: [u8; 32], value: u128 },
    TransferKeepAlive { dest: [u8; 32], value: u128 },
    Bond { value: u128, payee: RewardPayee },
    BondExtra { value: u128 },
    Unbond { value: u128 },
    Rebond { value: u128 },
    WithdrawUnbonded { num_slashing_spans: u32 },
    Nominate { targets: Vec<[u8; 32]> },
    Chill,
    SetController,
    PayoutStakers { validator_stash: [u8; 32], era: u32 },
}

/// [`RewardDestination`] with the account already resolved to a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardPayee {
    Staked,
    Stash,
    Controller,
    Account([u8; 32]),
}

impl PolkadotCall {
    pub fn encode(&self, indices: &CallIndices) -> Vec<u8> {
        let mut data = Vec::new();

        match self {
            PolkadotCall::TransferAllowDeath { dest, value } => {
                data.extend_from_slice(&[indices.balances, method::TRANSFER_ALLOW_DEATH, MULTI_ADDRESS_ID]);
                data.extend_from_slice(dest);
                data.extend_from_slice(&compact_encode(*value));
            }
            PolkadotCall::TransferKeepAlive { dest, value } => {
                data.extend_from_slice(&[indices.balances, method::TRANSFER_KEEP_ALIVE, MULTI_ADDRESS_ID]);
                data.extend_from_slice(dest);
                data.extend_from_slice(&compact_encode(*value));
            }
            PolkadotCall::Bond { value, payee } => {
                data.extend_from_slice(&[indices.staking, method::BOND]);
                data.extend_from_slice(&compact_encode(*value));
                match payee {
                    RewardPayee::Staked => data.push(0),
                    RewardPayee::Stash => data.push(1),
                    RewardPayee::Controller => data.push(2),
                    RewardPayee::Account(key) => {
                        data.push(3);
                        data.extend_from_slice(key);
                    }
                }
            }
            PolkadotCall::BondExtra { value } => {
                data.extend_from_slice(&[indices.staking, method::BOND_EXTRA]);
                data.extend_from_slice(&compact_encode(*value));
            }
            PolkadotCall::Unbond { value } => {
                data.extend_from_slice(&[indices.staking, method::UNBOND]);
                data.extend_from_slice(&compact_encode(*value));
            }
            PolkadotCall::Rebond { value } => {
                data.extend_from_slice(&[indices.staking, method::REBOND]);
                data.extend_from_slice(&compact_encode(*value));
            }
            PolkadotCall::WithdrawUnbonded { num_slashing_spans } => {
                data.extend_from_slice(&[indices.staking, method::WITHDRAW_UNBONDED]);
                data.extend_from_slice(&num_slashing_spans.to_le_bytes());
            }
            PolkadotCall::Nominate { targets } => {
                data.extend_from_slice(&[indices.staking, method::NOMINATE]);
                data.extend_from_slice(&compact_encode(targets.len() as u128));
                for target in targets {
                    data.push(MULTI_ADDRESS_ID);
                    data.extend_from_slice(target);
                }
            }
            PolkadotCall::Chill => {
                data.extend_from_slice(&[indices.staking, method::CHILL]);
            }
            PolkadotCall::SetController => {
                data.extend_from_slice(&[indices.staking, method::SET_CONTROLLER]);
            }
            PolkadotCall::PayoutStakers { validator_stash, era } => {
                data.extend_from_slice(&[indices.staking, method::PAYOUT_STAKERS]);
                data.extend_from_slice(validator_stash);
                data.extend_from_slice(&era.to_le_bytes());
            }
        }

        data
    }
}

// =============================================================================
// Era
// =============================================================================

/// Extrinsic mortality
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtrinsicEra {
    Immortal,
    Mortal { period: u64, phase: u64 },
}

impl ExtrinsicEra {
    /// Mortal era anchored at `current_block`
    pub fn mortal(current_block: u64, period: u64) -> Self {
        let period = period.next_power_of_two().clamp(4, 65536);
        let phase = current_block % period;
        let quantize_factor = (period >> 12).max(1);
        Self::Mortal {
            period,
            phase: phase / quantize_factor * quantize_factor,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Immortal => vec![0x00],
            Self::Mortal { period, phase } => {
                let quantize_factor = (*period >> 12).max(1);
                let quantized_phase = (phase / quantize_factor) as u16;
                let period_log2 = (period.trailing_zeros() as u16).saturating_sub(1).clamp(1, 15);
                let encoded = (quantized_phase << 4) | period_log2;
                encoded.to_le_bytes().to_vec()
            }
        }
    }
}

// =============================================================================
// Payload and Framing
// =============================================================================

/// Everything besides the call that goes into the signing payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrinsicParams {
    pub nonce: u64,
    pub tip: u128,
    pub era: ExtrinsicEra,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: [u8; 32],
    /// Checkpoint block; the genesis hash for immortal extrinsics
    pub block_hash: [u8; 32],
}

/// An encoded call plus its signing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedExtrinsic {
    pub call_data: Vec<u8>,
    pub params: ExtrinsicParams,
}

impl UnsignedExtrinsic {
    pub fn new(call: &PolkadotCall, indices: &CallIndices, params: ExtrinsicParams) -> Self {
        Self {
            call_data: call.encode(indices),
            params,
        }
    }

    /// Bytes shown to and signed by the device
    pub fn signing_payload(&self) -> Vec<u8> {
        let p = &self.params;
        let mut payload = Vec::with_capacity(self.call_data.len() + 96);
        payload.extend_from_slice(&self.call_data);
        payload.extend_from_slice(&p.era.encode());
        payload.extend_from_slice(&compact_encode(p.nonce as u128));
        payload.extend_from_slice(&compact_encode(p.tip));
        payload.extend_from_slice(&p.spec_version.to_le_bytes());
        payload.extend_from_slice(&p.transaction_version.to_le_bytes());
        payload.extend_from_slice(&p.genesis_hash);
        payload.extend_from_slice(&p.block_hash);
        payload
    }

    /// Length-prefixed signed extrinsic, ready to submit
    pub fn encode_signed(&self, signer: &[u8; 32], signature: &[u8; 64]) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.call_data.len() + 110);
        data.push(SIGNED_EXTRINSIC_V4);
        data.push(MULTI_ADDRESS_ID);
        data.extend_from_slice(signer);
        data.push(MULTI_SIGNATURE_ED25519);
        data.extend_from_slice(signature);
        data.extend_from_slice(&self.params.era.encode());
        data.extend_from_slice(&compact_encode(self.params.nonce as u128));
        data.extend_from_slice(&compact_encode(self.params.tip));
        data.extend_from_slice(&self.call_data);

        let mut result = compact_encode(data.len() as u128);
        result.extend_from_slice(&data);
        result
    }
}

/// Message actually covered by the signature for `payload`
pub fn signature_message(payload: &[u8]) -> Vec<u8> {
    if payload.len() > MAX_UNHASHED_PAYLOAD {
        blake2_256(payload).to_vec()
    } else {
        payload.to_vec()
    }
}

/// Network hash of an encoded extrinsic, `0x`-prefixed hex
pub fn extrinsic_hash(encoded: &[u8]) -> String {
    format!("0x{}", hex::encode(blake2_256(encoded)))
}

pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// SCALE compact encoding
pub fn compact_encode(value: u128) -> Vec<u8> {
    if value < 0x40 {
        vec![(value << 2) as u8]
    } else if value < 0x4000 {
        let v = (value << 2) | 0x01;
        (v as u16).to_le_bytes().to_vec()
    } else if value < 0x4000_0000 {
        let v = (value << 2) | 0x02;
        (v as u32).to_le_bytes().to_vec()
    } else {
        let bytes_needed = (128 - value.leading_zeros()).div_ceil(8);
        let mut result = vec![(((bytes_needed - 4) << 2) | 0x03) as u8];
        for i in 0..bytes_needed {
            result.push((value >> (8 * i)) as u8);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(nonce: u64) -> ExtrinsicParams {
        ExtrinsicParams {
            nonce,
            tip: 0,
            era: ExtrinsicEra::Immortal,
            spec_version: 1_000_000,
            transaction_version: 25,
            genesis_hash: [0x91; 32],
            block_hash: [0x91; 32],
        }
    }

    #[test]
    fn test_compact_encoding() {
        assert_eq!(compact_encode(0), vec![0x00]);
        assert_eq!(compact_encode(1), vec![0x04]);
        assert_eq!(compact_encode(63), vec![0xfc]);
        assert_eq!(compact_encode(64), vec![0x01, 0x01]);
        assert_eq!(compact_encode(16383), vec![0xfd, 0xff]);
        assert_eq!(compact_encode(16384), vec![0x02, 0x00, 0x01, 0x00]);
        assert_eq!(compact_encode(1 << 30), vec![0x03, 0x00, 0x00, 0x00, 0x40]);
    }

    #[test]
    fn test_transfer_call_encoding() {
        let call = PolkadotCall::TransferKeepAlive { dest: [0xaa; 32], value: 12_345 };
        let encoded = call.encode(&CallIndices::POLKADOT);
        assert_eq!(&encoded[..3], &[5, 3, 0]);
        assert_eq!(&encoded[3..35], &[0xaa; 32]);
        assert_eq!(&encoded[35..], compact_encode(12_345).as_slice());
    }

    #[test]
    fn test_nominate_call_encoding() {
        let call = PolkadotCall::Nominate { targets: vec![[1; 32], [2; 32]] };
        let encoded = call.encode(&CallIndices::KUSAMA);
        assert_eq!(&encoded[..3], &[6, 5, 0x08]);
        assert_eq!(encoded.len(), 3 + 2 * 33);
    }

    #[test]
    fn test_mortal_era() {
        let era = ExtrinsicEra::mortal(12_345, 64);
        assert_eq!(era, ExtrinsicEra::Mortal { period: 64, phase: 12_345 % 64 });
        // period 64 => log2 - 1 = 5, phase 57 << 4
        assert_eq!(era.encode(), ((57u16 << 4) | 5).to_le_bytes().to_vec());
        assert_eq!(ExtrinsicEra::Immortal.encode(), vec![0]);
    }

    #[test]
    fn test_signing_payload_layout() {
        let call = PolkadotCall::Chill;
        let unsigned = UnsignedExtrinsic::new(&call, &CallIndices::POLKADOT, params(3));
        let payload = unsigned.signing_payload();
        // call(2) era(1) nonce(1) tip(1) spec(4) tx(4) genesis(32) block(32)
        assert_eq!(payload.len(), 77);
        assert_eq!(&payload[..2], &[7, 6]);
        assert_eq!(payload[3], 3 << 2);
        assert_eq!(signature_message(&payload), payload);
    }

    #[test]
    fn test_long_payload_is_hashed() {
        let targets = vec![[9u8; 32]; 16];
        let unsigned = UnsignedExtrinsic::new(&PolkadotCall::Nominate { targets }, &CallIndices::POLKADOT, params(0));
        let payload = unsigned.signing_payload();
        assert!(payload.len() > MAX_UNHASHED_PAYLOAD);
        assert_eq!(signature_message(&payload).len(), 32);
    }

    #[test]
    fn test_signed_framing() {
        let unsigned = UnsignedExtrinsic::new(&PolkadotCall::Chill, &CallIndices::POLKADOT, params(1));
        let signed = unsigned.encode_signed(&[4; 32], &[5; 64]);
        // 1 version + 33 signer + 65 signature + era + nonce + tip + call
        let body_len = 1 + 33 + 65 + 1 + 1 + 1 + 2;
        assert_eq!(&signed[..2], compact_encode(body_len as u128).as_slice());
        assert_eq!(signed[2], SIGNED_EXTRINSIC_V4);
        assert_eq!(signed.len(), 2 + body_len);
        assert!(extrinsic_hash(&signed).starts_with("0x"));
        assert_eq!(extrinsic_hash(&signed).len(), 66);
    }
}
