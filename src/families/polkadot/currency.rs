//! Chain Registry
//!
//! Per-network constants for Polkadot-style chains.

use std::time::Duration;

use super::extrinsic::CallIndices;

/// Constants of one Substrate network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolkadotCurrency {
    pub id: &'static str,
    pub ticker: &'static str,
    pub decimals: u8,
    pub ss58_prefix: u16,
    /// Minimum balance that keeps an account alive
    pub existential_deposit: u128,
    /// Minimum active bond for a first `bond`
    pub minimum_bond: u128,
    pub max_nominations: usize,
    pub max_unlockings: usize,
    pub era_duration: Duration,
    /// Mortality window of signed extrinsics, in blocks
    pub era_period: u64,
    pub call_indices: CallIndices,
}

pub const POLKADOT: PolkadotCurrency = PolkadotCurrency {
    id: "polkadot",
    ticker: "DOT",
    decimals: 10,
    ss58_prefix: 0,
    existential_deposit: 10_000_000_000,
    minimum_bond: 10_000_000_000,
    max_nominations: 16,
    max_unlockings: 32,
    era_duration: Duration::from_secs(24 * 3600),
    era_period: 64,
    call_indices: CallIndices::POLKADOT,
};

pub const KUSAMA: PolkadotCurrency = PolkadotCurrency {
    id: "kusama",
    ticker: "KSM",
    decimals: 12,
    ss58_prefix: 2,
    existential_deposit: 333_333_333,
    minimum_bond: 333_333_333,
    max_nominations: 24,
    max_unlockings: 32,
    era_duration: Duration::from_secs(6 * 3600),
    era_period: 64,
    call_indices: CallIndices::KUSAMA,
};

/// Look up a network by currency id
pub fn currency_by_id(id: &str) -> Option<&'static PolkadotCurrency> {
    match id {
        "polkadot" => Some(&POLKADOT),
        "kusama" => Some(&KUSAMA),
        _ => None,
    }
}
