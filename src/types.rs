//! Shared types for Hawala Core
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HawalaError, HawalaResult};
use crate::families::polkadot::{PolkadotOperationExtra, PolkadotResources};

// =============================================================================
// Family Types
// =============================================================================

/// Blockchain families with a bridge implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    Polkadot,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Polkadot => "polkadot",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "polkadot" | "dot" | "kusama" | "ksm" | "westend" => Ok(Family::Polkadot),
            _ => Err(format!("Unknown family: {}", s)),
        }
    }
}

// =============================================================================
// Derivation Paths
// =============================================================================

/// Hardened index flag
pub const HARDENED: u32 = 0x8000_0000;

/// BIP32-style derivation path as a sequence of 32-bit indices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn new(indices: Vec<u32>) -> Self {
        Self(indices)
    }

    /// Polkadot account path: 44'/354'/account'/0'/index'
    pub fn polkadot(account: u32, index: u32) -> Self {
        Self(vec![
            44 | HARDENED,
            354 | HARDENED,
            account | HARDENED,
            HARDENED,
            index | HARDENED,
        ])
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::str::FromStr for DerivationPath {
    type Err = HawalaError;

    fn from_str(s: &str) -> HawalaResult<Self> {
        let trimmed = s.trim().trim_start_matches("m/");
        if trimmed.is_empty() {
            return Ok(Self(Vec::new()));
        }

        let mut indices = Vec::new();
        for part in trimmed.split('/') {
            let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
                Some(d) => (d, true),
                None => (part, false),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| HawalaError::invalid_input(format!("Invalid path component: {}", part)))?;
            if index >= HARDENED {
                return Err(HawalaError::invalid_input(format!("Path index out of range: {}", part)));
            }
            indices.push(if hardened { index | HARDENED } else { index });
        }
        Ok(Self(indices))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|i| {
                if i & HARDENED != 0 {
                    format!("{}'", i & !HARDENED)
                } else {
                    i.to_string()
                }
            })
            .collect();
        f.write_str(&parts.join("/"))
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Operation kinds across families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    In,
    Out,
    Fees,
    None,
    Bond,
    Unbond,
    Rebond,
    WithdrawUnbonded,
    Nominate,
    Chill,
    SetController,
    Reward,
    Slash,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::In => "IN",
            OperationType::Out => "OUT",
            OperationType::Fees => "FEES",
            OperationType::None => "NONE",
            OperationType::Bond => "BOND",
            OperationType::Unbond => "UNBOND",
            OperationType::Rebond => "REBOND",
            OperationType::WithdrawUnbonded => "WITHDRAW_UNBONDED",
            OperationType::Nominate => "NOMINATE",
            OperationType::Chill => "CHILL",
            OperationType::SetController => "SET_CONTROLLER",
            OperationType::Reward => "REWARD",
            OperationType::Slash => "SLASH",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Family-specific operation metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "kebab-case")]
pub enum OperationExtra {
    #[default]
    None,
    Polkadot(PolkadotOperationExtra),
}

/// A confirmed or optimistic ledger operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    pub hash: String,
    pub account_id: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub value: u128,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub fee: u128,
    pub senders: Vec<String>,
    pub recipients: Vec<String>,
    pub block_height: Option<u64>,
    pub block_hash: Option<String>,
    pub date: DateTime<Utc>,
    pub transaction_sequence_number: Option<u64>,
    #[serde(default)]
    pub has_failed: bool,
    #[serde(default)]
    pub extra: OperationExtra,
}

/// Deterministic operation id: account, chain hash and type
pub fn encode_operation_id(account_id: &str, hash: &str, op_type: OperationType) -> String {
    format!("{}-{}-{}", account_id, hash, op_type)
}

/// Deterministic account id for a family, currency and address
pub fn encode_account_id(family: Family, currency: &str, address: &str) -> String {
    format!("{}:{}:{}", family, currency, address)
}

// =============================================================================
// Accounts
// =============================================================================

/// Family-specific account resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "kebab-case")]
pub enum FamilyResources {
    Polkadot(PolkadotResources),
}

/// A wallet account on one ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub family: Family,
    pub currency: String,
    pub fresh_address: String,
    pub derivation_path: DerivationPath,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub balance: u128,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub spendable_balance: u128,
    pub block_height: u64,
    /// Newest first, unique by id
    pub operations: Vec<Operation>,
    pub pending_operations: Vec<Operation>,
    pub resources: Option<FamilyResources>,
    /// Highest block height whose history is completely merged
    pub last_synced_height: Option<u64>,
    pub last_sync_date: Option<DateTime<Utc>>,
}

impl Account {
    /// Empty account, before its first synchronization
    pub fn new(family: Family, currency: &str, address: &str, derivation_path: DerivationPath) -> Self {
        Self {
            id: encode_account_id(family, currency, address),
            family,
            currency: currency.to_string(),
            fresh_address: address.to_string(),
            derivation_path,
            balance: 0,
            spendable_balance: 0,
            block_height: 0,
            operations: Vec::new(),
            pending_operations: Vec::new(),
            resources: None,
            last_synced_height: None,
            last_sync_date: None,
        }
    }

    pub fn polkadot_resources(&self) -> Option<&PolkadotResources> {
        match &self.resources {
            Some(FamilyResources::Polkadot(r)) => Some(r),
            None => None,
        }
    }

    /// Record a broadcast operation until its confirmed twin is synced
    pub fn add_pending_operation(&mut self, operation: Operation) {
        if self.operations.iter().any(|op| op.id == operation.id) {
            return;
        }
        self.pending_operations.retain(|op| op.id != operation.id);
        self.pending_operations.insert(0, operation);
    }

    /// Next usable sequence number, accounting for pending operations
    pub fn next_nonce(&self) -> u64 {
        let confirmed = self.polkadot_resources().map(|r| r.nonce).unwrap_or(0);
        crate::sync::next_nonce(confirmed, &self.pending_operations)
    }
}

// =============================================================================
// Signing Output
// =============================================================================

/// Result of a successful device signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOperation {
    /// Optimistic operation, shown before network confirmation
    pub operation: Operation,
    /// Raw device signature, hex encoded
    pub signature: String,
    /// Wire-encoded signed transaction, hex encoded
    pub signed_payload: String,
}
