//! Account Bridge
//!
//! Transaction lifecycle every family implements:
//! create → update* → prepare → status → sign → broadcast.
//!
//! The bridge only reports validation problems through
//! [`TransactionStatus`]; refusing to sign an invalid draft is the host's job.

pub mod signing;
pub mod status;

#[cfg(test)]
mod tests;

pub use signing::{ProgressSender, SigningTask};
pub use status::{StatusField, TransactionError, TransactionStatus, TransactionWarning};

use async_trait::async_trait;

use crate::device::{CancelToken, DeviceSession};
use crate::error::{HawalaError, HawalaResult};
use crate::types::{Account, Family, Operation, SignedOperation};

/// Progress of one signing attempt, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum SignEvent {
    DeviceSignatureRequested,
    DeviceSignatureGranted,
    Signed(SignedOperation),
}

/// Per-family transaction lifecycle
#[async_trait]
pub trait AccountBridge: Send + Sync {
    type Transaction: Clone + PartialEq + Send + Sync + 'static;
    type Patch: Send;
    /// Device-ready payload built before the device is locked
    type Unsigned: Send;

    fn family(&self) -> Family;

    /// Zero-value draft
    fn create_transaction(&self) -> Self::Transaction;

    /// Pure merge of `patch` into `transaction`
    fn update_transaction(&self, transaction: &Self::Transaction, patch: Self::Patch) -> Self::Transaction;

    /// Fill in derived fields such as fees.
    ///
    /// Returns a value equal to `transaction` when nothing changed.
    async fn prepare_transaction(&self, account: &Account, transaction: &Self::Transaction) -> HawalaResult<Self::Transaction>;

    async fn get_transaction_status(&self, account: &Account, transaction: &Self::Transaction) -> HawalaResult<TransactionStatus>;

    /// Everything signing needs from the network, fetched while no device
    /// session is held
    async fn build_unsigned(&self, account: &Account, transaction: &Self::Transaction) -> HawalaResult<Self::Unsigned>;

    /// Sign `unsigned` on the device and synthesize the optimistic operation.
    ///
    /// Emits `DeviceSignatureRequested` and `DeviceSignatureGranted` on
    /// `progress`; the caller emits the final `Signed` event.
    async fn sign_operation(
        &self,
        account: &Account,
        transaction: &Self::Transaction,
        unsigned: Self::Unsigned,
        session: &mut DeviceSession,
        cancel: &CancelToken,
        progress: &ProgressSender,
    ) -> HawalaResult<SignedOperation>;

    /// Submit and return the operation with its network hash
    async fn broadcast(&self, account: &Account, signed: &SignedOperation) -> HawalaResult<Operation>;

    /// Amount a "send everything" draft would move
    async fn estimate_max_spendable(&self, account: &Account, transaction: Option<&Self::Transaction>) -> HawalaResult<u128>;
}

/// Fail fast when an account is handed to the wrong family's bridge
pub fn ensure_family(expected: Family, account: &Account) -> HawalaResult<()> {
    if account.family != expected {
        return Err(HawalaError::family_mismatch(format!(
            "{} bridge cannot handle {} account {}",
            expected, account.family, account.id
        )));
    }
    Ok(())
}
