//! Polkadot Account Bridge

use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::sync::Arc;

use super::address::{public_key_of, Ss58Address};
use super::api::PolkadotApi;
use super::currency::PolkadotCurrency;
use super::extrinsic::{extrinsic_hash, signature_message, UnsignedExtrinsic};
use super::fees::{build_unsigned, estimate_fees};
use super::preload::{PolkadotPreloadData, PolkadotPreloadSource};
use super::status::{recipient_error, resolved_amount, transaction_status, StatusContext};
use super::transaction::{PolkadotMode, PolkadotTransaction, PolkadotTransactionPatch};
use super::PolkadotOperationExtra;
use crate::bridge::{ensure_family, AccountBridge, ProgressSender, SignEvent, TransactionStatus};
use crate::config::CoreConfig;
use crate::device::{self, AppCommands, CancelToken, DeviceAddress, DeviceSession, POLKADOT_APP};
use crate::error::{ErrorCode, HawalaError, HawalaResult};
use crate::preload::PreloadCache;
use crate::types::{encode_operation_id, Account, Family, Operation, OperationExtra, SignedOperation};
use crate::utils::FingerprintCache;

const SIGNATURE_LEN: usize = 64;

pub struct PolkadotBridge {
    api: Arc<dyn PolkadotApi>,
    currency: &'static PolkadotCurrency,
    fees: FingerprintCache<u128>,
    preload: Arc<PreloadCache<PolkadotPreloadSource>>,
    app: AppCommands,
    confirm_addresses: bool,
}

impl PolkadotBridge {
    pub fn new(
        api: Arc<dyn PolkadotApi>,
        currency: &'static PolkadotCurrency,
        preload: Arc<PreloadCache<PolkadotPreloadSource>>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            api,
            currency,
            fees: FingerprintCache::new(config.fees.max_age()),
            preload,
            app: POLKADOT_APP,
            confirm_addresses: config.device.require_address_confirmation,
        }
    }

    pub fn currency(&self) -> &'static PolkadotCurrency {
        self.currency
    }

    /// Read the account's address from the device and check it matches.
    ///
    /// Asks for on-screen confirmation when configured to.
    pub async fn verify_address(&self, session: &mut DeviceSession, account: &Account) -> HawalaResult<DeviceAddress> {
        ensure_family(Family::Polkadot, account)?;
        let found = device::get_address(session, &self.app, &account.derivation_path, self.confirm_addresses).await?;

        let expected = public_key_of(&account.fresh_address)?;
        if found.public_key != expected {
            crate::log_warn!(
                "polkadot",
                "Device address mismatch",
                account = account.id,
                address = found.address,
            );
            return Err(HawalaError::new(
                ErrorCode::InvalidAddress,
                "Device returned a different address for this account",
            ));
        }
        Ok(found)
    }

    /// Whether the draft carries everything fee estimation needs
    fn is_ready_for_fees(&self, account: &Account, transaction: &PolkadotTransaction) -> bool {
        let prefix = self.currency.ss58_prefix;
        let has_amount = transaction.amount > 0 || transaction.use_all_amount;
        let valid = |a: &String| Ss58Address::parse(a).is_ok_and(|a| a.prefix == prefix);

        match transaction.mode {
            PolkadotMode::Send => {
                has_amount && recipient_error(&transaction.recipient, &account.fresh_address, prefix).is_none()
            }
            PolkadotMode::Bond => {
                let payee_ok = match &transaction.reward_destination {
                    Some(super::RewardDestination::Account(payee)) => valid(payee),
                    _ => true,
                };
                has_amount && payee_ok
            }
            PolkadotMode::Unbond | PolkadotMode::Rebond => has_amount,
            PolkadotMode::Nominate => !transaction.validators.is_empty() && transaction.validators.iter().all(valid),
            PolkadotMode::ClaimReward => transaction.validators.first().is_some_and(valid) && transaction.era.is_some(),
            PolkadotMode::WithdrawUnbonded | PolkadotMode::Chill | PolkadotMode::SetController => true,
        }
    }

    async fn preload_data(&self, mode: PolkadotMode) -> HawalaResult<Arc<PolkadotPreloadData>> {
        if mode == PolkadotMode::Send {
            return Ok(self.preload.current().data);
        }
        Ok(self.preload.preload().await?.data)
    }

    fn optimistic_operation(
        &self,
        account: &Account,
        transaction: &PolkadotTransaction,
        amount: u128,
        fees: u128,
        hash: String,
        nonce: u64,
    ) -> Operation {
        let op_type = transaction.mode.operation_type();
        let (value, recipients) = match transaction.mode {
            PolkadotMode::Send => (amount.saturating_add(fees), vec![transaction.recipient.clone()]),
            PolkadotMode::Nominate => (fees, transaction.validators.clone()),
            _ => (fees, Vec::new()),
        };
        let validator_stash = match transaction.mode {
            PolkadotMode::ClaimReward => transaction.validators.first().cloned(),
            _ => None,
        };

        Operation {
            id: encode_operation_id(&account.id, &hash, op_type),
            hash,
            account_id: account.id.clone(),
            op_type,
            value,
            fee: fees,
            senders: vec![account.fresh_address.clone()],
            recipients,
            block_height: None,
            block_hash: None,
            date: Utc::now(),
            transaction_sequence_number: Some(nonce),
            has_failed: false,
            extra: OperationExtra::Polkadot(PolkadotOperationExtra {
                pallet_method: None,
                amount,
                validators: transaction.validators.clone(),
                validator_stash,
                era: transaction.era,
            }),
        }
    }
}

/// Strip the scheme byte some firmware prepends to ed25519 signatures
pub fn parse_device_signature(raw: &[u8]) -> HawalaResult<[u8; SIGNATURE_LEN]> {
    let bytes = match raw.len() {
        SIGNATURE_LEN => raw,
        n if n == SIGNATURE_LEN + 1 => &raw[1..],
        n => {
            return Err(HawalaError::new(
                ErrorCode::InvalidDeviceResponse,
                format!("Unexpected signature length {}", n),
            ))
        }
    };
    let mut signature = [0u8; SIGNATURE_LEN];
    signature.copy_from_slice(bytes);
    Ok(signature)
}

/// Check an ed25519 signature against the account's public key
pub fn verify_signature(public_key: &[u8; 32], message: &[u8], signature: &[u8; SIGNATURE_LEN]) -> HawalaResult<()> {
    let key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| HawalaError::new(ErrorCode::VerificationFailed, format!("Invalid public key: {}", e)))?;
    key.verify(message, &Signature::from_bytes(signature))
        .map_err(|_| HawalaError::new(ErrorCode::VerificationFailed, "Device signature does not match the account"))
}

#[async_trait]
impl AccountBridge for PolkadotBridge {
    type Transaction = PolkadotTransaction;
    type Patch = PolkadotTransactionPatch;
    type Unsigned = UnsignedExtrinsic;

    fn family(&self) -> Family {
        Family::Polkadot
    }

    fn create_transaction(&self) -> PolkadotTransaction {
        PolkadotTransaction::default()
    }

    fn update_transaction(&self, transaction: &PolkadotTransaction, patch: PolkadotTransactionPatch) -> PolkadotTransaction {
        transaction.apply(patch)
    }

    async fn prepare_transaction(&self, account: &Account, transaction: &PolkadotTransaction) -> HawalaResult<PolkadotTransaction> {
        ensure_family(Family::Polkadot, account)?;
        if !self.is_ready_for_fees(account, transaction) {
            return Ok(transaction.clone());
        }

        let fees = estimate_fees(self.api.as_ref(), &self.fees, account, transaction, self.currency).await?;
        if transaction.fees == Some(fees) {
            return Ok(transaction.clone());
        }
        Ok(PolkadotTransaction {
            fees: Some(fees),
            ..transaction.clone()
        })
    }

    async fn get_transaction_status(&self, account: &Account, transaction: &PolkadotTransaction) -> HawalaResult<TransactionStatus> {
        ensure_family(Family::Polkadot, account)?;
        let preload = self.preload_data(transaction.mode).await?;

        let recipient_is_new = transaction.mode == PolkadotMode::Send
            && recipient_error(&transaction.recipient, &account.fresh_address, self.currency.ss58_prefix).is_none()
            && self.api.is_new_account(&transaction.recipient).await?;

        let ctx = StatusContext {
            currency: self.currency,
            preload: preload.as_ref(),
            recipient_is_new,
        };
        Ok(transaction_status(account, transaction, &ctx))
    }

    async fn build_unsigned(&self, account: &Account, transaction: &PolkadotTransaction) -> HawalaResult<UnsignedExtrinsic> {
        ensure_family(Family::Polkadot, account)?;
        if transaction.fees.is_none() {
            return Err(HawalaError::invalid_input("Transaction has no fees; prepare it first"));
        }

        let info = self.api.network_info().await?;
        build_unsigned(account, transaction, resolved_amount(account, transaction), &info, self.currency)
    }

    async fn sign_operation(
        &self,
        account: &Account,
        transaction: &PolkadotTransaction,
        unsigned: UnsignedExtrinsic,
        session: &mut DeviceSession,
        cancel: &CancelToken,
        progress: &ProgressSender,
    ) -> HawalaResult<SignedOperation> {
        ensure_family(Family::Polkadot, account)?;
        let fees = transaction
            .fees
            .ok_or_else(|| HawalaError::invalid_input("Transaction has no fees; prepare it first"))?;

        let amount = resolved_amount(account, transaction);
        let payload = unsigned.signing_payload();
        let signer = public_key_of(&account.fresh_address)?;

        cancel.check()?;
        let _ = progress.send(Ok(SignEvent::DeviceSignatureRequested));
        let raw = device::sign(session, &self.app, &account.derivation_path, &payload, cancel).await?;
        let _ = progress.send(Ok(SignEvent::DeviceSignatureGranted));

        let signature = parse_device_signature(&raw)?;
        verify_signature(&signer, &signature_message(&payload), &signature)?;
        cancel.check()?;

        let encoded = unsigned.encode_signed(&signer, &signature);
        let operation = self.optimistic_operation(
            account,
            transaction,
            amount,
            fees,
            extrinsic_hash(&encoded),
            unsigned.params.nonce,
        );

        crate::log_info!(
            "polkadot",
            "Operation signed",
            mode = transaction.mode,
            nonce = unsigned.params.nonce,
            hash = operation.hash,
        );
        Ok(SignedOperation {
            operation,
            signature: hex::encode(signature),
            signed_payload: format!("0x{}", hex::encode(encoded)),
        })
    }

    async fn broadcast(&self, account: &Account, signed: &SignedOperation) -> HawalaResult<Operation> {
        ensure_family(Family::Polkadot, account)?;
        let extrinsic = hex::decode(signed.signed_payload.trim_start_matches("0x"))?;

        let hash = match self.api.submit(&extrinsic).await {
            Ok(hash) => hash,
            Err(e) => {
                crate::log_error!("polkadot", "Broadcast failed", account = account.id, error = e);
                return Err(e);
            }
        };

        let mut operation = signed.operation.clone();
        operation.id = encode_operation_id(&operation.account_id, &hash, operation.op_type);
        operation.hash = hash;
        crate::log_info!("polkadot", "Operation broadcast", txid = operation.hash);
        Ok(operation)
    }

    async fn estimate_max_spendable(&self, account: &Account, transaction: Option<&PolkadotTransaction>) -> HawalaResult<u128> {
        let base = transaction.cloned().unwrap_or_default();
        let mut draft = PolkadotTransaction {
            use_all_amount: true,
            fees: None,
            ..base
        };
        if draft.mode == PolkadotMode::Send {
            draft.recipient = placeholder_recipient(account, self.currency.ss58_prefix)?;
        }

        let prepared = self.prepare_transaction(account, &draft).await?;
        let status = self.get_transaction_status(account, &prepared).await?;
        Ok(status.amount)
    }
}

/// Valid address distinct from the account's own
fn placeholder_recipient(account: &Account, prefix: u16) -> HawalaResult<String> {
    let own = public_key_of(&account.fresh_address)?;
    let key = if own == [0x11; 32] { [0x22; 32] } else { [0x11; 32] };
    Ok(Ss58Address::new(key, prefix).to_ss58())
}
