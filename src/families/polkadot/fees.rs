//! Fee Estimation
//!
//! Fees come from the node's payment query over a dummy-signed extrinsic of
//! the same shape as the real one. Results are memoized by a fingerprint of
//! the encoded call and the nonce.

use super::address::public_key_of;
use super::api::{NetworkInfo, PolkadotApi};
use super::currency::PolkadotCurrency;
use super::extrinsic::{blake2_256, ExtrinsicEra, ExtrinsicParams, PolkadotCall, RewardDestination, RewardPayee, UnsignedExtrinsic};
use super::transaction::{PolkadotMode, PolkadotTransaction};
use crate::error::{HawalaError, HawalaResult};
use crate::types::Account;
use crate::utils::FingerprintCache;

/// Cache key covering every input that affects the fee.
///
/// Derived from the encoded call itself, so account state that changes the
/// call (first bond vs `bond_extra`, slashing spans) changes the key. The
/// nonce is part of the signed extension and its compact length moves the fee.
pub fn fee_fingerprint(
    account: &Account,
    transaction: &PolkadotTransaction,
    currency: &PolkadotCurrency,
) -> HawalaResult<String> {
    let call = build_call(account, transaction, estimate_value(account, transaction))?;
    Ok(format!(
        "{}|{}|{}",
        account.id,
        account.next_nonce(),
        hex::encode(blake2_256(&call.encode(&currency.call_indices))),
    ))
}

fn resolve_payee(destination: &Option<RewardDestination>) -> HawalaResult<RewardPayee> {
    Ok(match destination {
        None | Some(RewardDestination::Staked) => RewardPayee::Staked,
        Some(RewardDestination::Stash) => RewardPayee::Stash,
        Some(RewardDestination::Controller) => RewardPayee::Controller,
        Some(RewardDestination::Account(address)) => RewardPayee::Account(public_key_of(address)?),
    })
}

/// The call a draft encodes, moving `value`
pub fn build_call(account: &Account, transaction: &PolkadotTransaction, value: u128) -> HawalaResult<PolkadotCall> {
    let resources = account.polkadot_resources().cloned().unwrap_or_default();

    Ok(match transaction.mode {
        PolkadotMode::Send => {
            let dest = public_key_of(&transaction.recipient)?;
            if transaction.use_all_amount {
                PolkadotCall::TransferAllowDeath { dest, value }
            } else {
                PolkadotCall::TransferKeepAlive { dest, value }
            }
        }
        PolkadotMode::Bond => {
            if resources.is_stash(&account.fresh_address) {
                PolkadotCall::BondExtra { value }
            } else {
                PolkadotCall::Bond {
                    value,
                    payee: resolve_payee(&transaction.reward_destination)?,
                }
            }
        }
        PolkadotMode::Unbond => PolkadotCall::Unbond { value },
        PolkadotMode::Rebond => PolkadotCall::Rebond { value },
        PolkadotMode::WithdrawUnbonded => PolkadotCall::WithdrawUnbonded {
            num_slashing_spans: resources.num_slashing_spans,
        },
        PolkadotMode::Nominate => PolkadotCall::Nominate {
            targets: transaction
                .validators
                .iter()
                .map(|v| public_key_of(v))
                .collect::<HawalaResult<Vec<_>>>()?,
        },
        PolkadotMode::Chill => PolkadotCall::Chill,
        PolkadotMode::SetController => PolkadotCall::SetController,
        PolkadotMode::ClaimReward => {
            let validator = transaction
                .validators
                .first()
                .ok_or_else(|| HawalaError::invalid_input("Validator is required to claim rewards"))?;
            let era = transaction
                .era
                .ok_or_else(|| HawalaError::invalid_input("Era is required to claim rewards"))?;
            PolkadotCall::PayoutStakers {
                validator_stash: public_key_of(validator)?,
                era,
            }
        }
    })
}

/// Unsigned extrinsic for `transaction` at the account's next nonce
pub fn build_unsigned(
    account: &Account,
    transaction: &PolkadotTransaction,
    value: u128,
    info: &NetworkInfo,
    currency: &PolkadotCurrency,
) -> HawalaResult<UnsignedExtrinsic> {
    let call = build_call(account, transaction, value)?;
    let params = ExtrinsicParams {
        nonce: account.next_nonce(),
        tip: 0,
        era: ExtrinsicEra::mortal(info.block_number, currency.era_period),
        spec_version: info.spec_version,
        transaction_version: info.transaction_version,
        genesis_hash: info.genesis_hash,
        block_hash: info.block_hash,
    };
    Ok(UnsignedExtrinsic::new(&call, &currency.call_indices, params))
}

/// Value the fee estimate encodes for a draft
fn estimate_value(account: &Account, transaction: &PolkadotTransaction) -> u128 {
    if transaction.use_all_amount && matches!(transaction.mode, PolkadotMode::Send | PolkadotMode::Bond) {
        account.spendable_balance
    } else {
        transaction.amount
    }
}

/// Fee of `transaction`, memoized in `cache`
pub async fn estimate_fees(
    api: &dyn PolkadotApi,
    cache: &FingerprintCache<u128>,
    account: &Account,
    transaction: &PolkadotTransaction,
    currency: &PolkadotCurrency,
) -> HawalaResult<u128> {
    let key = fee_fingerprint(account, transaction, currency)?;
    cache
        .get(&key, || async {
            let signer = public_key_of(&account.fresh_address)?;
            let info = api.network_info().await?;
            let unsigned = build_unsigned(account, transaction, estimate_value(account, transaction), &info, currency)?;
            let dummy = unsigned.encode_signed(&signer, &[0u8; 64]);
            let fee = api.estimate_fee(&dummy).await?;
            crate::log_debug!("fees", "Fee estimated", mode = transaction.mode, fee = fee);
            Ok(fee)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::polkadot::address::Ss58Address;
    use crate::families::polkadot::currency::POLKADOT;
    use crate::families::polkadot::PolkadotResources;
    use crate::types::{DerivationPath, Family, FamilyResources};

    fn account() -> Account {
        let address = Ss58Address::new([1; 32], 0).to_ss58();
        Account::new(Family::Polkadot, "polkadot", &address, DerivationPath::polkadot(0, 0))
    }

    fn stash(acc: &mut Account, num_slashing_spans: u32) {
        acc.resources = Some(FamilyResources::Polkadot(PolkadotResources {
            stash: Some(acc.fresh_address.clone()),
            num_slashing_spans,
            ..Default::default()
        }));
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let acc = account();
        let base = PolkadotTransaction {
            recipient: Ss58Address::new([2; 32], 0).to_ss58(),
            amount: 10,
            ..Default::default()
        };

        let key = fee_fingerprint(&acc, &base, &POLKADOT).unwrap();
        assert_eq!(key, fee_fingerprint(&acc, &base.clone(), &POLKADOT).unwrap());

        let other_amount = PolkadotTransaction { amount: 11, ..base.clone() };
        let other_mode = PolkadotTransaction { mode: PolkadotMode::Bond, ..base.clone() };
        let use_all = PolkadotTransaction { use_all_amount: true, ..base.clone() };
        assert_ne!(key, fee_fingerprint(&acc, &other_amount, &POLKADOT).unwrap());
        assert_ne!(key, fee_fingerprint(&acc, &other_mode, &POLKADOT).unwrap());
        assert_ne!(key, fee_fingerprint(&acc, &use_all, &POLKADOT).unwrap());
    }

    #[test]
    fn test_fingerprint_follows_account_state() {
        let mut acc = account();
        let bond = PolkadotTransaction {
            mode: PolkadotMode::Bond,
            amount: 10,
            ..Default::default()
        };
        let withdraw = PolkadotTransaction {
            mode: PolkadotMode::WithdrawUnbonded,
            ..Default::default()
        };

        let first_bond = fee_fingerprint(&acc, &bond, &POLKADOT).unwrap();
        stash(&mut acc, 0);
        let bond_extra = fee_fingerprint(&acc, &bond, &POLKADOT).unwrap();
        assert_ne!(first_bond, bond_extra);

        let no_spans = fee_fingerprint(&acc, &withdraw, &POLKADOT).unwrap();
        stash(&mut acc, 3);
        assert_ne!(no_spans, fee_fingerprint(&acc, &withdraw, &POLKADOT).unwrap());

        let before = fee_fingerprint(&acc, &withdraw, &POLKADOT).unwrap();
        if let Some(FamilyResources::Polkadot(r)) = acc.resources.as_mut() {
            r.nonce = 64;
        }
        assert_ne!(before, fee_fingerprint(&acc, &withdraw, &POLKADOT).unwrap());
    }

    #[test]
    fn test_first_bond_vs_bond_extra() {
        let mut acc = account();
        let draft = PolkadotTransaction {
            mode: PolkadotMode::Bond,
            ..Default::default()
        };
        assert!(matches!(build_call(&acc, &draft, 5).unwrap(), PolkadotCall::Bond { value: 5, .. }));

        stash(&mut acc, 0);
        assert_eq!(build_call(&acc, &draft, 5).unwrap(), PolkadotCall::BondExtra { value: 5 });
    }

    #[test]
    fn test_send_requires_valid_recipient() {
        let draft = PolkadotTransaction {
            recipient: "nope".into(),
            amount: 1,
            ..Default::default()
        };
        assert!(build_call(&account(), &draft, 1).is_err());
    }
}
