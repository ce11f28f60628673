//! Polkadot Transaction Validation
//!
//! Pure status computation. Network lookups (recipient existence, preload
//! data) are resolved by the bridge beforehand and passed in.

use super::address::is_valid_address;
use super::currency::PolkadotCurrency;
use super::extrinsic::RewardDestination;
use super::preload::PolkadotPreloadData;
use super::transaction::{PolkadotMode, PolkadotTransaction};
use super::PolkadotResources;
use crate::bridge::{StatusField, TransactionError, TransactionStatus, TransactionWarning};
use crate::types::Account;

/// Chain state a status computation depends on
pub struct StatusContext<'a> {
    pub currency: &'a PolkadotCurrency,
    pub preload: &'a PolkadotPreloadData,
    /// Whether a `Send` recipient holds no balance yet
    pub recipient_is_new: bool,
}

/// Amount the draft actually moves
pub fn resolved_amount(account: &Account, transaction: &PolkadotTransaction) -> u128 {
    let resources = account.polkadot_resources().cloned().unwrap_or_default();
    let fees = transaction.fees.unwrap_or(0);

    match transaction.mode {
        PolkadotMode::Send | PolkadotMode::Bond if transaction.use_all_amount => {
            account.spendable_balance.saturating_sub(fees)
        }
        PolkadotMode::Unbond if transaction.use_all_amount => resources.active_bonded(),
        PolkadotMode::Rebond if transaction.use_all_amount => resources.unlocking_balance,
        mode if mode.takes_amount() => transaction.amount,
        _ => 0,
    }
}

/// Recipient problem, if any, of a transfer from `sender`
pub fn recipient_error(recipient: &str, sender: &str, prefix: u16) -> Option<TransactionError> {
    if recipient.is_empty() {
        Some(TransactionError::RecipientRequired)
    } else if recipient == sender {
        Some(TransactionError::InvalidAddressBecauseDestinationIsAlsoSource)
    } else if !is_valid_address(recipient, prefix) {
        Some(TransactionError::InvalidAddress(recipient.to_string()))
    } else {
        None
    }
}

pub fn transaction_status(account: &Account, transaction: &PolkadotTransaction, ctx: &StatusContext<'_>) -> TransactionStatus {
    let resources = account.polkadot_resources().cloned().unwrap_or_default();
    let address = account.fresh_address.as_str();
    let mode = transaction.mode;
    let fees = transaction.fees;
    let amount = resolved_amount(account, transaction);

    let mut status = TransactionStatus {
        estimated_fees: fees.unwrap_or(0),
        amount,
        total_spent: match mode {
            PolkadotMode::Send | PolkadotMode::Bond => amount.saturating_add(fees.unwrap_or(0)),
            _ => fees.unwrap_or(0),
        },
        ..Default::default()
    };

    if mode.blocked_by_election() && !ctx.preload.staking_progress.election_closed {
        status.error(StatusField::Staking, TransactionError::ElectionOpen);
    }

    if mode.takes_amount() && amount == 0 && !transaction.use_all_amount {
        status.error(StatusField::Amount, TransactionError::AmountRequired);
    }

    match mode {
        PolkadotMode::Send => check_send(&mut status, account, transaction, ctx),
        PolkadotMode::Bond => check_bond(&mut status, &resources, account, transaction, ctx),
        PolkadotMode::Unbond => {
            require_controller(&mut status, &resources, address);
            if amount > resources.active_bonded() {
                status.error(StatusField::Amount, TransactionError::NotEnoughBonded);
            }
            if resources.unlockings.len() >= ctx.currency.max_unlockings {
                status.error(StatusField::Amount, TransactionError::MaxUnbonding { max: ctx.currency.max_unlockings });
            }
        }
        PolkadotMode::Rebond => {
            require_controller(&mut status, &resources, address);
            if amount > resources.unlocking_balance {
                status.error(StatusField::Amount, TransactionError::NotEnoughUnlocking);
            }
        }
        PolkadotMode::WithdrawUnbonded => {
            require_controller(&mut status, &resources, address);
            if resources.unlocked_balance == 0 {
                status.error(StatusField::Amount, TransactionError::NoUnlockedBalance);
            }
        }
        PolkadotMode::Nominate => {
            require_controller(&mut status, &resources, address);
            check_validators(&mut status, transaction, ctx);
        }
        PolkadotMode::Chill => {
            require_controller(&mut status, &resources, address);
            if !resources.has_nominations() {
                status.error(StatusField::Staking, TransactionError::NoNominations);
            }
        }
        PolkadotMode::SetController => {
            if !resources.is_stash(address) {
                status.error(StatusField::Staking, TransactionError::UnauthorizedOperation);
            }
        }
        PolkadotMode::ClaimReward => {
            match transaction.validators.first() {
                None => status.error(StatusField::Validators, TransactionError::ValidatorsRequired),
                Some(v) if !ctx.preload.is_validator(v) => {
                    status.error(StatusField::Validators, TransactionError::NotValidator(v.clone()))
                }
                Some(_) => {}
            }
            if transaction.era.is_none() {
                status.error(StatusField::Era, TransactionError::EraRequired);
            }
        }
    }

    match fees {
        None => status.error(StatusField::Fees, TransactionError::FeeNotLoaded),
        Some(f) if f > account.spendable_balance => {
            let field = if mode.takes_amount() { StatusField::Amount } else { StatusField::Fees };
            status.error(field, TransactionError::NotEnoughBalance);
        }
        Some(_) => {}
    }

    status
}

fn check_send(status: &mut TransactionStatus, account: &Account, transaction: &PolkadotTransaction, ctx: &StatusContext<'_>) {
    if let Some(err) = recipient_error(&transaction.recipient, &account.fresh_address, ctx.currency.ss58_prefix) {
        status.error(StatusField::Recipient, err);
        return;
    }

    let Some(fees) = transaction.fees else {
        return;
    };
    let spendable = account.spendable_balance;
    let ed = ctx.currency.existential_deposit;

    if status.total_spent > spendable || (transaction.use_all_amount && spendable <= fees) {
        status.error(StatusField::Amount, TransactionError::NotEnoughBalance);
    } else if ctx.recipient_is_new && status.amount < ed {
        status.error(
            StatusField::Amount,
            TransactionError::NotEnoughBalanceBecauseDestinationNotCreated { minimum: ed },
        );
    } else if !transaction.use_all_amount {
        let remainder = spendable - status.total_spent;
        if remainder > 0 && remainder < ed {
            status.error(StatusField::Amount, TransactionError::DoMaxSendInstead);
        }
    }

    if status.amount > 0 && fees.saturating_mul(10) > status.amount {
        status.warn(StatusField::Fees, TransactionWarning::FeeTooHigh);
    }
}

fn check_bond(
    status: &mut TransactionStatus,
    resources: &PolkadotResources,
    account: &Account,
    transaction: &PolkadotTransaction,
    ctx: &StatusContext<'_>,
) {
    if !resources.is_stash(&account.fresh_address) && status.amount < ctx.currency.minimum_bond {
        status.error(
            StatusField::Amount,
            TransactionError::BondMinimumAmount { minimum: ctx.currency.minimum_bond },
        );
    }

    if transaction.fees.is_some() && status.total_spent > account.spendable_balance {
        status.error(StatusField::Amount, TransactionError::NotEnoughBalance);
    }

    if let Some(RewardDestination::Account(payee)) = &transaction.reward_destination {
        if !is_valid_address(payee, ctx.currency.ss58_prefix) {
            status.error(StatusField::Recipient, TransactionError::InvalidAddress(payee.clone()));
        }
    }
}

fn require_controller(status: &mut TransactionStatus, resources: &PolkadotResources, address: &str) {
    if !resources.is_controller(address) {
        status.error(StatusField::Staking, TransactionError::UnauthorizedOperation);
    }
}

fn check_validators(status: &mut TransactionStatus, transaction: &PolkadotTransaction, ctx: &StatusContext<'_>) {
    let validators = &transaction.validators;
    if validators.is_empty() {
        status.error(StatusField::Validators, TransactionError::ValidatorsRequired);
    } else if validators.len() > ctx.currency.max_nominations {
        status.error(
            StatusField::Validators,
            TransactionError::TooManyValidators { max: ctx.currency.max_nominations },
        );
    } else if let Some(unknown) = validators.iter().find(|v| !ctx.preload.is_validator(v)) {
        status.error(StatusField::Validators, TransactionError::NotValidator(unknown.clone()));
    }
}
