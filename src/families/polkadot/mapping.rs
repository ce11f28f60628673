//! Indexer Record Mapping
//!
//! Turns raw extrinsics, rewards and slashes into operations. Fees are only
//! charged to the signer; a failed extrinsic still costs its fee.

use super::api::{RawExtrinsic, RawRecord, RawStakingEvent};
use super::PolkadotOperationExtra;
use crate::types::{encode_operation_id, Operation, OperationExtra, OperationType};

/// Operation type of an extrinsic, from the account's point of view
pub fn extrinsic_operation_type(extrinsic: &RawExtrinsic, address: &str) -> OperationType {
    let is_signer = extrinsic.signer == address;
    match (extrinsic.pallet.as_str(), extrinsic.method.as_str()) {
        ("balances", m) if m.starts_with("transfer") => {
            if is_signer {
                OperationType::Out
            } else if extrinsic.recipient.as_deref() == Some(address) {
                OperationType::In
            } else {
                OperationType::None
            }
        }
        ("staking", "bond") | ("staking", "bondExtra") => OperationType::Bond,
        ("staking", "unbond") => OperationType::Unbond,
        ("staking", "rebond") => OperationType::Rebond,
        ("staking", "withdrawUnbonded") => OperationType::WithdrawUnbonded,
        ("staking", "nominate") => OperationType::Nominate,
        ("staking", "chill") => OperationType::Chill,
        ("staking", "setController") => OperationType::SetController,
        _ if is_signer => OperationType::Fees,
        _ => OperationType::None,
    }
}

fn map_extrinsic(account_id: &str, address: &str, extrinsic: RawExtrinsic) -> Operation {
    let op_type = extrinsic_operation_type(&extrinsic, address);
    let is_signer = extrinsic.signer == address;
    let fee = if is_signer { extrinsic.fee } else { 0 };

    let value = match op_type {
        _ if !extrinsic.success => fee,
        OperationType::In => extrinsic.value,
        OperationType::Out => extrinsic.value + fee,
        _ => fee,
    };

    let recipients = match &extrinsic.recipient {
        Some(r) => vec![r.clone()],
        None => Vec::new(),
    };

    Operation {
        id: encode_operation_id(account_id, &extrinsic.hash, op_type),
        hash: extrinsic.hash,
        account_id: account_id.to_string(),
        op_type,
        value,
        fee,
        senders: vec![extrinsic.signer],
        recipients,
        block_height: Some(extrinsic.block_height),
        block_hash: extrinsic.block_hash,
        date: extrinsic.timestamp,
        transaction_sequence_number: if is_signer { extrinsic.nonce } else { None },
        has_failed: !extrinsic.success,
        extra: OperationExtra::Polkadot(PolkadotOperationExtra {
            pallet_method: Some(format!("{}.{}", extrinsic.pallet, extrinsic.method)),
            amount: extrinsic.value,
            validators: extrinsic.validators,
            validator_stash: None,
            era: extrinsic.era,
        }),
    }
}

fn map_staking_event(account_id: &str, address: &str, event: RawStakingEvent, op_type: OperationType) -> Operation {
    let (senders, recipients) = match op_type {
        OperationType::Slash => (vec![address.to_string()], Vec::new()),
        _ => (event.validator_stash.iter().cloned().collect(), vec![address.to_string()]),
    };

    Operation {
        id: encode_operation_id(account_id, &event.hash, op_type),
        hash: event.hash,
        account_id: account_id.to_string(),
        op_type,
        value: event.value,
        fee: 0,
        senders,
        recipients,
        block_height: Some(event.block_height),
        block_hash: None,
        date: event.timestamp,
        transaction_sequence_number: None,
        has_failed: false,
        extra: OperationExtra::Polkadot(PolkadotOperationExtra {
            pallet_method: None,
            amount: event.value,
            validators: Vec::new(),
            validator_stash: event.validator_stash,
            era: event.era,
        }),
    }
}

/// Map one raw record into an operation of `account_id`
pub fn map_record(account_id: &str, address: &str, record: RawRecord) -> Operation {
    match record {
        RawRecord::Extrinsic(e) => map_extrinsic(account_id, address, e),
        RawRecord::Reward(r) => map_staking_event(account_id, address, r, OperationType::Reward),
        RawRecord::Slash(s) => map_staking_event(account_id, address, s, OperationType::Slash),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const ME: &str = "me";

    fn extrinsic(signer: &str, pallet: &str, method: &str, success: bool) -> RawExtrinsic {
        RawExtrinsic {
            hash: "0xabc".into(),
            block_height: 100,
            block_hash: Some("0xblock".into()),
            timestamp: Utc::now(),
            signer: signer.into(),
            pallet: pallet.into(),
            method: method.into(),
            nonce: Some(4),
            fee: 150,
            success,
            recipient: Some("them".into()),
            value: 1_000,
            validators: Vec::new(),
            era: None,
        }
    }

    #[test]
    fn test_outgoing_transfer_includes_fee() {
        let op = map_record("acc", ME, RawRecord::Extrinsic(extrinsic(ME, "balances", "transferKeepAlive", true)));
        assert_eq!(op.op_type, OperationType::Out);
        assert_eq!(op.value, 1_150);
        assert_eq!(op.fee, 150);
        assert_eq!(op.transaction_sequence_number, Some(4));
        assert_eq!(op.id, "acc-0xabc-OUT");
    }

    #[test]
    fn test_incoming_transfer_has_no_fee() {
        let mut raw = extrinsic("them", "balances", "transferAllowDeath", true);
        raw.recipient = Some(ME.into());
        let op = map_record("acc", ME, RawRecord::Extrinsic(raw));
        assert_eq!(op.op_type, OperationType::In);
        assert_eq!(op.value, 1_000);
        assert_eq!(op.fee, 0);
        assert_eq!(op.transaction_sequence_number, None);
    }

    #[test]
    fn test_failed_extrinsic_costs_fee() {
        let op = map_record("acc", ME, RawRecord::Extrinsic(extrinsic(ME, "balances", "transferKeepAlive", false)));
        assert!(op.has_failed);
        assert_eq!(op.value, 150);
    }

    #[test]
    fn test_staking_types() {
        for (method, expected) in [
            ("bond", OperationType::Bond),
            ("bondExtra", OperationType::Bond),
            ("unbond", OperationType::Unbond),
            ("nominate", OperationType::Nominate),
            ("payoutStakers", OperationType::Fees),
        ] {
            let op = map_record("acc", ME, RawRecord::Extrinsic(extrinsic(ME, "staking", method, true)));
            assert_eq!(op.op_type, expected, "{}", method);
            assert_eq!(op.value, 150);
        }
    }

    #[test]
    fn test_reward_mapping() {
        let reward = RawStakingEvent {
            hash: "0xr".into(),
            block_height: 7,
            timestamp: Utc::now(),
            value: 77,
            validator_stash: Some("val".into()),
            era: Some(900),
        };
        let op = map_record("acc", ME, RawRecord::Reward(reward));
        assert_eq!(op.op_type, OperationType::Reward);
        assert_eq!(op.value, 77);
        assert_eq!(op.senders, vec!["val".to_string()]);
        assert_eq!(op.recipients, vec![ME.to_string()]);
    }
}
