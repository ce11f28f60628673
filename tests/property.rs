use chrono::{TimeZone, Utc};
use hawala_core::device::apdu::signing_chunks;
use hawala_core::device::{ChunkTag, CHUNK_SIZE};
use hawala_core::families::polkadot::Ss58Address;
use hawala_core::sync::{compare_operations, merge_operations, next_nonce};
use hawala_core::{DerivationPath, Operation, OperationExtra, OperationType};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;

fn any_operation() -> impl Strategy<Value = Operation> {
    (0u8..24, prop::option::of(0u64..50), 0i64..1_000, prop::option::of(0u64..40), any::<u64>()).prop_map(
        |(id, height, secs, seq, value)| Operation {
            id: format!("op-{}", id),
            hash: format!("0x{:02x}", id),
            account_id: "acc".to_string(),
            op_type: OperationType::Out,
            value: value as u128,
            fee: 1,
            senders: vec![],
            recipients: vec![],
            block_height: height,
            block_hash: None,
            date: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            transaction_sequence_number: seq,
            has_failed: false,
            extra: OperationExtra::None,
        },
    )
}

/// Unique by id, as an account's history always is
fn history() -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(any_operation(), 0..20).prop_map(|ops| merge_operations(&[], ops))
}

proptest! {
    #[test]
    fn merge_is_idempotent(existing in history(), fetched in prop::collection::vec(any_operation(), 0..20)) {
        let once = merge_operations(&existing, fetched.clone());
        let twice = merge_operations(&once, fetched);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merged_history_is_unique_and_ordered(existing in history(), fetched in prop::collection::vec(any_operation(), 0..20)) {
        let merged = merge_operations(&existing, fetched.clone());

        let ids: HashSet<&str> = merged.iter().map(|op| op.id.as_str()).collect();
        prop_assert_eq!(ids.len(), merged.len());
        for pair in merged.windows(2) {
            prop_assert_ne!(compare_operations(&pair[0], &pair[1]), Ordering::Greater);
        }
        for op in existing.iter().chain(fetched.iter()) {
            prop_assert!(ids.contains(op.id.as_str()));
        }
    }

    #[test]
    fn next_nonce_never_reuses_a_sequence(confirmed in 0u64..50, pending in prop::collection::vec(any_operation(), 0..8)) {
        let nonce = next_nonce(confirmed, &pending);
        prop_assert!(nonce >= confirmed);
        for op in &pending {
            if let Some(seq) = op.transaction_sequence_number {
                prop_assert!(nonce > seq);
            }
        }
    }

    #[test]
    fn chunks_reassemble_the_message(message in prop::collection::vec(any::<u8>(), 1..1_200), account in 0u32..100) {
        let chunks = signing_chunks(&DerivationPath::polkadot(account, 0), &message).unwrap();

        prop_assert_eq!(chunks[0].tag, ChunkTag::Init);
        prop_assert_eq!(chunks.last().map(|c| c.tag), Some(ChunkTag::Last));
        prop_assert_eq!(chunks.len(), 1 + message.len().div_ceil(CHUNK_SIZE));
        for chunk in &chunks[1..chunks.len() - 1] {
            prop_assert_eq!(chunk.tag, ChunkTag::Add);
        }

        let rebuilt: Vec<u8> = chunks[1..].iter().flat_map(|c| c.payload.clone()).collect();
        prop_assert!(chunks[1..].iter().all(|c| c.payload.len() <= CHUNK_SIZE));
        prop_assert_eq!(rebuilt, message);
    }

    #[test]
    fn ss58_rejects_tampered_checksums(key in prop::array::uniform32(any::<u8>()), flip in 1usize..3, bit in 0u8..8) {
        let address = Ss58Address::new(key, 0).to_ss58();
        prop_assert_eq!(Ss58Address::parse(&address).unwrap().public_key, key);

        let mut raw = bs58::decode(&address).into_vec().unwrap();
        let at = raw.len() - flip;
        raw[at] ^= 1 << bit;
        let tampered = bs58::encode(raw).into_string();
        prop_assert!(Ss58Address::parse(&tampered).is_err());
    }
}
