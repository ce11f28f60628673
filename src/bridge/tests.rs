//! Bridge module tests

use super::*;
use crate::device::{self, ApduCommand, ApduResponse, ChunkTag, DeviceManager, Transport, TransportOpener, POLKADOT_APP};
use crate::error::{DeviceError, ErrorCode};
use crate::types::{DerivationPath, OperationExtra, OperationType};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Signs `message` verbatim and wraps the device signature in an operation
struct EchoBridge {
    message: Vec<u8>,
    devices: Option<Arc<DeviceManager>>,
    busy_while_building: AtomicBool,
}

#[async_trait]
impl AccountBridge for EchoBridge {
    type Transaction = u128;
    type Patch = u128;
    type Unsigned = Vec<u8>;

    fn family(&self) -> Family {
        Family::Polkadot
    }

    fn create_transaction(&self) -> u128 {
        0
    }

    fn update_transaction(&self, _transaction: &u128, patch: u128) -> u128 {
        patch
    }

    async fn prepare_transaction(&self, _account: &Account, transaction: &u128) -> HawalaResult<u128> {
        Ok(*transaction)
    }

    async fn get_transaction_status(&self, _account: &Account, transaction: &u128) -> HawalaResult<TransactionStatus> {
        Ok(TransactionStatus {
            amount: *transaction,
            ..Default::default()
        })
    }

    async fn build_unsigned(&self, _account: &Account, _transaction: &u128) -> HawalaResult<Vec<u8>> {
        if let Some(devices) = &self.devices {
            self.busy_while_building.store(devices.is_busy(), Ordering::SeqCst);
        }
        Ok(self.message.clone())
    }

    async fn sign_operation(
        &self,
        account: &Account,
        transaction: &u128,
        unsigned: Vec<u8>,
        session: &mut DeviceSession,
        cancel: &CancelToken,
        progress: &ProgressSender,
    ) -> HawalaResult<SignedOperation> {
        let _ = progress.send(Ok(SignEvent::DeviceSignatureRequested));
        let signature = device::sign(session, &POLKADOT_APP, &account.derivation_path, &unsigned, cancel).await?;
        let _ = progress.send(Ok(SignEvent::DeviceSignatureGranted));

        Ok(SignedOperation {
            operation: Operation {
                id: format!("{}-0xabc-OUT", account.id),
                hash: "0xabc".to_string(),
                account_id: account.id.clone(),
                op_type: OperationType::Out,
                value: *transaction,
                fee: 0,
                senders: vec![account.fresh_address.clone()],
                recipients: vec![],
                block_height: None,
                block_hash: None,
                date: Utc::now(),
                transaction_sequence_number: Some(0),
                has_failed: false,
                extra: OperationExtra::None,
            },
            signature: hex::encode(signature),
            signed_payload: "0x00".to_string(),
        })
    }

    async fn broadcast(&self, _account: &Account, signed: &SignedOperation) -> HawalaResult<Operation> {
        Ok(signed.operation.clone())
    }

    async fn estimate_max_spendable(&self, account: &Account, _transaction: Option<&u128>) -> HawalaResult<u128> {
        Ok(account.spendable_balance)
    }
}

/// Device that answers every frame with `status_on_last` for the final chunk
/// and can stall forever
struct FakeDevice {
    status_on_last: u16,
    stall: bool,
}

#[async_trait]
impl Transport for FakeDevice {
    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, DeviceError> {
        if self.stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let command = ApduCommand::decode(request)?;
        let response = if command.p1 == ChunkTag::Last as u8 {
            ApduResponse { data: vec![0x5a; 64], status: self.status_on_last }
        } else {
            ApduResponse { data: vec![], status: 0x9000 }
        };
        Ok(response.encode())
    }
}

struct FakeOpener {
    status_on_last: u16,
    stall: bool,
    closed: AtomicUsize,
}

impl FakeOpener {
    fn new(status_on_last: u16, stall: bool) -> Arc<Self> {
        Arc::new(Self {
            status_on_last,
            stall,
            closed: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TransportOpener for FakeOpener {
    async fn open(&self, _device_id: &str) -> Result<Box<dyn Transport>, DeviceError> {
        Ok(Box::new(FakeDevice {
            status_on_last: self.status_on_last,
            stall: self.stall,
        }))
    }

    fn close(&self, _transport: Box<dyn Transport>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn account() -> Account {
    Account::new(Family::Polkadot, "polkadot", "1abc", DerivationPath::polkadot(0, 0))
}

fn bridge() -> Arc<EchoBridge> {
    Arc::new(EchoBridge {
        message: vec![7u8; 300],
        devices: None,
        busy_while_building: AtomicBool::new(false),
    })
}

#[tokio::test]
async fn test_signing_events_in_order() {
    let opener = FakeOpener::new(0x9000, false);
    let devices = Arc::new(DeviceManager::new(opener.clone()));
    let mut task = SigningTask::spawn(bridge(), devices.clone(), "nano", account(), 42);

    assert_eq!(task.next().await.unwrap().unwrap(), SignEvent::DeviceSignatureRequested);
    assert_eq!(task.next().await.unwrap().unwrap(), SignEvent::DeviceSignatureGranted);
    match task.next().await.unwrap().unwrap() {
        SignEvent::Signed(signed) => {
            assert_eq!(signed.operation.value, 42);
            assert_eq!(signed.signature, hex::encode([0x5a; 64]));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(task.next().await.is_none());

    assert!(!devices.is_busy());
    assert_eq!(opener.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refusal_is_terminal_error() {
    let opener = FakeOpener::new(0x6986, false);
    let devices = Arc::new(DeviceManager::new(opener.clone()));
    let mut task = SigningTask::spawn(bridge(), devices, "nano", account(), 1);

    assert_eq!(task.next().await.unwrap().unwrap(), SignEvent::DeviceSignatureRequested);
    let err = task.next().await.unwrap().unwrap_err();
    assert_eq!(err.code, ErrorCode::UserRefused);
    assert_eq!(err.device_error(), Some(DeviceError::UserRefused));
    assert!(task.next().await.is_none());
    assert_eq!(opener.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_finish_returns_signed_operation() {
    let devices = Arc::new(DeviceManager::new(FakeOpener::new(0x9000, false)));
    let mut task = SigningTask::spawn(bridge(), devices, "nano", account(), 5);

    let signed = task.finish().await.unwrap();
    assert_eq!(signed.operation.account_id, account().id);
}

#[tokio::test]
async fn test_cancel_releases_device() {
    let opener = FakeOpener::new(0x9000, true);
    let devices = Arc::new(DeviceManager::new(opener.clone()));
    let mut task = SigningTask::spawn(bridge(), devices.clone(), "nano", account(), 1);

    assert_eq!(task.next().await.unwrap().unwrap(), SignEvent::DeviceSignatureRequested);
    assert!(devices.is_busy());

    task.cancel();
    let err = task.next().await.unwrap().unwrap_err();
    assert_eq!(err.code, ErrorCode::Cancelled);
    assert!(task.next().await.is_none());

    assert!(!devices.is_busy());
    assert_eq!(opener.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_device_is_free_while_building() {
    let devices = Arc::new(DeviceManager::new(FakeOpener::new(0x9000, false)));
    let bridge = Arc::new(EchoBridge {
        message: vec![1u8; 10],
        devices: Some(devices.clone()),
        busy_while_building: AtomicBool::new(true),
    });

    let mut task = SigningTask::spawn(bridge.clone(), devices, "nano", account(), 3);
    task.finish().await.unwrap();
    assert!(!bridge.busy_while_building.load(Ordering::SeqCst));
}

#[test]
fn test_ensure_family() {
    assert!(ensure_family(Family::Polkadot, &account()).is_ok());
}
