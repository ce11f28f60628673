//! Signing Task
//!
//! Runs one signing attempt on its own task and streams progress to a
//! single consumer. The stream ends after exactly one terminal item:
//! `Ok(SignEvent::Signed(..))` or an `Err` carrying the device error code.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{AccountBridge, SignEvent};
use crate::device::{CancelToken, DeviceManager};
use crate::error::{DeviceError, HawalaError, HawalaResult};
use crate::types::{Account, SignedOperation};

/// Channel the bridge reports intermediate progress on
pub type ProgressSender = mpsc::UnboundedSender<HawalaResult<SignEvent>>;

pub struct SigningTask {
    events: mpsc::UnboundedReceiver<HawalaResult<SignEvent>>,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

impl SigningTask {
    /// Start signing `transaction` for `account` on `device_id`
    pub fn spawn<B>(
        bridge: Arc<B>,
        devices: Arc<DeviceManager>,
        device_id: impl Into<String>,
        account: Account,
        transaction: B::Transaction,
    ) -> Self
    where
        B: AccountBridge + 'static,
    {
        let (sender, events) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        let device_id = device_id.into();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(HawalaError::from(DeviceError::Cancelled)),
                    r = sign_on_device(bridge.as_ref(), &devices, &device_id, &account, &transaction, &cancel, &sender) => r,
                };

                if let Err(e) = &result {
                    crate::log_warn!("bridge", "Signing failed", account = account.id, error = e);
                }
                // Nobody listening is fine: the consumer gave up
                let _ = sender.send(result.map(SignEvent::Signed));
            })
        };

        Self {
            events,
            cancel,
            handle,
        }
    }

    /// Stop before the next device exchange; the stream then ends with
    /// a cancellation error
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next progress item, `None` once the stream is over
    pub async fn next(&mut self) -> Option<HawalaResult<SignEvent>> {
        self.events.recv().await
    }

    /// Drain the stream and return the signed operation
    pub async fn finish(&mut self) -> HawalaResult<SignedOperation> {
        while let Some(event) = self.next().await {
            if let SignEvent::Signed(signed) = event? {
                return Ok(signed);
            }
        }
        Err(HawalaError::internal("Signing task ended without a result"))
    }
}

impl Drop for SigningTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn sign_on_device<B: AccountBridge>(
    bridge: &B,
    devices: &DeviceManager,
    device_id: &str,
    account: &Account,
    transaction: &B::Transaction,
    cancel: &CancelToken,
    progress: &ProgressSender,
) -> HawalaResult<SignedOperation> {
    let unsigned = bridge.build_unsigned(account, transaction).await?;
    cancel.check()?;

    let mut session = devices.acquire(device_id).await?;
    bridge
        .sign_operation(account, transaction, unsigned, &mut session, cancel, progress)
        .await
}
