//! Device Transport and Sessions
//!
//! A hardware signer exposes one channel at a time. [`DeviceManager`]
//! serializes every session process-wide; a [`DeviceSession`] owns the open
//! transport until it is dropped, which closes the transport on every exit
//! path including a cancelled future.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};

use super::apdu::{ApduCommand, ApduResponse};
use crate::error::DeviceError;

/// Byte-level request/response channel to the device
#[async_trait]
pub trait Transport: Send {
    /// One raw APDU exchange
    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, DeviceError>;
}

/// Opens and closes transports by device id
#[async_trait]
pub trait TransportOpener: Send + Sync {
    async fn open(&self, device_id: &str) -> Result<Box<dyn Transport>, DeviceError>;

    fn close(&self, transport: Box<dyn Transport>);
}

/// Process-wide gate in front of the device
pub struct DeviceManager {
    opener: Arc<dyn TransportOpener>,
    gate: Arc<Mutex<()>>,
}

impl DeviceManager {
    pub fn new(opener: Arc<dyn TransportOpener>) -> Self {
        Self {
            opener,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Wait for exclusive access and open the transport
    pub async fn acquire(&self, device_id: &str) -> Result<DeviceSession, DeviceError> {
        let guard = self.gate.clone().lock_owned().await;
        let transport = self.opener.open(device_id).await?;
        crate::log_debug!("device", "Session opened", device = device_id);

        Ok(DeviceSession {
            device_id: device_id.to_string(),
            transport: Some(transport),
            opener: self.opener.clone(),
            _guard: guard,
        })
    }

    /// Whether a session currently holds the device
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }
}

/// Exclusive, scoped ownership of an open transport
pub struct DeviceSession {
    device_id: String,
    transport: Option<Box<dyn Transport>>,
    opener: Arc<dyn TransportOpener>,
    _guard: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("device_id", &self.device_id)
            .finish()
    }
}

impl DeviceSession {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Send one command and parse the framed response
    pub async fn exchange(&mut self, command: &ApduCommand) -> Result<ApduResponse, DeviceError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| DeviceError::TransportFailure("session closed".to_string()))?;

        let raw = transport.exchange(&command.encode()?).await?;
        let response = ApduResponse::parse(&raw)?;
        crate::log_debug!(
            "device",
            "APDU exchange",
            ins = command.ins,
            p1 = command.p1,
            data_len = command.data.len(),
            status = format!("0x{:04x}", response.status),
        );
        Ok(response)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Some(transport) = self.transport.take() {
            self.opener.close(transport);
            crate::log_debug!("device", "Session closed", device = self.device_id);
        }
    }
}

/// Cooperative cancellation shared between a signing task and its owner
#[derive(Clone, Debug)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Fail with [`DeviceError::Cancelled`] once cancelled
    pub fn check(&self) -> Result<(), DeviceError> {
        if self.is_cancelled() {
            Err(DeviceError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolve when cancellation is requested
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // Sender lives in self, so the channel cannot close under us
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, DeviceError> {
            let mut response = request.to_vec();
            response.extend_from_slice(&[0x90, 0x00]);
            Ok(response)
        }
    }

    #[derive(Default)]
    struct CountingOpener {
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    #[async_trait]
    impl TransportOpener for CountingOpener {
        async fn open(&self, _device_id: &str) -> Result<Box<dyn Transport>, DeviceError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(EchoTransport))
        }

        fn close(&self, _transport: Box<dyn Transport>) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_session_closes_on_drop() {
        let opener = Arc::new(CountingOpener::default());
        let manager = DeviceManager::new(opener.clone());

        {
            let mut session = manager.acquire("nano-1").await.unwrap();
            assert!(manager.is_busy());
            let cmd = ApduCommand { cla: 0x90, ins: 0, p1: 0, p2: 0, data: vec![] };
            let resp = session.exchange(&cmd).await.unwrap();
            assert_eq!(resp.status, 0x9000);
        }

        assert!(!manager.is_busy());
        assert_eq!(opener.opened.load(Ordering::SeqCst), 1);
        assert_eq!(opener.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_exclusive() {
        let manager = Arc::new(DeviceManager::new(Arc::new(CountingOpener::default())));
        let first = manager.acquire("nano-1").await.unwrap();

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.acquire("nano-1").await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());

        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        token.cancel();
        waiter.await.unwrap();
        assert_eq!(token.check(), Err(DeviceError::Cancelled));
    }
}
