//! Hawala Core Library
//!
//! Chain-agnostic wallet core behind the Hawala multi-chain wallet.
//!
//! # Architecture
//!
//! This crate provides:
//! - **device**: Chunked APDU protocol to the hardware signer
//! - **bridge**: Per-family transaction lifecycle (create → sign → broadcast)
//! - **sync**: Incremental, idempotent account synchronization
//! - **preload**: Chain-wide snapshot cache with change notifications
//! - **families**: Family implementations (Polkadot)
//! - **utils**: Fingerprint cache and structured logging
//!
//! # Example
//!
//! ```rust,ignore
//! use hawala_core::bridge::{AccountBridge, SigningTask};
//!
//! let draft = bridge.create_transaction();
//! let draft = bridge.update_transaction(&draft, patch);
//! let draft = bridge.prepare_transaction(&account, &draft).await?;
//! let status = bridge.get_transaction_status(&account, &draft).await?;
//! if status.is_valid() {
//!     let mut task = SigningTask::spawn(bridge.clone(), devices, "nano-x", account.clone(), draft);
//!     let signed = task.finish().await?;
//!     let operation = bridge.broadcast(&account, &signed).await?;
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod device;
pub mod error;
pub mod families;
pub mod preload;
pub mod serde_utils;
pub mod sync;
pub mod types;
pub mod utils;

// Re-export key types for convenience
pub use bridge::{AccountBridge, SignEvent, SigningTask, TransactionStatus};
pub use config::CoreConfig;
pub use error::{DeviceError, ErrorCode, HawalaError, HawalaResult};
pub use preload::{PreloadCache, PreloadSnapshot, PreloadSource};
pub use sync::{synchronize_account, AccountShapeSource, SyncFailure};
pub use types::*;
pub use utils::FingerprintCache;
