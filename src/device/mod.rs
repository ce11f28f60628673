//! Device Module
//!
//! Chunked command/response protocol for the hardware signer:
//! APDU framing, status-word mapping, exclusive transport sessions,
//! and the sign / get-address commands.

pub mod apdu;
pub mod commands;
pub mod status;
pub mod transport;

pub use apdu::{ApduCommand, ApduResponse, Chunk, ChunkTag, CHUNK_SIZE};
pub use commands::{get_address, sign, AppCommands, DeviceAddress, POLKADOT_APP};
pub use status::{check_status, CommandKind, SW_OK};
pub use transport::{CancelToken, DeviceManager, DeviceSession, Transport, TransportOpener};
