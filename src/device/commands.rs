//! Device Commands
//!
//! Signing and address retrieval on top of an exclusive [`DeviceSession`].
//! Nothing here retries: a repeated signing request would show the user a
//! second confirmation prompt, so every non-success is returned as-is.

use super::apdu::{signing_chunks, serialize_path, ApduCommand};
use super::status::{check_status, CommandKind};
use super::transport::{CancelToken, DeviceSession};
use crate::error::DeviceError;
use crate::types::DerivationPath;

/// Instruction set of a device application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppCommands {
    pub cla: u8,
    pub ins_get_address: u8,
    pub ins_sign: u8,
    /// Signature scheme selector sent in P2
    pub scheme: u8,
}

/// Substrate/Polkadot application, ed25519 scheme
pub const POLKADOT_APP: AppCommands = AppCommands {
    cla: 0x90,
    ins_get_address: 0x01,
    ins_sign: 0x02,
    scheme: 0x00,
};

/// Length of an ed25519 public key in address responses
pub const PUBLIC_KEY_LEN: usize = 32;

/// Address reported by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    pub public_key: [u8; PUBLIC_KEY_LEN],
    pub address: String,
}

/// Sign `message` with the key at `path`.
///
/// Sends the path header followed by the message chunks. The cancel token
/// is checked before every frame; the signature is the data of the final
/// response.
pub async fn sign(
    session: &mut DeviceSession,
    app: &AppCommands,
    path: &DerivationPath,
    message: &[u8],
    cancel: &CancelToken,
) -> Result<Vec<u8>, DeviceError> {
    let chunks = signing_chunks(path, message)?;
    let total = chunks.len();
    let mut signature = Vec::new();

    for (i, chunk) in chunks.into_iter().enumerate() {
        cancel.check()?;

        let command = ApduCommand {
            cla: app.cla,
            ins: app.ins_sign,
            p1: chunk.tag as u8,
            p2: app.scheme,
            data: chunk.payload,
        };
        let response = session.exchange(&command).await?;

        if let Err(err) = check_status(response.status, CommandKind::Sign) {
            crate::log_warn!(
                "device",
                "Signing aborted by device",
                chunk = i + 1,
                total = total,
                error = err,
            );
            return Err(err);
        }

        if i + 1 == total {
            signature = response.data;
        }
    }

    if signature.is_empty() {
        return Err(DeviceError::InvalidResponse("empty signature".to_string()));
    }

    crate::log_info!(
        "device",
        "Signature obtained",
        chunks = total,
        signature = hex::encode(&signature),
    );
    Ok(signature)
}

/// Read the public key and address at `path`, optionally asking the user
/// to confirm it on screen.
pub async fn get_address(
    session: &mut DeviceSession,
    app: &AppCommands,
    path: &DerivationPath,
    require_confirmation: bool,
) -> Result<DeviceAddress, DeviceError> {
    let command = ApduCommand {
        cla: app.cla,
        ins: app.ins_get_address,
        p1: u8::from(require_confirmation),
        p2: app.scheme,
        data: serialize_path(path)?,
    };
    let response = session.exchange(&command).await?;
    check_status(response.status, CommandKind::GetAddress { require_confirmation })?;

    if response.data.len() <= PUBLIC_KEY_LEN {
        return Err(DeviceError::InvalidResponse(format!(
            "address response too short: {} bytes",
            response.data.len()
        )));
    }

    let mut public_key = [0u8; PUBLIC_KEY_LEN];
    public_key.copy_from_slice(&response.data[..PUBLIC_KEY_LEN]);
    let address = String::from_utf8(response.data[PUBLIC_KEY_LEN..].to_vec())
        .map_err(|_| DeviceError::InvalidResponse("address is not utf-8".to_string()))?;

    Ok(DeviceAddress {
        public_key,
        address: address.trim_end_matches('\0').to_string(),
    })
}
