//! Device Status Words
//!
//! Fixed lookup from 16-bit status words to the device error taxonomy.

use crate::error::DeviceError;

/// Success / continue
pub const SW_OK: u16 = 0x9000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Refused,
    WrongLength,
    Busy,
    Locked,
    AppNotOpen,
    InvalidData,
}

const STATUS_TABLE: &[(u16, StatusKind)] = &[
    (0x6985, StatusKind::Refused),
    (0x6986, StatusKind::Refused),
    (0x6700, StatusKind::WrongLength),
    (0x9001, StatusKind::Busy),
    (0x5515, StatusKind::Locked),
    (0x6D00, StatusKind::AppNotOpen),
    (0x6E00, StatusKind::AppNotOpen),
    (0x6E01, StatusKind::AppNotOpen),
    (0x6984, StatusKind::InvalidData),
    (0x6A80, StatusKind::InvalidData),
];

/// Which command produced the status word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Sign,
    GetAddress { require_confirmation: bool },
}

/// Map a status word to `Ok` or a typed device error
pub fn check_status(status: u16, command: CommandKind) -> Result<(), DeviceError> {
    if status == SW_OK {
        return Ok(());
    }

    let kind = STATUS_TABLE
        .iter()
        .find(|(sw, _)| *sw == status)
        .map(|(_, kind)| *kind);

    Err(match kind {
        Some(StatusKind::Refused) => match command {
            CommandKind::GetAddress {
                require_confirmation: true,
            } => DeviceError::UserRefusedAddress,
            _ => DeviceError::UserRefused,
        },
        Some(StatusKind::WrongLength) => DeviceError::WrongLength,
        Some(StatusKind::Busy) => DeviceError::DeviceBusy,
        Some(StatusKind::Locked) => DeviceError::DeviceLocked,
        Some(StatusKind::AppNotOpen) => DeviceError::AppNotOpen,
        Some(StatusKind::InvalidData) => DeviceError::InvalidData,
        None => DeviceError::UnknownDeviceError(status),
    })
}
