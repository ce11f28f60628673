//! Unified error types for Hawala Core
//!
//! Network, device and contract failures flow through [`HawalaError`].
//! Expected validation outcomes never become errors; they are reported
//! per field in a `TransactionStatus` instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all Hawala operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HawalaError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl HawalaError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn broadcast_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BroadcastFailed, msg)
    }

    pub fn family_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FamilyMismatch, msg)
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Whether re-running the failed call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::NetworkError
                | ErrorCode::Timeout
                | ErrorCode::RateLimited
                | ErrorCode::ProviderUnavailable
                | ErrorCode::DeviceBusy
        )
    }

    /// Typed device error, if this error came from the signing device.
    pub fn device_error(&self) -> Option<DeviceError> {
        match self.code {
            ErrorCode::UserRefused => Some(DeviceError::UserRefused),
            ErrorCode::UserRefusedAddress => Some(DeviceError::UserRefusedAddress),
            ErrorCode::WrongLength => Some(DeviceError::WrongLength),
            ErrorCode::DeviceBusy => Some(DeviceError::DeviceBusy),
            ErrorCode::DeviceLocked => Some(DeviceError::DeviceLocked),
            ErrorCode::AppNotOpen => Some(DeviceError::AppNotOpen),
            ErrorCode::InvalidDeviceData => Some(DeviceError::InvalidData),
            ErrorCode::TransportFailure => Some(DeviceError::TransportFailure(self.message.clone())),
            ErrorCode::Cancelled => Some(DeviceError::Cancelled),
            ErrorCode::InvalidDeviceResponse => {
                Some(DeviceError::InvalidResponse(self.message.clone()))
            }
            ErrorCode::UnknownDeviceError => {
                let code = self
                    .details
                    .as_deref()
                    .and_then(|d| d.strip_prefix("0x"))
                    .and_then(|hex| u16::from_str_radix(hex, 16).ok())
                    .unwrap_or(0);
                Some(DeviceError::UnknownDeviceError(code))
            }
            _ => None,
        }
    }
}

impl fmt::Display for HawalaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for HawalaError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    InvalidInput,
    InvalidAddress,
    ConfigError,
    FamilyMismatch,

    // Network errors
    NetworkError,
    RateLimited,
    ProviderUnavailable,
    Timeout,

    // Transaction errors
    BroadcastFailed,

    // Device errors
    UserRefused,
    UserRefusedAddress,
    WrongLength,
    DeviceBusy,
    DeviceLocked,
    AppNotOpen,
    InvalidDeviceData,
    TransportFailure,
    Cancelled,
    InvalidDeviceResponse,
    UnknownDeviceError,

    // Crypto errors
    VerificationFailed,

    // Parse errors
    JsonError,
    HexError,

    // Internal
    Internal,
}

/// Result type alias for Hawala operations
pub type HawalaResult<T> = Result<T, HawalaError>;

/// Errors raised by the hardware signing device or its transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("User refused the operation on the device")]
    UserRefused,

    #[error("User refused to confirm the address on the device")]
    UserRefusedAddress,

    #[error("Device reported a wrong data length")]
    WrongLength,

    #[error("Device is busy")]
    DeviceBusy,

    #[error("Device is locked")]
    DeviceLocked,

    #[error("Expected application is not open on the device")]
    AppNotOpen,

    #[error("Device rejected the data as invalid")]
    InvalidData,

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Device interaction was cancelled")]
    Cancelled,

    #[error("Invalid device response: {0}")]
    InvalidResponse(String),

    #[error("Unknown device error 0x{0:04x}")]
    UnknownDeviceError(u16),
}

impl DeviceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DeviceError::UserRefused => ErrorCode::UserRefused,
            DeviceError::UserRefusedAddress => ErrorCode::UserRefusedAddress,
            DeviceError::WrongLength => ErrorCode::WrongLength,
            DeviceError::DeviceBusy => ErrorCode::DeviceBusy,
            DeviceError::DeviceLocked => ErrorCode::DeviceLocked,
            DeviceError::AppNotOpen => ErrorCode::AppNotOpen,
            DeviceError::InvalidData => ErrorCode::InvalidDeviceData,
            DeviceError::TransportFailure(_) => ErrorCode::TransportFailure,
            DeviceError::Cancelled => ErrorCode::Cancelled,
            DeviceError::InvalidResponse(_) => ErrorCode::InvalidDeviceResponse,
            DeviceError::UnknownDeviceError(_) => ErrorCode::UnknownDeviceError,
        }
    }
}

impl From<DeviceError> for HawalaError {
    fn from(e: DeviceError) -> Self {
        let err = HawalaError::new(e.code(), e.to_string());
        match e {
            DeviceError::UnknownDeviceError(sw) => err.with_details(format!("0x{:04x}", sw)),
            _ => err,
        }
    }
}

// Conversions from common error types

impl From<serde_json::Error> for HawalaError {
    fn from(e: serde_json::Error) -> Self {
        HawalaError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for HawalaError {
    fn from(e: hex::FromHexError) -> Self {
        HawalaError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<std::io::Error> for HawalaError {
    fn from(e: std::io::Error) -> Self {
        HawalaError::new(ErrorCode::Internal, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = HawalaError::broadcast_failed("Extrinsic rejected")
            .with_details("1010: Invalid Transaction");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("broadcast_failed"));
        assert!(json.contains("Extrinsic rejected"));
    }

    #[test]
    fn test_device_error_roundtrip() {
        let errors = [
            DeviceError::UserRefused,
            DeviceError::UserRefusedAddress,
            DeviceError::DeviceBusy,
            DeviceError::UnknownDeviceError(0x6f42),
        ];
        for device_err in errors {
            let err: HawalaError = device_err.clone().into();
            assert_eq!(err.device_error(), Some(device_err));
        }
    }

    #[test]
    fn test_retryable() {
        assert!(HawalaError::network_error("timeout").is_retryable());
        assert!(!HawalaError::from(DeviceError::UserRefused).is_retryable());
    }
}
