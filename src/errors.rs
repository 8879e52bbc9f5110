//! Error types shared across Warden.
//!
//! Activation-key validation never produces errors; it returns a
//! [`ValidationCode`]. `LicenseError` covers the operational failures of
//! configuration, encryption and license-file storage.

use thiserror::Error;

use crate::activation::ValidationCode;

#[derive(Debug, Error)]
pub enum LicenseError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Reading or writing the license file failed.
    #[error("storage error: {0}")]
    StorageError(#[from] std::io::Error),

    /// The license record could not be (de)serialized.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// The activation key handed to `save` did not validate.
    #[error("activation key rejected: {0}")]
    ActivationRejected(ValidationCode),

    #[error("invalid license: {0}")]
    InvalidLicense(String),
}

pub type LicenseResult<T> = Result<T, LicenseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_into_storage_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LicenseError = io.into();
        assert!(matches!(err, LicenseError::StorageError(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn rejected_key_names_the_reason() {
        let err = LicenseError::ActivationRejected(ValidationCode::WrongProduct);
        assert_eq!(
            err.to_string(),
            "activation key rejected: key was issued for a different product"
        );
    }
}
