//! Saving and re-validating machine-bound license files.
//!
//! ## Security Model
//!
//! A stored license is accepted only if all of the following hold:
//!
//! 1. **Integrity** - the HMAC tag over the record verifies with the internal key
//! 2. **Confidentiality** - the serial decrypts with the storage key
//! 3. **Authenticity** - the decrypted serial passes full activation-key validation
//! 4. **Binding** - the stored machine digest matches the current machine
//!
//! [`LicenseStore::load_and_validate`] reports a single boolean so that a
//! tampered file gives no hint about which check failed. Operators can call
//! [`LicenseStore::diagnose`] or enable `debug` logging to see the reason.

use std::fmt;
use std::path::Path;

use log::debug;

use crate::activation::{ActivationValidator, ValidationCode};
use crate::config::LicenseSettings;
use crate::encryption::{AesGcmSerialCipher, SerialCipher};
use crate::errors::{LicenseError, LicenseResult};
use crate::hardware::{machine_digest, MachineIdentity, PlatformMachineId};
use crate::record::LicenseRecord;
use crate::signer::LocalSigner;
use crate::storage::{read_file, write_file_atomic};

/// Why a stored license was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The file could not be read.
    Unreadable,
    /// The file is not a well-formed license record.
    Malformed,
    /// The integrity tag does not match the record.
    IntegrityMismatch,
    /// The stored serial could not be decrypted.
    UndecryptableSerial,
    /// The decrypted serial is not a valid activation key.
    KeyRejected(ValidationCode),
    /// The license was activated on a different machine.
    MachineMismatch,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Unreadable => write!(f, "license file could not be read"),
            RejectReason::Malformed => write!(f, "license file is malformed"),
            RejectReason::IntegrityMismatch => write!(f, "license integrity check failed"),
            RejectReason::UndecryptableSerial => write!(f, "license serial could not be decrypted"),
            RejectReason::KeyRejected(code) => write!(f, "stored activation key rejected: {code}"),
            RejectReason::MachineMismatch => write!(f, "license is bound to another machine"),
        }
    }
}

/// Writes and re-validates license files for one configured product.
///
/// All collaborators are fixed at construction; the store holds no mutable
/// state, so validation calls are repeatable and may run concurrently.
/// Concurrent `save` calls to the same path must be serialized by the caller.
pub struct LicenseStore {
    validator: ActivationValidator,
    signer: LocalSigner,
    cipher: Box<dyn SerialCipher>,
    machine: Box<dyn MachineIdentity>,
}

impl LicenseStore {
    pub fn new(
        validator: ActivationValidator,
        signer: LocalSigner,
        cipher: Box<dyn SerialCipher>,
        machine: Box<dyn MachineIdentity>,
    ) -> Self {
        Self {
            validator,
            signer,
            cipher,
            machine,
        }
    }

    /// Compose a store from configuration with the platform machine-id
    /// provider and the AES-GCM serial cipher.
    pub fn from_config(settings: &LicenseSettings) -> LicenseResult<Self> {
        Self::from_config_with_machine(settings, Box::new(PlatformMachineId))
    }

    /// Like [`from_config`](Self::from_config) with a caller-supplied
    /// machine identity.
    pub fn from_config_with_machine(
        settings: &LicenseSettings,
        machine: Box<dyn MachineIdentity>,
    ) -> LicenseResult<Self> {
        let validator = ActivationValidator::new(
            settings.product_id,
            settings.major_version,
            settings.public_key_bytes()?,
        );
        let signer = LocalSigner::new(settings.internal_key()?.as_bytes());
        let cipher = AesGcmSerialCipher::from_secret(settings.storage_key()?.as_bytes());

        Ok(Self::new(validator, signer, Box::new(cipher), machine))
    }

    pub fn validator(&self) -> &ActivationValidator {
        &self.validator
    }

    /// Validate an activation key without touching storage.
    pub fn validate(&self, serial: &str) -> ValidationCode {
        self.validator.validate(serial)
    }

    /// Activate: bind `serial` to this machine and write the license file.
    ///
    /// The serial must pass activation-key validation; a key that could
    /// never load again is rejected with
    /// [`LicenseError::ActivationRejected`] and nothing is written.
    pub fn save(&self, path: &Path, serial: &str) -> LicenseResult<()> {
        let key = self
            .validator
            .check(serial)
            .map_err(LicenseError::ActivationRejected)?;

        let machine_hash = machine_digest(&self.machine.machine_id());
        let encrypted_serial = self.cipher.encrypt(serial)?;

        let mut record = LicenseRecord {
            serial: encrypted_serial,
            product_id: key.payload.product_id,
            major_version: key.payload.major_version,
            machine_hash: machine_hash.to_vec(),
            signature: Vec::new(),
        };
        record.signature = self.signer.sign(&record.canonical_bytes()?);

        write_file_atomic(path, &record.to_json()?)?;
        debug!("license saved to {}", path.display());
        Ok(())
    }

    /// `true` iff the license file at `path` is intact, holds a valid
    /// activation key, and belongs to this machine.
    ///
    /// Never fails; every problem reads as "not licensed".
    pub fn load_and_validate(&self, path: &Path) -> bool {
        match self.diagnose(path) {
            Ok(()) => true,
            Err(reason) => {
                debug!("license at {} rejected: {reason}", path.display());
                false
            }
        }
    }

    /// Run the same checks as [`load_and_validate`](Self::load_and_validate)
    /// and report the first failure.
    pub fn diagnose(&self, path: &Path) -> Result<(), RejectReason> {
        let bytes = read_file(path).map_err(|_| RejectReason::Unreadable)?;
        let record = LicenseRecord::from_json(&bytes).map_err(|_| RejectReason::Malformed)?;

        let canonical = record
            .canonical_bytes()
            .map_err(|_| RejectReason::Malformed)?;
        if !self.signer.verify(&canonical, &record.signature) {
            return Err(RejectReason::IntegrityMismatch);
        }

        let serial = self
            .cipher
            .decrypt(&record.serial)
            .map_err(|_| RejectReason::UndecryptableSerial)?;

        match self.validator.validate(&serial) {
            ValidationCode::Ok => {}
            code => return Err(RejectReason::KeyRejected(code)),
        }

        let current = machine_digest(&self.machine.machine_id());
        if record.machine_hash.as_slice() != current.as_slice() {
            return Err(RejectReason::MachineMismatch);
        }

        Ok(())
    }

    /// Read and parse a license file without validating it.
    pub fn read_record(&self, path: &Path) -> LicenseResult<LicenseRecord> {
        LicenseRecord::from_json(&read_file(path)?)
    }
}

impl fmt::Debug for LicenseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseStore")
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}
