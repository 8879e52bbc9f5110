//! Machine identity for license binding.
//!
//! A license record never stores the raw machine identifier, only its
//! SHA-256 digest. When the platform cannot report an identifier the
//! providers return [`UNKNOWN_MACHINE_ID`], and binding degrades to that
//! literal.

use sha2::{Digest, Sha256};

mod linux;
mod macos;
mod windows;

/// Sentinel returned when no machine identifier can be determined.
pub const UNKNOWN_MACHINE_ID: &str = "unknown";

/// Length of [`machine_digest`] output in bytes.
pub const MACHINE_DIGEST_LEN: usize = 32;

/// Supplies a stable identifier for the current device.
pub trait MachineIdentity: Send + Sync {
    fn machine_id(&self) -> String;
}

/// SHA-256 of a machine identifier.
pub fn machine_digest(machine_id: &str) -> [u8; MACHINE_DIGEST_LEN] {
    let mut out = [0u8; MACHINE_DIGEST_LEN];
    out.copy_from_slice(&Sha256::digest(machine_id.as_bytes()));
    out
}

/// The provider for the target OS, chosen at compile time.
///
/// - Linux: `/etc/machine-id` (or `/var/lib/dbus/machine-id`)
/// - macOS: `IOPlatformUUID` from `ioreg`
/// - Windows: `MachineGuid` from the registry
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformMachineId;

impl MachineIdentity for PlatformMachineId {
    fn machine_id(&self) -> String {
        let id = read_platform_machine_id();
        if id.is_none() {
            log::warn!("could not determine machine id, binding to \"{UNKNOWN_MACHINE_ID}\"");
        }
        id.unwrap_or_else(|| UNKNOWN_MACHINE_ID.to_string())
    }
}

#[cfg(target_os = "linux")]
fn read_platform_machine_id() -> Option<String> {
    linux::read_machine_id()
}

#[cfg(target_os = "macos")]
fn read_platform_machine_id() -> Option<String> {
    macos::read_machine_id()
}

#[cfg(target_os = "windows")]
fn read_platform_machine_id() -> Option<String> {
    windows::read_machine_id()
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn read_platform_machine_id() -> Option<String> {
    None
}

/// A fixed identifier. Useful for tests and for hosts that supply their own
/// device identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMachineId(pub String);

impl StaticMachineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl MachineIdentity for StaticMachineId {
    fn machine_id(&self) -> String {
        self.0.clone()
    }
}

impl<T: MachineIdentity + ?Sized> MachineIdentity for Box<T> {
    fn machine_id(&self) -> String {
        (**self).machine_id()
    }
}

/// Returns the identifier of the current machine, or `"unknown"`.
pub fn get_machine_id() -> String {
    PlatformMachineId.machine_id()
}

/// Trim a raw identifier, mapping empty values to `None`.
fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
