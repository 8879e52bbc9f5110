//! Local integrity tags for license records.
//!
//! HMAC-SHA256 keyed with the application's internal key. This only proves
//! that a record was written by something holding that key; the Ed25519
//! signature inside the activation key is what proves the license was issued
//! by the vendor.

use ring::hmac;

/// Length of a tag produced by [`LocalSigner::sign`].
pub const TAG_LEN: usize = 32;

pub struct LocalSigner {
    key: hmac::Key,
}

impl LocalSigner {
    pub fn new(internal_key: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, internal_key),
        }
    }

    /// Deterministic tag over `data`.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        hmac::sign(&self.key, data).as_ref().to_vec()
    }

    /// Constant-time check of `tag` against `data`.
    pub fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        hmac::verify(&self.key, data, tag).is_ok()
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner").finish_non_exhaustive()
    }
}
