//! The persisted license record.
//!
//! Stored as JSON. Byte fields are base64 strings. The integrity tag is
//! computed over the record serialized *without* its `signature` field, see
//! [`LicenseRecord::canonical_bytes`].

use serde::{Deserialize, Serialize};

use crate::errors::LicenseResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Encrypted activation key.
    pub serial: String,
    pub product_id: u8,
    pub major_version: u8,
    /// SHA-256 of the machine id at activation time.
    #[serde(with = "base64_bytes")]
    pub machine_hash: Vec<u8>,
    /// Local integrity tag. Empty while the record is being signed.
    #[serde(
        default,
        with = "base64_bytes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub signature: Vec<u8>,
}

impl LicenseRecord {
    /// The bytes covered by the integrity tag: this record as JSON with the
    /// signature field left out.
    pub fn canonical_bytes(&self) -> LicenseResult<Vec<u8>> {
        let unsigned = LicenseRecord {
            signature: Vec::new(),
            ..self.clone()
        };
        Ok(serde_json::to_vec(&unsigned)?)
    }

    pub fn to_json(&self) -> LicenseResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> LicenseResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as B64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&B64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        B64.decode(encoded).map_err(serde::de::Error::custom)
    }
}
