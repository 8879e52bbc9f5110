//! Activation key decoding and validation.
//!
//! An activation key is the unpadded standard base64 encoding of a 4-byte
//! payload followed by an Ed25519 signature over that payload:
//!
//! ```text
//! [product_id][major_version][reserved][checksum] ++ signature (64 bytes)
//! ```
//!
//! `checksum` is the XOR of the first three bytes. Hyphens and whitespace in
//! the typed key are cosmetic and stripped before decoding, so
//! `"AB-CD EF..."` and `"ABCDEF..."` are the same key.
//!
//! # Example
//!
//! ```rust,ignore
//! use warden::activation::{ActivationValidator, ValidationCode};
//!
//! let validator = ActivationValidator::new(5, 2, public_key);
//! assert_eq!(validator.validate(&typed_key), ValidationCode::Ok);
//! ```

use std::fmt;

use base64::engine::general_purpose::STANDARD_NO_PAD as B64;
use base64::Engine;
use ring::signature::{Ed25519KeyPair, UnparsedPublicKey, ED25519};

/// Size of the signed payload in bytes.
pub const PAYLOAD_LEN: usize = 4;

/// Ed25519 signature size in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Ed25519 public key size in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Exact decoded length of a well-formed activation key.
pub const ACTIVATION_KEY_LEN: usize = PAYLOAD_LEN + SIGNATURE_LEN;

/// Outcome of validating an activation key.
///
/// Checks run in declaration order (after `Ok`) and the first failing check
/// decides the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    /// Every check passed.
    Ok,
    /// Not unpadded base64, or wrong decoded length.
    InvalidSerial,
    /// Checksum byte does not match the XOR of the first three bytes.
    InvalidChecksum,
    /// Key was issued for another product.
    WrongProduct,
    /// Key was issued for another major version.
    WrongVersionTier,
    /// Signature does not verify against the configured public key.
    InvalidSignature,
}

impl ValidationCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationCode::Ok)
    }

    /// Returns a default human-readable message for this code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ValidationCode::Ok => "activation key is valid",
            ValidationCode::InvalidSerial => "activation key is malformed",
            ValidationCode::InvalidChecksum => "activation key checksum does not match",
            ValidationCode::WrongProduct => "key was issued for a different product",
            ValidationCode::WrongVersionTier => "key is not valid for this major version",
            ValidationCode::InvalidSignature => "activation key signature is invalid",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default_message())
    }
}

/// XOR-fold of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// The 4-byte signed part of an activation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationPayload {
    pub product_id: u8,
    pub major_version: u8,
    pub reserved: u8,
    pub checksum: u8,
}

impl ActivationPayload {
    /// Build a payload with a correct checksum.
    pub fn new(product_id: u8, major_version: u8, reserved: u8) -> Self {
        Self {
            product_id,
            major_version,
            reserved,
            checksum: checksum(&[product_id, major_version, reserved]),
        }
    }

    pub fn from_bytes(bytes: [u8; PAYLOAD_LEN]) -> Self {
        Self {
            product_id: bytes[0],
            major_version: bytes[1],
            reserved: bytes[2],
            checksum: bytes[3],
        }
    }

    pub fn to_bytes(&self) -> [u8; PAYLOAD_LEN] {
        [
            self.product_id,
            self.major_version,
            self.reserved,
            self.checksum,
        ]
    }

    pub fn checksum_valid(&self) -> bool {
        self.checksum == checksum(&[self.product_id, self.major_version, self.reserved])
    }
}

/// A structurally decoded activation key. Nothing has been verified yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationKey {
    pub payload: ActivationPayload,
    pub signature: [u8; SIGNATURE_LEN],
}

impl ActivationKey {
    /// Canonical text form: unpadded base64, no separators.
    pub fn to_canonical(&self) -> String {
        let mut raw = Vec::with_capacity(ACTIVATION_KEY_LEN);
        raw.extend_from_slice(&self.payload.to_bytes());
        raw.extend_from_slice(&self.signature);
        B64.encode(raw)
    }
}

/// Remove the cosmetic separators (`-` and whitespace) from a typed key.
pub fn normalize_key(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// Decode a typed key into payload and signature.
///
/// Fails with [`ValidationCode::InvalidSerial`] when the text is not unpadded
/// standard base64 or does not decode to exactly [`ACTIVATION_KEY_LEN`] bytes.
/// Decoding is strict: a final symbol with non-zero unused bits is not a key
/// the vendor issued and is rejected, so each key has a single text form.
pub fn decode_activation_key(input: &str) -> Result<ActivationKey, ValidationCode> {
    let raw = B64
        .decode(normalize_key(input))
        .map_err(|_| ValidationCode::InvalidSerial)?;

    if raw.len() != ACTIVATION_KEY_LEN {
        return Err(ValidationCode::InvalidSerial);
    }

    let (payload, sig) = raw.split_at(PAYLOAD_LEN);
    let payload: [u8; PAYLOAD_LEN] = payload
        .try_into()
        .map_err(|_| ValidationCode::InvalidSerial)?;
    let signature: [u8; SIGNATURE_LEN] =
        sig.try_into().map_err(|_| ValidationCode::InvalidSerial)?;

    Ok(ActivationKey {
        payload: ActivationPayload::from_bytes(payload),
        signature,
    })
}

/// Sign `payload` with the vendor key pair and return the canonical key text.
///
/// The payload is signed as-is; build it with [`ActivationPayload::new`] to
/// get a correct checksum.
pub fn issue_activation_key(key_pair: &Ed25519KeyPair, payload: ActivationPayload) -> String {
    let sig = key_pair.sign(&payload.to_bytes());
    let mut signature = [0u8; SIGNATURE_LEN];
    signature.copy_from_slice(sig.as_ref());

    ActivationKey { payload, signature }.to_canonical()
}

/// Split a canonical key into hyphen-separated groups for display.
///
/// The grouped form decodes to the same bytes as the input.
pub fn format_grouped(canonical: &str, group: usize) -> String {
    let stripped = normalize_key(canonical);
    if group == 0 {
        return stripped;
    }

    let chars: Vec<char> = stripped.chars().collect();
    chars
        .chunks(group)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

/// Validates activation keys for one product, major version and vendor key.
#[derive(Debug, Clone)]
pub struct ActivationValidator {
    product_id: u8,
    major_version: u8,
    public_key: [u8; PUBLIC_KEY_LEN],
}

impl ActivationValidator {
    pub fn new(product_id: u8, major_version: u8, public_key: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self {
            product_id,
            major_version,
            public_key,
        }
    }

    pub fn product_id(&self) -> u8 {
        self.product_id
    }

    pub fn major_version(&self) -> u8 {
        self.major_version
    }

    /// Run every check on `input` and report the first failure.
    ///
    /// Structural checks come first, then product and version, and the
    /// signature is verified last.
    pub fn validate(&self, input: &str) -> ValidationCode {
        match self.check(input) {
            Ok(_) => ValidationCode::Ok,
            Err(code) => code,
        }
    }

    /// Like [`validate`](Self::validate) but hands back the decoded key on
    /// success.
    pub fn check(&self, input: &str) -> Result<ActivationKey, ValidationCode> {
        let key = decode_activation_key(input)?;
        let payload = &key.payload;

        if !payload.checksum_valid() {
            return Err(ValidationCode::InvalidChecksum);
        }

        if payload.product_id != self.product_id {
            return Err(ValidationCode::WrongProduct);
        }

        if payload.major_version != self.major_version {
            return Err(ValidationCode::WrongVersionTier);
        }

        UnparsedPublicKey::new(&ED25519, &self.public_key)
            .verify(&payload.to_bytes(), &key.signature)
            .map_err(|_| ValidationCode::InvalidSignature)?;

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::rand::SystemRandom;
    use ring::signature::KeyPair;

    fn key_pair() -> Ed25519KeyPair {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).expect("pkcs8 generation");
        Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).expect("pkcs8 parse")
    }

    fn validator_for(pair: &Ed25519KeyPair, product: u8, version: u8) -> ActivationValidator {
        let mut pk = [0u8; PUBLIC_KEY_LEN];
        pk.copy_from_slice(pair.public_key().as_ref());
        ActivationValidator::new(product, version, pk)
    }

    /// Re-encode raw bytes as a key string, bypassing signing.
    fn encode_raw(raw: &[u8]) -> String {
        B64.encode(raw)
    }

    #[test]
    fn checksum_is_xor_of_prefix() {
        for a in [0u8, 1, 5, 0x7f, 0xff] {
            for b in [0u8, 2, 0x55, 0xaa] {
                for c in [0u8, 3, 0x0f, 0xf0] {
                    assert_eq!(checksum(&[a, b, c]), a ^ b ^ c);
                }
            }
        }
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn payload_new_sets_checksum() {
        let payload = ActivationPayload::new(5, 2, 9);
        assert_eq!(payload.checksum, 5 ^ 2 ^ 9);
        assert!(payload.checksum_valid());
        assert_eq!(ActivationPayload::from_bytes(payload.to_bytes()), payload);
    }

    #[test]
    fn issued_key_validates() {
        let pair = key_pair();
        let key = issue_activation_key(&pair, ActivationPayload::new(5, 2, 0));
        let validator = validator_for(&pair, 5, 2);

        assert_eq!(validator.validate(&key), ValidationCode::Ok);
        assert!(!key.contains('='), "key must be unpadded");
    }

    #[test]
    fn grouped_and_spaced_keys_validate_identically() {
        let pair = key_pair();
        let key = issue_activation_key(&pair, ActivationPayload::new(5, 2, 0));
        let validator = validator_for(&pair, 5, 2);

        let grouped = format_grouped(&key, 5);
        assert!(grouped.contains('-'));
        assert_eq!(normalize_key(&grouped), key);
        assert_eq!(validator.validate(&grouped), ValidationCode::Ok);

        let spaced = grouped.replace('-', " ");
        assert_eq!(validator.validate(&spaced), ValidationCode::Ok);

        assert_eq!(
            decode_activation_key(&grouped).unwrap(),
            decode_activation_key(&key).unwrap()
        );
    }

    #[test]
    fn wrong_length_is_invalid_serial() {
        let pair = key_pair();
        let validator = validator_for(&pair, 5, 2);

        for len in [0usize, 1, 4, 67, 69, 128] {
            let input = encode_raw(&vec![0u8; len]);
            assert_eq!(
                validator.validate(&input),
                ValidationCode::InvalidSerial,
                "length {len}"
            );
        }
    }

    #[test]
    fn non_base64_and_padded_input_is_invalid_serial() {
        let pair = key_pair();
        let validator = validator_for(&pair, 5, 2);

        assert_eq!(validator.validate("not a key!"), ValidationCode::InvalidSerial);
        assert_eq!(validator.validate(""), ValidationCode::InvalidSerial);

        let key = issue_activation_key(&pair, ActivationPayload::new(5, 2, 0));
        let padded = format!("{key}=");
        assert_eq!(validator.validate(&padded), ValidationCode::InvalidSerial);
    }

    #[test]
    fn bad_checksum_is_reported_before_product() {
        let pair = key_pair();
        let validator = validator_for(&pair, 5, 2);

        // Wrong product and wrong checksum: checksum wins.
        let payload = ActivationPayload {
            product_id: 9,
            major_version: 2,
            reserved: 0,
            checksum: 0,
        };
        let key = issue_activation_key(&pair, payload);
        assert_eq!(validator.validate(&key), ValidationCode::InvalidChecksum);
    }

    #[test]
    fn product_then_version_gate() {
        let pair = key_pair();
        let validator = validator_for(&pair, 5, 2);

        let other_product = issue_activation_key(&pair, ActivationPayload::new(6, 3, 0));
        assert_eq!(validator.validate(&other_product), ValidationCode::WrongProduct);

        let other_version = issue_activation_key(&pair, ActivationPayload::new(5, 3, 0));
        assert_eq!(
            validator.validate(&other_version),
            ValidationCode::WrongVersionTier
        );
    }

    #[test]
    fn foreign_signer_is_invalid_signature() {
        let vendor = key_pair();
        let forger = key_pair();
        let validator = validator_for(&vendor, 5, 2);

        let forged = issue_activation_key(&forger, ActivationPayload::new(5, 2, 0));
        assert_eq!(validator.validate(&forged), ValidationCode::InvalidSignature);
    }

    #[test]
    fn any_single_byte_flip_is_rejected() {
        let pair = key_pair();
        let validator = validator_for(&pair, 5, 2);
        let key = issue_activation_key(&pair, ActivationPayload::new(5, 2, 7));
        let raw = B64.decode(&key).unwrap();

        for i in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[i] ^= 0x01;
            let code = validator.validate(&encode_raw(&tampered));
            assert_ne!(code, ValidationCode::Ok, "flip at byte {i} accepted");
        }
    }

    #[test]
    fn reserved_byte_is_signed_but_not_gated() {
        let pair = key_pair();
        let validator = validator_for(&pair, 5, 2);

        for reserved in [0u8, 1, 0x80, 0xff] {
            let key = issue_activation_key(&pair, ActivationPayload::new(5, 2, reserved));
            assert_eq!(validator.validate(&key), ValidationCode::Ok);
        }
    }

    #[test]
    fn nonzero_trailing_bits_are_invalid_serial() {
        const ALPHABET: &[u8] =
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

        let pair = key_pair();
        let validator = validator_for(&pair, 5, 2);
        let key = issue_activation_key(&pair, ActivationPayload::new(5, 2, 0));
        // 68 bytes leave 4 unused low bits in the last of 91 symbols.
        assert_eq!(key.len(), 91);

        let last = *key.as_bytes().last().unwrap();
        let index = ALPHABET.iter().position(|c| *c == last).unwrap();
        assert_eq!(index & 0x0f, 0);

        let mut altered = key[..key.len() - 1].to_string();
        altered.push(ALPHABET[index | 0x01] as char);

        // Same 68 bytes under a lenient decoder, still rejected here.
        assert_eq!(validator.validate(&altered), ValidationCode::InvalidSerial);
        assert_eq!(validator.validate(&key), ValidationCode::Ok);
    }

    #[test]
    fn format_grouped_handles_edge_groups() {
        assert_eq!(format_grouped("ABCDEFG", 3), "ABC-DEF-G");
        assert_eq!(format_grouped("AB-CD", 0), "ABCD");
        assert_eq!(format_grouped("", 4), "");
    }
}
