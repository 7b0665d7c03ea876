//! # Key Management
//!
//! Ed25519 keypair generation and serialization for PRISM accounts.
//!
//! Every account address ultimately traces back to one of these keypairs,
//! and every `Signature`-authorized account update is discharged by one.
//!
//! ## Why Ed25519?
//!
//! - Deterministic signatures (no k-value footguns like ECDSA).
//! - 128-bit security level in 32+32 bytes. Compact and sufficient.
//! - Fast verification — the local chain re-checks one signature per
//!   signature-authorized node on every apply.
//!
//! Private keys are zeroized on drop (thanks, ed25519-dalek), generated
//! from the OS RNG, and never logged. If you add logging to this module,
//! you will be asked to leave.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed — leaking details
/// about key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// A PRISM account keypair wrapping an Ed25519 signing key.
///
/// Deliberately does NOT implement `Serialize`/`Deserialize` — serializing
/// private keys should be a conscious act, not a side effect of shoving a
/// keypair into a JSON response. Use `secret_key_bytes()` / `from_bytes()`
/// explicitly.
///
/// # Examples
///
/// ```
/// use prism_protocol::crypto::keys::PrismKeypair;
///
/// let kp = PrismKeypair::generate();
/// let sig = kp.sign(b"account update commitment");
/// assert!(kp.verify(b"account update commitment", &sig));
/// ```
pub struct PrismKeypair {
    signing_key: SigningKey,
}

/// The public half of a PRISM identity, safe to share with the world.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrismPublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature over a message. Always exactly 64 bytes when
/// produced by this module; anything else simply fails verification —
/// no panics, no undefined behavior, just `false`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrismSignature {
    bytes: Vec<u8>,
}

impl PrismKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// In Ed25519 the 32-byte secret key *is* the seed. A weak seed means
    /// a weak key; feed this from a CSPRNG or a KDF, nothing else.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from raw secret key bytes.
    pub fn from_bytes(secret_key_bytes: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self::from_seed(secret_key_bytes)
    }

    /// Reconstruct a keypair from a hex-encoded secret key.
    ///
    /// Convenience for loading devnet keys from config. Don't do this in
    /// production.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(KeyError::InvalidSecretKey);
        }
        let mut arr = [0u8; SECRET_KEY_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_seed(&arr))
    }

    /// Returns the public key associated with this keypair.
    pub fn public_key(&self) -> PrismPublicKey {
        PrismPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Raw public key bytes (32 bytes). Safe to share, log, tattoo on
    /// your arm, etc.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message.
    ///
    /// Ed25519 signatures are deterministic — same (key, message) pair,
    /// same signature. No nonce management at signing time.
    pub fn sign(&self, message: &[u8]) -> PrismSignature {
        let sig = self.signing_key.sign(message);
        PrismSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &PrismSignature) -> bool {
        self.public_key().verify(message, signature)
    }

    /// Export the raw 32-byte secret key material.
    ///
    /// **Handle with extreme care.** This is the only secret standing
    /// between an attacker and full control of the associated account.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Hex-encoded public key. Useful for display and logging.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }
}

impl Clone for PrismKeypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    /// Every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for PrismKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even partially.
        write!(f, "PrismKeypair(pub={})", self.public_key().to_hex())
    }
}

impl PartialEq for PrismKeypair {
    /// Two keypairs are equal if their public keys match. Comparing secret
    /// material in a non-constant-time way is a habit we refuse to form.
    fn eq(&self, other: &Self) -> bool {
        self.public_key_bytes() == other.public_key_bytes()
    }
}

impl Eq for PrismKeypair {}

// ---------------------------------------------------------------------------
// PrismPublicKey
// ---------------------------------------------------------------------------

impl PrismPublicKey {
    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Try to create a public key from a byte slice.
    ///
    /// Validates the length and that the bytes represent a valid Ed25519
    /// point — some 32-byte values are not points on the curve.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        if slice.len() != 32 {
            return Err(KeyError::InvalidPublicKey);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);

        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;

        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify a signature against this public key.
    ///
    /// Returns a plain boolean — the vast majority of callers want a
    /// yes/no answer and don't care which check failed.
    pub fn verify(&self, message: &[u8], signature: &PrismSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig_bytes: [u8; 64] = match signature.bytes.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        let dalek_sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    /// Hex-encoded representation. 64 characters for 32 bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse a hex-encoded public key string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::OddLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self { bytes: arr })
    }
}

impl Hash for PrismPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for PrismPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PrismPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrismPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// PrismSignature
// ---------------------------------------------------------------------------

impl PrismSignature {
    /// Create a signature from its raw 64-byte representation.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex-encoded signature string. 128 characters for a valid signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parse a hex-encoded signature.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 64 {
            return Err(hex::FromHexError::OddLength);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for PrismSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PrismSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "PrismSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "PrismSignature({})", hex_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_valid_keypair() {
        let kp = PrismKeypair::generate();
        assert_eq!(kp.public_key_bytes().len(), 32);
        assert_eq!(kp.secret_key_bytes().len(), 32);
    }

    #[test]
    fn sign_verify_roundtrip() {
        let kp = PrismKeypair::generate();
        let msg = b"authorize account update";
        let sig = kp.sign(msg);
        assert!(kp.verify(msg, &sig));
    }

    #[test]
    fn wrong_message_fails_verification() {
        let kp = PrismKeypair::generate();
        let sig = kp.sign(b"correct message");
        assert!(!kp.verify(b"wrong message", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp1 = PrismKeypair::generate();
        let kp2 = PrismKeypair::generate();
        let sig = kp1.sign(b"message");
        assert!(!kp2.verify(b"message", &sig));
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        let kp1 = PrismKeypair::from_seed(&seed);
        let kp2 = PrismKeypair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn deterministic_signatures() {
        // Ed25519 is deterministic — same key + same message = same
        // signature. A feature, not a bug.
        let kp = PrismKeypair::generate();
        let msg = b"determinism is underrated";
        assert_eq!(kp.sign(msg).as_bytes(), kp.sign(msg).as_bytes());
    }

    #[test]
    fn secret_key_roundtrip() {
        let kp = PrismKeypair::generate();
        let bytes = kp.secret_key_bytes();
        let restored = PrismKeypair::from_bytes(&bytes);
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(PrismKeypair::from_hex("deadbeef").is_err());
        assert!(PrismKeypair::from_hex("not-hex-at-all").is_err());
    }

    #[test]
    fn public_key_hex_roundtrip() {
        let kp = PrismKeypair::generate();
        let pk = kp.public_key();
        let recovered = PrismPublicKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, recovered);
    }

    #[test]
    fn public_key_rejects_wrong_length() {
        assert!(PrismPublicKey::try_from_slice(&[0u8; 16]).is_err());
    }

    #[test]
    fn signature_hex_roundtrip() {
        let kp = PrismKeypair::generate();
        let sig = kp.sign(b"test");
        let recovered = PrismSignature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(sig, recovered);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = PrismKeypair::generate();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("PrismKeypair(pub="));
        assert!(!debug_str.contains("signing_key"));
    }
}
