//! AES-256-GCM authenticated encryption for stored API keys.
//!
//! The cipher key is derived once from a long-lived master secret via
//! PBKDF2-HMAC-SHA256 with a fixed salt, so ciphertext written in one
//! process lifetime remains decryptable in the next.  Each call to
//! `encrypt` generates a fresh random 12-byte nonce and prepends it to
//! the ciphertext before base64 encoding.
//!
//! Layout of the encoded string (before base64):
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

pub mod mask;
pub mod validate;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, VaultError};

pub use mask::mask_key;
pub use validate::validate_format;

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Length of the derived cipher key in bytes (256 bits).
const KEY_LEN: usize = 32;

/// Fixed KDF salt.  Changing this breaks decryption of every stored key.
const KDF_SALT: &[u8] = b"api_key_encryption_salt";

/// Environment variable holding the master secret.
pub const MASTER_KEY_ENV: &str = "APIVAULT_MASTER_KEY";

/// Minimum master secret length in characters.
pub const MIN_MASTER_KEY_LEN: usize = 32;

/// Minimum PBKDF2 iteration count.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

/// Symmetric cipher bound to a derived master key.
///
/// Construct once per process and share (`Arc`) across sessions — key
/// derivation is deliberately expensive.
pub struct KeyCipher {
    cipher: Aes256Gcm,
}

impl KeyCipher {
    /// Build a cipher from the master secret.
    ///
    /// The secret comes from `master_key` when given, otherwise from the
    /// `APIVAULT_MASTER_KEY` environment variable.  A missing or short
    /// secret is a hard error — the vault never falls back to a default
    /// key, since it guards real third-party credentials.
    pub fn new(master_key: Option<&str>, iterations: u32) -> Result<Self> {
        let secret = match master_key {
            Some(k) => Zeroizing::new(k.to_string()),
            None => Zeroizing::new(
                std::env::var(MASTER_KEY_ENV)
                    .map_err(|_| VaultError::MissingMasterKey(MASTER_KEY_ENV))?,
            ),
        };

        if secret.trim().is_empty() {
            return Err(VaultError::MissingMasterKey(MASTER_KEY_ENV));
        }
        if secret.len() < MIN_MASTER_KEY_LEN {
            return Err(VaultError::MasterKeyTooShort(MIN_MASTER_KEY_LEN));
        }
        if iterations < MIN_KDF_ITERATIONS {
            return Err(VaultError::KeyDerivationFailed(format!(
                "PBKDF2 iterations must be at least {MIN_KDF_ITERATIONS} (got {iterations})"
            )));
        }

        // Same secret + salt + iterations always yields the same key.
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), KDF_SALT, iterations, key.as_mut());

        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| VaultError::KeyDerivationFailed(format!("invalid key length: {e}")))?;

        tracing::debug!(iterations, "cipher key derived from master secret");
        Ok(Self { cipher })
    }

    /// Encrypt an API key and return the base64-encoded result.
    ///
    /// Non-deterministic: each call uses a fresh random nonce, so two
    /// encryptions of the same plaintext produce different output.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.trim().is_empty() {
            return Err(VaultError::EmptyPlaintext);
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        Ok(URL_SAFE.encode(blob))
    }

    /// Decrypt a base64-encoded string produced by `encrypt`.
    ///
    /// Empty, malformed, or tampered input fails with a uniform
    /// `DecryptionFailed` — no detail about which check tripped.
    pub fn decrypt(&self, encoded: &str) -> Result<Zeroizing<String>> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(VaultError::DecryptionFailed);
        }

        let blob = URL_SAFE
            .decode(encoded)
            .map_err(|_| VaultError::DecryptionFailed)?;
        if blob.len() < NONCE_LEN {
            return Err(VaultError::DecryptionFailed);
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)?;

        // Convert via from_utf8 which takes ownership (no clone).
        // On error, zeroize the bytes inside the error before discarding.
        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|e| {
                let mut bad_bytes = e.into_bytes();
                bad_bytes.zeroize();
                VaultError::DecryptionFailed
            })
    }
}
