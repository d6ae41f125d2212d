//! Encryption of stored credential secrets

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

use crate::types::*;

const NONCE_LEN: usize = 12;

/// AES-256-GCM sealing of credential secrets before they reach storage.
///
/// A sealed secret is a random 96-bit nonce followed by the ciphertext, so
/// sealing the same password twice never yields the same bytes.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Derive the key from a passphrase with SHA-256
    pub fn from_passphrase(passphrase: &str) -> Self {
        let key: Zeroizing<[u8; 32]> = Zeroizing::new(Sha256::digest(passphrase.as_bytes()).into());
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..])),
        }
    }

    /// A random key that lives as long as this process.
    ///
    /// Secrets sealed with it cannot be opened after a restart.
    pub fn ephemeral() -> Self {
        Self {
            cipher: Aes256Gcm::new(&Aes256Gcm::generate_key(OsRng)),
        }
    }

    pub fn seal(&self, secret: &SecretValue) -> ImportResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, secret.expose().as_bytes())
            .map_err(|_| ImportError::Cipher("failed to seal credential".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    pub fn open(&self, sealed: &[u8]) -> ImportResult<SecretValue> {
        if sealed.len() <= NONCE_LEN {
            return Err(ImportError::Cipher("sealed credential is truncated".to_string()));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| ImportError::Cipher("failed to open credential".to_string()))?,
        );
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| ImportError::Cipher("credential is not valid UTF-8".to_string()))?;
        Ok(SecretValue::new(text))
    }
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretCipher(***)")
    }
}
