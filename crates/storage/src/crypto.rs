// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated encryption of secret values at rest.
//!
//! Values are sealed with ChaCha20-Poly1305 under a 32-byte application
//! key. The stored form is `base64(nonce || ciphertext)`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use std::fmt;
use thiserror::Error;

pub const APP_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("application key must be {APP_KEY_LEN} bytes, got {0}")]
    KeyLength(usize),
    #[error("malformed encoded secret: {0}")]
    Encoding(String),
    #[error("failed to encrypt secret")]
    Encrypt,
    #[error("failed to decrypt secret, wrong application key or corrupt value")]
    Decrypt,
}

/// Application key used to seal secrets
#[derive(Clone, PartialEq, Eq)]
pub struct AppKey([u8; APP_KEY_LEN]);

impl AppKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; APP_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::KeyLength(bytes.len()))?;
        Ok(Self(key))
    }

    /// Accepts the raw 32-character key or its base64 encoding.
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        if s.len() == APP_KEY_LEN {
            return Self::from_bytes(s.as_bytes());
        }
        let decoded = STANDARD
            .decode(s.trim())
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Self::from_bytes(&decoded)
    }
}

impl fmt::Debug for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppKey(<redacted>)")
    }
}

/// Seals and opens secret values
#[derive(Clone)]
pub struct SecretCipher {
    cipher: ChaCha20Poly1305,
}

impl SecretCipher {
    pub fn new(key: &AppKey) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key.0)),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;
        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        if raw.len() < NONCE_LEN {
            return Err(CryptoError::Encoding("value shorter than nonce".to_string()));
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let opened = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(opened).map_err(|e| CryptoError::Encoding(e.to_string()))
    }
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretCipher")
    }
}

#[cfg(test)]
#[path = "crypto_tests.rs"]
mod tests;
