// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Symmetric encryption for stored OAuth tokens.
//!
//! AES-256-GCM with a key derived (HKDF-SHA256) from the process-wide
//! `ENCRYPTION_KEY`. Each ciphertext is bound to its owning member through
//! the AEAD associated data, so a token copied onto another member's record
//! will not decrypt.
//!
//! Stored format: base64(nonce || ciphertext || tag).

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hkdf::Hkdf;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;

const KDF_SALT: &[u8] = b"club-sync/token-encryption";
const KDF_INFO: &[u8] = b"aes-256-gcm/v1";
const KEY_LEN: usize = 32;

/// Errors from token encryption.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("Encryption key must not be empty")]
    EmptyKey,

    #[error("Key derivation failed")]
    KeyDerivation,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Ciphertext too short")]
    Truncated,

    #[error("Decryption failed (wrong key, wrong owner or corrupt data)")]
    DecryptionFailed,

    #[error("Decrypted token is not valid UTF-8")]
    InvalidUtf8,
}

impl From<CipherError> for AppError {
    fn from(err: CipherError) -> Self {
        AppError::Crypto(err.to_string())
    }
}

/// Token encryption service.
#[derive(Clone)]
pub struct TokenCipher {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl TokenCipher {
    /// Derive the AES key from the configured secret.
    pub fn new(secret: &[u8]) -> Result<Self, CipherError> {
        if secret.is_empty() {
            return Err(CipherError::EmptyKey);
        }

        let mut key_bytes = [0u8; KEY_LEN];
        Hkdf::<Sha256>::new(Some(KDF_SALT), secret)
            .expand(KDF_INFO, &mut key_bytes)
            .map_err(|_| CipherError::KeyDerivation)?;

        let unbound =
            UnboundKey::new(&AES_256_GCM, &key_bytes).map_err(|_| CipherError::KeyDerivation)?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt a token for `member_id`.
    pub fn encrypt(&self, plaintext: &str, member_id: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(associated_data(member_id)),
                &mut in_out,
            )
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut combined = Vec::with_capacity(NONCE_LEN + in_out.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&in_out);
        Ok(BASE64.encode(combined))
    }

    /// Decrypt a token previously encrypted for `member_id`.
    pub fn decrypt(&self, ciphertext_b64: &str, member_id: &str) -> Result<String, CipherError> {
        let combined = BASE64.decode(ciphertext_b64)?;
        if combined.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CipherError::Truncated);
        }

        let (nonce_bytes, sealed) = combined.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CipherError::Truncated)?;

        let mut in_out = sealed.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(associated_data(member_id)), &mut in_out)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| CipherError::InvalidUtf8)
    }

    /// Encrypt an access/refresh token pair.
    pub fn encrypt_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
        member_id: &str,
    ) -> Result<(String, String), CipherError> {
        Ok((
            self.encrypt(access_token, member_id)?,
            self.encrypt(refresh_token, member_id)?,
        ))
    }
}

fn associated_data(member_id: &str) -> Vec<u8> {
    format!("member_id:{}", member_id).into_bytes()
}
