// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-CBC with PKCS#7 padding.
//!
//! Each file gets a fresh random 256-bit key and 128-bit IV, so an IV is never
//! reused under the same key. Key and IV travel out-of-band from the
//! ciphertext: they are never prepended to or embedded in the blob.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Errors raised by the payload cipher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid IV: {0}")]
    InvalidIv(String),

    /// Bad padding or wrong key/IV. Signals tampering or a mismatched key.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("System random source unavailable")]
    Random,
}

/// Per-file key and IV, hex encoded (lowercase, no `0x` prefix).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMaterial {
    key_hex: String,
    iv_hex: String,
}

impl EncryptionMaterial {
    /// Generate fresh random material.
    pub fn generate() -> Result<Self, CipherError> {
        let rng = SystemRandom::new();
        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        rng.fill(&mut key).map_err(|_| CipherError::Random)?;
        rng.fill(&mut iv).map_err(|_| CipherError::Random)?;

        Ok(Self {
            key_hex: alloy::hex::encode(key),
            iv_hex: alloy::hex::encode(iv),
        })
    }

    /// Parse and validate hex-encoded key material.
    ///
    /// Accepts an optional `0x` prefix and either case; stores lowercase.
    pub fn from_hex(key_hex: &str, iv_hex: &str) -> Result<Self, CipherError> {
        let key = alloy::hex::decode(key_hex.trim())
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        if key.len() != KEY_LEN {
            return Err(CipherError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }

        let iv = alloy::hex::decode(iv_hex.trim())
            .map_err(|e| CipherError::InvalidIv(e.to_string()))?;
        if iv.len() != IV_LEN {
            return Err(CipherError::InvalidIv(format!(
                "expected {IV_LEN} bytes, got {}",
                iv.len()
            )));
        }

        Ok(Self {
            key_hex: alloy::hex::encode(key),
            iv_hex: alloy::hex::encode(iv),
        })
    }

    pub fn key_hex(&self) -> &str {
        &self.key_hex
    }

    pub fn iv_hex(&self) -> &str {
        &self.iv_hex
    }

    fn key_bytes(&self) -> Result<Vec<u8>, CipherError> {
        alloy::hex::decode(&self.key_hex).map_err(|e| CipherError::InvalidKey(e.to_string()))
    }

    fn iv_bytes(&self) -> Result<Vec<u8>, CipherError> {
        alloy::hex::decode(&self.iv_hex).map_err(|e| CipherError::InvalidIv(e.to_string()))
    }

    /// Encrypt `plaintext` under this material.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let cipher = Aes256CbcEnc::new_from_slices(&self.key_bytes()?, &self.iv_bytes()?)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    /// Decrypt `ciphertext` under this material.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        if ciphertext.is_empty() || ciphertext.len() % IV_LEN != 0 {
            return Err(CipherError::Decryption(format!(
                "ciphertext length {} is not a positive multiple of the block size",
                ciphertext.len()
            )));
        }

        let cipher = Aes256CbcDec::new_from_slices(&self.key_bytes()?, &self.iv_bytes()?)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CipherError::Decryption("invalid padding".to_string()))
    }
}

impl std::fmt::Debug for EncryptionMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionMaterial")
            .field("key_hex", &"<redacted>")
            .field("iv_hex", &"<redacted>")
            .finish()
    }
}

/// Output of [`encrypt`]: ciphertext plus the material needed to reverse it.
#[derive(Debug, Clone)]
pub struct Encrypted {
    pub ciphertext: Vec<u8>,
    pub material: EncryptionMaterial,
}

/// Encrypt with freshly generated key material.
pub fn encrypt(plaintext: &[u8]) -> Result<Encrypted, CipherError> {
    let material = EncryptionMaterial::generate()?;
    let ciphertext = material.encrypt(plaintext)?;
    Ok(Encrypted {
        ciphertext,
        material,
    })
}

/// Decrypt with hex-encoded key material.
///
/// Wrong key/IV lengths and invalid padding both fail; a wrong key of the
/// right length almost always surfaces as a padding failure.
pub fn decrypt(ciphertext: &[u8], key_hex: &str, iv_hex: &str) -> Result<Vec<u8>, CipherError> {
    EncryptionMaterial::from_hex(key_hex, iv_hex)?.decrypt(ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_restores_plaintext() {
        for len in [0usize, 1, 15, 16, 17, 1024, 4099] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let enc = encrypt(&plaintext).unwrap();
            let dec = decrypt(
                &enc.ciphertext,
                enc.material.key_hex(),
                enc.material.iv_hex(),
            )
            .unwrap();
            assert_eq!(dec, plaintext, "length {len}");
        }
    }

    #[test]
    fn generated_material_has_expected_sizes() {
        let enc = encrypt(&[7u8; 1024]).unwrap();
        assert_eq!(enc.material.key_hex().len(), KEY_LEN * 2);
        assert_eq!(enc.material.iv_hex().len(), IV_LEN * 2);
        // PKCS#7 always adds at least one byte of padding.
        assert_eq!(enc.ciphertext.len(), 1040);
    }

    #[test]
    fn material_is_fresh_per_file() {
        let a = EncryptionMaterial::generate().unwrap();
        let b = EncryptionMaterial::generate().unwrap();
        assert_ne!(a.key_hex(), b.key_hex());
        assert_ne!(a.iv_hex(), b.iv_hex());
    }

    #[test]
    fn ciphertext_does_not_embed_material() {
        let enc = encrypt(b"top secret report").unwrap();
        let key = alloy::hex::decode(enc.material.key_hex()).unwrap();
        let iv = alloy::hex::decode(enc.material.iv_hex()).unwrap();
        assert!(!enc.ciphertext.windows(KEY_LEN).any(|w| w == key.as_slice()));
        assert!(!enc.ciphertext.starts_with(&iv));
    }

    #[test]
    fn wrong_key_fails_or_garbles() {
        let plaintext = b"hello etherstore".repeat(8);
        let enc = encrypt(&plaintext).unwrap();
        let other = EncryptionMaterial::generate().unwrap();

        match decrypt(&enc.ciphertext, other.key_hex(), enc.material.iv_hex()) {
            Err(CipherError::Decryption(_)) => {}
            Ok(bytes) => assert_ne!(bytes, plaintext),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        let iv = "00".repeat(IV_LEN);
        let key = "11".repeat(KEY_LEN);

        assert!(matches!(
            decrypt(&[0u8; 16], &"11".repeat(16), &iv),
            Err(CipherError::InvalidKey(_))
        ));
        assert!(matches!(
            decrypt(&[0u8; 16], &key, &"00".repeat(8)),
            Err(CipherError::InvalidIv(_))
        ));
        assert!(matches!(
            decrypt(&[0u8; 16], "not-hex", &iv),
            Err(CipherError::InvalidKey(_))
        ));
    }

    #[test]
    fn truncated_ciphertext_is_a_decryption_error() {
        let enc = encrypt(b"some bytes to protect").unwrap();
        let truncated = &enc.ciphertext[..enc.ciphertext.len() - 3];
        assert!(matches!(
            decrypt(truncated, enc.material.key_hex(), enc.material.iv_hex()),
            Err(CipherError::Decryption(_))
        ));
        assert!(matches!(
            decrypt(&[], enc.material.key_hex(), enc.material.iv_hex()),
            Err(CipherError::Decryption(_))
        ));
    }

    #[test]
    fn from_hex_normalizes_prefix_and_case() {
        let key = format!("0x{}", "AB".repeat(KEY_LEN));
        let iv = "CD".repeat(IV_LEN);
        let material = EncryptionMaterial::from_hex(&key, &iv).unwrap();
        assert_eq!(material.key_hex(), "ab".repeat(KEY_LEN));
        assert_eq!(material.iv_hex(), "cd".repeat(IV_LEN));
    }

    #[test]
    fn debug_output_redacts_material() {
        let material = EncryptionMaterial::generate().unwrap();
        let rendered = format!("{material:?}");
        assert!(!rendered.contains(material.key_hex()));
        assert!(rendered.contains("redacted"));
    }
}
