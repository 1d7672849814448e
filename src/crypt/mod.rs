//! # Symmetric encryption capability
//!
//! The spectroscopic table is distributed **encrypted at rest**. This module defines the
//! pluggable [`Cipher`] capability used by the [`store`] layer, the [`SymmetricKey`]
//! handle read from a key file, and the default AES-256-GCM implementation [`AesGcmCipher`].
//!
//! ## On-disk format
//! -----------------
//! A ciphertext file produced by [`AesGcmCipher`] is a single **base64 token**:
//!
//! ```text
//! base64( nonce[12] ‖ AES-256-GCM(ciphertext ‖ tag) )
//! ```
//!
//! The key file holds the base64 text of the 32 raw key bytes.
//!
//! ## Error policy
//! -----------------
//! Every failure on the decryption path (undecodable token, truncated token, key of the
//! wrong size, failed authentication) surfaces as [`CksError::Decryption`]. A wrong key can
//! never leak into a downstream parse error.
//!
//! ## See also
//! ------------
//! * [`store::EncryptedStore`] – Decrypts a file and memoizes the parsed table.
//! * [`encrypt_file`] – Produce a ciphertext file from a plaintext table.
pub mod store;

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use camino::Utf8Path;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::cks_errors::CksError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Raw symmetric key material.
///
/// The key bytes are never printed: the [`Debug`] implementation only reports the length.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey(Vec<u8>);

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey(<{} bytes>)", self.0.len())
    }
}

impl SymmetricKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        SymmetricKey(bytes.into())
    }

    /// Draw a fresh 256-bit key from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        SymmetricKey(bytes.to_vec())
    }

    /// Decode a key from its base64 text representation.
    ///
    /// Return
    /// ----------
    /// * The decoded key, or [`CksError::Decryption`] when the text is not valid base64.
    pub fn from_base64(text: &str) -> Result<Self, CksError> {
        BASE64
            .decode(text.trim().as_bytes())
            .map(SymmetricKey)
            .map_err(|e| CksError::Decryption(format!("key is not valid base64: {e}")))
    }

    /// Read a key file (base64 text of the raw key bytes).
    ///
    /// The file is meant to be read **once** at process start and the key handed to
    /// every store that needs it.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: Location of the key file.
    ///
    /// Return
    /// ----------
    /// * The key, [`CksError::IoError`] if the file cannot be read, or
    ///   [`CksError::Decryption`] if its content is not a base64 key.
    pub fn read(path: &Utf8Path) -> Result<Self, CksError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_base64(&text)
    }

    /// Write the key as base64 text.
    pub fn write(&self, path: &Utf8Path) -> Result<(), CksError> {
        std::fs::write(path, self.to_base64())?;
        Ok(())
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Symmetric encryption of opaque byte buffers.
///
/// Implementors must report **every** decryption failure as [`CksError::Decryption`].
pub trait Cipher {
    fn encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CksError>;

    fn decrypt(&self, key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>, CksError>;
}

/// AES-256-GCM with a random 96-bit nonce per message, base64-armored.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    fn cipher_for(key: &SymmetricKey) -> Result<Aes256Gcm, CksError> {
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| {
            CksError::Decryption(format!(
                "key must be {KEY_LEN} bytes, got {}",
                key.as_bytes().len()
            ))
        })
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CksError> {
        let cipher = Self::cipher_for(key)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CksError::Decryption("encryption failed".into()))?;

        let mut token = Vec::with_capacity(NONCE_LEN + sealed.len());
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&sealed);
        Ok(BASE64.encode(token).into_bytes())
    }

    fn decrypt(&self, key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>, CksError> {
        let cipher = Self::cipher_for(key)?;

        let token = BASE64
            .decode(ciphertext.trim_ascii())
            .map_err(|e| CksError::Decryption(format!("ciphertext is not valid base64: {e}")))?;

        if token.len() < NONCE_LEN {
            return Err(CksError::Decryption("ciphertext is truncated".into()));
        }
        let (nonce_bytes, sealed) = token.split_at(NONCE_LEN);

        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| {
                CksError::Decryption("authentication failed (wrong key or corrupted data)".into())
            })
    }
}

/// Encrypt a plaintext file into a ciphertext file.
///
/// Arguments
/// -----------------
/// * `plain`: The plaintext file to read.
/// * `crypt`: The ciphertext file to (over)write.
/// * `key`: Encryption key.
/// * `cipher`: Encryption capability (usually [`AesGcmCipher`]).
///
/// Return
/// ----------
/// * `Ok(())` once `crypt` has been written.
pub fn encrypt_file<C: Cipher>(
    plain: &Utf8Path,
    crypt: &Utf8Path,
    key: &SymmetricKey,
    cipher: &C,
) -> Result<(), CksError> {
    let raw = std::fs::read(plain)?;
    let token = cipher.encrypt(key, &raw)?;
    std::fs::write(crypt, token)?;
    Ok(())
}

#[cfg(test)]
mod crypt_test {
    use super::*;

    #[test]
    fn test_round_trip() {
        let key = SymmetricKey::generate();
        let token = AesGcmCipher.encrypt(&key, b"1234-01 & $5800").unwrap();
        assert!(token.iter().all(|b| b.is_ascii()));

        let plain = AesGcmCipher.decrypt(&key, &token).unwrap();
        assert_eq!(plain, b"1234-01 & $5800");
    }

    #[test]
    fn test_nonce_is_fresh() {
        let key = SymmetricKey::generate();
        let a = AesGcmCipher.encrypt(&key, b"same").unwrap();
        let b = AesGcmCipher.encrypt(&key, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key() {
        let token = AesGcmCipher
            .encrypt(&SymmetricKey::generate(), b"secret")
            .unwrap();
        let err = AesGcmCipher
            .decrypt(&SymmetricKey::generate(), &token)
            .unwrap_err();
        assert!(matches!(err, CksError::Decryption(_)));
    }

    #[test]
    fn test_malformed_inputs() {
        let key = SymmetricKey::generate();

        let short_key = SymmetricKey::from_bytes(vec![1u8; 7]);
        let token = AesGcmCipher.encrypt(&key, b"secret").unwrap();
        assert!(matches!(
            AesGcmCipher.decrypt(&short_key, &token),
            Err(CksError::Decryption(_))
        ));

        assert!(matches!(
            AesGcmCipher.decrypt(&key, b"%%% not base64 %%%"),
            Err(CksError::Decryption(_))
        ));
        assert!(matches!(
            AesGcmCipher.decrypt(&key, b"AAAA"),
            Err(CksError::Decryption(_))
        ));

        let mut tampered = BASE64.decode(&token).unwrap();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        let tampered = BASE64.encode(tampered);
        assert!(matches!(
            AesGcmCipher.decrypt(&key, tampered.as_bytes()),
            Err(CksError::Decryption(_))
        ));
    }

    #[test]
    fn test_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("table.key")).unwrap();

        let key = SymmetricKey::generate();
        key.write(&path).unwrap();
        assert_eq!(SymmetricKey::read(&path).unwrap(), key);
        assert_eq!(format!("{key:?}"), "SymmetricKey(<32 bytes>)");

        std::fs::write(&path, "not a key!").unwrap();
        assert!(matches!(
            SymmetricKey::read(&path),
            Err(CksError::Decryption(_))
        ));
    }
}
