//! # Encrypted record store
//!
//! [`EncryptedStore`] owns a ciphertext file and an optional [`SymmetricKey`], exposes the
//! decrypted plaintext, and memoizes the table produced by a pluggable [`TableParser`].
//!
//! Loading is *lazy* and *cached*:
//! - nothing is read at construction,
//! - the first call to [`EncryptedStore::table`] decrypts and parses the file,
//! - later calls return the same reference without touching the file again.
//!
//! A store without a key reads its file verbatim, which is convenient for unencrypted
//! fixtures and non-sensitive tables.
//!
//! ## Example
//!
//! ```rust, no_run
//! use camino::Utf8Path;
//! use cks::crypt::{store::EncryptedStore, SymmetricKey};
//! use cks::spec_table::SpecTableParser;
//!
//! # fn run() -> Result<(), cks::cks_errors::CksError> {
//! let key = SymmetricKey::read(Utf8Path::new("data/table.key"))?;
//! let store = EncryptedStore::new("data/spec.tex.crypt", Some(key), SpecTableParser::new());
//! let table = store.table()?;
//! println!("{} stars", table.len());
//! # Ok(()) }
//! ```
use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;

use super::{AesGcmCipher, Cipher, SymmetricKey};
use crate::cks_errors::CksError;

/// Format-specific parsing hook plugged into an [`EncryptedStore`].
pub trait TableParser {
    type Table;

    /// Build the in-memory table from the full decrypted plaintext.
    fn parse_table(&self, plaintext: &str) -> Result<Self::Table, CksError>;
}

/// A ciphertext file, its key, and the lazily parsed table it contains.
pub struct EncryptedStore<P: TableParser, C: Cipher = AesGcmCipher> {
    filename: Utf8PathBuf,
    key: Option<SymmetricKey>,
    cipher: C,
    parser: P,
    table: OnceCell<P::Table>,
}

impl<P: TableParser> EncryptedStore<P> {
    /// Construct a store using the default [`AesGcmCipher`].
    ///
    /// Arguments
    /// -----------------
    /// * `filename`: Ciphertext file (or plaintext file when `key` is `None`).
    /// * `key`: Decryption key; `None` disables decryption.
    /// * `parser`: Format-specific parser invoked once on first access.
    pub fn new(filename: impl Into<Utf8PathBuf>, key: Option<SymmetricKey>, parser: P) -> Self {
        Self::with_cipher(filename, key, parser, AesGcmCipher)
    }
}

impl<P: TableParser, C: Cipher> EncryptedStore<P, C> {
    pub fn with_cipher(
        filename: impl Into<Utf8PathBuf>,
        key: Option<SymmetricKey>,
        parser: P,
        cipher: C,
    ) -> Self {
        EncryptedStore {
            filename: filename.into(),
            key,
            cipher,
            parser,
            table: OnceCell::new(),
        }
    }

    pub fn filename(&self) -> &Utf8Path {
        &self.filename
    }

    pub fn key(&self) -> Option<&SymmetricKey> {
        self.key.as_ref()
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Whether the table has already been built.
    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }

    /// Full plaintext of the backing file.
    ///
    /// The file is read on every call; only [`table`](EncryptedStore::table) is memoized.
    ///
    /// Return
    /// ----------
    /// * The UTF-8 plaintext,
    /// * [`CksError::Decryption`] when the key does not open the file,
    /// * [`CksError::InvalidPlaintext`] when the payload is not UTF-8,
    /// * [`CksError::IoError`] when the file cannot be read.
    pub fn decrypted_text(&self) -> Result<String, CksError> {
        let raw = std::fs::read(&self.filename)?;
        let bytes = match &self.key {
            None => raw,
            Some(key) => self.cipher.decrypt(key, &raw)?,
        };
        tracing::debug!(
            file = %self.filename,
            encrypted = self.key.is_some(),
            bytes = bytes.len(),
            "read table file"
        );
        Ok(String::from_utf8(bytes)?)
    }

    /// The memoized table, parsed on first access.
    ///
    /// If this is the first call, the file is decrypted and handed to the parser; the
    /// result is cached in an internal [`OnceCell`]. A failed first access caches nothing,
    /// so a later call retries.
    ///
    /// See also
    /// ------------
    /// * [`OnceCell::get_or_try_init`] – Lazy initialization helper.
    pub fn table(&self) -> Result<&P::Table, CksError> {
        self.table.get_or_try_init(|| {
            let text = self.decrypted_text()?;
            self.parser.parse_table(&text)
        })
    }

    /// Consume the store and return its table, parsing it if needed.
    pub fn into_table(mut self) -> Result<P::Table, CksError> {
        match self.table.take() {
            Some(table) => Ok(table),
            None => {
                let text = self.decrypted_text()?;
                self.parser.parse_table(&text)
            }
        }
    }
}
