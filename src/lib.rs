pub mod cks_errors;
pub mod constants;
pub mod crypt;
pub mod samples;
pub mod spec_table;
pub mod star_inputs;
pub mod summary;

pub use cks_errors::CksError;
pub use constants::ObjectId;
pub use crypt::{store::EncryptedStore, AesGcmCipher, Cipher, SymmetricKey};
pub use spec_table::{SpecRecord, SpecTable, SpecTableParser};
pub use summary::{
    aggregate::{make_summary, summarize_directory, SummaryRun},
    config::SummaryConfig,
    summary_table::{QuantileRow, SummaryTable},
};
