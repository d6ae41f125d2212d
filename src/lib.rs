//! # Statement Import
//!
//! Ingestion of bank and credit-card statements into a personal ledger:
//! password fallback for protected documents, duplicate reconciliation
//! against stored transactions, per-document selection and batch import.
//!
//! ## Features
//!
//! - **Ordered credentials**: up to four document passwords tried by priority,
//!   sealed with AES-GCM at rest
//! - **Per-document isolation**: a document that cannot be opened or parsed
//!   never fails its siblings
//! - **Duplicate reconciliation**: `(date, amount, description)` natural key
//! - **Selective import**: duplicates start unselected but stay toggleable
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use statement_import::{CredentialStore, MemoryStorage, SecretCipher};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cipher = SecretCipher::from_passphrase("credential key");
//! let store = CredentialStore::new(MemoryStorage::new(), cipher);
//! store.set_one("user-1", 1, "A123456789", "national id").await.unwrap();
//!
//! let listed = store.list("user-1").await.unwrap();
//! assert!(listed[0].has_value);
//! # });
//! ```
//!
//! Document unlocking and bank-specific parsing are supplied by the caller
//! through [`DocumentUnlocker`] and [`StatementParser`] (or [`BankParser`]s
//! registered in a [`ParserRegistry`]).

pub mod config;
pub mod credentials;
pub mod ingest;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use credentials::*;
pub use ingest::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
pub use utils::MemoryStorage;
