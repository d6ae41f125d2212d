//! Traits for storage abstraction and the external document collaborators

use async_trait::async_trait;

use crate::types::*;

/// Ledger persistence consumed by reconciliation and import
///
/// This trait allows the pipeline to work with any storage backend
/// (PostgreSQL, SQLite, in-memory, etc.) by implementing these methods.
#[async_trait]
pub trait TransactionStorage: Send + Sync {
    /// Snapshot of every stored transaction for a user, used for duplicate checks
    async fn fetch_transactions_for_reconciliation(
        &self,
        user_id: &str,
    ) -> ImportResult<Vec<PersistedTransaction>>;

    /// Insert a batch of rows atomically, returning the assigned ids in input order
    async fn insert_transactions(
        &self,
        user_id: &str,
        batch: &[NewTransaction],
    ) -> ImportResult<Vec<String>>;

    /// Look up a user's category by its exact name
    async fn find_category_id(&self, user_id: &str, name: &str) -> ImportResult<Option<String>>;
}

/// Credential persistence, one row per user and priority
///
/// Secrets arrive already sealed by the credential store; implementations
/// persist the ciphertext as given and never see a plaintext password.
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    /// All credentials of a user, ascending by priority
    async fn list_credentials(&self, user_id: &str) -> ImportResult<Vec<Credential>>;

    /// Upsert every credential by priority; either all are written or none
    async fn upsert_credentials(
        &self,
        user_id: &str,
        credentials: &[SealedCredential],
    ) -> ImportResult<()>;

    /// Remove a slot, doing nothing if it is already empty
    async fn delete_credential(&self, user_id: &str, priority: u8) -> ImportResult<()>;
}

/// Cryptographic unlock of a single document
///
/// Implementations wrap a concrete document library. The decryptor owns the
/// order in which passwords are tried; an unlocker only answers one attempt.
pub trait DocumentUnlocker: Send + Sync {
    /// Whether the document advertises password protection
    fn is_encrypted(&self, bytes: &[u8]) -> bool;

    /// Open the document, with `None` meaning no password
    fn unlock(&self, bytes: &[u8], password: Option<&str>) -> Result<Vec<u8>, UnlockError>;
}

/// Extraction of statement transactions from unlocked bytes
pub trait StatementParser: Send + Sync {
    fn parse(&self, unlocked: &[u8]) -> ImportResult<ParsedStatement>;
}

/// A parser for one bank's statement layout
pub trait BankParser: Send + Sync {
    /// Identifier reported in ingestion results
    fn bank_name(&self) -> &str;

    /// Check whether this parser recognizes the document
    fn can_parse(&self, unlocked: &[u8]) -> bool;

    /// Extract the transactions
    fn parse(&self, unlocked: &[u8]) -> ImportResult<Vec<RawCandidate>>;
}
