//! Core types and data structures for statement ingestion

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Lowest credential priority slot
pub const MIN_CREDENTIAL_PRIORITY: u8 = 1;
/// Highest credential priority slot
pub const MAX_CREDENTIAL_PRIORITY: u8 = 4;

/// Message returned alongside a successful import
pub const IMPORT_SUCCESS_MESSAGE: &str = "transactions imported successfully";

/// A document password, wiped from memory on drop.
///
/// The value is write-only from the caller's perspective: it can be
/// deserialized from client input but never serialized, and its `Debug`
/// output is redacted.
#[derive(Clone, Default)]
pub struct SecretValue(Zeroizing<String>);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the plaintext, for handing to an unlocker only
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue::new)
    }
}

/// Stored decryption credential occupying one priority slot
///
/// The password is kept only in its sealed form; see
/// [`crate::credentials::SecretCipher`].
#[derive(Debug, Clone)]
pub struct Credential {
    /// Slot number, 1 is tried first
    pub priority: u8,
    /// Nonce followed by the AES-GCM ciphertext of the password
    pub sealed_secret: Vec<u8>,
    /// Free-form hint such as "last 4 digits of ID"
    pub label: String,
    /// When the slot was first filled
    pub created_at: NaiveDateTime,
    /// When the slot was last written
    pub updated_at: NaiveDateTime,
}

impl Credential {
    /// Create a new credential stamped with the current time
    pub fn new(priority: u8, sealed_secret: Vec<u8>, label: String) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            priority,
            sealed_secret,
            label,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the slot holds a usable secret
    pub fn has_value(&self) -> bool {
        !self.sealed_secret.is_empty()
    }

    /// Public view of the credential, without the secret
    pub fn summary(&self) -> CredentialSummary {
        CredentialSummary {
            priority: self.priority,
            label: self.label.clone(),
            has_value: self.has_value(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Encrypted credential handed to storage for an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedCredential {
    pub priority: u8,
    pub sealed_secret: Vec<u8>,
    pub label: String,
}

/// Where a password tried during decryption came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    /// A stored credential at this priority
    Priority(u8),
    /// A configured filename rule
    FilenameRule,
}

impl fmt::Display for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Priority(priority) => write!(f, "priority {}", priority),
            SecretSource::FilenameRule => f.write_str("filename rule"),
        }
    }
}

/// A plaintext password together with its origin, in fallback order
#[derive(Debug, Clone)]
pub struct OrderedSecret {
    pub source: SecretSource,
    pub value: SecretValue,
}

impl OrderedSecret {
    pub fn new(source: SecretSource, value: SecretValue) -> Self {
        Self { source, value }
    }
}

/// What callers get back when listing credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub priority: u8,
    pub label: String,
    pub has_value: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Client input for setting a credential slot
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialInput {
    pub priority: u8,
    #[serde(alias = "password")]
    pub secret_value: SecretValue,
    #[serde(default)]
    pub label: String,
}

impl CredentialInput {
    pub fn new(priority: u8, secret_value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            priority,
            secret_value: SecretValue::new(secret_value),
            label: label.into(),
        }
    }
}

/// An uploaded statement, alive only for one ingestion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub filename: String,
    pub raw_bytes: Vec<u8>,
    pub mime_type: String,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, raw_bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            raw_bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// A transaction as extracted from a statement, before reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    /// Transaction date printed on the statement
    pub date: NaiveDate,
    /// Merchant or memo text, kept verbatim
    pub description: String,
    /// Signed amount in minor-unit precision; negative means a credit or refund
    pub amount: BigDecimal,
    /// ISO currency code
    pub currency: String,
    /// Category name guessed by the parser, may be empty
    #[serde(default)]
    pub suggested_category: String,
    /// Last four digits of the card, may be empty
    #[serde(default)]
    pub source_card_suffix: String,
}

impl RawCandidate {
    /// Structural identity of this candidate
    pub fn key(&self) -> CandidateKey {
        CandidateKey::new(self.date, &self.amount, &self.description)
    }
}

/// Natural key `(date, amount, description)` used both for duplicate
/// detection and as the identity of an unsaved candidate.
///
/// The amount is normalized so `100.5` and `100.50` compare equal; there is
/// no rounding tolerance beyond that.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateKey {
    date: NaiveDate,
    amount: BigDecimal,
    description: String,
}

impl CandidateKey {
    pub fn new(date: NaiveDate, amount: &BigDecimal, description: &str) -> Self {
        Self {
            date,
            amount: amount.normalized(),
            description: description.to_string(),
        }
    }
}

/// A raw candidate plus the result of reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedCandidate {
    #[serde(flatten)]
    pub candidate: RawCandidate,
    pub is_duplicate: bool,
}

impl AnnotatedCandidate {
    pub fn key(&self) -> CandidateKey {
        self.candidate.key()
    }
}

/// Output of a statement parser for one unlocked document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub bank_identifier: String,
    pub candidates: Vec<RawCandidate>,
}

/// Per-document outcome of an ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub filename: String,
    pub bank_identifier: String,
    pub candidates: Vec<AnnotatedCandidate>,
    /// Sum of every candidate amount, duplicates included
    pub total_amount: BigDecimal,
    /// Set when the document contributed nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl IngestionResult {
    /// Result for a document that was decrypted and parsed
    pub fn parsed(filename: String, bank_identifier: String, candidates: Vec<AnnotatedCandidate>) -> Self {
        let total_amount = candidates.iter().map(|c| &c.candidate.amount).sum();
        Self {
            filename,
            bank_identifier,
            candidates,
            total_amount,
            parse_error: None,
        }
    }

    /// Result for a document that failed at any stage
    pub fn failed(filename: String, error: &ImportError) -> Self {
        Self {
            filename,
            bank_identifier: String::new(),
            candidates: Vec::new(),
            total_amount: BigDecimal::from(0),
            parse_error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.parse_error.is_some()
    }
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Statement convention: charges are positive, credits and refunds negative
    pub fn from_statement_amount(amount: &BigDecimal) -> Self {
        if *amount < BigDecimal::from(0) {
            TransactionType::Income
        } else {
            TransactionType::Expense
        }
    }
}

/// How a ledger entry came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    Manual,
    Imported,
}

/// Existing ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTransaction {
    pub id: String,
    pub user_id: String,
    pub category_id: Option<String>,
    pub amount: BigDecimal,
    pub transaction_type: TransactionType,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub source: TransactionSource,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PersistedTransaction {
    /// Natural key of the stored row, comparable with [`RawCandidate::key`]
    pub fn key(&self) -> CandidateKey {
        CandidateKey::new(self.transaction_date, &self.amount, &self.description)
    }
}

/// Row handed to storage for insertion; storage assigns id and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub category_id: Option<String>,
    pub amount: BigDecimal,
    pub transaction_type: TransactionType,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub source: TransactionSource,
}

impl NewTransaction {
    /// Build an imported row from a statement candidate
    pub fn imported(candidate: &RawCandidate, category_id: Option<String>) -> Self {
        Self {
            category_id,
            amount: candidate.amount.clone(),
            transaction_type: TransactionType::from_statement_amount(&candidate.amount),
            description: candidate.description.clone(),
            transaction_date: candidate.date,
            source: TransactionSource::Imported,
        }
    }

    /// Build a manually entered row
    pub fn manual(
        transaction_date: NaiveDate,
        description: String,
        amount: BigDecimal,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            category_id: None,
            amount,
            transaction_type,
            description,
            transaction_date,
            source: TransactionSource::Manual,
        }
    }
}

/// Outcome of a successful import commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported_count: usize,
    pub message: String,
}

/// Errors that can occur while ingesting or importing statements
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("could not decrypt {filename} with any configured password")]
    DecryptionFailed { filename: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Import rejected: {0}")]
    ImportRejected(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Credential cipher error: {0}")]
    Cipher(String),
}

/// Result type for ingestion operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Failure reported by a document unlocker for a single attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnlockError {
    #[error("document requires a password")]
    PasswordRequired,
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("malformed document: {0}")]
    Malformed(String),
}
