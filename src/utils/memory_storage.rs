//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::traits::*;
use crate::types::*;

type CredentialSlots = BTreeMap<u8, Credential>;

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    transactions: Arc<RwLock<Vec<PersistedTransaction>>>,
    categories: Arc<RwLock<HashMap<(String, String), String>>>,
    credentials: Arc<RwLock<HashMap<String, CredentialSlots>>>,
    insert_calls: Arc<AtomicUsize>,
    reject_inserts: Arc<AtomicBool>,
    reject_reads: Arc<AtomicBool>,
}

fn poisoned<T>(_: PoisonError<T>) -> ImportError {
    ImportError::Persistence("storage lock poisoned".to_string())
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category for a user and return its id
    pub fn add_category(&self, user_id: &str, name: &str) -> ImportResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.categories
            .write()
            .map_err(poisoned)?
            .insert((user_id.to_string(), name.to_string()), id.clone());
        Ok(id)
    }

    /// Store a single row directly, bypassing the import path
    pub fn record(&self, user_id: &str, row: NewTransaction) -> ImportResult<PersistedTransaction> {
        let persisted = Self::materialize(user_id, row);
        self.transactions
            .write()
            .map_err(poisoned)?
            .push(persisted.clone());
        Ok(persisted)
    }

    /// Every stored row for a user, in insertion order
    pub fn transactions_for(&self, user_id: &str) -> ImportResult<Vec<PersistedTransaction>> {
        Ok(self
            .transactions
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    /// Number of `insert_transactions` calls received
    pub fn insert_call_count(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent batch insert fail, for exercising error paths
    pub fn set_reject_inserts(&self, reject: bool) {
        self.reject_inserts.store(reject, Ordering::SeqCst);
    }

    /// Make credential listing and reconciliation snapshots fail
    pub fn set_reject_reads(&self, reject: bool) {
        self.reject_reads.store(reject, Ordering::SeqCst);
    }

    fn check_reads(&self) -> ImportResult<()> {
        if self.reject_reads.load(Ordering::SeqCst) {
            return Err(ImportError::Persistence("storage unavailable".to_string()));
        }
        Ok(())
    }

    fn materialize(user_id: &str, row: NewTransaction) -> PersistedTransaction {
        let now = chrono::Utc::now().naive_utc();
        PersistedTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            category_id: row.category_id,
            amount: row.amount,
            transaction_type: row.transaction_type,
            description: row.description,
            transaction_date: row.transaction_date,
            source: row.source,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl TransactionStorage for MemoryStorage {
    async fn fetch_transactions_for_reconciliation(
        &self,
        user_id: &str,
    ) -> ImportResult<Vec<PersistedTransaction>> {
        self.check_reads()?;
        self.transactions_for(user_id)
    }

    async fn insert_transactions(
        &self,
        user_id: &str,
        batch: &[NewTransaction],
    ) -> ImportResult<Vec<String>> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        if self.reject_inserts.load(Ordering::SeqCst) {
            return Err(ImportError::Persistence(
                "batch insert rejected".to_string(),
            ));
        }

        let rows: Vec<PersistedTransaction> = batch
            .iter()
            .cloned()
            .map(|row| Self::materialize(user_id, row))
            .collect();
        let ids = rows.iter().map(|row| row.id.clone()).collect();

        self.transactions.write().map_err(poisoned)?.extend(rows);
        Ok(ids)
    }

    async fn find_category_id(&self, user_id: &str, name: &str) -> ImportResult<Option<String>> {
        Ok(self
            .categories
            .read()
            .map_err(poisoned)?
            .get(&(user_id.to_string(), name.to_string()))
            .cloned())
    }
}

#[async_trait]
impl CredentialStorage for MemoryStorage {
    async fn list_credentials(&self, user_id: &str) -> ImportResult<Vec<Credential>> {
        self.check_reads()?;
        Ok(self
            .credentials
            .read()
            .map_err(poisoned)?
            .get(user_id)
            .map(|slots| slots.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_credentials(
        &self,
        user_id: &str,
        sealed: &[SealedCredential],
    ) -> ImportResult<()> {
        let mut credentials = self.credentials.write().map_err(poisoned)?;
        let slots = credentials.entry(user_id.to_string()).or_default();

        for input in sealed {
            match slots.get_mut(&input.priority) {
                Some(existing) => {
                    existing.sealed_secret = input.sealed_secret.clone();
                    existing.label = input.label.clone();
                    existing.updated_at = chrono::Utc::now().naive_utc();
                }
                None => {
                    slots.insert(
                        input.priority,
                        Credential::new(
                            input.priority,
                            input.sealed_secret.clone(),
                            input.label.clone(),
                        ),
                    );
                }
            }
        }

        Ok(())
    }

    async fn delete_credential(&self, user_id: &str, priority: u8) -> ImportResult<()> {
        if let Some(slots) = self.credentials.write().map_err(poisoned)?.get_mut(user_id) {
            slots.remove(&priority);
        }
        Ok(())
    }
}
