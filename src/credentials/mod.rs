//! Ordered decryption credentials

pub mod cipher;

pub use cipher::*;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_credential_input, validate_priority};

/// Credential manager for a user's prioritized document passwords.
///
/// Secrets are sealed with the store's [`SecretCipher`] before they are
/// handed to storage.
pub struct CredentialStore<S: CredentialStorage> {
    storage: S,
    cipher: SecretCipher,
}

impl<S: CredentialStorage> CredentialStore<S> {
    /// Create a new credential store
    pub fn new(storage: S, cipher: SecretCipher) -> Self {
        Self { storage, cipher }
    }

    fn seal(&self, input: &CredentialInput) -> ImportResult<SealedCredential> {
        Ok(SealedCredential {
            priority: input.priority,
            sealed_secret: self.cipher.seal(&input.secret_value)?,
            label: input.label.clone(),
        })
    }

    /// List credentials ascending by priority, without their secrets
    pub async fn list(&self, user_id: &str) -> ImportResult<Vec<CredentialSummary>> {
        let mut credentials = self.storage.list_credentials(user_id).await?;
        credentials.sort_by_key(|c| c.priority);
        Ok(credentials.iter().map(Credential::summary).collect())
    }

    /// Set or replace the credential at one priority
    pub async fn set_one(
        &self,
        user_id: &str,
        priority: u8,
        secret_value: &str,
        label: &str,
    ) -> ImportResult<()> {
        let input = CredentialInput::new(priority, secret_value, label);
        validate_credential_input(&input)?;

        let sealed = self.seal(&input)?;
        self.storage.upsert_credentials(user_id, &[sealed]).await?;
        tracing::info!(user_id, priority, "credential saved");
        Ok(())
    }

    /// Set several credentials as one batch.
    ///
    /// Every entry is validated before anything is written. Entries with an
    /// empty secret are skipped; the rest are applied in ascending priority
    /// order, so a repeated priority keeps the value listed last.
    pub async fn set_many(&self, user_id: &str, inputs: &[CredentialInput]) -> ImportResult<()> {
        let mut batch: Vec<SealedCredential> = Vec::with_capacity(inputs.len());
        for input in inputs {
            validate_priority(input.priority)?;
            if input.secret_value.is_empty() {
                continue;
            }
            validate_credential_input(input)?;
            batch.push(self.seal(input)?);
        }

        if batch.is_empty() {
            return Ok(());
        }

        batch.sort_by_key(|input| input.priority);
        self.storage.upsert_credentials(user_id, &batch).await?;
        tracing::info!(user_id, count = batch.len(), "credentials saved");
        Ok(())
    }

    /// Remove the credential at a priority; an empty slot is not an error
    pub async fn delete_one(&self, user_id: &str, priority: u8) -> ImportResult<()> {
        validate_priority(priority)?;
        self.storage.delete_credential(user_id, priority).await?;
        tracing::info!(user_id, priority, "credential removed");
        Ok(())
    }

    /// Secrets in the order they should be tried.
    ///
    /// Empty slots are skipped and gaps left by deletions are not renumbered.
    /// A slot that cannot be opened with the current key is skipped too.
    pub async fn ordered_secrets(&self, user_id: &str) -> ImportResult<Vec<OrderedSecret>> {
        let mut credentials = self.storage.list_credentials(user_id).await?;
        credentials.sort_by_key(|c| c.priority);

        let mut secrets = Vec::with_capacity(credentials.len());
        for credential in credentials.iter().filter(|c| c.has_value()) {
            match self.cipher.open(&credential.sealed_secret) {
                Ok(value) => secrets.push(OrderedSecret::new(
                    SecretSource::Priority(credential.priority),
                    value,
                )),
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        priority = credential.priority,
                        error = %e,
                        "skipping unreadable credential"
                    );
                }
            }
        }
        Ok(secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    fn store() -> CredentialStore<MemoryStorage> {
        CredentialStore::new(MemoryStorage::new(), SecretCipher::from_passphrase("test-key"))
    }

    fn exposed(secrets: &[OrderedSecret]) -> Vec<&str> {
        secrets.iter().map(|s| s.value.expose()).collect()
    }

    #[tokio::test]
    async fn test_set_one_then_list_hides_secret() {
        let store = store();
        store.set_one("alice", 1, "abc", "primary").await.unwrap();

        let listed = store.list("alice").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].priority, 1);
        assert_eq!(listed[0].label, "primary");
        assert!(listed[0].has_value);

        let debug = format!("{:?}", listed);
        assert!(!debug.contains("abc"));
    }

    #[tokio::test]
    async fn test_set_one_rejects_out_of_range_priority() {
        let store = store();

        for priority in [0, 5] {
            let result = store.set_one("alice", priority, "abc", "").await;
            assert!(matches!(result, Err(ImportError::Validation(_))));
        }
        assert!(store.list("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_many_is_all_or_nothing() {
        let store = store();
        let inputs = vec![
            CredentialInput::new(1, "one", ""),
            CredentialInput::new(9, "nine", ""),
        ];

        assert!(store.set_many("alice", &inputs).await.is_err());
        assert!(store.list("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_many_skips_blank_slots_and_sorts() {
        let store = store();
        let inputs = vec![
            CredentialInput::new(3, "three", "c"),
            CredentialInput::new(2, "", "blank"),
            CredentialInput::new(1, "one", "a"),
        ];
        store.set_many("alice", &inputs).await.unwrap();

        let priorities: Vec<u8> = store
            .list("alice")
            .await
            .unwrap()
            .iter()
            .map(|c| c.priority)
            .collect();
        assert_eq!(priorities, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_leaves_gap() {
        let store = store();
        for (priority, secret) in [(1, "a"), (2, "b"), (3, "c")] {
            store.set_one("alice", priority, secret, "").await.unwrap();
        }

        store.delete_one("alice", 2).await.unwrap();
        store.delete_one("alice", 2).await.unwrap();
        store.delete_one("alice", 4).await.unwrap();

        let priorities: Vec<u8> = store
            .list("alice")
            .await
            .unwrap()
            .iter()
            .map(|c| c.priority)
            .collect();
        assert_eq!(priorities, vec![1, 3]);

        let secrets = store.ordered_secrets("alice").await.unwrap();
        assert_eq!(exposed(&secrets), vec!["a", "c"]);
        let sources: Vec<SecretSource> = secrets.iter().map(|s| s.source).collect();
        assert_eq!(
            sources,
            vec![SecretSource::Priority(1), SecretSource::Priority(3)]
        );
    }

    #[tokio::test]
    async fn test_ordered_secrets_ascending_regardless_of_insert_order() {
        let store = store();
        store.set_one("alice", 4, "four", "").await.unwrap();
        store.set_one("alice", 2, "two", "").await.unwrap();
        store.set_one("alice", 1, "one", "").await.unwrap();

        let secrets = store.ordered_secrets("alice").await.unwrap();
        assert_eq!(exposed(&secrets), vec!["one", "two", "four"]);
        assert!(store.ordered_secrets("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_secrets_are_sealed_at_rest() {
        let storage = MemoryStorage::new();
        let store = CredentialStore::new(storage.clone(), SecretCipher::from_passphrase("test-key"));
        store.set_one("alice", 1, "A123456789", "id").await.unwrap();

        let stored = storage.list_credentials("alice").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].sealed_secret.is_empty());
        assert_ne!(stored[0].sealed_secret, b"A123456789".to_vec());
        assert!(!String::from_utf8_lossy(&stored[0].sealed_secret).contains("A123456789"));

        let secrets = store.ordered_secrets("alice").await.unwrap();
        assert_eq!(exposed(&secrets), vec!["A123456789"]);
    }

    #[tokio::test]
    async fn test_unreadable_slots_are_skipped() {
        let storage = MemoryStorage::new();
        let old = CredentialStore::new(storage.clone(), SecretCipher::from_passphrase("old-key"));
        old.set_one("alice", 1, "stale", "").await.unwrap();

        let current = CredentialStore::new(storage.clone(), SecretCipher::from_passphrase("new-key"));
        current.set_one("alice", 2, "fresh", "").await.unwrap();

        let secrets = current.ordered_secrets("alice").await.unwrap();
        assert_eq!(exposed(&secrets), vec!["fresh"]);
        assert_eq!(secrets[0].source, SecretSource::Priority(2));
        assert_eq!(current.list("alice").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_multibyte_label_is_accepted() {
        let store = store();
        let label = "身分證後4碼".repeat(7);

        store.set_one("alice", 1, "A123", &label).await.unwrap();

        let listed = store.list("alice").await.unwrap();
        assert_eq!(listed[0].label, label);
    }
}
