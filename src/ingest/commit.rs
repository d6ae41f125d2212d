//! Persisting selected candidates as ledger entries

use std::collections::HashMap;

use crate::traits::*;
use crate::types::*;

/// Turns approved candidates into imported ledger rows
pub struct ImportCommitter<S: TransactionStorage> {
    storage: S,
}

impl<S: TransactionStorage> ImportCommitter<S> {
    /// Create a new committer
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Import every candidate as one batch.
    ///
    /// An empty selection is rejected before storage is touched. Suggested
    /// category names are resolved to the user's category ids when they
    /// exist. Candidates are not re-checked for duplicates here: whatever
    /// the user selected is imported.
    pub async fn commit(
        &self,
        user_id: &str,
        candidates: &[RawCandidate],
    ) -> ImportResult<ImportSummary> {
        if candidates.is_empty() {
            return Err(ImportError::ImportRejected(
                "no transactions selected".to_string(),
            ));
        }

        let mut categories: HashMap<&str, Option<String>> = HashMap::new();
        let mut batch = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let name = candidate.suggested_category.as_str();
            let category_id = if name.is_empty() {
                None
            } else if let Some(cached) = categories.get(name) {
                cached.clone()
            } else {
                let found = self.storage.find_category_id(user_id, name).await?;
                categories.insert(name, found.clone());
                found
            };

            batch.push(NewTransaction::imported(candidate, category_id));
        }

        let ids = self
            .storage
            .insert_transactions(user_id, &batch)
            .await
            .map_err(|e| {
                tracing::error!(user_id, error = %e, "import batch rejected by storage");
                match e {
                    ImportError::Persistence(reason) => ImportError::Persistence(reason),
                    other => ImportError::Persistence(other.to_string()),
                }
            })?;

        tracing::info!(user_id, imported = ids.len(), "statement transactions imported");

        Ok(ImportSummary {
            imported_count: ids.len(),
            message: IMPORT_SUCCESS_MESSAGE.to_string(),
        })
    }
}
