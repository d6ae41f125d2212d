//! Ingestion orchestrator that coordinates credentials, decryption, parsing,
//! reconciliation and import

use std::sync::Arc;

use crate::config::IngestionConfig;
use crate::credentials::CredentialStore;
use crate::ingest::{DocumentDecryptor, ImportCommitter, SelectionLedger};
use crate::reconciliation::DuplicateReconciler;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_document;

/// Main entry point for statement ingestion
pub struct IngestionOrchestrator<S>
where
    S: TransactionStorage + CredentialStorage + Clone,
{
    storage: S,
    credentials: CredentialStore<S>,
    committer: ImportCommitter<S>,
    decryptor: DocumentDecryptor,
    parser: Arc<dyn StatementParser>,
    config: Arc<IngestionConfig>,
}

impl<S> IngestionOrchestrator<S>
where
    S: TransactionStorage + CredentialStorage + Clone,
{
    /// Create an orchestrator with the default configuration
    pub fn new(
        storage: S,
        unlocker: Arc<dyn DocumentUnlocker>,
        parser: Arc<dyn StatementParser>,
    ) -> Self {
        Self::with_config(storage, unlocker, parser, IngestionConfig::default())
    }

    /// Create an orchestrator with a custom configuration
    pub fn with_config(
        storage: S,
        unlocker: Arc<dyn DocumentUnlocker>,
        parser: Arc<dyn StatementParser>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            credentials: CredentialStore::new(storage.clone(), config.secret_cipher()),
            committer: ImportCommitter::new(storage.clone()),
            storage,
            decryptor: DocumentDecryptor::new(unlocker),
            parser,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub fn committer(&self) -> &ImportCommitter<S> {
        &self.committer
    }

    // Credential operations
    /// List a user's credentials without their secrets
    pub async fn list_credentials(&self, user_id: &str) -> ImportResult<Vec<CredentialSummary>> {
        self.credentials.list(user_id).await
    }

    /// Set one credential slot
    pub async fn set_credential(&self, user_id: &str, input: &CredentialInput) -> ImportResult<()> {
        self.credentials
            .set_one(
                user_id,
                input.priority,
                input.secret_value.expose(),
                &input.label,
            )
            .await
    }

    /// Set several credential slots as one batch
    pub async fn set_credentials(
        &self,
        user_id: &str,
        inputs: &[CredentialInput],
    ) -> ImportResult<()> {
        self.credentials.set_many(user_id, inputs).await
    }

    /// Clear a credential slot
    pub async fn delete_credential(&self, user_id: &str, priority: u8) -> ImportResult<()> {
        self.credentials.delete_one(user_id, priority).await
    }

    // Ingestion operations
    /// Decrypt, parse and reconcile a batch of documents.
    ///
    /// Returns one result per document in submission order. A document that
    /// fails intake, decryption or parsing gets its `parse_error` set and
    /// never affects its siblings. If the user's credentials or stored
    /// transactions cannot be loaded, every document reports that error.
    /// Only an empty batch fails the whole call.
    pub async fn submit_ingestion(
        &self,
        user_id: &str,
        documents: Vec<SourceDocument>,
    ) -> ImportResult<Vec<IngestionResult>> {
        if documents.is_empty() {
            return Err(ImportError::Validation(
                "no documents submitted".to_string(),
            ));
        }

        tracing::info!(user_id, documents = documents.len(), "ingestion started");

        let (secrets, snapshot) = match self.load_user_state(user_id).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(user_id, error = %e, "could not load user state for ingestion");
                return Ok(documents
                    .into_iter()
                    .map(|document| IngestionResult::failed(document.filename, &e))
                    .collect());
            }
        };
        let secrets = Arc::new(secrets);
        let reconciler = DuplicateReconciler::new(&snapshot);

        let mut tasks = Vec::with_capacity(documents.len());
        for document in documents {
            let filename = document.filename.clone();
            let decryptor = self.decryptor.clone();
            let parser = Arc::clone(&self.parser);
            let config = Arc::clone(&self.config);
            let secrets = Arc::clone(&secrets);

            let handle = tokio::task::spawn_blocking(move || {
                process_document(&document, &decryptor, parser.as_ref(), &config, &secrets)
            });
            tasks.push((filename, handle));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (filename, handle) in tasks {
            let outcome = handle.await.unwrap_or_else(|e| {
                Err(ImportError::Parse(format!(
                    "document processing aborted: {}",
                    e
                )))
            });

            let result = match outcome {
                Ok(parsed) => {
                    let candidates = reconciler.reconcile(parsed.candidates);
                    tracing::debug!(
                        filename = %filename,
                        bank = %parsed.bank_identifier,
                        candidates = candidates.len(),
                        duplicates = candidates.iter().filter(|c| c.is_duplicate).count(),
                        "document parsed"
                    );
                    IngestionResult::parsed(filename, parsed.bank_identifier, candidates)
                }
                Err(e) => {
                    tracing::warn!(filename = %filename, error = %e, "document skipped");
                    IngestionResult::failed(filename, &e)
                }
            };
            results.push(result);
        }

        tracing::info!(
            user_id,
            documents = results.len(),
            failed = results.iter().filter(|r| r.is_failed()).count(),
            "ingestion finished"
        );
        Ok(results)
    }

    async fn load_user_state(
        &self,
        user_id: &str,
    ) -> ImportResult<(Vec<OrderedSecret>, Vec<PersistedTransaction>)> {
        let secrets = self.credentials.ordered_secrets(user_id).await?;
        let snapshot = self
            .storage
            .fetch_transactions_for_reconciliation(user_id)
            .await?;
        Ok((secrets, snapshot))
    }

    /// Run ingestion and wrap the results in a fresh selection session
    pub async fn start_session(
        &self,
        user_id: &str,
        documents: Vec<SourceDocument>,
    ) -> ImportResult<IngestionSession> {
        let results = self.submit_ingestion(user_id, documents).await?;
        Ok(IngestionSession::new(results))
    }

    /// Import the given candidates as new ledger entries
    pub async fn commit_import(
        &self,
        user_id: &str,
        candidates: &[RawCandidate],
    ) -> ImportResult<ImportSummary> {
        self.committer.commit(user_id, candidates).await
    }
}

fn process_document(
    document: &SourceDocument,
    decryptor: &DocumentDecryptor,
    parser: &dyn StatementParser,
    config: &IngestionConfig,
    secrets: &[OrderedSecret],
) -> ImportResult<ParsedStatement> {
    validate_document(document, config)?;

    let mut credentials = secrets.to_vec();
    credentials.extend(config.passwords_for_file(&document.filename));

    let unlocked = decryptor.decrypt(document, &credentials)?;
    parser.parse(&unlocked)
}

/// Results of one ingestion run together with the user's selection
#[derive(Debug, Clone, Default)]
pub struct IngestionSession {
    results: Vec<IngestionResult>,
    selection: SelectionLedger,
}

impl IngestionSession {
    /// Start a session with the initial selection for these results
    pub fn new(results: Vec<IngestionResult>) -> Self {
        let selection = SelectionLedger::from_results(&results);
        Self { results, selection }
    }

    pub fn results(&self) -> &[IngestionResult] {
        &self.results
    }

    pub fn selection(&self) -> &SelectionLedger {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionLedger {
        &mut self.selection
    }

    /// Commit the current selection and, on success, start over
    pub async fn commit<S: TransactionStorage>(
        &mut self,
        committer: &ImportCommitter<S>,
        user_id: &str,
    ) -> ImportResult<ImportSummary> {
        let candidates = self.selection.selected_candidates();
        let summary = committer.commit(user_id, &candidates).await?;
        self.reset();
        Ok(summary)
    }

    /// Discard the results and every selection
    pub fn reset(&mut self) {
        self.results.clear();
        self.selection.reset();
    }
}
