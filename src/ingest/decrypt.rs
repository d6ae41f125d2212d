//! Ordered password fallback for protected documents

use std::sync::Arc;

use crate::traits::*;
use crate::types::*;

/// Opens documents by trying passwords in priority order
#[derive(Clone)]
pub struct DocumentDecryptor {
    unlocker: Arc<dyn DocumentUnlocker>,
}

impl DocumentDecryptor {
    /// Create a new decryptor around an unlocker
    pub fn new(unlocker: Arc<dyn DocumentUnlocker>) -> Self {
        Self { unlocker }
    }

    /// Unlock a document.
    ///
    /// A document that does not advertise protection is opened without a
    /// password first. If it is protected, or that open fails, each
    /// credential is tried in the given order and the first success wins.
    pub fn decrypt(
        &self,
        document: &SourceDocument,
        ordered_credentials: &[OrderedSecret],
    ) -> ImportResult<Vec<u8>> {
        let bytes = document.raw_bytes.as_slice();

        if !self.unlocker.is_encrypted(bytes) {
            match self.unlocker.unlock(bytes, None) {
                Ok(unlocked) => return Ok(unlocked),
                Err(e) => {
                    tracing::debug!(
                        filename = %document.filename,
                        error = %e,
                        "open without password failed, trying credentials"
                    );
                }
            }
        }

        for secret in ordered_credentials {
            match self.unlocker.unlock(bytes, Some(secret.value.expose())) {
                Ok(unlocked) => {
                    tracing::info!(
                        filename = %document.filename,
                        source = %secret.source,
                        "document unlocked"
                    );
                    return Ok(unlocked);
                }
                Err(UnlockError::Malformed(reason)) => {
                    tracing::warn!(filename = %document.filename, %reason, "unlock attempt failed");
                }
                Err(_) => {}
            }
        }

        tracing::warn!(
            filename = %document.filename,
            attempts = ordered_credentials.len(),
            "no credential unlocked the document"
        );
        Err(ImportError::DecryptionFailed {
            filename: document.filename.clone(),
        })
    }
}
