//! Validation utilities

use crate::config::IngestionConfig;
use crate::types::*;

/// Validate that a credential priority falls inside the fixed slot range
pub fn validate_priority(priority: u8) -> ImportResult<()> {
    if !(MIN_CREDENTIAL_PRIORITY..=MAX_CREDENTIAL_PRIORITY).contains(&priority) {
        return Err(ImportError::Validation(format!(
            "priority must be between {} and {}, got {}",
            MIN_CREDENTIAL_PRIORITY, MAX_CREDENTIAL_PRIORITY, priority
        )));
    }
    Ok(())
}

/// Validate a single credential input
pub fn validate_credential_input(input: &CredentialInput) -> ImportResult<()> {
    validate_priority(input.priority)?;

    if input.secret_value.is_empty() {
        return Err(ImportError::Validation(format!(
            "password for priority {} cannot be empty",
            input.priority
        )));
    }

    Ok(())
}

/// Intake checks run on a document before any decryption attempt
pub fn validate_document(document: &SourceDocument, config: &IngestionConfig) -> ImportResult<()> {
    if document.filename.trim().is_empty() {
        return Err(ImportError::Validation(
            "Document filename cannot be empty".to_string(),
        ));
    }

    if !config
        .accepted_mime_types
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(&document.mime_type))
    {
        return Err(ImportError::Validation("not a PDF file".to_string()));
    }

    if document.raw_bytes.len() as u64 > config.max_document_bytes {
        return Err(ImportError::Validation(format!(
            "document exceeds the {} byte upload limit",
            config.max_document_bytes
        )));
    }

    Ok(())
}
