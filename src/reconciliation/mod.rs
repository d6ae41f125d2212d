//! Duplicate reconciliation of statement candidates against the ledger

use std::collections::HashSet;

use crate::types::*;

/// Flags candidates that already exist in the ledger.
///
/// A candidate is a duplicate when a stored transaction has the same date,
/// the same amount and the same description (case-sensitive). Two genuinely
/// distinct transactions sharing all three cannot be told apart.
#[derive(Debug, Clone, Default)]
pub struct DuplicateReconciler {
    existing: HashSet<CandidateKey>,
}

impl DuplicateReconciler {
    /// Index a snapshot of the user's stored transactions
    pub fn new(existing: &[PersistedTransaction]) -> Self {
        Self {
            existing: existing.iter().map(PersistedTransaction::key).collect(),
        }
    }

    pub fn is_duplicate(&self, candidate: &RawCandidate) -> bool {
        self.existing.contains(&candidate.key())
    }

    /// Annotate candidates, keeping their order
    pub fn reconcile(&self, candidates: Vec<RawCandidate>) -> Vec<AnnotatedCandidate> {
        candidates
            .into_iter()
            .map(|candidate| AnnotatedCandidate {
                is_duplicate: self.is_duplicate(&candidate),
                candidate,
            })
            .collect()
    }
}

/// One-shot reconciliation against a snapshot
pub fn reconcile(
    candidates: Vec<RawCandidate>,
    existing: &[PersistedTransaction],
) -> Vec<AnnotatedCandidate> {
    DuplicateReconciler::new(existing).reconcile(candidates)
}
