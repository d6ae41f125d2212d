//! Per-document selection of candidates awaiting import

use std::collections::HashMap;

use crate::types::*;

/// Which candidates of each document are currently chosen for import.
///
/// Candidates are identified structurally by [`CandidateKey`], so two
/// occurrences sharing date, amount and description are one entry. Selection
/// is scoped to a filename and never spills into another document.
#[derive(Debug, Clone, Default)]
pub struct SelectionLedger {
    order: Vec<String>,
    selected: HashMap<String, Vec<AnnotatedCandidate>>,
}

impl SelectionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state for a run: novel candidates selected, duplicates not.
    ///
    /// Failed documents get an empty entry. Results sharing a filename are
    /// merged into one entry.
    pub fn from_results(results: &[IngestionResult]) -> Self {
        let mut ledger = Self::new();
        for result in results {
            ledger.ensure_document(&result.filename);
            for candidate in result.candidates.iter().filter(|c| !c.is_duplicate) {
                if !ledger.is_selected(&result.filename, candidate) {
                    ledger.push(&result.filename, candidate.clone());
                }
            }
        }
        ledger
    }

    /// Flip the selection of a candidate, returning whether it is now selected
    pub fn toggle(&mut self, filename: &str, candidate: &AnnotatedCandidate) -> bool {
        let key = candidate.key();
        self.ensure_document(filename);
        let entries = self.selected.entry(filename.to_string()).or_default();

        match entries.iter().position(|c| c.key() == key) {
            Some(index) => {
                entries.remove(index);
                false
            }
            None => {
                entries.push(candidate.clone());
                true
            }
        }
    }

    pub fn is_selected(&self, filename: &str, candidate: &AnnotatedCandidate) -> bool {
        let key = candidate.key();
        self.selected
            .get(filename)
            .is_some_and(|entries| entries.iter().any(|c| c.key() == key))
    }

    /// Total selected entries across all documents
    pub fn selected_count(&self) -> usize {
        self.selected.values().map(Vec::len).sum()
    }

    /// Selected entries of one document, in selection order
    pub fn selected_in(&self, filename: &str) -> &[AnnotatedCandidate] {
        self.selected
            .get(filename)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Union of every document's selection, in document order
    pub fn selected_candidates(&self) -> Vec<RawCandidate> {
        self.order
            .iter()
            .flat_map(|filename| self.selected_in(filename))
            .map(|c| c.candidate.clone())
            .collect()
    }

    /// Drop every selection and document
    pub fn reset(&mut self) {
        self.order.clear();
        self.selected.clear();
    }

    fn ensure_document(&mut self, filename: &str) {
        if !self.selected.contains_key(filename) {
            self.order.push(filename.to_string());
            self.selected.insert(filename.to_string(), Vec::new());
        }
    }

    fn push(&mut self, filename: &str, candidate: AnnotatedCandidate) {
        self.selected
            .entry(filename.to_string())
            .or_default()
            .push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn annotated(day: u32, amount: &str, description: &str, is_duplicate: bool) -> AnnotatedCandidate {
        AnnotatedCandidate {
            candidate: RawCandidate {
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                description: description.to_string(),
                amount: BigDecimal::from_str(amount).unwrap(),
                currency: "USD".to_string(),
                suggested_category: String::new(),
                source_card_suffix: String::new(),
            },
            is_duplicate,
        }
    }

    fn result(filename: &str, candidates: Vec<AnnotatedCandidate>) -> IngestionResult {
        IngestionResult::parsed(filename.to_string(), "bank".to_string(), candidates)
    }

    #[test]
    fn test_initial_state_excludes_duplicates() {
        let novel = annotated(1, "10", "A", false);
        let dup = annotated(2, "20", "B", true);
        let ledger = SelectionLedger::from_results(&[result("a.pdf", vec![novel.clone(), dup.clone()])]);

        assert!(ledger.is_selected("a.pdf", &novel));
        assert!(!ledger.is_selected("a.pdf", &dup));
        assert_eq!(ledger.selected_count(), 1);
    }

    #[test]
    fn test_duplicates_can_be_toggled_in() {
        let dup = annotated(2, "20", "B", true);
        let mut ledger = SelectionLedger::from_results(&[result("a.pdf", vec![dup.clone()])]);

        assert!(ledger.toggle("a.pdf", &dup));
        assert!(ledger.is_selected("a.pdf", &dup));
        assert!(!ledger.toggle("a.pdf", &dup));
        assert_eq!(ledger.selected_count(), 0);
    }

    #[test]
    fn test_identical_occurrences_share_one_entry() {
        let first = annotated(15, "100.50", "Test", false);
        let second = annotated(15, "100.5", "Test", false);
        let mut ledger =
            SelectionLedger::from_results(&[result("a.pdf", vec![first.clone(), second.clone()])]);

        assert_eq!(ledger.selected_count(), 1);

        assert!(!ledger.toggle("a.pdf", &second));
        assert!(!ledger.is_selected("a.pdf", &first));
        assert!(!ledger.is_selected("a.pdf", &second));
        assert_eq!(ledger.selected_count(), 0);

        assert!(ledger.toggle("a.pdf", &first));
        assert!(ledger.is_selected("a.pdf", &second));
        assert_eq!(ledger.selected_count(), 1);
    }

    #[test]
    fn test_selection_is_scoped_to_document() {
        let shared = annotated(3, "5", "Same", false);
        let mut ledger = SelectionLedger::from_results(&[
            result("a.pdf", vec![shared.clone()]),
            result("b.pdf", vec![shared.clone()]),
        ]);

        assert!(!ledger.toggle("a.pdf", &shared));
        assert!(!ledger.is_selected("a.pdf", &shared));
        assert!(ledger.is_selected("b.pdf", &shared));
        assert_eq!(ledger.selected_count(), 1);
    }

    #[test]
    fn test_selected_candidates_follow_document_order() {
        let a1 = annotated(1, "1", "a1", false);
        let b1 = annotated(2, "2", "b1", false);
        let a2 = annotated(3, "3", "a2", true);
        let mut ledger = SelectionLedger::from_results(&[
            result("a.pdf", vec![a1, a2.clone()]),
            result("b.pdf", vec![b1]),
        ]);
        ledger.toggle("a.pdf", &a2);

        let descriptions: Vec<String> = ledger
            .selected_candidates()
            .into_iter()
            .map(|c| c.description)
            .collect();
        assert_eq!(descriptions, vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn test_failed_document_contributes_nothing() {
        let failed = IngestionResult::failed(
            "locked.pdf".to_string(),
            &ImportError::DecryptionFailed {
                filename: "locked.pdf".to_string(),
            },
        );
        let ledger = SelectionLedger::from_results(&[failed]);

        assert_eq!(ledger.selected_count(), 0);
        assert!(ledger.selected_in("locked.pdf").is_empty());
        assert!(ledger.selected_in("never-seen.pdf").is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let novel = annotated(1, "10", "A", false);
        let mut ledger = SelectionLedger::from_results(&[result("a.pdf", vec![novel])]);
        ledger.reset();

        assert_eq!(ledger.selected_count(), 0);
        assert!(ledger.selected_candidates().is_empty());
    }
}
