//! Keyword correlation over captured console output
//!
//! The app has no structured telemetry, so internal progress (note creation,
//! commitment, proof generation) is inferred from console text. Fuzzy keyword
//! views are for the operator; only the exact marker phrase decides the
//! verdict, since a keyword can just as well appear in an error message.

use serde::Serialize;
use zkcheck_core::{KeywordSet, KeywordView, LogEvent};

/// Events whose text contains any keyword, ignoring case, in original order
pub fn correlate(events: &[LogEvent], keywords: &KeywordSet) -> Vec<LogEvent> {
    events
        .iter()
        .filter(|event| keywords.matches(&event.text))
        .cloned()
        .collect()
}

/// Whether any event contains `phrase` as a substring, ignoring case
///
/// An empty phrase never signals.
pub fn signal_present(events: &[LogEvent], phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let needle = phrase.to_lowercase();
    events
        .iter()
        .any(|event| event.text.to_lowercase().contains(&needle))
}

/// One keyword view applied to the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrelatedView {
    pub name: String,
    pub keywords: Vec<String>,
    pub events: Vec<LogEvent>,
}

/// Correlator output for a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correlation {
    /// Per-view filtered logs
    pub views: Vec<CorrelatedView>,
    /// Events matching any view
    pub related: Vec<LogEvent>,
    pub marker_phrase: String,
    pub signal_present: bool,
}

/// Projects a log onto keyword views and the marker signal
#[derive(Debug, Clone)]
pub struct KeywordCorrelator {
    views: Vec<KeywordView>,
    marker_phrase: String,
}

impl KeywordCorrelator {
    pub fn new(views: Vec<KeywordView>, marker_phrase: impl Into<String>) -> Self {
        Self {
            views,
            marker_phrase: marker_phrase.into(),
        }
    }

    pub fn marker_phrase(&self) -> &str {
        &self.marker_phrase
    }

    pub fn project(&self, events: &[LogEvent]) -> Correlation {
        let views = self
            .views
            .iter()
            .map(|view| CorrelatedView {
                name: view.name.clone(),
                keywords: view.keywords.iter().map(str::to_string).collect(),
                events: correlate(events, &view.keywords),
            })
            .collect();

        let all_keywords = KeywordSet::new(self.views.iter().flat_map(|v| v.keywords.iter()));

        Correlation {
            views,
            related: correlate(events, &all_keywords),
            marker_phrase: self.marker_phrase.clone(),
            signal_present: signal_present(events, &self.marker_phrase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use zkcheck_core::Severity;

    fn events(texts: &[&str]) -> Vec<LogEvent> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| LogEvent {
                sequence: i as u64,
                severity: Severity::Log,
                text: text.to_string(),
                timestamp: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_correlate_is_ordered_subset() {
        let log = events(&[
            "Generating commitment",
            "React devtools available",
            "Poseidon initialized",
            "Fetching /circuits/deposit.wasm",
            "commitment stored",
        ]);
        let keywords = KeywordSet::new(["poseidon", "commitment"]);

        let matched = correlate(&log, &keywords);
        let sequences: Vec<u64> = matched.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 2, 4]);
        assert!(matched.iter().all(|e| log.contains(e)));
    }

    #[test]
    fn test_correlate_case_permutations_match_identically() {
        let log = events(&["ZK proof generated", "zk worker ready", "nothing here"]);
        let lower = correlate(&log, &KeywordSet::new(["zk"]));
        let upper = correlate(&log, &KeywordSet::new(["ZK"]));
        let mixed = correlate(&log, &KeywordSet::new(["Zk"]));
        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
        assert_eq!(lower.len(), 2);
    }

    #[test]
    fn test_correlate_empty_keywords() {
        let log = events(&["anything"]);
        assert!(correlate(&log, &KeywordSet::default()).is_empty());
    }

    #[test]
    fn test_signal_present() {
        let log = events(&["Poseidon initialized", "[deposit] POSEIDON NOTE CREATED: 0xab12"]);
        assert!(signal_present(&log, "Poseidon note created"));
        assert!(!signal_present(&log, "Proof verified"));
        assert!(!signal_present(&[], "Poseidon note created"));
        assert!(!signal_present(&log, ""));
    }

    #[test]
    fn test_signal_requires_whole_phrase() {
        let log = events(&["Poseidon note creation failed"]);
        assert!(!signal_present(&log, "Poseidon note created"));
        assert!(!correlate(&log, &KeywordSet::new(["poseidon"])).is_empty());
    }

    #[test]
    fn test_project_views() {
        let correlator = KeywordCorrelator::new(
            vec![
                KeywordView::new("poseidon", ["poseidon", "commitment"]),
                KeywordView::new("zk-proof", ["proof", "snark"]),
            ],
            "Poseidon note created",
        );
        let log = events(&[
            "Poseidon note created",
            "snarkjs loaded",
            "unrelated",
            "proof for commitment ready",
        ]);

        let correlation = correlator.project(&log);
        assert!(correlation.signal_present);
        assert_eq!(correlation.views.len(), 2);
        assert_eq!(correlation.views[0].events.len(), 2);
        assert_eq!(correlation.views[1].events.len(), 2);

        let related: Vec<u64> = correlation.related.iter().map(|e| e.sequence).collect();
        assert_eq!(related, vec![0, 1, 3]);
    }
}
