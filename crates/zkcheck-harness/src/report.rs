//! Verdict computation and the human-readable run report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use zkcheck_browser::Checkpoint;
use zkcheck_core::{LogEvent, ResourceResult, StepResult, StepStatus, Verdict};

use crate::correlate::{CorrelatedView, Correlation};
use crate::session::FinishedSession;

const RULE: &str = "============================================================";

/// Combines probe results and correlator output into a verdict
#[derive(Debug, Clone)]
pub struct VerificationReporter {
    evidence_tail: usize,
}

impl VerificationReporter {
    /// `evidence_tail` bounds the raw events appended to the evidence
    pub fn new(evidence_tail: usize) -> Self {
        Self { evidence_tail }
    }

    /// Compute the verdict for a finished run
    ///
    /// With no resources configured, `resource_ok` is vacuously true.
    pub fn report(
        &self,
        resources: &[ResourceResult],
        correlation: &Correlation,
        session: &FinishedSession,
    ) -> Verdict {
        let resource_ok = resources.iter().all(|r| r.ok);

        let mut evidence: BTreeMap<u64, LogEvent> = BTreeMap::new();
        for event in correlation
            .related
            .iter()
            .chain(session.tail(self.evidence_tail))
        {
            evidence.entry(event.sequence).or_insert_with(|| event.clone());
        }

        Verdict::new(
            resource_ok,
            correlation.signal_present,
            evidence.into_values().collect(),
        )
    }

    /// Verdict plus everything an operator needs to read it
    pub fn build(
        &self,
        resources: Vec<ResourceResult>,
        steps: Vec<StepResult>,
        correlation: Correlation,
        session: &FinishedSession,
    ) -> Report {
        let verdict = self.report(&resources, &correlation, session);

        Report {
            generated_at: Utc::now(),
            verdict,
            resources,
            steps,
            marker_phrase: correlation.marker_phrase,
            views: correlation.views,
            recent: session.tail(self.evidence_tail).to_vec(),
            checkpoints: session.checkpoints().to_vec(),
        }
    }
}

/// Complete output of one run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub verdict: Verdict,
    pub resources: Vec<ResourceResult>,
    pub steps: Vec<StepResult>,
    pub marker_phrase: String,
    pub views: Vec<CorrelatedView>,
    /// Trailing raw console window
    pub recent: Vec<LogEvent>,
    pub checkpoints: Vec<Checkpoint>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.verdict.overall_ok
    }

    /// Plain-text rendering for the terminal
    pub fn render(&self) -> String {
        let mut out = String::new();

        section(&mut out, "CIRCUIT FILES");
        if self.resources.is_empty() {
            out.push_str("(no resources configured)\n");
        }
        for resource in &self.resources {
            let size = resource
                .content_length
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let _ = write!(out, "  {}: {} ({} bytes)", resource.name, resource.status, size);
            if let Some(error) = &resource.error {
                let _ = write!(out, " - {}", error);
            }
            out.push('\n');
        }

        section(&mut out, "WORKFLOW STEPS");
        for (idx, result) in self.steps.iter().enumerate() {
            let _ = write!(out, "  {}. {}: {}", idx + 1, result.step.name, result.status());
            if result.status() == StepStatus::Failed {
                if let Some(error) = &result.error {
                    let _ = write!(out, " ({})", error);
                }
            }
            out.push('\n');
        }

        for view in &self.views {
            section(&mut out, &format!("{} LOGS", view.name.to_uppercase()));
            if view.events.is_empty() {
                out.push_str("(no matching logs captured)\n");
            }
            for event in &view.events {
                let _ = writeln!(out, "{}", event);
            }
        }

        section(&mut out, &format!("ALL CONSOLE LOGS (last {})", self.recent.len()));
        for event in &self.recent {
            let _ = writeln!(out, "{}", event);
        }

        if !self.checkpoints.is_empty() {
            section(&mut out, "SCREENSHOTS");
            for checkpoint in &self.checkpoints {
                let _ = writeln!(out, "  {}", checkpoint.path.display());
            }
        }

        section(&mut out, "VERIFICATION SUMMARY");
        let _ = writeln!(
            out,
            "  Circuit files accessible: {}",
            yes_no(self.verdict.resource_ok)
        );
        let _ = writeln!(
            out,
            "  {}: {}",
            self.marker_phrase,
            yes_no(self.verdict.signal_present)
        );
        out.push('\n');
        if self.verdict.overall_ok {
            out.push_str("  ZK integration is properly set up.\n");
        } else {
            out.push_str("  Some components are missing.\n");
        }

        out
    }
}

fn section(out: &mut String, title: &str) {
    let _ = write!(out, "\n{}\n{}:\n{}\n", RULE, title, RULE);
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::KeywordCorrelator;
    use crate::session::Session;
    use crate::testing::FakePage;
    use std::sync::Arc;
    use zkcheck_core::{KeywordSet, KeywordView, ResourceCheck, Severity};

    fn ok_resource(url: &str) -> ResourceResult {
        ResourceResult::from_response(&ResourceCheck::new(url), url, 200, Some(10), None)
    }

    fn finished(lines: &[&str]) -> FinishedSession {
        let page = Arc::new(FakePage::new());
        let session = Session::open(page.clone()).unwrap();
        for line in lines {
            page.emit(Severity::Log, *line);
        }
        session.finish()
    }

    fn correlator() -> KeywordCorrelator {
        KeywordCorrelator::new(
            vec![KeywordView {
                name: "poseidon".to_string(),
                keywords: KeywordSet::new(["poseidon", "commitment"]),
            }],
            "Poseidon note created",
        )
    }

    #[test]
    fn test_verdict_requires_both_conditions() {
        let session = finished(&["Poseidon note created: 0xabc"]);
        let correlation = correlator().project(session.events());
        let reporter = VerificationReporter::new(30);

        let pass = reporter.report(&[ok_resource("/a.wasm")], &correlation, &session);
        assert!(pass.overall_ok);

        let missing = ResourceResult::from_response(
            &ResourceCheck::new("/a.wasm"),
            "/a.wasm",
            404,
            None,
            None,
        );
        let fail = reporter.report(&[missing], &correlation, &session);
        assert!(!fail.resource_ok);
        assert!(fail.signal_present);
        assert!(!fail.overall_ok);
    }

    #[test]
    fn test_no_resources_is_vacuously_ok() {
        let session = finished(&[]);
        let correlation = correlator().project(session.events());
        let verdict = VerificationReporter::new(30).report(&[], &correlation, &session);
        assert!(verdict.resource_ok);
        assert!(!verdict.signal_present);
        assert!(verdict.evidence.is_empty());
    }

    #[test]
    fn test_evidence_merges_related_and_tail() {
        let session = finished(&[
            "commitment computed",
            "unrelated 1",
            "unrelated 2",
            "poseidon ready",
            "unrelated 3",
        ]);
        let correlation = correlator().project(session.events());
        let verdict = VerificationReporter::new(2).report(&[], &correlation, &session);

        let sequences: Vec<u64> = verdict.evidence.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 3, 4]);
    }

    #[test]
    fn test_render_layout() {
        let session = finished(&["Poseidon note created"]);
        let correlation = correlator().project(session.events());
        let report = VerificationReporter::new(30).build(
            vec![ok_resource("/circuits/deposit.wasm")],
            Vec::new(),
            correlation,
            &session,
        );

        let text = report.render();
        assert!(text.contains("deposit.wasm: 200 (10 bytes)"));
        assert!(text.contains("POSEIDON LOGS:"));
        assert!(text.contains("ALL CONSOLE LOGS (last 1)"));
        assert!(text.contains("Circuit files accessible: YES"));
        assert!(text.contains("Poseidon note created: YES"));
        assert!(report.passed());
    }

    #[test]
    fn test_render_empty_view() {
        let session = finished(&["hello"]);
        let correlation = correlator().project(session.events());
        let report = VerificationReporter::new(30).build(Vec::new(), Vec::new(), correlation, &session);

        let text = report.render();
        assert!(text.contains("(no matching logs captured)"));
        assert!(text.contains("Poseidon note created: NO"));
    }

    #[test]
    fn test_report_serializes() {
        let session = finished(&["Poseidon note created"]);
        let correlation = correlator().project(session.events());
        let report = VerificationReporter::new(30).build(Vec::new(), Vec::new(), correlation, &session);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["verdict"]["overall_ok"], true);
        assert_eq!(json["marker_phrase"], "Poseidon note created");
    }
}
