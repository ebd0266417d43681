use crate::error::ExtractionError;
use crate::extractor::{Sample, SampleType};
use crate::rules::{Severity, ValidationFinding};
use crate::runtime::ExecutionResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything known about one sample after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleReport {
    pub sample: Sample,
    /// Absent in static-only runs and for samples that could not be prepared
    pub execution: Option<ExecutionResult>,
    /// Why the sample never reached execution
    pub preparation_error: Option<String>,
    pub findings: Vec<ValidationFinding>,
}

impl SampleReport {
    pub fn new(
        sample: Sample,
        execution: Option<ExecutionResult>,
        preparation_error: Option<String>,
        findings: Vec<ValidationFinding>,
    ) -> Self {
        Self {
            sample,
            execution,
            preparation_error,
            findings,
        }
    }

    pub fn execution_failed(&self) -> bool {
        self.execution.as_ref().is_some_and(|e| !e.success)
    }

    pub fn failed_findings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| !f.passed)
    }

    /// Failed execution, failed preparation, or a failed blocking finding.
    pub fn is_failure(&self) -> bool {
        self.execution_failed()
            || self.preparation_error.is_some()
            || self
                .failed_findings()
                .any(|f| f.severity == Severity::Blocking)
    }
}

/// One failed finding, addressed by file and line, as presented to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub rule_name: String,
    pub file: PathBuf,
    /// Opening fence line of the sample
    pub line: usize,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl Issue {
    pub fn location(&self) -> String {
        format!("{}:{}", self.file.display(), self.line)
    }

    fn sort_key(&self) -> (Severity, &str, &PathBuf, usize) {
        (self.severity, &self.rule_name, &self.file, self.line)
    }
}

/// A document that could not be fully scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionIssue {
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
}

impl From<&ExtractionError> for ExtractionIssue {
    fn from(err: &ExtractionError) -> Self {
        Self {
            file: err.file.clone(),
            line: err.line,
            message: err.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_samples: usize,
    pub executed: usize,
    pub execution_passed: usize,
    pub execution_failed: usize,
    pub preparation_failed: usize,
    /// Failed findings per severity
    pub findings_by_severity: BTreeMap<Severity, usize>,
    pub by_sample_type: BTreeMap<SampleType, TypeCounts>,
    pub extraction_errors: usize,
}

impl RunSummary {
    pub fn failed_findings(&self, severity: Severity) -> usize {
        self.findings_by_severity
            .get(&severity)
            .copied()
            .unwrap_or(0)
    }
}

/// All sample reports of one run, plus the prioritized issue list.
///
/// `issues` lists every failed finding, blocking before improvement, then by
/// rule name, file and line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub language: String,
    pub generated_at: String,
    pub static_only: bool,
    pub duration_seconds: f64,
    pub summary: RunSummary,
    pub issues: Vec<Issue>,
    pub extraction_errors: Vec<ExtractionIssue>,
    /// In document order
    pub samples: Vec<SampleReport>,
}

impl RunReport {
    pub fn new(
        language: &str,
        mut samples: Vec<SampleReport>,
        extraction_errors: &[ExtractionError],
        static_only: bool,
        duration_seconds: f64,
    ) -> Self {
        samples.sort_by(|a, b| {
            (&a.sample.source_file, a.sample.line_number)
                .cmp(&(&b.sample.source_file, b.sample.line_number))
        });

        let mut summary = RunSummary {
            total_samples: samples.len(),
            extraction_errors: extraction_errors.len(),
            ..Default::default()
        };
        let mut issues = Vec::new();

        for report in &samples {
            if let Some(ref execution) = report.execution {
                summary.executed += 1;
                if execution.success {
                    summary.execution_passed += 1;
                } else {
                    summary.execution_failed += 1;
                }
            }
            if report.preparation_error.is_some() {
                summary.preparation_failed += 1;
            }

            let counts = summary
                .by_sample_type
                .entry(report.sample.sample_type)
                .or_default();
            counts.total += 1;
            if report.is_failure() {
                counts.failed += 1;
            } else {
                counts.passed += 1;
            }

            for finding in report.failed_findings() {
                *summary
                    .findings_by_severity
                    .entry(finding.severity)
                    .or_insert(0) += 1;
                issues.push(Issue {
                    severity: finding.severity,
                    rule_name: finding.rule_name.clone(),
                    file: report.sample.source_file.clone(),
                    line: report.sample.line_number,
                    detail: finding.detail.clone(),
                    description: finding.description.clone(),
                    fix: finding.fix.clone(),
                });
            }
        }

        issues.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        Self {
            language: language.to_string(),
            generated_at: chrono::Local::now().to_rfc3339(),
            static_only,
            duration_seconds,
            summary,
            issues,
            extraction_errors: extraction_errors.iter().map(ExtractionIssue::from).collect(),
            samples,
        }
    }

    /// Zero blocking findings, zero execution failures, zero preparation failures.
    pub fn is_success(&self) -> bool {
        self.summary.failed_findings(Severity::Blocking) == 0
            && self.summary.execution_failed == 0
            && self.summary.preparation_failed == 0
    }

    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    /// Reports whose execution or preparation failed.
    pub fn failed_samples(&self) -> impl Iterator<Item = &SampleReport> {
        self.samples
            .iter()
            .filter(|r| r.execution_failed() || r.preparation_error.is_some())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extractor::tests::sample;

    pub(crate) fn finding(rule: &str, severity: Severity, passed: bool) -> ValidationFinding {
        ValidationFinding {
            rule_name: rule.to_string(),
            severity,
            passed,
            detail: format!("{} detail", rule),
            description: None,
            fix: Some(format!("fix {}", rule)),
        }
    }

    fn executed(success: bool) -> Option<ExecutionResult> {
        Some(ExecutionResult {
            success,
            ..Default::default()
        })
    }

    #[test]
    fn test_blocking_issues_listed_first() {
        let reports = vec![
            SampleReport::new(
                sample("docs/b.md", 9, "print(1)"),
                executed(true),
                None,
                vec![
                    finding("zeta", Severity::Improvement, false),
                    finding("alpha", Severity::Blocking, false),
                ],
            ),
            SampleReport::new(
                sample("docs/a.md", 30, "print(2)"),
                executed(true),
                None,
                vec![
                    finding("alpha", Severity::Improvement, false),
                    finding("alpha", Severity::Blocking, false),
                    finding("beta", Severity::Blocking, true),
                ],
            ),
            SampleReport::new(
                sample("docs/a.md", 3, "print(3)"),
                executed(true),
                None,
                vec![finding("alpha", Severity::Blocking, false)],
            ),
        ];
        let report = RunReport::new("python", reports, &[], false, 1.0);

        let order: Vec<(Severity, &str, String)> = report
            .issues
            .iter()
            .map(|i| (i.severity, i.rule_name.as_str(), i.location()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Severity::Blocking, "alpha", "docs/a.md:3".to_string()),
                (Severity::Blocking, "alpha", "docs/a.md:30".to_string()),
                (Severity::Blocking, "alpha", "docs/b.md:9".to_string()),
                (Severity::Improvement, "alpha", "docs/a.md:30".to_string()),
                (Severity::Improvement, "zeta", "docs/b.md:9".to_string()),
            ]
        );

        let last_blocking = report
            .issues
            .iter()
            .rposition(|i| i.severity == Severity::Blocking)
            .unwrap();
        let first_improvement = report
            .issues
            .iter()
            .position(|i| i.severity == Severity::Improvement)
            .unwrap();
        assert!(last_blocking < first_improvement);
    }

    #[test]
    fn test_summary_counts() {
        let reports = vec![
            SampleReport::new(sample("docs/a.md", 1, "a"), executed(true), None, vec![]),
            SampleReport::new(
                sample("docs/a.md", 5, "b"),
                executed(false),
                None,
                vec![finding("r", Severity::Improvement, false)],
            ),
            SampleReport::new(
                sample("docs/a.md", 9, "c"),
                None,
                Some("ambiguous sample shape".to_string()),
                vec![finding("r", Severity::Blocking, false)],
            ),
        ];
        let report = RunReport::new("python", reports, &[], false, 0.5);
        let summary = &report.summary;
        assert_eq!(summary.total_samples, 3);
        assert_eq!(summary.executed, 2);
        assert_eq!(summary.execution_passed, 1);
        assert_eq!(summary.execution_failed, 1);
        assert_eq!(summary.preparation_failed, 1);
        assert_eq!(summary.failed_findings(Severity::Blocking), 1);
        assert_eq!(summary.failed_findings(Severity::Improvement), 1);

        let sync = summary.by_sample_type[&SampleType::Sync];
        assert_eq!(sync.total, 3);
        assert_eq!(sync.passed, 1);
        assert_eq!(sync.failed, 2);
        assert!(!report.is_success());
        assert_eq!(report.failed_samples().count(), 2);
    }

    #[test]
    fn test_improvements_alone_do_not_fail_the_run() {
        let reports = vec![SampleReport::new(
            sample("docs/a.md", 1, "a"),
            executed(true),
            None,
            vec![finding("missing_api_key", Severity::Improvement, false)],
        )];
        let report = RunReport::new("python", reports, &[], false, 0.0);
        assert!(report.is_success());
        assert_eq!(report.issues_with(Severity::Improvement).count(), 1);
    }

    #[test]
    fn test_extraction_errors_are_recorded_not_fatal() {
        let errors = vec![ExtractionError::new("docs/broken.md", 12, "unclosed code fence")];
        let report = RunReport::new("python", Vec::new(), &errors, true, 0.0);
        assert_eq!(report.summary.extraction_errors, 1);
        assert_eq!(report.extraction_errors[0].line, 12);
        assert!(report.is_success());
    }

    #[test]
    fn test_samples_in_document_order() {
        let reports = vec![
            SampleReport::new(sample("docs/b.md", 1, "x"), None, None, vec![]),
            SampleReport::new(sample("docs/a.md", 20, "y"), None, None, vec![]),
            SampleReport::new(sample("docs/a.md", 4, "z"), None, None, vec![]),
        ];
        let report = RunReport::new("python", reports, &[], true, 0.0);
        let lines: Vec<usize> = report.samples.iter().map(|r| r.sample.line_number).collect();
        assert_eq!(lines, vec![4, 20, 1]);
    }
}
