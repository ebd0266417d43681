use crate::report::{Issue, RunReport, SampleReport};
use crate::rules::Severity;
use anyhow::{Context, Result};
use chrono::Local;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

/// Formats a line with mdBook-style timestamp, level and prefix.
fn format_line(level: &str, message: &str) -> String {
    format!(
        "{} [{}] (doc_sample_check): {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

fn error(message: &str) {
    eprintln!("{}", format_line("ERROR", message));
}

fn info(message: &str) {
    eprintln!("{}", format_line("INFO", message));
}

/// Reports the approval error to stderr.
pub fn report_approval_error(config_path: &Path) {
    error(&format!(
        "{} not approved for code execution",
        config_path.display()
    ));
    error("");
    error("For security, doc-sample-check requires explicit approval before");
    error("running the commands named in its configuration.");
    error("");
    error("To approve this configuration after reviewing it:");
    error(&format!(
        "  doc-sample-check allow --config {}",
        config_path.display()
    ));
    error("");
    error("Static-only runs (--static) do not need approval.");
}

/// Prints every sample that failed preparation or execution to stderr,
/// followed by its code.
pub fn report_failed_samples(report: &RunReport) {
    let failed: Vec<&SampleReport> = report.failed_samples().collect();
    if failed.is_empty() {
        return;
    }

    for sample_report in &failed {
        let sample = &sample_report.sample;
        match sample_report.preparation_error {
            Some(_) => error("Sample could not be prepared"),
            None => error("Sample execution failed"),
        }
        error(&format!("Location: {}", sample.location()));
        error(&format!("Type: {}", sample.sample_type));
        error("");

        if let Some(ref reason) = sample_report.preparation_error {
            error(reason);
        }
        if let Some(ref execution) = sample_report.execution {
            for line in execution.error_message.lines() {
                error(line);
            }
            if !execution.stderr.trim().is_empty() {
                error("");
                error("stderr:");
                for line in execution.stderr.lines() {
                    error(line);
                }
            }
        }

        error("");
        error("Sample:");
        error(&format!("```{}", sample.language));
        for line in sample.code.lines() {
            error(line);
        }
        error("```");
        error("");
    }

    error(&format!(
        "{} {} sample(s) failed to run",
        failed.len(),
        report.language
    ));
}

/// Prints the one-screen run summary to stderr.
///
/// Shows:
/// - Samples checked, with passed/failed counts per sample type
/// - Execution and preparation failures, failed findings by severity
/// - Total wall-clock time and average execution time per sample
/// - Per-type execution timing (RUST_LOG=debug)
pub fn print_run_statistics(report: &RunReport) {
    let summary = &report.summary;

    if summary.total_samples == 0 {
        info(&format!("No {} samples found to check", report.language));
    } else {
        let by_type = summary
            .by_sample_type
            .iter()
            .map(|(sample_type, counts)| {
                format!(
                    "{}: {} passed, {} failed",
                    sample_type, counts.passed, counts.failed
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        info(&format!(
            "Checked {} {} sample(s) ({})",
            summary.total_samples, report.language, by_type
        ));
    }

    if report.static_only {
        info("Static-only run: execution skipped");
    } else {
        info(&format!(
            "Executed {}: {} passed, {} failed",
            summary.executed, summary.execution_passed, summary.execution_failed
        ));
    }
    if summary.preparation_failed > 0 {
        info(&format!(
            "{} sample(s) could not be prepared",
            summary.preparation_failed
        ));
    }
    if summary.extraction_errors > 0 {
        info(&format!(
            "{} extraction error(s) recorded",
            summary.extraction_errors
        ));
    }
    info(&format!(
        "Findings: {} blocking, {} improvement",
        summary.failed_findings(Severity::Blocking),
        summary.failed_findings(Severity::Improvement)
    ));

    let executed: Vec<f64> = report
        .samples
        .iter()
        .filter_map(|r| r.execution.as_ref().map(|e| e.duration_seconds))
        .collect();
    let avg_ms = if executed.is_empty() {
        0
    } else {
        (executed.iter().sum::<f64>() * 1000.0 / executed.len() as f64) as u128
    };
    info(&format!(
        "Run finished in {}ms (avg {}ms per sample)",
        (report.duration_seconds * 1000.0) as u128,
        avg_ms
    ));

    log::debug!("Timing breakdown by sample type:");
    for sample_type in summary.by_sample_type.keys() {
        let durations: Vec<f64> = report
            .samples
            .iter()
            .filter(|r| r.sample.sample_type == *sample_type)
            .filter_map(|r| r.execution.as_ref().map(|e| e.duration_seconds))
            .collect();
        if durations.is_empty() {
            continue;
        }
        let type_avg_ms = durations.iter().sum::<f64>() * 1000.0 / durations.len() as f64;
        log::debug!(
            "  {}: avg {}ms over {} samples",
            sample_type,
            type_avg_ms as u128,
            durations.len()
        );
    }
}

fn report_path(dir: &Path, language: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}_sample_report.{}", language, extension))
}

/// Writes the full report as JSON to `<dir>/<language>_sample_report.json`.
pub fn write_json(report: &RunReport, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let path = report_path(dir, &report.language, "json");
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Writes the Markdown summary to `<dir>/<language>_sample_report.md`.
pub fn write_markdown(report: &RunReport, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let path = report_path(dir, &report.language, "md");
    let markdown = render_markdown(report).context("Failed to render Markdown report")?;
    fs::write(&path, markdown)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Renders the prioritized human-readable summary.
///
/// Blocking findings come first, grouped by rule name; each entry carries
/// its `file:line`, the offending text and the rule's fix.
pub fn render_markdown(report: &RunReport) -> Result<String, fmt::Error> {
    let summary = &report.summary;
    let mut out = String::new();

    writeln!(out, "# {} sample report\n", report.language)?;
    writeln!(out, "Generated: {}\n", report.generated_at)?;
    writeln!(
        out,
        "**Status: {}**\n",
        if report.is_success() { "PASSED" } else { "FAILED" }
    )?;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "| Metric | Count |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Samples | {} |", summary.total_samples)?;
    if report.static_only {
        writeln!(out, "| Executed | skipped (static-only) |")?;
    } else {
        writeln!(out, "| Executed | {} |", summary.executed)?;
        writeln!(out, "| Execution passed | {} |", summary.execution_passed)?;
        writeln!(out, "| Execution failed | {} |", summary.execution_failed)?;
    }
    writeln!(out, "| Preparation failed | {} |", summary.preparation_failed)?;
    writeln!(
        out,
        "| Blocking findings | {} |",
        summary.failed_findings(Severity::Blocking)
    )?;
    writeln!(
        out,
        "| Improvement findings | {} |",
        summary.failed_findings(Severity::Improvement)
    )?;
    writeln!(out, "| Extraction errors | {} |\n", summary.extraction_errors)?;

    if !summary.by_sample_type.is_empty() {
        writeln!(out, "### By sample type\n")?;
        writeln!(out, "| Type | Total | Passed | Failed |")?;
        writeln!(out, "|---|---|---|---|")?;
        for (sample_type, counts) in &summary.by_sample_type {
            writeln!(
                out,
                "| {} | {} | {} | {} |",
                sample_type, counts.total, counts.passed, counts.failed
            )?;
        }
        writeln!(out)?;
    }

    render_issues(&mut out, report, Severity::Blocking, "Blocking issues")?;
    render_issues(&mut out, report, Severity::Improvement, "Improvements")?;

    let failed: Vec<&SampleReport> = report.failed_samples().collect();
    if !failed.is_empty() {
        writeln!(out, "## Failed samples\n")?;
        for sample_report in failed {
            let reason = match (&sample_report.preparation_error, &sample_report.execution) {
                (Some(reason), _) => reason.as_str(),
                (None, Some(execution)) => execution.error_message.as_str(),
                (None, None) => "",
            };
            writeln!(
                out,
                "- `{}` ({}): {}",
                sample_report.sample.location(),
                sample_report.sample.sample_type,
                reason
            )?;
        }
        writeln!(out)?;
    }

    if !report.extraction_errors.is_empty() {
        writeln!(out, "## Extraction errors\n")?;
        for e in &report.extraction_errors {
            writeln!(out, "- `{}:{}`: {}", e.file.display(), e.line, e.message)?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

fn render_issues(
    out: &mut impl fmt::Write,
    report: &RunReport,
    severity: Severity,
    title: &str,
) -> fmt::Result {
    let issues: Vec<&Issue> = report.issues_with(severity).collect();
    if issues.is_empty() {
        return Ok(());
    }

    writeln!(out, "## {} ({})\n", title, issues.len())?;
    // Issues arrive sorted by rule name, so groups are contiguous
    for group in issues.chunk_by(|a, b| a.rule_name == b.rule_name) {
        let first = group[0];
        writeln!(out, "### {} ({})\n", first.rule_name, group.len())?;
        if let Some(ref description) = first.description {
            writeln!(out, "{}\n", description)?;
        }
        for issue in group {
            writeln!(out, "- `{}`: {}", issue.location(), issue.detail)?;
        }
        if let Some(ref fix) = first.fix {
            writeln!(out, "\n**Fix:** {}", fix)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
