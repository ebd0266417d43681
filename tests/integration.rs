//! Integration tests for doc-sample-check against a real interpreter
//!
//! These tests run Python samples with the built-in `python` profile and need
//! `python3` on PATH. They only build with `--features integration-tests`.
//!
//! ## Test Architecture
//!
//! Each test uses `TestFixture` to create an isolated documentation tree.
//! Tests use `SampleChecker::with_config()` to bypass approval checks,
//! allowing fully parallel execution without environment variable
//! manipulation.

mod common;

use anyhow::Result;
use common::TestFixture;
use doc_sample_check::rules::Severity;
use doc_sample_check::{CheckConfig, SampleType};

// ===== Tests =====

#[tokio::test]
async fn integration_python_samples_run() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/python_docs")?;
    let report = fixture
        .run_with(CheckConfig::default(), "python", false)
        .await?;

    assert_eq!(report.summary.total_samples, 4);
    assert_eq!(report.summary.executed, 4);

    let outputs: Vec<&str> = report
        .samples
        .iter()
        .map(|r| r.execution.as_ref().unwrap().stdout.as_str())
        .collect();
    assert!(outputs[0].contains("key length 12"), "{}", outputs[0]);
    assert!(outputs[1].contains("continued past the prompt"));
    assert!(outputs[2].contains("async done"));
    Ok(())
}

#[tokio::test]
async fn integration_swallowed_exception_is_reported() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/python_docs")?;
    let report = fixture
        .run_with(CheckConfig::default(), "python", false)
        .await?;

    let failed: Vec<_> = report.failed_samples().collect();
    assert_eq!(failed.len(), 1);
    let execution = failed[0].execution.as_ref().unwrap();
    assert!(execution.stdout.contains("SAMPLE_CHECK_FAILURE"));
    assert!(execution.stderr.contains("KeyError"));
    assert!(!report.is_success());
    Ok(())
}

#[tokio::test]
async fn integration_async_sample_classified() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/python_docs")?;
    let report = fixture
        .run_with(CheckConfig::default(), "python", true)
        .await?;

    assert_eq!(report.samples[2].sample.sample_type, SampleType::Async);
    assert!(report.summary.by_sample_type.contains_key(&SampleType::Async));
    Ok(())
}

#[tokio::test]
async fn integration_outdated_import_blocks_run() -> Result<()> {
    let fixture = TestFixture::empty()?;
    fixture.write(
        "legacy.md",
        "# Legacy\n\n```python\nfrom deepgram import Deepgram\n\ndg = Deepgram(\"YOUR_API_KEY\")\n```\n",
    )?;

    let report = fixture
        .run_with(CheckConfig::default(), "python", true)
        .await?;

    let blocking: Vec<_> = report.issues_with(Severity::Blocking).collect();
    assert!(blocking
        .iter()
        .any(|i| i.rule_name == "outdated_sdk_import" && i.line == 3));
    assert!(!report.is_success());
    Ok(())
}

#[tokio::test]
async fn integration_missing_key_is_an_improvement() -> Result<()> {
    let fixture = TestFixture::empty()?;
    fixture.write(
        "client.md",
        "```python\nfrom deepgram import DeepgramClient\n\nclient = DeepgramClient()\n```\n",
    )?;

    let report = fixture
        .run_with(CheckConfig::default(), "python", true)
        .await?;

    let sample = &report.samples[0];
    assert!(!sample.sample.requires_credential);
    let issue = report
        .issues
        .iter()
        .find(|i| i.rule_name == "missing_api_key")
        .unwrap();
    assert_eq!(issue.severity, Severity::Improvement);
    Ok(())
}
