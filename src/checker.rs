use crate::approval::ApprovalStore;
use crate::config::CheckConfig;
use crate::execution::run_tasks;
use crate::language::LanguageRegistry;
use crate::report::RunReport;
use crate::reporting;
use crate::runtime::{runtime_for, RunEnvironment};
use crate::task_collector::collect_sample_tasks;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What one run checks.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root of the documentation corpus
    pub docs_dir: PathBuf,
    /// Configured language name or fence alias, e.g. "python" or "py"
    pub language: String,
    /// Overrides `[execution].static_only` when set
    pub static_only: bool,
    /// Overrides `[execution].jobs`
    pub jobs: Option<usize>,
}

impl RunOptions {
    pub fn new(docs_dir: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            language: language.into(),
            static_only: false,
            jobs: None,
        }
    }
}

/// Checks documentation samples for one language per run.
///
/// # Overview
///
/// A run collects every sample of the language from the documentation tree,
/// evaluates the language's validation rules, transforms each sample into a
/// standalone program and executes it in its own workspace with at most
/// `jobs` programs running at once. All workspaces live under a run-scoped
/// temporary root that is removed when the run ends.
///
/// # Security
///
/// A configuration loaded from a file names the commands that get executed.
/// Unless the run is static-only, the file must have been approved with
/// `doc-sample-check allow --config <file>` first.
pub struct SampleChecker {
    config: CheckConfig,
    config_path: Option<PathBuf>,
}

impl SampleChecker {
    /// Loads and validates the configuration file. Approval is checked when
    /// a run that executes samples starts.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: CheckConfig::from_file(path)?,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Uses an in-memory configuration; no approval is required.
    pub fn with_config(config: CheckConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    fn ensure_approved(&self) -> Result<()> {
        let Some(ref path) = self.config_path else {
            return Ok(());
        };
        if !ApprovalStore::locate()?.is_approved(path)? {
            reporting::report_approval_error(path);
            anyhow::bail!("{} not approved", path.display());
        }
        Ok(())
    }

    /// Runs extraction, validation, transformation and (unless static-only)
    /// execution for every sample of `options.language`.
    ///
    /// # Errors
    ///
    /// Only configuration-level problems are fatal: an unapproved
    /// configuration, an unknown or disabled language, an invalid language
    /// configuration, or a missing documentation directory. Everything that
    /// goes wrong with an individual sample is recorded in the report.
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let start = Instant::now();
        let static_only = options.static_only || self.config.execution.static_only;
        if !static_only {
            self.ensure_approved()?;
        }

        let registry = LanguageRegistry::from_config(&self.config);
        let language = match registry.get(&options.language)? {
            Some(language) => Some(language),
            // Aliases such as "py" or "cs"
            None => registry.find_by_fence(&options.language)?,
        };
        let language = language.with_context(|| {
            format!(
                "Unknown or disabled language '{}' (available: {})",
                options.language,
                registry.names().join(", ")
            )
        })?;

        // Scoped to this run; removed with every workspace inside it on drop
        let run_root = tempfile::Builder::new()
            .prefix("doc-sample-check-")
            .tempdir()
            .context("Failed to create temporary directory")?;
        log::info!("Using temporary directory: {:?}", run_root.path());

        let collection = collect_sample_tasks(&options.docs_dir, &language, &self.config)?;
        log::info!(
            "Found {} {} sample(s) in {} document(s)",
            collection.tasks.len(),
            language,
            collection.documents
        );

        let jobs = options.jobs.unwrap_or(self.config.execution.jobs).max(1);
        let language_name = language.name().to_string();
        let runtime = runtime_for(language, RunEnvironment::new(run_root.path(), &self.config));
        let (reports, pool_duration) = run_tasks(
            collection.tasks,
            runtime.as_ref(),
            &self.config,
            static_only,
            jobs,
        )
        .await;
        log::debug!(
            "Worker pool ({} jobs) finished in {}ms",
            jobs,
            pool_duration.as_millis()
        );

        drop(run_root);

        Ok(RunReport::new(
            &language_name,
            reports,
            &collection.errors,
            static_only,
            start.elapsed().as_secs_f64(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_unknown_language_is_fatal() {
        let docs = tempfile::tempdir().unwrap();
        let checker = SampleChecker::with_config(CheckConfig::default());
        let err = checker
            .run(&RunOptions::new(docs.path(), "cobol"))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("cobol"));
    }

    #[tokio::test]
    async fn test_missing_docs_dir_is_fatal() {
        let docs = tempfile::tempdir().unwrap();
        let checker = SampleChecker::with_config(CheckConfig::default());
        let options = RunOptions {
            static_only: true,
            ..RunOptions::new(docs.path().join("missing"), "python")
        };
        assert!(checker.run(&options).await.is_err());
    }

    #[tokio::test]
    async fn test_static_run_reports_findings() {
        let docs = tempfile::tempdir().unwrap();
        fs::write(
            docs.path().join("quickstart.md"),
            "# Quickstart\n\n```python\nfrom deepgram import Deepgram\n\ndg = Deepgram(\"YOUR_API_KEY\")\n```\n",
        )
        .unwrap();

        let checker = SampleChecker::with_config(CheckConfig::default());
        let options = RunOptions {
            static_only: true,
            ..RunOptions::new(docs.path(), "python")
        };
        let report = checker.run(&options).await.unwrap();

        assert_eq!(report.summary.total_samples, 1);
        assert_eq!(report.summary.executed, 0);
        assert!(report.static_only);
        let issue = report
            .issues
            .iter()
            .find(|i| i.rule_name == "outdated_sdk_import")
            .unwrap();
        assert_eq!(issue.line, 3);
        assert!(issue.detail.contains("from deepgram import Deepgram"));
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_language_alias_resolves() {
        let docs = tempfile::tempdir().unwrap();
        let checker = SampleChecker::with_config(CheckConfig::default());
        let options = RunOptions {
            static_only: true,
            ..RunOptions::new(docs.path(), "py")
        };
        let report = checker.run(&options).await.unwrap();
        assert_eq!(report.language, "python");
        assert_eq!(report.summary.total_samples, 0);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_unapproved_config_rejected() {
        let data = tempfile::tempdir().unwrap();
        let docs = tempfile::tempdir().unwrap();
        let config_path = docs.path().join("sample-check.toml");
        fs::write(&config_path, "[execution]\njobs = 1\n").unwrap();

        let previous = std::env::var("XDG_DATA_HOME").ok();
        std::env::set_var("XDG_DATA_HOME", data.path());

        let checker = SampleChecker::from_config_file(&config_path).unwrap();
        let executing = checker.run(&RunOptions::new(docs.path(), "python")).await;
        let static_only = checker
            .run(&RunOptions {
                static_only: true,
                ..RunOptions::new(docs.path(), "python")
            })
            .await;

        match previous {
            Some(value) => std::env::set_var("XDG_DATA_HOME", value),
            None => std::env::remove_var("XDG_DATA_HOME"),
        }

        assert!(format!("{:#}", executing.unwrap_err()).contains("not approved"));
        assert!(static_only.is_ok());
    }
}
