//! Common test utilities for integration tests
//!
//! This module contains shared test fixtures and helper functions used across
//! integration tests. These utilities are not compiled into the library.

#![allow(dead_code)]

use anyhow::Result;
use doc_sample_check::{CheckConfig, RunOptions, RunReport, SampleChecker};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated test fixture with automatic cleanup
///
/// Creates a temporary copy of a documentation fixture, allowing tests to run
/// in parallel without interfering with each other.
pub struct TestFixture {
    _docs_dir: TempDir,
    docs_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture from a specific source directory
    pub fn new(source: impl AsRef<Path>) -> Result<Self> {
        let docs_dir = TempDir::new()?;

        copy_dir_all(source.as_ref(), docs_dir.path())?;

        Ok(Self {
            docs_path: docs_dir.path().to_path_buf(),
            _docs_dir: docs_dir,
        })
    }

    /// An empty documentation tree to be filled with `write`
    pub fn empty() -> Result<Self> {
        let docs_dir = TempDir::new()?;
        Ok(Self {
            docs_path: docs_dir.path().to_path_buf(),
            _docs_dir: docs_dir,
        })
    }

    pub fn docs_path(&self) -> &Path {
        &self.docs_path
    }

    pub fn config_path(&self) -> PathBuf {
        self.docs_path.join("sample-check.toml")
    }

    /// Writes a document relative to the fixture root
    pub fn write(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.docs_path.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads the fixture's configuration without going through approval
    pub fn config(&self) -> Result<CheckConfig> {
        CheckConfig::from_file(&self.config_path())
    }

    /// Runs the checker on this fixture
    ///
    /// Uses `SampleChecker::with_config()` so tests do not need an approved
    /// configuration.
    pub async fn run(&self, language: &str, static_only: bool) -> Result<RunReport> {
        self.run_with(self.config()?, language, static_only).await
    }

    pub async fn run_with(
        &self,
        config: CheckConfig,
        language: &str,
        static_only: bool,
    ) -> Result<RunReport> {
        let checker = SampleChecker::with_config(config);
        let options = RunOptions {
            static_only,
            ..RunOptions::new(&self.docs_path, language)
        };
        checker.run(&options).await
    }
}

/// Recursively copy all files and directories from src to dst
fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(&dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            copy_dir_all(entry.path(), dst.as_ref().join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
        }
    }
    Ok(())
}
