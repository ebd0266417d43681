//! Approval gate for configuration files that name commands to execute.
//!
//! A configuration is approved by recording the SHA-256 of its canonical path
//! and content (direnv style). Editing the file, or moving it, revokes the
//! approval.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "doc-sample-check";

/// Hash of canonical path + "\n" + content.
pub fn compute_hash(path: &Path, content: &str) -> String {
    let canonical_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let input = format!("{}\n{}", canonical_path.display(), content);
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Directory of approval records, one file per approved configuration.
#[derive(Debug, Clone)]
pub struct ApprovalStore {
    dir: PathBuf,
}

impl ApprovalStore {
    /// The per-user store: `$XDG_DATA_HOME/doc-sample-check/allow` when set,
    /// otherwise the platform data directory.
    pub fn locate() -> Result<Self> {
        if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
            return Ok(Self::at(PathBuf::from(xdg_data_home).join(APP_NAME).join("allow")));
        }

        let proj_dirs = ProjectDirs::from("", "", APP_NAME)
            .context("Failed to determine project directories")?;
        Ok(Self::at(proj_dirs.data_dir().join("allow")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_for(&self, config_path: &Path) -> Result<PathBuf> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Ok(self.dir.join(compute_hash(config_path, &content)))
    }

    pub fn is_approved(&self, config_path: &Path) -> Result<bool> {
        Ok(self.record_for(config_path)?.exists())
    }

    pub fn approve(&self, config_path: &Path) -> Result<()> {
        let record = self.record_for(config_path)?;
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create approval directory: {}", self.dir.display())
        })?;

        let canonical_path = config_path
            .canonicalize()
            .unwrap_or_else(|_| config_path.to_path_buf());
        fs::write(&record, canonical_path.display().to_string())
            .with_context(|| format!("Failed to write approval file: {}", record.display()))?;

        log::info!("Approved {}", canonical_path.display());
        Ok(())
    }

    /// Removes the approval of `config_path`, if any.
    pub fn deny(&self, config_path: &Path) -> Result<()> {
        let record = self.record_for(config_path)?;
        if record.exists() {
            fs::remove_file(&record).with_context(|| {
                format!("Failed to remove approval file: {}", record.display())
            })?;
        }
        Ok(())
    }

    /// Paths of every approved configuration, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut approved = Vec::new();
        for entry in fs::read_dir(&self.dir).with_context(|| {
            format!("Failed to read approval directory: {}", self.dir.display())
        })? {
            let entry = entry?;
            if entry.path().is_file() {
                if let Ok(path_content) = fs::read_to_string(entry.path()) {
                    approved.push(path_content);
                }
            }
        }
        approved.sort();
        Ok(approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("sample-check.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_approve_then_deny() {
        let dir = tempfile::tempdir().unwrap();
        let store = ApprovalStore::at(dir.path().join("allow"));
        let config = config_file(dir.path(), "[execution]\njobs = 2\n");

        assert!(!store.is_approved(&config).unwrap());
        store.approve(&config).unwrap();
        assert!(store.is_approved(&config).unwrap());
        assert_eq!(store.list().unwrap().len(), 1);

        store.deny(&config).unwrap();
        assert!(!store.is_approved(&config).unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_editing_config_revokes_approval() {
        let dir = tempfile::tempdir().unwrap();
        let store = ApprovalStore::at(dir.path().join("allow"));
        let config = config_file(dir.path(), "[languages.python]\ncommand = \"python3\"\n");
        store.approve(&config).unwrap();

        fs::write(&config, "[languages.python]\ncommand = \"evil\"\n").unwrap();
        assert!(!store.is_approved(&config).unwrap());
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ApprovalStore::at(dir.path().join("allow"));
        assert!(store.is_approved(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_hash_depends_on_path_and_content() {
        let a = compute_hash(Path::new("/docs/a.toml"), "x");
        assert_eq!(a, compute_hash(Path::new("/docs/a.toml"), "x"));
        assert_ne!(a, compute_hash(Path::new("/docs/b.toml"), "x"));
        assert_ne!(a, compute_hash(Path::new("/docs/a.toml"), "y"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    #[serial]
    fn test_xdg_data_home_respected() {
        let dir = tempfile::tempdir().unwrap();
        let previous = std::env::var("XDG_DATA_HOME").ok();
        std::env::set_var("XDG_DATA_HOME", dir.path());

        let store = ApprovalStore::locate().unwrap();
        assert_eq!(store.dir(), dir.path().join(APP_NAME).join("allow"));

        match previous {
            Some(value) => std::env::set_var("XDG_DATA_HOME", value),
            None => std::env::remove_var("XDG_DATA_HOME"),
        }
    }
}
