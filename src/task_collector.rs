use crate::config::CheckConfig;
use crate::error::ExtractionError;
use crate::execution::SampleTask;
use crate::extractor::{ExtractionFilter, SampleExtractor};
use crate::language::Language;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Maximum size of a single sample in bytes (1MB)
pub const MAX_CODE_BLOCK_SIZE: usize = 1_000_000;

/// Maximum number of samples per document
pub const MAX_SAMPLES_PER_DOCUMENT: usize = 1000;

const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "venv", "__pycache__"];

/// Tasks ready for execution plus every recovered extraction error.
#[derive(Default)]
pub struct Collection {
    pub tasks: Vec<SampleTask>,
    pub errors: Vec<ExtractionError>,
    pub documents: usize,
}

/// Finds documentation files under `docs_dir`, sorted by path.
///
/// Hidden directories and common dependency directories are skipped.
///
/// # Errors
///
/// Returns an error if `docs_dir` cannot be walked.
pub fn discover_documents(docs_dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !docs_dir.is_dir() {
        anyhow::bail!(
            "Documentation directory not found: {}",
            docs_dir.display()
        );
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(docs_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.depth() == 0 || !(name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()))
        })
    {
        let entry = entry
            .with_context(|| format!("Failed to walk {}", docs_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches_extension = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if matches_extension {
            documents.push(entry.into_path());
        }
    }

    documents.sort();
    Ok(documents)
}

/// Extracts every sample of `language` from the documents under `docs_dir`.
///
/// Size limits and unreadable documents are recorded as extraction errors;
/// the scan always continues with the next document.
///
/// # Errors
///
/// Returns an error only if the documentation directory cannot be walked.
pub fn collect_sample_tasks(
    docs_dir: &Path,
    language: &Language,
    config: &CheckConfig,
) -> Result<Collection> {
    let documents = discover_documents(docs_dir, &config.documentation.extensions)?;
    let filter = ExtractionFilter::from_config(config);
    let mut collection = Collection {
        documents: documents.len(),
        ..Default::default()
    };

    for path in documents {
        log::debug!("Collecting {} samples from {}", language, path.display());

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                collection.errors.push(ExtractionError::new(
                    &path,
                    1,
                    format!("failed to read document: {}", e),
                ));
                continue;
            }
        };

        let extractor = SampleExtractor::new(&path, &content, language, &filter);
        let mut samples = Vec::new();
        for item in extractor.samples() {
            match item {
                Ok(sample) if sample.code.len() > MAX_CODE_BLOCK_SIZE => {
                    collection.errors.push(ExtractionError::new(
                        &path,
                        sample.line_number,
                        format!(
                            "sample exceeds size limit of {} bytes ({} bytes)",
                            MAX_CODE_BLOCK_SIZE,
                            sample.code.len()
                        ),
                    ));
                }
                Ok(sample) => samples.push(sample),
                Err(e) => collection.errors.push(e),
            }
        }

        if samples.len() > MAX_SAMPLES_PER_DOCUMENT {
            collection.errors.push(ExtractionError::new(
                &path,
                1,
                format!(
                    "document has {} samples, exceeding limit of {}",
                    samples.len(),
                    MAX_SAMPLES_PER_DOCUMENT
                ),
            ));
            continue;
        }

        collection
            .tasks
            .extend(samples.into_iter().map(SampleTask::new));
    }

    for error in &collection.errors {
        log::error!("{}", error);
    }

    Ok(collection)
}
