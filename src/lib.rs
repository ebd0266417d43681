//! doc-sample-check library
//!
//! Extracts the code samples embedded in SDK documentation, checks them
//! against declarative validation rules, rewrites each one into a standalone
//! program and runs it in an isolated workspace under a timeout. The primary
//! interface is the doc-sample-check binary, but the library can be driven
//! programmatically for testing or custom integrations.
//!
//! ## Public API
//!
//! The main entry point is [`SampleChecker`], which produces a [`RunReport`]
//! for one language per run. [`reporting`] renders that report as JSON,
//! Markdown or a stderr summary.
//!
//! The pipeline stages are public too:
//! - [`SampleExtractor`] - fenced code blocks of one language, with provenance
//! - [`Transformer`] - a sample rewritten into a runnable program
//! - [`SampleRuntime`] / [`runtime_for`] - per-language execution
//! - [`rules::evaluate`] - validation findings for a sample

pub mod approval;
mod checker;
pub mod config;
pub mod error;
mod execution;
pub mod extractor;
pub mod language;
pub mod report;
pub mod reporting;
pub mod rules;
pub mod runtime;
mod task_collector;
pub mod transformer;

pub use checker::{RunOptions, SampleChecker};
pub use config::CheckConfig;
pub use execution::{run_tasks, SampleTask};
pub use extractor::{Sample, SampleExtractor, SampleType};
pub use language::{Language, LanguageRegistry};
pub use report::{RunReport, SampleReport};
pub use runtime::{runtime_for, ExecutionResult, RunEnvironment, SampleRuntime};
pub use task_collector::{collect_sample_tasks, discover_documents};
pub use transformer::{TransformedProgram, Transformer};
