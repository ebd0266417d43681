//! Per-language execution of transformed programs.
//!
//! Every language is driven through [`SampleRuntime`]. The three
//! implementations share the bounded process runner in [`process`] and the
//! [`Workspace`] type but are otherwise independent of each other.

mod dotnet;
mod go;
mod process;
mod script;

pub use dotnet::DotnetRuntime;
pub use go::GoRuntime;
pub use script::ScriptRuntime;

use crate::config::{CheckConfig, CredentialSettings, RuntimeKind};
use crate::error::ExecutionFailure;
use crate::extractor::Sample;
use crate::language::{Language, MEDIA_STUB_FILE};
use crate::rules;
use crate::transformer::TransformedProgram;
use async_trait::async_trait;
use process::{run_bounded, BoundedCommand, ProcessOutput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Outcome of one execution attempt. Never retried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit status zero, within the timeout, no failure marker on stdout
    pub success: bool,
    pub duration_seconds: f64,
    pub stdout: String,
    pub stderr: String,
    /// Empty on success
    pub error_message: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Either stream hit `max_output_bytes`
    pub truncated: bool,
}

impl ExecutionResult {
    fn from_output(
        command: &str,
        output: ProcessOutput,
        timeout: Duration,
        failure_marker: &str,
    ) -> Self {
        let failure = if output.timed_out {
            Some(ExecutionFailure::Timeout(timeout))
        } else if output.exit_code != Some(0) {
            Some(ExecutionFailure::NonZeroExit {
                command: command.to_string(),
                code: output.exit_code,
            })
        } else if output.stdout.contains(failure_marker) {
            Some(ExecutionFailure::FailureMarker {
                marker: failure_marker.to_string(),
            })
        } else {
            None
        };

        Self {
            success: failure.is_none(),
            duration_seconds: output.duration.as_secs_f64(),
            stdout: output.stdout,
            stderr: output.stderr,
            error_message: failure.map(|f| f.to_string()).unwrap_or_default(),
            exit_code: output.exit_code,
            timed_out: output.timed_out,
            truncated: output.truncated,
        }
    }

    pub(crate) fn failed(failure: ExecutionFailure, duration: Duration) -> Self {
        Self {
            success: false,
            duration_seconds: duration.as_secs_f64(),
            timed_out: matches!(failure, ExecutionFailure::Timeout(_)),
            error_message: failure.to_string(),
            ..Default::default()
        }
    }
}

/// Run-scoped settings every runtime reads.
#[derive(Debug, Clone)]
pub struct RunEnvironment {
    /// Per-run directory all workspaces are created in
    pub root: PathBuf,
    pub credentials: CredentialSettings,
    pub max_output_bytes: usize,
    pub failure_marker: String,
}

impl RunEnvironment {
    pub fn new(root: &Path, config: &CheckConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            credentials: config.credentials.clone(),
            max_output_bytes: config.execution.max_output_bytes,
            failure_marker: config.execution.failure_marker.clone(),
        }
    }

    /// The fixed environment every child sees: passed-through host
    /// variables plus the test credential under each configured name.
    fn child_env(&self) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = self
            .credentials
            .inherit_env
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name.clone(), value)))
            .collect();
        for name in &self.credentials.env {
            env.insert(name.clone(), self.credentials.value.clone());
        }
        env
    }
}

/// An isolated directory plus the environment children run with.
///
/// The directory is removed when the workspace is dropped, on every path.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    env: BTreeMap<String, String>,
}

impl Workspace {
    fn create(run: &RunEnvironment, prefix: &str) -> Result<Self, ExecutionFailure> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", prefix))
            .tempdir_in(&run.root)?;
        Ok(Self {
            dir,
            env: run.child_env(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    fn set_env(&mut self, name: &str, value: &str) {
        self.env.insert(name.to_string(), value.to_string());
    }

    async fn write_file(&self, name: &str, contents: &[u8]) -> Result<PathBuf, ExecutionFailure> {
        let path = self.dir.path().join(name);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    /// Materializes the program source and, when needed, the media stub.
    async fn materialize(&self, program: &TransformedProgram) -> Result<(), ExecutionFailure> {
        self.write_file(&program.file_name, program.source.as_bytes())
            .await?;
        if program.requires_media {
            self.write_file(MEDIA_STUB_FILE, &wav_stub()).await?;
        }
        Ok(())
    }
}

/// A 44-byte PCM WAV header with no samples (mono, 44.1 kHz, 16-bit).
pub(crate) fn wav_stub() -> Vec<u8> {
    let mut wav = Vec::with_capacity(44);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&36u32.to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&44_100u32.to_le_bytes());
    wav.extend_from_slice(&88_200u32.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&0u32.to_le_bytes());
    wav
}

/// The capability set every language executor provides.
///
/// # Example
///
/// ```ignore
/// let runtime = runtime_for(language, run_env);
/// let workspace = runtime.prepare_environment()?;
/// let result = runtime.execute(&program, &workspace, timeout).await;
/// drop(workspace); // directory removed
/// ```
#[async_trait]
pub trait SampleRuntime: Send + Sync {
    fn language(&self) -> &Language;

    /// Acquires a fresh workspace. No two calls ever return the same directory.
    fn prepare_environment(&self) -> Result<Workspace, ExecutionFailure>;

    /// Materializes `program` in `workspace` and runs it under `timeout`.
    ///
    /// Every failure is folded into the returned result.
    async fn execute(
        &self,
        program: &TransformedProgram,
        workspace: &Workspace,
        timeout: Duration,
    ) -> ExecutionResult;

    /// Rule name → passed, for this language's rules. Touches nothing.
    fn validate(&self, sample: &Sample) -> BTreeMap<String, bool> {
        rules::outcomes(sample, &self.language().rules)
    }
}

/// Picks the executor for a language's configured runtime.
pub fn runtime_for(language: Language, run: RunEnvironment) -> Box<dyn SampleRuntime> {
    match language.runtime {
        RuntimeKind::Script => Box::new(ScriptRuntime::new(language, run)),
        RuntimeKind::Dotnet => Box::new(DotnetRuntime::new(language, run)),
        RuntimeKind::Go => Box::new(GoRuntime::new(language, run)),
    }
}

/// Runs the language's setup commands and then `command args`, all inside
/// the workspace and each under `timeout`. Stops at the first failing step.
async fn run_steps(
    language: &Language,
    run: &RunEnvironment,
    workspace: &Workspace,
    args: &[String],
    timeout: Duration,
) -> ExecutionResult {
    let mut setup_duration = Duration::ZERO;

    for step in &language.setup {
        let Some((program, step_args)) = step.split_first() else {
            continue;
        };
        let command = BoundedCommand {
            program,
            args: step_args,
            cwd: workspace.path(),
            env: workspace.env(),
            timeout,
            max_output_bytes: run.max_output_bytes,
        };
        let output = match run_bounded(&command).await {
            Ok(output) => output,
            Err(failure) => return ExecutionResult::failed(failure, setup_duration),
        };
        setup_duration += output.duration;

        let result =
            ExecutionResult::from_output(&command.display(), output, timeout, &run.failure_marker);
        if !result.success {
            log::debug!("Setup step `{}` failed", command.display());
            return ExecutionResult {
                error_message: format!("setup failed: {}", result.error_message),
                duration_seconds: setup_duration.as_secs_f64(),
                ..result
            };
        }
    }

    let command = BoundedCommand {
        program: &language.command,
        args,
        cwd: workspace.path(),
        env: workspace.env(),
        timeout,
        max_output_bytes: run.max_output_bytes,
    };
    match run_bounded(&command).await {
        Ok(output) => {
            let mut result = ExecutionResult::from_output(
                &command.display(),
                output,
                timeout,
                &run.failure_marker,
            );
            result.duration_seconds += setup_duration.as_secs_f64();
            result
        }
        Err(failure) => ExecutionResult::failed(failure, setup_duration),
    }
}
