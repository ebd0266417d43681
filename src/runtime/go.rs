use super::{run_steps, ExecutionResult, RunEnvironment, SampleRuntime, Workspace};
use crate::error::ExecutionFailure;
use crate::language::Language;
use crate::transformer::TransformedProgram;
use async_trait::async_trait;
use std::time::Duration;

const MODULE_FILE_NAME: &str = "go.mod";
const DEFAULT_MODULE: &str = "module sample\n\ngo 1.21\n";

/// Go modules: `go.mod` plus `main.go`, run with `go run .`.
pub struct GoRuntime {
    language: Language,
    run: RunEnvironment,
}

impl GoRuntime {
    pub fn new(language: Language, run: RunEnvironment) -> Self {
        Self { language, run }
    }

    async fn materialize(
        &self,
        program: &TransformedProgram,
        workspace: &Workspace,
    ) -> Result<(), ExecutionFailure> {
        let module = self
            .language
            .project_file
            .as_deref()
            .unwrap_or(DEFAULT_MODULE);
        workspace
            .write_file(MODULE_FILE_NAME, module.as_bytes())
            .await?;
        workspace.materialize(program).await
    }
}

#[async_trait]
impl SampleRuntime for GoRuntime {
    fn language(&self) -> &Language {
        &self.language
    }

    fn prepare_environment(&self) -> Result<Workspace, ExecutionFailure> {
        let mut workspace = Workspace::create(&self.run, "go")?;
        // Never download a newer toolchain on behalf of the sample
        workspace.set_env("GOTOOLCHAIN", "local");
        workspace.set_env("GOTELEMETRY", "off");
        if !workspace.env().contains_key("HOME") && !workspace.env().contains_key("GOCACHE") {
            let cache = workspace.path().join(".gocache").display().to_string();
            workspace.set_env("GOCACHE", &cache);
        }
        Ok(workspace)
    }

    async fn execute(
        &self,
        program: &TransformedProgram,
        workspace: &Workspace,
        timeout: Duration,
    ) -> ExecutionResult {
        if let Err(failure) = self.materialize(program, workspace).await {
            return ExecutionResult::failed(failure, Duration::ZERO);
        }

        run_steps(
            &self.language,
            &self.run,
            workspace,
            &self.language.args,
            timeout,
        )
        .await
    }
}
