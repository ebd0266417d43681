use super::{run_steps, ExecutionResult, RunEnvironment, SampleRuntime, Workspace};
use crate::error::ExecutionFailure;
use crate::language::Language;
use crate::transformer::TransformedProgram;
use async_trait::async_trait;
use std::time::Duration;

/// Interpreted languages: one source file handed to `command args <file>`.
pub struct ScriptRuntime {
    language: Language,
    run: RunEnvironment,
}

impl ScriptRuntime {
    pub fn new(language: Language, run: RunEnvironment) -> Self {
        Self { language, run }
    }
}

#[async_trait]
impl SampleRuntime for ScriptRuntime {
    fn language(&self) -> &Language {
        &self.language
    }

    fn prepare_environment(&self) -> Result<Workspace, ExecutionFailure> {
        let mut workspace = Workspace::create(&self.run, self.language.name())?;
        // Keep interpreters from writing caches or buffering output
        workspace.set_env("PYTHONDONTWRITEBYTECODE", "1");
        workspace.set_env("PYTHONUNBUFFERED", "1");
        workspace.set_env("NODE_NO_WARNINGS", "1");
        Ok(workspace)
    }

    async fn execute(
        &self,
        program: &TransformedProgram,
        workspace: &Workspace,
        timeout: Duration,
    ) -> ExecutionResult {
        if let Err(failure) = workspace.materialize(program).await {
            return ExecutionResult::failed(failure, Duration::ZERO);
        }

        let mut args = self.language.args.clone();
        args.push(program.file_name.clone());
        run_steps(&self.language, &self.run, workspace, &args, timeout).await
    }
}
