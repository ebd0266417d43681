use super::{run_steps, ExecutionResult, RunEnvironment, SampleRuntime, Workspace};
use crate::error::ExecutionFailure;
use crate::language::Language;
use crate::transformer::TransformedProgram;
use async_trait::async_trait;
use std::time::Duration;

const PROJECT_FILE_NAME: &str = "Sample.csproj";

// Build servers are disabled so nothing outlives `dotnet run`
const DEFAULT_PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <TargetFramework>net8.0</TargetFramework>
    <ImplicitUsings>enable</ImplicitUsings>
    <Nullable>enable</Nullable>
    <UseSharedCompilation>false</UseSharedCompilation>
    <TreatWarningsAsErrors>false</TreatWarningsAsErrors>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Deepgram" Version="*" />
  </ItemGroup>
</Project>
"#;

/// .NET console projects: a project file plus `Program.cs`, run with
/// `dotnet run` from the workspace.
pub struct DotnetRuntime {
    language: Language,
    run: RunEnvironment,
}

impl DotnetRuntime {
    pub fn new(language: Language, run: RunEnvironment) -> Self {
        Self { language, run }
    }

    fn project(&self) -> &str {
        self.language
            .project_file
            .as_deref()
            .unwrap_or(DEFAULT_PROJECT)
    }

    async fn materialize(
        &self,
        program: &TransformedProgram,
        workspace: &Workspace,
    ) -> Result<(), ExecutionFailure> {
        workspace
            .write_file(PROJECT_FILE_NAME, self.project().as_bytes())
            .await?;
        workspace.materialize(program).await
    }
}

#[async_trait]
impl SampleRuntime for DotnetRuntime {
    fn language(&self) -> &Language {
        &self.language
    }

    fn prepare_environment(&self) -> Result<Workspace, ExecutionFailure> {
        let mut workspace = Workspace::create(&self.run, "dotnet")?;
        workspace.set_env("DOTNET_CLI_TELEMETRY_OPTOUT", "1");
        workspace.set_env("DOTNET_NOLOGO", "1");
        workspace.set_env("DOTNET_SKIP_FIRST_TIME_EXPERIENCE", "1");
        workspace.set_env("DOTNET_CLI_USE_MSBUILD_SERVER", "0");
        workspace.set_env("MSBUILDDISABLENODEREUSE", "1");
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
