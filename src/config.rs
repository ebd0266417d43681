use crate::rules::Severity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

/// Default name of the configuration file looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "sample-check.toml";

/// Top-level configuration for a sample checking run.
///
/// Deserialized from a TOML file. Only `[languages.<name>]` tables that differ
/// from the built-in profiles need to be spelled out; every unset field falls
/// back to the profile of the same name (see [`crate::language`]).
///
/// # Example
///
/// ```toml
/// [execution]
/// timeout_seconds = 20
/// jobs = 4
///
/// [documentation]
/// product_markers = ["deepgram"]
///
/// [languages.python]
/// command = "${PYTHON}"
///
/// [[languages.python.rules]]
/// name = "outdated_sdk_import"
/// pattern = 'from deepgram import Deepgram\b'
/// expected_present = false
/// severity = "blocking"
/// fix = "Change to: `from deepgram import DeepgramClient`"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CheckConfig {
    pub execution: ExecutionSettings,
    pub documentation: DocumentationSettings,
    pub credentials: CredentialSettings,
    /// Language-specific configurations indexed by language name
    pub languages: BTreeMap<String, LanguageConfig>,
}

/// Global execution bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Wall-clock bound per sample, unless a language overrides it
    pub timeout_seconds: u64,
    /// Per-stream cap on captured stdout/stderr
    pub max_output_bytes: usize,
    /// Worker pool size; each worker owns one workspace and one child at a time
    pub jobs: usize,
    /// Validate and transform only, never launch a process
    pub static_only: bool,
    /// Blocks shorter than this (after trimming) are treated as prose examples
    pub min_sample_chars: usize,
    /// Written to stdout by the failure boundary of wrapped programs
    pub failure_marker: String,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_output_bytes: 64 * 1024,
            jobs: num_cpus::get(),
            static_only: false,
            min_sample_chars: 30,
            failure_marker: "SAMPLE_CHECK_FAILURE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentationSettings {
    /// File extensions scanned for fenced code blocks
    pub extensions: Vec<String>,
    /// Case-insensitive substrings identifying samples of the documented product.
    /// An explicitly empty list accepts every block.
    pub product_markers: Vec<String>,
}

impl Default for DocumentationSettings {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string(), "mdx".to_string()],
            product_markers: vec!["deepgram".to_string()],
        }
    }
}

/// Test credential and the environment handed to child processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Fixed test credential value
    pub value: String,
    /// Literal placeholders replaced by `value` inside samples
    pub placeholders: Vec<String>,
    /// Environment variables set to `value` in every workspace
    pub env: Vec<String>,
    /// Host environment variables passed through to children
    pub inherit_env: Vec<String>,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            value: "test_api_key".to_string(),
            placeholders: vec!["YOUR_API_KEY".to_string()],
            env: vec!["DEEPGRAM_API_KEY".to_string(), "DEEPGRAM_TOKEN".to_string()],
            inherit_env: vec!["PATH".to_string(), "HOME".to_string()],
        }
    }
}

/// Which executor implementation runs a language's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// One source file handed to an interpreter
    Script,
    /// A console project run with `dotnet`
    Dotnet,
    /// A module run with `go`
    Go,
}

/// Configuration for a specific language.
///
/// Every field is optional; unset fields resolve against the built-in profile
/// for the language name. `command`, `args` and `setup` support `${VAR_NAME}`
/// environment variable expansion.
///
/// # Security
///
/// Commands are validated to prevent command injection. They cannot contain
/// shell metacharacters or use parent directory traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Whether this language may be selected for a run
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fence tags (aliases) that identify this language in documentation
    #[serde(default)]
    pub fence_markers: Option<Vec<String>>,

    #[serde(default)]
    pub runtime: Option<RuntimeKind>,

    /// Interpreter or toolchain executable
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Option<Vec<String>>,

    /// Commands run in the workspace before the sample, e.g. `[["dotnet", "restore"]]`
    #[serde(default)]
    pub setup: Option<Vec<Vec<String>>>,

    /// Name of the file the program is written to inside the workspace
    #[serde(default)]
    pub source_file: Option<String>,

    /// Project manifest written next to the program (`.csproj` for dotnet, `go.mod` for go)
    #[serde(default)]
    pub project_file: Option<String>,

    /// Overrides `[execution].timeout_seconds`
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    #[serde(default)]
    pub import_pattern: Option<String>,

    #[serde(default)]
    pub entry_point_markers: Option<Vec<String>>,

    #[serde(default)]
    pub declaration_pattern: Option<String>,

    #[serde(default)]
    pub statements_host_declarations: Option<bool>,

    #[serde(default)]
    pub hoist_imports: Option<bool>,

    /// Mandatory program header, inserted when `header_marker` does not match
    #[serde(default)]
    pub header: Option<String>,

    #[serde(default)]
    pub header_marker: Option<String>,

    #[serde(default)]
    pub markers: MarkerConfig,

    #[serde(default)]
    pub templates: TemplateConfig,

    /// Blocking-construct neutralization table, applied in order
    #[serde(default)]
    pub neutralize: Option<Vec<NeutralizeRule>>,

    /// Imports and stubs added when a sample uses a name it never imports
    #[serde(default)]
    pub implicit_imports: Option<Vec<ImplicitImportConfig>>,

    /// Lines that must open the program, lifted above every template
    /// (`from __future__ import ...` in Python)
    #[serde(default)]
    pub prologue_pattern: Option<String>,

    /// Validation rules, evaluated in order
    #[serde(default)]
    pub rules: Option<Vec<RuleConfig>>,
}

fn default_true() -> bool {
    true
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fence_markers: None,
            runtime: None,
            command: None,
            args: None,
            setup: None,
            source_file: None,
            project_file: None,
            timeout_seconds: None,
            import_pattern: None,
            entry_point_markers: None,
            declaration_pattern: None,
            statements_host_declarations: None,
            hoist_imports: None,
            header: None,
            header_marker: None,
            markers: MarkerConfig::default(),
            templates: TemplateConfig::default(),
            neutralize: None,
            implicit_imports: None,
            prologue_pattern: None,
            rules: None,
        }
    }
}

/// Substring lists driving sample classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub concurrent: Option<Vec<String>>,
    pub class: Option<Vec<String>>,
    #[serde(rename = "async")]
    pub async_: Option<Vec<String>>,
    pub web: Option<Vec<String>>,
    pub console: Option<Vec<String>>,
    pub credential: Option<Vec<String>>,
    pub media: Option<Vec<String>>,
}

/// Entry-point wrapping templates.
///
/// Templates may use `{{body}}`, `{{imports}}` and `{{marker}}`. The body is
/// re-indented to the indentation of the line holding `{{body}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub sync: Option<String>,
    #[serde(rename = "async")]
    pub async_: Option<String>,
    pub declarations: Option<String>,
    pub failure: Option<String>,
}

/// One pattern → replacement entry of a neutralization table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeutralizeRule {
    #[serde(default)]
    pub name: Option<String>,
    pub pattern: String,
    pub replacement: String,
}

/// Code injected ahead of a sample's own imports.
///
/// ```toml
/// [[languages.python.implicit_imports]]
/// name = "os"
/// when = '(?m)(?:^|[^.\w])os\.(?:getenv|environ)'
/// unless = '(?m)^[ \t]*import[ \t][^\n]*\bos\b'
/// code = "import os"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplicitImportConfig {
    pub name: String,
    /// Regex matching a use of the name
    pub when: String,
    /// Regex matching an import that already provides it
    #[serde(default)]
    pub unless: Option<String>,
    pub code: String,
}

/// A declarative validation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub expected_present: bool,
    #[serde(default)]
    pub severity: Severity,
    /// Match `pattern` as an exact substring instead of a regex
    #[serde(default)]
    pub literal: bool,
    /// The rule only applies when this regex matches the sample
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fix: Option<String>,
}

fn validate_command(program: &str) -> Result<()> {
    // Ensure the command doesn't contain shell metacharacters
    let dangerous_chars = [';', '|', '&', '`', '\n', '\r'];
    for ch in dangerous_chars {
        if program.contains(ch) {
            anyhow::bail!(
                "Command contains invalid character '{}': {}",
                ch.escape_default(),
                program
            );
        }
    }

    // Ensure the command doesn't use parent directory traversal
    for component in Path::new(program).components() {
        if matches!(component, std::path::Component::ParentDir) {
            anyhow::bail!("Command cannot contain '..': {}", program);
        }
    }

    if program.is_empty() {
        anyhow::bail!("Command cannot be empty");
    }

    Ok(())
}

impl LanguageConfig {
    /// Validate the configuration for security and correctness
    pub fn validate(&self) -> Result<()> {
        if let Some(ref command) = self.command {
            validate_command(command)?;
        }

        if let Some(ref setup) = self.setup {
            for step in setup {
                let program = step
                    .first()
                    .context("Setup command must name a program")?;
                validate_command(program)?;
            }
        }

        if matches!(self.fence_markers, Some(ref markers) if markers.is_empty()) {
            anyhow::bail!("Language configuration must have at least one fence marker");
        }

        if self.timeout_seconds == Some(0) {
            anyhow::bail!("timeout_seconds must be greater than zero");
        }

        Ok(())
    }

    fn expand(&mut self) {
        if let Some(ref mut command) = self.command {
            *command = expand_env_vars(command);
        }
        if let Some(ref mut args) = self.args {
            for arg in args.iter_mut() {
                *arg = expand_env_vars(arg);
            }
        }
        if let Some(ref mut setup) = self.setup {
            for part in setup.iter_mut().flatten() {
                *part = expand_env_vars(part);
            }
        }
    }
}

impl CheckConfig {
    /// Load configuration from a TOML file, expand environment variables and validate
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse configuration from TOML text, expand environment variables and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: CheckConfig = toml::from_str(content)?;

        for (name, lang_config) in config.languages.iter_mut() {
            lang_config.expand();
            lang_config
                .validate()
                .with_context(|| format!("Invalid configuration for language '{}'", name))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.execution.jobs == 0 {
            anyhow::bail!("execution.jobs must be at least 1");
        }
        if self.execution.timeout_seconds == 0 {
            anyhow::bail!("execution.timeout_seconds must be greater than zero");
        }
        if self.execution.failure_marker.trim().is_empty() {
            anyhow::bail!("execution.failure_marker cannot be empty");
        }
        // Substitution must stay idempotent
        for placeholder in &self.credentials.placeholders {
            if placeholder.is_empty() {
                anyhow::bail!("credential placeholders cannot be empty");
            }
            if self.credentials.value.contains(placeholder.as_str()) {
                anyhow::bail!(
                    "credential value '{}' contains placeholder '{}'",
                    self.credentials.value,
                    placeholder
                );
            }
        }
        Ok(())
    }

    /// Get all configured languages
    pub fn languages(&self) -> &BTreeMap<String, LanguageConfig> {
        &self.languages
    }
}

/// Expand environment variables in a string
/// Supports ${VAR_NAME} syntax
/// This function processes the string in a single pass to avoid re-processing expanded values
fn expand_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_name = String::new();
            let mut found_close = false;

            for ch in chars.by_ref() {
                if ch == '}' {
                    found_close = true;
                    break;
                }
                var_name.push(ch);
            }

            if found_close {
                match env::var(&var_name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => {
                        log::warn!(
                            "Environment variable '{}' not found, leaving unexpanded",
                            var_name
                        );
                        result.push_str("${");
                        result.push_str(&var_name);
                        result.push('}');
                    }
                }
            } else {
                // No closing brace found, treat as literal
                result.push_str("${");
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}
