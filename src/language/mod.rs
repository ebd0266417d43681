mod profiles;

pub use profiles::MEDIA_STUB_FILE;

use crate::config::{CheckConfig, ImplicitImportConfig, LanguageConfig, RuleConfig, RuntimeKind};
use anyhow::{Context, Result};
use profiles::{builtin_profile, Profile, BUILTIN_LANGUAGES};
use regex::Regex;
use std::fmt;
use std::time::Duration;

/// Substring markers used to classify samples and flag their requirements.
#[derive(Debug, Clone, Default)]
pub struct Markers {
    pub concurrent: Vec<String>,
    pub class: Vec<String>,
    pub async_: Vec<String>,
    pub web: Vec<String>,
    pub console: Vec<String>,
    pub credential: Vec<String>,
    pub media: Vec<String>,
}

/// Entry-point wrapping templates, resolved against the built-in profile.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    pub sync: Option<String>,
    pub async_: Option<String>,
    pub declarations: Option<String>,
    pub failure: Option<String>,
}

/// A compiled neutralization entry.
#[derive(Debug, Clone)]
pub struct Neutralizer {
    pub name: String,
    pub pattern: Regex,
    pub replacement: String,
}

/// Code added to a program whose sample uses `when` without matching `unless`.
#[derive(Debug, Clone)]
pub struct ImplicitImport {
    pub name: String,
    pub when: Regex,
    pub unless: Option<Regex>,
    pub code: String,
}

impl ImplicitImport {
    pub fn applies_to(&self, code: &str) -> bool {
        self.when.is_match(code)
            && !self
                .unless
                .as_ref()
                .map(|re| re.is_match(code))
                .unwrap_or(false)
    }

    fn from_config(config: &ImplicitImportConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            when: Regex::new(&config.when)
                .with_context(|| format!("Invalid implicit import pattern: {}", config.when))?,
            unless: compile(config.unless.clone(), "implicit import")?,
            code: config.code.clone(),
        })
    }
}

/// A language with every setting resolved and every pattern compiled.
///
/// Built from the `[languages.<name>]` table overlaid on the built-in profile
/// of the same name. Languages without a built-in profile must configure at
/// least `command` and the templates they need.
#[derive(Debug, Clone)]
pub struct Language {
    name: String,
    pub fence_markers: Vec<String>,
    pub runtime: RuntimeKind,
    pub command: String,
    pub args: Vec<String>,
    pub setup: Vec<Vec<String>>,
    pub source_file: String,
    pub project_file: Option<String>,
    pub timeout: Duration,
    pub import_pattern: Option<Regex>,
    pub entry_point_markers: Vec<String>,
    pub declaration_pattern: Option<Regex>,
    pub statements_host_declarations: bool,
    pub hoist_imports: bool,
    pub header: Option<String>,
    pub header_marker: Option<Regex>,
    pub markers: Markers,
    pub templates: Templates,
    pub neutralize: Vec<Neutralizer>,
    pub implicit_imports: Vec<ImplicitImport>,
    pub prologue_pattern: Option<Regex>,
    pub rules: Vec<RuleConfig>,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn pick_list(configured: &Option<Vec<String>>, builtin: Option<&[&str]>) -> Vec<String> {
    match configured {
        Some(values) => values.clone(),
        None => builtin.map(owned).unwrap_or_default(),
    }
}

fn pick_str(configured: &Option<String>, builtin: Option<&str>) -> Option<String> {
    configured
        .clone()
        .or_else(|| builtin.map(str::to_string))
}

fn compile(pattern: Option<String>, what: &str) -> Result<Option<Regex>> {
    pattern
        .map(|p| Regex::new(&p).with_context(|| format!("Invalid {} pattern: {}", what, p)))
        .transpose()
}

impl Language {
    /// Resolves a language from its configuration and the built-in profile.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured regex does not compile or if a language
    /// without a built-in profile does not name a command.
    pub fn resolve(name: &str, config: &LanguageConfig, global: &CheckConfig) -> Result<Self> {
        let profile: Option<&Profile> = builtin_profile(name);

        let command = pick_str(&config.command, profile.map(|p| p.command)).with_context(|| {
            format!(
                "Language '{}' has no built-in profile and no `command` configured",
                name
            )
        })?;

        let fence_markers = match &config.fence_markers {
            Some(markers) => markers.clone(),
            None => profile
                .map(|p| owned(p.fence_markers))
                .unwrap_or_else(|| vec![name.to_string()]),
        };

        let runtime = config
            .runtime
            .or(profile.map(|p| p.runtime))
            .unwrap_or(RuntimeKind::Script);

        let source_file = pick_str(&config.source_file, profile.map(|p| p.source_file))
            .unwrap_or_else(|| format!("sample.{}", name));

        let timeout_seconds = config
            .timeout_seconds
            .unwrap_or(global.execution.timeout_seconds);

        let (header, header_marker) = match (&config.header, profile.and_then(|p| p.header)) {
            (Some(header), _) => (Some(header.clone()), config.header_marker.clone()),
            (None, Some((header, marker))) => (
                Some(header.to_string()),
                Some(
                    config
                        .header_marker
                        .clone()
                        .unwrap_or_else(|| marker.to_string()),
                ),
            ),
            (None, None) => (None, None),
        };

        let markers = Markers {
            concurrent: pick_list(&config.markers.concurrent, profile.map(|p| p.concurrent)),
            class: pick_list(&config.markers.class, profile.map(|p| p.class)),
            async_: pick_list(&config.markers.async_, profile.map(|p| p.async_)),
            web: pick_list(&config.markers.web, profile.map(|p| p.web)),
            console: pick_list(&config.markers.console, profile.map(|p| p.console)),
            credential: pick_list(&config.markers.credential, profile.map(|p| p.credential)),
            media: pick_list(&config.markers.media, profile.map(|p| p.media)),
        };

        let templates = Templates {
            sync: pick_str(&config.templates.sync, profile.and_then(|p| p.sync_template)),
            async_: pick_str(&config.templates.async_, profile.and_then(|p| p.async_template)),
            declarations: pick_str(
                &config.templates.declarations,
                profile.and_then(|p| p.declarations_template),
            ),
            failure: pick_str(
                &config.templates.failure,
                profile.and_then(|p| p.failure_template),
            ),
        };

        let neutralize = match &config.neutralize {
            Some(rules) => rules
                .iter()
                .enumerate()
                .map(|(i, rule)| {
                    Ok(Neutralizer {
                        name: rule
                            .name
                            .clone()
                            .unwrap_or_else(|| format!("neutralize_{}", i)),
                        pattern: Regex::new(&rule.pattern).with_context(|| {
                            format!("Invalid neutralize pattern: {}", rule.pattern)
                        })?,
                        replacement: rule.replacement.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => profile
                .map(|p| {
                    p.neutralize
                        .iter()
                        .map(|(rule_name, pattern, replacement)| {
                            Ok(Neutralizer {
                                name: rule_name.to_string(),
                                pattern: Regex::new(pattern)?,
                                replacement: replacement.to_string(),
                            })
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default(),
        };

        let implicit_imports = match &config.implicit_imports {
            Some(imports) => imports
                .iter()
                .map(ImplicitImport::from_config)
                .collect::<Result<Vec<_>>>()?,
            None => profile
                .map(|p| {
                    p.implicit_imports
                        .iter()
                        .map(|i| ImplicitImport::from_config(&i.to_config()))
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default(),
        };

        let rules = match &config.rules {
            Some(rules) => rules.clone(),
            None => profile
                .map(|p| p.rules.iter().map(|r| r.to_config()).collect())
                .unwrap_or_default(),
        };

        Ok(Self {
            name: name.to_string(),
            fence_markers,
            runtime,
            command,
            args: config
                .args
                .clone()
                .or_else(|| profile.map(|p| owned(p.args)))
                .unwrap_or_default(),
            setup: config.setup.clone().unwrap_or_default(),
            source_file,
            project_file: config.project_file.clone(),
            timeout: Duration::from_secs(timeout_seconds),
            import_pattern: compile(
                pick_str(&config.import_pattern, profile.and_then(|p| p.import_pattern)),
                "import",
            )?,
            entry_point_markers: pick_list(
                &config.entry_point_markers,
                profile.map(|p| p.entry_point_markers),
            ),
            declaration_pattern: compile(
                pick_str(
                    &config.declaration_pattern,
                    profile.and_then(|p| p.declaration_pattern),
                ),
                "declaration",
            )?,
            statements_host_declarations: config
                .statements_host_declarations
                .or(profile.map(|p| p.statements_host_declarations))
                .unwrap_or(true),
            hoist_imports: config
                .hoist_imports
                .or(profile.map(|p| p.hoist_imports))
                .unwrap_or(false),
            header,
            header_marker: compile(header_marker, "header marker")?,
            markers,
            templates,
            neutralize,
            implicit_imports,
            prologue_pattern: compile(
                pick_str(&config.prologue_pattern, profile.and_then(|p| p.prologue_pattern)),
                "prologue",
            )?,
            rules,
        })
    }

    /// Returns the canonical name of this language (e.g., "python", "csharp").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `tag` (a fence info language tag) selects this language.
    pub fn matches_fence(&self, tag: &str) -> bool {
        self.fence_markers
            .iter()
            .any(|marker| marker.eq_ignore_ascii_case(tag))
    }
}

/// Registry of languages available for a run.
///
/// Languages come from the built-in profiles plus every `[languages.<name>]`
/// table. Disabled languages are never returned.
///
/// # Example
///
/// ```ignore
/// let config = CheckConfig::from_file(path)?;
/// let registry = LanguageRegistry::from_config(&config);
///
/// // `cs` is an alias of csharp
/// let language = registry.find_by_fence("cs")?.expect("csharp is built in");
/// ```
pub struct LanguageRegistry {
    config: CheckConfig,
}

impl LanguageRegistry {
    pub fn from_config(config: &CheckConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Names of every enabled language, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_LANGUAGES
            .iter()
            .map(|s| s.to_string())
            .chain(self.config.languages().keys().cloned())
            .filter(|name| self.is_enabled(name))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.config
            .languages()
            .get(name)
            .map(|c| c.enabled)
            .unwrap_or(true)
    }

    /// Resolves a language by canonical name.
    ///
    /// Returns `Ok(None)` if the language is unknown or disabled.
    pub fn get(&self, name: &str) -> Result<Option<Language>> {
        if !self.is_enabled(name) {
            return Ok(None);
        }
        match self.config.languages().get(name) {
            Some(config) => Language::resolve(name, config, &self.config).map(Some),
            None if builtin_profile(name).is_some() => {
                Language::resolve(name, &LanguageConfig::default(), &self.config).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Finds a language by one of its fence markers (aliases included).
    pub fn find_by_fence(&self, fence: &str) -> Result<Option<Language>> {
        for name in self.names() {
            if let Some(language) = self.get(&name)? {
                if language.matches_fence(fence) {
                    return Ok(Some(language));
                }
            }
        }
        Ok(None)
    }
}
