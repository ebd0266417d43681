use crate::config::{CheckConfig, CredentialSettings};
use crate::error::TransformError;
use crate::extractor::{contains_any, Sample, SampleType};
use crate::language::Language;

const BODY_SLOT: &str = "{{body}}";
const IMPORTS_SLOT: &str = "{{imports}}";
const MARKER_SLOT: &str = "{{marker}}";

/// The standalone, runnable form of a sample.
///
/// Owned by exactly one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedProgram {
    pub source: String,
    /// File name the program is written to inside the workspace
    pub file_name: String,
    pub sample_type: SampleType,
    pub requires_media: bool,
    /// Entry template the sample was wrapped in, `None` for complete programs
    pub entry_template: Option<&'static str>,
    /// Names of the neutralization entries that matched
    pub neutralized: Vec<String>,
    /// Names of the implicit imports added
    pub implicit_imports: Vec<String>,
}

/// Rewrites samples of one language into standalone programs.
pub struct Transformer<'a> {
    language: &'a Language,
    credentials: &'a CredentialSettings,
    failure_marker: &'a str,
}

#[derive(Debug, Default)]
struct Shape<'c> {
    declarations: usize,
    statements: usize,
    first_declaration: Option<&'c str>,
}

impl<'a> Transformer<'a> {
    pub fn new(language: &'a Language, config: &'a CheckConfig) -> Self {
        Self {
            language,
            credentials: &config.credentials,
            failure_marker: &config.execution.failure_marker,
        }
    }

    /// Applies credential substitution, neutralization, implicit imports,
    /// entry-point wrapping and the failure boundary, in that order. Prologue
    /// lines are lifted above the finished program.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] naming the offending construct when the
    /// sample cannot be wrapped.
    pub fn transform(&self, sample: &Sample) -> Result<TransformedProgram, TransformError> {
        let code = self.substitute_credentials(&sample.code);
        let (code, neutralized) = self.neutralize(&code);
        let (code, prologue) = self.take_prologue(&code);
        let (implicit, implicit_imports) = self.implicit_imports(&code);

        let (program, entry_template) = match self.entry_point(&code)? {
            true => {
                let program = self.ensure_header(&code);
                (self.insert_after_header(program, &implicit), None)
            }
            false => {
                let (template_name, program) =
                    self.wrap(&code, sample.sample_type, &implicit)?;
                (program, Some(template_name))
            }
        };

        let mut source = match self.language.templates.failure {
            Some(ref failure) => fill(failure, &program, "", self.failure_marker),
            None => program,
        };
        if !prologue.is_empty() {
            source = format!("{}\n{}", prologue, source);
        }

        log::debug!(
            "Transformed {} (template: {}, neutralized: [{}])",
            sample.location(),
            entry_template.unwrap_or("none"),
            neutralized.join(", ")
        );

        Ok(TransformedProgram {
            source,
            file_name: self.language.source_file.clone(),
            sample_type: sample.sample_type,
            requires_media: sample.requires_media,
            entry_template,
            neutralized,
            implicit_imports,
        })
    }

    fn substitute_credentials(&self, code: &str) -> String {
        let mut placeholders: Vec<&String> = self.credentials.placeholders.iter().collect();
        // Longest first so a placeholder that prefixes another never splits it
        placeholders.sort_by_key(|p| std::cmp::Reverse(p.len()));

        let mut code = code.to_string();
        for placeholder in placeholders {
            if code.contains(placeholder.as_str()) {
                code = code.replace(placeholder.as_str(), &self.credentials.value);
            }
        }
        code
    }

    fn neutralize(&self, code: &str) -> (String, Vec<String>) {
        let mut code = code.to_string();
        let mut applied = Vec::new();
        for entry in &self.language.neutralize {
            if entry.pattern.is_match(&code) {
                code = entry
                    .pattern
                    .replace_all(&code, entry.replacement.as_str())
                    .into_owned();
                applied.push(entry.name.clone());
            }
        }
        (code, applied)
    }

    fn take_prologue(&self, code: &str) -> (String, String) {
        match self.language.prologue_pattern {
            Some(ref pattern) if pattern.is_match(code) => {
                let lines: Vec<&str> = pattern.find_iter(code).map(|m| m.as_str()).collect();
                (pattern.replace_all(code, "").into_owned(), lines.join("\n"))
            }
            _ => (code.to_string(), String::new()),
        }
    }

    /// Code of every implicit import the sample needs, and their names.
    fn implicit_imports(&self, code: &str) -> (String, Vec<String>) {
        let needed: Vec<_> = self
            .language
            .implicit_imports
            .iter()
            .filter(|import| import.applies_to(code))
            .collect();
        (
            needed
                .iter()
                .map(|import| import.code.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            needed.iter().map(|import| import.name.clone()).collect(),
        )
    }

    fn insert_after_header(&self, program: String, implicit: &str) -> String {
        if implicit.is_empty() {
            return program;
        }
        let header_end = match (&self.language.header_marker, &self.language.header) {
            (Some(marker), _) => marker.find(&program).map(|m| m.end()),
            (None, Some(header)) => program.find(header.as_str()).map(|i| i + header.len()),
            (None, None) => None,
        };
        match header_end {
            Some(end) => {
                let (head, tail) = program.split_at(end);
                format!("{}\n\n{}\n{}", head, implicit, tail)
            }
            None => format!("{}\n\n{}", implicit, program),
        }
    }

    /// Whether the code already declares its own entry point.
    fn entry_point(&self, code: &str) -> Result<bool, TransformError> {
        let mut found = false;
        for marker in &self.language.entry_point_markers {
            match code.matches(marker.as_str()).count() {
                0 => {}
                1 => found = true,
                _ => {
                    return Err(TransformError::UnsupportedConstruct {
                        construct: marker.clone(),
                    })
                }
            }
        }
        Ok(found)
    }

    fn ensure_header(&self, code: &str) -> String {
        match (&self.language.header, &self.language.header_marker) {
            (Some(header), Some(marker)) if !marker.is_match(code) => {
                format!("{}\n\n{}", header, code)
            }
            (Some(header), None) if !code.contains(header.as_str()) => {
                format!("{}\n\n{}", header, code)
            }
            _ => code.to_string(),
        }
    }

    fn strip_header(&self, code: &str) -> String {
        match self.language.header_marker {
            Some(ref marker) => marker.replace_all(code, "").into_owned(),
            None => code.to_string(),
        }
    }

    fn hoist_imports(&self, code: &str) -> (String, String) {
        match self.language.import_pattern {
            Some(ref pattern) if self.language.hoist_imports => {
                let imports: Vec<&str> = pattern.find_iter(code).map(|m| m.as_str()).collect();
                let body = pattern.replace_all(code, "").into_owned();
                (body, imports.join("\n"))
            }
            _ => (code.to_string(), String::new()),
        }
    }

    fn shape<'c>(&self, code: &'c str) -> Shape<'c> {
        let mut shape = Shape::default();
        for line in code.lines() {
            if line.trim().is_empty() || line.starts_with(char::is_whitespace) {
                continue;
            }
            let trimmed = line.trim();
            if ["#", "//", "/*", "*"].iter().any(|p| trimmed.starts_with(p))
                || trimmed.starts_with(['{', '}', ')', ']'])
            {
                continue;
            }
            let is_declaration = self
                .language
                .declaration_pattern
                .as_ref()
                .map(|re| re.is_match(line))
                .unwrap_or(false);
            if is_declaration {
                shape.declarations += 1;
                shape.first_declaration.get_or_insert(trimmed);
            } else {
                shape.statements += 1;
            }
        }
        shape
    }

    fn wrap(
        &self,
        code: &str,
        sample_type: SampleType,
        implicit: &str,
    ) -> Result<(&'static str, String), TransformError> {
        let code = self.strip_header(code);
        let (body, hoisted) = self.hoist_imports(&code);
        let imports = match (implicit.is_empty(), hoisted.is_empty()) {
            (true, _) => hoisted,
            (false, true) => implicit.to_string(),
            (false, false) => format!("{}\n{}", implicit, hoisted),
        };
        let body = trim_blank_lines(&body);
        // Classification ranks concurrency and classes above async, but any
        // await in the body still needs an async entry point
        let is_async = sample_type == SampleType::Async
            || contains_any(body, &self.language.markers.async_);
        let shape = self.shape(body);
        let templates = &self.language.templates;

        let missing = |template: &str| TransformError::MissingTemplate {
            language: self.language.name().to_string(),
            template: template.to_string(),
        };

        let (name, template) = match (&templates.declarations, shape.statements) {
            (Some(template), 0) if shape.declarations > 0 => ("declarations", template),
            _ if shape.declarations > 0
                && shape.statements > 0
                && !self.language.statements_host_declarations =>
            {
                return Err(TransformError::AmbiguousShape {
                    construct: shape.first_declaration.unwrap_or_default().to_string(),
                });
            }
            _ if is_async => (
                "async",
                templates.async_.as_ref().ok_or_else(|| missing("async"))?,
            ),
            _ => (
                "sync",
                templates.sync.as_ref().ok_or_else(|| missing("sync"))?,
            ),
        };

        let mut program = fill(template, body, &imports, self.failure_marker);
        if !imports.is_empty() && !template.contains(IMPORTS_SLOT) {
            program = format!("{}\n{}", imports, program);
        }
        Ok((name, program))
    }
}

/// Substitutes the template slots. The body is re-indented as a block to the
/// indentation of the line holding `{{body}}` and is never rescanned for slots.
fn fill(template: &str, body: &str, imports: &str, marker: &str) -> String {
    let substitute = |text: &str| {
        text.replace(IMPORTS_SLOT, imports)
            .replace(MARKER_SLOT, marker)
    };

    let Some(position) = template.find(BODY_SLOT) else {
        return substitute(template);
    };
    let (before, after) = template.split_at(position);
    let after = &after[BODY_SLOT.len()..];

    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let prefix = &before[line_start..];
    let indent = if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix
    } else {
        ""
    };

    format!(
        "{}{}{}",
        substitute(before),
        reindent(body, indent),
        substitute(after)
    )
}

/// Prefixes every non-empty line but the first with `indent`.
fn reindent(body: &str, indent: &str) -> String {
    let mut out = String::with_capacity(body.len() + indent.len() * body.lines().count());
    for (i, line) in body.lines().enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.trim().is_empty() {
                out.push_str(indent);
            }
        }
        out.push_str(line);
    }
    out
}

fn trim_blank_lines(code: &str) -> &str {
    let start = code
        .lines()
        .take_while(|l| l.trim().is_empty())
        .map(|l| l.len() + 1)
        .sum::<usize>()
        .min(code.len());
    code[start..].trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tests::{language, sample};
    use crate::extractor::{classify, extract_imports};
    use crate::language::LanguageRegistry;
    use std::path::PathBuf;

    fn sample_for(language: &Language, code: &str) -> Sample {
        Sample {
            source_file: PathBuf::from("docs/page.md"),
            line_number: 1,
            code_line: 2,
            language: language.name().to_string(),
            code: code.to_string(),
            sample_type: classify(code, language),
            imports: extract_imports(code, language),
            requires_credential: false,
            requires_media: false,
        }
    }

    fn transform(lang: &str, code: &str) -> Result<TransformedProgram, TransformError> {
        let config = CheckConfig::default();
        let language = language(lang);
        let sample = sample_for(&language, code);
        Transformer::new(&language, &config).transform(&sample)
    }

    #[test]
    fn test_credential_placeholder_replaced_exactly() {
        let program = transform(
            "python",
            "from deepgram import DeepgramClient\nclient = DeepgramClient(api_key=\"YOUR_API_KEY\")\nprint(\"YOUR_API_KEYS\")",
        )
        .unwrap();
        assert!(program.source.contains("api_key=\"test_api_key\""));
        assert!(program.source.contains("\"test_api_keyS\""));
        assert!(!program.source.contains("YOUR_API_KEY"));
    }

    #[test]
    fn test_credential_substitution_is_idempotent() {
        let config = CheckConfig::default();
        let python = language("python");
        let transformer = Transformer::new(&python, &config);
        let once = transformer.substitute_credentials("key = 'YOUR_API_KEY'");
        assert_eq!(transformer.substitute_credentials(&once), once);
    }

    #[test]
    fn test_interactive_input_neutralized() {
        let program = transform(
            "python",
            "import deepgram\nanswer = input(\"press enter\")\nprint(answer)",
        )
        .unwrap();
        assert!(!program.source.contains("input("));
        assert!(program.source.contains("answer = \"test_input\""));
        assert_eq!(program.neutralized, vec!["interactive_input"]);
    }

    #[test]
    fn test_blocking_constructs_never_survive() {
        let code = "import time, signal\n\
                    while True:\n    time.sleep(10)\n    data = input()\n\
                    signal.pause()\n\
                    conn.start_listening()\n";
        let program = transform("python", code).unwrap();
        for construct in [
            "while True",
            "time.sleep(10)",
            "input()",
            "signal.pause()",
            "start_listening()",
        ] {
            assert!(
                !program.source.contains(construct),
                "{} survived:\n{}",
                construct,
                program.source
            );
        }
        assert!(program.source.contains("for _ in range(1):"));
    }

    #[test]
    fn test_go_blocking_constructs() {
        let code = "for {\n\tmsg := <-events\n\tfmt.Println(msg)\n}\nselect {}\ntime.Sleep(10 * time.Second)";
        let program = transform("go", code).unwrap();
        assert!(!program.source.contains("select {}"));
        assert!(!program.source.contains("time.Sleep(10"));
        assert!(!program.source.contains("for {"));
    }

    #[test]
    fn test_media_paths_point_at_stub() {
        let program = transform(
            "python",
            "from deepgram import DeepgramClient\nwith open(\"/Users/me/call.mp3\", \"rb\") as f:\n    f.read()",
        )
        .unwrap();
        assert!(program.source.contains("open(\"sample_media.wav\""));
    }

    #[test]
    fn test_body_reindented_as_block() {
        let program = transform(
            "csharp",
            "var x = 1;\nif (x > 0)\n{\n    Console.WriteLine(x);\n}",
        )
        .unwrap();
        assert_eq!(program.entry_template, Some("sync"));
        assert!(program.source.contains(
            "            var x = 1;\n            if (x > 0)\n            {\n                Console.WriteLine(x);\n            }"
        ));
    }

    #[test]
    fn test_csharp_usings_hoisted_out_of_main() {
        let program = transform(
            "csharp",
            "using Deepgram;\n\nvar client = ClientFactory.CreateListenRESTClient();",
        )
        .unwrap();
        let using = program.source.find("using Deepgram;").unwrap();
        let class = program.source.find("public static class").unwrap();
        assert!(using < class);
        assert_eq!(program.source.matches("using Deepgram;").count(), 1);
    }

    #[test]
    fn test_csharp_async_template() {
        let program = transform(
            "csharp",
            "var result = await client.TranscribeUrl(source);\nConsole.WriteLine(result);",
        )
        .unwrap();
        assert_eq!(program.entry_template, Some("async"));
        assert!(program.source.contains("async System.Threading.Tasks.Task Main"));
    }

    #[test]
    fn test_mixed_declarations_and_statements_are_ambiguous() {
        let err = transform(
            "csharp",
            "var handler = new Handler();\npublic class Handler\n{\n    public void Run() {}\n}",
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransformError::AmbiguousShape {
                construct: "public class Handler".to_string()
            }
        );
    }

    #[test]
    fn test_declarations_only_use_declarations_template() {
        let program = transform(
            "go",
            "package main\n\ntype Handler struct {\n\tName string\n}\n\nfunc (h Handler) Run() {}",
        )
        .unwrap();
        assert_eq!(program.entry_template, Some("declarations"));
        assert_eq!(program.source.matches("package main").count(), 1);
        assert!(program.source.contains("func main() {}"));
    }

    #[test]
    fn test_multiple_entry_points_rejected() {
        let err = transform(
            "go",
            "package main\n\nfunc main() {\n}\n\nfunc main() {\n}",
        )
        .unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn test_complete_program_gets_missing_header() {
        let program = transform(
            "go",
            "import \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"deepgram\")\n}",
        )
        .unwrap();
        assert_eq!(program.entry_template, None);
        assert!(program.source.starts_with("package main\n\nimport \"fmt\""));
    }

    #[test]
    fn test_go_snippet_wrapped_in_main_with_imports() {
        let program = transform(
            "go",
            "import \"context\"\n\nctx := context.Background()\nfmt.Println(ctx)",
        )
        .unwrap();
        assert_eq!(program.entry_template, Some("sync"));
        let import = program.source.find("import \"context\"").unwrap();
        let main = program.source.find("func main()").unwrap();
        assert!(import < main);
        assert!(program.source.contains("\tctx := context.Background()\n\tfmt.Println(ctx)"));
    }

    #[test]
    fn test_python_failure_boundary_carries_marker() {
        let program = transform("python", "import deepgram\nprint(deepgram.__name__)").unwrap();
        assert!(program.source.contains("SAMPLE_CHECK_FAILURE"));
        assert!(program.source.contains("try:\n    import deepgram"));
        assert_eq!(program.file_name, "sample.py");
    }

    #[test]
    fn test_python_async_sample_runs_inside_event_loop() {
        let code = "from deepgram import AsyncDeepgramClient\nclient = AsyncDeepgramClient()\nresult = await client.listen()\nprint(result)";
        let program = transform("python", code).unwrap();
        assert_eq!(program.entry_template, Some("async"));
        // Imports hoisted above the coroutine, body indented inside it
        assert!(program.source.contains("    from deepgram import AsyncDeepgramClient\n"));
        assert!(program
            .source
            .contains("        client = AsyncDeepgramClient()\n        result = await client.listen()"));
    }

    #[test]
    fn test_python_main_guard_is_complete_program() {
        let program = transform(
            "python",
            "import deepgram\n\nif __name__ == \"__main__\":\n    print(deepgram)",
        )
        .unwrap();
        assert_eq!(program.entry_template, None);
    }

    #[test]
    fn test_missing_template() {
        let config = CheckConfig::from_toml_str(
            r#"
[languages.shell]
command = "sh"

[languages.shell.templates]
sync = "{{body}}"

[languages.shell.markers]
async = [" &"]
"#,
        )
        .unwrap();
        let shell = LanguageRegistry::from_config(&config)
            .get("shell")
            .unwrap()
            .unwrap();
        let sample = sample_for(&shell, "sleep 1 &\nwait");
        assert_eq!(sample.sample_type, SampleType::Async);

        let err = Transformer::new(&shell, &config).transform(&sample).unwrap_err();
        assert_eq!(
            err,
            TransformError::MissingTemplate {
                language: "shell".to_string(),
                template: "async".to_string()
            }
        );
    }

    #[test]
    fn test_transformation_does_not_touch_sample() {
        let config = CheckConfig::default();
        let python = language("python");
        let sample = sample("docs/a.md", 3, "x = input('YOUR_API_KEY')");
        let before = sample.clone();
        Transformer::new(&python, &config).transform(&sample).unwrap();
        assert_eq!(sample, before);
    }

    #[test]
    fn test_concurrent_csharp_sample_with_await_gets_async_main() {
        let code = "var client = new DeepgramClient();\nvar a = client.Listen();\nawait Task.WhenAll(a);";
        let program = transform("csharp", code).unwrap();
        assert_eq!(classify(code, &language("csharp")), SampleType::Concurrent);
        assert_eq!(program.entry_template, Some("async"));
        assert!(program.source.contains("async System.Threading.Tasks.Task Main"));
        assert!(!program.source.contains("static void Main"));
    }

    #[test]
    fn test_python_class_sample_with_top_level_await() {
        let code = "from deepgram import AsyncDeepgramClient\n\nclass Printer:\n    def show(self, value):\n        print(value)\n\nresult = await AsyncDeepgramClient().listen()\nPrinter().show(result)";
        assert_eq!(classify(code, &language("python")), SampleType::ClassDefinition);
        let program = transform("python", code).unwrap();
        assert_eq!(program.entry_template, Some("async"));
        assert!(program
            .source
            .contains("        result = await AsyncDeepgramClient().listen()"));
    }

    const PARENTHESIZED_IMPORT: &str =
        "from deepgram import (\n    DeepgramClient,\n    PrerecordedOptions,\n)\n\n";

    #[test]
    fn test_parenthesized_import_hoisted_whole() {
        let sync = format!(
            "{}client = DeepgramClient()\noptions = PrerecordedOptions()",
            PARENTHESIZED_IMPORT
        );
        let asynchronous = format!(
            "{}client = DeepgramClient()\nresponse = await client.listen()",
            PARENTHESIZED_IMPORT
        );

        for (code, template) in [(sync, "sync"), (asynchronous, "async")] {
            let program = transform("python", &code).unwrap();
            assert_eq!(program.entry_template, Some(template));
            assert!(
                program.source.contains(
                    "    from deepgram import (\n        DeepgramClient,\n        PrerecordedOptions,\n    )"
                ),
                "{}",
                program.source
            );
            let import = program.source.find("from deepgram import (").unwrap();
            let client = program.source.find("client = DeepgramClient()").unwrap();
            assert!(import < client);
            assert_eq!(program.source.matches("PrerecordedOptions,").count(), 1);
        }
    }

    #[test]
    fn test_implicit_imports_added_when_used() {
        let program = transform(
            "python",
            "from deepgram import DeepgramClient\nkey = os.getenv(\"DEEPGRAM_API_KEY\")\ntime.sleep(1)\nload_dotenv()",
        )
        .unwrap();
        assert_eq!(program.implicit_imports, vec!["time", "os", "dotenv"]);
        assert!(program.source.contains("    import time\n    import os\n    try:\n        from dotenv import load_dotenv"));
        let stub = program.source.find("def load_dotenv").unwrap();
        let call = program.source.find("load_dotenv()").unwrap();
        assert!(stub < call);
    }

    #[test]
    fn test_implicit_imports_not_duplicated() {
        let program = transform(
            "python",
            "import os, time\nfrom pathlib import Path\nfrom deepgram import DeepgramClient\nprint(os.getcwd(), Path(\".\"), time.time())",
        )
        .unwrap();
        assert!(program.implicit_imports.is_empty());
        assert_eq!(program.source.matches("import os").count(), 1);
    }

    #[test]
    fn test_implicit_import_ignores_attribute_access() {
        let program = transform(
            "python",
            "from deepgram import DeepgramClient\nresult = client.os.value\nmatch = response.re.find()",
        )
        .unwrap();
        assert!(program.implicit_imports.is_empty());
    }

    #[test]
    fn test_implicit_imports_in_complete_program() {
        let program = transform(
            "python",
            "from deepgram import DeepgramClient\n\nif __name__ == \"__main__\":\n    requests.get(\"https://example.com\")",
        )
        .unwrap();
        assert_eq!(program.entry_template, None);
        assert_eq!(program.implicit_imports, vec!["requests"]);
        let stub = program.source.find("class requests:").unwrap();
        let guard = program.source.find("if __name__").unwrap();
        assert!(stub < guard);
    }

    #[test]
    fn test_future_import_stays_first() {
        let program = transform(
            "python",
            "from __future__ import annotations\nfrom deepgram import DeepgramClient\n\ndef show(value: DeepgramClient) -> None:\n    print(value)",
        )
        .unwrap();
        assert!(program
            .source
            .starts_with("from __future__ import annotations\n"));
        assert_eq!(program.source.matches("__future__").count(), 1);
        assert!(program.source.contains("try:\n"));
    }

    #[test]
    fn test_input_methods_and_definitions_untouched() {
        let program = transform(
            "python",
            "from deepgram import DeepgramClient\n\ndef input(prompt):\n    return prompt\n\nvalue = options.input(\"x\")\nname = input(\"who\")",
        )
        .unwrap();
        assert!(program.source.contains("def input(prompt):"));
        assert!(program.source.contains("options.input(\"x\")"));
        assert!(program.source.contains("name = \"test_input\""));
    }

    #[test]
    fn test_python_live_and_network_rewrites() {
        let code = "from deepgram import DeepgramClient\n\
                    import asyncio\n\
                    await connection.connect()\n\
                    url = \"https://dpgr.am/spacewalk.wav\"\n\
                    with open(\"/var/out/transcript.txt\", \"w\") as out:\n    out.write(url)\n\
                    await asyncio.sleep(30)\n\
                    await asyncio.Event().wait()\n\
                    loop.run_forever()";
        let program = transform("python", code).unwrap();
        let source = &program.source;

        assert!(!source.contains("connect()"), "{}", source);
        assert!(!source.contains("dpgr.am"));
        assert!(source.contains("\"https://example.com/sample-audio\""));
        assert!(source.contains("open(\"sample_output.tmp\", \"w\")"));
        assert!(!source.contains("/var/out"));
        assert!(source.contains("await asyncio.sleep(0)"));
        assert!(!source.contains("asyncio.sleep(30)"));
        assert!(!source.contains("Event().wait()"));
        assert!(!source.contains("run_forever"));
        for name in [
            "websocket_connect",
            "hosted_audio_double",
            "file_write",
            "async_sleep",
            "forever_wait",
            "run_forever",
        ] {
            assert!(program.neutralized.iter().any(|n| n == name), "{}", name);
        }
    }

    /// A sample containing the construct each built-in neutralization entry targets.
    fn neutralize_trigger(language: &str, entry: &str) -> &'static str {
        match (language, entry) {
            ("python", "interactive_input") => "answer = input(\"continue? \")",
            ("python", "stdin_read") => "data = sys.stdin.read()",
            ("python", "infinite_loop") => "while True:\n    poll()",
            ("python", "long_sleep") => "time.sleep(5)",
            ("python", "async_sleep") => "await asyncio.sleep(2.5)",
            ("python", "forever_wait") => "await asyncio.Future()",
            ("python", "run_forever") => "loop.run_forever()",
            ("python", "signal_pause") => "signal.pause()",
            ("python", "start_listening") => "await microphone.start_listening()",
            ("python", "websocket_connect") => "dg_connection.connect()",
            ("python", "hosted_audio_double") => "url = \"https://dpgr.am/bueller.wav\"",
            ("python", "hosted_audio_single") => "url = 'https://dpgr.am/bueller.wav'",
            ("python", "file_write") => "with open('result.json', 'wb') as f:\n    pass",
            ("python", "media_path_double") => "open(\"audio/call.flac\", \"rb\")",
            ("python", "media_path_single") => "open('audio/call.opus', 'rb')",
            ("csharp", "read_line") => "var line = Console.ReadLine();",
            ("csharp", "read_key") => "Console.ReadKey(true);",
            ("csharp", "infinite_loop") => "while (true)\n{\n    Poll();\n}",
            ("csharp", "thread_sleep") => "Thread.Sleep(TimeSpan.FromSeconds(5));",
            ("csharp", "infinite_delay") => "await Task.Delay(Timeout.Infinite);",
            ("csharp", "media_path") => "var bytes = File.ReadAllBytes(\"C:/audio/call.m4a\");",
            ("go", "empty_select") => "select {}",
            ("go", "infinite_loop") => "for {\n\tpoll()\n}",
            ("go", "long_sleep") => "time.Sleep(time.Duration(5) * time.Second)",
            ("go", "media_path") => "f, _ := os.Open(\"/tmp/call.wav\")",
            ("javascript", "infinite_loop") => "while (true) {\n  poll();\n}",
            ("javascript", "interval_timer") => "setInterval(poll, 1000);",
            ("javascript", "media_path_double") => "fs.readFileSync(\"./call.mp3\")",
            ("javascript", "media_path_single") => "fs.readFileSync('./call.mp3')",
            _ => panic!("no trigger sample for {} entry {}", language, entry),
        }
    }

    #[test]
    fn test_every_neutralization_entry_is_total() {
        let config = CheckConfig::default();
        for name in ["python", "csharp", "go", "javascript"] {
            let language = language(name);
            let transformer = Transformer::new(&language, &config);
            for entry in &language.neutralize {
                let trigger = neutralize_trigger(name, &entry.name);
                assert!(
                    entry.pattern.is_match(trigger),
                    "{}: {} does not match its trigger",
                    name,
                    entry.name
                );

                let (once, applied) = transformer.neutralize(trigger);
                assert!(applied.contains(&entry.name), "{}: {}", name, entry.name);
                // Either the construct is gone or the rewrite is a fixed point
                let (twice, _) = transformer.neutralize(&once);
                assert!(
                    !entry.pattern.is_match(&once) || twice == once,
                    "{}: {} left {:?}",
                    name,
                    entry.name,
                    once
                );
            }
        }
    }

    #[test]
    fn test_reindent_keeps_blank_lines_empty() {
        assert_eq!(reindent("a\n\n  b", "    "), "a\n\n      b");
    }
}
