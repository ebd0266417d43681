use crate::config::CheckConfig;
use crate::error::ExtractionError;
use crate::language::Language;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Structural shape of a sample, decided by ordered marker checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleType {
    Sync,
    Async,
    Snippet,
    ClassDefinition,
    Concurrent,
    Web,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleType::Sync => "sync",
            SampleType::Async => "async",
            SampleType::Snippet => "snippet",
            SampleType::ClassDefinition => "class-definition",
            SampleType::Concurrent => "concurrent",
            SampleType::Web => "web",
        };
        f.write_str(name)
    }
}

/// One fenced code block found in one document.
///
/// A sample is never mutated after extraction; transformation, execution and
/// validation all read it by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub source_file: PathBuf,
    /// 1-based line of the opening fence
    pub line_number: usize,
    /// 1-based line of the first line of `code`
    pub code_line: usize,
    pub language: String,
    pub code: String,
    pub sample_type: SampleType,
    /// Import/using statements in source order, duplicates preserved
    pub imports: Vec<String>,
    pub requires_credential: bool,
    pub requires_media: bool,
}

impl Sample {
    /// `file:line` of the opening fence.
    pub fn location(&self) -> String {
        format!("{}:{}", self.source_file.display(), self.line_number)
    }

    /// Document line number and text of the code line containing byte `offset`.
    pub fn line_at(&self, offset: usize) -> (usize, &str) {
        let offset = offset.min(self.code.len());
        let start = self.code[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let end = self.code[offset..]
            .find('\n')
            .map(|i| offset + i)
            .unwrap_or(self.code.len());
        let index = self.code[..start].matches('\n').count();
        (self.code_line + index, &self.code[start..end])
    }
}

/// Document-independent knobs for deciding which blocks are samples.
#[derive(Debug, Clone)]
pub struct ExtractionFilter {
    pub min_chars: usize,
    /// Lowercased; empty accepts everything
    pub product_markers: Vec<String>,
    pub credential_placeholders: Vec<String>,
}

impl ExtractionFilter {
    pub fn from_config(config: &CheckConfig) -> Self {
        Self {
            min_chars: config.execution.min_sample_chars,
            product_markers: config
                .documentation
                .product_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            credential_placeholders: config.credentials.placeholders.clone(),
        }
    }
}

impl Default for ExtractionFilter {
    fn default() -> Self {
        Self::from_config(&CheckConfig::default())
    }
}

/// Extracts samples of one language from one document.
///
/// Extraction is lazy: [`SampleExtractor::samples`] returns a fresh iterator
/// each time it is called, so the sequence can be restarted.
///
/// # Example
///
/// ```ignore
/// let extractor = SampleExtractor::new(path, &content, &language, &filter);
/// for sample in extractor.samples() {
///     match sample {
///         Ok(sample) => println!("{} {}", sample.location(), sample.sample_type),
///         Err(e) => log::error!("{}", e),
///     }
/// }
/// ```
pub struct SampleExtractor<'a> {
    path: &'a Path,
    content: Cow<'a, str>,
    language: &'a Language,
    filter: &'a ExtractionFilter,
}

impl<'a> SampleExtractor<'a> {
    pub fn new(
        path: &'a Path,
        content: &'a str,
        language: &'a Language,
        filter: &'a ExtractionFilter,
    ) -> Self {
        Self {
            path,
            content: mask_component_lines(content),
            language,
            filter,
        }
    }

    pub fn samples(&self) -> Samples<'_> {
        let parser = Parser::new(&self.content).into_offset_iter();
        Samples {
            extractor: self,
            events: Box::new(parser),
            open: None,
            finished: false,
        }
    }

    fn build(&self, block: OpenBlock) -> Option<Sample> {
        let line_number = self.content[..block.range.start].matches('\n').count() + 1;
        let (code, leading_blank) = trim_blank_lines(&block.code);

        if let Some(reason) = self.skip_reason(code) {
            log::debug!(
                "Skipping block at {}:{} ({})",
                self.path.display(),
                line_number,
                reason
            );
            return None;
        }

        let markers = &self.language.markers;
        let requires_credential = contains_any(code, &markers.credential)
            || contains_any(code, &self.filter.credential_placeholders);

        Some(Sample {
            source_file: self.path.to_path_buf(),
            line_number,
            code_line: line_number + 1 + leading_blank,
            language: self.language.name().to_string(),
            code: code.to_string(),
            sample_type: classify(code, self.language),
            imports: extract_imports(code, self.language),
            requires_credential,
            requires_media: contains_any_ignore_case(code, &markers.media),
        })
    }

    fn skip_reason(&self, code: &str) -> Option<&'static str> {
        if code.trim().chars().count() < self.filter.min_chars {
            return Some("too short");
        }
        if code
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .all(is_comment_line)
        {
            return Some("comment-only");
        }
        if !self.filter.product_markers.is_empty() {
            let lowered = code.to_lowercase();
            if !self
                .filter
                .product_markers
                .iter()
                .any(|m| lowered.contains(m.as_str()))
            {
                return Some("no product reference");
            }
        }
        None
    }
}

struct OpenBlock {
    tag: String,
    range: Range<usize>,
    code: String,
}

/// Lazy sample sequence over one document.
///
/// Yields `Err` once for an unclosed fence and then ends: an unclosed fence
/// swallows the remainder of the document, so nothing after it can be trusted.
pub struct Samples<'a> {
    extractor: &'a SampleExtractor<'a>,
    events: Box<dyn Iterator<Item = (Event<'a>, Range<usize>)> + 'a>,
    open: Option<OpenBlock>,
    finished: bool,
}

impl Iterator for Samples<'_> {
    type Item = Result<Sample, ExtractionError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let Some((event, range)) = self.events.next() else {
                self.finished = true;
                break;
            };

            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    self.open = Some(OpenBlock {
                        tag: fence_language(&info).to_string(),
                        range,
                        code: String::new(),
                    });
                }

                Event::Text(text) => {
                    if let Some(ref mut block) = self.open {
                        block.code.push_str(&text);
                    }
                }

                Event::End(TagEnd::CodeBlock) => {
                    let Some(block) = self.open.take() else {
                        continue;
                    };

                    let source = &self.extractor.content[block.range.clone()];
                    if !is_closed_fence(source) {
                        self.finished = true;
                        let line =
                            self.extractor.content[..block.range.start].matches('\n').count() + 1;
                        return Some(Err(ExtractionError::new(
                            self.extractor.path,
                            line,
                            format!("unclosed code fence (```{})", block.tag),
                        )));
                    }

                    if !self.extractor.language.matches_fence(&block.tag) {
                        continue;
                    }

                    if let Some(sample) = self.extractor.build(block) {
                        return Some(Ok(sample));
                    }
                }

                _ => {}
            }
        }
        None
    }
}

/// Extracts all samples of a document eagerly, separating recovered errors.
pub fn extract_document(
    path: &Path,
    content: &str,
    language: &Language,
    filter: &ExtractionFilter,
) -> (Vec<Sample>, Vec<ExtractionError>) {
    let extractor = SampleExtractor::new(path, content, language, filter);
    let mut samples = Vec::new();
    let mut errors = Vec::new();
    for item in extractor.samples() {
        match item {
            Ok(sample) => samples.push(sample),
            Err(e) => errors.push(e),
        }
    }
    (samples, errors)
}

/// Parse the language tag out of a fence info string
/// Examples:
/// - "python" -> "python"
/// - "python title=\"Transcribe\"" -> "python"
/// - "cs,ignore" -> "cs"
/// - "go{1-3}" -> "go"
fn fence_language(info: &str) -> &str {
    info.trim()
        .split(|c: char| c == ',' || c == '{' || c.is_whitespace())
        .next()
        .unwrap_or("")
}

/// Blanks out lines that consist of a single MDX component tag.
///
/// `<Tabs>` style lines would otherwise open an HTML block that swallows the
/// fences nested inside the component. Byte offsets are preserved.
fn mask_component_lines(content: &str) -> Cow<'_, str> {
    let is_component = |line: &str| {
        let t = line.trim();
        let inner = t.strip_prefix("</").or_else(|| t.strip_prefix('<'));
        matches!(inner, Some(rest) if rest.starts_with(|c: char| c.is_ascii_uppercase()))
            && t.ends_with('>')
    };

    if !content.lines().any(is_component) {
        return Cow::Borrowed(content);
    }

    let mut masked = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        if is_component(body) {
            masked.extend(std::iter::repeat(' ').take(body.len()));
            masked.push_str(&line[body.len()..]);
        } else {
            masked.push_str(line);
        }
    }
    Cow::Owned(masked)
}

fn is_closed_fence(source: &str) -> bool {
    let strip = |line: &str| {
        line.trim_start_matches(|c: char| c == ' ' || c == '\t' || c == '>')
            .trim_end()
            .to_string()
    };

    let mut lines = source.trim_end_matches(['\n', '\r']).lines();
    let Some(first) = lines.next().map(strip) else {
        return false;
    };
    let Some(fence_char) = first.chars().next().filter(|c| *c == '`' || *c == '~') else {
        return false;
    };
    let fence_len = first.chars().take_while(|c| *c == fence_char).count();

    match lines.last().map(strip) {
        Some(last) => last.len() >= fence_len && last.chars().all(|c| c == fence_char),
        None => false,
    }
}

/// Trims leading/trailing blank lines, returning the rest and how many
/// leading lines were removed. Internal indentation is untouched.
fn trim_blank_lines(code: &str) -> (&str, usize) {
    let mut start = 0;
    let mut leading = 0;
    for line in code.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
        leading += 1;
    }

    let rest = &code[start..];
    let mut end = rest.len();
    for line in rest.split_inclusive('\n').rev() {
        if !line.trim().is_empty() {
            break;
        }
        end -= line.len();
    }
    (rest[..end].trim_end_matches(['\n', '\r']), leading)
}

fn is_comment_line(line: &str) -> bool {
    ["#", "//", "/*", "*", "--"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

pub(crate) fn contains_any(code: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| code.contains(m.as_str()))
}

fn contains_any_ignore_case(code: &str, markers: &[String]) -> bool {
    let lowered = code.to_lowercase();
    markers
        .iter()
        .any(|m| lowered.contains(m.to_lowercase().as_str()))
}

/// Ordered structural checks, most specific first.
pub fn classify(code: &str, language: &Language) -> SampleType {
    let markers = &language.markers;
    if contains_any(code, &markers.concurrent) {
        SampleType::Concurrent
    } else if contains_any(code, &markers.class) {
        SampleType::ClassDefinition
    } else if contains_any(code, &markers.async_) {
        SampleType::Async
    } else if contains_any(code, &markers.web) {
        SampleType::Web
    } else if contains_any(code, &markers.console) {
        SampleType::Snippet
    } else {
        SampleType::Sync
    }
}

/// Import statements in first-occurrence order, duplicates preserved.
pub fn extract_imports(code: &str, language: &Language) -> Vec<String> {
    match language.import_pattern {
        Some(ref re) => re
            .find_iter(code)
            .map(|m| m.as_str().trim().to_string())
            .collect(),
        None => Vec::new(),
    }
}
