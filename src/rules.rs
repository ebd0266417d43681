use crate::config::RuleConfig;
use crate::error::RuleError;
use crate::extractor::Sample;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How urgently a failed finding needs attention.
///
/// Ordering is significant: `Blocking` sorts before `Improvement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The sample breaks for an end user
    #[default]
    Blocking,
    /// The sample works but could teach better practice
    Improvement,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Blocking => write!(f, "blocking"),
            Severity::Improvement => write!(f, "improvement"),
        }
    }
}

/// The result of one rule applied to one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub rule_name: String,
    pub severity: Severity,
    pub passed: bool,
    /// Names the matched text (or missing pattern) and its `file:line`
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

enum Matcher {
    Literal(String),
    Pattern(Regex),
}

impl Matcher {
    fn new(rule: &RuleConfig) -> Result<Self, RuleError> {
        if rule.literal {
            return Ok(Matcher::Literal(rule.pattern.clone()));
        }
        Regex::new(&rule.pattern)
            .map(Matcher::Pattern)
            .map_err(|e| RuleError::InvalidPattern {
                rule: rule.name.clone(),
                message: e.to_string(),
            })
    }

    /// Byte offset of the first match
    fn find(&self, code: &str) -> Option<usize> {
        match self {
            Matcher::Literal(needle) => code.find(needle.as_str()),
            Matcher::Pattern(re) => re.find(code).map(|m| m.start()),
        }
    }
}

/// Evaluates every rule against one sample, one finding per rule, in rule order.
///
/// Rules are pure pattern checks over the original sample text, so this can be
/// called for samples that failed transformation or execution. A rule with an
/// unparseable pattern yields a failed finding carrying the `ValidationError`
/// instead of aborting the remaining rules.
pub fn evaluate(sample: &Sample, rules: &[RuleConfig]) -> Vec<ValidationFinding> {
    rules.iter().map(|rule| evaluate_rule(sample, rule)).collect()
}

/// Maps each rule name to its pass/fail outcome.
pub fn outcomes(sample: &Sample, rules: &[RuleConfig]) -> BTreeMap<String, bool> {
    evaluate(sample, rules)
        .into_iter()
        .map(|finding| (finding.rule_name, finding.passed))
        .collect()
}

fn evaluate_rule(sample: &Sample, rule: &RuleConfig) -> ValidationFinding {
    let finding = |passed: bool, detail: String| ValidationFinding {
        rule_name: rule.name.clone(),
        severity: rule.severity,
        passed,
        detail,
        description: rule.description.clone(),
        fix: rule.fix.clone(),
    };

    if let Some(ref when) = rule.when {
        match Regex::new(when) {
            Ok(re) if !re.is_match(&sample.code) => {
                return finding(true, "not applicable".to_string());
            }
            Ok(_) => {}
            Err(e) => {
                let err = RuleError::InvalidPattern {
                    rule: rule.name.clone(),
                    message: e.to_string(),
                };
                log::warn!("{}", err);
                return finding(false, err.to_string());
            }
        }
    }

    let matcher = match Matcher::new(rule) {
        Ok(matcher) => matcher,
        Err(err) => {
            log::warn!("{}", err);
            return finding(false, err.to_string());
        }
    };

    let found = matcher.find(&sample.code);
    let passed = found.is_some() == rule.expected_present;
    log::debug!(
        "Rule {} on {}: {}",
        rule.name,
        sample.location(),
        if passed { "passed" } else { "failed" }
    );

    let detail = match found {
        Some(offset) => {
            let (line_number, line) = sample.line_at(offset);
            format!(
                "found `{}` at {}:{}",
                line.trim(),
                sample.source_file.display(),
                line_number
            )
        }
        None => format!(
            "pattern `{}` not found in sample at {}",
            rule.pattern,
            sample.location()
        ),
    };

    finding(passed, detail)
}
