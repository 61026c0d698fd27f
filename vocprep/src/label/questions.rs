//! HTS question sets
//!
//! Two question kinds are understood:
//! - `QS "name" {pat1,pat2,...}`: 1.0 when the full-context label matches any
//!   pattern, else 0.0. Patterns use HTS wildcards (`*` any run, `?` one
//!   character) and must match the whole label.
//! - `CQS "name" {regex}`: the number captured by the regex's first group,
//!   or 0.0 when the regex does not match or the capture is not numeric.
//!
//! Blank lines and lines starting with `#` are ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use super::LabelError;

static QUESTION_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(C?QS)\s+"([^"]*)"\s+\{(.*)\}\s*$"#).expect("static regex")
});

/// One binarization question
#[derive(Debug, Clone)]
pub enum Question {
    Binary { name: String, patterns: Vec<Regex> },
    Numeric { name: String, pattern: Regex },
}

impl Question {
    pub fn name(&self) -> &str {
        match self {
            Question::Binary { name, .. } | Question::Numeric { name, .. } => name,
        }
    }

    /// Answer the question for one full-context label
    pub fn answer(&self, label: &str) -> f32 {
        match self {
            Question::Binary { patterns, .. } => {
                if patterns.iter().any(|p| p.is_match(label)) {
                    1.0
                } else {
                    0.0
                }
            }
            Question::Numeric { pattern, .. } => pattern
                .captures(label)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f32>().ok())
                .unwrap_or(0.0),
        }
    }
}

/// Ordered list of questions; answer order matches file order
#[derive(Debug, Clone, Default)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a question file
    pub fn load(path: &Path) -> Result<Self, LabelError> {
        let content = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse question file text; `path` is used in error messages only
    pub fn parse(content: &str, path: &Path) -> Result<Self, LabelError> {
        let mut questions = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let error = |reason: String| LabelError::Questions {
                path: path.to_path_buf(),
                line: line_no + 1,
                reason,
            };

            let caps = QUESTION_LINE_RE.captures(trimmed).ok_or_else(|| {
                error("expected QS \"name\" {...} or CQS \"name\" {...}".to_string())
            })?;
            let name = caps[2].to_string();
            let body = caps[3].trim();

            let question = if &caps[1] == "QS" {
                let patterns = body
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| {
                        Regex::new(&wildcard_to_regex(p))
                            .map_err(|e| error(format!("bad pattern '{}': {}", p, e)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if patterns.is_empty() {
                    return Err(error(format!("question '{}' has no patterns", name)));
                }
                Question::Binary { name, patterns }
            } else {
                let pattern = Regex::new(body)
                    .map_err(|e| error(format!("bad regex '{}': {}", body, e)))?;
                if pattern.captures_len() < 2 {
                    return Err(error(format!(
                        "numeric question '{}' needs a capture group",
                        name
                    )));
                }
                Question::Numeric { name, pattern }
            };

            questions.push(question);
        }

        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Answers for every question, in order
    pub fn answer_all(&self, label: &str) -> Vec<f32> {
        self.questions.iter().map(|q| q.answer(label)).collect()
    }
}

/// Translate an HTS wildcard pattern into an anchored regex
fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4]))),
        }
    }
    out.push('$');
    out
}
