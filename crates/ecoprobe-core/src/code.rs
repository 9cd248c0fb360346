//! Code-quality checks on fetched script and style-sheet text.

use crate::{Error, Result};
use glob::Pattern;
use serde::Serialize;
use tree_sitter::{Language, Node, Parser};

/// Whether `code` looks minified: its average line length exceeds
/// `max_line_length`. Text without any line break counts as minified.
pub fn is_minified(code: &str, max_line_length: f64) -> bool {
    match average_line_length(code) {
        Some(average) => average > max_line_length,
        None => true,
    }
}

/// Characters per line break, `None` when there is no line break
pub fn average_line_length(code: &str) -> Option<f64> {
    let line_breaks = code.matches('\n').count();
    if line_breaks == 0 {
        return None;
    }
    Some(code.chars().count() as f64 / line_breaks as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// Unparseable span
    Error,
    /// Token the parser had to insert
    Missing,
}

/// One syntax problem reported by a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxIssue {
    pub kind: IssueKind,
    /// 1-indexed
    pub line: usize,
    /// 1-indexed
    pub column: usize,
}

/// Checks JavaScript source for syntax errors
pub trait ScriptValidator: Send {
    /// Issues found in `code`; `Err` when the code could not be parsed at all
    fn validate(&self, code: &str) -> Result<Vec<SyntaxIssue>>;
}

/// Number of defects a validation outcome adds to the error counter
pub fn defect_count(outcome: &Result<Vec<SyntaxIssue>>) -> u64 {
    match outcome {
        Ok(issues) => issues.len() as u64,
        Err(_) => 1,
    }
}

/// Validator backed by the tree-sitter JavaScript grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterValidator;

impl ScriptValidator for TreeSitterValidator {
    fn validate(&self, code: &str) -> Result<Vec<SyntaxIssue>> {
        let language: Language = tree_sitter_javascript::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| Error::ScriptParse(format!("Failed to load JavaScript grammar: {}", e)))?;

        let tree = parser
            .parse(code, None)
            .ok_or_else(|| Error::ScriptParse("Parser returned no tree".to_string()))?;

        let mut issues = Vec::new();
        collect_issues(tree.root_node(), &mut issues);
        Ok(issues)
    }
}

fn collect_issues(node: Node<'_>, issues: &mut Vec<SyntaxIssue>) {
    if node.is_error() || node.is_missing() {
        let position = node.start_position();
        issues.push(SyntaxIssue {
            kind: if node.is_missing() {
                IssueKind::Missing
            } else {
                IssueKind::Error
            },
            line: position.row + 1,
            column: position.column + 1,
        });
        return;
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_issues(child, issues);
    }
}

/// URL pattern for resources left out of code analysis
///
/// Patterns containing `*` or `?` are globs over the whole URL, anything else
/// matches as a substring.
#[derive(Debug, Clone)]
pub enum ResourcePattern {
    Contains(String),
    Glob(Pattern),
}

impl ResourcePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.contains('*') || pattern.contains('?') {
            let glob = Pattern::new(pattern).map_err(|e| {
                Error::InvalidPattern(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
            Ok(ResourcePattern::Glob(glob))
        } else {
            Ok(ResourcePattern::Contains(pattern.to_string()))
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            ResourcePattern::Contains(fragment) => url.contains(fragment.as_str()),
            ResourcePattern::Glob(glob) => glob.matches(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_long_line_is_minified() {
        let code = "a".repeat(2000);
        assert!(is_minified(&code, 500.0));
    }

    #[test]
    fn test_many_short_lines_are_not_minified() {
        let code = "abcdefghijklmnopqrs\n".repeat(100);
        assert_eq!(code.chars().count(), 2000);
        assert!(!is_minified(&code, 500.0));
        assert_eq!(average_line_length(&code), Some(20.0));
    }

    #[test]
    fn test_empty_text_counts_as_minified() {
        assert!(is_minified("", 500.0));
    }

    #[test]
    fn test_valid_script_has_no_issues() {
        let issues = TreeSitterValidator
            .validate("function add(a, b) { return a + b; }\nconst x = add(1, 2);\n")
            .unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn test_broken_script_reports_issues() {
        let outcome = TreeSitterValidator.validate("function (a, { return a + ; }\n");
        assert!(defect_count(&outcome) >= 1);
        let issues = outcome.unwrap();
        assert!(issues.iter().all(|issue| issue.line >= 1 && issue.column >= 1));
    }

    #[test]
    fn test_parse_failure_counts_one_defect() {
        let outcome: Result<Vec<SyntaxIssue>> = Err(Error::ScriptParse("boom".to_string()));
        assert_eq!(defect_count(&outcome), 1);
    }

    #[test]
    fn test_resource_patterns() {
        let contains = ResourcePattern::parse("script/analyseFrame.js").unwrap();
        assert!(contains.matches("chrome-extension://abc/script/analyseFrame.js"));
        assert!(!contains.matches("https://example.com/app.js"));

        let glob = ResourcePattern::parse("https://*.example.com/*.js").unwrap();
        assert!(glob.matches("https://cdn.example.com/lib/app.js"));
        assert!(!glob.matches("https://cdn.example.org/app.js"));

        assert!(ResourcePattern::parse("[*").is_err());
    }
}
