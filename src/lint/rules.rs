// src/lint/rules.rs

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::result::Severity;

static DEBUGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdebugger\b").expect("valid regex"));
static CONSOLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconsole\.[A-Za-z]+\s*\(").expect("valid regex"));
static IMPORTANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\s*important\b").expect("valid regex"));
static EMPTY_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*\}").expect("valid regex"));
static ID_SELECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:{};]*#[A-Za-z_][\w-]*[^{};]*\{").expect("valid regex"));

/// Built-in lint rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LintRule {
    NoDebugger,
    NoConsole,
    NoTrailingWhitespace,
    MaxLineLength,
    NoTabs,
    NoImportant,
    NoEmptyRule,
    NoIdSelectors,
}

/// A single rule violation. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub rule: LintRule,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl LintRule {
    pub const ALL: [LintRule; 8] = [
        LintRule::NoDebugger,
        LintRule::NoConsole,
        LintRule::NoTrailingWhitespace,
        LintRule::MaxLineLength,
        LintRule::NoTabs,
        LintRule::NoImportant,
        LintRule::NoEmptyRule,
        LintRule::NoIdSelectors,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LintRule::NoDebugger => "no-debugger",
            LintRule::NoConsole => "no-console",
            LintRule::NoTrailingWhitespace => "no-trailing-whitespace",
            LintRule::MaxLineLength => "max-line-length",
            LintRule::NoTabs => "no-tabs",
            LintRule::NoImportant => "no-important",
            LintRule::NoEmptyRule => "no-empty-rule",
            LintRule::NoIdSelectors => "no-id-selectors",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            LintRule::NoConsole | LintRule::MaxLineLength => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Check `text` against this rule.
    pub fn check(self, text: &str, max_line_length: usize) -> Vec<Finding> {
        if self == LintRule::NoEmptyRule {
            return self.check_empty_rules(text);
        }

        let mut findings = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if let Some((column, message)) = self.check_line(line, max_line_length) {
                findings.push(Finding {
                    rule: self,
                    line: idx + 1,
                    column,
                    message,
                });
            }
        }
        findings
    }

    fn check_line(self, line: &str, max_line_length: usize) -> Option<(usize, String)> {
        match self {
            LintRule::NoDebugger => DEBUGGER
                .find(line)
                .map(|m| (column_of(line, m.start()), "unexpected 'debugger' statement".into())),
            LintRule::NoConsole => CONSOLE
                .find(line)
                .map(|m| (column_of(line, m.start()), "unexpected console call".into())),
            LintRule::NoTrailingWhitespace => {
                let trimmed = line.trim_end();
                (trimmed.len() != line.len())
                    .then(|| (column_of(line, trimmed.len()), "trailing whitespace".into()))
            }
            LintRule::MaxLineLength => {
                let len = line.chars().count();
                (len > max_line_length).then(|| {
                    (
                        max_line_length + 1,
                        format!("line is {len} characters long (max {max_line_length})"),
                    )
                })
            }
            LintRule::NoTabs => line
                .find('\t')
                .map(|pos| (column_of(line, pos), "unexpected tab character".into())),
            LintRule::NoImportant => IMPORTANT
                .find(line)
                .map(|m| (column_of(line, m.start()), "avoid '!important'".into())),
            LintRule::NoIdSelectors => ID_SELECTOR.find(line).and_then(|m| {
                line[..m.end()]
                    .find('#')
                    .map(|pos| (column_of(line, pos), "avoid ID selectors".into()))
            }),
            LintRule::NoEmptyRule => None,
        }
    }

    fn check_empty_rules(self, text: &str) -> Vec<Finding> {
        EMPTY_RULE
            .find_iter(text)
            .map(|m| {
                let before = &text[..m.start()];
                let line = before.matches('\n').count() + 1;
                let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
                Finding {
                    rule: self,
                    line,
                    column: column_of(&text[line_start..], m.start() - line_start),
                    message: "empty rule block".into(),
                }
            })
            .collect()
    }
}

/// 1-based character column of byte offset `byte_idx` in `line`.
fn column_of(line: &str, byte_idx: usize) -> usize {
    line[..byte_idx].chars().count() + 1
}

impl fmt::Display for LintRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LintRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LintRule::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = LintRule::ALL.iter().map(|r| r.name()).collect();
                format!("unknown lint rule '{s}' (known: {})", known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_rule_name() {
        for rule in LintRule::ALL {
            assert_eq!(rule.name().parse::<LintRule>(), Ok(rule));
        }
        assert!("no-such-rule".parse::<LintRule>().is_err());
    }

    #[test]
    fn trailing_whitespace_points_at_first_blank() {
        let findings = LintRule::NoTrailingWhitespace.check("ok\nlet a = 1;  \n", 80);
        assert_eq!(findings.len(), 1);
        assert_eq!((findings[0].line, findings[0].column), (2, 11));
    }

    #[test]
    fn empty_rule_spans_lines() {
        let findings = LintRule::NoEmptyRule.check("a { color: red; }\n.b {\n}\n", 80);
        assert_eq!(findings.len(), 1);
        assert_eq!((findings[0].line, findings[0].column), (2, 4));
    }

    #[test]
    fn id_selector_ignores_hex_colors() {
        assert!(LintRule::NoIdSelectors.check("a { color: #fff; }", 80).is_empty());
        assert_eq!(LintRule::NoIdSelectors.check("#main .x {", 80).len(), 1);
    }

    #[test]
    fn max_line_length_is_a_warning() {
        assert_eq!(LintRule::MaxLineLength.severity(), Severity::Warning);
        assert_eq!(LintRule::MaxLineLength.check("abcdef", 5).len(), 1);
        assert!(LintRule::MaxLineLength.check("abcde", 5).is_empty());
    }
}
