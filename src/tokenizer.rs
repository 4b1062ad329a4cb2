//! Tokenizer: one combined scan over all grammar rules.
//!
//! Every rule's pattern becomes one named alternative of a single regex, in
//! declaration order. The regex engine's leftmost-first alternation is the
//! tie-break: when several rules match at the same position, the rule
//! declared first wins, whatever the match lengths.
//!
//! Text between matches that no rule covers is an error, reported with the
//! exact span of the unmatched run. This includes a run after the last match.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{debug, trace};

use crate::diagnostics::{GrammarError, ParseError};
use crate::grammar::Rule;
use crate::span::Span;

static RULE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// A recognized, non-ignored match.
#[derive(Debug, Clone)]
pub struct Token<'r> {
    rule: &'r Rule,
    rule_index: usize,
    span: Span,
}

impl<'r> Token<'r> {
    pub fn rule(&self) -> &'r Rule {
        self.rule
    }

    /// Position of the rule in the grammar's declaration order.
    pub fn rule_index(&self) -> usize {
        self.rule_index
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn text(&self) -> &str {
        self.span.text()
    }
}

impl Serialize for Token<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Token", 3)?;
        state.serialize_field("rule", self.rule.name())?;
        state.serialize_field("text", self.text())?;
        state.serialize_field("span", &self.span)?;
        state.end()
    }
}

/// The compiled scanner for an ordered rule set. Immutable and shareable.
#[derive(Debug)]
pub struct Tokenizer {
    rules: Vec<Rule>,
    regex: Regex,
    /// Capture group index of each rule's alternative.
    groups: Vec<usize>,
    /// Each rule's pattern on its own, for positions where the scan matched empty.
    patterns: Vec<Regex>,
}

impl Tokenizer {
    /// Validates rule names and patterns and compiles the combined scan.
    pub fn new(rules: Vec<Rule>) -> Result<Self, GrammarError> {
        let mut patterns = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            if !RULE_NAME.is_match(rule.name()) {
                return Err(GrammarError::InvalidRuleName {
                    name: rule.name().to_string(),
                });
            }
            if rules[..index].iter().any(|prior| prior.name() == rule.name()) {
                return Err(GrammarError::DuplicateRuleName {
                    name: rule.name().to_string(),
                });
            }
            let pattern = Regex::new(rule.pattern()).map_err(|source| {
                GrammarError::InvalidPattern {
                    name: rule.name().to_string(),
                    source,
                }
            })?;
            patterns.push(pattern);
        }

        let combined = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| format!("(?P<__rule{index}>{})", rule.pattern()))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&combined).map_err(GrammarError::CombinedPattern)?;

        let names: Vec<Option<&str>> = regex.capture_names().collect();
        let groups = (0..rules.len())
            .map(|index| {
                let wanted = format!("__rule{index}");
                names
                    .iter()
                    .position(|name| *name == Some(wanted.as_str()))
                    .unwrap_or(0)
            })
            .collect();

        debug!(rules = rules.len(), "compiled tokenizer");
        Ok(Self {
            rules,
            regex,
            groups,
            patterns,
        })
    }

    /// The first rule, in declaration order, with a non-empty match at `at`.
    fn non_empty_match_at(&self, source: &str, at: usize) -> Option<(usize, usize)> {
        self.patterns.iter().enumerate().find_map(|(index, pattern)| {
            pattern
                .find_at(source, at)
                .filter(|m| m.start() == at && !m.is_empty())
                .map(|m| (index, m.end()))
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Lazily scans `text`. Each call starts a fresh scan.
    pub fn tokenize(&self, text: impl Into<Arc<str>>) -> Tokens<'_> {
        Tokens {
            tokenizer: self,
            source: text.into(),
            pos: 0,
            done: false,
        }
    }
}

/// Iterator over the tokens of one source string.
///
/// Yields at most one error, after which it is exhausted.
pub struct Tokens<'t> {
    tokenizer: &'t Tokenizer,
    source: Arc<str>,
    pos: usize,
    done: bool,
}

impl<'t> Tokens<'t> {
    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    fn gap(&mut self, end: usize) -> Option<Result<Token<'t>, ParseError>> {
        self.done = true;
        let span = Span::from_match(&self.source, self.pos, end);
        debug!(%span, text = span.text(), "unmatched text");
        Some(Err(ParseError::UnexpectedToken { span }))
    }
}

impl<'t> Iterator for Tokens<'t> {
    type Item = Result<Token<'t>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let tokenizer = self.tokenizer;
        let mut search = self.pos;
        loop {
            if search > self.source.len() {
                return self.finish();
            }
            let Some(captures) = tokenizer.regex.captures_at(&self.source, search) else {
                return self.finish();
            };
            let Some(whole) = captures.get(0) else {
                return self.finish();
            };
            let start = whole.start();
            let matched = if whole.is_empty() {
                // An earlier rule matched nothing here; a later one may still match text.
                tokenizer.non_empty_match_at(&self.source, start)
            } else {
                tokenizer
                    .groups
                    .iter()
                    .position(|&group| group != 0 && captures.get(group).is_some())
                    .map(|index| (index, whole.end()))
            };
            let Some((rule_index, end)) = matched else {
                search = start
                    + self.source[start..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                continue;
            };
            if start > self.pos {
                return self.gap(start);
            }

            self.pos = end;
            let rule = &tokenizer.rules[rule_index];
            if rule.is_ignored() {
                search = end;
                continue;
            }
            let span = Span::from_match(&self.source, start, end);
            trace!(rule = rule.name(), %span, "token");
            return Some(Ok(Token {
                rule,
                rule_index,
                span,
            }));
        }
    }
}

impl<'t> Tokens<'t> {
    fn finish(&mut self) -> Option<Result<Token<'t>, ParseError>> {
        if self.pos < self.source.len() {
            return self.gap(self.source.len());
        }
        self.done = true;
        None
    }
}
