//! Handles all user-facing output for the CLI.
//!
//! Commands build their output as strings here and `mod.rs` prints them, so
//! the formats can be tested without a process.

use std::fmt::Write;

use crate::diagnostics::ParseError;
use crate::tokenizer::Token;
use crate::value::Record;

/// One line per token: `NAME 'text' start..end`.
pub fn tokens_text(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    for token in tokens {
        let _ = writeln!(
            out,
            "{} '{}' {}",
            token.rule().name(),
            token.text(),
            token.span()
        );
    }
    out
}

pub fn tokens_json(tokens: &[Token<'_>]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(tokens)
}

pub fn records_json(records: &[&Record]) -> Result<String, serde_json::Error> {
    let values: Vec<_> = records
        .iter()
        .map(|record| crate::value::Value::Record((*record).clone()))
        .collect();
    serde_json::to_string_pretty(&values)
}

/// Collects every token, stopping at the first tokenizer error.
pub fn collect_tokens<'t>(
    tokens: impl Iterator<Item = Result<Token<'t>, ParseError>>,
) -> Result<Vec<Token<'t>>, ParseError> {
    tokens.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Rule;
    use crate::tokenizer::Tokenizer;

    #[test]
    fn token_lines_show_name_text_and_span() {
        let tokenizer = Tokenizer::new(vec![
            Rule::terminal("NUMBER", r"\d+"),
            Rule::terminal("PLUS", r"\+"),
            Rule::ignored("WHITESPACE", r"\s+"),
        ])
        .unwrap();
        let tokens = collect_tokens(tokenizer.tokenize("12 + 3")).unwrap();
        assert_eq!(
            tokens_text(&tokens),
            "NUMBER '12' 0..2\nPLUS '+' 3..4\nNUMBER '3' 5..6\n"
        );
        let json: serde_json::Value = serde_json::from_str(&tokens_json(&tokens).unwrap()).unwrap();
        assert_eq!(json[1]["rule"], "PLUS");
        assert_eq!(json[1]["span"]["start"], 3);
    }
}
