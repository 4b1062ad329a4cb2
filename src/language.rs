//! A compiled grammar: the entry point for tokenizing, parsing and compiling text.
//!
//! A [`Language`] is built once from an ordered rule list and is immutable
//! afterwards. It is `Send + Sync`; independent parses may run on separate
//! threads, each with its own parse state.

use std::sync::Arc;

use tracing::debug;

use crate::diagnostics::{GrammarError, ParseError};
use crate::eval::Lambda;
use crate::expr::{Expr, Parameter};
use crate::grammar::{self, BracketLinks, Rule};
use crate::parser::Parser;
use crate::tokenizer::{Tokenizer, Tokens};

#[derive(Debug)]
pub struct Language {
    tokenizer: Tokenizer,
    links: Vec<Option<BracketLinks>>,
}

impl Language {
    /// Validates and compiles `rules`. Declaration order is the tokenizer's tie-break.
    pub fn new(rules: Vec<Rule>) -> Result<Self, GrammarError> {
        let tokenizer = Tokenizer::new(rules)?;
        let links = grammar::link(tokenizer.rules())?;
        debug!(rules = tokenizer.rules().len(), "compiled language");
        Ok(Self { tokenizer, links })
    }

    pub fn rules(&self) -> &[Rule] {
        self.tokenizer.rules()
    }

    pub fn tokenize(&self, text: &str) -> Tokens<'_> {
        self.tokenizer.tokenize(text)
    }

    /// Parses `text` with no bound parameters.
    pub fn parse(&self, text: &str) -> Result<Expr, ParseError> {
        self.parse_with(text, Vec::new())
    }

    /// Parses `text` with `parameters` visible to operand builders.
    pub fn parse_with(&self, text: &str, parameters: Vec<Parameter>) -> Result<Expr, ParseError> {
        let source: Arc<str> = Arc::from(text);
        let tokens = self.tokenizer.tokenize(Arc::clone(&source));
        Parser::new(self.tokenizer.rules(), &self.links)
            .parse(&source, tokens, parameters)
            .map_err(|err| {
                debug!(code = err.kind().code(), span = %err.error_segment(), "parse failed");
                err
            })
    }

    /// Parses `text` into a zero-argument callable.
    pub fn compile(&self, text: &str) -> Result<Lambda, ParseError> {
        self.compile_with(text, Vec::new())
    }

    /// Parses `text` into a callable taking one argument per parameter.
    pub fn compile_with(
        &self,
        text: &str,
        parameters: Vec<Parameter>,
    ) -> Result<Lambda, ParseError> {
        let body = self.parse_with(text, parameters.clone())?;
        Ok(Lambda::new(parameters, body))
    }
}
