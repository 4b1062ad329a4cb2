//!
//! ****************************************************************************************
//! ** DIAGNOSTICS FOR GRAMMAR CONSTRUCTION, PARSING AND EVALUATION                       **
//! ****************************************************************************************
//!
//! # Overview
//!
//! This module defines the `miette`-based error families of the engine:
//!
//! - [`GrammarError`]: a rule set is misconfigured. Raised by `Language::new`
//!   before any text is parsed.
//! - [`ParseError`]: a string does not conform to the grammar, or a builder
//!   callback refused the operands it was handed. Every variant carries the
//!   [`Span`] of the offending substring, available through
//!   [`ParseError::error_segment`].
//! - [`StrexprError`]: the umbrella a host can use when it parses and
//!   evaluates in one step.
//!
//! # Rules
//!
//! - **Builder failures are wrapped, never raised raw.** Whatever a host
//!   callback returns as an error becomes [`ParseError::OperationInvalid`]
//!   with the span of the operation that triggered it.
//! - **Structural errors are raised directly** with the span the engine
//!   computed; they are never retried and the first one aborts the parse.
//! - **Render with `miette::Report`.** The source code and labels are filled
//!   in from the span, so `Report::new(err)` is all a caller needs.
//!
//! ****************************************************************************************

use std::fmt::Display;

use miette::{Diagnostic, LabeledSpan, SourceCode};
use thiserror::Error;

use crate::eval::EvalError;
use crate::span::Span;
use crate::types::ValueType;

/// Boxed error returned by host callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Type-safe classification of [`ParseError`] variants.
/// Lets tests and hosts match on the failure mode without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    UnexpectedToken,
    OperandExpected,
    OperandUnexpected,
    BracketUnmatched,
    ListDelimiterNotWithinBrackets,
    FunctionArgumentCount,
    FunctionArgumentType,
    FunctionOverloadNotFound,
    OperationInvalid,
    EnumParse,
    ParameterDuplicate,
    CollectionExpected,
    AccessorUnexpected,
}

impl ParseErrorKind {
    /// The stable diagnostic code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::UnexpectedToken => "strexpr::parse::unexpected_token",
            ParseErrorKind::OperandExpected => "strexpr::parse::operand_expected",
            ParseErrorKind::OperandUnexpected => "strexpr::parse::operand_unexpected",
            ParseErrorKind::BracketUnmatched => "strexpr::parse::bracket_unmatched",
            ParseErrorKind::ListDelimiterNotWithinBrackets => {
                "strexpr::parse::list_delimiter_not_within_brackets"
            }
            ParseErrorKind::FunctionArgumentCount => "strexpr::parse::function_argument_count",
            ParseErrorKind::FunctionArgumentType => "strexpr::parse::function_argument_type",
            ParseErrorKind::FunctionOverloadNotFound => {
                "strexpr::parse::function_overload_not_found"
            }
            ParseErrorKind::OperationInvalid => "strexpr::parse::operation_invalid",
            ParseErrorKind::EnumParse => "strexpr::parse::enum_parse",
            ParseErrorKind::ParameterDuplicate => "strexpr::parse::parameter_duplicate",
            ParseErrorKind::CollectionExpected => "strexpr::parse::collection_expected",
            ParseErrorKind::AccessorUnexpected => "strexpr::parse::accessor_unexpected",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// GRAMMAR ERRORS
// =============================================================================

/// A rule set that cannot form a language.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("rule name `{name}` is invalid")]
    InvalidRuleName { name: String },
    #[error("rule name `{name}` is declared more than once")]
    DuplicateRuleName { name: String },
    #[error("rule `{name}` has an invalid pattern")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("the combined token pattern failed to compile")]
    CombinedPattern(#[source] regex::Error),
    #[error("rule `{rule}` refers to unknown rule `{reference}`")]
    UnknownRuleReference { rule: String, reference: String },
    #[error("rule `{rule}` refers to `{reference}`, which is not {expected}")]
    RuleKindMismatch {
        rule: String,
        reference: String,
        expected: &'static str,
    },
    #[error("function rule `{name}` declares no overloads")]
    EmptyOverloads { name: String },
}

impl Diagnostic for GrammarError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let code = match self {
            GrammarError::InvalidRuleName { .. } => "strexpr::grammar::invalid_rule_name",
            GrammarError::DuplicateRuleName { .. } => "strexpr::grammar::duplicate_rule_name",
            GrammarError::InvalidPattern { .. } => "strexpr::grammar::invalid_pattern",
            GrammarError::CombinedPattern(_) => "strexpr::grammar::combined_pattern",
            GrammarError::UnknownRuleReference { .. } => "strexpr::grammar::unknown_rule",
            GrammarError::RuleKindMismatch { .. } => "strexpr::grammar::rule_kind_mismatch",
            GrammarError::EmptyOverloads { .. } => "strexpr::grammar::empty_overloads",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let help = match self {
            GrammarError::InvalidRuleName { .. } => {
                "rule names may only contain ASCII letters, digits and underscores"
            }
            GrammarError::DuplicateRuleName { .. } => "give every rule a unique name",
            GrammarError::EmptyOverloads { .. } => "declare at least one overload",
            _ => return None,
        };
        Some(Box::new(help))
    }
}

// =============================================================================
// PARSE ERRORS
// =============================================================================

/// A failure while tokenizing or parsing one input string.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token `{}`", .span.text())]
    UnexpectedToken { span: Span },
    #[error("expected an operand")]
    OperandExpected {
        span: Span,
        /// The operator or bracket that needed the operand, when known.
        operator: Option<Span>,
    },
    #[error("unexpected operand `{}`", .span.text())]
    OperandUnexpected { span: Span, operator: Option<Span> },
    #[error("bracket `{}` is never matched", .span.text())]
    BracketUnmatched { span: Span },
    #[error("list delimiter `{}` is not within brackets", .span.text())]
    ListDelimiterNotWithinBrackets { span: Span },
    #[error("`{}` holds {actual} argument(s) but {expected} were expected", .span.text())]
    FunctionArgumentCount {
        span: Span,
        expected: usize,
        actual: usize,
    },
    #[error("argument `{}` is {actual}, expected {expected}", .span.text())]
    FunctionArgumentType {
        span: Span,
        expected: ValueType,
        actual: ValueType,
    },
    #[error("no overload accepts the arguments `{}`", .span.text())]
    FunctionOverloadNotFound { span: Span },
    #[error("invalid operation `{}`: {source}", .span.text())]
    OperationInvalid {
        span: Span,
        #[source]
        source: BoxError,
    },
    #[error("`{value}` is not a member of enum `{enum_name}`")]
    EnumParse {
        span: Span,
        value: String,
        enum_name: String,
    },
    #[error("parameter `{name}` is already declared")]
    ParameterDuplicate { span: Span, name: String },
    #[error("`{}` is not a collection", .span.text())]
    CollectionExpected { span: Span },
    #[error("accessor `{}` must directly follow a collection bracket", .span.text())]
    AccessorUnexpected { span: Span },
}

impl ParseError {
    /// The substring responsible for this error.
    pub fn error_segment(&self) -> &Span {
        match self {
            ParseError::UnexpectedToken { span }
            | ParseError::OperandExpected { span, .. }
            | ParseError::OperandUnexpected { span, .. }
            | ParseError::BracketUnmatched { span }
            | ParseError::ListDelimiterNotWithinBrackets { span }
            | ParseError::FunctionArgumentCount { span, .. }
            | ParseError::FunctionArgumentType { span, .. }
            | ParseError::FunctionOverloadNotFound { span }
            | ParseError::OperationInvalid { span, .. }
            | ParseError::EnumParse { span, .. }
            | ParseError::ParameterDuplicate { span, .. }
            | ParseError::CollectionExpected { span }
            | ParseError::AccessorUnexpected { span } => span,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        match self {
            ParseError::UnexpectedToken { .. } => ParseErrorKind::UnexpectedToken,
            ParseError::OperandExpected { .. } => ParseErrorKind::OperandExpected,
            ParseError::OperandUnexpected { .. } => ParseErrorKind::OperandUnexpected,
            ParseError::BracketUnmatched { .. } => ParseErrorKind::BracketUnmatched,
            ParseError::ListDelimiterNotWithinBrackets { .. } => {
                ParseErrorKind::ListDelimiterNotWithinBrackets
            }
            ParseError::FunctionArgumentCount { .. } => ParseErrorKind::FunctionArgumentCount,
            ParseError::FunctionArgumentType { .. } => ParseErrorKind::FunctionArgumentType,
            ParseError::FunctionOverloadNotFound { .. } => ParseErrorKind::FunctionOverloadNotFound,
            ParseError::OperationInvalid { .. } => ParseErrorKind::OperationInvalid,
            ParseError::EnumParse { .. } => ParseErrorKind::EnumParse,
            ParseError::ParameterDuplicate { .. } => ParseErrorKind::ParameterDuplicate,
            ParseError::CollectionExpected { .. } => ParseErrorKind::CollectionExpected,
            ParseError::AccessorUnexpected { .. } => ParseErrorKind::AccessorUnexpected,
        }
    }

    /// Short text for the primary label.
    fn label(&self) -> String {
        match self {
            ParseError::UnexpectedToken { .. } => "no rule matches this text".to_string(),
            ParseError::OperandExpected { .. } => "operand expected here".to_string(),
            ParseError::OperandUnexpected { .. } => "operator expected before this".to_string(),
            ParseError::BracketUnmatched { .. } => "unmatched bracket".to_string(),
            ParseError::ListDelimiterNotWithinBrackets { .. } => "outside any bracket".to_string(),
            ParseError::FunctionArgumentCount { actual, .. } => format!("{actual} argument(s)"),
            ParseError::FunctionArgumentType { expected, .. } => format!("expected {expected}"),
            ParseError::FunctionOverloadNotFound { .. } => "no matching overload".to_string(),
            ParseError::OperationInvalid { source, .. } => source.to_string(),
            ParseError::EnumParse { enum_name, .. } => format!("not a `{enum_name}`"),
            ParseError::ParameterDuplicate { .. } => "declared again here".to_string(),
            ParseError::CollectionExpected { .. } => "not a collection".to_string(),
            ParseError::AccessorUnexpected { .. } => "misplaced accessor".to_string(),
        }
    }
}

/// Width of a label; zero-width spans inside the source render as a one-column caret.
fn label_len(span: &Span) -> usize {
    if span.is_empty() && span.start() < span.source().len() {
        1
    } else {
        span.len()
    }
}

impl Diagnostic for ParseError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind().code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let help: Option<String> = match self {
            ParseError::OperandExpected { .. } => {
                Some("an operator or delimiter is missing its operand".into())
            }
            ParseError::OperandUnexpected { .. } => {
                Some("two operands must be joined by an operator".into())
            }
            ParseError::BracketUnmatched { .. } => Some("check that brackets are balanced".into()),
            ParseError::ListDelimiterNotWithinBrackets { .. } => {
                Some("list delimiters may only separate bracketed arguments".into())
            }
            ParseError::FunctionArgumentCount { expected, .. } => {
                Some(format!("pass {expected} argument(s)"))
            }
            ParseError::EnumParse { enum_name, .. } => {
                Some(format!("use one of the symbols declared by `{enum_name}`"))
            }
            _ => None,
        };
        help.map(|h| Box::new(h) as Box<dyn Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(self.error_segment().source_arc() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.error_segment();
        let mut labels = vec![LabeledSpan::new(
            Some(self.label()),
            span.start(),
            label_len(span),
        )];
        if let ParseError::OperandExpected {
            operator: Some(op), ..
        }
        | ParseError::OperandUnexpected {
            operator: Some(op), ..
        } = self
        {
            if op != span {
                labels.push(LabeledSpan::new(
                    Some("while applying this".to_string()),
                    op.start(),
                    label_len(op),
                ));
            }
        }
        Some(Box::new(labels.into_iter()))
    }
}

// =============================================================================
// UNIFIED ERROR
// =============================================================================

/// Any failure a host can hit while building, parsing or evaluating.
#[derive(Debug, Error)]
pub enum StrexprError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl StrexprError {
    fn inner(&self) -> &dyn Diagnostic {
        match self {
            StrexprError::Grammar(e) => e,
            StrexprError::Parse(e) => e,
            StrexprError::Eval(e) => e,
        }
    }
}

impl Diagnostic for StrexprError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.inner().code()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.inner().help()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.inner().source_code()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.inner().labels()
    }
}
