//! Grammar-driven compilation of strings into typed expression trees.
//!
//! A [`Language`] is built from an ordered list of [`Rule`]s. Text is split
//! into tokens, folded by a two-stack precedence parser and returned either
//! as an [`Expr`] or as an evaluable [`Lambda`]. Two ready-made languages
//! live in [`languages`].
//!
//! ```
//! use strexpr::languages::Arithmetic;
//! use rust_decimal::Decimal;
//!
//! let arithmetic = Arithmetic::new().unwrap();
//! assert_eq!(arithmetic.evaluate("2 + 3 * 4").unwrap(), Decimal::from(14));
//! ```

pub use crate::diagnostics::{BoxError, GrammarError, ParseError, ParseErrorKind, StrexprError};
pub use crate::eval::{EvalError, Lambda};
pub use crate::expr::{BinaryOp, CollectionOp, Expr, ExprError, Function, Parameter, UnaryOp};
pub use crate::grammar::{Overload, Position, Rule, RuleKind};
pub use crate::language::Language;
pub use crate::span::Span;
pub use crate::tokenizer::{Token, Tokenizer, Tokens};
pub use crate::types::{EnumType, NumericKind, RecordType, ValueType};
pub use crate::value::{Number, Record, Value};

pub mod cli;
pub mod conversions;
pub mod diagnostics;
pub mod eval;
pub mod expr;
pub mod grammar;
pub mod language;
pub mod languages;
pub mod parser;
pub mod span;
pub mod tokenizer;
pub mod types;
pub mod value;
