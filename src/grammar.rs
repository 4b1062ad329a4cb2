// # Grammar Rules
//
// A language is an ordered list of [`Rule`]s. Each rule pairs a name and a
// regex with a [`RuleKind`] saying what the parser does when a token of that
// rule arrives.
//
// ## Rule Kinds
//
// - **`Terminal`**: no parse action. Ignored terminals (whitespace) advance the
//   scan without producing a token.
// - **`Operand`**: builds an expression from the token text and pushes it.
// - **`Operator`**: declares operand positions and an optional precedence, and
//   queues a reduction that combines its operands later.
// - **`BracketOpen` / `FunctionCall` / `CollectionBracket`**: open a bracket.
//   The close bracket hands them the operands it collected.
// - **`BracketClose`**: unwinds the operator stack to one of its open rules,
//   collecting operands split by its list delimiter.
// - **`ListDelimiter`**: separates bracket contents.
// - **`CollectionAccessor`**: names the element parameter of the collection
//   bracket it follows.
//
// ## Builder Convention
//
// Builders are host callbacks returning `Result<Expr, E>` for any
// `E: Into<BoxError>`. The parser wraps their failures in
// `ParseError::OperationInvalid` with the span of the operation.
//
// Rules refer to each other by name (a close bracket lists the names of its
// opens and delimiter). References are resolved and checked once, when the
// language is built.

use std::fmt;
use std::sync::Arc;

use crate::conversions;
use crate::diagnostics::{BoxError, GrammarError};
use crate::expr::{Expr, ExprError, Parameter};
use crate::types::ValueType;

// ============================================================================
// BUILDER TYPES
// ============================================================================

/// Builds an operand from its token text and the parameters in scope.
pub type OperandFn = dyn Fn(&str, &[Parameter]) -> Result<Expr, BoxError> + Send + Sync;

/// Builds an operator's result from its token text and its operands, in
/// declared position order.
pub type OperatorFn = dyn Fn(&str, Vec<Expr>) -> Result<Expr, BoxError> + Send + Sync;

/// Builds a function call from its converted arguments.
pub type FunctionFn = dyn Fn(Vec<Expr>) -> Result<Expr, BoxError> + Send + Sync;

/// Builds a collection predicate from the bracket text, the source and the body.
pub type CollectionFn = dyn Fn(&str, Expr, CollectionBody) -> Result<Expr, BoxError> + Send + Sync;

/// Side of an operator on which an operand is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Left,
    Right,
}

/// One signature of a function rule.
#[derive(Clone)]
pub struct Overload {
    parameters: Option<Vec<ValueType>>,
    builder: Arc<FunctionFn>,
}

impl Overload {
    /// An overload taking exactly `parameters`.
    pub fn fixed<F, E>(parameters: Vec<ValueType>, build: F) -> Self
    where
        F: Fn(Vec<Expr>) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            parameters: Some(parameters),
            builder: Arc::new(move |args: Vec<Expr>| build(args).map_err(Into::into)),
        }
    }

    /// An overload accepting any number of arguments, passed unconverted.
    pub fn variadic<F, E>(build: F) -> Self
    where
        F: Fn(Vec<Expr>) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            parameters: None,
            builder: Arc::new(move |args: Vec<Expr>| build(args).map_err(Into::into)),
        }
    }

    pub fn parameters(&self) -> Option<&[ValueType]> {
        self.parameters.as_deref()
    }

    pub fn arity(&self) -> Option<usize> {
        self.parameters.as_ref().map(Vec::len)
    }

    pub fn accepts(&self, count: usize) -> bool {
        self.arity().map_or(true, |arity| arity == count)
    }

    pub(crate) fn build(&self, args: Vec<Expr>) -> Result<Expr, BoxError> {
        (self.builder)(args)
    }
}

impl fmt::Debug for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overload")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// What a collection bracket hands its builder besides the source.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionBody {
    /// The element parameter declared by an accessor, with its slot.
    pub parameter: Option<(usize, Parameter)>,
    /// The predicate between the brackets, if any.
    pub body: Option<Expr>,
}

// ============================================================================
// RULES
// ============================================================================

#[derive(Clone)]
pub enum RuleKind {
    Terminal,
    Operand {
        builder: Arc<OperandFn>,
    },
    Operator {
        positions: Vec<Position>,
        precedence: Option<i32>,
        builder: Arc<OperatorFn>,
    },
    BracketOpen,
    FunctionCall {
        overloads: Vec<Overload>,
    },
    CollectionBracket {
        builder: Arc<CollectionFn>,
    },
    CollectionAccessor,
    BracketClose {
        opens: Vec<String>,
        delimiter: Option<String>,
    },
    ListDelimiter,
}

impl RuleKind {
    /// Kinds a close bracket may pair with.
    pub fn is_open_bracket(&self) -> bool {
        matches!(
            self,
            RuleKind::BracketOpen
                | RuleKind::FunctionCall { .. }
                | RuleKind::CollectionBracket { .. }
        )
    }

    fn label(&self) -> &'static str {
        match self {
            RuleKind::Terminal => "Terminal",
            RuleKind::Operand { .. } => "Operand",
            RuleKind::Operator { .. } => "Operator",
            RuleKind::BracketOpen => "BracketOpen",
            RuleKind::FunctionCall { .. } => "FunctionCall",
            RuleKind::CollectionBracket { .. } => "CollectionBracket",
            RuleKind::CollectionAccessor => "CollectionAccessor",
            RuleKind::BracketClose { .. } => "BracketClose",
            RuleKind::ListDelimiter => "ListDelimiter",
        }
    }
}

/// A named, declarative unit of grammar.
#[derive(Clone)]
pub struct Rule {
    name: String,
    pattern: String,
    ignore: bool,
    kind: RuleKind,
}

impl Rule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            ignore: false,
            kind,
        }
    }

    pub fn terminal(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(name, pattern, RuleKind::Terminal)
    }

    /// A terminal whose matches are consumed but never emitted.
    pub fn ignored(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            ignore: true,
            ..Self::terminal(name, pattern)
        }
    }

    pub fn operand<F, E>(name: impl Into<String>, pattern: impl Into<String>, build: F) -> Self
    where
        F: Fn(&str) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::operand_with_parameters(name, pattern, move |text, _| build(text))
    }

    /// An operand whose builder can see the bound parameters.
    pub fn operand_with_parameters<F, E>(
        name: impl Into<String>,
        pattern: impl Into<String>,
        build: F,
    ) -> Self
    where
        F: Fn(&str, &[Parameter]) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let builder: Arc<OperandFn> = Arc::new(move |text: &str, parameters: &[Parameter]| {
            build(text, parameters).map_err(Into::into)
        });
        Self::new(name, pattern, RuleKind::Operand { builder })
    }

    pub fn operator<F, E>(
        name: impl Into<String>,
        pattern: impl Into<String>,
        precedence: Option<i32>,
        positions: Vec<Position>,
        build: F,
    ) -> Self
    where
        F: Fn(Vec<Expr>) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::operator_with_text(name, pattern, precedence, positions, move |_: &str, args| {
            build(args)
        })
    }

    /// An operator whose builder also sees the matched text, for operators
    /// such as member access that carry a name.
    pub fn operator_with_text<F, E>(
        name: impl Into<String>,
        pattern: impl Into<String>,
        precedence: Option<i32>,
        positions: Vec<Position>,
        build: F,
    ) -> Self
    where
        F: Fn(&str, Vec<Expr>) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let builder: Arc<OperatorFn> =
            Arc::new(move |text: &str, args: Vec<Expr>| build(text, args).map_err(Into::into));
        Self::new(
            name,
            pattern,
            RuleKind::Operator {
                positions,
                precedence,
                builder,
            },
        )
    }

    /// An infix operator. Operands are brought to a common type before `build`
    /// sees them, when one exists.
    pub fn binary<F, E>(
        name: impl Into<String>,
        pattern: impl Into<String>,
        precedence: i32,
        build: F,
    ) -> Self
    where
        F: Fn(Expr, Expr) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::operator(
            name,
            pattern,
            Some(precedence),
            vec![Position::Left, Position::Right],
            move |args| -> Result<Expr, BoxError> {
                let actual = args.len();
                let mut args = args.into_iter();
                let (Some(mut left), Some(mut right), None) =
                    (args.next(), args.next(), args.next())
                else {
                    return Err(ExprError::OperandCount {
                        expected: 2,
                        actual,
                    }
                    .into());
                };
                conversions::try_implicitly_convert(&mut left, &mut right);
                build(left, right).map_err(Into::into)
            },
        )
    }

    /// A prefix or postfix operator with a single operand.
    pub fn unary<F, E>(
        name: impl Into<String>,
        pattern: impl Into<String>,
        precedence: i32,
        position: Position,
        build: F,
    ) -> Self
    where
        F: Fn(Expr) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::operator(
            name,
            pattern,
            Some(precedence),
            vec![position],
            move |args| -> Result<Expr, BoxError> {
                let actual = args.len();
                let mut args = args.into_iter();
                let (Some(operand), None) = (args.next(), args.next()) else {
                    return Err(ExprError::OperandCount {
                        expected: 1,
                        actual,
                    }
                    .into());
                };
                build(operand).map_err(Into::into)
            },
        )
    }

    pub fn bracket_open(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(name, pattern, RuleKind::BracketOpen)
    }

    /// A close bracket matching any of `opens`, splitting contents on `delimiter`.
    pub fn bracket_close(
        name: impl Into<String>,
        pattern: impl Into<String>,
        opens: &[&str],
        delimiter: Option<&str>,
    ) -> Self {
        Self::new(
            name,
            pattern,
            RuleKind::BracketClose {
                opens: opens.iter().map(|s| s.to_string()).collect(),
                delimiter: delimiter.map(str::to_string),
            },
        )
    }

    pub fn list_delimiter(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(name, pattern, RuleKind::ListDelimiter)
    }

    /// A function with a single fixed signature.
    pub fn function<F, E>(
        name: impl Into<String>,
        pattern: impl Into<String>,
        parameters: Vec<ValueType>,
        build: F,
    ) -> Self
    where
        F: Fn(Vec<Expr>) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::function_overloads(name, pattern, vec![Overload::fixed(parameters, build)])
    }

    pub fn variadic_function<F, E>(
        name: impl Into<String>,
        pattern: impl Into<String>,
        build: F,
    ) -> Self
    where
        F: Fn(Vec<Expr>) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::function_overloads(name, pattern, vec![Overload::variadic(build)])
    }

    /// A function resolved among several signatures; see `Parser` for the order.
    pub fn function_overloads(
        name: impl Into<String>,
        pattern: impl Into<String>,
        overloads: Vec<Overload>,
    ) -> Self {
        Self::new(name, pattern, RuleKind::FunctionCall { overloads })
    }

    pub fn collection<F, E>(name: impl Into<String>, pattern: impl Into<String>, build: F) -> Self
    where
        F: Fn(&str, Expr, CollectionBody) -> Result<Expr, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let builder: Arc<CollectionFn> =
            Arc::new(move |text: &str, source: Expr, body: CollectionBody| {
                build(text, source, body).map_err(Into::into)
            });
        Self::new(name, pattern, RuleKind::CollectionBracket { builder })
    }

    pub fn collection_accessor(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(name, pattern, RuleKind::CollectionAccessor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Operator precedence, or `None` for non-operators and unranked operators.
    pub fn precedence(&self) -> Option<i32> {
        match &self.kind {
            RuleKind::Operator { precedence, .. } => *precedence,
            _ => None,
        }
    }

    pub fn positions(&self) -> &[Position] {
        match &self.kind {
            RuleKind::Operator { positions, .. } => positions,
            _ => &[],
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Rule");
        s.field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("kind", &self.kind.label());
        if self.ignore {
            s.field("ignore", &true);
        }
        match &self.kind {
            RuleKind::Operator {
                positions,
                precedence,
                ..
            } => s.field("positions", positions).field("precedence", precedence),
            RuleKind::FunctionCall { overloads } => s.field("overloads", overloads),
            RuleKind::BracketClose { opens, delimiter } => {
                s.field("opens", opens).field("delimiter", delimiter)
            }
            _ => &mut s,
        };
        s.finish()
    }
}

// ============================================================================
// LINKING
// ============================================================================

/// Rule indices a close bracket pairs with, resolved from names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketLinks {
    pub opens: Vec<usize>,
    pub delimiter: Option<usize>,
}

/// Resolves close-bracket references and checks function overloads.
///
/// Returns one entry per rule; only `BracketClose` rules get links.
pub(crate) fn link(rules: &[Rule]) -> Result<Vec<Option<BracketLinks>>, GrammarError> {
    let find = |owner: &Rule, reference: &str| {
        rules
            .iter()
            .position(|rule| rule.name == reference)
            .ok_or_else(|| GrammarError::UnknownRuleReference {
                rule: owner.name.clone(),
                reference: reference.to_string(),
            })
    };

    rules
        .iter()
        .map(|rule| match &rule.kind {
            RuleKind::FunctionCall { overloads } if overloads.is_empty() => {
                Err(GrammarError::EmptyOverloads {
                    name: rule.name.clone(),
                })
            }
            RuleKind::BracketClose { opens, delimiter } => {
                let mut links = BracketLinks::default();
                for open in opens {
                    let index = find(rule, open)?;
                    if !rules[index].kind.is_open_bracket() {
                        return Err(GrammarError::RuleKindMismatch {
                            rule: rule.name.clone(),
                            reference: open.clone(),
                            expected: "an open bracket",
                        });
                    }
                    links.opens.push(index);
                }
                if let Some(delimiter) = delimiter {
                    let index = find(rule, delimiter)?;
                    if !matches!(rules[index].kind, RuleKind::ListDelimiter) {
                        return Err(GrammarError::RuleKindMismatch {
                            rule: rule.name.clone(),
                            reference: delimiter.clone(),
                            expected: "a list delimiter",
                        });
                    }
                    links.delimiter = Some(index);
                }
                Ok(Some(links))
            }
            _ => Ok(None),
        })
        .collect()
}
