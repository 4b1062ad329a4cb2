//! The two-stack precedence parser.
//!
//! Tokens are fed in source order to a [`ParseState`] holding an operand
//! stack, an operator stack and the parameters in scope. Each token's rule
//! decides what happens:
//!
//! - operands are built and pushed immediately;
//! - operators first fold pending operators that bind at least as tightly,
//!   then queue an [`Activation`] whose reduction runs later;
//! - close brackets unwind the operator stack to their open bracket and hand
//!   it the operands collected in between.
//!
//! Queued reductions are data (`rule`, `span`, declared parameter), executed
//! by [`Parser::reduce`]. Nothing here captures closures, so a state can be
//! inspected at any point.
//!
//! Every failure aborts the parse with a span-carrying [`ParseError`].

use std::sync::Arc;

use tracing::trace;

use crate::conversions::{self, ConversionError};
use crate::diagnostics::ParseError;
use crate::expr::{Expr, Parameter};
use crate::grammar::{BracketLinks, CollectionBody, Overload, Position, Rule, RuleKind};
use crate::span::Span;
use crate::tokenizer::Token;

// ============================================================================
// PARSE STATE
// ============================================================================

/// An expression together with the source it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub expr: Expr,
    pub span: Span,
}

/// A queued operator, bracket or delimiter.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    /// Index of the rule in the grammar.
    pub rule: usize,
    pub span: Span,
    /// Slot of the element parameter a collection accessor declared.
    pub parameter: Option<usize>,
}

/// Working state of one parse. Created per call and never shared.
#[derive(Debug, Default)]
pub struct ParseState {
    parameters: Vec<Parameter>,
    operands: Vec<Operand>,
    operators: Vec<Activation>,
}

impl ParseState {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn operators(&self) -> &[Activation] {
        &self.operators
    }
}

// ============================================================================
// PARSER
// ============================================================================

/// Drives tokens through their rules.
pub struct Parser<'g> {
    rules: &'g [Rule],
    links: &'g [Option<BracketLinks>],
}

impl<'g> Parser<'g> {
    pub fn new(rules: &'g [Rule], links: &'g [Option<BracketLinks>]) -> Self {
        Self { rules, links }
    }

    /// Parses a token stream over `source` into a single expression.
    pub fn parse<'r, I>(
        &self,
        source: &Arc<str>,
        tokens: I,
        parameters: Vec<Parameter>,
    ) -> Result<Expr, ParseError>
    where
        I: IntoIterator<Item = Result<Token<'r>, ParseError>>,
    {
        let mut state = ParseState::new(parameters);
        for token in tokens {
            let token = token?;
            trace!(rule = token.rule().name(), span = %token.span(), "apply");
            self.apply(&mut state, token.rule_index(), token.span())?;
        }
        self.finish(&mut state, source)
    }

    /// Applies one token of rule `index` covering `span`.
    pub fn apply(
        &self,
        state: &mut ParseState,
        index: usize,
        span: &Span,
    ) -> Result<(), ParseError> {
        let rule = &self.rules[index];
        match rule.kind() {
            RuleKind::Terminal => Ok(()),
            RuleKind::Operand { builder } => {
                let expr = builder(span.text(), &state.parameters).map_err(|source| {
                    ParseError::OperationInvalid {
                        span: span.clone(),
                        source,
                    }
                })?;
                state.operands.push(Operand {
                    expr,
                    span: span.clone(),
                });
                Ok(())
            }
            RuleKind::Operator {
                positions,
                precedence,
                ..
            } => {
                if let Some(precedence) = *precedence {
                    if positions.contains(&Position::Left) {
                        // A postfix operator on top already holds its operand.
                        self.fold_while(state, |rule| {
                            rule.precedence().is_some_and(|top| {
                                top <= precedence || !rule.positions().contains(&Position::Right)
                            })
                        })?;
                    }
                }
                self.push(state, index, span);
                Ok(())
            }
            RuleKind::CollectionBracket { .. } => {
                // Pending postfix operators belong to the source collection.
                self.fold_while(state, |rule| {
                    rule.precedence().is_some() && !rule.positions().contains(&Position::Right)
                })?;
                self.push(state, index, span);
                Ok(())
            }
            RuleKind::BracketOpen | RuleKind::FunctionCall { .. } | RuleKind::ListDelimiter => {
                self.push(state, index, span);
                Ok(())
            }
            RuleKind::CollectionAccessor => self.declare_accessor(state, span),
            RuleKind::BracketClose { .. } => self.close_bracket(state, index, span),
        }
    }

    /// Executes every pending activation and returns the single result.
    pub fn finish(&self, state: &mut ParseState, source: &Arc<str>) -> Result<Expr, ParseError> {
        while let Some(top) = state.operators.pop() {
            self.reduce(state, top)?;
        }
        let nothing = || ParseError::OperandExpected {
            span: Span::whole(Arc::clone(source)).point(0),
            operator: None,
        };
        match state.operands.len() {
            0 => Err(nothing()),
            1 => state
                .operands
                .pop()
                .map(|operand| operand.expr)
                .ok_or_else(nothing),
            _ => {
                let top = &state.operands[state.operands.len() - 1];
                Err(ParseError::OperandUnexpected {
                    span: top.span.clone(),
                    operator: None,
                })
            }
        }
    }

    fn push(&self, state: &mut ParseState, rule: usize, span: &Span) {
        state.operators.push(Activation {
            rule,
            span: span.clone(),
            parameter: None,
        });
    }

    /// Reduces operators off the top of the stack while `folds` holds for their rule.
    fn fold_while(
        &self,
        state: &mut ParseState,
        folds: impl Fn(&Rule) -> bool,
    ) -> Result<(), ParseError> {
        while let Some(top) = state.operators.last() {
            if !folds(&self.rules[top.rule]) {
                break;
            }
            if let Some(top) = state.operators.pop() {
                self.reduce(state, top)?;
            }
        }
        Ok(())
    }

    /// Executes a queued activation.
    ///
    /// Brackets and delimiters are only ever consumed by a close bracket;
    /// reducing one means it was never matched.
    pub fn reduce(&self, state: &mut ParseState, activation: Activation) -> Result<(), ParseError> {
        let rule = &self.rules[activation.rule];
        match rule.kind() {
            RuleKind::Operator {
                positions, builder, ..
            } => {
                trace!(rule = rule.name(), span = %activation.span, "fold");
                let args = self.take_operator_args(state, &activation, positions)?;
                let span = args
                    .iter()
                    .fold(activation.span.clone(), |span, arg| span.cover(&arg.span));
                let exprs = args.into_iter().map(|arg| arg.expr).collect();
                let expr = builder(activation.span.text(), exprs).map_err(|source| {
                    ParseError::OperationInvalid {
                        span: span.clone(),
                        source,
                    }
                })?;
                state.operands.push(Operand { expr, span });
                Ok(())
            }
            RuleKind::BracketOpen
            | RuleKind::FunctionCall { .. }
            | RuleKind::CollectionBracket { .. } => Err(ParseError::BracketUnmatched {
                span: activation.span,
            }),
            RuleKind::ListDelimiter => Err(ParseError::ListDelimiterNotWithinBrackets {
                span: activation.span,
            }),
            _ => Ok(()),
        }
    }

    /// Pops an operator's operands and returns them in declared position order.
    fn take_operator_args(
        &self,
        state: &mut ParseState,
        activation: &Activation,
        positions: &[Position],
    ) -> Result<Vec<Operand>, ParseError> {
        let op = &activation.span;
        let expected_right = positions.iter().filter(|p| **p == Position::Right).count();
        let expected_left = positions.len() - expected_right;

        let mut right = Vec::new();
        while state
            .operands
            .last()
            .is_some_and(|operand| operand.span.is_right_of(op))
        {
            right.extend(state.operands.pop());
        }
        right.reverse();
        if right.len() > expected_right {
            return Err(ParseError::OperandUnexpected {
                span: encompass(&right[expected_right..]),
                operator: Some(op.clone()),
            });
        }
        if right.len() < expected_right {
            return Err(ParseError::OperandExpected {
                span: op.point(op.end()),
                operator: Some(op.clone()),
            });
        }

        let boundary = state.operators.last().map_or(0, |next| next.span.end());
        let mut left = Vec::new();
        while left.len() < expected_left
            && state
                .operands
                .last()
                .is_some_and(|operand| operand.span.is_right_of_index(boundary))
        {
            left.extend(state.operands.pop());
        }
        if left.len() < expected_left {
            return Err(ParseError::OperandExpected {
                span: op.point(op.start()),
                operator: Some(op.clone()),
            });
        }
        left.reverse();

        let mut left = left.into_iter();
        let mut right = right.into_iter();
        Ok(positions
            .iter()
            .filter_map(|position| match position {
                Position::Left => left.next(),
                Position::Right => right.next(),
            })
            .collect())
    }

    // ------------------------------------------------------------------------
    // Brackets
    // ------------------------------------------------------------------------

    fn close_bracket(
        &self,
        state: &mut ParseState,
        index: usize,
        close: &Span,
    ) -> Result<(), ParseError> {
        let links = self.links[index].clone().unwrap_or_default();
        let mut contents: Vec<Operand> = Vec::new();
        let mut previous = close.clone();
        let mut has_separators = false;

        while let Some(top) = state.operators.pop() {
            if links.opens.contains(&top.rule) {
                match state.operands.last() {
                    Some(operand) if operand.span.is_between(&top.span, &previous) => {
                        contents.extend(state.operands.pop());
                    }
                    _ if has_separators => {
                        return Err(ParseError::OperandExpected {
                            span: Span::gap(&top.span, &previous),
                            operator: Some(top.span),
                        });
                    }
                    _ => {}
                }
                contents.reverse();
                return self.apply_bracket_contents(state, top, contents, close);
            } else if links.delimiter == Some(top.rule) {
                has_separators = true;
                match state.operands.last() {
                    Some(operand) if operand.span.is_between(&top.span, &previous) => {
                        contents.extend(state.operands.pop());
                    }
                    _ => {
                        return Err(ParseError::OperandExpected {
                            span: Span::gap(&top.span, &previous),
                            operator: Some(top.span),
                        });
                    }
                }
                previous = top.span;
            } else {
                self.reduce(state, top)?;
            }
        }
        Err(ParseError::BracketUnmatched {
            span: close.clone(),
        })
    }

    fn apply_bracket_contents(
        &self,
        state: &mut ParseState,
        open: Activation,
        mut contents: Vec<Operand>,
        close: &Span,
    ) -> Result<(), ParseError> {
        match self.rules[open.rule].kind() {
            RuleKind::FunctionCall { overloads } => {
                self.call_function(state, &open, overloads, contents, close)
            }
            RuleKind::CollectionBracket { builder } => {
                if contents.len() > 1 {
                    return Err(ParseError::OperandUnexpected {
                        span: encompass(&contents[1..]),
                        operator: Some(open.span),
                    });
                }
                let body = contents.pop().map(|operand| operand.expr);
                let source = match state.operands.last() {
                    Some(operand) if operand.span.is_left_of(&open.span) => state.operands.pop(),
                    _ => None,
                };
                let Some(source) = source else {
                    return Err(ParseError::OperandExpected {
                        span: open.span.point(open.span.start()),
                        operator: Some(open.span),
                    });
                };
                if source.expr.ty().element().is_none() {
                    return Err(ParseError::CollectionExpected { span: source.span });
                }
                let parameter = open.parameter.and_then(|slot| {
                    let declared = state.parameters.get(slot).cloned();
                    state.parameters.truncate(slot);
                    declared.map(|parameter| (slot, parameter))
                });
                let span = source.span.cover(&open.span).cover(close);
                let body = CollectionBody { parameter, body };
                let expr = builder(open.span.text(), source.expr, body)
                    .map_err(|source| ParseError::OperationInvalid {
                        span: span.clone(),
                        source,
                    })?;
                state.operands.push(Operand { expr, span });
                Ok(())
            }
            _ => {
                if contents.is_empty() {
                    return Err(ParseError::OperandExpected {
                        span: Span::gap(&open.span, close),
                        operator: Some(open.span),
                    });
                }
                if contents.len() > 1 {
                    return Err(ParseError::OperandUnexpected {
                        span: encompass(&contents[1..]),
                        operator: Some(open.span),
                    });
                }
                let inner = contents.remove(0);
                let span = open.span.cover(&inner.span).cover(close);
                state.operands.push(Operand {
                    expr: inner.expr,
                    span,
                });
                Ok(())
            }
        }
    }

    /// Resolves an overload and pushes the call.
    ///
    /// Candidates are the overloads accepting the argument count, fixed
    /// signatures before variadic ones, in declaration order otherwise.
    fn call_function(
        &self,
        state: &mut ParseState,
        open: &Activation,
        overloads: &[Overload],
        contents: Vec<Operand>,
        close: &Span,
    ) -> Result<(), ParseError> {
        let count = contents.len();
        let args_span = if contents.is_empty() {
            Span::gap(&open.span, close)
        } else {
            encompass(&contents)
        };

        let mut candidates: Vec<&Overload> =
            overloads.iter().filter(|o| o.accepts(count)).collect();
        candidates.sort_by_key(|o| o.arity().is_none());
        if candidates.is_empty() {
            return Err(ParseError::FunctionArgumentCount {
                span: args_span,
                expected: overloads.first().and_then(Overload::arity).unwrap_or(count),
                actual: count,
            });
        }

        let single = candidates.len() == 1;
        for overload in candidates {
            let args = match overload.parameters() {
                None => contents.iter().map(|operand| operand.expr.clone()).collect(),
                Some(types) => match convert_args(&contents, types)? {
                    Ok(args) => args,
                    Err((operand, expected)) if single => {
                        return Err(ParseError::FunctionArgumentType {
                            span: operand.span.clone(),
                            expected: expected.clone(),
                            actual: operand.expr.ty(),
                        });
                    }
                    Err(_) => continue,
                },
            };
            let span = open.span.cover(&args_span);
            let expr = overload
                .build(args)
                .map_err(|source| ParseError::OperationInvalid { span, source })?;
            state.operands.push(Operand {
                expr,
                span: open.span.cover(&args_span).cover(close),
            });
            return Ok(());
        }
        Err(ParseError::FunctionOverloadNotFound { span: args_span })
    }

    // ------------------------------------------------------------------------
    // Collection accessors
    // ------------------------------------------------------------------------

    /// Declares the element parameter of the collection bracket on top of the stack.
    fn declare_accessor(&self, state: &mut ParseState, span: &Span) -> Result<(), ParseError> {
        let unexpected = || ParseError::AccessorUnexpected { span: span.clone() };
        let open = state.operators.last().ok_or_else(unexpected)?;
        let is_collection = matches!(
            self.rules[open.rule].kind(),
            RuleKind::CollectionBracket { .. }
        );
        let body_started = state
            .operands
            .last()
            .is_some_and(|operand| operand.span.is_right_of(&open.span));
        if !is_collection || open.parameter.is_some() || body_started {
            return Err(unexpected());
        }

        let source = state
            .operands
            .last()
            .filter(|operand| operand.span.is_left_of(&open.span))
            .ok_or_else(|| ParseError::OperandExpected {
                span: open.span.point(open.span.start()),
                operator: Some(open.span.clone()),
            })?;
        let element = source
            .expr
            .ty()
            .element()
            .cloned()
            .ok_or_else(|| ParseError::CollectionExpected {
                span: source.span.clone(),
            })?;

        let name = span.text().trim_end_matches(':').trim();
        if state
            .parameters
            .iter()
            .any(|p| p.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
        {
            return Err(ParseError::ParameterDuplicate {
                span: span.clone(),
                name: name.to_string(),
            });
        }

        let slot = state.parameters.len();
        trace!(name, slot, "declare element parameter");
        state.parameters.push(Parameter::named(name, element));
        if let Some(open) = state.operators.last_mut() {
            open.parameter = Some(slot);
        }
        Ok(())
    }
}

/// The smallest span covering a run of operands. Callers pass at least one.
fn encompass(operands: &[Operand]) -> Span {
    match operands.split_first() {
        Some((first, rest)) => rest
            .iter()
            .fold(first.span.clone(), |span, next| span.cover(&next.span)),
        None => Span::whole(Arc::from("")),
    }
}

/// Converts bracket contents to an overload's parameter types.
///
/// The inner `Err` names the first argument that has no conversion.
#[allow(clippy::type_complexity)]
fn convert_args<'a>(
    contents: &'a [Operand],
    types: &'a [crate::types::ValueType],
) -> Result<Result<Vec<Expr>, (&'a Operand, &'a crate::types::ValueType)>, ParseError> {
    let mut args = Vec::with_capacity(contents.len());
    for (operand, ty) in contents.iter().zip(types) {
        match conversions::try_convert(operand.expr.clone(), ty) {
            Ok(Some(expr)) => args.push(expr),
            Ok(None) => return Ok(Err((operand, ty))),
            Err(ConversionError::EnumParse { value, enum_name }) => {
                return Err(ParseError::EnumParse {
                    span: operand.span.clone(),
                    value,
                    enum_name,
                })
            }
            Err(other) => {
                return Err(ParseError::OperationInvalid {
                    span: operand.span.clone(),
                    source: other.into(),
                })
            }
        }
    }
    Ok(Ok(args))
}
