//! Shared helpers for the integration tests.

#![allow(dead_code)]

use strexpr::{ParseError, ParseErrorKind};

/// The kind of a parse failure and the byte range it points at.
pub fn failure<T: std::fmt::Debug>(result: Result<T, ParseError>) -> (ParseErrorKind, usize, usize) {
    let err = result.expect_err("expected a parse failure");
    let span = err.error_segment();
    (err.kind(), span.start(), span.end())
}

/// The source with the failing segment bracketed, for readable assertion output.
pub fn highlight(err: &ParseError) -> String {
    err.error_segment().highlight("[", "]")
}

pub fn assert_close(actual: rust_decimal::Decimal, expected: f64) {
    let actual: f64 = actual.to_string().parse().expect("decimal text is a float");
    assert!(
        (actual - expected).abs() < 0.001,
        "expected {expected}, got {actual}"
    );
}
