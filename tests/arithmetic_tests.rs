// tests/arithmetic_tests.rs

mod common;

use std::sync::Arc;

use common::{assert_close, failure};
use rust_decimal::Decimal;
use strexpr::languages::arithmetic::decimal_of;
use strexpr::languages::Arithmetic;
use strexpr::{ParseErrorKind, Record, RecordType, StrexprError, Value, ValueType};

#[test]
fn evaluates_without_parameters() {
    let cases: &[(&str, f64)] = &[
        ("1 + 1", 2.0),
        ("1 + 2 + 3 + 5", 11.0),
        ("(1 + 2) * (3 + 5)", 24.0),
        ("2 + 2 * 5", 12.0),
        ("(2 + 2) * 5", 20.0),
        ("4 - 2 * 5", -6.0),
        ("(4 - 2) * 5", 10.0),
        ("2.5 * 4", 10.0),
        ("2.5 * 3", 7.5),
        ("9 / 10", 0.9),
        ("10 / 9", 1.111),
        ("10 / 5 * 2", 4.0),
        ("10 % 3", 1.0),
        ("Pi", 3.14159),
        ("sin(Pi)", 0.0),
        ("Sin(Pi * 1 / 2)", 1.0),
        ("SIN(Pi * 1 / 4)", 0.707),
        ("cos(Pi)", -1.0),
        ("Cos(Pi * 1 / 2)", 0.0),
        ("COS(Pi * 1 / 4)", 0.707),
        ("tan(Pi)", 0.0),
        ("sqrt(12 * 3)", 6.0),
        ("SQRT(sqrt(81))", 3.0),
        ("Pow(12, 2)", 144.0),
    ];

    let arithmetic = Arithmetic::new().unwrap();
    for (text, expected) in cases {
        let value = arithmetic
            .evaluate(text)
            .unwrap_or_else(|err| panic!("{text:?} failed: {err}"));
        assert_close(value, *expected);
    }
}

#[test]
fn log_and_round_pick_the_overload_by_argument_count() {
    let arithmetic = Arithmetic::new().unwrap();
    assert_close(arithmetic.evaluate("log(8, 2)").unwrap(), 3.0);
    assert_close(arithmetic.evaluate("LOG(1)").unwrap(), 0.0);
    assert_eq!(arithmetic.evaluate("round(2.5)").unwrap(), Decimal::from(2));
    assert_eq!(
        arithmetic.evaluate("round(2.345, 2)").unwrap(),
        Decimal::new(234, 2)
    );
}

#[test]
fn decimal_arithmetic_stays_exact() {
    let arithmetic = Arithmetic::new().unwrap();
    assert_eq!(arithmetic.evaluate("0.1 + 0.2").unwrap(), Decimal::new(3, 1));
}

#[test]
fn reparsing_yields_the_same_tree() {
    let arithmetic = Arithmetic::new().unwrap();
    let text = "round(sqrt(2) * (Pi - 1), 3) % 2";
    let first = arithmetic.parse(text).unwrap();
    let second = arithmetic.parse(text).unwrap();
    assert_eq!(first.body(), second.body());
    assert_eq!(first.body().to_string(), second.body().to_string());
}

#[test]
fn division_by_zero_fails_at_evaluation() {
    let err = Arithmetic::new().unwrap().evaluate("1 / (2 - 2)").unwrap_err();
    assert!(matches!(err, StrexprError::Eval(_)), "got {err:?}");
}

#[test]
fn malformed_input_fails_to_parse() {
    let arithmetic = Arithmetic::new().unwrap();
    assert_eq!(
        failure(arithmetic.parse("2 + * 3")),
        (ParseErrorKind::OperandExpected, 4, 4)
    );
    assert_eq!(
        failure(arithmetic.parse("2 + 3 )")),
        (ParseErrorKind::BracketUnmatched, 6, 7)
    );
    assert_eq!(
        failure(arithmetic.parse("2 $ 3")),
        (ParseErrorKind::UnexpectedToken, 2, 3)
    );
    // Names need a record to resolve against.
    assert_eq!(
        failure(arithmetic.parse("Total * 2")),
        (ParseErrorKind::OperationInvalid, 0, 5)
    );
}

#[test]
fn property_paths_read_from_the_record() {
    let line = Arc::new(
        RecordType::new("Line", [("Price", ValueType::DECIMAL), ("Qty", ValueType::INT)]).unwrap(),
    );
    let order = Arc::new(
        RecordType::new(
            "Order",
            [
                ("Line", ValueType::Record(Arc::clone(&line))),
                ("Discount", ValueType::DECIMAL),
            ],
        )
        .unwrap(),
    );
    let arithmetic = Arithmetic::new().unwrap();
    let total = arithmetic
        .parse_with("Line.Price * line.qty - Discount", Arc::clone(&order))
        .unwrap();
    assert_eq!(total.returns(), ValueType::DECIMAL);

    let record = Record::from_pairs(
        Arc::clone(&order),
        [
            (
                "Line",
                Value::Record(Record::from_pairs(
                    line,
                    [("Price", Value::from(Decimal::new(250, 2))), ("Qty", Value::from(4))],
                )),
            ),
            ("Discount", Value::from(Decimal::from(1))),
        ],
    );
    let value = total.invoke(&[Value::Record(record)]).unwrap();
    assert_eq!(decimal_of(value).unwrap(), Decimal::from(9));

    assert_eq!(
        failure(arithmetic.parse_with("Line.Missing + 1", order)),
        (ParseErrorKind::OperationInvalid, 0, 12)
    );
}
