// tests/parser_tests.rs

mod common;

use common::{failure, highlight};
use rust_decimal::Decimal;
use strexpr::{
    BinaryOp, BoxError, Expr, Function, Language, NumericKind, Number, Overload, Parameter,
    ParseErrorKind, Position, Rule, UnaryOp, Value, ValueType,
};

fn decimal(text: &str) -> Result<Expr, BoxError> {
    Ok(Expr::constant(Number::parse(text, NumericKind::Decimal)?))
}

fn log() -> Function {
    Function::new(
        "log",
        vec![ValueType::DOUBLE, ValueType::DOUBLE],
        ValueType::DOUBLE,
        |args: &[Value]| -> Result<Value, BoxError> {
            let number = |i: usize| args[i].as_number().map(|n| n.to_f64()).unwrap_or(f64::NAN);
            Ok(Value::Number(Number::Double(number(0).log(number(1)))))
        },
    )
}

fn language() -> Language {
    Language::new(vec![
        Rule::binary("PLUS", r"\+", 1, |l, r| Expr::binary(BinaryOp::Add, l, r)),
        Rule::binary("MULTIPLY", r"\*", 1, |l, r| Expr::binary(BinaryOp::Multiply, l, r)),
        Rule::function(
            "LOG",
            r"[Ll]og\(",
            vec![ValueType::DOUBLE, ValueType::DOUBLE],
            |args| Expr::call(log(), args),
        ),
        Rule::variadic_function("ERROR", r"error\(", |_| {
            Err::<Expr, BoxError>("error is never valid".into())
        }),
        Rule::bracket_open("OPENBRACKET", r"\("),
        Rule::list_delimiter("COMMA", ","),
        Rule::bracket_close(
            "CLOSEBRACKET",
            r"\)",
            &["OPENBRACKET", "LOG", "ERROR"],
            Some("COMMA"),
        ),
        Rule::operand("NUMBER", r"\d*\.?\d+", decimal),
        Rule::operand("POOP", "💩", |_: &str| {
            Err::<Expr, BoxError>("no operand here".into())
        }),
        Rule::operand("STRING", r"'.*?'", |text: &str| {
            Ok::<_, BoxError>(Expr::constant(&text[1..text.len() - 1]))
        }),
        Rule::ignored("WHITESPACE", r"\s+"),
    ])
    .unwrap()
}

#[test]
fn errors_point_at_the_offending_text() {
    use ParseErrorKind::*;

    let cases: &[(&str, ParseErrorKind, usize, usize)] = &[
        ("2 + xxxx + 3", UnexpectedToken, 4, 8),
        ("2 + + 3", OperandExpected, 3, 3),
        ("2 + 2 2 + 3", OperandUnexpected, 6, 7),
        ("2 3", OperandUnexpected, 2, 3),
        ("2 (3 * 4)", OperandUnexpected, 2, 9),
        ("2 + 2, 3 * 3", ListDelimiterNotWithinBrackets, 5, 6),
        ("2 + (2*3", BracketUnmatched, 4, 5),
        ("2 + 2)*3", BracketUnmatched, 5, 6),
        ("2 + (5 + (2 * 3) + 1", BracketUnmatched, 4, 5),
        (")", BracketUnmatched, 0, 1),
        ("Log(", BracketUnmatched, 0, 4),
        ("2 + (5 + 2,,4) + 1", OperandExpected, 11, 11),
        ("2 + (5 + 2,  ) + 1", OperandExpected, 11, 13),
        ("2 + ( , 5 + 2) + 1", OperandExpected, 5, 6),
        ("2 + () + 1", OperandExpected, 5, 5),
        ("2 + (,) + 1", OperandExpected, 6, 6),
        ("", OperandExpected, 0, 0),
        ("   ", OperandExpected, 0, 0),
        ("*", OperandExpected, 1, 1),
        ("Log(1024,2,2)", FunctionArgumentCount, 4, 12),
        ("Log(1024)", FunctionArgumentCount, 4, 8),
        ("Log(1024,'2')", FunctionArgumentType, 9, 12),
        ("2 + '2'", OperationInvalid, 0, 7),
        ("2 + error(2,3)", OperationInvalid, 4, 13),
        ("2 + 💩 * 3", OperationInvalid, 4, 8),
    ];

    let language = language();
    for (text, kind, start, end) in cases {
        let result = language.parse(text);
        if let Err(err) = &result {
            println!("{text:?}: {} ({})", highlight(err), err.kind());
        }
        assert_eq!(
            failure(result),
            (*kind, *start, *end),
            "wrong failure for {text:?}"
        );
    }
}

#[test]
fn valid_inputs_fold_by_precedence_and_position() {
    let language = language();
    let value = |text: &str| language.compile(text).unwrap().invoke(&[]).unwrap();
    assert_eq!(value("2 + 3"), Value::from(Decimal::from(5)));
    assert_eq!(value("(2 + 3) * 4"), Value::from(Decimal::from(20)));
    let log = value("Log(1024, 2)").as_number().map(|n| n.to_f64()).unwrap();
    assert!((log - 10.0).abs() < 1e-9);
}

#[test]
fn function_arguments_are_converted_to_the_signature() {
    let tree = language().parse("log(8, 2)").unwrap();
    assert_eq!(tree.to_string(), "log((8 as double), (2 as double))");
}

// ---
// Mixed prefix, postfix and binary operators
// ---

fn signed() -> Language {
    Language::new(vec![
        Rule::binary("PLUS", r"\+", 2, |l, r| Expr::binary(BinaryOp::Add, l, r)),
        Rule::binary("TIMES", r"\*", 1, |l, r| Expr::binary(BinaryOp::Multiply, l, r)),
        Rule::unary("NEGATE", "~", 0, Position::Right, |operand| {
            Expr::unary(UnaryOp::Negate, operand)
        }),
        Rule::unary("SQUARE", "!", 0, Position::Left, |operand: Expr| {
            Expr::binary(BinaryOp::Multiply, operand.clone(), operand)
        }),
        Rule::operand("NUMBER", r"\d+", |text: &str| {
            Ok::<_, BoxError>(Expr::constant(Number::parse(text, NumericKind::Int)?))
        }),
        Rule::ignored("WHITESPACE", r"\s+"),
    ])
    .unwrap()
}

#[test]
fn unary_operators_bind_tighter_than_binary_ones() {
    let language = signed();
    let value = |text: &str| language.compile(text).unwrap().invoke(&[]).unwrap();
    assert_eq!(value("~2 + 3"), Value::from(1));
    assert_eq!(value("2 * ~3"), Value::from(-6));
    assert_eq!(value("3! * 2"), Value::from(18));
    assert_eq!(value("2 + 3! * 2"), Value::from(20));
    assert_eq!(value("~3!"), Value::from(9));
}

#[test]
fn stray_operands_next_to_unary_operators_are_rejected() {
    let language = signed();
    assert_eq!(
        failure(language.parse("3! 4")),
        (ParseErrorKind::OperandUnexpected, 3, 4)
    );
    assert_eq!(
        failure(language.parse("! 4")),
        (ParseErrorKind::OperandUnexpected, 2, 3)
    );
    assert_eq!(
        failure(language.parse("2 + ~")),
        (ParseErrorKind::OperandExpected, 5, 5)
    );
}

/// A postfix operator that binds looser than addition.
fn loose_postfix() -> Language {
    Language::new(vec![
        Rule::binary("PLUS", r"\+", 2, |l, r| Expr::binary(BinaryOp::Add, l, r)),
        Rule::unary("SQUARE", "!", 5, Position::Left, |operand: Expr| {
            Expr::binary(BinaryOp::Multiply, operand.clone(), operand)
        }),
        Rule::operand("NUMBER", r"\d+", |text: &str| {
            Ok::<_, BoxError>(Expr::constant(Number::parse(text, NumericKind::Int)?))
        }),
        Rule::ignored("WHITESPACE", r"\s+"),
    ])
    .unwrap()
}

#[test]
fn pending_postfix_operators_fold_before_tighter_ones() {
    let language = loose_postfix();
    let tree = |text: &str| language.parse(text).unwrap().to_string();
    let value = |text: &str| language.compile(text).unwrap().invoke(&[]).unwrap();

    assert_eq!(value("3! + 2"), Value::from(11));
    assert_eq!(tree("3! + 2"), "((3 * 3) + 2)");
    // `+` binds tighter, so it folds before the square.
    assert_eq!(value("2 + 3!"), Value::from(25));
    assert_eq!(value("2! + 3! + 1"), Value::from(50));
}

#[test]
fn overloads_that_accept_no_argument_conversion_are_reported() {
    let language = Language::new(vec![
        Rule::function_overloads(
            "F",
            r"f\(",
            vec![
                Overload::fixed(vec![ValueType::BOOL], |mut args: Vec<Expr>| {
                    args.pop().ok_or_else(|| BoxError::from("missing argument"))
                }),
                Overload::fixed(vec![ValueType::DOUBLE], |mut args: Vec<Expr>| {
                    args.pop().ok_or_else(|| BoxError::from("missing argument"))
                }),
            ],
        ),
        Rule::bracket_close("CLOSE", r"\)", &["F"], None),
        Rule::operand("STRING", r"'.*?'", |text: &str| {
            Ok::<_, BoxError>(Expr::constant(&text[1..text.len() - 1]))
        }),
        Rule::operand("NUMBER", r"\d+", |text: &str| {
            Ok::<_, BoxError>(Expr::constant(Number::parse(text, NumericKind::Int)?))
        }),
    ])
    .unwrap();

    assert_eq!(
        failure(language.parse("f('x')")),
        (ParseErrorKind::FunctionOverloadNotFound, 2, 5)
    );
    // The first overload that converts wins.
    assert_eq!(language.parse("f(2)").unwrap().ty(), ValueType::DOUBLE);
}

#[test]
fn bound_parameters_appear_by_name_in_the_tree() {
    let language = Language::new(vec![
        Rule::binary("PLUS", r"\+", 1, |l, r| Expr::binary(BinaryOp::Add, l, r)),
        Rule::operand_with_parameters("NAME", "[a-z]+", |text: &str, parameters: &[Parameter]| {
            let slot = parameters
                .iter()
                .position(|p| p.name() == Some(text))
                .ok_or_else(|| format!("unknown name {text}"))?;
            Ok::<_, BoxError>(Expr::parameter(slot, &parameters[slot]))
        }),
        Rule::ignored("WHITESPACE", r"\s+"),
    ])
    .unwrap();
    let parameters = vec![
        Parameter::named("x", ValueType::LONG),
        Parameter::named("y", ValueType::LONG),
    ];
    let tree = language.parse_with("x + y", parameters).unwrap();
    assert_eq!(tree.to_string(), "(x + y)");
    assert_eq!(tree.ty(), ValueType::LONG);

    assert_eq!(
        failure(language.parse_with("x + z", Vec::new())),
        (ParseErrorKind::OperationInvalid, 0, 1)
    );
}
