// tests/tokenizer_tests.rs

use strexpr::{ParseError, Rule, Tokenizer};

fn tokens(tokenizer: &Tokenizer, text: &str) -> Vec<(String, usize, usize)> {
    tokenizer
        .tokenize(text)
        .map(|token| {
            let token = token.unwrap();
            let span = token.span();
            (token.rule().name().to_string(), span.start(), span.end())
        })
        .collect()
}

fn names(tokenizer: &Tokenizer, text: &str) -> Vec<String> {
    tokens(tokenizer, text).into_iter().map(|(name, _, _)| name).collect()
}

#[test]
fn rule_order_decides_between_matches_at_the_same_position() {
    let longest_first = Tokenizer::new(vec![
        Rule::terminal("AB", "AB"),
        Rule::terminal("A", "A"),
        Rule::terminal("B", "B"),
    ])
    .unwrap();
    assert_eq!(names(&longest_first, "AABBAB"), ["A", "AB", "B", "AB"]);

    let shortest_first = Tokenizer::new(vec![
        Rule::terminal("A", "A"),
        Rule::terminal("B", "B"),
        Rule::terminal("AB", "AB"),
    ])
    .unwrap();
    assert_eq!(names(&shortest_first, "AABBAB"), ["A", "A", "B", "B", "A", "B"]);
}

#[test]
fn ignored_rules_consume_text_without_emitting() {
    let rules = vec![Rule::terminal("A", "A"), Rule::ignored("B", "B+")];
    let tokenizer = Tokenizer::new(rules).unwrap();
    assert_eq!(
        tokens(&tokenizer, "AABBAA"),
        [
            ("A".to_string(), 0, 1),
            ("A".to_string(), 1, 2),
            ("A".to_string(), 4, 5),
            ("A".to_string(), 5, 6),
        ]
    );
}

fn arithmetic() -> Tokenizer {
    Tokenizer::new(vec![
        Rule::terminal("NUMBER", r"\d+"),
        Rule::terminal("PLUS", r"\+"),
        Rule::terminal("MINUS", "-"),
        Rule::ignored("WHITESPACE", r"\s+"),
    ])
    .unwrap()
}

#[test]
fn unmatched_text_is_reported_where_it_starts() {
    let err = arithmetic()
        .tokenize("1 + 2 * 3 - 5")
        .collect::<Result<Vec<_>, _>>()
        .unwrap_err();
    let ParseError::UnexpectedToken { span } = err else {
        panic!("expected an unexpected token, got {err:?}");
    };
    assert_eq!((span.start(), span.end()), (6, 7));
    assert_eq!(span.text(), "*");
}

#[test]
fn trailing_unmatched_text_is_a_gap() {
    let language = arithmetic();
    let results: Vec<_> = language.tokenize("1 + 2 ?").collect();
    assert_eq!(results.len(), 4);
    assert!(results[..3].iter().all(Result::is_ok));
    let Err(ParseError::UnexpectedToken { span }) = &results[3] else {
        panic!("expected a gap, got {:?}", results[3]);
    };
    assert_eq!((span.start(), span.end()), (6, 7));
}

#[test]
fn tokens_carry_their_text() {
    let tokenizer = arithmetic();
    let texts: Vec<String> = tokenizer
        .tokenize("12 - 345")
        .map(|token| token.unwrap().text().to_string())
        .collect();
    assert_eq!(texts, ["12", "-", "345"]);
}
