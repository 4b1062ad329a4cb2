// tests/filter_tests.rs

mod common;

use std::sync::Arc;

use common::failure;
use serde_json::json;
use strexpr::cli::data::{self, Rows};
use strexpr::languages::Filter;
use strexpr::value::{parse_datetime, parse_datetime_offset, parse_guid};
use strexpr::{EnumType, NumericKind, ParseErrorKind, Record, RecordType, Value, ValueType};

fn people() -> Rows {
    data::load(&json!([
        {
            "Name": "Ada",
            "Age": 36,
            "Tags": ["red", "blue"],
            "Address": {"City": "London"},
            "Scores": [95, 80]
        },
        {
            "Name": "Alan",
            "Age": 41,
            "Tags": ["green"],
            "Address": {"City": "Oslo"},
            "Scores": [70]
        },
        {
            "Name": "Grace",
            "Age": null,
            "Tags": [],
            "Address": {"City": "Oslo"},
            "Scores": []
        }
    ]))
    .unwrap()
}

fn names(filter: &Filter, rows: &Rows, query: &str) -> Vec<String> {
    filter
        .filter(query, &rows.schema, &rows.records)
        .unwrap_or_else(|err| panic!("{query:?} failed: {err}"))
        .into_iter()
        .map(|record| record.get("Name").and_then(Value::as_str).unwrap_or_default().to_string())
        .collect()
}

#[test]
fn filters_records_by_field_predicates() {
    let cases: &[(&str, &[&str])] = &[
        ("Age gt 40", &["Alan"]),
        ("age gt 40", &["Alan"]),
        ("Age eq null", &["Grace"]),
        ("Age ne null and Age lt 40", &["Ada"]),
        ("not (Age gt 40)", &["Ada", "Grace"]),
        ("Name eq 'Grace' or Age eq 36", &["Ada", "Grace"]),
        ("Age add 4 eq 40", &["Ada"]),
        ("startswith(Name, 'A')", &["Ada", "Alan"]),
        ("endswith(Name, 'an')", &["Alan"]),
        ("substringof('ra', Name)", &["Grace"]),
        ("tolower(Name) eq 'ada'", &["Ada"]),
        ("toupper(Name) eq 'ALAN'", &["Alan"]),
        ("length(Name) eq 5", &["Grace"]),
    ];

    let filter = Filter::new().unwrap();
    let rows = people();
    for (query, expected) in cases {
        assert_eq!(names(&filter, &rows, query), *expected, "query {query:?}");
    }
}

#[test]
fn members_and_collections_are_reachable() {
    let cases: &[(&str, &[&str])] = &[
        ("Address/City eq 'Oslo'", &["Alan", "Grace"]),
        ("address/city eq 'London'", &["Ada"]),
        ("Tags/any(t: t eq 'red')", &["Ada"]),
        ("Tags/any()", &["Ada", "Alan"]),
        ("Tags/all(t: t ne 'green')", &["Ada", "Grace"]),
        ("Scores/all(s: s ge 80)", &["Ada", "Grace"]),
        ("Scores/any(s: s gt Age)", &["Ada", "Alan"]),
        ("Scores/any(s: s gt 90) or Name eq 'Grace'", &["Ada", "Grace"]),
        ("Tags/any(t: startswith(t, 'g')) and Address/City eq 'Oslo'", &["Alan"]),
    ];

    let filter = Filter::new().unwrap();
    let rows = people();
    for (query, expected) in cases {
        assert_eq!(names(&filter, &rows, query), *expected, "query {query:?}");
    }
}

#[test]
fn constant_predicates_evaluate_like_the_odata_examples() {
    let queries = [
        "(1 add 1) eq 2",
        "(2 add 2 mul 5) eq 12",
        "((2 add 2) mul 5) eq 20",
        "(4 sub 2 mul 5) eq -6",
        "((4 sub 2) mul 5) eq 10",
        "(2.5 mul 4) eq 10",
        "(2.5 mul 3) eq 7.5",
        "(9m div 10) eq 0.9",
        "(22.5 div 9) eq 2.5",
        "(10 div 5 mul 2) eq 4",
        "(10 mod 3) eq 1",
        "substringof('day', 'Monday') eq true",
        "endswith('Monday', 'day') eq true",
        "startswith('Monday', 'Mon') eq true",
        "length('Monday') eq 6",
        "tolower('Monday') eq 'monday'",
        "toupper('Monday') eq 'MONDAY'",
        "round(10.4) eq 10",
        "round(10.6) eq 11",
        "round(10.5) eq 10",
        "round(11.5) eq 12",
        "'it\\'s' eq 'it\\'s'",
        "0x1F eq 31",
        "2L eq 2",
        "1.5d gt 1.25f",
        "true and not false",
    ];

    let filter = Filter::new().unwrap();
    let rows = people();
    for query in queries {
        let matched = names(&filter, &rows, query);
        assert_eq!(matched.len(), 3, "query {query:?} should hold for every row");
    }
}

#[test]
fn invalid_predicates_fail_to_parse() {
    let filter = Filter::new().unwrap();
    let schema = people().schema;
    let parse = |query: &str| filter.parse(query, Arc::clone(&schema));

    for query in ["(6 and 5) eq 4", "(6 or 5) eq 7", "'leet' eq 1337", "Name gt 3", "Age add 1"] {
        assert_eq!(
            parse(query).unwrap_err().kind(),
            ParseErrorKind::OperationInvalid,
            "query {query:?}"
        );
    }

    assert_eq!(
        failure(parse("Name/any(n: n eq 'a')")),
        (ParseErrorKind::CollectionExpected, 0, 4)
    );
    assert_eq!(
        failure(parse("x: Age gt 1")),
        (ParseErrorKind::AccessorUnexpected, 0, 2)
    );
    assert_eq!(
        failure(parse("Tags/any(t: u: t eq 'a')")),
        (ParseErrorKind::AccessorUnexpected, 12, 14)
    );
    assert_eq!(
        failure(parse("Tags/all()")).0,
        ParseErrorKind::OperationInvalid
    );
    assert_eq!(
        failure(parse("Missing eq 1")),
        (ParseErrorKind::OperationInvalid, 0, 7)
    );
}

#[test]
fn element_names_must_be_unique_in_scope() {
    let groups = Arc::new(
        RecordType::new(
            "Team",
            [(
                "Groups",
                ValueType::collection_of(ValueType::collection_of(ValueType::STRING)),
            )],
        )
        .unwrap(),
    );
    let filter = Filter::new().unwrap();

    let err = filter
        .parse("Groups/any(g: g/any(G: G eq 'a'))", Arc::clone(&groups))
        .unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::ParameterDuplicate);
    assert_eq!(err.error_segment().text(), "G:");

    let team = Record::from_pairs(
        Arc::clone(&groups),
        [(
            "Groups",
            Value::List(vec![
                Value::List(vec![Value::from("x")]),
                Value::List(vec![Value::from("a"), Value::from("b")]),
            ]),
        )],
    );
    let nested = filter
        .filter("Groups/any(g: g/any(h: h eq 'a'))", &groups, std::slice::from_ref(&team))
        .unwrap();
    assert_eq!(nested.len(), 1);
    // The inner name goes out of scope with its bracket.
    let reused = filter
        .filter(
            "Groups/any(g: g/any(h: h eq 'b')) and Groups/any(h: h/any())",
            &groups,
            std::slice::from_ref(&team),
        )
        .unwrap();
    assert_eq!(reused.len(), 1);
}

// ---
// Enumerations
// ---

fn enum_holder() -> (Arc<EnumType>, Arc<RecordType>) {
    let numbers = Arc::new(
        EnumType::new(
            "Numbers",
            NumericKind::Int,
            [("One", 1), ("Two", 2), ("Three", 3), ("Five", 5)],
        )
        .unwrap(),
    );
    let holder = Arc::new(
        RecordType::new(
            "EnumHolder",
            [
                ("Number", ValueType::Enum(Arc::clone(&numbers))),
                ("NullableNumber", ValueType::Enum(Arc::clone(&numbers)).nullable()),
                ("NumberString", ValueType::STRING),
                ("Order", ValueType::BOOL),
            ],
        )
        .unwrap(),
    );
    (numbers, holder)
}

fn enum_rows(numbers: &Arc<EnumType>, holder: &Arc<RecordType>) -> Vec<Record> {
    let number = |value: i64| Value::Enum {
        ty: Arc::clone(numbers),
        value,
    };
    let mut rows: Vec<Record> = [1, 2, 3, 5]
        .into_iter()
        .map(|value| {
            Record::from_pairs(
                Arc::clone(holder),
                [
                    ("Number", number(value)),
                    ("NullableNumber", number(value)),
                    ("NumberString", Value::from(value.to_string())),
                    ("Order", Value::Bool(value != 5)),
                ],
            )
        })
        .collect();
    rows.push(Record::from_pairs(
        Arc::clone(holder),
        [
            ("Number", number(1)),
            ("NullableNumber", Value::Null),
            ("NumberString", Value::Null),
            ("Order", Value::Bool(true)),
        ],
    ));
    rows
}

#[test]
fn enums_compare_with_numbers_and_symbols() {
    let (numbers, holder) = enum_holder();
    let rows = enum_rows(&numbers, &holder);
    let filter = Filter::new().unwrap();

    // Indices into `enum_rows`; the last row has a null NullableNumber.
    let cases: &[(&str, &[usize])] = &[
        ("Number eq 2", &[1]),
        ("Number ne 2", &[0, 2, 3, 4]),
        ("Number eq 'Two'", &[1]),
        ("Number eq 'tWo'", &[1]),
        ("Number eq toupper('five')", &[3]),
        ("'two' eq Number", &[1]),
        ("2 eq Number", &[1]),
        ("NullableNumber eq 2", &[1]),
        ("NullableNumber ne 2", &[0, 2, 3, 4]),
        ("NullableNumber eq null", &[4]),
        ("null ne NullableNumber", &[0, 1, 2, 3]),
        ("NullableNumber ne 'tWo'", &[0, 2, 3, 4]),
        ("Number eq NullableNumber", &[0, 1, 2, 3]),
        ("Number eq null", &[]),
        ("order eq false", &[3]),
    ];
    for (query, expected) in cases {
        let matched: Vec<usize> = filter
            .filter(query, &holder, &rows)
            .unwrap_or_else(|err| panic!("{query:?} failed: {err}"))
            .into_iter()
            .filter_map(|record| rows.iter().position(|row| std::ptr::eq(row, record)))
            .collect();
        assert_eq!(matched, *expected, "query {query:?}");
    }
}

#[test]
fn bad_enum_constants_fail_to_parse() {
    let (_, holder) = enum_holder();
    let filter = Filter::new().unwrap();
    for query in [
        "Number eq 'Four'",
        "Number eq 2.8",
        "Number eq NumberString",
    ] {
        let err = filter.parse(query, Arc::clone(&holder)).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::OperationInvalid, "query {query:?}");
    }
}

// ---
// Dates, times and guids
// ---

fn events() -> (Arc<RecordType>, Vec<Record>) {
    let event = Arc::new(
        RecordType::new(
            "Event",
            [
                ("Name", ValueType::STRING),
                ("At", ValueType::DATETIME),
                ("Stamp", ValueType::DATETIMEOFFSET.nullable()),
                ("Id", ValueType::GUID),
            ],
        )
        .unwrap(),
    );
    let row = |name: &str, at: &str, stamp: Option<&str>, id: &str| {
        Record::from_pairs(
            Arc::clone(&event),
            [
                ("Name", Value::from(name)),
                ("At", Value::from(parse_datetime(at).unwrap())),
                (
                    "Stamp",
                    stamp.map_or(Value::Null, |s| Value::from(parse_datetime_offset(s).unwrap())),
                ),
                ("Id", Value::from(parse_guid(id).unwrap())),
            ],
        )
    };
    let rows = vec![
        row(
            "launch",
            "2020-01-31T10:15:30",
            Some("2020-01-31T10:15:30+02:00"),
            "11111111-1111-1111-1111-111111111111",
        ),
        row(
            "review",
            "2021-06-01T00:00:00",
            None,
            "22222222-2222-2222-2222-222222222222",
        ),
    ];
    (event, rows)
}

#[test]
fn dates_and_guids_compare_and_decompose() {
    let (event, rows) = events();
    let filter = Filter::new().unwrap();
    let cases: &[(&str, &[&str])] = &[
        ("At gt datetime'2020-06-01'", &["review"]),
        ("At lt datetime'2020-06-01T00:00:00'", &["launch"]),
        ("DateTime'2020-01-31' lt At", &["launch", "review"]),
        ("year(At) eq 2020", &["launch"]),
        ("month(At) eq 6", &["review"]),
        ("day(At) eq 31 and hour(At) eq 10 and minute(At) eq 15 and second(At) eq 30", &["launch"]),
        ("hour(Stamp) eq 10", &["launch"]),
        ("Stamp eq datetimeoffset'2020-01-31T08:15:30Z'", &["launch"]),
        ("Stamp eq null", &["review"]),
        ("At gt Stamp", &["launch"]),
        ("Id eq guid'11111111-1111-1111-1111-111111111111'", &["launch"]),
        ("Id ne guid'11111111-1111-1111-1111-111111111111'", &["review"]),
    ];
    for (query, expected) in cases {
        let matched: Vec<&str> = filter
            .filter(query, &event, &rows)
            .unwrap_or_else(|err| panic!("{query:?} failed: {err}"))
            .into_iter()
            .filter_map(|record| record.get("Name").and_then(Value::as_str))
            .collect();
        assert_eq!(matched, *expected, "query {query:?}");
    }
}

#[test]
fn bad_dates_and_guids_fail_to_parse() {
    let (event, _) = events();
    let filter = Filter::new().unwrap();
    let parse = |query: &str| filter.parse(query, Arc::clone(&event));

    assert_eq!(
        failure(parse("At gt datetime'not a date'")),
        (ParseErrorKind::OperationInvalid, 6, 26)
    );
    assert_eq!(
        failure(parse("Id gt guid'11111111-1111-1111-1111-111111111111'")).0,
        ParseErrorKind::OperationInvalid
    );
    // Neither the datetime nor the datetimeoffset overload takes a string.
    assert_eq!(
        failure(parse("year(Name) eq 2020")),
        (ParseErrorKind::FunctionOverloadNotFound, 5, 9)
    );
}
