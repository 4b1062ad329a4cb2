// tests/conversion_tests.rs

use proptest::prelude::*;
use strexpr::conversions::{common_numeric, common_type};
use strexpr::{NumericKind, ValueType};

fn kind() -> impl Strategy<Value = NumericKind> {
    prop::sample::select(NumericKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn common_numeric_is_symmetric(a in kind(), b in kind()) {
        prop_assert_eq!(common_numeric(a, b), common_numeric(b, a));
    }

    #[test]
    fn common_numeric_is_a_widening_of_both(a in kind(), b in kind()) {
        if let Some(common) = common_numeric(a, b) {
            prop_assert!(a.can_widen_to(common));
            prop_assert!(b.can_widen_to(common));
        }
    }

    #[test]
    fn common_numeric_is_stable_once_reached(a in kind(), b in kind()) {
        if let Some(common) = common_numeric(a, b) {
            prop_assert_eq!(common_numeric(common, a), Some(common));
            prop_assert_eq!(common_numeric(common, common), Some(common));
        }
    }

    #[test]
    fn nullability_carries_into_the_common_type(a in kind(), b in kind()) {
        let (a, b) = (ValueType::Number(a), ValueType::Number(b));
        let plain = common_type(&a, &b);
        prop_assert_eq!(common_type(&b, &a), plain.clone());
        prop_assert_eq!(common_type(&a.clone().nullable(), &b), plain.map(ValueType::nullable));
    }
}

#[test]
fn every_kind_reaches_decimal() {
    for kind in NumericKind::ALL {
        assert_eq!(common_numeric(kind, NumericKind::Decimal), Some(NumericKind::Decimal));
    }
}

#[test]
fn signed_and_unsigned_meet_at_the_next_wider_signed_kind() {
    assert_eq!(common_numeric(NumericKind::Int, NumericKind::UInt), Some(NumericKind::Long));
    assert_eq!(common_numeric(NumericKind::SByte, NumericKind::Byte), Some(NumericKind::Short));
    assert_eq!(common_numeric(NumericKind::Long, NumericKind::ULong), Some(NumericKind::Float));
}

#[test]
fn null_meets_anything_as_its_nullable_form() {
    assert_eq!(
        common_type(&ValueType::Null, &ValueType::INT),
        Some(ValueType::INT.nullable())
    );
    assert_eq!(
        common_type(&ValueType::STRING, &ValueType::Null),
        Some(ValueType::STRING)
    );
    assert_eq!(common_type(&ValueType::STRING, &ValueType::INT), None);
}
