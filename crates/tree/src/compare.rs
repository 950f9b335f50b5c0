use super::Value;
use itertools::{EitherOrBoth, Itertools};
use std::cmp::Ordering;

/// compare evaluates the deep ordering of |lhs| and |rhs|.
/// This function establishes an arbitrary ordering over configuration
/// values in order to provide a total ordering. Arrays and objects are
/// compared lexicographically, objects in folded-key order. Spellings of
/// object keys do not participate: two objects which differ only in key
/// casing are equal.
pub fn compare(lhs: &Value, rhs: &Value) -> Ordering {
    match (lhs, rhs) {
        (Value::Array(lhs), Value::Array(rhs)) => lhs
            .iter()
            .zip_longest(rhs)
            .map(|eob| match eob {
                EitherOrBoth::Both(lhs, rhs) => compare(lhs, rhs),
                EitherOrBoth::Right(_) => Ordering::Less,
                EitherOrBoth::Left(_) => Ordering::Greater,
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal),
        (Value::Bool(lhs), Value::Bool(rhs)) => lhs.cmp(rhs),
        (Value::Bytes(lhs), Value::Bytes(rhs)) => lhs.cmp(rhs),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Object(lhs), Value::Object(rhs)) => lhs
            .iter()
            .zip_longest(rhs.iter())
            .map(|eob| match eob {
                EitherOrBoth::Both((lhs_key, lhs_entry), (rhs_key, rhs_entry)) => {
                    match lhs_key.cmp(rhs_key) {
                        Ordering::Equal => compare(&lhs_entry.value, &rhs_entry.value),
                        ord => ord,
                    }
                }
                EitherOrBoth::Right(_) => Ordering::Less,
                EitherOrBoth::Left(_) => Ordering::Greater,
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal),
        (Value::String(lhs), Value::String(rhs)) => lhs.cmp(rhs),

        (
            Value::NegInt(_) | Value::PosInt(_) | Value::Float(_),
            Value::NegInt(_) | Value::PosInt(_) | Value::Float(_),
        ) => compare_numbers(lhs, rhs),

        // Types are not equal. Define an (arbitrary) total ordering.
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(_), _) => Ordering::Less,
        (_, Value::Bool(_)) => Ordering::Greater,
        (Value::Bytes(_), _) => Ordering::Less,
        (_, Value::Bytes(_)) => Ordering::Greater,
        (Value::NegInt(_) | Value::PosInt(_) | Value::Float(_), _) => Ordering::Less,
        (_, Value::NegInt(_) | Value::PosInt(_) | Value::Float(_)) => Ordering::Greater,
        (Value::String(_), _) => Ordering::Less,
        (_, Value::String(_)) => Ordering::Greater,
        (Value::Array(_), _) => Ordering::Less,
        (_, Value::Array(_)) => Ordering::Greater,
    }
}

fn compare_numbers(lhs: &Value, rhs: &Value) -> Ordering {
    use Value::{Float, NegInt, PosInt};

    match (lhs, rhs) {
        (NegInt(lhs), NegInt(rhs)) => lhs.cmp(rhs),
        (PosInt(lhs), PosInt(rhs)) => lhs.cmp(rhs),
        (Float(lhs), Float(rhs)) => lhs.total_cmp(rhs),
        (NegInt(lhs), PosInt(rhs)) => {
            if *lhs < 0 {
                Ordering::Less
            } else {
                (*lhs as u64).cmp(rhs)
            }
        }
        (NegInt(lhs), Float(rhs)) => (*lhs as f64).total_cmp(rhs),
        (PosInt(lhs), Float(rhs)) => (*lhs as f64).total_cmp(rhs),
        (PosInt(_), NegInt(_)) | (Float(_), NegInt(_)) | (Float(_), PosInt(_)) => {
            compare_numbers(rhs, lhs).reverse()
        }
        _ => unreachable!("compare_numbers requires numeric values"),
    }
}

#[cfg(test)]
mod test {
    use super::compare;
    use crate::{Case, Value};
    use serde_json::{json, Value as Json};
    use std::cmp::Ordering;

    #[test]
    fn test_null_ordering() {
        is_eq(Json::Null, Json::Null);
    }

    #[test]
    fn test_bool_ordering() {
        is_eq(json!(true), json!(true));
        is_eq(json!(false), json!(false));
        is_lt(json!(false), json!(true));

        is_lt(Json::Null, json!(false)); // Bool > Null.
    }

    #[test]
    fn test_number_ordering() {
        is_eq(json!(10), json!(10)); // u64.
        is_eq(json!(-10), json!(-10)); // i64.
        is_eq(json!(20), json!(20.00)); // u64 & f64.
        is_eq(json!(-20), json!(-20.00)); // i64 & f64.

        is_lt(json!(10), json!(20)); // u64.
        is_lt(json!(-20), json!(-10)); // i64.
        is_lt(json!(10), json!(20.00)); // u64 & f64.
        is_lt(json!(-20), json!(-10.00)); // i64 & f64.
        is_lt(json!(-1), json!(1)); // i64 & u64.

        is_lt(Json::Null, json!(1)); // Number > Null.
        is_lt(json!(true), json!(1)); // Number > Bool.
    }

    #[test]
    fn test_string_ordering() {
        is_eq(json!(""), json!(""));
        is_eq(json!("foo"), json!("foo"));

        is_lt(json!(""), json!("foo"));
        is_lt(json!("foo"), json!("foobar"));
        is_lt(json!("foo"), json!("fp"));

        is_lt(json!(1), json!("1")); // String > Number.
    }

    #[test]
    fn test_array_ordering() {
        is_eq(json!([]), json!([]));
        is_eq(json!([1, 2]), json!([1, 2]));

        is_lt(json!([]), json!([1, 2]));
        is_lt(json!([1, 2]), json!([1, 2, 3]));
        is_lt(json!([1, 2, 3]), json!([1, 3]));

        is_lt(json!("1"), json!([1])); // Array > String.
    }

    #[test]
    fn test_object_ordering() {
        is_eq(json!({}), json!({}));
        is_eq(json!({"a": 1, "b": 2}), json!({"a": 1, "b": 2}));

        is_lt(json!({}), json!({"a": 1}));
        is_lt(json!({"a": 1}), json!({"b": 2}));

        is_lt(json!({"a": 1}), json!({"a": 1, "b": 2}));
        is_lt(json!({"a": 1, "b": 2}), json!({"a": 1, "c": 1}));
        is_lt(json!({"a": 1, "b": 2}), json!({"a": 1, "b": 3}));

        is_lt(json!([1]), json!({"1": 1})); // Object > Array.
    }

    #[test]
    fn test_spelling_does_not_order() {
        let lhs = Value::from_json(json!({"Server": {"Host": "a"}}), Case::Insensitive);
        let rhs = Value::from_json(json!({"server": {"host": "a"}}), Case::Insensitive);

        assert_eq!(compare(&lhs, &rhs), Ordering::Equal);
    }

    fn is_lt(lhs: Json, rhs: Json) {
        let lhs = Value::from_json(lhs, Case::Insensitive);
        let rhs = Value::from_json(rhs, Case::Insensitive);

        assert_eq!(compare(&lhs, &rhs), Ordering::Less);
        assert_eq!(compare(&rhs, &lhs), Ordering::Greater);
    }
    fn is_eq(lhs: Json, rhs: Json) {
        let lhs = Value::from_json(lhs, Case::Insensitive);
        let rhs = Value::from_json(rhs, Case::Insensitive);

        assert_eq!(compare(&lhs, &rhs), Ordering::Equal);
        assert_eq!(compare(&rhs, &lhs), Ordering::Equal);
    }
}
