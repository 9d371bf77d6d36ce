//! Condition evaluation shared by the conditional node and edge routing.

use crate::value::{coerce_f64, stringify};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
    IsEmpty,
    IsNotEmpty,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::Contains => "contains",
            ConditionOperator::NotContains => "not_contains",
            ConditionOperator::IsEmpty => "is_empty",
            ConditionOperator::IsNotEmpty => "is_not_empty",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluate `operator` over the resolved field value and the expected value.
/// `field_value` is None when the dotted path did not resolve.
pub fn evaluate(
    field_value: Option<&Value>,
    operator: ConditionOperator,
    expected: &Value,
) -> bool {
    match operator {
        ConditionOperator::Equals => field_value.is_some_and(|v| loose_eq(v, expected)),
        ConditionOperator::NotEquals => !field_value.is_some_and(|v| loose_eq(v, expected)),
        ConditionOperator::GreaterThan => compare(field_value, expected).is_some_and(|o| o > 0.0),
        ConditionOperator::LessThan => compare(field_value, expected).is_some_and(|o| o < 0.0),
        ConditionOperator::Contains => {
            field_value.is_some_and(|v| stringify(v).contains(&stringify(expected)))
        }
        ConditionOperator::NotContains => {
            !field_value.is_some_and(|v| stringify(v).contains(&stringify(expected)))
        }
        ConditionOperator::IsEmpty => field_value.is_none_or(is_empty),
        ConditionOperator::IsNotEmpty => !field_value.is_none_or(is_empty),
    }
}

/// Loose equality: numeric when both sides coerce to numbers, otherwise
/// compare stringified forms. Mirrors the permissive matching users expect
/// from editor-authored conditions ("5" matches 5, "true" matches true).
fn loose_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (coerce_f64(a), coerce_f64(b)) {
        return x == y;
    }
    stringify(a) == stringify(b)
}

fn compare(field_value: Option<&Value>, expected: &Value) -> Option<f64> {
    let a = coerce_f64(field_value?)?;
    let b = coerce_f64(expected)?;
    Some(a - b)
}

/// Emptiness: missing, null, false, 0, "", [] and {} are all empty.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equals_is_loose_across_numbers_and_strings() {
        assert!(evaluate(Some(&json!(5)), ConditionOperator::Equals, &json!("5")));
        assert!(evaluate(Some(&json!("ok")), ConditionOperator::Equals, &json!("ok")));
        assert!(!evaluate(Some(&json!("ok")), ConditionOperator::Equals, &json!("no")));
        assert!(evaluate(Some(&json!("ok")), ConditionOperator::NotEquals, &json!("no")));
        assert!(evaluate(None, ConditionOperator::NotEquals, &json!("no")));
    }

    #[test]
    fn ordering_operators_cast_numerically() {
        assert!(evaluate(Some(&json!(5)), ConditionOperator::GreaterThan, &json!(3)));
        assert!(evaluate(Some(&json!("2")), ConditionOperator::LessThan, &json!(10)));
        assert!(!evaluate(Some(&json!("abc")), ConditionOperator::GreaterThan, &json!(1)));
        assert!(!evaluate(None, ConditionOperator::LessThan, &json!(1)));
    }

    #[test]
    fn contains_matches_substrings_of_stringified_values() {
        assert!(evaluate(
            Some(&json!("this is urgent")),
            ConditionOperator::Contains,
            &json!("urgent")
        ));
        assert!(evaluate(
            Some(&json!(12345)),
            ConditionOperator::Contains,
            &json!("234")
        ));
        assert!(evaluate(
            Some(&json!("calm")),
            ConditionOperator::NotContains,
            &json!("urgent")
        ));
    }

    #[test]
    fn emptiness_covers_all_falsy_shapes() {
        for empty in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(evaluate(Some(&empty), ConditionOperator::IsEmpty, &json!(null)));
            assert!(!evaluate(Some(&empty), ConditionOperator::IsNotEmpty, &json!(null)));
        }
        assert!(evaluate(None, ConditionOperator::IsEmpty, &json!(null)));
        assert!(evaluate(Some(&json!("x")), ConditionOperator::IsNotEmpty, &json!(null)));
        assert!(!evaluate(Some(&json!({})), ConditionOperator::IsNotEmpty, &json!(null)));
    }

    #[test]
    fn operator_parses_from_snake_case() {
        let op: ConditionOperator = serde_json::from_value(json!("greater_than")).unwrap();
        assert_eq!(op, ConditionOperator::GreaterThan);
        assert!(serde_json::from_value::<ConditionOperator>(json!("between")).is_err());
    }
}
