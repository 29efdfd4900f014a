//! Tolerant numeric handling shared by catalog records and line items.
//!
//! Stored records come from a document store that has historically accepted numbers,
//! numeric strings and the occasional blank. Optional numeric fields therefore
//! deserialize through [`lenient`], which maps anything that is not a number to `None`,
//! and aggregations read them through [`non_negative`].

use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

/// Value of an optional numeric field for aggregation: missing and negative values count as zero.
pub fn non_negative(value: Option<Decimal>) -> Decimal {
    match value {
        Some(v) if v >= Decimal::ZERO => v,
        _ => Decimal::ZERO,
    }
}

/// `true` when the value is present and below zero.
pub fn is_negative(value: Option<Decimal>) -> bool {
    matches!(value, Some(v) if v < Decimal::ZERO)
}

/// `a × b`, or zero when the product does not fit in a `Decimal`.
pub fn product(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or_else(|| {
        warn!("Decimal overflow in {} * {}; counting the product as zero", a, b);
        Decimal::ZERO
    })
}

/// `a + b`, or `a` unchanged when the sum does not fit in a `Decimal`.
pub fn plus(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or_else(|| {
        warn!("Decimal overflow adding {} to {}; term dropped", b, a);
        a
    })
}

/// Overflow-tolerant sum: a term that would overflow the running total is dropped.
pub fn total<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().fold(Decimal::ZERO, plus)
}

/// `current + added` for quantity merges on write paths.
pub fn checked_quantity(current: Decimal, added: Decimal) -> Result<Decimal, ServiceError> {
    current.checked_add(added).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "quantity {} + {} is out of range",
            current, added
        ))
    })
}

pub(crate) fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// `deserialize_with` adapter for `Option<Decimal>` fields.
pub mod lenient {
    use super::decimal_from_json;
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(decimal_from_json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Field {
        #[serde(default, deserialize_with = "lenient::deserialize")]
        value: Option<Decimal>,
    }

    fn parse_field(json: &str) -> Option<Decimal> {
        serde_json::from_str::<Field>(json).unwrap().value
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_field(r#"{"value": 12.5}"#), Some(dec!(12.5)));
        assert_eq!(parse_field(r#"{"value": 3}"#), Some(dec!(3)));
        assert_eq!(parse_field(r#"{"value": " 0.08 "}"#), Some(dec!(0.08)));
    }

    #[test]
    fn non_numeric_values_become_none() {
        assert_eq!(parse_field(r#"{"value": "abc"}"#), None);
        assert_eq!(parse_field(r#"{"value": ""}"#), None);
        assert_eq!(parse_field(r#"{"value": true}"#), None);
        assert_eq!(parse_field(r#"{"value": null}"#), None);
        assert_eq!(parse_field(r#"{}"#), None);
    }

    #[test]
    fn negatives_count_as_zero() {
        assert_eq!(non_negative(Some(dec!(-4))), Decimal::ZERO);
        assert_eq!(non_negative(None), Decimal::ZERO);
        assert_eq!(non_negative(Some(dec!(4.25))), dec!(4.25));
        assert!(is_negative(Some(dec!(-0.01))));
        assert!(!is_negative(None));
    }

    #[test]
    fn overflowing_product_counts_as_zero() {
        let huge = parse_field(r#"{"value": "1e16"}"#).unwrap();
        assert_eq!(product(huge, huge), Decimal::ZERO);
        assert_eq!(product(dec!(2.5), dec!(4)), dec!(10));
    }

    #[test]
    fn overflowing_term_is_dropped_from_total() {
        assert_eq!(total([Decimal::MAX, dec!(1), dec!(-3)]), Decimal::MAX - dec!(3));
        assert_eq!(total(Vec::<Decimal>::new()), Decimal::ZERO);
        assert_eq!(plus(Decimal::MAX, Decimal::MAX), Decimal::MAX);
    }

    #[test]
    fn quantity_overflow_is_a_validation_error() {
        assert_eq!(checked_quantity(dec!(2), dec!(3)).unwrap(), dec!(5));
        assert!(matches!(
            checked_quantity(Decimal::MAX, dec!(1)),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
