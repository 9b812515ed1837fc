//! Filter evaluation for in-memory modifier application.
//!
//! This module provides the `FilterEvaluator` that evaluates `Where`
//! predicates against entity field values.

use std::cmp::Ordering;
use std::collections::HashSet;

use navload_proto::{FilterExpr, Value};

/// Extract all field names referenced in a filter expression.
pub fn extract_filter_fields(filter: &FilterExpr) -> HashSet<String> {
    let mut fields = HashSet::new();
    extract_filter_fields_inner(filter, &mut fields);
    fields
}

fn extract_filter_fields_inner(filter: &FilterExpr, fields: &mut HashSet<String>) {
    match filter {
        FilterExpr::Eq { field, .. }
        | FilterExpr::Ne { field, .. }
        | FilterExpr::Lt { field, .. }
        | FilterExpr::Le { field, .. }
        | FilterExpr::Gt { field, .. }
        | FilterExpr::Ge { field, .. }
        | FilterExpr::In { field, .. }
        | FilterExpr::IsNull { field }
        | FilterExpr::IsNotNull { field }
        | FilterExpr::Like { field, .. } => {
            fields.insert(field.clone());
        }
        FilterExpr::And(filters) | FilterExpr::Or(filters) => {
            for f in filters {
                extract_filter_fields_inner(f, fields);
            }
        }
        FilterExpr::Not(inner) => extract_filter_fields_inner(inner, fields),
    }
}

/// Evaluates filter expressions against entity data.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate a filter expression against a row of field values.
    ///
    /// Comparisons against a missing field, or between values of
    /// incompatible types, do not match.
    pub fn evaluate(filter: &FilterExpr, row: &[(String, Value)]) -> bool {
        match filter {
            FilterExpr::Eq { field, value } => {
                Self::compare_field(row, field, value, Self::values_equal)
            }
            FilterExpr::Ne { field, value } => {
                Self::compare_field(row, field, value, |a, b| !Self::values_equal(a, b))
            }
            FilterExpr::Lt { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).is_some_and(Ordering::is_lt)
            }),
            FilterExpr::Le { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).is_some_and(Ordering::is_le)
            }),
            FilterExpr::Gt { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).is_some_and(Ordering::is_gt)
            }),
            FilterExpr::Ge { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).is_some_and(Ordering::is_ge)
            }),
            FilterExpr::In { field, values } => match Self::get_field_value(row, field) {
                Some(fv) => values.iter().any(|v| Self::values_equal(fv, v)),
                None => false,
            },
            FilterExpr::IsNull { field } => {
                matches!(Self::get_field_value(row, field), None | Some(Value::Null))
            }
            FilterExpr::IsNotNull { field } => {
                !matches!(Self::get_field_value(row, field), None | Some(Value::Null))
            }
            FilterExpr::Like { field, pattern } => match Self::get_field_value(row, field) {
                Some(Value::String(s)) => Self::like_match(s, pattern),
                _ => false,
            },
            FilterExpr::And(filters) => filters.iter().all(|f| Self::evaluate(f, row)),
            FilterExpr::Or(filters) => filters.iter().any(|f| Self::evaluate(f, row)),
            FilterExpr::Not(inner) => !Self::evaluate(inner, row),
        }
    }

    /// Get a field value from a row by name.
    pub fn get_field_value<'a>(row: &'a [(String, Value)], field: &str) -> Option<&'a Value> {
        row.iter().find(|(name, _)| name == field).map(|(_, v)| v)
    }

    fn compare_field<F>(row: &[(String, Value)], field: &str, value: &Value, comparator: F) -> bool
    where
        F: FnOnce(&Value, &Value) -> bool,
    {
        match Self::get_field_value(row, field) {
            Some(fv) => comparator(fv, value),
            None => false,
        }
    }

    /// Check if two values are equal, widening numeric types.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
                a.as_i64() == b.as_i64()
            }
            (Value::Float32(_) | Value::Float64(_), Value::Float32(_) | Value::Float64(_)) => {
                a.as_f64() == b.as_f64()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            _ => false,
        }
    }

    /// Compare two values, returning their ordering if comparable.
    pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
                Some(a.as_i64()?.cmp(&b.as_i64()?))
            }
            (Value::Float32(_) | Value::Float64(_), Value::Float32(_) | Value::Float64(_)) => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Match a string against a SQL LIKE pattern.
    ///
    /// Supports:
    /// - `%` matches zero or more characters
    /// - `_` matches exactly one character
    /// - `\%` and `\_` match the literal characters
    pub fn like_match(value: &str, pattern: &str) -> bool {
        let value: Vec<char> = value.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();
        Self::like_match_at(&value, &pattern)
    }

    fn like_match_at(value: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => value.is_empty(),
            Some((&'%', rest)) => {
                if rest.is_empty() {
                    return true;
                }
                (0..=value.len()).any(|skip| Self::like_match_at(&value[skip..], rest))
            }
            Some((&'_', rest)) => !value.is_empty() && Self::like_match_at(&value[1..], rest),
            Some((&'\\', rest)) => match (rest.split_first(), value.split_first()) {
                (Some((p, rest)), Some((c, tail))) if p == c => Self::like_match_at(tail, rest),
                _ => false,
            },
            Some((p, rest)) => match value.split_first() {
                Some((c, tail)) if c == p => Self::like_match_at(tail, rest),
                _ => false,
            },
        }
    }
}
