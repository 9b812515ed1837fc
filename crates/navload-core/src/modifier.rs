//! Per-hop filter and sort modifiers.
//!
//! A hop's modifiers are kept in the caller's left-to-right order and can be
//! applied two ways with identical results: appended to the hop's
//! [`EntityQuery`] for the query source to evaluate, or run in memory over
//! the fetched children.

use std::cmp::Ordering;

use navload_proto::navigation::methods;
use navload_proto::{FilterExpr, NavArg, OrderDirection, OrderSpec, Value};

use crate::entity::{Entity, EntityRef};
use crate::error::ConfigError;
use crate::query::{extract_filter_fields, EntityQuery, FilterEvaluator};

/// A filter or sort operation declared on a hop.
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    /// Keep rows matching the predicate.
    Where(FilterExpr),
    /// Fresh primary ordering; overrides any prior ordering.
    OrderBy(OrderSpec),
    /// Tie-breaker layered on the current ordering.
    ThenBy(OrderSpec),
}

impl Modifier {
    /// Build a modifier from a navigation call.
    ///
    /// Unknown method names are rejected with
    /// [`ConfigError::UnsupportedOperation`].
    pub fn from_call(method: &str, args: &[NavArg]) -> Result<Modifier, ConfigError> {
        let direction = match method {
            methods::WHERE => {
                return match args {
                    [NavArg::Predicate(filter)] => Ok(Modifier::Where(filter.clone())),
                    _ => Err(ConfigError::InvalidNavigation(format!(
                        "{method} takes exactly one predicate"
                    ))),
                };
            }
            methods::ORDER_BY | methods::THEN_BY => OrderDirection::Asc,
            methods::ORDER_BY_DESCENDING | methods::THEN_BY_DESCENDING => OrderDirection::Desc,
            methods::SELECT_MANY => {
                return Err(ConfigError::InvalidNavigation(
                    "SelectMany composes hops and cannot be used as a modifier".to_string(),
                ));
            }
            other => return Err(ConfigError::UnsupportedOperation(other.to_string())),
        };

        let field = match args {
            [NavArg::Key(field)] => field.clone(),
            _ => {
                return Err(ConfigError::InvalidNavigation(format!(
                    "{method} takes exactly one key field"
                )))
            }
        };
        let spec = OrderSpec { field, direction };

        if method == methods::THEN_BY || method == methods::THEN_BY_DESCENDING {
            Ok(Modifier::ThenBy(spec))
        } else {
            Ok(Modifier::OrderBy(spec))
        }
    }

    /// The navigation method this modifier was declared with.
    pub fn method_name(&self) -> &'static str {
        match self {
            Modifier::Where(_) => methods::WHERE,
            Modifier::OrderBy(spec) => match spec.direction {
                OrderDirection::Asc => methods::ORDER_BY,
                OrderDirection::Desc => methods::ORDER_BY_DESCENDING,
            },
            Modifier::ThenBy(spec) => match spec.direction {
                OrderDirection::Asc => methods::THEN_BY,
                OrderDirection::Desc => methods::THEN_BY_DESCENDING,
            },
        }
    }

    /// Whether this is a `Where` filter.
    pub fn is_filter(&self) -> bool {
        matches!(self, Modifier::Where(_))
    }

    /// Fields the modifier reads.
    pub fn referenced_fields(&self) -> Vec<String> {
        match self {
            Modifier::Where(filter) => {
                let mut fields: Vec<String> = extract_filter_fields(filter).into_iter().collect();
                fields.sort();
                fields
            }
            Modifier::OrderBy(spec) | Modifier::ThenBy(spec) => vec![spec.field.clone()],
        }
    }
}

/// Read access to an entity's scalar fields.
pub trait Row {
    /// Run `f` over the row's fields.
    fn with_fields<R>(&self, f: impl FnOnce(&[(String, Value)]) -> R) -> R;
}

impl Row for Entity {
    fn with_fields<R>(&self, f: impl FnOnce(&[(String, Value)]) -> R) -> R {
        f(self.fields())
    }
}

impl Row for EntityRef {
    fn with_fields<R>(&self, f: impl FnOnce(&[(String, Value)]) -> R) -> R {
        f(self.read().fields())
    }
}

impl<T: Row + ?Sized> Row for &T {
    fn with_fields<R>(&self, f: impl FnOnce(&[(String, Value)]) -> R) -> R {
        (**self).with_fields(f)
    }
}

/// Applies hop modifiers to queries or in-memory sequences.
pub struct ModifierApplier;

impl ModifierApplier {
    /// Check that every `ThenBy` directly follows an ordering.
    pub fn validate(modifiers: &[Modifier]) -> Result<(), ConfigError> {
        let mut ordered = false;
        for modifier in modifiers {
            match modifier {
                Modifier::ThenBy(spec) if !ordered => {
                    return Err(ConfigError::InvalidNavigation(format!(
                        "{}({}) must follow OrderBy, OrderByDescending or another ThenBy",
                        modifier.method_name(),
                        spec.field
                    )));
                }
                Modifier::ThenBy(_) | Modifier::OrderBy(_) => ordered = true,
                Modifier::Where(_) => ordered = false,
            }
        }
        Ok(())
    }

    /// Append every modifier to `query`.
    pub fn apply_to_query(mut query: EntityQuery, modifiers: &[Modifier]) -> EntityQuery {
        for modifier in modifiers {
            query.push(modifier.clone());
        }
        query
    }

    /// Append only the `Where` modifiers to `query`.
    pub fn apply_filters_to_query(mut query: EntityQuery, modifiers: &[Modifier]) -> EntityQuery {
        for modifier in modifiers.iter().filter(|m| m.is_filter()) {
            query.push(modifier.clone());
        }
        query
    }

    /// Filter and sort `items` in memory.
    ///
    /// `Where` keeps matching rows. Consecutive orderings form one stable
    /// multi-key sort: `OrderBy` starts a new key list, `ThenBy` appends a
    /// tie-breaker. A new `OrderBy` re-sorts stably, so earlier orderings
    /// survive only as ties.
    pub fn apply_in_memory<T: Row>(mut items: Vec<T>, modifiers: &[Modifier]) -> Vec<T> {
        let mut keys: Vec<OrderSpec> = Vec::new();
        for modifier in modifiers {
            match modifier {
                Modifier::Where(filter) => {
                    items = Self::sort_stable(items, &keys);
                    keys.clear();
                    items.retain(|item| {
                        item.with_fields(|row| FilterEvaluator::evaluate(filter, row))
                    });
                }
                Modifier::OrderBy(spec) => {
                    items = Self::sort_stable(items, &keys);
                    keys = vec![spec.clone()];
                }
                Modifier::ThenBy(spec) => keys.push(spec.clone()),
            }
        }
        Self::sort_stable(items, &keys)
    }

    fn sort_stable<T: Row>(items: Vec<T>, keys: &[OrderSpec]) -> Vec<T> {
        if keys.is_empty() || items.len() < 2 {
            return items;
        }

        // Snapshot the sort keys once so the comparator never takes a lock.
        let mut decorated: Vec<(Vec<Option<Value>>, T)> = items
            .into_iter()
            .map(|item| {
                let sort_key = item.with_fields(|row| {
                    keys.iter()
                        .map(|spec| FilterEvaluator::get_field_value(row, &spec.field).cloned())
                        .collect()
                });
                (sort_key, item)
            })
            .collect();

        decorated.sort_by(|(a, _), (b, _)| {
            for ((av, bv), spec) in a.iter().zip(b.iter()).zip(keys) {
                let cmp = compare_values_opt(av.as_ref(), bv.as_ref());
                let cmp = match spec.direction {
                    OrderDirection::Asc => cmp,
                    OrderDirection::Desc => cmp.reverse(),
                };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });

        decorated.into_iter().map(|(_, item)| item).collect()
    }
}

/// Compare two optional values for sorting. Missing and null sort first.
fn compare_values_opt(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        // Incompatible types are considered equal
        (Some(av), Some(bv)) => FilterEvaluator::compare_values(av, bv).unwrap_or(Ordering::Equal),
    }
}
