//! Normalized navigation-path IR.
//!
//! A front-end (a query DSL parser, a macro, a hand-written builder) reduces
//! a chained relationship selector such as
//!
//! ```text
//! user => user.posts.Where(p => p.published).OrderBy(p => p.title)
//!             .SelectMany(p => p.comments.OrderByDescending(c => c.created_at))
//! ```
//!
//! into a [`NavExpr`] tree: bare relationship accesses are [`NavExpr::Member`]
//! leaves and every method applied on top of them is a [`NavExpr::Call`]
//! wrapping its source. Method names are kept as plain strings so that calls
//! the loader does not understand are still representable and can be
//! rejected when the path is resolved.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::query::FilterExpr;

/// Method names recognized by the path resolver.
pub mod methods {
    /// Predicate filter.
    pub const WHERE: &str = "Where";
    /// Fresh ascending primary sort.
    pub const ORDER_BY: &str = "OrderBy";
    /// Fresh descending primary sort.
    pub const ORDER_BY_DESCENDING: &str = "OrderByDescending";
    /// Ascending tie-breaker on the current ordering.
    pub const THEN_BY: &str = "ThenBy";
    /// Descending tie-breaker on the current ordering.
    pub const THEN_BY_DESCENDING: &str = "ThenByDescending";
    /// Composition with a nested selector (next hop).
    pub const SELECT_MANY: &str = "SelectMany";
}

/// One node of a navigation selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavExpr {
    /// Bare access of a relationship property on the current hop's source.
    Member { property: String },
    /// A method applied to `source`.
    Call {
        method: String,
        source: Box<NavExpr>,
        #[serde(default)]
        args: Vec<NavArg>,
    },
}

/// Argument of a [`NavExpr::Call`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavArg {
    /// Row predicate (for `Where`).
    Predicate(FilterExpr),
    /// Key selector naming a field (for the ordering calls).
    Key(String),
    /// Nested selector evaluated against each element (for `SelectMany`).
    Selector(NavExpr),
}

impl NavExpr {
    /// Access a relationship property.
    pub fn member(property: impl Into<String>) -> Self {
        NavExpr::Member {
            property: property.into(),
        }
    }

    /// Apply an arbitrary method. Used by front-ends that forward calls
    /// verbatim; unknown names fail at resolution time.
    pub fn call(self, method: impl Into<String>, args: Vec<NavArg>) -> Self {
        NavExpr::Call {
            method: method.into(),
            source: Box::new(self),
            args,
        }
    }

    /// Append a `Where` call.
    pub fn filter(self, predicate: FilterExpr) -> Self {
        self.call(methods::WHERE, vec![NavArg::Predicate(predicate)])
    }

    /// Append an `OrderBy` call.
    pub fn order_by(self, field: impl Into<String>) -> Self {
        self.call(methods::ORDER_BY, vec![NavArg::Key(field.into())])
    }

    /// Append an `OrderByDescending` call.
    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.call(methods::ORDER_BY_DESCENDING, vec![NavArg::Key(field.into())])
    }

    /// Append a `ThenBy` call.
    pub fn then_by(self, field: impl Into<String>) -> Self {
        self.call(methods::THEN_BY, vec![NavArg::Key(field.into())])
    }

    /// Append a `ThenByDescending` call.
    pub fn then_by_desc(self, field: impl Into<String>) -> Self {
        self.call(methods::THEN_BY_DESCENDING, vec![NavArg::Key(field.into())])
    }

    /// Compose with a nested selector that navigates one hop further.
    pub fn select_many(self, selector: NavExpr) -> Self {
        self.call(methods::SELECT_MANY, vec![NavArg::Selector(selector)])
    }

    /// Whether this node is a `SelectMany` composition.
    pub fn is_select_many(&self) -> bool {
        matches!(self, NavExpr::Call { method, .. } if method == methods::SELECT_MANY)
    }
}

impl fmt::Display for NavExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavExpr::Member { property } => write!(f, "{property}"),
            NavExpr::Call {
                method,
                source,
                args,
            } => {
                write!(f, "{source}.{method}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match arg {
                        NavArg::Predicate(_) => f.write_str("..")?,
                        NavArg::Key(field) => write!(f, "{field}")?,
                        NavArg::Selector(inner) => write!(f, "x => x.{inner}")?,
                    }
                }
                f.write_str(")")
            }
        }
    }
}

/// A complete navigation request: which root type it starts from, which
/// entity type it must end on, and the selector body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationDescription {
    /// Entity type of the root query.
    pub root_type: String,
    /// Entity type the selector must reach.
    pub leaf_type: String,
    /// The selector body.
    pub body: NavExpr,
}

impl NavigationDescription {
    /// Create a description.
    pub fn new(root_type: impl Into<String>, leaf_type: impl Into<String>, body: NavExpr) -> Self {
        Self {
            root_type: root_type.into(),
            leaf_type: leaf_type.into(),
            body,
        }
    }

    /// Decode a description produced by an out-of-process front-end.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Encode this description as JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Encode(e.to_string()))
    }
}

impl fmt::Display for NavigationDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => x.{} : {}", self.root_type, self.body, self.leaf_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_nests_outermost_last() {
        let expr = NavExpr::member("posts")
            .filter(FilterExpr::eq("published", true))
            .order_by("title");

        match &expr {
            NavExpr::Call { method, source, .. } => {
                assert_eq!(method, methods::ORDER_BY);
                assert!(matches!(
                    source.as_ref(),
                    NavExpr::Call { method, .. } if method == methods::WHERE
                ));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let expr = NavExpr::member("posts")
            .order_by("title")
            .select_many(NavExpr::member("comments").then_by("id"));
        assert_eq!(
            expr.to_string(),
            "posts.OrderBy(title).SelectMany(x => x.comments.ThenBy(id))"
        );
    }

    #[test]
    fn test_decode_front_end_json() {
        let json = r#"{
            "root_type": "User",
            "leaf_type": "Comment",
            "body": {
                "kind": "call",
                "method": "SelectMany",
                "source": { "kind": "member", "property": "posts" },
                "args": [
                    { "selector": {
                        "kind": "call",
                        "method": "Where",
                        "source": { "kind": "member", "property": "comments" },
                        "args": [ { "predicate": { "is_not_null": { "field": "text" } } } ]
                    } }
                ]
            }
        }"#;

        let desc = NavigationDescription::from_json(json).unwrap();
        assert_eq!(desc.root_type, "User");
        assert!(desc.body.is_select_many());
        assert_eq!(
            desc.body.to_string(),
            "posts.SelectMany(x => x.comments.Where(..))"
        );
    }

    #[test]
    fn test_decode_error() {
        let err = NavigationDescription::from_json("{").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
