//! navload IR types.
//!
//! This crate defines what a front-end hands to the loader: a normalized
//! description of a chained relationship navigation, the predicate and
//! ordering expressions its modifiers carry, and the runtime values those
//! expressions compare against.
//!
//! # Modules
//!
//! - [`value`] - Runtime field values
//! - [`query`] - Filter predicates and sort specifications
//! - [`navigation`] - Navigation selector IR
//! - [`error`] - IR error types
//!
//! All types are serde-serializable; front-ends running in another process
//! ship descriptions as JSON via [`NavigationDescription::from_json`].

pub mod error;
pub mod navigation;
pub mod query;
pub mod value;

pub use error::Error;

pub use navigation::{methods, NavArg, NavExpr, NavigationDescription};
pub use query::{FilterExpr, OrderDirection, OrderSpec};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_json_roundtrip() {
        let desc = NavigationDescription::new(
            "User",
            "Comment",
            NavExpr::member("posts")
                .filter(FilterExpr::ge("views", 10i64))
                .select_many(NavExpr::member("comments").order_by_desc("id")),
        );

        let json = desc.to_json().unwrap();
        let back = NavigationDescription::from_json(&json).unwrap();
        assert_eq!(desc, back);
    }
}
