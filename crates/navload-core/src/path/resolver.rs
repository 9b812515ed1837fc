//! Navigation selector to [`NavigationChain`] resolution.

use std::sync::Arc;

use navload_proto::navigation::methods;
use navload_proto::{NavArg, NavExpr, NavigationDescription};
use tracing::debug;

use crate::catalog::{FieldRef, LookupError, PropertyRef, SchemaLookup};
use crate::config::LoadBudget;
use crate::error::{ConfigError, Error};
use crate::modifier::{Modifier, ModifierApplier};

use super::cache::ResolutionCache;
use super::segment::{ChildSetter, KeyAccessor, NavigationChain, PathSegment};

/// A hop found in the selector but not yet bound to schema accessors.
#[derive(Debug)]
struct Hop {
    from_type: String,
    property: PropertyRef,
    modifiers: Vec<Modifier>,
}

/// Resolves navigation selectors against a schema lookup.
///
/// Every resolution consults the schema afresh unless a
/// [`ResolutionCache`] is attached.
pub struct PathResolver<'a> {
    schema: &'a dyn SchemaLookup,
    budget: LoadBudget,
    cache: Option<&'a ResolutionCache>,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver with the default budget.
    pub fn new(schema: &'a dyn SchemaLookup) -> Self {
        Self {
            schema,
            budget: LoadBudget::default(),
            cache: None,
        }
    }

    /// Use a custom budget.
    pub fn with_budget(mut self, budget: LoadBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Reuse chains from `cache`.
    pub fn with_cache(mut self, cache: &'a ResolutionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Resolve a decoded navigation description.
    pub fn resolve_description(
        &self,
        description: &NavigationDescription,
    ) -> Result<Arc<NavigationChain>, Error> {
        self.resolve(
            &description.root_type,
            &description.leaf_type,
            &description.body,
        )
    }

    /// Resolve `body`, starting at `root_type` and required to end at
    /// `leaf_type`.
    ///
    /// Fails before any query can run if the selector uses an unsupported
    /// method, crosses an entity without exactly one key field, names a
    /// relationship the schema does not know, or targets a read-only
    /// property.
    pub fn resolve(
        &self,
        root_type: &str,
        leaf_type: &str,
        body: &NavExpr,
    ) -> Result<Arc<NavigationChain>, Error> {
        let Some(cache) = self.cache else {
            return self.resolve_uncached(root_type, leaf_type, body).map(Arc::new);
        };

        let version = self.schema.schema_version();
        if let Some(chain) = cache.get(root_type, leaf_type, body, version) {
            return Ok(chain);
        }

        let chain = Arc::new(self.resolve_uncached(root_type, leaf_type, body)?);
        cache.insert(root_type, leaf_type, body, Arc::clone(&chain), version);
        Ok(chain)
    }

    fn resolve_uncached(
        &self,
        root_type: &str,
        leaf_type: &str,
        body: &NavExpr,
    ) -> Result<NavigationChain, Error> {
        let mut hops = Vec::new();
        self.collect_hops(root_type, body, &mut hops)?;

        if hops.len() > self.budget.max_depth {
            return Err(ConfigError::DepthExceeded {
                depth: hops.len(),
                max: self.budget.max_depth,
            }
            .into());
        }

        let segments = hops
            .into_iter()
            .map(|hop| self.bind(hop))
            .collect::<Result<Vec<_>, _>>()?;
        let chain = NavigationChain::new(segments)?;

        if chain.leaf_type() != leaf_type {
            return Err(ConfigError::LeafTypeMismatch {
                expected: leaf_type.to_string(),
                actual: chain.leaf_type().to_string(),
            }
            .into());
        }

        debug!(
            root = root_type,
            leaf = leaf_type,
            depth = chain.depth(),
            path = %chain.path(),
            "navigation resolved"
        );
        Ok(chain)
    }

    /// Walk `expr` outside-in, appending one hop per member access.
    fn collect_hops(
        &self,
        from_type: &str,
        expr: &NavExpr,
        hops: &mut Vec<Hop>,
    ) -> Result<(), Error> {
        // Peel modifier calls; they arrive outermost first.
        let mut modifiers = Vec::new();
        let mut node = expr;
        while let NavExpr::Call {
            method,
            source,
            args,
        } = node
        {
            if method == methods::SELECT_MANY {
                break;
            }
            modifiers.push(Modifier::from_call(method, args)?);
            node = source.as_ref();
        }
        modifiers.reverse();

        match node {
            NavExpr::Member { property } => {
                let property = self.schema.property_of(from_type, property)?;
                hops.push(Hop {
                    from_type: from_type.to_string(),
                    property,
                    modifiers,
                });
            }
            NavExpr::Call { source, args, .. } => {
                let selector = match args.as_slice() {
                    [NavArg::Selector(selector)] => selector,
                    _ => {
                        return Err(ConfigError::InvalidNavigation(
                            "SelectMany takes exactly one nested selector".to_string(),
                        )
                        .into())
                    }
                };

                self.collect_hops(from_type, source, hops)?;
                let next_from = match hops.last() {
                    Some(hop) => hop.property.target.clone(),
                    None => {
                        return Err(ConfigError::InvalidNavigation(
                            "SelectMany source does not navigate a relationship".to_string(),
                        )
                        .into())
                    }
                };
                self.collect_hops(&next_from, selector, hops)?;

                // Calls applied to the composed sequence act on its elements,
                // which are the last hop's children.
                if let Some(last) = hops.last_mut() {
                    last.modifiers.extend(modifiers);
                }
            }
        }
        Ok(())
    }

    /// Bind one hop to schema accessors and validate its modifiers.
    ///
    /// Key and foreign-key fields come from the named relationship, so two
    /// relationships between the same pair of types bind independently.
    fn bind(&self, hop: Hop) -> Result<PathSegment, Error> {
        let from = hop.from_type.as_str();
        let property = &hop.property;
        let to = property.target.as_str();

        let key_fields = self.schema.key_fields_of(from)?;
        let key = match key_fields.as_slice() {
            [key] => key,
            [] => return Err(LookupError::NoKey(from.to_string()).into()),
            many => {
                return Err(ConfigError::CompositeKey {
                    entity: from.to_string(),
                    count: many.len(),
                }
                .into())
            }
        };
        if key.field != property.key_field {
            return Err(ConfigError::KeyMismatch {
                entity: from.to_string(),
                property: property.name.clone(),
                field: property.key_field.clone(),
                key: key.field.clone(),
            }
            .into());
        }
        let primary_key = KeyAccessor::bind(key);

        let setter = ChildSetter::bind(property)?;

        if !self.schema.has_field(to, &property.foreign_key_field)? {
            return Err(ConfigError::MissingRelationship {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        let foreign_key =
            KeyAccessor::bind(&FieldRef::new(to, property.foreign_key_field.as_str()));

        ModifierApplier::validate(&hop.modifiers)?;
        for field in hop.modifiers.iter().flat_map(Modifier::referenced_fields) {
            if !self.schema.has_field(to, &field)? {
                return Err(ConfigError::UnknownField {
                    entity: to.to_string(),
                    field,
                }
                .into());
            }
        }

        Ok(PathSegment::new(
            primary_key,
            foreign_key,
            setter,
            hop.modifiers,
        ))
    }
}
