// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::{CallSite, ConfigurationError, MethodDeclaration, PolicyDeclaration, RetryDeclaration};

/// Describes one type: its parent, its type-level retry marker, and the methods it defines itself.
///
/// Methods a type inherits without redefining them must not be listed; they are discovered
/// through the parent.
///
/// # Examples
///
/// ```
/// use stubborn::{MethodDeclaration, RetryDeclaration, TypeDescriptor};
///
/// let base = TypeDescriptor::new("BaseService")
///     .retry(RetryDeclaration::new().max_retries(3))
///     .method("service", MethodDeclaration::Plain);
///
/// let sub = TypeDescriptor::new("QuietService")
///     .extends("BaseService")
///     .method("service", MethodDeclaration::Suppressed);
///
/// assert_eq!(sub.name(), "QuietService");
/// assert_eq!(sub.parent(), Some("BaseService"));
/// # let _ = base;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
pub struct TypeDescriptor {
    name: Cow<'static, str>,
    #[cfg_attr(any(feature = "serde", test), serde(default))]
    extends: Option<Cow<'static, str>>,
    #[cfg_attr(any(feature = "serde", test), serde(default))]
    retry: Option<RetryDeclaration>,
    #[cfg_attr(any(feature = "serde", test), serde(default))]
    methods: BTreeMap<Cow<'static, str>, MethodDeclaration>,
}

impl TypeDescriptor {
    /// Creates a descriptor for a type without parent, markers, or methods.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            retry: None,
            methods: BTreeMap::new(),
        }
    }

    /// Sets the parent type.
    #[must_use]
    pub fn extends(mut self, parent: impl Into<Cow<'static, str>>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Attaches a type-level retry marker.
    #[must_use]
    pub fn retry(mut self, retry: RetryDeclaration) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Adds or replaces a method defined by this type.
    #[must_use]
    pub fn method(mut self, name: impl Into<Cow<'static, str>>, declaration: MethodDeclaration) -> Self {
        self.methods.insert(name.into(), declaration);
        self
    }

    /// Returns the name of the type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the parent type, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.extends.as_deref()
    }
}

/// Declared metadata for a set of types, in a shape suitable for configuration files.
///
/// ```json
/// {
///   "types": [
///     { "name": "BaseService", "retry": { "max_retries": 3 }, "methods": { "service": "plain" } },
///     { "name": "QuietService", "extends": "BaseService", "methods": { "service": "suppressed" } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
pub struct CatalogConfig {
    /// The described types.
    pub types: Vec<TypeDescriptor>,
}

/// The table of call sites derived from a set of [`TypeDescriptor`]s.
///
/// A catalog is built once, typically at startup. Building validates the hierarchy and computes
/// the [`CallSite`] of every method visible on every type, so looking one up later is a plain map
/// access without locking.
///
/// # Examples
///
/// ```
/// use stubborn::{Catalog, MethodDeclaration, Resolution, RetryDeclaration, TypeDescriptor};
///
/// let catalog = Catalog::builder()
///     .add(
///         TypeDescriptor::new("BaseService")
///             .retry(RetryDeclaration::new())
///             .method("service", MethodDeclaration::Plain),
///     )
///     .add(TypeDescriptor::new("SubService").extends("BaseService"))
///     .build()?;
///
/// let site = catalog.call_site("SubService", "service").expect("inherited method is visible");
/// assert!(matches!(site.resolution(), Resolution::Inherited(_)));
/// # Ok::<(), stubborn::ConfigurationError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sites: HashMap<Cow<'static, str>, HashMap<Cow<'static, str>, CallSite>>,
}

impl Catalog {
    /// Starts building a catalog.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Builds a catalog from configuration.
    ///
    /// # Errors
    ///
    /// See [`CatalogBuilder::build`].
    pub fn from_config(config: CatalogConfig) -> Result<Self, ConfigurationError> {
        CatalogBuilder { types: config.types }.build()
    }

    /// Returns the call site for `method` invoked on `type_name`, if the method is visible on it.
    #[must_use]
    pub fn call_site(&self, type_name: &str, method: &str) -> Option<&CallSite> {
        self.sites.get(type_name)?.get(method)
    }

    /// Returns the number of described types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.sites.len()
    }

    /// Returns an iterator over every call site in the catalog, in no particular order.
    pub fn call_sites(&self) -> impl Iterator<Item = &CallSite> {
        self.sites.values().flat_map(HashMap::values)
    }
}

/// Collects [`TypeDescriptor`]s for a [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    types: Vec<TypeDescriptor>,
}

impl CatalogBuilder {
    /// Adds a type.
    #[must_use]
    pub fn add(mut self, descriptor: TypeDescriptor) -> Self {
        self.types.push(descriptor);
        self
    }

    /// Validates the described hierarchy and computes every call site.
    ///
    /// Declared values such as negative retry counts are not checked here; they are reported when
    /// a call site that selects them is resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateType`] if two descriptors share a name,
    /// [`ConfigurationError::UnknownParent`] if a parent is not described, and
    /// [`ConfigurationError::CyclicHierarchy`] if a type is its own ancestor.
    pub fn build(self) -> Result<Catalog, ConfigurationError> {
        let mut by_name: HashMap<&str, &TypeDescriptor> = HashMap::with_capacity(self.types.len());

        for descriptor in &self.types {
            if by_name.insert(descriptor.name(), descriptor).is_some() {
                return Err(ConfigurationError::DuplicateType(descriptor.name().to_owned()));
            }
        }

        let mut sites = HashMap::with_capacity(self.types.len());

        for descriptor in &self.types {
            let chain = ancestry(descriptor, &by_name)?;
            sites.insert(descriptor.name.clone(), call_sites_of(&chain));
        }

        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "stubborn.catalog.built",
            tracing::Level::DEBUG,
            catalog.types = sites.len(),
            catalog.call_sites = sites.values().map(HashMap::len).sum::<usize>(),
        );

        Ok(Catalog { sites })
    }
}

/// Returns `descriptor` followed by its ancestors, nearest first.
fn ancestry<'a>(
    descriptor: &'a TypeDescriptor,
    by_name: &HashMap<&str, &'a TypeDescriptor>,
) -> Result<Vec<&'a TypeDescriptor>, ConfigurationError> {
    let mut chain = vec![descriptor];
    let mut seen = HashSet::from([descriptor.name()]);
    let mut current = descriptor;

    while let Some(parent) = current.parent() {
        let Some(&next) = by_name.get(parent) else {
            return Err(ConfigurationError::UnknownParent {
                type_name: current.name().to_owned(),
                parent: parent.to_owned(),
            });
        };

        if !seen.insert(next.name()) {
            return Err(ConfigurationError::CyclicHierarchy(descriptor.name().to_owned()));
        }

        chain.push(next);
        current = next;
    }

    Ok(chain)
}

fn call_sites_of(chain: &[&TypeDescriptor]) -> HashMap<Cow<'static, str>, CallSite> {
    let invoked = chain[0];

    let enclosing = chain
        .iter()
        .find_map(|descriptor| descriptor.retry.as_ref().map(|retry| PolicyDeclaration::on_type(descriptor.name.clone(), retry.clone())));

    let visible: BTreeSet<&Cow<'static, str>> = chain.iter().flat_map(|descriptor| descriptor.methods.keys()).collect();
    let mut sites = HashMap::with_capacity(visible.len());

    for method in visible {
        // The nearest definition of the method decides its own declaration.
        let Some((definer, declaration)) = chain
            .iter()
            .find_map(|descriptor| descriptor.methods.get(method).map(|declaration| (*descriptor, declaration)))
        else {
            continue;
        };

        let own = match declaration {
            MethodDeclaration::Retry(retry) => Some(PolicyDeclaration::on_method(definer.name.clone(), method.clone(), retry.clone())),
            MethodDeclaration::Plain | MethodDeclaration::Suppressed => None,
        };
        let suppressed = matches!(declaration, MethodDeclaration::Suppressed);

        let site = CallSite::new(invoked.name.clone(), method.clone(), own, suppressed, enclosing.clone());
        sites.insert(method.clone(), site);
    }

    sites
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FailureKinds, Resolution, Scope};

    fn hierarchy() -> CatalogBuilder {
        Catalog::builder()
            .add(
                TypeDescriptor::new("Base")
                    .retry(RetryDeclaration::new().max_retries(3))
                    .method("service", MethodDeclaration::Plain)
                    .method("audit", MethodDeclaration::Retry(RetryDeclaration::new().max_retries(1))),
            )
            .add(TypeDescriptor::new("ClassOverride").extends("Base").retry(RetryDeclaration::new().max_retries(4)))
            .add(
                TypeDescriptor::new("MethodOverride")
                    .extends("Base")
                    .method("service", MethodDeclaration::Retry(RetryDeclaration::new().max_retries(4))),
            )
            .add(TypeDescriptor::new("Suppressing").extends("Base").method("service", MethodDeclaration::Suppressed))
            .add(TypeDescriptor::new("Grandchild").extends("MethodOverride"))
    }

    #[test]
    fn base_inherits_own_type_declaration() {
        let catalog = hierarchy().build().unwrap();
        let site = catalog.call_site("Base", "service").unwrap();

        let Resolution::Inherited(declaration) = site.resolution() else {
            panic!("expected an inherited declaration, got {:?}", site.resolution());
        };
        assert_eq!(declaration.scope(), Scope::Type);
        assert_eq!(declaration.type_name(), "Base");
        assert_eq!(declaration.retry().get_max_retries(), 3);
    }

    #[test]
    fn most_specific_type_declaration_wins() {
        let catalog = hierarchy().build().unwrap();
        let site = catalog.call_site("ClassOverride", "service").unwrap();

        assert_eq!(site.type_name(), "ClassOverride");
        assert_eq!(site.enclosing_type_declaration().unwrap().type_name(), "ClassOverride");
        assert_eq!(site.enclosing_type_declaration().unwrap().retry().get_max_retries(), 4);
    }

    #[test]
    fn own_method_declaration_is_recorded() {
        let catalog = hierarchy().build().unwrap();
        let site = catalog.call_site("MethodOverride", "service").unwrap();

        let own = site.own_declaration().unwrap();
        assert_eq!(own.scope(), Scope::Method);
        assert_eq!(own.type_name(), "MethodOverride");
        assert_eq!(own.retry().get_max_retries(), 4);
        assert_eq!(site.enclosing_type_declaration().unwrap().type_name(), "Base");
    }

    #[test]
    fn method_declaration_is_inherited_when_not_redefined() {
        let catalog = hierarchy().build().unwrap();
        let site = catalog.call_site("Grandchild", "service").unwrap();

        assert_eq!(site.own_declaration().unwrap().type_name(), "MethodOverride");
        assert_eq!(site.type_name(), "Grandchild");
    }

    #[test]
    fn suppression_is_recorded() {
        let catalog = hierarchy().build().unwrap();
        let site = catalog.call_site("Suppressing", "service").unwrap();

        assert!(site.is_suppressed());
        assert_eq!(site.resolution(), Resolution::Suppressed);

        // Other methods are unaffected by the suppressed override.
        let audit = catalog.call_site("Suppressing", "audit").unwrap();
        assert!(!audit.is_suppressed());
        assert_eq!(audit.own_declaration().unwrap().type_name(), "Base");
    }

    #[test]
    fn plain_override_hides_ancestor_method_declaration() {
        let catalog = Catalog::builder()
            .add(TypeDescriptor::new("Base").method("audit", MethodDeclaration::Retry(RetryDeclaration::new())))
            .add(TypeDescriptor::new("Sub").extends("Base").method("audit", MethodDeclaration::Plain))
            .build()
            .unwrap();

        let site = catalog.call_site("Sub", "audit").unwrap();

        assert_eq!(site.resolution(), Resolution::Undeclared);
    }

    #[test]
    fn unknown_sites_are_absent() {
        let catalog = hierarchy().build().unwrap();

        assert!(catalog.call_site("Base", "missing").is_none());
        assert!(catalog.call_site("Missing", "service").is_none());
        assert_eq!(catalog.type_count(), 5);
        assert_eq!(catalog.call_sites().count(), 10);
    }

    #[test]
    fn duplicate_type_rejected() {
        let result = Catalog::builder().add(TypeDescriptor::new("A")).add(TypeDescriptor::new("A")).build();

        assert_eq!(result.unwrap_err(), ConfigurationError::DuplicateType("A".to_owned()));
    }

    #[test]
    fn unknown_parent_rejected() {
        let result = Catalog::builder().add(TypeDescriptor::new("A").extends("Ghost")).build();

        assert_eq!(
            result.unwrap_err(),
            ConfigurationError::UnknownParent {
                type_name: "A".to_owned(),
                parent: "Ghost".to_owned(),
            }
        );
    }

    #[test]
    fn cycles_rejected() {
        let result = Catalog::builder()
            .add(TypeDescriptor::new("A").extends("B"))
            .add(TypeDescriptor::new("B").extends("A"))
            .build();

        assert!(matches!(result.unwrap_err(), ConfigurationError::CyclicHierarchy(_)));

        let result = Catalog::builder().add(TypeDescriptor::new("Self").extends("Self")).build();

        assert_eq!(result.unwrap_err(), ConfigurationError::CyclicHierarchy("Self".to_owned()));
    }

    #[test]
    fn invalid_values_are_accepted_at_build() {
        let catalog = Catalog::builder()
            .add(TypeDescriptor::new("Broken").retry(RetryDeclaration::new().max_retries(-5)).method("service", MethodDeclaration::Plain))
            .build()
            .unwrap();

        assert!(catalog.call_site("Broken", "service").is_some());
    }

    #[test]
    fn from_config() {
        let config: CatalogConfig = serde_json::from_str(
            r#"{
                "types": [
                    { "name": "Base", "retry": { "max_retries": 3 }, "methods": { "service": "plain" } },
                    {
                        "name": "Sub",
                        "extends": "Base",
                        "methods": { "service": { "retry": { "max_retries": 4, "retry_on": { "only": ["io"] } } } }
                    }
                ]
            }"#,
        )
        .unwrap();

        let catalog = Catalog::from_config(config).unwrap();
        let own = catalog.call_site("Sub", "service").unwrap().own_declaration().unwrap();

        assert_eq!(own.retry().get_max_retries(), 4);
        assert_eq!(own.retry().get_retry_on(), &FailureKinds::only(["io"]));
    }
}
