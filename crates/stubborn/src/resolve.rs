// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;
use std::sync::Arc;

use recoverable::RecoveryInfo;

use crate::constants::MAX_SUPPORTED_RETRIES;
use crate::{CallSite, Catalog, ConfigurationError, FailureKind, FailureKinds, PolicyDeclaration, PolicyOverrides, Resolution, Scope};

/// Where an [`EffectivePolicy`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicySource {
    /// A retry marker on the method.
    Method {
        /// The type whose definition of the method carries the marker.
        type_name: String,
        /// The method.
        method: String,
    },

    /// A retry marker on a type.
    Type {
        /// The type that carries the marker.
        type_name: String,
    },

    /// The method switches inherited retry off.
    Suppressed,

    /// Nothing declares retry for the call site.
    Undeclared,

    /// Retry is switched off by configuration.
    Disabled,
}

impl PolicySource {
    fn of(declaration: &PolicyDeclaration) -> Self {
        match (declaration.scope(), declaration.method()) {
            (Scope::Method, Some(method)) => Self::Method {
                type_name: declaration.type_name().to_owned(),
                method: method.to_owned(),
            },
            _ => Self::Type {
                type_name: declaration.type_name().to_owned(),
            },
        }
    }
}

impl Display for PolicySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Method { type_name, method } => write!(f, "method {type_name}::{method}"),
            Self::Type { type_name } => write!(f, "type {type_name}"),
            Self::Suppressed => f.write_str("suppressed"),
            Self::Undeclared => f.write_str("undeclared"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// The retry configuration that governs one invocation.
///
/// Effective policies are computed for every call and are never stored by the resolver.
///
/// # Examples
///
/// ```
/// use recoverable::RecoveryKind;
/// use stubborn::{EffectivePolicy, FailureKind};
///
/// let policy = EffectivePolicy::no_retry();
///
/// assert_eq!(policy.max_retries(), 0);
/// assert_eq!(policy.max_attempts(), 1);
/// assert_eq!(policy.recovery(&FailureKind::IO).kind(), RecoveryKind::Never);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePolicy {
    max_retries: u32,
    retry_on: FailureKinds,
    abort_on: FailureKinds,
    source: PolicySource,
}

impl EffectivePolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::without_retry(PolicySource::Undeclared)
    }

    fn without_retry(source: PolicySource) -> Self {
        Self {
            max_retries: 0,
            retry_on: FailureKinds::none(),
            abort_on: FailureKinds::none(),
            source,
        }
    }

    /// Derives the policy described by `declaration`, using `max_retries` in place of the declared
    /// count.
    fn from_declaration(declaration: &PolicyDeclaration, max_retries: i64) -> Result<Self, ConfigurationError> {
        let max_retries = u32::try_from(max_retries)
            .ok()
            .filter(|&retries| retries <= MAX_SUPPORTED_RETRIES)
            .ok_or_else(|| {
                if max_retries < 0 {
                    ConfigurationError::NegativeMaxRetries {
                        declaration: declaration.to_string(),
                        max_retries,
                    }
                } else {
                    ConfigurationError::MaxRetriesTooLarge {
                        declaration: declaration.to_string(),
                        max_retries,
                    }
                }
            })?;

        Ok(Self {
            max_retries,
            retry_on: declaration.retry().get_retry_on().clone(),
            abort_on: declaration.retry().get_abort_on().clone(),
            source: PolicySource::of(declaration),
        })
    }

    /// Returns the number of additional attempts allowed after the first failure.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the total number of attempts allowed, including the first one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the failure kinds that may be retried.
    #[must_use]
    pub fn retry_on(&self) -> &FailureKinds {
        &self.retry_on
    }

    /// Returns the failure kinds that are never retried.
    #[must_use]
    pub fn abort_on(&self) -> &FailureKinds {
        &self.abort_on
    }

    /// Returns where this policy came from.
    #[must_use]
    pub fn source(&self) -> &PolicySource {
        &self.source
    }

    /// Classifies a failure of the given kind under this policy.
    ///
    /// Returns [`RecoveryInfo::retry`] if the policy allows retries at all and the kind passes
    /// `retry_on` and not `abort_on`, and [`RecoveryInfo::never`] otherwise. How many retries are
    /// left is not considered here.
    #[must_use]
    pub fn recovery(&self, kind: &FailureKind) -> RecoveryInfo {
        if self.max_retries == 0 || self.abort_on.matches(kind) || !self.retry_on.matches(kind) {
            return RecoveryInfo::never();
        }

        RecoveryInfo::retry()
    }
}

/// Computes the [`EffectivePolicy`] of call sites in a [`Catalog`].
///
/// Resolution picks exactly one declaration level, most specific first:
///
/// 1. the retry marker on the method's own definition, used as declared;
/// 2. otherwise, if the method's own definition switches retry off, no retry;
/// 3. otherwise, the retry marker of the nearest type, starting at the invoked type;
/// 4. otherwise, no retry.
///
/// Declarations from different levels are never merged. Configuration
/// [overrides][PolicyOverrides] then adjust the selected declaration.
///
/// The resolver holds no mutable state, so resolving the same call site twice yields the same
/// policy, and a resolver can be shared freely across threads.
///
/// # Examples
///
/// ```
/// use stubborn::{Catalog, MethodDeclaration, Resolver, RetryDeclaration, TypeDescriptor};
///
/// let catalog = Catalog::builder()
///     .add(
///         TypeDescriptor::new("BaseService")
///             .retry(RetryDeclaration::new().max_retries(3))
///             .method("service", MethodDeclaration::Plain),
///     )
///     .add(
///         TypeDescriptor::new("EagerService")
///             .extends("BaseService")
///             .method("service", MethodDeclaration::Retry(RetryDeclaration::new().max_retries(4))),
///     )
///     .build()?;
///
/// let resolver = Resolver::new(catalog);
///
/// assert_eq!(resolver.resolve("BaseService", "service")?.max_retries(), 3);
/// assert_eq!(resolver.resolve("EagerService", "service")?.max_retries(), 4);
/// # Ok::<(), stubborn::ConfigurationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Resolver {
    catalog: Arc<Catalog>,
    overrides: Arc<PolicyOverrides>,
}

impl Resolver {
    /// Creates a resolver over `catalog` without configuration overrides.
    #[must_use]
    pub fn new(catalog: impl Into<Arc<Catalog>>) -> Self {
        Self {
            catalog: catalog.into(),
            overrides: Arc::default(),
        }
    }

    /// Applies configuration overrides to every resolution.
    #[must_use]
    pub fn overrides(mut self, overrides: PolicyOverrides) -> Self {
        self.overrides = Arc::new(overrides);
        self
    }

    /// Returns the catalog this resolver reads from.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the call site for `method` invoked on `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownCallSite`] if the catalog does not know the call site.
    pub fn call_site(&self, type_name: &str, method: &str) -> Result<&CallSite, ConfigurationError> {
        self.catalog
            .call_site(type_name, method)
            .ok_or_else(|| ConfigurationError::UnknownCallSite {
                type_name: type_name.to_owned(),
                method: method.to_owned(),
            })
    }

    /// Resolves the policy for `method` invoked on `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownCallSite`] if the catalog does not know the call site,
    /// and any error of [`resolve_site`][Self::resolve_site].
    pub fn resolve(&self, type_name: &str, method: &str) -> Result<EffectivePolicy, ConfigurationError> {
        let site = self.call_site(type_name, method)?;
        self.resolve_site(site)
    }

    /// Resolves the policy for a call site.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NegativeMaxRetries`] or
    /// [`ConfigurationError::MaxRetriesTooLarge`] if the selected declaration (after overrides)
    /// asks for an unusable number of retries, and [`ConfigurationError::InvalidOverride`] if a
    /// relevant override cannot be parsed.
    pub fn resolve_site(&self, site: &CallSite) -> Result<EffectivePolicy, ConfigurationError> {
        let policy = if self.overrides.retry_disabled()? {
            EffectivePolicy::without_retry(PolicySource::Disabled)
        } else {
            match site.resolution() {
                Resolution::Own(declaration) | Resolution::Inherited(declaration) => self.from_declaration(declaration)?,
                Resolution::Suppressed => EffectivePolicy::without_retry(PolicySource::Suppressed),
                Resolution::Undeclared => EffectivePolicy::without_retry(PolicySource::Undeclared),
            }
        };

        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "stubborn.resolve",
            tracing::Level::DEBUG,
            call_site = %site,
            policy.source = %policy.source,
            policy.max_retries = policy.max_retries,
        );

        Ok(policy)
    }

    fn from_declaration(&self, declaration: &PolicyDeclaration) -> Result<EffectivePolicy, ConfigurationError> {
        let max_retries = self
            .overrides
            .max_retries_for(declaration)?
            .unwrap_or_else(|| declaration.retry().get_max_retries());

        EffectivePolicy::from_declaration(declaration, max_retries)
    }
}
