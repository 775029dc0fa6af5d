// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Services with declared retry policies, used to check which policy each call site sees.
//!
//! The hierarchy mirrors how applications typically layer retry declarations:
//!
//! | Service | Declares | Expected invocations of a failing `service` |
//! |---------|----------|---------------------------------------------|
//! | [`ServiceKind::Base`] | type retry, 3 retries | 4 |
//! | [`ServiceKind::ClassOverride`] | type retry, 4 retries | 5 |
//! | [`ServiceKind::MethodOverride`] | method retry on `service`, 4 retries | 5 |
//! | [`ServiceKind::Suppressed`] | marker group on `service` without retry | 1 |
//!
//! Every service except [`ServiceKind::Base`] extends [`ServiceKind::Base`] and redefines
//! `service`. Each service counts its invocations in a counter obtained from a shared
//! [`CounterRegistry`].

use std::io;
use std::sync::Arc;

use stubborn::{
    Catalog, ConfigurationError, Interceptor, MethodDeclaration, PolicyOverrides, Resolver, RetryDeclaration, RetryExecutor,
    TypeDescriptor,
};
use tally::{Counter, CounterRegistry, InvalidKeyError};
use thiserror::Error;

/// The method every service exposes.
pub const SERVICE_METHOD: &str = "service";

/// Identifies one service of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Declares retry on the type.
    Base,

    /// Replaces the type-level retry declaration of its parent.
    ClassOverride,

    /// Declares retry on its own definition of `service`.
    MethodOverride,

    /// Switches inherited retry off on its own definition of `service`.
    Suppressed,
}

impl ServiceKind {
    /// Every service kind.
    pub const ALL: [Self; 4] = [Self::Base, Self::ClassOverride, Self::MethodOverride, Self::Suppressed];

    /// Returns the type name the service is described under.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Base => "BaseRetryOnClassService",
            Self::ClassOverride => "RetryOnClassOverrideService",
            Self::MethodOverride => "RetryOnMethodOverrideService",
            Self::Suppressed => "NoAnnotationOnOverriddenMethodService",
        }
    }

    /// Returns the id of the counter that records invocations of the service.
    #[must_use]
    pub fn counter_id(self) -> String {
        format!("{}.numberOfServiceCalls", self.type_name())
    }
}

/// Builds the catalog describing every [`ServiceKind`].
///
/// # Errors
///
/// Never fails for the built-in hierarchy; the error is propagated from [`Catalog`] building.
pub fn service_catalog() -> Result<Catalog, ConfigurationError> {
    let base = ServiceKind::Base.type_name();

    Catalog::builder()
        .add(
            TypeDescriptor::new(base)
                .retry(RetryDeclaration::new().max_retries(3))
                .method(SERVICE_METHOD, MethodDeclaration::Plain),
        )
        .add(
            TypeDescriptor::new(ServiceKind::ClassOverride.type_name())
                .extends(base)
                .retry(RetryDeclaration::new().max_retries(4))
                .method(SERVICE_METHOD, MethodDeclaration::Plain),
        )
        .add(
            TypeDescriptor::new(ServiceKind::MethodOverride.type_name())
                .extends(base)
                .method(SERVICE_METHOD, MethodDeclaration::Retry(RetryDeclaration::new().max_retries(4))),
        )
        .add(
            TypeDescriptor::new(ServiceKind::Suppressed.type_name())
                .extends(base)
                .method(SERVICE_METHOD, MethodDeclaration::from_markers(true, None)),
        )
        .build()
}

/// Why a call to [`RetryService::service`] failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceFailure {
    /// The simulated business failure, returned after retries ran out.
    #[error("service failed")]
    Io(#[from] io::Error),

    /// The retry policy of the call site is invalid.
    #[error("retry policy is misconfigured")]
    Configuration(#[from] ConfigurationError),
}

/// A service whose calls run under its declared retry policy.
pub trait RetryService {
    /// Invokes the service. The body always fails with an I/O error.
    ///
    /// # Errors
    ///
    /// Returns the failure of the last attempt, or a configuration error if the policy is invalid.
    fn service(&self) -> Result<(), ServiceFailure>;

    /// Returns how many times the service body ran.
    fn number_of_service_calls(&self) -> u32;
}

/// Creates services that share one interceptor and one counter registry.
#[derive(Debug)]
pub struct Services {
    interceptor: Arc<Interceptor>,
    registry: CounterRegistry,
}

impl Services {
    /// Creates services over [`service_catalog`] without configuration overrides.
    ///
    /// # Errors
    ///
    /// See [`service_catalog`].
    pub fn new() -> Result<Self, ConfigurationError> {
        Self::with_overrides(PolicyOverrides::new())
    }

    /// Creates services over [`service_catalog`] with the given configuration overrides.
    ///
    /// # Errors
    ///
    /// See [`service_catalog`].
    pub fn with_overrides(overrides: PolicyOverrides) -> Result<Self, ConfigurationError> {
        let resolver = Resolver::new(service_catalog()?).overrides(overrides);

        Ok(Self {
            interceptor: Arc::new(Interceptor::new(resolver, RetryExecutor::new("retry_visibility"))),
            registry: CounterRegistry::new(),
        })
    }

    /// Returns the registry that hands out the invocation counters.
    #[must_use]
    pub fn registry(&self) -> &CounterRegistry {
        &self.registry
    }

    /// Returns an instance of the given service.
    ///
    /// All instances of one kind share their invocation counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter id of the service is rejected by the registry.
    pub fn get(&self, kind: ServiceKind) -> Result<FailingService, InvalidKeyError> {
        Ok(FailingService {
            kind,
            interceptor: Arc::clone(&self.interceptor),
            calls: self.registry.get(&kind.counter_id())?,
        })
    }
}

/// A service whose body records the invocation and then fails.
#[derive(Debug, Clone)]
pub struct FailingService {
    kind: ServiceKind,
    interceptor: Arc<Interceptor>,
    calls: Counter,
}

impl FailingService {
    /// Returns which service this is.
    #[must_use]
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }
}

impl RetryService for FailingService {
    fn service(&self) -> Result<(), ServiceFailure> {
        let guarded = self.interceptor.intercept(self.kind.type_name(), SERVICE_METHOD)?;

        guarded.call(|| -> io::Result<()> {
            self.calls.increment();
            Err(io::Error::other("simulated failure"))
        })?;

        Ok(())
    }

    fn number_of_service_calls(&self) -> u32 {
        self.calls.get()
    }
}
