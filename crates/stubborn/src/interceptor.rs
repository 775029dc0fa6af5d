// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{Classify, ConfigurationError, EffectivePolicy, Resolver, RetryExecutor};

/// Guards method invocations with the retry policy declared for them.
///
/// An interceptor pairs a [`Resolver`] with a [`RetryExecutor`]. Guarding a call is a two-step
/// affair: [`intercept`][Self::intercept] resolves the call site and fails with a
/// [`ConfigurationError`] before anything runs, then [`Guarded::call`] runs the operation under
/// the resolved policy and returns the operation's own result.
///
/// # Examples
///
/// ```
/// use std::io::{Error, ErrorKind};
///
/// use stubborn::{Catalog, Interceptor, MethodDeclaration, Resolver, RetryDeclaration, RetryExecutor, TypeDescriptor};
///
/// let catalog = Catalog::builder()
///     .add(
///         TypeDescriptor::new("Storage")
///             .retry(RetryDeclaration::new().max_retries(1))
///             .method("read", MethodDeclaration::Plain),
///     )
///     .build()?;
/// let interceptor = Interceptor::new(Resolver::new(catalog), RetryExecutor::new("storage"));
///
/// let mut calls = 0;
/// let result: Result<(), Error> = interceptor.intercept("Storage", "read")?.call(|| {
///     calls += 1;
///     Err(Error::new(ErrorKind::ConnectionReset, "reset"))
/// });
///
/// assert!(result.is_err());
/// assert_eq!(calls, 2);
/// # Ok::<(), stubborn::ConfigurationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Interceptor {
    resolver: Resolver,
    executor: RetryExecutor,
}

impl Interceptor {
    /// Creates an interceptor from a resolver and the executor that runs guarded calls.
    #[must_use]
    pub fn new(resolver: Resolver, executor: RetryExecutor) -> Self {
        Self { resolver, executor }
    }

    /// Returns the resolver.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Returns the executor.
    #[must_use]
    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// Resolves the policy for `method` invoked on `type_name`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the call site is unknown or its policy is invalid.
    /// Nothing is invoked in that case.
    pub fn intercept(&self, type_name: &str, method: &str) -> Result<Guarded<'_>, ConfigurationError> {
        let policy = self.resolver.resolve(type_name, method)?;

        Ok(Guarded {
            policy,
            executor: &self.executor,
        })
    }
}

/// A call site whose policy has been resolved, ready to run an operation.
///
/// Created by [`Interceptor::intercept`].
#[derive(Debug)]
pub struct Guarded<'a> {
    policy: EffectivePolicy,
    executor: &'a RetryExecutor,
}

impl Guarded<'_> {
    /// Returns the resolved policy.
    #[must_use]
    pub fn policy(&self) -> &EffectivePolicy {
        &self.policy
    }

    /// Runs `operation` under the resolved policy.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt, unchanged.
    pub fn call<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        E: Classify,
        F: FnMut() -> Result<T, E>,
    {
        self.executor.execute(&self.policy, operation)
    }
}
