// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Display;

use crate::FailureKinds;
use crate::constants::DEFAULT_MAX_RETRIES;

// Naming convention: setters use plain names (`max_retries()`), getters use the `get_` prefix
// (`get_max_retries()`).

/// The values of one retry marker, exactly as declared.
///
/// Values are not validated when declared. A negative retry count is reported as a
/// [`ConfigurationError`][crate::ConfigurationError] when a call site that selects this
/// declaration is resolved.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | max retries | `3` |
/// | retry on | every failure kind |
/// | abort on | no failure kind |
///
/// # Examples
///
/// ```
/// use stubborn::{FailureKinds, RetryDeclaration};
///
/// let declaration = RetryDeclaration::new()
///     .max_retries(4)
///     .retry_on(FailureKinds::only(["io"]));
///
/// assert_eq!(declaration.get_max_retries(), 4);
/// assert_eq!(declaration.get_abort_on(), &FailureKinds::none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct RetryDeclaration {
    max_retries: i64,
    retry_on: FailureKinds,
    abort_on: FailureKinds,
}

impl Default for RetryDeclaration {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_on: FailureKinds::All,
            abort_on: FailureKinds::none(),
        }
    }
}

impl RetryDeclaration {
    /// Creates a declaration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of additional attempts after the first failure.
    #[must_use]
    pub fn max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the failure kinds that may be retried.
    #[must_use]
    pub fn retry_on(mut self, kinds: FailureKinds) -> Self {
        self.retry_on = kinds;
        self
    }

    /// Sets the failure kinds that are never retried, even if [`retry_on`][Self::retry_on]
    /// matches them.
    #[must_use]
    pub fn abort_on(mut self, kinds: FailureKinds) -> Self {
        self.abort_on = kinds;
        self
    }

    /// Returns the declared number of retries.
    #[must_use]
    pub fn get_max_retries(&self) -> i64 {
        self.max_retries
    }

    /// Returns the failure kinds that may be retried.
    #[must_use]
    pub fn get_retry_on(&self) -> &FailureKinds {
        &self.retry_on
    }

    /// Returns the failure kinds that are never retried.
    #[must_use]
    pub fn get_abort_on(&self) -> &FailureKinds {
        &self.abort_on
    }
}

/// Where a [`PolicyDeclaration`] is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Declared on a type, covering every method of it.
    Type,

    /// Declared on one method.
    Method,
}

/// One occurrence of a retry marker, together with where it was found.
///
/// Declarations are produced by a [`Catalog`][crate::Catalog] when it is built and never change
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDeclaration {
    scope: Scope,
    type_name: Cow<'static, str>,
    method: Option<Cow<'static, str>>,
    retry: RetryDeclaration,
}

impl PolicyDeclaration {
    pub(crate) fn on_type(type_name: Cow<'static, str>, retry: RetryDeclaration) -> Self {
        Self {
            scope: Scope::Type,
            type_name,
            method: None,
            retry,
        }
    }

    pub(crate) fn on_method(type_name: Cow<'static, str>, method: Cow<'static, str>, retry: RetryDeclaration) -> Self {
        Self {
            scope: Scope::Method,
            type_name,
            method: Some(method),
            retry,
        }
    }

    /// Returns whether this declaration is attached to a type or to a method.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the name of the type that carries this declaration.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the name of the method that carries this declaration, for method-scoped declarations.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Returns the declared values.
    #[must_use]
    pub fn retry(&self) -> &RetryDeclaration {
        &self.retry
    }
}

impl Display for PolicyDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.method {
            Some(method) => write!(f, "retry declaration on method {}::{method}", self.type_name),
            None => write!(f, "retry declaration on type {}", self.type_name),
        }
    }
}

/// What a type's own definition of a method carries.
///
/// This is the per-method half of the declared metadata. A method that carries the
/// fault-tolerance marker group without a retry marker deliberately switches off any retry
/// policy it would otherwise inherit.
///
/// # Examples
///
/// ```
/// use stubborn::{MethodDeclaration, RetryDeclaration};
///
/// assert_eq!(MethodDeclaration::from_markers(false, None), MethodDeclaration::Plain);
/// assert_eq!(MethodDeclaration::from_markers(true, None), MethodDeclaration::Suppressed);
/// assert_eq!(
///     MethodDeclaration::from_markers(true, Some(RetryDeclaration::new())),
///     MethodDeclaration::Retry(RetryDeclaration::new())
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    any(feature = "serde", test),
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum MethodDeclaration {
    /// Defined without any fault-tolerance marker. Retry policies of enclosing types apply.
    #[default]
    Plain,

    /// Carries the fault-tolerance marker group but no retry marker. Retry is switched off.
    Suppressed,

    /// Carries a retry marker.
    Retry(RetryDeclaration),
}

impl MethodDeclaration {
    /// Builds the declaration from the raw markers found on a method.
    ///
    /// `fault_tolerance_group` tells whether any marker of the fault-tolerance group is present;
    /// `retry` holds the retry marker, if any. A retry marker is itself part of the group.
    #[must_use]
    pub fn from_markers(fault_tolerance_group: bool, retry: Option<RetryDeclaration>) -> Self {
        match (fault_tolerance_group, retry) {
            (_, Some(retry)) => Self::Retry(retry),
            (true, None) => Self::Suppressed,
            (false, None) => Self::Plain,
        }
    }
}
