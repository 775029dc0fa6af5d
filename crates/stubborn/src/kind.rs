// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt::Display;

/// The classification of a failure, used to decide whether it may be retried.
///
/// Kinds are dot-separated paths such as `io` or `io.timeout`. A kind is *within* another kind
/// if it is equal to it or nested below it, so a filter naming `io` also covers `io.timeout`.
///
/// # Examples
///
/// ```
/// use stubborn::FailureKind;
///
/// let timeout = FailureKind::new("io.timeout");
///
/// assert!(timeout.is_within(&FailureKind::IO));
/// assert!(!FailureKind::IO.is_within(&timeout));
/// assert!(!FailureKind::new("ioctl").is_within(&FailureKind::IO));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct FailureKind(Cow<'static, str>);

impl FailureKind {
    /// Input/output failures, the natural failure mode of operations that talk to the outside world.
    pub const IO: Self = Self::from_static("io");

    /// Creates a failure kind from a static name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a failure kind from a name.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Returns the name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this kind equals `other` or is nested below it.
    #[must_use]
    pub fn is_within(&self, other: &Self) -> bool {
        match self.0.strip_prefix(other.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

impl From<&'static str> for FailureKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for FailureKind {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A filter over failure kinds.
///
/// The default filter matches every kind.
///
/// # Examples
///
/// ```
/// use stubborn::{FailureKind, FailureKinds};
///
/// assert!(FailureKinds::All.matches(&FailureKind::IO));
/// assert!(FailureKinds::only(["io"]).matches(&FailureKind::new("io.reset")));
/// assert!(!FailureKinds::none().matches(&FailureKind::IO));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    any(feature = "serde", test),
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum FailureKinds {
    /// Matches every failure kind.
    #[default]
    All,

    /// Matches the listed kinds and the kinds nested below them.
    Only(BTreeSet<FailureKind>),
}

impl FailureKinds {
    /// A filter that matches nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::Only(BTreeSet::new())
    }

    /// A filter that matches the given kinds and the kinds nested below them.
    #[must_use]
    pub fn only<K: Into<FailureKind>>(kinds: impl IntoIterator<Item = K>) -> Self {
        Self::Only(kinds.into_iter().map(Into::into).collect())
    }

    /// Returns `true` if `kind` passes this filter.
    #[must_use]
    pub fn matches(&self, kind: &FailureKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(kinds) => kinds.iter().any(|candidate| kind.is_within(candidate)),
        }
    }
}

/// Classifies a failure so that a retry policy can decide whether to retry it.
///
/// Implement this for the error type returned by operations executed under a retry policy.
///
/// # Examples
///
/// ```
/// use stubborn::{Classify, FailureKind};
///
/// #[derive(Debug)]
/// enum LookupError {
///     Timeout,
///     NotFound,
/// }
///
/// impl Classify for LookupError {
///     fn failure_kind(&self) -> FailureKind {
///         match self {
///             Self::Timeout => FailureKind::from_static("lookup.timeout"),
///             Self::NotFound => FailureKind::from_static("lookup.not_found"),
///         }
///     }
/// }
///
/// assert_eq!(LookupError::Timeout.failure_kind().as_str(), "lookup.timeout");
/// ```
pub trait Classify {
    /// Returns the kind of this failure.
    fn failure_kind(&self) -> FailureKind;
}

impl Classify for std::io::Error {
    fn failure_kind(&self) -> FailureKind {
        FailureKind::IO
    }
}

impl<T: Classify + ?Sized> Classify for Box<T> {
    fn failure_kind(&self) -> FailureKind {
        (**self).failure_kind()
    }
}
