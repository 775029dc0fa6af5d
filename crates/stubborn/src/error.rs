// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// A retry policy could not be resolved because its declarations are invalid or incomplete.
///
/// Configuration errors are raised before the wrapped operation is attempted even once. They point
/// at a mistake in the declared metadata, never at a transient condition, and retrying the call
/// cannot fix them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// The selected declaration asks for a negative number of retries.
    #[error("{declaration} declares a negative max retries count ({max_retries})")]
    NegativeMaxRetries {
        /// Where the offending declaration was found.
        declaration: String,
        /// The declared value.
        max_retries: i64,
    },

    /// The selected declaration asks for more retries than can be counted.
    #[error(
        "{declaration} declares max retries {max_retries}, more than the supported {limit}",
        limit = crate::constants::MAX_SUPPORTED_RETRIES
    )]
    MaxRetriesTooLarge {
        /// Where the offending declaration was found.
        declaration: String,
        /// The declared value.
        max_retries: i64,
    },

    /// No descriptor exists for the invoked type and method.
    #[error("no call site is known for {type_name}::{method}")]
    UnknownCallSite {
        /// The invoked type.
        type_name: String,
        /// The invoked method.
        method: String,
    },

    /// A configuration override could not be parsed.
    #[error("configuration override {key} has an invalid value {value:?}")]
    InvalidOverride {
        /// The override key.
        key: String,
        /// The raw value.
        value: String,
    },

    /// Two type descriptors share the same name.
    #[error("type {0} is described more than once")]
    DuplicateType(String),

    /// A type extends a type that was never described.
    #[error("type {type_name} extends unknown type {parent}")]
    UnknownParent {
        /// The extending type.
        type_name: String,
        /// The missing parent.
        parent: String,
    },

    /// Following the parents of a type leads back to the type itself.
    #[error("type hierarchy of {0} is cyclic")]
    CyclicHierarchy(String),
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(ConfigurationError: Send, Sync, std::error::Error);

    #[test]
    fn display() {
        let negative = ConfigurationError::NegativeMaxRetries {
            declaration: "retry declaration on type Base".to_owned(),
            max_retries: -2,
        };
        let too_large = ConfigurationError::MaxRetriesTooLarge {
            declaration: "retry declaration on type Base".to_owned(),
            max_retries: i64::MAX,
        };
        let unknown = ConfigurationError::UnknownCallSite {
            type_name: "Base".to_owned(),
            method: "service".to_owned(),
        };

        assert_eq!(
            negative.to_string(),
            "retry declaration on type Base declares a negative max retries count (-2)"
        );
        assert!(too_large.to_string().ends_with("more than the supported 4294967294"));
        assert_eq!(unknown.to_string(), "no call site is known for Base::service");
        assert_eq!(
            ConfigurationError::CyclicHierarchy("A".to_owned()).to_string(),
            "type hierarchy of A is cyclic"
        );
    }
}
