// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use crate::constants::{ENABLED_KEY, MAX_RETRIES_KEY};
use crate::{ConfigurationError, PolicyDeclaration, Scope};

/// Deployment configuration that adjusts declared retry policies without touching the declarations.
///
/// Overrides are plain string key/value pairs, so they can come from any configuration source.
/// The recognized keys are:
///
/// | Key | Effect |
/// |-----|--------|
/// | `<Type>/<method>/Retry/maxRetries` | Replaces the max retries of the retry marker on that method. |
/// | `<Type>/Retry/maxRetries` | Replaces the max retries of the retry marker on that type. |
/// | `Retry/maxRetries` | Replaces the max retries of any retry marker without a more specific override. |
/// | `Retry/enabled` | `false` switches retry off for every call site. |
///
/// Overrides adjust the one declaration that resolution selected. They never change which
/// declaration is selected, and an override for a declaration that is not selected has no effect.
///
/// # Examples
///
/// ```
/// use stubborn::PolicyOverrides;
///
/// let overrides = PolicyOverrides::new()
///     .set("BaseService/Retry/maxRetries", "5")
///     .set("Retry/enabled", "true");
///
/// assert_eq!(overrides.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct PolicyOverrides {
    values: BTreeMap<String, String>,
}

impl PolicyOverrides {
    /// Creates an empty set of overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an override, replacing any previous value for `key`.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds an override in place, replacing any previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the number of overrides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no overrides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn retry_disabled(&self) -> Result<bool, ConfigurationError> {
        let Some(value) = self.values.get(ENABLED_KEY) else {
            return Ok(false);
        };

        match value.trim() {
            v if v.eq_ignore_ascii_case("true") => Ok(false),
            v if v.eq_ignore_ascii_case("false") => Ok(true),
            _ => Err(invalid(ENABLED_KEY, value)),
        }
    }

    pub(crate) fn max_retries_for(&self, declaration: &PolicyDeclaration) -> Result<Option<i64>, ConfigurationError> {
        let specific = match (declaration.scope(), declaration.method()) {
            (Scope::Method, Some(method)) => format!("{}/{method}/{MAX_RETRIES_KEY}", declaration.type_name()),
            _ => format!("{}/{MAX_RETRIES_KEY}", declaration.type_name()),
        };

        let Some((key, value)) = self
            .values
            .get_key_value(&specific)
            .or_else(|| self.values.get_key_value(MAX_RETRIES_KEY))
        else {
            return Ok(None);
        };

        value.trim().parse::<i64>().map(Some).map_err(|_parse_error| invalid(key, value))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PolicyOverrides {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect(),
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigurationError {
    ConfigurationError::InvalidOverride {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryDeclaration;

    fn on_type() -> PolicyDeclaration {
        PolicyDeclaration::on_type("Base".into(), RetryDeclaration::new())
    }

    fn on_method() -> PolicyDeclaration {
        PolicyDeclaration::on_method("Sub".into(), "service".into(), RetryDeclaration::new())
    }

    #[test]
    fn empty_overrides_change_nothing() {
        let overrides = PolicyOverrides::new();

        assert!(overrides.is_empty());
        assert_eq!(overrides.retry_disabled(), Ok(false));
        assert_eq!(overrides.max_retries_for(&on_type()), Ok(None));
        assert_eq!(overrides.max_retries_for(&on_method()), Ok(None));
    }

    #[test]
    fn type_key_applies_to_type_declaration_only() {
        let overrides = PolicyOverrides::new().set("Base/Retry/maxRetries", "7");

        assert_eq!(overrides.max_retries_for(&on_type()), Ok(Some(7)));
        assert_eq!(overrides.max_retries_for(&on_method()), Ok(None));
    }

    #[test]
    fn method_key_applies_to_method_declaration_only() {
        let overrides = PolicyOverrides::new().set("Sub/service/Retry/maxRetries", "2");

        assert_eq!(overrides.max_retries_for(&on_method()), Ok(Some(2)));
        assert_eq!(overrides.max_retries_for(&on_type()), Ok(None));
    }

    #[test]
    fn specific_key_beats_global_key() {
        let overrides = PolicyOverrides::new()
            .set("Retry/maxRetries", "1")
            .set("Sub/service/Retry/maxRetries", "6");

        assert_eq!(overrides.max_retries_for(&on_method()), Ok(Some(6)));
        assert_eq!(overrides.max_retries_for(&on_type()), Ok(Some(1)));
    }

    #[test]
    fn invalid_number_rejected() {
        let overrides = PolicyOverrides::new().set("Base/Retry/maxRetries", "many");

        assert_eq!(
            overrides.max_retries_for(&on_type()),
            Err(ConfigurationError::InvalidOverride {
                key: "Base/Retry/maxRetries".to_owned(),
                value: "many".to_owned(),
            })
        );
    }

    #[test]
    fn enabled_flag() {
        assert_eq!(PolicyOverrides::new().set("Retry/enabled", "FALSE").retry_disabled(), Ok(true));
        assert_eq!(PolicyOverrides::new().set("Retry/enabled", " true ").retry_disabled(), Ok(false));
        assert!(PolicyOverrides::new().set("Retry/enabled", "nope").retry_disabled().is_err());
    }

    #[test]
    fn collect_and_deserialize() {
        let collected: PolicyOverrides = [("Retry/maxRetries", "2")].into_iter().collect();
        let parsed: PolicyOverrides = serde_json::from_str(r#"{"Retry/maxRetries":"2"}"#).unwrap();

        assert_eq!(collected, parsed);
        assert_eq!(parsed.len(), 1);
    }
}
