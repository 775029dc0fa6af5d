// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(feature = "serde")]

//! Integration tests for loading declarations and overrides from configuration.

use stubborn::{Catalog, CatalogConfig, ConfigurationError, PolicyOverrides, PolicySource, Resolver};

const CATALOG: &str = r#"{
    "types": [
        {
            "name": "BaseRetryOnClassService",
            "retry": { "max_retries": 3 },
            "methods": { "service": "plain" }
        },
        {
            "name": "RetryOnMethodOverrideService",
            "extends": "BaseRetryOnClassService",
            "methods": { "service": { "retry": { "max_retries": 4, "retry_on": { "only": ["io"] } } } }
        },
        {
            "name": "NoAnnotationOnOverriddenMethodService",
            "extends": "BaseRetryOnClassService",
            "methods": { "service": "suppressed" }
        }
    ]
}"#;

fn resolver(overrides: &str) -> Resolver {
    let config: CatalogConfig = serde_json::from_str(CATALOG).unwrap();
    let overrides: PolicyOverrides = serde_json::from_str(overrides).unwrap();

    Resolver::new(Catalog::from_config(config).unwrap()).overrides(overrides)
}

#[test]
fn declarations_load_from_json() {
    let resolver = resolver("{}");

    assert_eq!(resolver.resolve("BaseRetryOnClassService", "service").unwrap().max_retries(), 3);
    assert_eq!(resolver.resolve("RetryOnMethodOverrideService", "service").unwrap().max_retries(), 4);
    assert_eq!(
        resolver.resolve("NoAnnotationOnOverriddenMethodService", "service").unwrap().source(),
        &PolicySource::Suppressed
    );
}

#[test]
fn overrides_load_from_json() {
    let resolver = resolver(r#"{ "BaseRetryOnClassService/Retry/maxRetries": "1", "Retry/maxRetries": "7" }"#);

    assert_eq!(resolver.resolve("BaseRetryOnClassService", "service").unwrap().max_retries(), 1);
    assert_eq!(resolver.resolve("RetryOnMethodOverrideService", "service").unwrap().max_retries(), 7);
}

#[test]
fn unknown_parent_in_config() {
    let config: CatalogConfig = serde_json::from_str(r#"{ "types": [ { "name": "Orphan", "extends": "Missing" } ] }"#).unwrap();

    assert_eq!(
        Catalog::from_config(config).unwrap_err(),
        ConfigurationError::UnknownParent {
            type_name: "Orphan".to_owned(),
            parent: "Missing".to_owned(),
        }
    );
}
