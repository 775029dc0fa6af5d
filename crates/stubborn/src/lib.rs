// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Declarative retry policies for type hierarchies.
//!
//! Retry is declared, not coded: a type can carry a retry marker that covers all of its methods,
//! and a method can carry its own marker or switch inherited retry off. When a method is invoked,
//! the declaration that governs the call is chosen by a fixed resolution order and the call is
//! run under it.
//!
//! # Overview
//!
//! - [`TypeDescriptor`] and [`MethodDeclaration`] describe what each type declares. They can be
//!   built in code or, with the `serde` feature, deserialized into a [`CatalogConfig`].
//! - [`Catalog`] validates the hierarchy once and precomputes a [`CallSite`] for every method
//!   visible on every type.
//! - [`Resolver`] turns a call site into an [`EffectivePolicy`], optionally adjusted by
//!   deployment [`PolicyOverrides`].
//! - [`RetryExecutor`] runs an operation under an effective policy.
//! - [`Interceptor`] combines resolution and execution for a `(type, method)` pair.
//!
//! # Resolution Order
//!
//! For a method invoked on a type, exactly one declaration level applies:
//!
//! 1. a retry marker on the most specific definition of the method;
//! 2. otherwise, if that definition carries the fault-tolerance marker group without a retry
//!    marker ([`MethodDeclaration::Suppressed`]), no retry;
//! 3. otherwise, the retry marker of the nearest type, walking up from the invoked type;
//! 4. otherwise, no retry.
//!
//! Values from different levels are never merged. A method-level marker that only sets
//! `max_retries` uses defaults for everything else, regardless of what the type declares.
//!
//! # Examples
//!
//! ```
//! use std::io::{Error, ErrorKind};
//!
//! use stubborn::{Catalog, Interceptor, MethodDeclaration, Resolver, RetryDeclaration, RetryExecutor, TypeDescriptor};
//!
//! let catalog = Catalog::builder()
//!     .add(
//!         TypeDescriptor::new("BaseService")
//!             .retry(RetryDeclaration::new().max_retries(3))
//!             .method("service", MethodDeclaration::Plain),
//!     )
//!     .add(
//!         TypeDescriptor::new("CarefulService")
//!             .extends("BaseService")
//!             .method("service", MethodDeclaration::Suppressed),
//!     )
//!     .build()?;
//!
//! let registry = tally::CounterRegistry::new();
//! let calls = registry.get("calls")?;
//! let interceptor = Interceptor::new(Resolver::new(catalog), RetryExecutor::new("services").count_attempts(calls.clone()));
//!
//! let failing = || -> Result<(), Error> { Err(Error::new(ErrorKind::BrokenPipe, "down")) };
//!
//! assert!(interceptor.intercept("BaseService", "service")?.call(failing).is_err());
//! assert_eq!(calls.get(), 4);
//!
//! assert!(interceptor.intercept("CarefulService", "service")?.call(failing).is_err());
//! assert_eq!(calls.get(), 5);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Failure Classification
//!
//! Operation errors implement [`Classify`] to report a [`FailureKind`]. Declarations filter
//! kinds with `retry_on` and `abort_on`; `abort_on` always wins. The verdict for a failure is
//! expressed as a [`RecoveryInfo`]. Panics are not failures: they are never caught or retried.
//!
//! # Features
//!
//! - `serde`: Deserialization of [`CatalogConfig`], [`PolicyOverrides`] and the declaration types.
//! - `logs`: Emits `tracing` events when a call site is resolved (`DEBUG`) and when a failed
//!   attempt is retried or retries run out (`WARN`).

mod args;
mod attempt;
mod call_site;
mod catalog;
mod constants;
mod declaration;
mod error;
mod executor;
mod interceptor;
mod kind;
mod overrides;
mod resolve;

pub use args::OnRetryArgs;
pub use attempt::Attempt;
pub use call_site::{CallSite, Resolution};
pub use catalog::{Catalog, CatalogBuilder, CatalogConfig, TypeDescriptor};
pub use declaration::{MethodDeclaration, PolicyDeclaration, RetryDeclaration, Scope};
pub use error::ConfigurationError;
pub use executor::RetryExecutor;
pub use interceptor::{Guarded, Interceptor};
pub use kind::{Classify, FailureKind, FailureKinds};
pub use overrides::PolicyOverrides;
pub use recoverable::{RecoveryInfo, RecoveryKind};
pub use resolve::{EffectivePolicy, PolicySource, Resolver};
