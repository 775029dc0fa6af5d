// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Shared counters handed out by name.
//!
//! A [`CounterRegistry`] maps a string id to a [`Counter`]. Every caller that asks for the same id
//! receives a handle to the same underlying counter, so unrelated pieces of code can observe each
//! other's increments without being wired together directly.
//!
//! Counters are created lazily on first request and live as long as the registry that owns them.
//! The registry returned by [`global`] lives for the whole process.
//!
//! # Examples
//!
//! ```
//! use tally::CounterRegistry;
//!
//! let registry = CounterRegistry::new();
//!
//! let calls = registry.get("service_calls")?;
//! let same_calls = registry.get("service_calls")?;
//!
//! calls.increment();
//! same_calls.increment();
//!
//! assert_eq!(calls.get(), 2);
//! assert!(calls.same_as(&same_calls));
//! # Ok::<(), tally::InvalidKeyError>(())
//! ```
//!
//! An empty id is a programming error and is rejected:
//!
//! ```
//! use tally::{CounterRegistry, InvalidKeyError};
//!
//! let registry = CounterRegistry::new();
//! assert_eq!(registry.get("").unwrap_err(), InvalidKeyError::Empty);
//! ```
//!
//! # Thread Safety
//!
//! [`CounterRegistry`] and [`Counter`] are `Send` and `Sync`. Concurrent first requests for the
//! same id never create two counters. Increments are lock-free.
//!
//! # Features
//!
//! - `logs`: Emits a `DEBUG` event through [`tracing`](https://docs.rs/tracing) whenever a
//!   counter is created.

mod counter;
mod error;
mod registry;

pub use counter::Counter;
pub use error::InvalidKeyError;
pub use registry::{CounterRegistry, global};
