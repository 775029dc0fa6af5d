// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;

use crate::{Counter, InvalidKeyError};

static GLOBAL: LazyLock<CounterRegistry> = LazyLock::new(CounterRegistry::new);

/// Returns the process-wide counter registry.
///
/// Counters obtained from this registry are never removed and live until the process exits.
///
/// # Examples
///
/// ```
/// let first = tally::global().get("docs_global")?;
/// let second = tally::global().get("docs_global")?;
///
/// assert!(first.same_as(&second));
/// # Ok::<(), tally::InvalidKeyError>(())
/// ```
#[must_use]
pub fn global() -> &'static CounterRegistry {
    &GLOBAL
}

/// Hands out exactly one shared [`Counter`] per id.
///
/// The first request for an id creates a zero-valued counter and stores it; every later request
/// for that id returns a handle to the same counter. Entries are never evicted.
#[derive(Debug, Default)]
pub struct CounterRegistry {
    counters: Mutex<HashMap<String, Counter>>,
}

impl CounterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counter registered under `id`, creating it on first request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidKeyError`] if `id` is empty or consists only of whitespace.
    pub fn get(&self, id: &str) -> Result<Counter, InvalidKeyError> {
        InvalidKeyError::check(id)?;

        let mut counters = self.counters.lock();

        if let Some(counter) = counters.get(id) {
            return Ok(counter.clone());
        }

        let counter = Counter::new();
        counters.insert(id.to_owned(), counter.clone());

        #[cfg(any(feature = "logs", test))]
        tracing::event!(name: "tally.counter.created", tracing::Level::DEBUG, counter.id = id);

        Ok(counter)
    }

    /// Returns the number of counters created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    /// Returns `true` if no counter has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.lock().is_empty()
    }
}
