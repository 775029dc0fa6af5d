// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// A shared, monotonically increasing counter.
///
/// Cloning a `Counter` produces another handle to the same value. Counters are usually obtained
/// from a [`CounterRegistry`][crate::CounterRegistry], which guarantees that every caller asking
/// for the same id observes the same counter.
///
/// The value saturates at [`u32::MAX`] instead of wrapping around.
///
/// # Examples
///
/// ```
/// use tally::CounterRegistry;
///
/// let registry = CounterRegistry::new();
/// let counter = registry.get("attempts")?;
///
/// assert_eq!(counter.increment(), 1);
/// assert_eq!(counter.increment(), 2);
/// assert_eq!(counter.get(), 2);
/// # Ok::<(), tally::InvalidKeyError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU32>,
}

impl Counter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Atomically increments the counter and returns the new value.
    pub fn increment(&self) -> u32 {
        let previous = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| Some(current.saturating_add(1)))
            // The closure never returns `None`, so the update cannot be rejected.
            .unwrap_or_else(|current| current);

        previous.saturating_add(1)
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    /// Returns `true` if both handles refer to the same counter.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.get().fmt(f)
    }
}
