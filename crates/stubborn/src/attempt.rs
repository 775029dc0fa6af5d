// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;

/// One invocation of the target within a single guarded call.
///
/// Attempts are numbered from zero. The attempt made when no retries are left is the last one.
///
/// # Examples
///
/// ```
/// use stubborn::Attempt;
///
/// let attempt = Attempt::new(0, false);
/// assert!(attempt.is_first());
/// assert!(!attempt.is_last());
/// assert_eq!(attempt.to_string(), "0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    index: u32,
    is_last: bool,
}

impl Attempt {
    /// Creates an attempt with the given zero-based index.
    #[must_use]
    pub fn new(index: u32, is_last: bool) -> Self {
        Self { index, is_last }
    }

    pub(crate) fn first(max_attempts: u32) -> Self {
        Self::new(0, max_attempts <= 1)
    }

    /// Returns the following attempt, or `None` if `max_attempts` are used up.
    #[cfg_attr(test, mutants::skip)] // causes test timeouts
    pub(crate) fn increment(self, max_attempts: u32) -> Option<Self> {
        let next = self.index.saturating_add(1);

        if next >= max_attempts {
            return None;
        }

        Some(Self::new(next, next == max_attempts.saturating_sub(1)))
    }

    /// Returns `true` for the initial attempt.
    #[must_use]
    pub fn is_first(self) -> bool {
        self.index == 0
    }

    /// Returns `true` if no retry follows this attempt.
    #[must_use]
    pub fn is_last(self) -> bool {
        self.is_last
    }

    /// Returns the zero-based index of this attempt.
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }
}

impl Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.index.fmt(f)
    }
}
