// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// A counter was requested with an id that cannot identify a counter.
///
/// This always indicates a programming or configuration mistake on the requesting side (the
/// caller could not determine which counter it wants) and should not be recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvalidKeyError {
    /// The id was an empty string.
    #[error("counter id must not be empty")]
    Empty,

    /// The id consisted only of whitespace.
    #[error("counter id must not be blank, got {0:?}")]
    Blank(String),
}

impl InvalidKeyError {
    pub(crate) fn check(id: &str) -> Result<(), Self> {
        if id.is_empty() {
            return Err(Self::Empty);
        }

        if id.trim().is_empty() {
            return Err(Self::Blank(id.to_owned()));
        }

        Ok(())
    }
}
