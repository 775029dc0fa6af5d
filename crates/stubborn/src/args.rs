// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use recoverable::RecoveryInfo;

use crate::{Attempt, FailureKind};

/// Arguments for the [`on_retry`][crate::RetryExecutor::on_retry] callback.
///
/// Describes the failed attempt that is about to be retried.
#[derive(Debug)]
pub struct OnRetryArgs<'a> {
    pub(crate) attempt: Attempt,
    pub(crate) kind: &'a FailureKind,
    pub(crate) recovery: RecoveryInfo,
}

impl OnRetryArgs<'_> {
    /// Returns the attempt that failed.
    #[must_use]
    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    /// Returns the kind of the failure that triggered the retry.
    #[must_use]
    pub fn kind(&self) -> &FailureKind {
        self.kind
    }

    /// Returns the classification that allowed the retry.
    #[must_use]
    pub fn recovery(&self) -> &RecoveryInfo {
        &self.recovery
    }
}
