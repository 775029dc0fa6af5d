// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Default number of retries for a retry declaration that does not set one (four attempts in total).
pub(crate) const DEFAULT_MAX_RETRIES: i64 = 3;

/// Strategy name used for telemetry when the executor is not given one.
pub(crate) const DEFAULT_STRATEGY_NAME: &str = "retry";

/// Override key suffix that replaces the max retries of a declaration.
pub(crate) const MAX_RETRIES_KEY: &str = "Retry/maxRetries";

/// Override key that switches retry off for every call site when set to `false`.
pub(crate) const ENABLED_KEY: &str = "Retry/enabled";

/// Largest supported max retries, so that the attempt count still fits in `u32`.
pub(crate) const MAX_SUPPORTED_RETRIES: u32 = u32::MAX - 1;
