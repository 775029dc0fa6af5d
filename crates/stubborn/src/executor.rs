// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Debug;
use std::ops::ControlFlow;
use std::sync::Arc;

use recoverable::{RecoveryInfo, RecoveryKind};
use tally::Counter;

use crate::constants::DEFAULT_STRATEGY_NAME;
use crate::{Attempt, Classify, EffectivePolicy, FailureKind, OnRetryArgs};

/// Runs operations under an [`EffectivePolicy`], re-invoking them after retriable failures.
///
/// Each call to [`execute`][Self::execute] is independent: the executor itself keeps no state
/// between calls, so one executor can serve any number of threads and policies.
///
/// The operation's `Err` values are classified through [`Classify`]. A failure is retried while
/// the policy [allows it][EffectivePolicy::recovery] and retries are left. Once retries are used
/// up, the failure of the last attempt is returned unchanged. Panics are never caught.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | name | `"retry"` |
/// | attempt counter | none |
/// | on retry callback | none |
/// | logs | enabled |
///
/// # Examples
///
/// ```
/// use std::io::{Error, ErrorKind};
///
/// use stubborn::{Catalog, MethodDeclaration, Resolver, RetryDeclaration, RetryExecutor, TypeDescriptor};
///
/// let catalog = Catalog::builder()
///     .add(
///         TypeDescriptor::new("Flaky")
///             .retry(RetryDeclaration::new().max_retries(2))
///             .method("fetch", MethodDeclaration::Plain),
///     )
///     .build()?;
/// let policy = Resolver::new(catalog).resolve("Flaky", "fetch")?;
///
/// let mut calls = 0;
/// let result = RetryExecutor::new("fetch").execute(&policy, || {
///     calls += 1;
///     if calls < 3 { Err(Error::new(ErrorKind::TimedOut, "slow")) } else { Ok(calls) }
/// });
///
/// assert_eq!(result.unwrap(), 3);
/// # Ok::<(), stubborn::ConfigurationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    name: Cow<'static, str>,
    attempts: Option<Counter>,
    on_retry: Option<OnRetry>,
    logs_enabled: bool,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_STRATEGY_NAME)
    }
}

impl RetryExecutor {
    /// Creates an executor whose telemetry is reported under `name`.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            attempts: None,
            on_retry: None,
            logs_enabled: true,
        }
    }

    /// Increments `counter` before every invocation of the operation.
    ///
    /// Use this to observe how many times an operation actually ran, e.g. with a counter shared
    /// through a [`tally::CounterRegistry`].
    #[must_use]
    pub fn count_attempts(mut self, counter: Counter) -> Self {
        self.attempts = Some(counter);
        self
    }

    /// Registers a callback invoked after a failed attempt, right before the operation is
    /// invoked again.
    ///
    /// The callback is not invoked for the final failure that is returned to the caller.
    #[must_use]
    pub fn on_retry(mut self, on_retry: impl Fn(&OnRetryArgs<'_>) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(OnRetry(Arc::new(on_retry)));
        self
    }

    /// Enables or disables the `stubborn.retry` log event.
    ///
    /// The event is only emitted when the `logs` feature is enabled.
    #[must_use]
    pub fn use_logs(mut self, enabled: bool) -> Self {
        self.logs_enabled = enabled;
        self
    }

    /// Returns the telemetry name of this executor.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the `stubborn.retry` log event is enabled.
    #[must_use]
    pub fn logs_enabled(&self) -> bool {
        self.logs_enabled
    }

    /// Invokes `operation` until it succeeds, fails with a non-retriable error, or `policy` runs
    /// out of retries.
    ///
    /// The operation runs at most [`policy.max_attempts()`][EffectivePolicy::max_attempts] times.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt, unchanged.
    #[cfg_attr(test, mutants::skip)] // mutating the loop causes infinite retries
    pub fn execute<T, E, F>(&self, policy: &EffectivePolicy, mut operation: F) -> Result<T, E>
    where
        E: Classify,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = Attempt::first(policy.max_attempts());

        loop {
            if let Some(counter) = &self.attempts {
                counter.increment();
            }

            match self.evaluate_attempt(policy, operation(), attempt) {
                ControlFlow::Continue(next) => attempt = next,
                ControlFlow::Break(outcome) => return outcome,
            }
        }
    }

    fn evaluate_attempt<T, E: Classify>(
        &self,
        policy: &EffectivePolicy,
        outcome: Result<T, E>,
        attempt: Attempt,
    ) -> ControlFlow<Result<T, E>, Attempt> {
        let error = match outcome {
            Ok(value) => return ControlFlow::Break(Ok(value)),
            Err(error) => error,
        };

        let kind = error.failure_kind();
        let recovery = policy.recovery(&kind);

        if !matches!(recovery.kind(), RecoveryKind::Retry) {
            return ControlFlow::Break(Err(error));
        }

        let Some(next) = attempt.increment(policy.max_attempts()) else {
            self.emit_telemetry(policy, &kind, attempt);
            return ControlFlow::Break(Err(error));
        };

        self.emit_telemetry(policy, &kind, attempt);
        self.invoke_on_retry(attempt, &kind, recovery);

        ControlFlow::Continue(next)
    }

    fn invoke_on_retry(&self, attempt: Attempt, kind: &FailureKind, recovery: RecoveryInfo) {
        if let Some(on_retry) = &self.on_retry {
            (on_retry.0)(&OnRetryArgs { attempt, kind, recovery });
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    fn emit_telemetry(&self, policy: &EffectivePolicy, kind: &FailureKind, attempt: Attempt) {
        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "stubborn.retry",
                tracing::Level::WARN,
                strategy.name = %self.name,
                policy.source = %policy.source(),
                failure.kind = %kind,
                resilience.attempt.index = attempt.index(),
                resilience.attempt.is_last = attempt.is_last(),
            );
        }
    }
}

#[derive(Clone)]
struct OnRetry(Arc<dyn Fn(&OnRetryArgs<'_>) + Send + Sync>);

impl Debug for OnRetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnRetry").finish()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::io::Error;
    use std::sync::Mutex;

    use testing_aids::LogCapture;
    use tracing_subscriber::util::SubscriberInitExt;

    use super::*;
    use crate::{Catalog, FailureKinds, MethodDeclaration, Resolver, RetryDeclaration, TypeDescriptor};

    static_assertions::assert_impl_all!(RetryExecutor: Send, Sync, Clone, Debug);

    #[derive(Debug, PartialEq)]
    struct Failure(&'static str);

    impl Classify for Failure {
        fn failure_kind(&self) -> FailureKind {
            FailureKind::new(self.0)
        }
    }

    fn policy(retry: RetryDeclaration) -> EffectivePolicy {
        let catalog = Catalog::builder()
            .add(TypeDescriptor::new("Target").retry(retry).method("run", MethodDeclaration::Plain))
            .build()
            .unwrap();

        Resolver::new(catalog).resolve("Target", "run").unwrap()
    }

    #[test]
    fn success_on_first_attempt() {
        let mut calls = 0;

        let result: Result<_, Failure> = RetryExecutor::default().execute(&policy(RetryDeclaration::new()), || {
            calls += 1;
            Ok("done")
        });

        assert_eq!(result, Ok("done"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn exhausts_retries_and_returns_last_error() {
        let mut calls = 0;

        let result: Result<(), _> = RetryExecutor::default().execute(&policy(RetryDeclaration::new().max_retries(2)), || {
            calls += 1;
            Err(Error::other(format!("failure {calls}")))
        });

        assert_eq!(calls, 3);
        assert_eq!(result.unwrap_err().to_string(), "failure 3");
    }

    #[test]
    fn stops_at_first_success() {
        let mut calls = 0;

        let result = RetryExecutor::default().execute(&policy(RetryDeclaration::new().max_retries(5)), || {
            calls += 1;
            if calls < 3 { Err(Failure("io")) } else { Ok(calls) }
        });

        assert_eq!(result, Ok(3));
    }

    #[test]
    fn abort_on_beats_retry_on() {
        let declaration = RetryDeclaration::new()
            .retry_on(FailureKinds::only(["io"]))
            .abort_on(FailureKinds::only(["io.fatal"]));
        let mut calls = 0;

        let result: Result<(), _> = RetryExecutor::default().execute(&policy(declaration), || {
            calls += 1;
            Err(Failure("io.fatal"))
        });

        assert_eq!(result, Err(Failure("io.fatal")));
        assert_eq!(calls, 1);
    }

    #[test]
    fn unmatched_kind_is_not_retried() {
        let mut calls = 0;

        let result: Result<(), _> =
            RetryExecutor::default().execute(&policy(RetryDeclaration::new().retry_on(FailureKinds::only(["io"]))), || {
                calls += 1;
                Err(Failure("parse"))
            });

        assert_eq!(result, Err(Failure("parse")));
        assert_eq!(calls, 1);
    }

    #[test]
    fn no_retry_policy_invokes_once() {
        let mut calls = 0;

        let result: Result<(), _> = RetryExecutor::default().execute(&EffectivePolicy::no_retry(), || {
            calls += 1;
            Err(Failure("io"))
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn counts_every_attempt() {
        let registry = tally::CounterRegistry::new();
        let counter = registry.get("attempts").unwrap();
        let executor = RetryExecutor::new("counted").count_attempts(counter.clone());

        let _result: Result<(), _> = executor.execute(&policy(RetryDeclaration::new().max_retries(3)), || Err(Failure("io")));

        assert_eq!(counter.get(), 4);
        assert_eq!(executor.name(), "counted");
    }

    #[test]
    fn on_retry_sees_each_retried_attempt() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let executor = RetryExecutor::default().on_retry(move |args| {
            assert_eq!(args.recovery().kind(), RecoveryKind::Retry);
            seen_clone
                .lock()
                .unwrap()
                .push((args.attempt().index(), args.attempt().is_last(), args.kind().to_string()));
        });

        let _result: Result<(), _> = executor.execute(&policy(RetryDeclaration::new().max_retries(2)), || Err(Failure("io.reset")));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(0, false, "io.reset".to_owned()), (1, false, "io.reset".to_owned())]
        );
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn panics_are_not_caught() {
        let _result: Result<(), Failure> = RetryExecutor::default().execute(&policy(RetryDeclaration::new()), || panic!("boom"));
    }

    #[test]
    fn retry_emits_log() {
        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let _result: Result<(), _> =
            RetryExecutor::new("logged").execute(&policy(RetryDeclaration::new().max_retries(1)), || Err(Failure("io")));

        log_capture.assert_contains("stubborn::executor");
        log_capture.assert_contains("WARN");
        log_capture.assert_contains("strategy.name=logged");
        log_capture.assert_contains("failure.kind=io");
        log_capture.assert_contains("resilience.attempt.is_last=true");
    }

    #[test]
    fn call_sites_without_retry_emit_no_log() {
        let catalog = Catalog::builder()
            .add(
                TypeDescriptor::new("Base")
                    .retry(RetryDeclaration::new().max_retries(3))
                    .method("run", MethodDeclaration::Plain),
            )
            .add(TypeDescriptor::new("Quiet").extends("Base").method("run", MethodDeclaration::Suppressed))
            .build()
            .unwrap();
        let suppressed = Resolver::new(catalog).resolve("Quiet", "run").unwrap();
        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();
        let mut calls = 0;

        for policy in [suppressed, EffectivePolicy::no_retry(), policy(RetryDeclaration::new().max_retries(0))] {
            let _result: Result<(), _> = RetryExecutor::new("silent").execute(&policy, || {
                calls += 1;
                Err(Failure("io"))
            });
        }

        assert_eq!(calls, 3);
        log_capture.assert_not_contains("stubborn::executor");
        log_capture.assert_not_contains("strategy.name=silent");
    }

    #[test]
    fn logs_can_be_disabled() {
        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let _result: Result<(), _> = RetryExecutor::new("quiet")
            .use_logs(false)
            .execute(&policy(RetryDeclaration::new().max_retries(1)), || Err(Failure("io")));

        log_capture.assert_not_contains("strategy.name=quiet");
        assert!(RetryExecutor::default().logs_enabled());
    }
}
