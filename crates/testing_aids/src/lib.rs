// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! An unpublished crate containing testing utilities for use within this repo.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

mod log;

pub use log::*;

/// If something does not happen in a test within this time, the test will fail.
///
/// This only exists to break out of deadlocks and runaway retry loops, not for any situation that
/// is actually expected to take long.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs `f` on a background thread and gives up on it if it does not finish within
/// [`TEST_TIMEOUT`].
///
/// Returns `None` if `f` timed out or panicked. A timed out thread is abandoned, not stopped.
#[must_use]
pub fn execute_or_abandon<F, R>(f: F) -> Option<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (sender, receiver) = mpsc::channel();

    // A panic drops the sender without sending, which closes the channel.
    thread::spawn(move || {
        let _ignored = sender.send(f());
    });

    receiver.recv_timeout(TEST_TIMEOUT).ok()
}

/// Runs `f` concurrently on `threads` threads that are released at the same moment.
///
/// Each invocation receives the index of its thread. Results are returned in thread index order.
///
/// # Panics
///
/// Panics if any invocation panics.
pub fn run_concurrently<F, R>(threads: usize, f: F) -> Vec<R>
where
    F: Fn(usize) -> R + Sync,
    R: Send,
{
    let barrier = std::sync::Barrier::new(threads);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|index| {
                let barrier = &barrier;
                let f = &f;
                scope.spawn(move || {
                    barrier.wait();
                    f(index)
                })
            })
            .collect();

        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    })
}
