// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of PlexSpaces.
//
// PlexSpaces is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// PlexSpaces is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with PlexSpaces. If not, see <https://www.gnu.org/licenses/>.

//! Lock engine: acquire, extend and release against a [`Gateway`].
//!
//! A [`Lock`] handle owns one `(key, token, ttl)` triple. Operations on a
//! handle serialize on its token slot, so concurrent use of one handle is
//! permitted but runs one operation at a time. The handle reuses its token
//! across acquires until a release, exhaustion or cancellation clears it,
//! which lets self-refresh flow through the same `acquire` entry point.

use crate::delay;
use crate::error::LockerResult;
use crate::gateway::{Gateway, SetOutcome};
use crate::token::{generate_token, RandomSource};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Result of an acquire or extend attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStatus {
    acquired: bool,
    ttl: Duration,
}

impl LockStatus {
    fn acquired(ttl: Duration) -> Self {
        Self { acquired: true, ttl }
    }

    fn contended(ttl: Duration) -> Self {
        Self {
            acquired: false,
            ttl,
        }
    }

    /// Whether the lock is held by this handle after the operation.
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// On success, the TTL installed on the entry; on contention, the
    /// remaining lifetime of the conflicting entry observed by the backend.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Retry policy snapshot held by a lock handle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub(crate) count: u32,
    pub(crate) delay: Duration,
    pub(crate) jitter: Duration,
}

/// Outcome of one pass through the sleep step of the retry loop.
enum Wait {
    Elapsed,
    Cancelled,
}

/// Distributed lock handle.
///
/// Created by a [`crate::Locker`]; drives the locking protocol for a single
/// effective key. See the crate documentation for the full protocol.
pub struct Lock {
    gateway: Arc<dyn Gateway>,
    key: String,
    token: Mutex<Option<String>>,
    ttl: Duration,
    retry: RetryPolicy,
    token_size: usize,
    random: Arc<dyn RandomSource>,
    cancel: CancellationToken,
}

impl Lock {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        gateway: Arc<dyn Gateway>,
        key: String,
        ttl: Duration,
        retry: RetryPolicy,
        token_size: usize,
        random: Arc<dyn RandomSource>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            key,
            token: Mutex::new(None),
            ttl,
            retry,
            token_size,
            random,
            cancel,
        }
    }

    /// Effective key this handle locks, including any factory prefix.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// TTL installed on each successful acquire or extend.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Apply the lock.
    ///
    /// Performs at most `retry_count + 1` gateway calls, sleeping a
    /// jittered delay between attempts. Backend errors propagate
    /// immediately and are never retried; only contention is. Cancellation
    /// is observed at sleep boundaries: a signal fired mid-sleep wakes the
    /// loop and returns the last observed contention TTL without error, a
    /// signal fired before the call still permits the first attempt.
    ///
    /// ## Returns
    /// - `Ok(status)` with `status.is_acquired()` true: lock held, TTL
    ///   installed
    /// - `Ok(status)` with `status.is_acquired()` false: contention after
    ///   exhausting the retry budget or being cancelled; the token is
    ///   cleared
    /// - `Err(...)`: backend, protocol or random-source failure
    pub async fn acquire(&self) -> LockerResult<LockStatus> {
        let mut slot = self.token.lock().await;
        let token = match slot.as_ref() {
            Some(token) => token.clone(),
            None => generate_token(self.random.as_ref(), self.token_size)?,
        };
        self.acquire_with_retries(&mut slot, token, self.retry.count)
            .await
    }

    /// Refresh the TTL of a held lock.
    ///
    /// Single attempt with the current token; equivalent to `acquire` with
    /// a zero retry budget. A contention outcome means the entry expired
    /// and was re-taken by another client; the token is cleared and the
    /// lock must be re-acquired.
    pub async fn extend(&self) -> LockerResult<LockStatus> {
        let mut slot = self.token.lock().await;
        let token = match slot.as_ref() {
            Some(token) => token.clone(),
            None => generate_token(self.random.as_ref(), self.token_size)?,
        };
        self.acquire_with_retries(&mut slot, token, 0).await
    }

    /// Release the lock.
    ///
    /// The local token is cleared before the backend call so a retry of
    /// `release` can never delete an entry installed by a later acquire
    /// through the same handle; the backend enforces the token comparison
    /// regardless.
    ///
    /// ## Returns
    /// - `Ok(true)`: entry removed
    /// - `Ok(false)`: no token held, or the entry expired or belongs to
    ///   another client
    pub async fn release(&self) -> LockerResult<bool> {
        let mut slot = self.token.lock().await;
        let Some(token) = slot.take() else {
            return Ok(false);
        };
        let removed = self.gateway.del(&self.key, &token).await?;
        tracing::debug!(key = %self.key, removed, "lock released");
        Ok(removed)
    }

    /// The attempt loop of the locking protocol.
    ///
    /// The token slot is written only on a definitive outcome: stored on
    /// success, cleared on exhaustion or cancellation, left untouched when
    /// the gateway errors so a held lock survives a transient failure.
    async fn acquire_with_retries(
        &self,
        slot: &mut Option<String>,
        token: String,
        mut remaining: u32,
    ) -> LockerResult<LockStatus> {
        loop {
            let outcome = self.gateway.set(&self.key, &token, self.ttl).await?;
            match outcome {
                SetOutcome::Acquired => {
                    *slot = Some(token);
                    tracing::debug!(key = %self.key, ttl = ?self.ttl, "lock acquired");
                    return Ok(LockStatus::acquired(self.ttl));
                }
                SetOutcome::Held(observed) => {
                    if remaining == 0 {
                        *slot = None;
                        tracing::debug!(key = %self.key, ?observed, "lock contended, attempts exhausted");
                        return Ok(LockStatus::contended(observed));
                    }
                    remaining -= 1;

                    let pause = delay::next_delay(self.retry.delay, self.retry.jitter);
                    if let Wait::Cancelled = self.wait_retry(pause).await {
                        *slot = None;
                        tracing::debug!(key = %self.key, "lock attempt cancelled");
                        return Ok(LockStatus::contended(observed));
                    }
                }
            }
        }
    }

    /// Sleep between attempts, waking early if the cancellation signal
    /// fires.
    async fn wait_retry(&self, pause: Duration) -> Wait {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Wait::Cancelled,
            _ = tokio::time::sleep(pause) => Wait::Elapsed,
        }
    }

    #[cfg(test)]
    pub(crate) async fn held_token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
