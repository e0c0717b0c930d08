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

//! Lock factory: configuration, validation and handle creation.

use crate::error::{LockerError, LockerResult};
use crate::gateway::Gateway;
use crate::lock::{Lock, RetryPolicy};
use crate::token::{OsRandom, RandomSource};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default number of random bytes per token.
pub const DEFAULT_TOKEN_SIZE: usize = 16;

/// Maximum byte length of an effective key (prefix + key): 512 MB.
pub const MAX_KEY_SIZE: usize = 512_000_000;

const MILLISECOND: Duration = Duration::from_millis(1);

/// Configuration for a [`Locker`].
///
/// A value object validated once at [`Locker::new`]. Durations below one
/// millisecond are rejected because the backend wire protocol carries TTLs
/// and delays in whole milliseconds.
///
/// ## Options
/// | Option | Effect | Default |
/// |---|---|---|
/// | `ttl` | Lifetime installed on each successful set | required |
/// | `retry_count` | Maximum extra attempts after the first | 0 |
/// | `retry_delay` | Base sleep between attempts | 0 (no sleep) |
/// | `retry_jitter` | Symmetric random perturbation of the delay | 0 |
/// | `prefix` | Prepended to every key | "" |
/// | `token_size` | Random bytes drawn per token | 16 |
#[derive(Debug, Clone)]
pub struct LockerConfig {
    ttl: Duration,
    retry_count: u32,
    retry_delay: Duration,
    retry_jitter: Duration,
    prefix: String,
    token_size: usize,
}

impl LockerConfig {
    /// Create a configuration with the given TTL and defaults for
    /// everything else.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            retry_count: 0,
            retry_delay: Duration::ZERO,
            retry_jitter: Duration::ZERO,
            prefix: String::new(),
            token_size: DEFAULT_TOKEN_SIZE,
        }
    }

    /// Maximum number of extra acquire attempts after the first.
    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    /// Base sleep between acquire attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Symmetric random perturbation of the retry delay.
    pub fn with_retry_jitter(mut self, jitter: Duration) -> Self {
        self.retry_jitter = jitter;
        self
    }

    /// Prefix prepended to every key.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Number of random bytes drawn per token.
    pub fn with_token_size(mut self, size: usize) -> Self {
        self.token_size = size;
        self
    }

    fn validate(&self) -> LockerResult<()> {
        if self.ttl < MILLISECOND {
            return Err(LockerError::InvalidTtl);
        }
        // a set retry delay must be at least 1ms and cover the jitter; a
        // jitter larger than an unset (zero) delay is the jitter's fault
        if !self.retry_delay.is_zero()
            && (self.retry_delay < MILLISECOND || self.retry_delay < self.retry_jitter)
        {
            return Err(LockerError::InvalidRetryDelay);
        }
        if !self.retry_jitter.is_zero()
            && (self.retry_jitter < MILLISECOND || self.retry_jitter > self.retry_delay)
        {
            return Err(LockerError::InvalidRetryJitter);
        }
        if self.token_size == 0 {
            return Err(LockerError::InvalidTokenSize);
        }
        Ok(())
    }
}

/// Factory for [`Lock`] handles.
///
/// Holds the gateway, a validated configuration and a shared random
/// source. Safe to share across tasks; a single `Locker` is typically
/// created at process start-up.
///
/// ## Example
/// ```rust
/// use plexspaces_locker::{Locker, LockerConfig, MemoryGateway};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = Arc::new(MemoryGateway::new(Duration::from_millis(100)));
/// let locker = Locker::new(
///     gateway,
///     LockerConfig::new(Duration::from_secs(1))
///         .with_retry_count(2)
///         .with_retry_delay(Duration::from_millis(20))
///         .with_retry_jitter(Duration::from_millis(10))
///         .with_prefix("locks:"),
/// )?;
///
/// let lock = locker.new_lock("resource")?;
/// let status = lock.acquire().await?;
/// if status.is_acquired() {
///     // critical section
///     lock.release().await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Locker {
    gateway: Arc<dyn Gateway>,
    config: LockerConfig,
    random: Arc<dyn RandomSource>,
}

impl Locker {
    /// Create a factory over `gateway` with a validated configuration.
    ///
    /// ## Errors
    /// Configuration errors only; never fails at runtime afterwards.
    pub fn new(gateway: Arc<dyn Gateway>, config: LockerConfig) -> LockerResult<Self> {
        config.validate()?;
        Ok(Self {
            gateway,
            config,
            random: Arc::new(OsRandom),
        })
    }

    /// Replace the random source used for token generation.
    ///
    /// The default is operating-system entropy; inject a deterministic
    /// source for tests.
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Allocate a lock handle for `key`.
    ///
    /// ## Errors
    /// [`LockerError::InvalidKey`] if prefix + key exceeds 512 MB.
    pub fn new_lock(&self, key: &str) -> LockerResult<Lock> {
        self.new_lock_with_cancel(key, CancellationToken::new())
    }

    /// Allocate a lock handle whose retry sleeps wake when `cancel` fires.
    pub fn new_lock_with_cancel(&self, key: &str, cancel: CancellationToken) -> LockerResult<Lock> {
        if self.config.prefix.len() + key.len() > MAX_KEY_SIZE {
            return Err(LockerError::InvalidKey);
        }
        let effective_key = format!("{}{}", self.config.prefix, key);
        Ok(Lock::new(
            Arc::clone(&self.gateway),
            effective_key,
            self.config.ttl,
            RetryPolicy {
                count: self.config.retry_count,
                delay: self.config.retry_delay,
                jitter: self.config.retry_jitter,
            },
            self.config.token_size,
            Arc::clone(&self.random),
            cancel,
        ))
    }

    /// One-shot acquire: allocate a handle and run a full acquire pass.
    ///
    /// ## Returns
    /// - `Ok(lock)`: the lock is held; release through the returned handle
    /// - `Err(LockerError::Contended { ttl })`: another client holds the
    ///   key; `ttl` is the remaining lifetime observed on the last attempt
    /// - `Err(...)`: key validation or backend failure
    pub async fn try_acquire(&self, key: &str) -> LockerResult<Lock> {
        self.try_acquire_with_cancel(key, CancellationToken::new())
            .await
    }

    /// One-shot acquire whose retry sleeps wake when `cancel` fires.
    ///
    /// A cancelled pass reports the lock as contended, carrying the last
    /// observed TTL.
    pub async fn try_acquire_with_cancel(
        &self,
        key: &str,
        cancel: CancellationToken,
    ) -> LockerResult<Lock> {
        let lock = self.new_lock_with_cancel(key, cancel)?;
        let status = lock.acquire().await?;
        if status.is_acquired() {
            Ok(lock)
        } else {
            Err(LockerError::Contended { ttl: status.ttl() })
        }
    }
}
