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

//! Error types for distributed lock operations.

use std::time::Duration;
use thiserror::Error;

/// Result type for lock operations.
pub type LockerResult<T> = Result<T, LockerError>;

/// Errors that can occur while configuring or operating locks.
///
/// Configuration variants (`InvalidTtl`, `InvalidRetryDelay`,
/// `InvalidRetryJitter`, `InvalidTokenSize`, `InvalidKey`) are raised at
/// construction time only. `Contended` is produced by [`crate::Locker::try_acquire`]
/// when the lock is held by another client; the lock engine itself reports
/// contention as a value, not an error.
#[derive(Error, Debug)]
pub enum LockerError {
    /// TTL must be at least one millisecond
    #[error("invalid TTL: must be at least 1 millisecond")]
    InvalidTtl,

    /// Retry delay, when set, must be at least one millisecond and not
    /// less than the retry jitter
    #[error("invalid retry delay: must be at least 1 millisecond and at least the retry jitter")]
    InvalidRetryDelay,

    /// Retry jitter, when set, must be at least one millisecond and not
    /// greater than the retry delay
    #[error("invalid retry jitter: must be at least 1 millisecond and at most the retry delay")]
    InvalidRetryJitter,

    /// Token size must be at least one byte
    #[error("invalid token size: must be at least 1 byte")]
    InvalidTokenSize,

    /// Effective key (prefix + key) exceeds the backend key size limit
    #[error("invalid key: prefix + key must be at most 512 MB")]
    InvalidKey,

    /// Lock is held by another client; carries the remaining TTL observed
    /// at the time of the attempt
    #[error("lock is held by another client, retry after {ttl:?}")]
    Contended {
        /// Remaining lifetime of the conflicting entry
        ttl: Duration,
    },

    /// Backend returned a response outside the script protocol
    #[error("invalid backend response")]
    InvalidResponse,

    /// Key exists without a TTL, indicating the key namespace is shared
    /// with something that is not a lock
    #[error("key name clash: key exists without TTL")]
    KeyNameClash,

    /// Random source failed while generating a token
    #[error("random source failure: {0}")]
    RandomSource(#[from] rand::Error),

    /// Redis transport or command error
    #[cfg(feature = "redis-backend")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl LockerError {
    /// Remaining TTL of the conflicting lock, if this is a contention error.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Self::Contended { ttl } => Some(*ttl),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contended_exposes_ttl() {
        let err = LockerError::Contended {
            ttl: Duration::from_millis(42),
        };
        assert_eq!(err.ttl(), Some(Duration::from_millis(42)));
    }

    #[test]
    fn test_other_errors_have_no_ttl() {
        assert_eq!(LockerError::InvalidTtl.ttl(), None);
        assert_eq!(LockerError::KeyNameClash.ttl(), None);
    }
}
