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

//! # PlexSpaces Distributed Locker
//!
//! ## Purpose
//! Grants a caller the exclusive right to hold a named lock across
//! processes for a bounded time-to-live, with contention retries, lock
//! extension and token-fenced release over pluggable TTL key-value
//! backends.
//!
//! ## Locking protocol
//! Every lock is one backend entry `key -> (token, ttl)`. Acquire installs
//! the caller's random token when the slot is free or expired, refreshes
//! the TTL when the slot already stores the caller's token, and otherwise
//! reports the remaining lifetime of the conflicting entry. Release deletes
//! the entry only when the stored value equals the caller's token, so a
//! handle whose entry expired and was re-taken can never delete another
//! client's lock. On contention, acquire sleeps a jittered delay and
//! retries up to a configured budget, waking early when an optional
//! cancellation signal fires.
//!
//! ## Design Decisions
//! - **Token fencing**: release and refresh are conditional on the stored
//!   value, enforced inside the backend's atomic compare
//! - **Contention is a value, not an error**: the engine reports the
//!   observed TTL; only the one-shot [`Locker::try_acquire`] lifts it into
//!   [`LockerError::Contended`]
//! - **Token reuse until cleared**: a handle keeps its token across
//!   acquires, so self-refresh flows through the same entry point
//! - **Backend-agnostic**: the [`Gateway`] trait is the only coupling
//!   between engine and storage
//!
//! ## Backend Support
//! - **InMemory**: HashMap with a background expiry sweeper (always
//!   available, for testing and single-process use)
//! - **Redis**: server-side atomic Lua scripts, native PX/PEXPIRE TTLs
//!   (feature: `redis-backend`)
//!
//! ## Examples
//!
//! ### Basic Usage
//! ```rust
//! use plexspaces_locker::{Locker, LockerConfig, MemoryGateway};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(MemoryGateway::new(Duration::from_millis(100)));
//! let locker = Locker::new(gateway.clone(), LockerConfig::new(Duration::from_secs(1)))?;
//!
//! let lock = locker.new_lock("resource")?;
//! let status = lock.acquire().await?;
//! if status.is_acquired() {
//!     // critical section
//!     lock.extend().await?;
//!     lock.release().await?;
//! } else {
//!     // another client holds the key for status.ttl()
//! }
//!
//! gateway.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ### One-shot acquire with retries
//! ```rust,no_run
//! use plexspaces_locker::{Locker, LockerConfig, LockerError, RedisGateway};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(RedisGateway::connect("redis://127.0.0.1:6379").await?);
//! let locker = Locker::new(
//!     gateway,
//!     LockerConfig::new(Duration::from_secs(1))
//!         .with_retry_count(3)
//!         .with_retry_delay(Duration::from_millis(40))
//!         .with_retry_jitter(Duration::from_millis(20)),
//! )?;
//!
//! match locker.try_acquire("resource").await {
//!     Ok(lock) => {
//!         // critical section
//!         lock.release().await?;
//!     }
//!     Err(LockerError::Contended { ttl }) => {
//!         // busy, retry after ttl
//!     }
//!     Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod delay;

pub mod error;
pub mod gateway;
pub mod lock;
pub mod locker;
pub mod memory;
pub mod token;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use error::{LockerError, LockerResult};
pub use gateway::{Gateway, SetOutcome};
pub use lock::{Lock, LockStatus};
pub use locker::{Locker, LockerConfig, DEFAULT_TOKEN_SIZE, MAX_KEY_SIZE};
pub use memory::MemoryGateway;
pub use token::{OsRandom, RandomSource};

#[cfg(feature = "redis-backend")]
pub use redis::RedisGateway;

// Re-export for convenience: cancellation signals accepted by
// `Locker::new_lock_with_cancel`.
pub use tokio_util::sync::CancellationToken;
