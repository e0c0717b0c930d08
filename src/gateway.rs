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

//! Gateway trait for TTL-capable lock storage backends.

use crate::error::LockerResult;
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of a conditional set against lock storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value was installed on a free or expired slot, or the caller
    /// already held the key and its TTL was refreshed.
    Acquired,
    /// Another value holds the key. Carries the remaining lifetime of the
    /// conflicting entry as observed by the backend.
    Held(Duration),
}

impl SetOutcome {
    /// Whether the set took effect.
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }
}

/// Trait for TTL-capable key-value storage used to hold lock state.
///
/// ## Purpose
/// The only coupling between the lock engine and storage. Backends must
/// decide the three `set` cases and the `del` comparison atomically with
/// respect to concurrent operations on the same key.
///
/// ## Contract
/// - `set`: install `(value, ttl)` if no live entry exists; refresh the TTL
///   if the live entry stores `value`; otherwise change nothing and report
///   the remaining TTL. Expired entries are equivalent to no entry.
/// - `del`: remove the entry iff it exists, is live, and stores exactly
///   `value`.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Conditionally install or refresh the lock entry for `key`.
    ///
    /// ## Returns
    /// - `Ok(SetOutcome::Acquired)`: value installed or own TTL refreshed
    /// - `Ok(SetOutcome::Held(ttl))`: key held by a different value
    /// - `Err(...)`: backend failure
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> LockerResult<SetOutcome>;

    /// Remove the entry for `key` iff it stores exactly `value`.
    ///
    /// ## Returns
    /// - `Ok(true)`: entry removed
    /// - `Ok(false)`: entry absent, expired, or held by a different value
    /// - `Err(...)`: backend failure
    async fn del(&self, key: &str, value: &str) -> LockerResult<bool>;
}
