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

//! In-memory lock storage gateway.
//!
//! ## Purpose
//! Provides a HashMap-based [`Gateway`] for testing and single-process
//! scenarios. Expiry is checked lazily inside `set`/`del`, so correctness
//! never depends on the sweep interval; the background sweeper only bounds
//! how long expired entries occupy memory.
//!
//! ## Limitations
//! - Not persistent (locks lost on restart)
//! - Not distributed (single process only)

use crate::error::LockerResult;
use crate::gateway::{Gateway, SetOutcome};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Entry in the in-memory store.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory lock storage with a background expiry sweeper.
///
/// ## Lifecycle
/// Creating the gateway spawns the sweeper on the current Tokio runtime.
/// Owners must call [`MemoryGateway::shutdown`] to stop and join it;
/// `Drop` cancels the sweeper as a best-effort safety net but cannot join
/// the task, so programs must not rely on it.
///
/// ## Example
/// ```rust
/// use plexspaces_locker::{Gateway, MemoryGateway, SetOutcome};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gw = MemoryGateway::new(Duration::from_millis(100));
///
/// let outcome = gw.set("key", "token", Duration::from_millis(500)).await?;
/// assert_eq!(outcome, SetOutcome::Acquired);
///
/// gw.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct MemoryGateway {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryGateway {
    /// Create a new in-memory gateway and start its sweeper.
    ///
    /// `sweep_interval` controls how often expired entries are reclaimed.
    /// It is independent of any lock TTL.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(sweep_interval: Duration) -> Self {
        let entries: Arc<Mutex<HashMap<String, Entry>>> = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = CancellationToken::new();
        let sweeper = Self::spawn_sweeper(Arc::clone(&entries), shutdown.clone(), sweep_interval);
        Self {
            entries,
            shutdown,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    fn spawn_sweeper(
        entries: Arc<Mutex<HashMap<String, Entry>>>,
        shutdown: CancellationToken,
        sweep_interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let mut entries = entries.lock().await;
                        let now = Instant::now();
                        let before = entries.len();
                        entries.retain(|_, entry| entry.is_live(now));
                        let removed = before - entries.len();
                        if removed > 0 {
                            tracing::trace!(removed, "swept expired lock entries");
                        }
                    }
                }
            }
        })
    }

    /// Stop the sweeper and wait for it to finish. Idempotent.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.sweeper.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Number of entries currently stored, including not-yet-swept expired
    /// ones.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the store holds no entries at all.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    #[cfg(test)]
    async fn peek(&self, key: &str) -> Option<(String, Instant)> {
        self.entries
            .lock()
            .await
            .get(key)
            .map(|e| (e.value.clone(), e.expires_at))
    }

    #[cfg(test)]
    async fn insert_raw(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

impl Drop for MemoryGateway {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> LockerResult<SetOutcome> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        if let Some(entry) = entries.get_mut(key) {
            if entry.is_live(now) {
                if entry.value == value {
                    entry.expires_at = now + ttl;
                    return Ok(SetOutcome::Acquired);
                }
                return Ok(SetOutcome::Held(entry.expires_at - now));
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(SetOutcome::Acquired)
    }

    async fn del(&self, key: &str, value: &str) -> LockerResult<bool> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) && entry.value == value => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
