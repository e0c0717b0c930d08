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

//! Redis-backed lock storage gateway.
//!
//! ## Purpose
//! Provides a distributed [`Gateway`] over any Redis-family store. All
//! three cases of `set` (install, refresh, contention report) are decided
//! inside a single server-side Lua script, so the compare is atomic with
//! respect to every other client. `del` is the standard fenced delete
//! script.
//!
//! ## Wire protocol
//! The set script replies with a single integer: a negative sentinel for
//! install/refresh success, the remaining TTL in milliseconds on
//! contention, or `-1` when the key exists without a TTL (the key
//! namespace is shared with something that is not a lock). Script loading
//! and EVALSHA reload on `NOSCRIPT` are handled by the client.

use crate::error::{LockerError, LockerResult};
use crate::gateway::{Gateway, SetOutcome};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script, Value};
use std::time::Duration;

/// Sentinel reply for install/refresh success.
const REPLY_ACQUIRED: i64 = -2;
/// PTTL reply for a key without expiry.
const REPLY_NO_EXPIRY: i64 = -1;

const SET_SCRIPT: &str = r#"local v = redis.call("get", KEYS[1])
if v == false then
    redis.call("set", KEYS[1], ARGV[1], "px", ARGV[2])
    return -2
end
if v == ARGV[1] then
    redis.call("pexpire", KEYS[1], ARGV[2])
    return -2
end
return redis.call("pttl", KEYS[1])"#;

const DEL_SCRIPT: &str = r#"if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
end
return 0"#;

/// Redis-backed lock storage.
///
/// ## Architecture
/// - Uses the `redis` crate with an async [`ConnectionManager`]
///   (connection pooling and automatic reconnection)
/// - TTLs use the native `PX`/`PEXPIRE` millisecond primitives
///
/// ## Example
/// ```rust,no_run
/// use plexspaces_locker::RedisGateway;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gw = RedisGateway::connect("redis://127.0.0.1:6379").await?;
/// # Ok(())
/// # }
/// ```
pub struct RedisGateway {
    conn: ConnectionManager,
    set_script: Script,
    del_script: Script,
}

impl RedisGateway {
    /// Create a gateway over an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            set_script: Script::new(SET_SCRIPT),
            del_script: Script::new(DEL_SCRIPT),
        }
    }

    /// Connect to Redis and create a gateway.
    ///
    /// ## Arguments
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    pub async fn connect(url: &str) -> LockerResult<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl Gateway for RedisGateway {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> LockerResult<SetOutcome> {
        let mut conn = self.conn.clone();
        let ttl_ms = ttl.as_millis() as u64;

        let reply: Value = self
            .set_script
            .key(key)
            .arg(value)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await?;

        match reply {
            Value::Int(REPLY_ACQUIRED) => Ok(SetOutcome::Acquired),
            Value::Int(REPLY_NO_EXPIRY) => {
                tracing::warn!(key, "lock key exists without TTL");
                Err(LockerError::KeyNameClash)
            }
            Value::Int(ms) if ms >= 0 => Ok(SetOutcome::Held(Duration::from_millis(ms as u64))),
            other => {
                tracing::warn!(key, ?other, "unexpected set script reply");
                Err(LockerError::InvalidResponse)
            }
        }
    }

    async fn del(&self, key: &str, value: &str) -> LockerResult<bool> {
        let mut conn = self.conn.clone();

        let reply: Value = self
            .del_script
            .key(key)
            .arg(value)
            .invoke_async(&mut conn)
            .await?;

        match reply {
            Value::Int(n) => Ok(n == 1),
            other => {
                tracing::warn!(key, ?other, "unexpected del script reply");
                Err(LockerError::InvalidResponse)
            }
        }
    }
}

// ============================================================================
// TESTS (require a running Redis instance)
// ============================================================================
