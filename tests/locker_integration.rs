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

//! End-to-end locking protocol tests over the in-memory backend.

use plexspaces_locker::{
    CancellationToken, Locker, LockerConfig, LockerError, MemoryGateway,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn memory() -> Arc<MemoryGateway> {
    Arc::new(MemoryGateway::new(Duration::from_millis(50)))
}

#[tokio::test]
async fn test_two_clients_exclude_each_other() {
    let gateway = memory();
    let locker_a = Locker::new(gateway.clone(), LockerConfig::new(Duration::from_secs(1))).unwrap();
    let locker_b = Locker::new(gateway.clone(), LockerConfig::new(Duration::from_secs(1))).unwrap();

    let lock_a = locker_a.new_lock("shared").unwrap();
    assert!(lock_a.acquire().await.unwrap().is_acquired());

    let lock_b = locker_b.new_lock("shared").unwrap();
    let status = lock_b.acquire().await.unwrap();
    assert!(!status.is_acquired());
    assert!(status.ttl() > Duration::ZERO && status.ttl() <= Duration::from_secs(1));

    // once released, the other client gets the key
    assert!(lock_a.release().await.unwrap());
    assert!(lock_b.acquire().await.unwrap().is_acquired());

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_contender_wins_after_expiry_through_retries() {
    let gateway = memory();
    let holder = Locker::new(gateway.clone(), LockerConfig::new(Duration::from_millis(60))).unwrap();
    let contender = Locker::new(
        gateway.clone(),
        LockerConfig::new(Duration::from_secs(1))
            .with_retry_count(20)
            .with_retry_delay(Duration::from_millis(10)),
    )
    .unwrap();

    let held = holder.new_lock("shared").unwrap();
    assert!(held.acquire().await.unwrap().is_acquired());

    // the holder never releases; the contender outlasts the 60ms TTL
    let lock = contender.new_lock("shared").unwrap();
    let status = lock.acquire().await.unwrap();
    assert!(status.is_acquired());

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_stale_handle_cannot_release_new_owner() {
    let gateway = memory();
    let locker = Locker::new(gateway.clone(), LockerConfig::new(Duration::from_millis(40))).unwrap();

    let stale = locker.new_lock("shared").unwrap();
    assert!(stale.acquire().await.unwrap().is_acquired());

    // entry expires and another client takes the key
    tokio::time::sleep(Duration::from_millis(60)).await;
    let owner = locker.new_lock("shared").unwrap();
    assert!(owner.acquire().await.unwrap().is_acquired());

    // the stale release is fenced out and the owner keeps the lock
    assert!(!stale.release().await.unwrap());
    assert!(owner.extend().await.unwrap().is_acquired());

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_extend_keeps_lock_past_original_ttl() {
    let gateway = memory();
    let locker = Locker::new(gateway.clone(), LockerConfig::new(Duration::from_millis(80))).unwrap();

    let lock = locker.new_lock("shared").unwrap();
    assert!(lock.acquire().await.unwrap().is_acquired());

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(lock.extend().await.unwrap().is_acquired());
    }

    // 120ms elapsed against an 80ms TTL, still ours
    let rival = locker.new_lock("shared").unwrap();
    assert!(!rival.acquire().await.unwrap().is_acquired());

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_cancellation_aborts_retry_loop_promptly() {
    let gateway = memory();
    let locker = Locker::new(
        gateway.clone(),
        LockerConfig::new(Duration::from_secs(5))
            .with_retry_count(100)
            .with_retry_delay(Duration::from_secs(5)),
    )
    .unwrap();

    let holder = locker.new_lock("shared").unwrap();
    assert!(holder.acquire().await.unwrap().is_acquired());

    let cancel = CancellationToken::new();
    let waiter = locker.new_lock_with_cancel("shared", cancel.clone()).unwrap();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let status = waiter.acquire().await.unwrap();
    canceller.await.unwrap();

    assert!(!status.is_acquired());
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "cancelled acquire took {:?}",
        started.elapsed()
    );

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_try_acquire_round_trip() {
    let gateway = memory();
    let locker = Locker::new(
        gateway.clone(),
        LockerConfig::new(Duration::from_millis(200)).with_prefix("jobs:"),
    )
    .unwrap();

    let lock = locker.try_acquire("nightly").await.unwrap();
    assert_eq!(lock.key(), "jobs:nightly");

    match locker.try_acquire("nightly").await {
        Err(LockerError::Contended { ttl }) => {
            assert!(ttl > Duration::ZERO && ttl <= Duration::from_millis(200));
        }
        other => panic!("expected contention, got {other:?}"),
    }

    assert!(lock.release().await.unwrap());
    let again = locker.try_acquire("nightly").await.unwrap();
    assert!(again.release().await.unwrap());

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_parallel_contenders_have_single_winner() {
    let gateway = memory();
    let locker = Arc::new(
        Locker::new(gateway.clone(), LockerConfig::new(Duration::from_secs(10))).unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..16 {
        let locker = Arc::clone(&locker);
        handles.push(tokio::spawn(async move {
            let lock = locker.new_lock("contested").unwrap();
            lock.acquire().await.unwrap().is_acquired()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    gateway.shutdown().await;
}
