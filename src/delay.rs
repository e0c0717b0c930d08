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

//! Jittered retry delays.
//!
//! Competing clients that retry on a fixed cadence tend to collide again on
//! every attempt. A symmetric random perturbation of the base delay spreads
//! the retries out.

use rand::Rng;
use std::time::Duration;

/// Compute a jittered delay from a unit draw `u` in `[0, 1)`.
///
/// Yields `delay + floor((2u - 1) * jitter)` milliseconds, clamped at zero.
/// With `jitter == 0` the base delay is returned unchanged, so every
/// produced delay lies in `[max(0, delay - jitter), delay + jitter]`.
pub(crate) fn jittered_delay(delay: Duration, jitter: Duration, u: f64) -> Duration {
    if jitter.is_zero() {
        return delay;
    }
    let delay_ms = delay.as_millis() as f64;
    let jitter_ms = jitter.as_millis() as f64;
    let ms = (delay_ms + ((2.0 * u - 1.0) * jitter_ms).floor()).max(0.0);
    Duration::from_millis(ms as u64)
}

/// Draw the next retry delay using thread-local randomness.
pub(crate) fn next_delay(delay: Duration, jitter: Duration) -> Duration {
    jittered_delay(delay, jitter, rand::thread_rng().gen::<f64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_jitter_returns_base_delay() {
        let delay = Duration::from_millis(20);
        assert_eq!(jittered_delay(delay, Duration::ZERO, 0.0), delay);
        assert_eq!(jittered_delay(delay, Duration::ZERO, 0.999), delay);
    }

    #[test]
    fn test_delays_stay_within_jitter_window() {
        let delay = Duration::from_millis(20);
        let jitter = Duration::from_millis(10);
        let lo = Duration::from_millis(10);
        let hi = Duration::from_millis(30);

        let mut u = 0.0;
        while u < 1.0 {
            let d = jittered_delay(delay, jitter, u);
            assert!(d >= lo && d <= hi, "u={u}: {d:?} outside [{lo:?}, {hi:?}]");
            u += 0.001;
        }
    }

    #[test]
    fn test_negative_delays_clamp_to_zero() {
        // jitter equal to delay can round below zero at u = 0
        let d = jittered_delay(Duration::from_millis(5), Duration::from_millis(5), 0.0);
        assert_eq!(d, Duration::ZERO);
    }

    #[test]
    fn test_extremes_of_unit_interval() {
        let delay = Duration::from_millis(100);
        let jitter = Duration::from_millis(40);
        assert_eq!(jittered_delay(delay, jitter, 0.0), Duration::from_millis(60));
        // u just below 1.0 floors to +39, never exceeding delay + jitter
        let top = jittered_delay(delay, jitter, 0.999999);
        assert!(top <= Duration::from_millis(140));
        assert!(top >= Duration::from_millis(139));
    }

    #[test]
    fn test_drawn_delays_stay_in_range() {
        let delay = Duration::from_millis(20);
        let jitter = Duration::from_millis(10);
        for _ in 0..1000 {
            let d = next_delay(delay, jitter);
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(30));
        }
    }
}
