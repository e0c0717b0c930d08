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

//! Ownership token generation.
//!
//! Tokens are the fencing proof: release and refresh only take effect when
//! the stored value equals the caller's token, so tokens must be infeasible
//! to forge. The default source draws from operating-system entropy; a
//! custom source can be injected for deterministic tests.

use crate::error::LockerResult;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

/// Source of random bytes for token generation.
///
/// Implementations must be thread-safe; a single source is shared by every
/// lock handle produced by a [`crate::Locker`].
pub trait RandomSource: Send + Sync {
    /// Fill `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error>;
}

/// Operating-system entropy source. The default for token generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(buf)
    }
}

/// Draw `size` random bytes from `source` and encode them as a URL-safe
/// base64 token.
pub(crate) fn generate_token(source: &dyn RandomSource, size: usize) -> LockerResult<String> {
    let mut buf = vec![0u8; size];
    source.fill(&mut buf)?;
    Ok(URL_SAFE.encode(buf))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic source cycling over a fixed byte pattern.
    pub(crate) struct FixedSource(pub Vec<u8>);

    impl RandomSource for FixedSource {
        fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error> {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = self.0[i % self.0.len()];
            }
            Ok(())
        }
    }

    #[test]
    fn test_default_token_is_base64_of_16_bytes() {
        let token = generate_token(&OsRandom, 16).unwrap();
        // 16 bytes -> 24 base64 characters including padding
        assert_eq!(token.len(), 24);
        let decoded = URL_SAFE.decode(&token).unwrap();
        assert_eq!(decoded.len(), 16);
    }

    #[test]
    fn test_token_size_is_respected() {
        let token = generate_token(&OsRandom, 32).unwrap();
        assert_eq!(URL_SAFE.decode(&token).unwrap().len(), 32);
    }

    #[test]
    fn test_fixed_source_is_deterministic() {
        let source = FixedSource(b"qwertyqwertyqwer".to_vec());
        let a = generate_token(&source, 16).unwrap();
        let b = generate_token(&source, 16).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "cXdlcnR5cXdlcnR5cXdlcg==");
    }

    #[test]
    fn test_consecutive_random_tokens_differ() {
        let a = generate_token(&OsRandom, 16).unwrap();
        let b = generate_token(&OsRandom, 16).unwrap();
        assert_ne!(a, b);
    }
}
