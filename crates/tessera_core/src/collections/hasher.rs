//! # Deterministic Hashing
//!
//! Keyed SipHash-1-3 with fixed keys: the same key hashes to the same value
//! in every run, which keeps bucket layouts (and therefore iteration order)
//! reproducible between sessions and machines.

use std::hash::BuildHasher;

use siphasher::sip::SipHasher13;

/// Default key pair. Any fixed pair works; these are the ASCII bytes of
/// "tessera!" and "storage!".
const DEFAULT_KEYS: (u64, u64) = (0x7465_7373_6572_6121, 0x7374_6f72_6167_6521);

/// Builds [`SipHasher13`] instances with a fixed key pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SipBuildHasher {
    k0: u64,
    k1: u64,
}

impl SipBuildHasher {
    /// Creates a builder with explicit keys.
    #[inline]
    #[must_use]
    pub const fn with_keys(k0: u64, k1: u64) -> Self {
        Self { k0, k1 }
    }
}

impl Default for SipBuildHasher {
    fn default() -> Self {
        Self::with_keys(DEFAULT_KEYS.0, DEFAULT_KEYS.1)
    }
}

impl BuildHasher for SipBuildHasher {
    type Hasher = SipHasher13;

    #[inline]
    fn build_hasher(&self) -> SipHasher13 {
        SipHasher13::new_with_keys(self.k0, self.k1)
    }
}
