//! Name hashing
//!
//! Bones, tracks and morphs are looked up by the hash of their name rather than
//! by string comparison. The hash is stable across runs (xxh3), so hashes may be
//! stored alongside asset data.

use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

/// Stable 64-bit hash of an identifier string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NameHash(u64);

impl NameHash {
    /// Hash of the empty string is reserved as "no name".
    pub const EMPTY: NameHash = NameHash(0);

    #[inline]
    #[must_use]
    pub fn new(name: &str) -> Self {
        if name.is_empty() {
            Self::EMPTY
        } else {
            Self(xxh3_64(name.as_bytes()))
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<&str> for NameHash {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&String> for NameHash {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl fmt::Debug for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameHash({:#018x})", self.0)
    }
}
