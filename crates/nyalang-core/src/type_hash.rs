//! Deterministic 64-bit hashes for names and method signatures.
//!
//! The program image indexes its tables by hash: qualified type names map to
//! a [`TypeId`], and `(owner, name, parameter types)` signatures map to the
//! methods declared with exactly that shape. Hashes use XXHash64 mixed with a
//! per-domain constant so a type name can never collide with a signature that
//! happens to hash the same bytes.

use std::fmt;

use xxhash_rust::xxh64::xxh64;

use crate::TypeId;

mod domain {
    pub const TYPE: u64 = 0x4e59_415f_5459_5045;
    pub const SIGNATURE: u64 = 0x4e59_415f_5349_4721;
    pub const GLOBAL: u64 = 0x4e59_415f_474c_4f42;
    pub const SEP: u64 = 0x9e37_79b9_7f4a_7c15;
}

/// A 64-bit hash identifying a type name or a method signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Hash of a fully qualified type name such as `System.Int32`.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(domain::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a method signature.
    ///
    /// Global functions pass `None` as owner. Parameter order matters:
    /// `(int, double)` and `(double, int)` produce different hashes.
    pub fn from_signature(owner: Option<TypeId>, name: &str, params: &[TypeId]) -> Self {
        let owner_bits = match owner {
            Some(id) => (id.as_u32() as u64).wrapping_add(1).wrapping_mul(domain::SEP),
            None => domain::GLOBAL,
        };
        let mut hash = domain::SIGNATURE ^ owner_bits ^ xxh64(name.as_bytes(), 0);
        for (i, param) in params.iter().enumerate() {
            let marker = (i as u64 + 1).wrapping_mul(domain::SEP);
            hash = hash
                .wrapping_mul(domain::SEP)
                .wrapping_add(marker ^ param.as_u32() as u64);
        }
        TypeHash(hash)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
