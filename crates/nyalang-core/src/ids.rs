//! Index types for the program image tables.
//!
//! Types, methods and fields live in flat arenas owned by the program image.
//! Compiler passes hand these indices around instead of live references, so a
//! descriptor created in the declaration pass can be read back in the codegen
//! pass without any aliasing.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw arena index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// The raw arena index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// The raw value as stored in bytecode operands.
            #[inline]
            pub const fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(index: u32) -> Self {
                Self::new(index)
            }
        }
    };
}

define_id!(
    /// Handle of a declared type (host or program type).
    TypeId,
    "type"
);

define_id!(
    /// Handle of a declared method, constructor or operator.
    MethodId,
    "method"
);

define_id!(
    /// Handle of a declared field.
    FieldId,
    "field"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrip() {
        let id = TypeId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.as_u32(), 42);
        assert_eq!(TypeId::from(42), id);
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", MethodId::new(5)), "method#5");
        assert_eq!(format!("{:?}", FieldId::new(1)), "field#1");
    }

    #[test]
    fn ids_are_ordered() {
        assert!(TypeId::new(1) < TypeId::new(2));
    }
}
