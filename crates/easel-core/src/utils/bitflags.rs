// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Declarative bit-set types with named flags.

/// Declares a transparent bit-set type with named flag constants.
///
/// Unknown bits are preserved by [`from_bits_truncate`](#method.from_bits_truncate);
/// use `from_bits` to reject them.
#[macro_export]
#[doc(hidden)]
macro_rules! easel_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[repr(transparent)]
        $vis struct $name {
            bits: $ty,
        }

        impl $name {
            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*

            /// No flag set.
            pub const EMPTY: Self = Self { bits: 0 };

            /// Union of every named flag.
            pub const ALL: Self = Self { bits: 0 $(| $flag_value)* };

            /// Wraps raw bits, keeping bits that name no flag.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// Wraps raw bits, or `None` if any bit names no flag.
            pub const fn from_bits(bits: $ty) -> Option<Self> {
                if bits & !Self::ALL.bits == 0 {
                    Some(Self { bits })
                } else {
                    None
                }
            }

            /// Raw value.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// `true` when no bit is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// `true` when every bit of `other` is set in `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// `true` when `self` and `other` share at least one bit.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// Sets the bits of `other`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Clears the bits of `other`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            /// Returns a copy with the bits of `other` set.
            #[must_use]
            pub const fn with(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }

            /// Returns a copy with the bits of `other` cleared.
            #[must_use]
            pub const fn without(self, other: Self) -> Self {
                Self { bits: self.bits & !other.bits }
            }

            /// Names of the single flags contained in `self`, in declaration order.
            pub fn names(&self) -> Vec<&'static str> {
                [$((stringify!($flag_name), $flag_value)),*]
                    .into_iter()
                    .filter(|&(_, v)| v != 0 && self.bits & v == v)
                    .map(|(n, _)| n)
                    .collect()
            }
        }

        impl ::core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                self.with(rhs)
            }
        }

        impl ::core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self { bits: self.bits & rhs.bits }
            }
        }

        impl ::core::ops::Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self { bits: !self.bits & Self::ALL.bits }
            }
        }

        impl ::core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.insert(rhs);
            }
        }

        impl ::core::ops::BitAndAssign for $name {
            fn bitand_assign(&mut self, rhs: Self) {
                self.bits &= rhs.bits;
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}(", stringify!($name))?;
                let mut known: $ty = 0;
                let mut sep = "";
                for (name, value) in [$((stringify!($flag_name), $flag_value)),*] {
                    if value != 0 && self.bits & value == value && known & value != value {
                        write!(f, "{sep}{name}")?;
                        known |= value;
                        sep = " | ";
                    }
                }
                let unknown = self.bits & !known;
                if unknown != 0 {
                    write!(f, "{sep}{unknown:#x}")?;
                } else if self.bits == 0 {
                    write!(f, "EMPTY")?;
                }
                write!(f, ")")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::easel_bitflags! {
        struct Access: u16 {
            const READ = 0x1;
            const WRITE = 0x2;
            const READ_WRITE = 0x3;
            const EXEC = 0x8;
        }
    }

    #[test]
    fn all_is_union_of_named_flags() {
        assert_eq!(Access::ALL.bits(), 0xB);
    }

    #[test]
    fn from_bits_rejects_unknown_bits() {
        assert_eq!(Access::from_bits(0x3), Some(Access::READ_WRITE));
        assert_eq!(Access::from_bits(0x4), None);
        assert_eq!(Access::from_bits_truncate(0x4).bits(), 0x4);
    }

    #[test]
    fn set_operations() {
        let mut a = Access::READ;
        a |= Access::WRITE;
        assert!(a.contains(Access::READ_WRITE));
        assert!(a.intersects(Access::WRITE | Access::EXEC));
        a.remove(Access::READ);
        assert_eq!(a, Access::WRITE);
        assert_eq!(!Access::WRITE, Access::READ | Access::EXEC);
        assert!(Access::EMPTY.is_empty());
        assert_eq!(Access::READ.with(Access::EXEC).without(Access::READ), Access::EXEC);
    }

    #[test]
    fn names_lists_contained_flags() {
        let names = (Access::READ | Access::EXEC).names();
        assert_eq!(names, vec!["READ", "EXEC"]);
    }

    #[test]
    fn debug_prefers_first_matching_name_and_shows_unknown_bits() {
        assert_eq!(format!("{:?}", Access::READ_WRITE), "Access(READ | WRITE)");
        assert_eq!(format!("{:?}", Access::EMPTY), "Access(EMPTY)");
        assert_eq!(
            format!("{:?}", Access::from_bits_truncate(0x11)),
            "Access(READ | 0x10)"
        );
    }
}
