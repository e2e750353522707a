// Capability flags for automata and codecs.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Sub};

/// A set of automaton capabilities.
///
/// The bit values are part of the CFSA2 header and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FsaFlags(u16);

impl FsaFlags {
    /// Arcs may point at the node that immediately follows them.
    pub const NEXTBIT: FsaFlags = FsaFlags(1 << 2);
    /// Every node carries its right-language count.
    pub const NUMBERS: FsaFlags = FsaFlags(1 << 8);
    /// The header stores a filler byte and an annotation separator.
    pub const SEPARATORS: FsaFlags = FsaFlags(1 << 9);
    /// Frequent labels are stored as indices into a header table.
    pub const LABEL_MAPPING: FsaFlags = FsaFlags(1 << 10);

    const NAMED: [(FsaFlags, &'static str); 4] = [
        (FsaFlags::NEXTBIT, "NEXTBIT"),
        (FsaFlags::NUMBERS, "NUMBERS"),
        (FsaFlags::SEPARATORS, "SEPARATORS"),
        (FsaFlags::LABEL_MAPPING, "LABEL_MAPPING"),
    ];

    const ALL_BITS: u16 = (1 << 2) | (1 << 8) | (1 << 9) | (1 << 10);

    pub const fn empty() -> Self {
        FsaFlags(0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns the flags for `bits`, or `None` if unknown bits are set.
    pub const fn from_bits(bits: u16) -> Option<Self> {
        if bits & !Self::ALL_BITS == 0 {
            Some(FsaFlags(bits))
        } else {
            None
        }
    }

    pub const fn union(self, other: FsaFlags) -> Self {
        FsaFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: FsaFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn set(&mut self, other: FsaFlags, enabled: bool) {
        if enabled {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    /// Iterates over the names of the flags that are set.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}

impl BitOr for FsaFlags {
    type Output = FsaFlags;

    fn bitor(self, rhs: FsaFlags) -> FsaFlags {
        self.union(rhs)
    }
}

impl BitOrAssign for FsaFlags {
    fn bitor_assign(&mut self, rhs: FsaFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FsaFlags {
    type Output = FsaFlags;

    fn bitand(self, rhs: FsaFlags) -> FsaFlags {
        FsaFlags(self.0 & rhs.0)
    }
}

impl Sub for FsaFlags {
    type Output = FsaFlags;

    fn sub(self, rhs: FsaFlags) -> FsaFlags {
        FsaFlags(self.0 & !rhs.0)
    }
}

impl fmt::Display for FsaFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        for (i, name) in self.names().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_contains() {
        let flags = FsaFlags::NUMBERS | FsaFlags::SEPARATORS;
        assert!(flags.contains(FsaFlags::NUMBERS));
        assert!(flags.contains(FsaFlags::NUMBERS | FsaFlags::SEPARATORS));
        assert!(!flags.contains(FsaFlags::LABEL_MAPPING));
        assert!(flags.contains(FsaFlags::empty()));
    }

    #[test]
    fn difference_and_set() {
        let mut flags = FsaFlags::NEXTBIT | FsaFlags::NUMBERS;
        assert_eq!(flags - FsaFlags::NUMBERS, FsaFlags::NEXTBIT);
        flags.set(FsaFlags::NUMBERS, false);
        assert_eq!(flags, FsaFlags::NEXTBIT);
        flags.set(FsaFlags::LABEL_MAPPING, true);
        assert!(flags.contains(FsaFlags::LABEL_MAPPING));
    }

    #[test]
    fn from_bits_rejects_unknown() {
        assert_eq!(FsaFlags::from_bits(1 << 8), Some(FsaFlags::NUMBERS));
        assert_eq!(FsaFlags::from_bits(0), Some(FsaFlags::empty()));
        assert_eq!(FsaFlags::from_bits(1 << 15), None);
    }

    #[test]
    fn display_lists_names() {
        assert_eq!(FsaFlags::empty().to_string(), "(none)");
        assert_eq!(
            (FsaFlags::SEPARATORS | FsaFlags::NEXTBIT).to_string(),
            "NEXTBIT | SEPARATORS"
        );
    }
}
