//! Selection/association state bits carried by every value node.
//!
//! The bits are computed by the association engine; this crate only stores
//! and ranks them. `SELECTED | EXCLUDED` is a legal combination: the user
//! picked the value but it is incompatible with other active filters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitset of `SELECTED`, `INCLUDED`, `EXCLUDED`, `COMPATIBLE`.
///
/// Serialized as a bare integer; deserializing drops unknown bits like
/// [`ValueState::from_bits`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct ValueState(u32);

impl From<u32> for ValueState {
    fn from(bits: u32) -> Self {
        ValueState::from_bits(bits)
    }
}

impl From<ValueState> for u32 {
    fn from(state: ValueState) -> Self {
        state.0
    }
}

impl ValueState {
    pub const NONE: ValueState = ValueState(0);
    pub const SELECTED: ValueState = ValueState(1 << 0);
    pub const INCLUDED: ValueState = ValueState(1 << 1);
    pub const EXCLUDED: ValueState = ValueState(1 << 2);
    pub const COMPATIBLE: ValueState = ValueState(1 << 3);

    const ALL_BITS: u32 = 0b1111;

    /// Build from raw bits. Unknown bits are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        ValueState(bits & Self::ALL_BITS)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: ValueState) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: ValueState) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: ValueState) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: ValueState) {
        self.0 &= !other.0;
    }

    /// Set or clear `other` depending on `on`.
    #[inline]
    pub fn set(&mut self, other: ValueState, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ValueState {
    type Output = ValueState;

    fn bitor(self, rhs: ValueState) -> ValueState {
        ValueState(self.0 | rhs.0)
    }
}

impl BitOrAssign for ValueState {
    fn bitor_assign(&mut self, rhs: ValueState) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ValueState {
    type Output = ValueState;

    fn bitand(self, rhs: ValueState) -> ValueState {
        ValueState(self.0 & rhs.0)
    }
}

impl fmt::Debug for ValueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (ValueState::SELECTED, "SELECTED"),
            (ValueState::INCLUDED, "INCLUDED"),
            (ValueState::EXCLUDED, "EXCLUDED"),
            (ValueState::COMPATIBLE, "COMPATIBLE"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "ValueState(NONE)")
        } else {
            write!(f, "ValueState({})", set.join(" | "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut s = ValueState::NONE;
        s.insert(ValueState::SELECTED);
        s.insert(ValueState::EXCLUDED);
        assert!(s.contains(ValueState::SELECTED | ValueState::EXCLUDED));
        s.remove(ValueState::SELECTED);
        assert!(!s.contains(ValueState::SELECTED));
        assert!(s.contains(ValueState::EXCLUDED));
    }

    #[test]
    fn test_from_bits_drops_unknown() {
        let s = ValueState::from_bits(0xFF);
        assert_eq!(s.bits(), 0b1111);
    }

    #[test]
    fn test_deserialize_drops_unknown() {
        // 245 = 0b1111_0101
        let s: ValueState = serde_json::from_str("245").unwrap();
        assert_eq!(s, ValueState::SELECTED | ValueState::EXCLUDED);
        assert_eq!(serde_json::to_string(&s).unwrap(), "5");
    }

    #[test]
    fn test_debug_names() {
        let s = ValueState::SELECTED | ValueState::COMPATIBLE;
        assert_eq!(format!("{s:?}"), "ValueState(SELECTED | COMPATIBLE)");
        assert_eq!(format!("{:?}", ValueState::NONE), "ValueState(NONE)");
    }
}
