// Copyright 2024 Saptak Santra
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

//! Entity identifiers packed as (identifier, version) bitfields.
//!
//! An entity is a plain value: the low bits carry the identifier (slot index
//! in the registry), the high bits carry the version bumped on every reuse of
//! that slot. The raw integer width is chosen by the `EntityTraits`
//! implementation (`u32` or `u64`).

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Bit layout of a raw entity integer.
pub trait EntityTraits:
    Copy + Eq + Ord + Hash + fmt::Debug + Default + Send + Sync + 'static
{
    /// Bits reserved for the identifier (low bits)
    const IDENTIFIER_BITS: u32;

    /// Bits reserved for the version (high bits)
    const VERSION_BITS: u32;

    const VERSION_SHIFT: u32 = Self::IDENTIFIER_BITS;
    const IDENTIFIER_MASK: u32 = ((1u64 << Self::IDENTIFIER_BITS) - 1) as u32;
    const VERSION_MASK: u32 = ((1u64 << Self::VERSION_BITS) - 1) as u32;

    /// `(version << VERSION_SHIFT) | identifier`, both fields already masked
    fn compose(identifier: u32, version: u32) -> Self;

    fn identifier_of(raw: Self) -> u32;

    fn version_of(raw: Self) -> u32;

    /// Pack an entity into its raw integer form.
    #[inline]
    fn to_type(entity: Entity<Self>) -> Self {
        entity.raw
    }

    /// Unpack a raw integer into an entity. Every raw value is a valid entity.
    #[inline]
    fn from_type(value: Self) -> Entity<Self> {
        Entity { raw: value }
    }
}

impl EntityTraits for u32 {
    const IDENTIFIER_BITS: u32 = 22;
    const VERSION_BITS: u32 = 10;

    #[inline]
    fn compose(identifier: u32, version: u32) -> Self {
        (version << Self::VERSION_SHIFT) | identifier
    }

    #[inline]
    fn identifier_of(raw: Self) -> u32 {
        raw & Self::IDENTIFIER_MASK
    }

    #[inline]
    fn version_of(raw: Self) -> u32 {
        (raw >> Self::VERSION_SHIFT) & Self::VERSION_MASK
    }
}

impl EntityTraits for u64 {
    const IDENTIFIER_BITS: u32 = 32;
    const VERSION_BITS: u32 = 32;

    #[inline]
    fn compose(identifier: u32, version: u32) -> Self {
        (u64::from(version) << Self::VERSION_SHIFT) | u64::from(identifier)
    }

    #[inline]
    fn identifier_of(raw: Self) -> u32 {
        (raw & u64::from(Self::IDENTIFIER_MASK)) as u32
    }

    #[inline]
    fn version_of(raw: Self) -> u32 {
        ((raw >> Self::VERSION_SHIFT) & u64::from(Self::VERSION_MASK)) as u32
    }
}

/// Raw entity width matching the target pointer width.
#[cfg(target_pointer_width = "64")]
pub type DefaultRepr = u64;

/// Raw entity width matching the target pointer width.
#[cfg(not(target_pointer_width = "64"))]
pub type DefaultRepr = u32;

/// Entity type used by [`crate::Registry`].
pub type DefaultEntity = Entity<DefaultRepr>;

/// Generation-stamped entity handle.
///
/// Stored as the packed raw integer, so `Entity<u32>` is four bytes and
/// serializes as a plain number. Equality compares both identifier and
/// version, so a handle to a recycled slot never equals the handle issued
/// before the recycle.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity<R: EntityTraits> {
    raw: R,
}

impl<R: EntityTraits> Entity<R> {
    /// Create an entity from its fields.
    ///
    /// Fields wider than their bit budget are a programmer error: this
    /// asserts in debug builds and masks in release builds.
    pub fn new(identifier: u32, version: u32) -> Self {
        debug_assert!(
            identifier <= R::IDENTIFIER_MASK,
            "identifier {identifier} exceeds {} bits",
            R::IDENTIFIER_BITS
        );
        debug_assert!(
            version <= R::VERSION_MASK,
            "version {version} exceeds {} bits",
            R::VERSION_BITS
        );
        Self {
            raw: R::compose(identifier & R::IDENTIFIER_MASK, version & R::VERSION_MASK),
        }
    }

    /// The null entity: every identifier and version bit set.
    pub fn null() -> Self {
        Self {
            raw: R::compose(R::IDENTIFIER_MASK, R::VERSION_MASK),
        }
    }

    /// True if the identifier is the reserved null identifier.
    pub fn is_null(&self) -> bool {
        self.identifier() == R::IDENTIFIER_MASK
    }

    #[inline]
    pub fn identifier(&self) -> u32 {
        R::identifier_of(self.raw)
    }

    #[inline]
    pub fn version(&self) -> u32 {
        R::version_of(self.raw)
    }

    /// Identifier as a slot index.
    #[inline]
    pub fn index(&self) -> usize {
        self.identifier() as usize
    }

    /// Same identifier with the version advanced by one (wrapping within the
    /// version bits).
    pub fn next_version(&self) -> Self {
        Self {
            raw: R::compose(
                self.identifier(),
                self.version().wrapping_add(1) & R::VERSION_MASK,
            ),
        }
    }

    /// Pack into the raw integer.
    #[inline]
    pub fn to_type(self) -> R {
        R::to_type(self)
    }

    /// Unpack from the raw integer.
    #[inline]
    pub fn from_type(value: R) -> Self {
        R::from_type(value)
    }
}

impl<R: EntityTraits> Default for Entity<R> {
    fn default() -> Self {
        Self::null()
    }
}

impl<R: EntityTraits> fmt::Debug for Entity<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.identifier(), self.version())
        }
    }
}

impl<R: EntityTraits> fmt::Display for Entity<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.identifier(), self.version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_type_zero() {
        let e = Entity::<u32>::new(0, 0);
        assert_eq!(u32::to_type(e), 0);
    }

    #[test]
    fn test_to_type_zero_version() {
        let e = Entity::<u32>::new(1, 0);
        assert_eq!(e.to_type(), 1);
    }

    #[test]
    fn test_to_type_zero_identifier() {
        let e = Entity::<u32>::new(0, 1);
        assert_eq!(e.to_type(), 1 << u32::VERSION_SHIFT);
    }

    #[test]
    fn test_to_type_identifier_and_version() {
        let e = Entity::<u32>::new(1, 1);
        assert_eq!(e.to_type(), (1 << u32::VERSION_SHIFT) | 1);
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(u32::IDENTIFIER_MASK, 0x003F_FFFF);
        assert_eq!(u32::VERSION_MASK, 0x3FF);
        assert_eq!(u64::IDENTIFIER_MASK, u32::MAX);
        assert_eq!(u64::VERSION_MASK, u32::MAX);
        assert_eq!(u64::VERSION_SHIFT, 32);
    }

    #[test]
    fn test_round_trip_at_field_limits() {
        let e = Entity::<u32>::new(u32::IDENTIFIER_MASK - 1, u32::VERSION_MASK);
        assert_eq!(Entity::from_type(e.to_type()), e);

        let e = Entity::<u64>::new(12345, u32::MAX);
        assert_eq!(e.to_type(), (u64::from(u32::MAX) << 32) | 12345);
        assert_eq!(Entity::from_type(e.to_type()), e);
    }

    #[test]
    fn test_null() {
        let null = Entity::<u32>::null();
        assert!(null.is_null());
        assert_eq!(null.to_type(), u32::MAX);
        assert_eq!(Entity::<u32>::from_type(u32::MAX), null);
        assert!(!Entity::<u32>::new(0, 0).is_null());
    }

    #[test]
    fn test_version_wraps_within_bits() {
        let e = Entity::<u32>::new(7, u32::VERSION_MASK);
        let next = e.next_version();
        assert_eq!(next.identifier(), 7);
        assert_eq!(next.version(), 0);
        assert_ne!(e, next);
    }

    #[test]
    fn test_equality_checks_both_fields() {
        assert_eq!(Entity::<u64>::new(3, 1), Entity::<u64>::new(3, 1));
        assert_ne!(Entity::<u64>::new(3, 1), Entity::<u64>::new(3, 2));
        assert_ne!(Entity::<u64>::new(3, 1), Entity::<u64>::new(4, 1));
    }

    #[test]
    fn test_packed_size() {
        assert_eq!(std::mem::size_of::<Entity<u32>>(), 4);
        assert_eq!(std::mem::size_of::<Entity<u64>>(), 8);
    }

    #[test]
    fn test_serde_json() {
        let e = Entity::<u32>::new(42, 3);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, ((3u32 << 22) | 42).to_string());

        let back: Entity<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_serde_rejects_field_form() {
        let json = r#"{"identifier":5000000,"version":4000}"#;
        assert!(serde_json::from_str::<Entity<u32>>(json).is_err());
        assert!(serde_json::from_str::<Entity<u32>>("5000000000").is_err());
    }

    #[test]
    fn test_deserialized_entity_stays_in_layout() {
        for raw in [0u32, 1, u32::IDENTIFIER_MASK, 0xDEAD_BEEF, u32::MAX] {
            let e: Entity<u32> = serde_json::from_str(&raw.to_string()).unwrap();
            assert!(e.identifier() <= u32::IDENTIFIER_MASK);
            assert!(e.version() <= u32::VERSION_MASK);
            assert_eq!(e.to_type(), raw);
            assert_eq!(Entity::new(e.identifier(), e.version()), e);
        }
    }
}
