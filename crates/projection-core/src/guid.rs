//! 128-bit identity for interfaces and runtime classes.
//!
//! This module provides [`Guid`], the identity every projected interface is
//! keyed by. Generated tables normally carry literal GUIDs; interfaces that are
//! instantiated from a parameterized definition get an identity derived from
//! their signature string instead:
//!
//! - Same signature = same identity (no registration order dependencies)
//! - Derived ids are stamped with a name-based version so they never collide
//!   with the randomly generated ids of declared interfaces
//!
//! # Examples
//!
//! ```
//! use projection_core::Guid;
//!
//! let id: Guid = "{96369F54-8EB6-48F0-ABCE-C1B211E627C3}".parse().unwrap();
//! assert_eq!(id.to_string(), "{96369F54-8EB6-48F0-ABCE-C1B211E627C3}");
//!
//! let a = Guid::from_signature("pinterface({faa585ea-6214-4217-afda-7f46de5869b3};string)");
//! let b = Guid::from_signature("pinterface({faa585ea-6214-4217-afda-7f46de5869b3};string)");
//! assert_eq!(a, b);
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use xxhash_rust::xxh3::xxh3_128;

/// Domain constants mixed into signature-derived identities.
pub mod guid_constants {
    /// Domain marker for signature-derived interface identities.
    pub const SIGNATURE: u128 = 0x11f47ad5_7b73_42c0_abae_878b1e16adee;

    /// Mask clearing the version nibble (bits 76..80).
    pub const VERSION_MASK: u128 = !(0xF << 76);

    /// Name-based (version 5) marker.
    pub const VERSION_NAME_BASED: u128 = 0x5 << 76;

    /// Mask clearing the two variant bits (bits 62..64).
    pub const VARIANT_MASK: u128 = !(0x3 << 62);

    /// RFC 4122 variant marker.
    pub const VARIANT_RFC4122: u128 = 0x2 << 62;
}

/// A globally unique 128-bit identifier.
///
/// The value is stored most-significant-group first, so the textual form
/// `{D1-D2-D3-D4-D5}` reads the integer from the top down.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Guid(pub u128);

/// Identity of one native interface contract.
pub type InterfaceId = Guid;

impl Guid {
    /// The all-zero identity. Never registered.
    pub const EMPTY: Guid = Guid(0);

    /// Create a GUID from its integer form.
    #[inline]
    pub const fn from_u128(value: u128) -> Self {
        Guid(value)
    }

    /// Create a GUID from the classic `(u32, u16, u16, [u8; 8])` field layout.
    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        let mut value = (data1 as u128) << 96 | (data2 as u128) << 80 | (data3 as u128) << 64;
        let mut i = 0;
        while i < 8 {
            value |= (data4[i] as u128) << (56 - i * 8);
            i += 1;
        }
        Guid(value)
    }

    /// Split the GUID back into its field layout.
    pub const fn to_fields(self) -> (u32, u16, u16, [u8; 8]) {
        let v = self.0;
        let mut data4 = [0u8; 8];
        let mut i = 0;
        while i < 8 {
            data4[i] = (v >> (56 - i * 8)) as u8;
            i += 1;
        }
        ((v >> 96) as u32, (v >> 80) as u16, (v >> 64) as u16, data4)
    }

    /// Derive an identity from a signature string.
    ///
    /// Used for interfaces whose identity is a function of their generic
    /// arguments. The result carries the name-based version nibble and the
    /// RFC 4122 variant bits.
    #[inline]
    pub fn from_signature(signature: &str) -> Self {
        let raw = guid_constants::SIGNATURE ^ xxh3_128(signature.as_bytes());
        let versioned = (raw & guid_constants::VERSION_MASK) | guid_constants::VERSION_NAME_BASED;
        Guid((versioned & guid_constants::VARIANT_MASK) | guid_constants::VARIANT_RFC4122)
    }

    /// Version nibble of the GUID.
    pub const fn version(self) -> u8 {
        ((self.0 >> 76) & 0xF) as u8
    }

    /// Check if this is the empty identity.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:04X}-{:012X}}}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xFFFF_FFFF_FFFF
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

/// Error returned when a GUID string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuidParseError {
    /// The string does not have five dash-separated groups of 8-4-4-4-12 digits.
    #[error("malformed GUID '{0}': expected 8-4-4-4-12 hex groups")]
    Layout(String),

    /// A group contains a non-hex character.
    #[error("malformed GUID '{0}': invalid hex digit")]
    Digit(String),
}

impl FromStr for Guid {
    type Err = GuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = match trimmed.strip_prefix('{') {
            Some(rest) => rest
                .strip_suffix('}')
                .ok_or_else(|| GuidParseError::Layout(s.to_string()))?,
            None => trimmed,
        };

        const LENGTHS: [usize; 5] = [8, 4, 4, 4, 12];
        let groups: Vec<&str> = body.split('-').collect();
        if groups.len() != LENGTHS.len()
            || groups.iter().zip(LENGTHS).any(|(g, len)| g.len() != len)
        {
            return Err(GuidParseError::Layout(s.to_string()));
        }

        let mut value: u128 = 0;
        for group in groups {
            if !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(GuidParseError::Digit(s.to_string()));
            }
            let digits = u64::from_str_radix(group, 16)
                .map_err(|_| GuidParseError::Digit(s.to_string()))?;
            value = (value << (group.len() * 4)) | digits as u128;
        }
        Ok(Guid(value))
    }
}
