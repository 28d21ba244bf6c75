//! [`Guid`] implementation, according to MS-DTYP 2.3.4.

use std::{fmt, str::FromStr};

use binrw::prelude::*;
use rand::{RngCore, rngs::OsRng};

/// A standard, 16-byte GUID.
///
/// The first three groups are stored little-endian on the wire,
/// the last 8 bytes are stored as-is.
#[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[brw(little)]
pub struct Guid(u32, u16, u16, [u8; 8]);

/// Failure to parse a textual GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidParseError {
    /// The string is neither 36 characters long, nor 38 with braces.
    InvalidLength(usize),
    /// A dash is missing or a character is not a hex digit.
    InvalidFormat,
}

impl fmt::Display for GuidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuidParseError::InvalidLength(len) => write!(f, "Invalid GUID length {len}"),
            GuidParseError::InvalidFormat => write!(f, "Invalid GUID format"),
        }
    }
}

impl std::error::Error for GuidParseError {}

const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Guid {
    /// The size of a GUID, in bytes.
    pub const SIZE: usize = 16;
    const _VALIDATE_SIZE_OF: [u8; Self::SIZE] = [0; size_of::<Self>()];

    pub const ZERO: Guid = Guid(0, 0, 0, [0; 8]);

    /// Generates a new random (version 4) GUID.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::SIZE];
        OsRng.fill_bytes(&mut bytes);
        // Version 4, RFC 4122 variant.
        bytes[7] = (bytes[7] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        Self::from_bytes(bytes)
    }

    /// Builds a GUID from its 16 wire bytes.
    pub const fn from_bytes(b: [u8; 16]) -> Self {
        Guid(
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
            u16::from_le_bytes([b[6], b[7]]),
            [b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]],
        )
    }

    /// Returns the 16 wire bytes of this GUID.
    pub const fn to_bytes(&self) -> [u8; 16] {
        let a = self.0.to_le_bytes();
        let b = self.1.to_le_bytes();
        let c = self.2.to_le_bytes();
        let d = self.3;
        [
            a[0], a[1], a[2], a[3], b[0], b[1], c[0], c[1], d[0], d[1], d[2], d[3], d[4], d[5],
            d[6], d[7],
        ]
    }

    /// Parses the `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` form, optionally in braces.
    ///
    /// Usable in const context; see [`make_guid!`][crate::make_guid].
    pub const fn parse(s: &str) -> Result<Guid, GuidParseError> {
        let b = s.as_bytes();
        let start = if b.len() == 38 && b[0] == b'{' && b[37] == b'}' {
            1
        } else if b.len() == 36 {
            0
        } else {
            return Err(GuidParseError::InvalidLength(b.len()));
        };

        let mut text = [0u8; 16];
        let mut i = 0;
        let mut out = 0;
        while i < 36 {
            let c = b[start + i];
            if i == 8 || i == 13 || i == 18 || i == 23 {
                if c != b'-' {
                    return Err(GuidParseError::InvalidFormat);
                }
                i += 1;
                continue;
            }
            match (hex_value(c), hex_value(b[start + i + 1])) {
                (Some(hi), Some(lo)) => text[out] = (hi << 4) | lo,
                _ => return Err(GuidParseError::InvalidFormat),
            }
            out += 1;
            i += 2;
        }

        Ok(Guid(
            u32::from_be_bytes([text[0], text[1], text[2], text[3]]),
            u16::from_be_bytes([text[4], text[5]]),
            u16::from_be_bytes([text[6], text[7]]),
            [
                text[8], text[9], text[10], text[11], text[12], text[13], text[14], text[15],
            ],
        ))
    }
}

/// Creates a [`Guid`] from a string literal at compile time.
///
/// ```
/// # use smb2_dtyp::*;
/// let guid = make_guid!("{c12e0ddf-43dd-11f0-8b87-000c29801682}");
/// assert_eq!(guid.to_string(), "c12e0ddf-43dd-11f0-8b87-000c29801682");
/// ```
#[macro_export]
macro_rules! make_guid {
    ($s:literal) => {
        const {
            match $crate::guid::Guid::parse($s) {
                Ok(guid) => guid,
                Err(_) => panic!("Invalid GUID literal"),
            }
        }
    };
}

impl From<[u8; 16]> for Guid {
    fn from(value: [u8; 16]) -> Self {
        Self::from_bytes(value)
    }
}

impl From<Guid> for [u8; 16] {
    fn from(value: Guid) -> Self {
        value.to_bytes()
    }
}

impl FromStr for Guid {
    type Err = GuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Guid::parse(s)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}-{:04x}-{:04x}-", self.0, self.1, self.2)?;
        for (i, byte) in self.3.iter().enumerate() {
            if i == 2 {
                write!(f, "-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
