//! Four-character pixel format codes as reported by capture devices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit set on big-endian variants of a little-endian format code.
const BIG_ENDIAN_FLAG: u32 = 1 << 31;

/// Opaque device pixel-format code.
///
/// Packed the way V4L2 packs them: the first character lands in the lowest
/// byte. Big-endian variants of a format share its characters and set bit 31.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FourCc(pub u32);

impl FourCc {
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(
            code[0] as u32
                | (code[1] as u32) << 8
                | (code[2] as u32) << 16
                | (code[3] as u32) << 24,
        )
    }

    pub const fn new_be(code: &[u8; 4]) -> Self {
        Self(Self::new(code).0 | BIG_ENDIAN_FLAG)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }

    pub const fn is_big_endian(self) -> bool {
        self.0 & BIG_ENDIAN_FLAG != 0
    }

    /// The four characters, without the big-endian flag.
    pub fn chars(self) -> [u8; 4] {
        let raw = self.0 & !BIG_ENDIAN_FLAG;
        raw.to_le_bytes()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.chars() {
            let c = if c.is_ascii_graphic() || c == b' ' {
                c as char
            } else {
                '.'
            };
            write!(f, "{c}")?;
        }
        if self.is_big_endian() {
            f.write_str("-BE")?;
        }
        Ok(())
    }
}

impl From<u32> for FourCc {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
