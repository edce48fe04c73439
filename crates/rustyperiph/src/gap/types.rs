use crate::buffer::FixedByteBuffer;
use crate::error::{AddressParseError, BufferError};
use crate::gap::constants::*;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;

/// 48-bit device address.
///
/// Bytes are stored least-significant first, the order used on the air, so
/// `"AA:BB:CC:DD:EE:FF"` is held as `[0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdAddr {
    pub bytes: [u8; BD_ADDR_LEN],
}

impl BdAddr {
    pub const fn new(bytes: [u8; BD_ADDR_LEN]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() >= BD_ADDR_LEN {
            let mut bytes = [0u8; BD_ADDR_LEN];
            bytes.copy_from_slice(&slice[0..BD_ADDR_LEN]);
            Some(Self { bytes })
        } else {
            None
        }
    }

    /// Reads an address out of `buffer` starting at `index`
    pub fn from_buffer(buffer: &FixedByteBuffer, index: usize) -> Result<Self, BufferError> {
        let raw = buffer.get(index, BD_ADDR_LEN)?;
        let mut bytes = [0u8; BD_ADDR_LEN];
        bytes.copy_from_slice(raw);
        Ok(Self { bytes })
    }

    /// Generates an address from random bytes
    pub fn random() -> Self {
        let mut bytes = [0u8; BD_ADDR_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Last characters of the colon-hex form, e.g. `"EE:FF"`
    pub fn to_short_string(&self) -> String {
        let full = self.to_string();
        full[full.len() - BD_ADDR_SHORT_STRING_LEN..].to_string()
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[5],
            self.bytes[4],
            self.bytes[3],
            self.bytes[2],
            self.bytes[1],
            self.bytes[0]
        )
    }
}

impl FromStr for BdAddr {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != BD_ADDR_STRING_LEN {
            return Err(AddressParseError::InvalidLength(s.len()));
        }
        // Colons sit between each pair of hex digits
        let separators_ok = s
            .bytes()
            .enumerate()
            .all(|(i, b)| (b == b':') == (i % 3 == 2));
        if !separators_ok {
            return Err(AddressParseError::InvalidSeparators);
        }

        let digits: String = s.chars().filter(|c| *c != ':').collect();
        let mut bytes = [0u8; BD_ADDR_LEN];
        hex::decode_to_slice(&digits, &mut bytes)?;
        bytes.reverse();

        Ok(Self { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_round_trip() {
        let addr: BdAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(addr.bytes, [0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(addr.to_string(), "AA:BB:CC:DD:EE:FF");

        // Lowercase input formats back as uppercase
        let addr: BdAddr = "0a:1b:2c:3d:4e:5f".parse().unwrap();
        assert_eq!(addr.to_string(), "0A:1B:2C:3D:4E:5F");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        // Four colons, padded to the right length
        assert_eq!(
            "AA:BB:CC:DD:EEFF0".parse::<BdAddr>(),
            Err(AddressParseError::InvalidSeparators)
        );
        assert_eq!(
            "AA:BB:CC:DD:EE".parse::<BdAddr>(),
            Err(AddressParseError::InvalidLength(14))
        );
        assert!(matches!(
            "AA:BB:CC:DD:EE:GG".parse::<BdAddr>(),
            Err(AddressParseError::InvalidHex(_))
        ));
        assert_eq!(
            "AA-BB-CC-DD-EE-FF".parse::<BdAddr>(),
            Err(AddressParseError::InvalidSeparators)
        );
    }

    #[test]
    fn test_short_string() {
        let addr = BdAddr::new([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(addr.to_short_string(), "55:66");
    }

    #[test]
    fn test_from_buffer() {
        let buffer = FixedByteBuffer::from_slice(&[0x00, 1, 2, 3, 4, 5, 6]);
        let addr = BdAddr::from_buffer(&buffer, 1).unwrap();
        assert_eq!(addr.bytes, [1, 2, 3, 4, 5, 6]);
        assert!(BdAddr::from_buffer(&buffer, 2).is_err());
        assert_eq!(BdAddr::from_slice(&[1, 2, 3]), None);
    }
}
