use std::fmt;
use std::str::FromStr;

const SEPARATORS: [char; 2] = [':', '-'];
const HEX_DIGITS: usize = 12;

/// A 6-byte physical network address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HardwareAddress([u8; 6]);

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Invalid hardware address {0:?}, expected 12 hex digits")]
    InvalidAddress(String),
}

impl HardwareAddress {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for HardwareAddress {
    type Err = Error;

    /// Parses `xx:xx:xx:xx:xx:xx`, `xx-xx-xx-xx-xx-xx`, or bare hex. Separators
    /// may be mixed and are all removed before decoding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| !SEPARATORS.contains(c)).collect();
        if digits.len() != HEX_DIGITS || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        let mut bytes = [0u8; 6];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = u8::from_str_radix(&digits[2 * i..2 * i + 2], 16)
                .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl From<[u8; 6]> for HardwareAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}
