/*++

Licensed under the Apache-2.0 license.

File Name:

   serial.rs

Abstract:

    Serial-length header codec for certificate authority records.

    A record starts with a 16-bit big-endian word. When its top two bits
    are set the word is a header carrying `len - 4` in its low seven bits
    and the serial follows it. Any other value is not a header at all: it
    is the first two bytes of a 4-byte serial.

--*/

use sidewalk_prov_error::{ProvError, ProvResult};

pub const CA_SERIAL_MIN_SIZE: usize = 4;
pub const CA_SERIAL_MAX_SIZE: usize = SERIAL_EXT_LEN_MASK as usize + CA_SERIAL_MIN_SIZE;
pub const SERIAL_HEADER_SIZE: usize = 2;

pub const SERIAL_EXT_MARKER: u16 = 0xC000;
pub const SERIAL_EXT_MARKER_MASK: u16 = 0xC000;
pub const SERIAL_EXT_LEN_MASK: u16 = 0x007F;

/// How a serial number is laid out on the wire
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SerialEncoding {
    /// Minimum-length serial, no header consumed
    Inline,

    /// Two-byte header followed by `len` serial bytes
    Extended { len: usize },
}

impl SerialEncoding {
    /// Decode the leading big-endian word of a record
    pub fn decode(word: u16) -> Self {
        if word & SERIAL_EXT_MARKER_MASK == SERIAL_EXT_MARKER {
            SerialEncoding::Extended {
                len: (word & SERIAL_EXT_LEN_MASK) as usize + CA_SERIAL_MIN_SIZE,
            }
        } else {
            SerialEncoding::Inline
        }
    }

    /// Pick the encoding for a serial about to be written
    pub fn for_serial(serial: &[u8]) -> ProvResult<Self> {
        if !(CA_SERIAL_MIN_SIZE..=CA_SERIAL_MAX_SIZE).contains(&serial.len()) {
            return Err(ProvError::INVALID_ARGS);
        }
        // A minimum-length serial can go inline unless its first word would
        // read back as an extended header.
        let first = u16::from_be_bytes([serial[0], serial[1]]);
        if serial.len() == CA_SERIAL_MIN_SIZE && Self::decode(first) == SerialEncoding::Inline {
            Ok(SerialEncoding::Inline)
        } else {
            Ok(SerialEncoding::Extended { len: serial.len() })
        }
    }

    pub fn header_len(self) -> usize {
        match self {
            SerialEncoding::Inline => 0,
            SerialEncoding::Extended { .. } => SERIAL_HEADER_SIZE,
        }
    }

    pub fn serial_len(self) -> usize {
        match self {
            SerialEncoding::Inline => CA_SERIAL_MIN_SIZE,
            SerialEncoding::Extended { len } => len,
        }
    }

    /// Bytes this encoding occupies in front of the public key
    pub fn encoded_len(self) -> usize {
        self.header_len() + self.serial_len()
    }
}

/// Write `serial` in wire form into `out`, returning the bytes written.
pub fn encode_serial(serial: &[u8], out: &mut [u8]) -> ProvResult<usize> {
    let encoding = SerialEncoding::for_serial(serial)?;
    let out = out
        .get_mut(..encoding.encoded_len())
        .ok_or(ProvError::INVALID_ARGS)?;
    let (header, body) = out.split_at_mut(encoding.header_len());
    if let SerialEncoding::Extended { len } = encoding {
        let word = SERIAL_EXT_MARKER | (len - CA_SERIAL_MIN_SIZE) as u16;
        header.copy_from_slice(&word.to_be_bytes());
    }
    body.copy_from_slice(serial);
    Ok(encoding.encoded_len())
}
