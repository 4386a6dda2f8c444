use std::fmt;

use serde::{Deserialize, Serialize};

/// Size of a MIFARE Classic data block.
pub const BLOCK_SIZE: usize = 16;

/// A reader block read returns the data block followed by a 2 byte CRC.
pub const READ_BUFFER_SIZE: usize = BLOCK_SIZE + 2;

/// First data block holding the URL record (sector 1, outside the manufacturer block).
pub const URL_BLOCK: u8 = 4;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UidError {
    #[error("empty UID")]
    Empty,
    #[error("UID is not hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("UID has {0} bytes, expected 4, 7 or 10")]
    InvalidLength(usize),
}

/// ISO14443A tag identifier, shown as uppercase hex without separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(Vec<u8>);

impl Uid {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, UidError> {
        match bytes.len() {
            0 => Err(UidError::Empty),
            4 | 7 | 10 => Ok(Uid(bytes.to_vec())),
            other => Err(UidError::InvalidLength(other)),
        }
    }

    /// Accepts `6b695bde`, `6B:69:5B:DE` or `6B 69 5B DE`.
    pub fn parse(text: &str) -> Result<Self, UidError> {
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();
        if cleaned.is_empty() {
            return Err(UidError::Empty);
        }
        Uid::from_bytes(&hex::decode(cleaned)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Uid {
    type Error = UidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Uid::parse(&value)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    #[serde(rename = "mifare_classic_1k")]
    MifareClassic1K,
    #[serde(rename = "mifare_classic_4k")]
    MifareClassic4K,
    Ntag,
    Unknown,
}

impl TagType {
    pub fn from_sak(sak: u8) -> Self {
        match sak {
            0x00 => TagType::Ntag,
            0x08 => TagType::MifareClassic1K,
            0x18 => TagType::MifareClassic4K,
            _ => TagType::Unknown,
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagType::MifareClassic1K => "MIFARE Classic 1K",
            TagType::MifareClassic4K => "MIFARE Classic 4K",
            TagType::Ntag => "NTAG",
            TagType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
