//! NDEF URI record codec.
//!
//! A URI record is stored as a single short well-known record at the start of
//! a tag data block:
//!
//! ```text
//! [0xD1] [0x01] [payload len + 1] ['U'] [prefix code] [payload ...] [0x00 padding]
//! ```
//!
//! The prefix code abbreviates the URL scheme. The image is padded with zeros
//! to a whole number of 16 byte blocks, so short URLs fit in exactly one block.

use std::borrow::Cow;

use deku::prelude::*;
use tracing::{debug, warn};

use crate::nfc::BLOCK_SIZE;

/// MB | ME | SR, TNF = well-known
pub const RECORD_HEADER: u8 = 0xD1;
pub const URI_TYPE_LENGTH: u8 = 0x01;
pub const URI_RECORD_TYPE: u8 = b'U';

/// Header bytes up to and including the prefix code.
pub const HEADER_LEN: usize = 5;

/// Longest payload written to a tag. Longer URLs are cut.
pub const MAX_PAYLOAD_LEN: usize = 30;

const DEFAULT_SCHEME: &str = "https://";

/// Scheme strings indexed by prefix code.
const PREFIX_STRINGS: [&str; 5] = ["", "http://www.", "https://www.", "http://", "https://"];

/// Order matters: the `www.` forms must be tried before their shorter schemes.
const DETECTION_ORDER: [UriPrefix; 4] = [
    UriPrefix::HttpWww,
    UriPrefix::HttpsWww,
    UriPrefix::Http,
    UriPrefix::Https,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("block does not hold an NDEF URI record")]
    NotAUriRecord,
    #[error("record needs {declared} bytes but only {available} are available")]
    Truncated { declared: usize, available: usize },
    #[error("URI payload is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, thiserror::Error)]
pub enum NdefError {
    #[error("payload of {0} bytes does not fit a short record")]
    PayloadOverflow(usize),
    #[error("failed to frame NDEF record: {0}")]
    Frame(#[from] DekuError),
}

/// URI identifier code, the abbreviation byte leading the record payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriPrefix {
    None,
    HttpWww,
    HttpsWww,
    Http,
    Https,
    /// Codes above 4 are accepted when reading and expand to nothing.
    Unknown(u8),
}

impl UriPrefix {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => UriPrefix::None,
            0x01 => UriPrefix::HttpWww,
            0x02 => UriPrefix::HttpsWww,
            0x03 => UriPrefix::Http,
            0x04 => UriPrefix::Https,
            other => UriPrefix::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            UriPrefix::None => 0x00,
            UriPrefix::HttpWww => 0x01,
            UriPrefix::HttpsWww => 0x02,
            UriPrefix::Http => 0x03,
            UriPrefix::Https => 0x04,
            UriPrefix::Unknown(code) => code,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UriPrefix::Unknown(_) => "",
            known => PREFIX_STRINGS[known.code() as usize],
        }
    }

    /// Splits the longest known scheme off `url`.
    pub fn split(url: &str) -> (UriPrefix, &str) {
        for prefix in DETECTION_ORDER {
            if let Some(rest) = url.strip_prefix(prefix.as_str()) {
                return (prefix, rest);
            }
        }
        (UriPrefix::None, url)
    }
}

#[derive(Debug, PartialEq, DekuRead, DekuWrite)]
struct RecordHeader {
    flags: u8,
    type_length: u8,
    payload_length: u8,
    record_type: u8,
    prefix_code: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriRecord {
    prefix: UriPrefix,
    payload: String,
    truncated: bool,
}

impl UriRecord {
    /// Builds a record from user input: trims it, adds `https://` when no
    /// scheme is given and cuts the payload to [`MAX_PAYLOAD_LEN`] bytes.
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim();
        let normalized: Cow<'_, str> = if has_scheme(trimmed) {
            Cow::Borrowed(trimmed)
        } else {
            Cow::Owned(format!("{DEFAULT_SCHEME}{trimmed}"))
        };

        let (prefix, rest) = UriPrefix::split(&normalized);
        let payload = truncate_at_char_boundary(rest, MAX_PAYLOAD_LEN);
        let truncated = payload.len() < rest.len();
        if truncated {
            warn!(
                "URL payload is {} bytes, keeping the first {}",
                rest.len(),
                payload.len()
            );
        }

        UriRecord {
            prefix,
            payload: payload.to_string(),
            truncated,
        }
    }

    pub fn prefix(&self) -> UriPrefix {
        self.prefix
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Value of the record's payload length byte: prefix code plus payload.
    pub fn total_length(&self) -> usize {
        self.payload.len() + 1
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.prefix.as_str(), self.payload)
    }

    /// Serializes the record into a zero padded tag image.
    pub fn to_block(&self) -> Result<Vec<u8>, NdefError> {
        let header = RecordHeader {
            flags: RECORD_HEADER,
            type_length: URI_TYPE_LENGTH,
            payload_length: u8::try_from(self.total_length())
                .map_err(|_e| NdefError::PayloadOverflow(self.payload.len()))?,
            record_type: URI_RECORD_TYPE,
            prefix_code: self.prefix.code(),
        };
        let mut block = header.to_bytes()?;
        block.extend_from_slice(self.payload.as_bytes());
        let padded_len = block.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        block.resize(padded_len, 0);
        Ok(block)
    }

    /// Parses a record from a tag read buffer. Bytes past the record (padding,
    /// reader CRC, following blocks) are ignored.
    pub fn from_block(block: &[u8]) -> Result<Self, DecodeError> {
        if block.len() < HEADER_LEN {
            return Err(DecodeError::Truncated {
                declared: HEADER_LEN,
                available: block.len(),
            });
        }
        let (_rest, header) =
            RecordHeader::from_bytes((block, 0)).map_err(|_e| DecodeError::Truncated {
                declared: HEADER_LEN,
                available: block.len(),
            })?;

        if header.flags != RECORD_HEADER
            || header.type_length != URI_TYPE_LENGTH
            || header.record_type != URI_RECORD_TYPE
            || header.payload_length == 0
        {
            return Err(DecodeError::NotAUriRecord);
        }

        let end = HEADER_LEN + header.payload_length as usize - 1;
        if end > block.len() {
            return Err(DecodeError::Truncated {
                declared: end,
                available: block.len(),
            });
        }

        let payload = String::from_utf8(block[HEADER_LEN..end].to_vec())
            .map_err(|_e| DecodeError::InvalidUtf8)?;

        let prefix = UriPrefix::from_code(header.prefix_code);
        if let UriPrefix::Unknown(code) = prefix {
            debug!("unknown URI prefix code {code:#04x}, reading without prefix");
        }

        Ok(UriRecord {
            prefix,
            payload,
            truncated: false,
        })
    }
}

/// Encodes `url` into a tag image (see [`UriRecord::from_url`]).
pub fn encode(url: &str) -> Result<Vec<u8>, NdefError> {
    UriRecord::from_url(url).to_block()
}

/// Decodes the URL held in a tag image.
pub fn decode(block: &[u8]) -> Result<String, DecodeError> {
    UriRecord::from_block(block).map(|record| record.url())
}

/// True when `url` starts with a URI scheme (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`)
/// followed by `://`.
fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
