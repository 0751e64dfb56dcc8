//! Text representations of binary blobs
use tracing::warn;

use crate::{base64, de::parse_hex_nib, ser::hex};

/// How a sequence of bytes is represented as a JSON string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobEncoding {
    /// Bytes are the string's UTF-8 content, `[0x41, 0x42]` becomes `"AB"`.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD, so such blobs do not survive
    /// a round trip.
    #[default]
    Raw,
    /// Standard alphabet BASE-64 with padding
    Base64,
    /// Two upper-case hexadecimal digits per byte, either case is accepted
    Hex,
}

impl BlobEncoding {
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            BlobEncoding::Raw => match core::str::from_utf8(bytes) {
                Ok(s) => s.to_owned(),
                Err(err) => {
                    warn!(len = bytes.len(), valid_up_to = err.valid_up_to(),
                        "blob is not valid UTF-8, invalid sequences replaced");
                    String::from_utf8_lossy(bytes).into_owned()
                }
            }
            BlobEncoding::Base64 => base64::encode(bytes),
            BlobEncoding::Hex => {
                let mut out = String::with_capacity(bytes.len() * 2);
                for &byte in bytes {
                    out.extend(hex(byte).map(char::from));
                }
                out
            }
        }
    }

    /// Return `None` if `text` is not a valid representation
    pub fn decode(&self, text: &str) -> Option<Vec<u8>> {
        match self {
            BlobEncoding::Raw => Some(text.as_bytes().to_vec()),
            BlobEncoding::Base64 => base64::decode(text),
            BlobEncoding::Hex => {
                let chunks = text.as_bytes().chunks(2);
                chunks.map(|pair| match *pair {
                    [a, b] => Some((parse_hex_nib(a)? << 4) | parse_hex_nib(b)?),
                    _ => None
                }).collect()
            }
        }
    }
}
