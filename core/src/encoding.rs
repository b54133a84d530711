//! Text encodings used by game server tooling
//!
//! Restart scripts and config files on Windows hosts are not reliably UTF-8:
//! PowerShell running under a Chinese locale writes GBK, and hand-edited ini
//! files often keep whatever code page the editor picked. Everything that
//! turns bytes into text goes through [`decode_with_fallback`], which tries a
//! prioritized list of encodings and never substitutes replacement characters.
//!
//! # Example
//!
//! ```rust
//! use gsctl_core::encoding::{decode_with_fallback, TextEncoding, DEFAULT_ENCODINGS};
//!
//! let (text, enc) = decode_with_fallback(b"hello", DEFAULT_ENCODINGS).unwrap();
//! assert_eq!(text, "hello");
//! assert_eq!(enc, TextEncoding::Utf8);
//!
//! // "你好" in GBK
//! let (text, enc) = decode_with_fallback(&[0xC4, 0xE3, 0xBA, 0xC3], DEFAULT_ENCODINGS).unwrap();
//! assert_eq!(text, "你好");
//! assert_eq!(enc, TextEncoding::Gbk);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FileError;

/// Supported text encodings, in the order they are usually tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    #[serde(rename = "gbk", alias = "GBK")]
    Gbk,
}

/// UTF-8 first, then GBK.
pub const DEFAULT_ENCODINGS: &[TextEncoding] = &[TextEncoding::Utf8, TextEncoding::Gbk];

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Gbk => "gbk",
        }
    }

    /// Strict decode: returns `None` if any byte sequence is malformed.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Self::Gbk => encoding_rs::GBK
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|cow| cow.into_owned()),
        }
    }

    /// Encode `text`, refusing characters the encoding cannot represent.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, FileError> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Gbk => {
                let (bytes, _, had_errors) = encoding_rs::GBK.encode(text);
                if had_errors {
                    return Err(FileError::Unencodable {
                        encoding: self.label(),
                    });
                }
                Ok(bytes.into_owned())
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "gbk" => Ok(Self::Gbk),
            other => Err(format!("unsupported encoding '{other}' (expected utf-8 or gbk)")),
        }
    }
}

/// Decode `bytes` with the first encoding in `order` that accepts them.
pub fn decode_with_fallback(bytes: &[u8], order: &[TextEncoding]) -> Option<(String, TextEncoding)> {
    order
        .iter()
        .find_map(|enc| enc.decode(bytes).map(|text| (text, *enc)))
}

/// Render bytes that no encoding accepted, e.g. `\xff\xfe\x00`.
pub fn escape_raw(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}
