//! Text encodings for CSV interchange files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Character set used for delimited text files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Charset {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    /// UTF-8 with a leading byte order mark, which spreadsheet tools use to
    /// detect the encoding.
    #[serde(rename = "utf-8-bom", alias = "utf8-bom")]
    Utf8Bom,
    /// ISO-8859-1.
    #[serde(rename = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl Charset {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Bom => "utf-8-bom",
            Self::Latin1 => "latin1",
        }
    }

    /// Encode text into bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Encoding` for a character the charset cannot represent.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Utf8Bom => {
                let mut bytes = Vec::with_capacity(BOM.len() + text.len());
                bytes.extend_from_slice(BOM);
                bytes.extend_from_slice(text.as_bytes());
                Ok(bytes)
            }
            Self::Latin1 => text
                .char_indices()
                .map(|(pos, c)| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        let line = text[..pos].matches('\n').count() + 1;
                        Error::Encoding(format!(
                            "character '{c}' (U+{:04X}) on line {line} cannot be encoded as latin1",
                            u32::from(c)
                        ))
                    })
                })
                .collect(),
        }
    }

    /// Decode bytes into text. A leading UTF-8 byte order mark is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Encoding` if the bytes are not valid UTF-8.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 | Self::Utf8Bom => {
                let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
                String::from_utf8(bytes.to_vec()).map_err(|e| {
                    Error::Encoding(format!(
                        "input is not valid UTF-8 at byte {}",
                        e.utf8_error().valid_up_to()
                    ))
                })
            }
            Self::Latin1 => Ok(bytes.iter().copied().map(char::from).collect()),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-8-bom" | "utf8-bom" | "utf-8-sig" => Ok(Self::Utf8Bom),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(Self::Latin1),
            other => Err(Error::InvalidArgument(format!(
                "unknown charset '{other}' (expected utf-8, utf-8-bom or latin1)"
            ))),
        }
    }
}
