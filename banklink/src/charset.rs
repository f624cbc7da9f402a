//! Target charsets.
//!
//! Most banks still expect ISO-8859-1 forms. Values are kept as Rust strings
//! throughout; [`Charset::transliterate`] restricts them to the charset's
//! repertoire and [`Charset::encode`] produces the bytes that get signed.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::ConfigurationError;

/// Character used for characters the target charset cannot represent.
pub const SUBSTITUTE: char = '?';

/// Labels that name windows-1252 itself rather than ISO-8859-1.
///
/// The WHATWG registry used by `encoding_rs` maps the ISO-8859-1 labels to
/// windows-1252 as well, which would let C1-range characters such as `Š` and
/// `€` through as 0x80..=0x9F bytes.
const WINDOWS_1252_LABELS: &[&str] = &["windows-1252", "cp1252", "x-cp1252"];

/// A named target charset.
#[derive(Clone)]
pub struct Charset {
    label: String,
    encoding: &'static Encoding,
    latin1: bool,
}

impl Charset {
    /// Default charset label.
    pub const DEFAULT_LABEL: &'static str = "utf-8";

    /// The UTF-8 charset.
    #[must_use]
    pub fn utf8() -> Self {
        Self {
            label: Self::DEFAULT_LABEL.to_owned(),
            encoding: UTF_8,
            latin1: false,
        }
    }

    /// Resolves a charset from its label, keeping the label as written.
    ///
    /// The label is what gets reported to the bank (e.g. in `VK_CHARSET`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownCharset`] if the label is not a
    /// known encoding name.
    pub fn from_label(label: &str) -> Result<Self, ConfigurationError> {
        let normalized = label.trim().to_ascii_lowercase();
        let encoding = Encoding::for_label(normalized.as_bytes())
            .ok_or_else(|| ConfigurationError::UnknownCharset(label.to_owned()))?;
        let latin1 =
            encoding == WINDOWS_1252 && !WINDOWS_1252_LABELS.contains(&normalized.as_str());
        Ok(Self {
            label: label.to_owned(),
            encoding,
            latin1,
        })
    }

    /// Returns the label as configured.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` if this is UTF-8.
    #[must_use]
    pub fn is_utf8(&self) -> bool {
        self.encoding == UTF_8
    }

    /// Returns `true` if this is ISO-8859-1 proper: one byte per character,
    /// code points up to U+00FF only.
    #[must_use]
    pub const fn is_latin1(&self) -> bool {
        self.latin1
    }

    /// Returns `true` if `ch` is representable in this charset.
    #[must_use]
    pub fn can_encode(&self, ch: char) -> bool {
        if self.is_utf8() {
            return true;
        }
        if self.latin1 {
            return ch <= '\u{FF}';
        }
        let mut buf = [0_u8; 4];
        let (_, _, unmappable) = self.encoding.encode(ch.encode_utf8(&mut buf));
        !unmappable
    }

    /// Replaces every character the charset cannot represent with
    /// [`SUBSTITUTE`].
    #[must_use]
    pub fn transliterate<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if self.is_utf8() || value.is_ascii() {
            return Cow::Borrowed(value);
        }
        let out: String = value
            .chars()
            .map(|ch| if self.can_encode(ch) { ch } else { SUBSTITUTE })
            .collect();
        Cow::Owned(out)
    }

    /// Encodes a value into the charset's bytes.
    #[must_use]
    pub fn encode<'a>(&self, value: &'a str) -> Cow<'a, [u8]> {
        if self.is_utf8() {
            return Cow::Borrowed(value.as_bytes());
        }
        let transliterated = self.transliterate(value);
        if self.latin1 {
            let bytes = transliterated
                .chars()
                .map(|ch| u8::try_from(ch).unwrap_or(b'?'))
                .collect();
            return Cow::Owned(bytes);
        }
        let (bytes, _, _) = self.encoding.encode(&transliterated);
        Cow::Owned(bytes.into_owned())
    }

    /// Length of a value in the charset's bytes.
    #[must_use]
    pub fn byte_len(&self, value: &str) -> usize {
        if self.is_utf8() || value.is_ascii() {
            value.len()
        } else if self.latin1 {
            value.chars().count()
        } else {
            self.encode(value).len()
        }
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset")
            .field(&self.label)
            .field(&if self.latin1 { "ISO-8859-1" } else { self.encoding.name() })
            .finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.encoding == other.encoding && self.latin1 == other.latin1
    }
}

impl Eq for Charset {}
