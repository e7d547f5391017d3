//! Compact tabular (TOON-style) encoding of JSON documents.
//!
//! The metrics engine treats this module as an external collaborator: it only
//! calls [`Codec::encode`] / [`Codec::decode`] and trusts both to be
//! deterministic. [`ToonCodec`] is the implementation shipped with the crate.
//!
//! ```text
//! components[2]{id,name}:
//!   a,Alice
//!   b,Bob
//! ```

mod decode;
mod encode;

use serde_json::Value;

/// Separator between array values and table cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Pipe,
}

impl Delimiter {
    pub const fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Tab => '\t',
            Self::Pipe => '|',
        }
    }

    /// Suffix written inside an array header bracket. Comma is implicit.
    const fn marker(self) -> &'static str {
        match self {
            Self::Comma => "",
            Self::Tab => "\t",
            Self::Pipe => "|",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub delimiter: Delimiter,
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Comma,
            indent: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Enforce declared array lengths and indentation multiples.
    pub strict: bool,
    pub indent: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict: true,
            indent: 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("document root must be an object, got {0}")]
    UnsupportedRoot(&'static str),
    #[error("indent must be at least 1")]
    InvalidIndent,
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

impl CodecError {
    fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// The boundary the metrics engine talks to.
pub trait Codec {
    /// # Errors
    /// Returns an error if the document cannot be represented.
    fn encode(&self, doc: &Value) -> Result<String, CodecError>;

    /// # Errors
    /// Returns an error if `text` is not valid compact output.
    fn decode(&self, text: &str) -> Result<Value, CodecError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToonCodec {
    pub encode: EncodeOptions,
    pub decode: DecodeOptions,
}

impl ToonCodec {
    /// Codec whose decoder expects the indentation the encoder produces.
    pub const fn with_options(encode: EncodeOptions) -> Self {
        Self {
            encode,
            decode: DecodeOptions {
                strict: true,
                indent: encode.indent,
            },
        }
    }
}

impl Codec for ToonCodec {
    fn encode(&self, doc: &Value) -> Result<String, CodecError> {
        encode::encode(doc, &self.encode)
    }

    fn decode(&self, text: &str) -> Result<Value, CodecError> {
        decode::decode(text, &self.decode)
    }
}

/// Outcome of encoding a document and decoding it back.
#[derive(Debug, PartialEq)]
pub enum RoundTrip {
    Lossless,
    Mismatch { decoded: Value },
}

/// Encode `doc`, decode the result, and compare against the original.
///
/// # Errors
/// Returns the codec error if either direction fails.
pub fn round_trip(codec: &impl Codec, doc: &Value) -> Result<RoundTrip, CodecError> {
    let text = codec.encode(doc)?;
    let decoded = codec.decode(&text)?;
    if &decoded == doc {
        Ok(RoundTrip::Lossless)
    } else {
        Ok(RoundTrip::Mismatch { decoded })
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// True when `s` would read back as something other than itself if left bare.
fn is_ambiguous_literal(s: &str) -> bool {
    matches!(s, "true" | "false" | "null") || serde_json::from_str::<serde_json::Number>(s).is_ok()
}
