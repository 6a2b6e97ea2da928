//! Error types for the wire codec.

use std::fmt;
use std::io;

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug)]
pub enum WireError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// A frame could not be decoded (truncated or corrupt data).
    MalformedFrame {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A message tag is not recognized.
    UnknownTag {
        /// The unrecognized tag.
        tag: u8,
    },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MalformedFrame { detail } => write!(f, "malformed frame: {detail}"),
            Self::UnknownTag { tag } => write!(f, "unknown message tag {tag}"),
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WireError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
