//! Binary message codec for Tessel channels.
//!
//! Every message that crosses a channel is a single frame: one tag byte
//! followed by the variant's payload. Payload types implement [`Wire`];
//! the physics collaborator implements it for its own cell and particle
//! types, everything else is provided here.
//!
//! # Messages
//!
//! - [`PeerMessage`] travels between neighboring workers: the one-time
//!   border-cell index map, per-step cell batches, and the two kinds of
//!   particle batches.
//! - [`Problem`] travels from the leader to one worker at distribution.
//! - [`Results`] travels from a worker back to the leader at collection.
//!
//! All I/O uses a custom little-endian codec (no serde dependency).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{decode_frame, encode_frame, Wire};
pub use error::WireError;
pub use message::{PeerMessage, Problem, Results};
