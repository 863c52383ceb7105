//! Binary value codec for Vale.
//!
//! Encodes a [`Value`](vale_types::Value) graph into a stream of declarations
//! and decodes it back, preserving structural sharing: a value reachable
//! through several edges is written once and referenced by id afterwards.
//!
//! # Wire format
//!
//! Big-endian throughout. A stream is a concatenation of declarations, each an
//! 8-byte id followed by one expression; the last declaration is the root.
//!
//! | Expression | Layout |
//! |---|---|
//! | Blob | tag `1` (4 bytes), length (8), bytes, zero padding to a multiple of 4 |
//! | List | tag `3` (4 bytes), count (8), `count` nested expressions |
//! | Reference | tag `4` (4 bytes), id of an earlier declaration (8) |
//!
//! # Declaration order
//!
//! The encoder declares every value with two or more incoming edges: shared
//! blobs first by ascending length, then shared lists by ascending node count,
//! ties broken by height and then digest. The root always comes last. Ids
//! count up from a caller-supplied offset so several streams can share one id
//! space.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod tag;

pub use decoder::{decode_root, decode_sequence, Decoder};
pub use encoder::{encode, encode_to, encode_with_offset, shared_values, EncodeSummary};
pub use error::{CodecError, CodecResult};
pub use tag::Tag;
