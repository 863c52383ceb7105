//! Value model for Vale.
//!
//! This crate provides the immutable, structurally shared value type that the
//! codec serializes and the resolver addresses. Every other Vale crate depends
//! on `vale-types`.
//!
//! # Key Types
//!
//! - [`Value`] -- a blob of bytes or an ordered list of child values
//! - [`ContentHash`] -- 32-byte digest used as a content address
//! - [`Declaration`] -- an `(id, value)` pair, the unit of the wire stream

pub mod declaration;
pub mod error;
pub mod hash;
pub mod value;

pub use declaration::Declaration;
pub use error::TypeError;
pub use hash::ContentHash;
pub use value::{Content, Value};
