//! Shared building blocks for the lexfsa workspace.
//!
//! - [`ordering`] -- the canonical unsigned byte-wise order used by the
//!   automaton builder and the dictionary compiler
//! - [`encoder`] -- reversible transforms that store a target sequence (a stem)
//!   as a short edit of a source sequence (a word form)

pub mod encoder;
pub mod ordering;

pub use encoder::{EncoderError, EncoderKind, SequenceEncoder};
