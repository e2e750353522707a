//! Morphological dictionaries stored in a minimal automaton.
//!
//! Every entry `(word, stem, tag)` becomes one sequence
//! `word SEP encode(word, stem) SEP tag` of an automaton, so all forms that
//! share a prefix or an inflection pattern share states.
//!
//! - [`metadata`] -- separator, encoder and format settings, `.info` files
//! - [`compiler`] -- turns entries into a serialized automaton
//! - [`dictionary`] -- a loaded automaton together with its metadata
//! - [`lookup`] -- word to `(stem, tag)` queries

use std::path::PathBuf;

use lexfsa_core::EncoderError;
use lexfsa_fsa::FsaError;

pub mod compiler;
pub mod dictionary;
pub mod lookup;
pub mod metadata;

pub use compiler::DictionaryCompiler;
pub use dictionary::Dictionary;
pub use lookup::{DictionaryLookup, WordData};
pub use metadata::DictionaryMetadata;

/// Error type for compiling, loading and querying dictionaries.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("automaton error: {0}")]
    Fsa(#[from] FsaError),
    #[error("stem encoding error: {0}")]
    Encoder(#[from] EncoderError),
    #[error("invalid separator {0:#04x}: expected a printable ASCII character")]
    InvalidSeparator(u8),
    #[error("{field} {value:?} contains the separator {separator:?}")]
    SeparatorInInput {
        field: &'static str,
        value: String,
        separator: char,
    },
    #[error("metadata line {line}: {message}")]
    Metadata { line: usize, message: String },
    #[error("missing metadata key: {0}")]
    MissingKey(&'static str),
    #[error("malformed dictionary entry: {0:?}")]
    MalformedEntry(String),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
