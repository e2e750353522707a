//! Minimal deterministic acyclic automata over byte sequences.
//!
//! This crate builds a minimal automaton from a sorted list of byte
//! sequences, traverses it, and persists it in two binary formats.
//!
//! # Architecture
//!
//! - [`flags`] -- capability bits carried by automata and codecs
//! - [`fsa`] -- the read-only [`Fsa`] traversal contract and sequence iteration
//! - [`memory`] -- the in-memory automaton produced by the builder
//! - [`registry`] -- state signatures used for suffix sharing
//! - [`builder`] -- incremental construction of a minimal automaton
//! - [`traversal`] -- matching, ranking (perfect hashing) and unranking
//! - [`analysis`] -- right-language counts, statistics, correctness checks
//! - [`codec`] -- FSA5 and CFSA2 serializers and readers

pub mod analysis;
pub mod builder;
pub mod codec;
pub mod flags;
pub mod fsa;
pub mod memory;
pub mod registry;
pub mod traversal;

pub use analysis::{FsaInfo, RightLanguage, Violation, check_correct, check_minimal};
pub use builder::{
    BuildStats, BuilderOptions, DuplicatePolicy, EmptyPolicy, FsaBuilder, build_fsa, build_fsa_with,
};
pub use codec::{
    AnyFsa, Cfsa2, Cfsa2Serializer, Codec, Fsa5, Fsa5Serializer, FsaFormat, FsaSerializer, Progress,
    SerializerConfig,
};
pub use flags::FsaFlags;
pub use fsa::{ArcId, ByteSequenceIter, Fsa, NO_ARC, NodeId, TERMINAL_NODE};
pub use memory::MemoryFsa;
pub use traversal::{FsaTraversal, MatchResult};

/// Error type for building, serializing and reading automata.
#[derive(Debug, thiserror::Error)]
pub enum FsaError {
    #[error(
        "input out of order: {:?} came before {:?}",
        String::from_utf8_lossy(.previous),
        String::from_utf8_lossy(.current)
    )]
    InputOrder { previous: Vec<u8>, current: Vec<u8> },
    #[error("duplicate input sequence: {:?}", String::from_utf8_lossy(.0))]
    DuplicateInput(Vec<u8>),
    #[error("empty input sequence at position {0}")]
    EmptyInput(usize),
    #[error("{format} does not support {capability}")]
    UnsupportedCapability {
        format: FsaFormat,
        capability: FsaFlags,
    },
    #[error("corrupt stream at offset {offset}: expected {expected}, found {found}")]
    CorruptStream {
        offset: usize,
        expected: String,
        found: String,
    },
    #[error("address {value} does not fit in {max_bytes} bytes")]
    AddressOverflow { value: u64, max_bytes: usize },
    #[error("right language of node {node} has more than {} sequences", u64::MAX)]
    CountOverflow { node: NodeId },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsaError {
    pub(crate) fn corrupt(
        offset: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        FsaError::CorruptStream {
            offset,
            expected: expected.into(),
            found: found.into(),
        }
    }
}
