// Word lookups against a compiled dictionary.

use std::fmt;

use lexfsa_core::SequenceEncoder;
use lexfsa_fsa::{AnyFsa, ByteSequenceIter, Fsa, FsaTraversal};

use crate::DictError;
use crate::dictionary::Dictionary;

/// One dictionary entry for a looked-up word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WordData {
    word: Vec<u8>,
    stem: Vec<u8>,
    tag: Vec<u8>,
}

impl WordData {
    pub fn word(&self) -> &[u8] {
        &self.word
    }

    pub fn stem(&self) -> &[u8] {
        &self.stem
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }
}

impl fmt::Display for WordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            String::from_utf8_lossy(&self.word),
            String::from_utf8_lossy(&self.stem),
            String::from_utf8_lossy(&self.tag)
        )
    }
}

/// Read-only query interface over a [`Dictionary`].
///
/// Holds no mutable state, so one lookup can be shared between threads.
pub struct DictionaryLookup<'a> {
    dictionary: &'a Dictionary,
    traversal: FsaTraversal<'a, AnyFsa>,
}

impl<'a> DictionaryLookup<'a> {
    pub fn new(dictionary: &'a Dictionary) -> Self {
        DictionaryLookup {
            dictionary,
            traversal: FsaTraversal::new(dictionary.fsa()),
        }
    }

    pub fn dictionary(&self) -> &'a Dictionary {
        self.dictionary
    }

    /// All entries of `word`, in automaton (byte-wise) order of their encoded
    /// stem and tag. Unknown words give an empty list.
    pub fn lookup(&self, word: impl AsRef<[u8]>) -> Result<Vec<WordData>, DictError> {
        let word = word.as_ref();
        let separator = self.dictionary.metadata().separator;
        if word.contains(&separator) {
            return Ok(Vec::new());
        }

        let fsa = self.dictionary.fsa();
        let mut key = Vec::with_capacity(word.len() + 1);
        key.extend_from_slice(word);
        key.push(separator);
        let Some(node) = self.traversal.walk(fsa.root_node(), &key) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        let mut payloads = ByteSequenceIter::new(fsa, node);
        while let Some(payload) = payloads.advance() {
            let (encoded, tag) = self.split_payload(payload)?;
            found.push(WordData {
                word: word.to_vec(),
                stem: self.decode_stem(word, encoded)?,
                tag: tag.to_vec(),
            });
        }
        log::trace!(
            "{:?}: {} entries",
            String::from_utf8_lossy(word),
            found.len()
        );
        Ok(found)
    }

    /// Applies an encoded stem instruction to `word`.
    pub fn decode_stem(&self, word: &[u8], encoded: &[u8]) -> Result<Vec<u8>, DictError> {
        Ok(self.dictionary.metadata().encoder.decode(word, encoded)?)
    }

    // Splits `encoded SEP tag`. The count bytes at the front of the
    // instruction may take any value, so the search starts after them.
    fn split_payload<'p>(&self, payload: &'p [u8]) -> Result<(&'p [u8], &'p [u8]), DictError> {
        let metadata = self.dictionary.metadata();
        let skip = metadata.encoder.instruction_len().min(payload.len());
        payload[skip..]
            .iter()
            .position(|&b| b == metadata.separator)
            .map(|at| {
                let (encoded, rest) = payload.split_at(skip + at);
                (encoded, &rest[1..])
            })
            .ok_or_else(|| DictError::MalformedEntry(String::from_utf8_lossy(payload).into_owned()))
    }
}
