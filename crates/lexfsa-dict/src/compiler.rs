// Dictionary compilation: (word, stem, tag) entries to a serialized automaton.

use std::io::Write;
use std::path::Path;

use lexfsa_core::SequenceEncoder;
use lexfsa_core::ordering::sort_and_dedup;
use lexfsa_fsa::{Codec, FsaSerializer, MemoryFsa, build_fsa};

use crate::DictError;
use crate::dictionary::Dictionary;
use crate::metadata::DictionaryMetadata;

/// Collects dictionary entries and compiles them into an automaton.
///
/// Entries may be added in any order; duplicates collapse into one sequence.
///
/// ```
/// use lexfsa_dict::{Dictionary, DictionaryCompiler, DictionaryLookup, DictionaryMetadata};
///
/// let mut compiler = DictionaryCompiler::new(DictionaryMetadata::new()).unwrap();
/// compiler.add("mice", "mouse", "NNS").unwrap();
/// compiler.add("mouse", "mouse", "NN").unwrap();
/// let metadata = *compiler.metadata();
/// let bytes = compiler.compile().unwrap();
///
/// let dictionary = Dictionary::from_bytes(&bytes, metadata).unwrap();
/// let lookup = DictionaryLookup::new(&dictionary);
/// let found = lookup.lookup(b"mice").unwrap();
/// assert_eq!(found[0].stem(), b"mouse");
/// ```
#[derive(Debug)]
pub struct DictionaryCompiler {
    metadata: DictionaryMetadata,
    sequences: Vec<Vec<u8>>,
    encoded: Vec<u8>,
}

impl DictionaryCompiler {
    pub fn new(metadata: DictionaryMetadata) -> Result<Self, DictError> {
        metadata.validate()?;
        Ok(DictionaryCompiler {
            metadata,
            sequences: Vec::new(),
            encoded: Vec::new(),
        })
    }

    pub fn metadata(&self) -> &DictionaryMetadata {
        &self.metadata
    }

    /// Number of entries added so far, duplicates included.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Adds one entry. The word and the stem must not contain the separator;
    /// the tag may.
    pub fn add(
        &mut self,
        word: impl AsRef<[u8]>,
        stem: impl AsRef<[u8]>,
        tag: impl AsRef<[u8]>,
    ) -> Result<(), DictError> {
        let (word, stem, tag) = (word.as_ref(), stem.as_ref(), tag.as_ref());
        let separator = self.metadata.separator;
        for (field, value) in [("word", word), ("stem", stem)] {
            if value.contains(&separator) {
                return Err(DictError::SeparatorInInput {
                    field,
                    value: String::from_utf8_lossy(value).into_owned(),
                    separator: char::from(separator),
                });
            }
        }

        self.metadata.encoder.encode_into(word, stem, &mut self.encoded);
        let mut sequence = Vec::with_capacity(word.len() + self.encoded.len() + tag.len() + 2);
        sequence.extend_from_slice(word);
        sequence.push(separator);
        sequence.extend_from_slice(&self.encoded);
        sequence.push(separator);
        sequence.extend_from_slice(tag);
        self.sequences.push(sequence);
        Ok(())
    }

    /// Builds the in-memory automaton without serializing it.
    pub fn build(self) -> Result<MemoryFsa, DictError> {
        let entries = self.sequences.len();
        let sequences = sort_and_dedup(self.sequences);
        log::debug!(
            "compiling {} sequences ({} duplicates dropped)",
            sequences.len(),
            entries - sequences.len()
        );
        Ok(build_fsa(&sequences)?)
    }

    /// Builds the automaton and writes it in the configured format.
    pub fn compile_to<W: Write>(self, out: W) -> Result<W, DictError> {
        let metadata = self.metadata;
        let fsa = self.build()?;
        let mut codec = Codec::new(metadata.format);
        if metadata.numbers {
            codec = codec.with_numbers()?;
        }
        Ok(codec.serialize(&fsa, out)?)
    }

    pub fn compile(self) -> Result<Vec<u8>, DictError> {
        self.compile_to(Vec::new())
    }

    /// Writes the automaton to `dict_path` and the metadata next to it (see
    /// [`Dictionary::info_path`]).
    pub fn compile_to_path(self, dict_path: &Path) -> Result<(), DictError> {
        let metadata = self.metadata;
        let bytes = self.compile()?;
        std::fs::write(dict_path, &bytes)?;
        metadata.write_info(&Dictionary::info_path(dict_path))?;
        log::debug!("wrote {} bytes to {}", bytes.len(), dict_path.display());
        Ok(())
    }
}
