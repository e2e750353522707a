// A loaded dictionary: the automaton plus the metadata describing its entries.

use std::path::{Path, PathBuf};

use lexfsa_fsa::{AnyFsa, Fsa, FsaFlags};

use crate::DictError;
use crate::metadata::DictionaryMetadata;

/// Extension of the metadata file that accompanies every `.dict` file.
pub const INFO_EXTENSION: &str = "info";

#[derive(Debug)]
pub struct Dictionary {
    fsa: AnyFsa,
    metadata: DictionaryMetadata,
}

impl Dictionary {
    /// Reads a serialized automaton. The format is detected from the stream;
    /// when it disagrees with `metadata` the stream wins.
    pub fn from_bytes(fsa_bytes: &[u8], metadata: DictionaryMetadata) -> Result<Self, DictError> {
        let fsa = AnyFsa::from_bytes(fsa_bytes)?;
        Self::from_fsa(fsa, metadata)
    }

    pub fn from_fsa(fsa: AnyFsa, mut metadata: DictionaryMetadata) -> Result<Self, DictError> {
        metadata.validate()?;
        if let Some(format) = fsa.format() {
            if format != metadata.format {
                log::warn!(
                    "dictionary metadata says {}, automaton is {format}",
                    metadata.format
                );
                metadata.format = format;
            }
        }
        metadata.numbers = fsa.flags().contains(FsaFlags::NUMBERS);
        Ok(Dictionary { fsa, metadata })
    }

    /// Loads `dict_path` and the metadata file next to it.
    pub fn read(dict_path: &Path) -> Result<Self, DictError> {
        let metadata = DictionaryMetadata::read_info(&Self::info_path(dict_path))?;
        let bytes = std::fs::read(dict_path).map_err(|source| DictError::Read {
            path: dict_path.to_path_buf(),
            source,
        })?;
        let dictionary = Self::from_bytes(&bytes, metadata)?;
        log::debug!(
            "loaded {} ({} bytes, {})",
            dict_path.display(),
            bytes.len(),
            dictionary.metadata.format
        );
        Ok(dictionary)
    }

    /// `words.dict` becomes `words.info`.
    pub fn info_path(dict_path: &Path) -> PathBuf {
        dict_path.with_extension(INFO_EXTENSION)
    }

    pub fn fsa(&self) -> &AnyFsa {
        &self.fsa
    }

    pub fn metadata(&self) -> &DictionaryMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::DictionaryCompiler;
    use lexfsa_fsa::FsaFormat;

    fn compiled(metadata: DictionaryMetadata) -> Vec<u8> {
        let mut compiler = DictionaryCompiler::new(metadata).unwrap();
        compiler.add("cats", "cat", "NNS").unwrap();
        compiler.compile().unwrap()
    }

    #[test]
    fn info_path_swaps_extension() {
        assert_eq!(
            Dictionary::info_path(Path::new("dir/words.dict")),
            PathBuf::from("dir/words.info")
        );
    }

    #[test]
    fn stream_format_overrides_metadata() {
        let bytes = compiled(DictionaryMetadata::new().with_format(FsaFormat::Fsa5));
        let dictionary = Dictionary::from_bytes(&bytes, DictionaryMetadata::new()).unwrap();
        assert_eq!(dictionary.metadata().format, FsaFormat::Fsa5);
        assert_eq!(dictionary.fsa().format(), Some(FsaFormat::Fsa5));
    }

    #[test]
    fn numbers_follow_the_stream() {
        let bytes = compiled(DictionaryMetadata::new().with_numbers(true));
        let dictionary = Dictionary::from_bytes(&bytes, DictionaryMetadata::new()).unwrap();
        assert!(dictionary.metadata().numbers);
    }

    #[test]
    fn corrupt_bytes_are_rejected() {
        assert!(matches!(
            Dictionary::from_bytes(b"not an automaton", DictionaryMetadata::new()),
            Err(DictError::Fsa(_))
        ));
    }

    #[test]
    fn missing_files_name_the_path() {
        let path = std::env::temp_dir().join("lexfsa-dict-missing").join("none.dict");
        match Dictionary::read(&path) {
            Err(DictError::Read { path: reported, .. }) => {
                assert_eq!(reported, Dictionary::info_path(&path));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
