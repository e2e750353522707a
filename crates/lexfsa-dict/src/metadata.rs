// Dictionary metadata and its `.info` representation.
//
// The `.info` file is a list of `key=value` lines. Blank lines and lines
// starting with `#` are ignored, as are unknown keys (with a warning).

use std::fmt::Write as _;
use std::path::Path;

use lexfsa_core::EncoderKind;
use lexfsa_fsa::FsaFormat;

use crate::DictError;

pub const SEPARATOR_KEY: &str = "fsa.dict.separator";
pub const ENCODER_KEY: &str = "fsa.dict.encoder";
pub const FORMAT_KEY: &str = "fsa.dict.format";
pub const NUMBERS_KEY: &str = "fsa.dict.numbers";

/// How a dictionary's sequences are laid out and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryMetadata {
    /// Byte between the word, the encoded stem and the tag.
    pub separator: u8,
    pub encoder: EncoderKind,
    pub format: FsaFormat,
    /// Whether the automaton stores right-language counts.
    pub numbers: bool,
}

impl Default for DictionaryMetadata {
    fn default() -> Self {
        DictionaryMetadata {
            separator: b'+',
            encoder: EncoderKind::Suffix,
            format: FsaFormat::Cfsa2,
            numbers: false,
        }
    }
}

impl DictionaryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_encoder(mut self, encoder: EncoderKind) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_format(mut self, format: FsaFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_numbers(mut self, numbers: bool) -> Self {
        self.numbers = numbers;
        self
    }

    /// The separator must be a printable, non-space ASCII character so the
    /// `.info` file can carry it verbatim.
    pub fn validate(&self) -> Result<(), DictError> {
        if !self.separator.is_ascii_graphic() {
            return Err(DictError::InvalidSeparator(self.separator));
        }
        Ok(())
    }

    /// Parses the contents of a `.info` file.
    ///
    /// The separator and encoder keys are required. The format defaults to
    /// CFSA2 and numbers to `false`.
    pub fn parse_info(text: &str) -> Result<Self, DictError> {
        let mut separator = None;
        let mut encoder = None;
        let mut metadata = DictionaryMetadata::default();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(metadata_error(line_no, format!("expected key=value, got {line:?}")));
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                SEPARATOR_KEY => {
                    let &[byte] = value.as_bytes() else {
                        return Err(metadata_error(
                            line_no,
                            format!("separator must be a single byte, got {value:?}"),
                        ));
                    };
                    separator = Some(byte);
                }
                ENCODER_KEY => {
                    encoder = Some(
                        value
                            .parse::<EncoderKind>()
                            .map_err(|e| metadata_error(line_no, e.to_string()))?,
                    );
                }
                FORMAT_KEY => {
                    metadata.format = value
                        .parse::<FsaFormat>()
                        .map_err(|e| metadata_error(line_no, e))?;
                }
                NUMBERS_KEY => {
                    metadata.numbers = parse_bool(value).ok_or_else(|| {
                        metadata_error(line_no, format!("expected true or false, got {value:?}"))
                    })?;
                }
                _ => log::warn!("ignoring unknown metadata key {key:?} on line {line_no}"),
            }
        }

        metadata.separator = separator.ok_or(DictError::MissingKey(SEPARATOR_KEY))?;
        metadata.encoder = encoder.ok_or(DictError::MissingKey(ENCODER_KEY))?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn read_info(path: &Path) -> Result<Self, DictError> {
        let text = std::fs::read_to_string(path).map_err(|source| DictError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_info(&text)
    }

    /// Renders the metadata as `.info` text.
    pub fn to_info(&self) -> String {
        let mut out = String::from("# lexfsa dictionary metadata\n");
        let _ = writeln!(out, "{SEPARATOR_KEY}={}", char::from(self.separator));
        let _ = writeln!(out, "{ENCODER_KEY}={}", self.encoder);
        let _ = writeln!(out, "{FORMAT_KEY}={}", self.format);
        let _ = writeln!(out, "{NUMBERS_KEY}={}", self.numbers);
        out
    }

    pub fn write_info(&self, path: &Path) -> Result<(), DictError> {
        std::fs::write(path, self.to_info())?;
        Ok(())
    }
}

fn metadata_error(line: usize, message: impl Into<String>) -> DictError {
    DictError::Metadata {
        line,
        message: message.into(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
