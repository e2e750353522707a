// Sequence encoders: store a target byte sequence as an edit of a source.
//
// Every instruction starts with one to three "count" bytes, each holding a
// byte count `n` as `(n + b'A') mod 256`, followed by the literal bytes to
// append. A count of 255 means "remove everything": the whole source is
// discarded and the literal is the complete target.

use std::fmt;
use std::str::FromStr;

use crate::ordering::{shared_prefix_length, shared_prefix_length_at};

/// Count value reserved for "discard the whole source".
pub const REMOVE_EVERYTHING: usize = 255;

/// Error type for malformed encoder instructions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncoderError {
    #[error("{kind} instruction too short: expected at least {expected} bytes, got {actual}")]
    Truncated {
        kind: EncoderKind,
        expected: usize,
        actual: usize,
    },
    #[error("{kind} instruction cuts {requested} bytes from a {available}-byte source")]
    CutBeyondSource {
        kind: EncoderKind,
        requested: usize,
        available: usize,
    },
    #[error("unknown encoder kind: {0}")]
    UnknownKind(String),
}

/// A reversible transform of `target` relative to `source`.
///
/// Implementations guarantee `decode(s, encode(s, t)) == t` for every pair of
/// byte sequences, including empty ones and pairs with nothing in common.
pub trait SequenceEncoder {
    /// Writes the instruction for `target` into `out` (cleared first).
    fn encode_into(&self, source: &[u8], target: &[u8], out: &mut Vec<u8>);

    /// Applies `encoded` to `source` and writes the result into `out` (cleared first).
    fn decode_into(&self, source: &[u8], encoded: &[u8], out: &mut Vec<u8>)
    -> Result<(), EncoderError>;

    /// Number of count bytes at the start of every instruction.
    fn instruction_len(&self) -> usize;

    fn encode(&self, source: &[u8], target: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(target.len() + self.instruction_len());
        self.encode_into(source, target, &mut out);
        out
    }

    fn decode(&self, source: &[u8], encoded: &[u8]) -> Result<Vec<u8>, EncoderError> {
        let mut out = Vec::with_capacity(source.len() + encoded.len());
        self.decode_into(source, encoded, &mut out)?;
        Ok(out)
    }
}

#[inline]
fn count_code(n: usize) -> u8 {
    debug_assert!(n <= REMOVE_EVERYTHING);
    (n as u8).wrapping_add(b'A')
}

#[inline]
fn code_count(code: u8) -> usize {
    code.wrapping_sub(b'A') as usize
}

fn split_instruction(
    kind: EncoderKind,
    encoded: &[u8],
    n: usize,
) -> Result<(&[u8], &[u8]), EncoderError> {
    if encoded.len() < n {
        return Err(EncoderError::Truncated {
            kind,
            expected: n,
            actual: encoded.len(),
        });
    }
    Ok(encoded.split_at(n))
}

/// Stores the target verbatim; the source is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralEncoder;

impl SequenceEncoder for LiteralEncoder {
    fn encode_into(&self, _source: &[u8], target: &[u8], out: &mut Vec<u8>) {
        out.clear();
        out.extend_from_slice(target);
    }

    fn decode_into(
        &self,
        _source: &[u8],
        encoded: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), EncoderError> {
        out.clear();
        out.extend_from_slice(encoded);
        Ok(())
    }

    fn instruction_len(&self) -> usize {
        0
    }
}

/// `[K] literal`: drop `K` trailing bytes of the source, then append.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixEncoder;

impl SequenceEncoder for SuffixEncoder {
    fn encode_into(&self, source: &[u8], target: &[u8], out: &mut Vec<u8>) {
        let mut shared = shared_prefix_length(source, target);
        let mut truncate = source.len() - shared;
        if truncate >= REMOVE_EVERYTHING {
            truncate = REMOVE_EVERYTHING;
            shared = 0;
        }

        out.clear();
        out.push(count_code(truncate));
        out.extend_from_slice(&target[shared..]);
    }

    fn decode_into(
        &self,
        source: &[u8],
        encoded: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), EncoderError> {
        let (codes, literal) = split_instruction(EncoderKind::Suffix, encoded, 1)?;
        let mut truncate = code_count(codes[0]);
        if truncate == REMOVE_EVERYTHING {
            truncate = source.len();
        }
        if truncate > source.len() {
            return Err(EncoderError::CutBeyondSource {
                kind: EncoderKind::Suffix,
                requested: truncate,
                available: source.len(),
            });
        }

        out.clear();
        out.extend_from_slice(&source[..source.len() - truncate]);
        out.extend_from_slice(literal);
        Ok(())
    }

    fn instruction_len(&self) -> usize {
        1
    }
}

/// `[P, K] literal`: drop `P` leading and `K` trailing bytes, then append.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixEncoder;

impl SequenceEncoder for PrefixEncoder {
    fn encode_into(&self, source: &[u8], target: &[u8], out: &mut Vec<u8>) {
        let len = source.len();
        let mut best_len = 0;
        let mut best_index = 0;
        for i in 0..len {
            let shared = shared_prefix_length_at(source, i, target);
            // Only keep cuts that the count bytes can express.
            if shared > best_len
                && i < REMOVE_EVERYTHING
                && len - (i + shared) < REMOVE_EVERYTHING
            {
                best_len = shared;
                best_index = i;
            }
        }

        let mut truncate_prefix = best_index;
        let mut truncate_suffix = len - (best_index + best_len);
        if truncate_prefix >= REMOVE_EVERYTHING || truncate_suffix >= REMOVE_EVERYTHING {
            best_len = 0;
            truncate_prefix = REMOVE_EVERYTHING;
            truncate_suffix = REMOVE_EVERYTHING;
        }

        out.clear();
        out.push(count_code(truncate_prefix));
        out.push(count_code(truncate_suffix));
        out.extend_from_slice(&target[best_len..]);
    }

    fn decode_into(
        &self,
        source: &[u8],
        encoded: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), EncoderError> {
        let (codes, literal) = split_instruction(EncoderKind::Prefix, encoded, 2)?;
        let mut truncate_prefix = code_count(codes[0]);
        let mut truncate_suffix = code_count(codes[1]);
        if truncate_prefix == REMOVE_EVERYTHING || truncate_suffix == REMOVE_EVERYTHING {
            truncate_prefix = source.len();
            truncate_suffix = 0;
        }
        let requested = truncate_prefix + truncate_suffix;
        if requested > source.len() {
            return Err(EncoderError::CutBeyondSource {
                kind: EncoderKind::Prefix,
                requested,
                available: source.len(),
            });
        }

        out.clear();
        out.extend_from_slice(&source[truncate_prefix..source.len() - truncate_suffix]);
        out.extend_from_slice(literal);
        Ok(())
    }

    fn instruction_len(&self) -> usize {
        2
    }
}

/// `[X, L, K] literal`: drop `L` bytes at position `X` and `K` trailing bytes,
/// then append.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfixEncoder;

impl SequenceEncoder for InfixEncoder {
    fn encode_into(&self, source: &[u8], target: &[u8], out: &mut Vec<u8>) {
        let len = source.len();
        let prefix = shared_prefix_length(source, target);

        let mut infix_index = 0;
        let mut infix_len = 0;
        let mut kept = prefix;

        // Infixes are only tried at the start of the source or right after the
        // shared prefix.
        let starts: &[usize] = if prefix == 0 { &[0] } else { &[0, prefix] };
        let mut scratch = Vec::with_capacity(len);
        for &i in starts {
            for j in 1..=(len - i) {
                scratch.clear();
                scratch.extend_from_slice(&source[..i]);
                scratch.extend_from_slice(&source[i + j..]);
                let shared = shared_prefix_length(&scratch, target);
                if shared > 0 && shared > kept && i < REMOVE_EVERYTHING && j < REMOVE_EVERYTHING {
                    kept = shared;
                    infix_index = i;
                    infix_len = j;
                }
            }
        }

        let mut truncate_suffix = len - (infix_len + kept);

        // An infix reaching the end of the source is a plain suffix cut.
        if truncate_suffix == 0 && infix_index + infix_len == len {
            truncate_suffix = infix_len;
            infix_index = 0;
            infix_len = 0;
        }

        if infix_index >= REMOVE_EVERYTHING
            || infix_len >= REMOVE_EVERYTHING
            || truncate_suffix >= REMOVE_EVERYTHING
        {
            infix_index = 0;
            kept = 0;
            infix_len = REMOVE_EVERYTHING;
            truncate_suffix = REMOVE_EVERYTHING;
        }

        out.clear();
        out.push(count_code(infix_index));
        out.push(count_code(infix_len));
        out.push(count_code(truncate_suffix));
        out.extend_from_slice(&target[kept..]);
    }

    fn decode_into(
        &self,
        source: &[u8],
        encoded: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), EncoderError> {
        let (codes, literal) = split_instruction(EncoderKind::Infix, encoded, 3)?;
        let mut infix_index = code_count(codes[0]);
        let mut infix_len = code_count(codes[1]);
        let mut truncate_suffix = code_count(codes[2]);
        if infix_len == REMOVE_EVERYTHING || truncate_suffix == REMOVE_EVERYTHING {
            infix_index = 0;
            infix_len = source.len();
            truncate_suffix = 0;
        }
        let requested = infix_index + infix_len + truncate_suffix;
        if requested > source.len() {
            return Err(EncoderError::CutBeyondSource {
                kind: EncoderKind::Infix,
                requested,
                available: source.len(),
            });
        }

        let tail_start = infix_index + infix_len;
        let tail_len = source.len() - requested;
        out.clear();
        out.extend_from_slice(&source[..infix_index]);
        out.extend_from_slice(&source[tail_start..tail_start + tail_len]);
        out.extend_from_slice(literal);
        Ok(())
    }

    fn instruction_len(&self) -> usize {
        3
    }
}

/// The closed set of encoder strategies.
///
/// A dictionary stores one kind in its metadata; decoding needs only that
/// kind plus the source sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncoderKind {
    /// Literal target, source ignored.
    None,
    /// Trailing cut plus literal.
    #[default]
    Suffix,
    /// Leading and trailing cut plus literal.
    Prefix,
    /// Interior, trailing cut plus literal.
    Infix,
}

impl EncoderKind {
    /// All kinds, in the order [`EncoderKind::best_for`] breaks ties.
    pub const ALL: [EncoderKind; 4] = [
        EncoderKind::Suffix,
        EncoderKind::Prefix,
        EncoderKind::Infix,
        EncoderKind::None,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EncoderKind::None => "NONE",
            EncoderKind::Suffix => "SUFFIX",
            EncoderKind::Prefix => "PREFIX",
            EncoderKind::Infix => "INFIX",
        }
    }

    fn encoder(self) -> &'static dyn SequenceEncoder {
        match self {
            EncoderKind::None => &LiteralEncoder,
            EncoderKind::Suffix => &SuffixEncoder,
            EncoderKind::Prefix => &PrefixEncoder,
            EncoderKind::Infix => &InfixEncoder,
        }
    }

    /// Picks the kind with the smallest total instruction size over `pairs`
    /// of `(source, target)`.
    ///
    /// Ties go to the earlier entry of [`EncoderKind::ALL`].
    pub fn best_for<'a, I>(pairs: I) -> EncoderKind
    where
        I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
    {
        let mut totals = [0usize; 4];
        let mut buf = Vec::new();
        for (source, target) in pairs {
            for (total, kind) in totals.iter_mut().zip(EncoderKind::ALL) {
                kind.encode_into(source, target, &mut buf);
                *total += buf.len();
            }
        }
        let best = totals
            .iter()
            .enumerate()
            .min_by_key(|&(i, total)| (*total, i))
            .map_or(0, |(i, _)| i);
        EncoderKind::ALL[best]
    }
}

impl SequenceEncoder for EncoderKind {
    fn encode_into(&self, source: &[u8], target: &[u8], out: &mut Vec<u8>) {
        self.encoder().encode_into(source, target, out)
    }

    fn decode_into(
        &self,
        source: &[u8],
        encoded: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), EncoderError> {
        self.encoder().decode_into(source, encoded, out)
    }

    fn instruction_len(&self) -> usize {
        self.encoder().instruction_len()
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncoderKind {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(EncoderKind::None),
            "SUFFIX" => Ok(EncoderKind::Suffix),
            "PREFIX" => Ok(EncoderKind::Prefix),
            "INFIX" => Ok(EncoderKind::Infix),
            _ => Err(EncoderError::UnknownKind(s.to_string())),
        }
    }
}
