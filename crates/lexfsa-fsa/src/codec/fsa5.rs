// FSA5: uniform address width, one flag field per arc.
//
// Body layout (offsets are node ids):
//   0                dummy node: one arc '^', LAST, address 0
//   ndl + 1 + gtl    epsilon node: one arc '^', LAST, address of the root
//   ...              nodes in linear order
// A node is `ndl` bytes of big-endian right-language count followed by its
// arcs. An arc is its label followed by a `gtl`-byte little-endian field
// `(address << 3) | flags`; with NEXT set the field is a single flag byte and
// the target is the node right after the arc.

use std::io::{Read, Write};

use super::address::{MAX_ADDRESS_BYTES, address_width, decode_address, encode_address};
use super::header::Fsa5Header;
use super::linear::{Linearized, linearize};
use super::{
    FsaFormat, FsaSerializer, PROGRESS_INTERVAL, Progress, SerializerConfig, check_numbers,
    check_structure, finish, read_all,
};
use crate::FsaError;
use crate::flags::FsaFlags;
use crate::fsa::{ArcId, Fsa, NO_ARC, NodeId, TERMINAL_NODE};

pub const BIT_FINAL: u8 = 0x01;
pub const BIT_LAST: u8 = 0x02;
pub const BIT_TARGET_NEXT: u8 = 0x04;

const FLAG_MASK: u8 = 0x07;
const ADDRESS_SHIFT: u32 = 3;
const EPSILON_LABEL: u8 = b'^';

// Largest address a `gtl`-byte field can hold next to the flag bits.
fn address_limit(gtl: usize) -> u64 {
    1u64 << (8 * gtl as u32 - ADDRESS_SHIFT)
}

fn fixed_node_size(ndl: usize, gtl: usize) -> usize {
    ndl + 1 + gtl
}

/// Writes automata in the FSA5 format.
#[derive(Debug, Clone, Default)]
pub struct Fsa5Serializer {
    config: SerializerConfig,
}

impl Fsa5Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    // Node offsets for a given field width, plus the body length.
    fn layout(linear: &Linearized, ndl: usize, gtl: usize) -> (Vec<u64>, u64) {
        let mut offsets = Vec::with_capacity(linear.nodes.len());
        let mut offset = 2 * fixed_node_size(ndl, gtl) as u64;
        for (i, node) in linear.nodes.iter().enumerate() {
            offsets.push(offset);
            offset += ndl as u64;
            let explicit = node.arcs.len() - usize::from(linear.follows(i));
            offset += (explicit * (1 + gtl)) as u64;
            if linear.follows(i) {
                offset += 2;
            }
        }
        (offsets, offset)
    }

    fn encode(
        &self,
        linear: &Linearized,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<Vec<u8>, FsaError> {
        let ndl = if self.config.numbers {
            let max = linear.nodes.iter().map(|n| n.count).max().unwrap_or(0);
            address_width(max)
        } else {
            0
        };

        let mut chosen = None;
        for gtl in 1..=MAX_ADDRESS_BYTES {
            let (offsets, end) = Self::layout(linear, ndl, gtl);
            if end < address_limit(gtl) {
                chosen = Some((gtl, offsets, end));
                break;
            }
        }
        let Some((gtl, offsets, end)) = chosen else {
            let (_, end) = Self::layout(linear, ndl, MAX_ADDRESS_BYTES);
            return Err(FsaError::AddressOverflow {
                value: end,
                max_bytes: MAX_ADDRESS_BYTES,
            });
        };

        let header = Fsa5Header::new(self.config.filler, self.config.annotation, ndl, gtl);
        let mut out = Vec::with_capacity(Fsa5Header::SIZE + end as usize);
        out.extend_from_slice(bytemuck::bytes_of(&header));

        let root = linear.root.map_or(0, |r| offsets[r]);
        for address in [0, root] {
            out.resize(out.len() + ndl, 0);
            out.push(EPSILON_LABEL);
            encode_address(gtl, (address << ADDRESS_SHIFT) | u64::from(BIT_LAST), &mut out)?;
        }

        let total = linear.nodes.len();
        for (i, node) in linear.nodes.iter().enumerate() {
            debug_assert_eq!((out.len() - Fsa5Header::SIZE) as u64, offsets[i]);
            if ndl > 0 {
                out.extend_from_slice(&node.count.to_be_bytes()[8 - ndl..]);
            }
            let last = node.arcs.len() - 1;
            for (j, arc) in node.arcs.iter().enumerate() {
                let mut flags = 0;
                if arc.is_final {
                    flags |= BIT_FINAL;
                }
                if j == last {
                    flags |= BIT_LAST;
                }
                out.push(arc.label);
                if j == last && linear.follows(i) {
                    out.push(flags | BIT_TARGET_NEXT);
                } else {
                    let address = arc.target.map_or(0, |t| offsets[t]);
                    encode_address(gtl, (address << ADDRESS_SHIFT) | u64::from(flags), &mut out)?;
                }
            }
            if (i + 1) % PROGRESS_INTERVAL == 0 {
                progress(Progress {
                    nodes_written: i + 1,
                    total_nodes: total,
                });
            }
        }

        log::debug!(
            "FSA5: {} nodes, address width {}, node data length {}, {} bytes",
            total,
            gtl,
            ndl,
            out.len()
        );
        Ok(out)
    }
}

impl FsaSerializer for Fsa5Serializer {
    fn format(&self) -> FsaFormat {
        FsaFormat::Fsa5
    }

    fn supported_flags(&self) -> FsaFlags {
        FsaFlags::NEXTBIT | FsaFlags::NUMBERS | FsaFlags::SEPARATORS
    }

    fn config(&self) -> &SerializerConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut SerializerConfig {
        &mut self.config
    }

    fn serialize_with_progress<F, W>(
        &self,
        fsa: &F,
        out: W,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<W, FsaError>
    where
        F: Fsa + ?Sized,
        W: Write,
    {
        let linear = linearize(fsa, &[], self.config.numbers)?;
        let encoded = self.encode(&linear, progress)?;
        finish(out, &encoded, linear.nodes.len(), progress)
    }
}

/// An automaton read from an FSA5 stream.
///
/// Node and arc ids are offsets into the stream body.
#[derive(Debug, Clone)]
pub struct Fsa5 {
    header: Fsa5Header,
    body: Vec<u8>,
    gtl: usize,
    ndl: usize,
    root: NodeId,
    flags: FsaFlags,
}

impl Fsa5 {
    pub fn read(input: impl Read) -> Result<Self, FsaError> {
        let data = read_all(input)?;
        Self::from_bytes(&data)
    }

    /// Parses and validates a complete FSA5 stream.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FsaError> {
        let header = Fsa5Header::parse(data)?;
        let gtl = header.gtl();
        let ndl = header.node_data_length();
        if !(1..=MAX_ADDRESS_BYTES).contains(&gtl) {
            return Err(FsaError::corrupt(
                7,
                format!("address width 1..={MAX_ADDRESS_BYTES}"),
                gtl.to_string(),
            ));
        }
        if ndl > 8 {
            return Err(FsaError::corrupt(7, "node data length 0..=8", ndl.to_string()));
        }

        let body = data[Fsa5Header::SIZE..].to_vec();
        let first_node = 2 * fixed_node_size(ndl, gtl);
        if body.len() < first_node {
            return Err(FsaError::corrupt(
                data.len(),
                "dummy and epsilon nodes",
                "end of stream",
            ));
        }
        let epsilon_arc = fixed_node_size(ndl, gtl) + ndl;
        let field = decode_address(&body[epsilon_arc + 1..], gtl).unwrap_or(0);
        let root = (field >> ADDRESS_SHIFT) as usize;
        if root != 0 && (root < first_node || root >= body.len()) {
            return Err(FsaError::corrupt(
                Fsa5Header::SIZE + epsilon_arc + 1,
                format!("root address in {first_node}..{}", body.len()),
                root.to_string(),
            ));
        }

        let mut flags = FsaFlags::NEXTBIT | FsaFlags::SEPARATORS;
        flags.set(FsaFlags::NUMBERS, ndl > 0);
        let fsa = Fsa5 {
            header,
            body,
            gtl,
            ndl,
            root,
            flags,
        };
        let nodes = check_structure(root, Fsa5Header::SIZE, |node| fsa.check_node(node))?;
        check_numbers(&fsa, Fsa5Header::SIZE)?;
        log::debug!("read FSA5 automaton: {nodes} nodes, {} bytes", data.len());
        Ok(fsa)
    }

    pub fn filler(&self) -> u8 {
        self.header.filler
    }

    pub fn annotation_separator(&self) -> u8 {
        self.header.annotation
    }

    /// Bytes per explicit arc address field.
    pub fn address_width(&self) -> usize {
        self.gtl
    }

    pub fn node_data_length(&self) -> usize {
        self.ndl
    }

    #[inline]
    fn arc_flags(&self, arc: ArcId) -> u8 {
        self.body[arc + 1] & FLAG_MASK
    }

    #[inline]
    fn is_next(&self, arc: ArcId) -> bool {
        self.arc_flags(arc) & BIT_TARGET_NEXT != 0
    }

    #[inline]
    fn arc_size(&self, arc: ArcId) -> usize {
        if self.is_next(arc) { 2 } else { 1 + self.gtl }
    }

    #[inline]
    fn address(&self, arc: ArcId) -> usize {
        decode_address(&self.body[arc + 1..], self.gtl)
            .map_or(0, |field| (field >> ADDRESS_SHIFT) as usize)
    }

    // Validates one node and returns its non-terminal targets.
    fn check_node(&self, node: NodeId) -> Result<Vec<NodeId>, FsaError> {
        let base = Fsa5Header::SIZE;
        let first_node = 2 * fixed_node_size(self.ndl, self.gtl);
        let len = self.body.len();
        let mut arc = node + self.ndl;
        let mut previous: Option<u8> = None;
        let mut targets = Vec::new();
        loop {
            let Some(&raw_flags) = self.body.get(arc + 1) else {
                return Err(FsaError::corrupt(base + arc, "arc", "end of stream"));
            };
            let label = self.body[arc];
            if let Some(prev) = previous {
                if label <= prev {
                    return Err(FsaError::corrupt(
                        base + arc,
                        format!("label above {prev:#04x}"),
                        format!("{label:#04x}"),
                    ));
                }
            }
            previous = Some(label);

            let flags = raw_flags & FLAG_MASK;
            let is_last = flags & BIT_LAST != 0;
            if flags & BIT_TARGET_NEXT != 0 {
                if !is_last {
                    return Err(FsaError::corrupt(
                        base + arc + 1,
                        "NEXT only on the last arc of a node",
                        "NEXT on an inner arc",
                    ));
                }
                let target = arc + 2;
                if target >= len {
                    return Err(FsaError::corrupt(base + target, "node", "end of stream"));
                }
                targets.push(target);
            } else {
                if arc + 1 + self.gtl > len {
                    return Err(FsaError::corrupt(base + arc + 1, "arc address", "end of stream"));
                }
                let address = self.address(arc);
                if address == 0 {
                    if flags & BIT_FINAL == 0 {
                        return Err(FsaError::corrupt(
                            base + arc,
                            "final terminal arc",
                            "non-final terminal arc",
                        ));
                    }
                } else if address < first_node || address >= len {
                    return Err(FsaError::corrupt(
                        base + arc + 1,
                        format!("node address in {first_node}..{len}"),
                        address.to_string(),
                    ));
                } else {
                    targets.push(address);
                }
            }

            if is_last {
                return Ok(targets);
            }
            arc += self.arc_size(arc);
        }
    }
}

impl Fsa for Fsa5 {
    fn root_node(&self) -> NodeId {
        self.root
    }

    fn first_arc(&self, node: NodeId) -> ArcId {
        if node == TERMINAL_NODE {
            NO_ARC
        } else {
            node + self.ndl
        }
    }

    fn next_arc(&self, arc: ArcId) -> ArcId {
        if self.arc_flags(arc) & BIT_LAST != 0 {
            NO_ARC
        } else {
            arc + self.arc_size(arc)
        }
    }

    fn arc_label(&self, arc: ArcId) -> u8 {
        self.body[arc]
    }

    fn is_arc_final(&self, arc: ArcId) -> bool {
        self.arc_flags(arc) & BIT_FINAL != 0
    }

    fn is_arc_terminal(&self, arc: ArcId) -> bool {
        !self.is_next(arc) && self.address(arc) == 0
    }

    fn end_node(&self, arc: ArcId) -> NodeId {
        if self.is_next(arc) {
            arc + 2
        } else {
            self.address(arc)
        }
    }

    fn right_language_count(&self, node: NodeId) -> u64 {
        if self.ndl == 0 || node == TERMINAL_NODE {
            return 0;
        }
        self.body[node..node + self.ndl]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    }

    fn flags(&self) -> FsaFlags {
        self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::check_correct;
    use crate::builder::build_fsa;
    use crate::traversal::FsaTraversal;

    fn round_trip(words: &[&str], serializer: &Fsa5Serializer) -> Fsa5 {
        let fsa = build_fsa(words).unwrap();
        let bytes = serializer.serialize(&fsa, Vec::new()).unwrap();
        Fsa5::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn single_word_layout() {
        let fsa = build_fsa(["ab"]).unwrap();
        let bytes = Fsa5Serializer::new().serialize(&fsa, Vec::new()).unwrap();
        // Body: dummy at 0, epsilon at 2, root at 4 ('a' NEXT), node 6 ('b' terminal).
        assert_eq!(&bytes[..8], b"\\fsa\x05_+\x01");
        assert_eq!(&bytes[8..10], &[b'^', BIT_LAST]);
        assert_eq!(&bytes[10..12], &[b'^', (4 << 3) | BIT_LAST]);
        assert_eq!(&bytes[12..14], &[b'a', BIT_LAST | BIT_TARGET_NEXT]);
        assert_eq!(&bytes[14..16], &[b'b', BIT_LAST | BIT_FINAL]);
        assert_eq!(bytes.len(), 16);

        let read = Fsa5::from_bytes(&bytes).unwrap();
        assert_eq!(read.root_node(), 4);
        assert!(read.contains(b"ab"));
        assert_eq!(read.flags(), FsaFlags::NEXTBIT | FsaFlags::SEPARATORS);
    }

    #[test]
    fn language_survives() {
        let words = ["a", "aba", "ac", "b", "ba", "c"];
        let read = round_trip(&words, &Fsa5Serializer::new());
        assert_eq!(check_correct(words, &read), Ok(()));
    }

    #[test]
    fn numbers_are_stored() {
        let words = ["a", "aba", "ac", "b", "ba", "c"];
        let serializer = Fsa5Serializer::new().with_numbers().unwrap();
        let read = round_trip(&words, &serializer);
        assert!(read.flags().contains(FsaFlags::NUMBERS));
        assert_eq!(read.node_data_length(), 1);
        assert_eq!(read.right_language_count(read.root_node()), 6);
        let traversal = FsaTraversal::new(&read);
        for (rank, word) in words.iter().enumerate() {
            assert_eq!(traversal.perfect_hash(word.as_bytes()), Some(rank as u64));
        }
    }

    #[test]
    fn separators_are_stored() {
        let serializer = Fsa5Serializer::new()
            .with_filler(b'*')
            .and_then(|s| s.with_annotation_separator(b'|'))
            .unwrap();
        let read = round_trip(&["x"], &serializer);
        assert_eq!(read.filler(), b'*');
        assert_eq!(read.annotation_separator(), b'|');
    }

    #[test]
    fn wide_automaton_grows_address_width() {
        let words: Vec<String> = (0..2000).map(|i| format!("{i:05}x{}", i % 7)).collect();
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let read = round_trip(&refs, &Fsa5Serializer::new());
        assert!(read.address_width() >= 2);
        assert_eq!(check_correct(&refs, &read), Ok(()));
    }

    #[test]
    fn empty_automaton() {
        let read = round_trip(&[], &Fsa5Serializer::new());
        assert_eq!(read.root_node(), TERMINAL_NODE);
        assert_eq!(read.sequences().count(), 0);
    }

    #[test]
    fn rejects_truncated_stream() {
        let fsa = build_fsa(["abc", "abd"]).unwrap();
        let bytes = Fsa5Serializer::new().serialize(&fsa, Vec::new()).unwrap();
        for cut in [3, 9, bytes.len() - 1] {
            assert!(
                matches!(
                    Fsa5::from_bytes(&bytes[..cut]),
                    Err(FsaError::CorruptStream { .. })
                ),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn rejects_cycles() {
        // Root at 4 with one arc pointing back at itself.
        let mut bytes = b"\\fsa\x05_+\x01".to_vec();
        bytes.extend_from_slice(&[b'^', BIT_LAST, b'^', (4 << 3) | BIT_LAST]);
        bytes.extend_from_slice(&[b'a', (4 << 3) | BIT_LAST]);
        assert!(matches!(
            Fsa5::from_bytes(&bytes),
            Err(FsaError::CorruptStream { offset: 12, .. })
        ));
    }

    #[test]
    fn rejects_wrong_stored_counts() {
        let fsa = build_fsa(["a", "b"]).unwrap();
        let serializer = Fsa5Serializer::new().with_numbers().unwrap();
        let mut bytes = serializer.serialize(&fsa, Vec::new()).unwrap();
        let root = Fsa5::from_bytes(&bytes).unwrap().root_node();
        let at = Fsa5Header::SIZE + root;
        assert_eq!(bytes[at], 2);

        bytes[at] = 9;
        let err = Fsa5::from_bytes(&bytes).unwrap_err();
        assert!(
            matches!(err, FsaError::CorruptStream { offset, .. } if offset == at),
            "{err}"
        );
    }

    #[test]
    fn rejects_unsorted_labels() {
        let mut bytes = b"\\fsa\x05_+\x01".to_vec();
        bytes.extend_from_slice(&[b'^', BIT_LAST, b'^', (4 << 3) | BIT_LAST]);
        bytes.extend_from_slice(&[b'b', BIT_FINAL, b'a', BIT_FINAL | BIT_LAST]);
        assert!(matches!(
            Fsa5::from_bytes(&bytes),
            Err(FsaError::CorruptStream { offset: 14, .. })
        ));
    }
}
