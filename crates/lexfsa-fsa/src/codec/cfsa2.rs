// CFSA2: per-arc address widths and an optional label map.
//
// Stream: header, label map, root address (vint), then the body. Body offset 0
// holds a reserved zero byte so that no node has id 0. A node is an optional
// vint right-language count followed by its arcs. Each arc starts with
//
//   bit 7     FINAL
//   bit 6     LAST
//   bits 5-3  address width: 0 = next node, 1..=6 = explicit, 7 = terminal
//   bits 2-0  label index into the map, 0 = explicit label byte follows
//
// then the optional label byte, then the little-endian absolute address.
// Frequently referenced nodes are placed first so their addresses stay short.

use std::io::{Read, Write};

use super::address::{
    MAX_ADDRESS_BYTES, address_width, decode_address, encode_address, read_vint, vint_len,
    write_vint,
};
use super::header::{Cfsa2Header, MAX_LABEL_MAP};
use super::linear::{Linearized, hot_nodes, linearize};
use super::{
    FsaFormat, FsaSerializer, PROGRESS_INTERVAL, Progress, SerializerConfig, check_numbers,
    check_structure, finish, read_all,
};
use crate::FsaError;
use crate::flags::FsaFlags;
use crate::fsa::{ArcId, Fsa, NO_ARC, NodeId, TERMINAL_NODE};

pub const BIT_FINAL: u8 = 0x80;
pub const BIT_LAST: u8 = 0x40;

const WIDTH_SHIFT: u8 = 3;
const WIDTH_NEXT: u8 = 0;
const WIDTH_TERMINAL: u8 = 7;
const LABEL_INDEX_MASK: u8 = 0x07;

/// Nodes considered for placement ahead of the root.
const HOT_NODE_LIMIT: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Next,
    Terminal,
    Explicit { node: usize, width: u8 },
}

impl Target {
    fn width_bits(self) -> u8 {
        match self {
            Target::Next => WIDTH_NEXT,
            Target::Terminal => WIDTH_TERMINAL,
            Target::Explicit { width, .. } => width,
        }
    }

    fn address_len(self) -> usize {
        match self {
            Target::Explicit { width, .. } => usize::from(width),
            _ => 0,
        }
    }
}

/// Writes automata in the CFSA2 format.
#[derive(Debug, Clone, Default)]
pub struct Cfsa2Serializer {
    config: SerializerConfig,
}

impl Cfsa2Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    // Up to seven labels ordered by frequency, then by value.
    fn label_map(linear: &Linearized) -> Vec<u8> {
        let mut frequency = [0usize; 256];
        for arc in linear.nodes.iter().flat_map(|n| &n.arcs) {
            frequency[usize::from(arc.label)] += 1;
        }
        let mut labels: Vec<u8> = (0..=255u8)
            .filter(|&l| frequency[usize::from(l)] > 0)
            .collect();
        labels.sort_by(|&a, &b| {
            frequency[usize::from(b)]
                .cmp(&frequency[usize::from(a)])
                .then(a.cmp(&b))
        });
        labels.truncate(MAX_LABEL_MAP);
        labels
    }

    fn layout(
        &self,
        linear: &Linearized,
        targets: &[Vec<Target>],
        mapped: &[u8; 256],
    ) -> Vec<u64> {
        let mut offsets = Vec::with_capacity(linear.nodes.len());
        let mut offset = 1u64;
        for (node, node_targets) in linear.nodes.iter().zip(targets) {
            offsets.push(offset);
            if self.config.numbers {
                offset += vint_len(node.count) as u64;
            }
            for (arc, target) in node.arcs.iter().zip(node_targets) {
                let label_len = usize::from(mapped[usize::from(arc.label)] == 0);
                offset += (1 + label_len + target.address_len()) as u64;
            }
        }
        offsets
    }

    fn encode(
        &self,
        linear: &Linearized,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<Vec<u8>, FsaError> {
        let labels = if self.config.label_mapping {
            Self::label_map(linear)
        } else {
            Vec::new()
        };
        let mut mapped = [0u8; 256];
        for (i, &label) in labels.iter().enumerate() {
            mapped[usize::from(label)] = i as u8 + 1;
        }

        let mut targets: Vec<Vec<Target>> = linear
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let last = node.arcs.len() - 1;
                node.arcs
                    .iter()
                    .enumerate()
                    .map(|(j, arc)| match arc.target {
                        None => Target::Terminal,
                        Some(_) if j == last && linear.follows(i) => Target::Next,
                        Some(node) => Target::Explicit { node, width: 1 },
                    })
                    .collect()
            })
            .collect();

        // Widths only grow, so this reaches a fixpoint.
        let mut rounds = 0;
        let offsets = loop {
            rounds += 1;
            let offsets = self.layout(linear, &targets, &mapped);
            let mut changed = false;
            for target in targets.iter_mut().flatten() {
                if let Target::Explicit { node, width } = target {
                    let needed = address_width(offsets[*node]);
                    if needed > MAX_ADDRESS_BYTES {
                        return Err(FsaError::AddressOverflow {
                            value: offsets[*node],
                            max_bytes: MAX_ADDRESS_BYTES,
                        });
                    }
                    if needed > usize::from(*width) {
                        *width = needed as u8;
                        changed = true;
                    }
                }
            }
            if !changed {
                break offsets;
            }
        };
        log::trace!("CFSA2 address widths settled after {rounds} rounds");

        let root = linear.root.map_or(0, |r| offsets[r]);
        let header = Cfsa2Header::new(
            self.flags(),
            self.config.filler,
            self.config.annotation,
            labels.len(),
        );
        let mut out = Vec::new();
        out.extend_from_slice(bytemuck::bytes_of(&header));
        out.extend_from_slice(&labels);
        write_vint(root, &mut out);
        let body_start = out.len();
        out.push(0);

        let total = linear.nodes.len();
        for (i, (node, node_targets)) in linear.nodes.iter().zip(&targets).enumerate() {
            debug_assert_eq!((out.len() - body_start) as u64, offsets[i]);
            if self.config.numbers {
                write_vint(node.count, &mut out);
            }
            let last = node.arcs.len() - 1;
            for (j, (arc, &target)) in node.arcs.iter().zip(node_targets).enumerate() {
                let index = mapped[usize::from(arc.label)];
                let mut byte = (target.width_bits() << WIDTH_SHIFT) | index;
                if arc.is_final {
                    byte |= BIT_FINAL;
                }
                if j == last {
                    byte |= BIT_LAST;
                }
                out.push(byte);
                if index == 0 {
                    out.push(arc.label);
                }
                if let Target::Explicit { node, width } = target {
                    encode_address(usize::from(width), offsets[node], &mut out)?;
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
            "CFSA2: {} nodes, {} mapped labels, {} bytes",
            total,
            labels.len(),
            out.len()
        );
        Ok(out)
    }
}

impl FsaSerializer for Cfsa2Serializer {
    fn format(&self) -> FsaFormat {
        FsaFormat::Cfsa2
    }

    fn supported_flags(&self) -> FsaFlags {
        FsaFlags::NEXTBIT | FsaFlags::NUMBERS | FsaFlags::SEPARATORS | FsaFlags::LABEL_MAPPING
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
        let hot = hot_nodes(fsa, HOT_NODE_LIMIT);
        let linear = linearize(fsa, &hot, self.config.numbers)?;
        let encoded = self.encode(&linear, progress)?;
        finish(out, &encoded, linear.nodes.len(), progress)
    }
}

/// An automaton read from a CFSA2 stream.
///
/// Node and arc ids are offsets into the stream body.
#[derive(Debug, Clone)]
pub struct Cfsa2 {
    body: Vec<u8>,
    // Stream offset of the body, for error reporting.
    body_start: usize,
    labels: Vec<u8>,
    flags: FsaFlags,
    filler: u8,
    annotation: u8,
    root: NodeId,
}

struct ArcParts {
    byte: u8,
    label: u8,
    width: u8,
    // Offset of the address field (or of the next arc when there is none).
    address_at: usize,
}

impl Cfsa2 {
    pub fn read(input: impl Read) -> Result<Self, FsaError> {
        let data = read_all(input)?;
        Self::from_bytes(&data)
    }

    /// Parses and validates a complete CFSA2 stream.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FsaError> {
        let (header, flags) = Cfsa2Header::parse(data)?;
        let label_count = usize::from(header.label_count);
        if label_count > 0 && !flags.contains(FsaFlags::LABEL_MAPPING) {
            return Err(FsaError::corrupt(
                9,
                "no label map without LABEL_MAPPING",
                format!("{label_count} mapped labels"),
            ));
        }

        let mut pos = Cfsa2Header::SIZE;
        let labels = data
            .get(pos..pos + label_count)
            .ok_or_else(|| FsaError::corrupt(data.len(), "label map", "end of stream"))?
            .to_vec();
        pos += label_count;
        let (root, body_start) = read_vint(data, pos)
            .ok_or_else(|| FsaError::corrupt(pos, "root address", "end of stream"))?;

        let body = data[body_start..].to_vec();
        match body.first() {
            Some(0) => {}
            Some(&other) => {
                return Err(FsaError::corrupt(
                    body_start,
                    "reserved zero byte",
                    format!("{other:#04x}"),
                ));
            }
            None => {
                return Err(FsaError::corrupt(
                    body_start,
                    "reserved zero byte",
                    "end of stream",
                ));
            }
        }
        let root = root as usize;
        if root >= body.len() {
            return Err(FsaError::corrupt(
                pos,
                format!("root address below {}", body.len()),
                root.to_string(),
            ));
        }

        let fsa = Cfsa2 {
            body,
            body_start,
            labels,
            flags,
            filler: header.filler,
            annotation: header.annotation,
            root,
        };
        let nodes = check_structure(root, body_start, |node| fsa.check_node(node))?;
        check_numbers(&fsa, body_start)?;
        log::debug!("read CFSA2 automaton: {nodes} nodes, {} bytes", data.len());
        Ok(fsa)
    }

    pub fn filler(&self) -> u8 {
        self.filler
    }

    pub fn annotation_separator(&self) -> u8 {
        self.annotation
    }

    /// Labels stored by index in the header.
    pub fn label_map(&self) -> &[u8] {
        &self.labels
    }

    fn has_numbers(&self) -> bool {
        self.flags.contains(FsaFlags::NUMBERS)
    }

    // Decodes the fixed part of an arc; `None` when it runs past the body or
    // uses an unknown label index.
    fn parts(&self, arc: ArcId) -> Option<ArcParts> {
        let byte = *self.body.get(arc)?;
        let index = usize::from(byte & LABEL_INDEX_MASK);
        let (label, address_at) = if index == 0 {
            (*self.body.get(arc + 1)?, arc + 2)
        } else {
            (*self.labels.get(index - 1)?, arc + 1)
        };
        Some(ArcParts {
            byte,
            label,
            width: (byte >> WIDTH_SHIFT) & 0x07,
            address_at,
        })
    }

    fn arc_end(parts: &ArcParts) -> usize {
        match parts.width {
            WIDTH_NEXT | WIDTH_TERMINAL => parts.address_at,
            width => parts.address_at + usize::from(width),
        }
    }

    fn check_node(&self, node: NodeId) -> Result<Vec<NodeId>, FsaError> {
        let base = self.body_start;
        let len = self.body.len();
        let mut arc = if self.has_numbers() {
            read_vint(&self.body, node)
                .map(|(_, next)| next)
                .ok_or_else(|| FsaError::corrupt(base + node, "node count", "end of stream"))?
        } else {
            node
        };

        let mut previous: Option<u8> = None;
        let mut targets = Vec::new();
        loop {
            let Some(parts) = self.parts(arc) else {
                let found = match self.body.get(arc) {
                    Some(byte) => format!("label index {}", byte & LABEL_INDEX_MASK),
                    None => "end of stream".to_string(),
                };
                return Err(FsaError::corrupt(base + arc, "arc", found));
            };
            if let Some(prev) = previous {
                if parts.label <= prev {
                    return Err(FsaError::corrupt(
                        base + arc,
                        format!("label above {prev:#04x}"),
                        format!("{:#04x}", parts.label),
                    ));
                }
            }
            previous = Some(parts.label);

            let is_last = parts.byte & BIT_LAST != 0;
            let end = Self::arc_end(&parts);
            match parts.width {
                WIDTH_NEXT => {
                    if !is_last {
                        return Err(FsaError::corrupt(
                            base + arc,
                            "next-node target only on the last arc of a node",
                            "next-node target on an inner arc",
                        ));
                    }
                    if end >= len {
                        return Err(FsaError::corrupt(base + end, "node", "end of stream"));
                    }
                    targets.push(end);
                }
                WIDTH_TERMINAL => {
                    if parts.byte & BIT_FINAL == 0 {
                        return Err(FsaError::corrupt(
                            base + arc,
                            "final terminal arc",
                            "non-final terminal arc",
                        ));
                    }
                }
                width => {
                    let address = self
                        .body
                        .get(parts.address_at..)
                        .and_then(|field| decode_address(field, usize::from(width)))
                        .ok_or_else(|| {
                            FsaError::corrupt(base + parts.address_at, "arc address", "end of stream")
                        })? as usize;
                    if address == 0 || address >= len {
                        return Err(FsaError::corrupt(
                            base + parts.address_at,
                            format!("node address in 1..{len}"),
                            address.to_string(),
                        ));
                    }
                    targets.push(address);
                }
            }

            if is_last {
                return Ok(targets);
            }
            arc = end;
        }
    }

    #[inline]
    fn arc_parts(&self, arc: ArcId) -> ArcParts {
        // Validated on load for every reachable arc.
        self.parts(arc).unwrap_or(ArcParts {
            byte: BIT_LAST | (WIDTH_TERMINAL << WIDTH_SHIFT),
            label: 0,
            width: WIDTH_TERMINAL,
            address_at: arc,
        })
    }
}

impl Fsa for Cfsa2 {
    fn root_node(&self) -> NodeId {
        self.root
    }

    fn first_arc(&self, node: NodeId) -> ArcId {
        if node == TERMINAL_NODE {
            NO_ARC
        } else if self.has_numbers() {
            read_vint(&self.body, node).map_or(NO_ARC, |(_, arc)| arc)
        } else {
            node
        }
    }

    fn next_arc(&self, arc: ArcId) -> ArcId {
        let parts = self.arc_parts(arc);
        if parts.byte & BIT_LAST != 0 {
            NO_ARC
        } else {
            Self::arc_end(&parts)
        }
    }

    fn arc_label(&self, arc: ArcId) -> u8 {
        self.arc_parts(arc).label
    }

    fn is_arc_final(&self, arc: ArcId) -> bool {
        self.arc_parts(arc).byte & BIT_FINAL != 0
    }

    fn is_arc_terminal(&self, arc: ArcId) -> bool {
        self.arc_parts(arc).width == WIDTH_TERMINAL
    }

    fn end_node(&self, arc: ArcId) -> NodeId {
        let parts = self.arc_parts(arc);
        match parts.width {
            WIDTH_NEXT => parts.address_at,
            WIDTH_TERMINAL => TERMINAL_NODE,
            width => self
                .body
                .get(parts.address_at..)
                .and_then(|field| decode_address(field, usize::from(width)))
                .map_or(TERMINAL_NODE, |address| address as usize),
        }
    }

    fn right_language_count(&self, node: NodeId) -> u64 {
        if !self.has_numbers() || node == TERMINAL_NODE {
            return 0;
        }
        read_vint(&self.body, node).map_or(0, |(count, _)| count)
    }

    fn flags(&self) -> FsaFlags {
        self.flags
    }
}
