// Binary persistence of automata: the FSA5 and CFSA2 formats.
//
// Both formats start with the magic `\fsa` and a version byte, which is how
// `AnyFsa` tells them apart when reading.

pub mod address;
pub mod cfsa2;
pub mod fsa5;
pub mod header;
mod linear;

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use crate::FsaError;
use crate::analysis::{RightLanguage, reachable_nodes};
use crate::flags::FsaFlags;
use crate::fsa::{ArcId, Fsa, NodeId};
use crate::memory::MemoryFsa;

pub use cfsa2::{Cfsa2, Cfsa2Serializer};
pub use fsa5::{Fsa5, Fsa5Serializer};

/// Nodes encoded between two progress reports.
pub const PROGRESS_INTERVAL: usize = 1024;

/// The two on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FsaFormat {
    /// Uniform address width, one flag byte per arc.
    Fsa5,
    /// Per-arc address width, optional label map.
    #[default]
    Cfsa2,
}

impl FsaFormat {
    pub const ALL: [FsaFormat; 2] = [FsaFormat::Fsa5, FsaFormat::Cfsa2];

    /// The version byte that follows the magic.
    pub fn version(self) -> u8 {
        match self {
            FsaFormat::Fsa5 => header::FSA5_VERSION,
            FsaFormat::Cfsa2 => header::CFSA2_VERSION,
        }
    }

    pub fn from_version(version: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.version() == version)
    }

    pub fn name(self) -> &'static str {
        match self {
            FsaFormat::Fsa5 => "fsa5",
            FsaFormat::Cfsa2 => "cfsa2",
        }
    }
}

impl fmt::Display for FsaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FsaFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown automaton format: {s} (expected fsa5 or cfsa2)"))
    }
}

/// Serialization progress, reported while nodes are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub nodes_written: usize,
    pub total_nodes: usize,
}

impl Progress {
    pub fn is_done(&self) -> bool {
        self.nodes_written == self.total_nodes
    }
}

/// Settings shared by both serializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerConfig {
    pub filler: u8,
    pub annotation: u8,
    pub numbers: bool,
    pub label_mapping: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        SerializerConfig {
            filler: b'_',
            annotation: b'+',
            numbers: false,
            label_mapping: false,
        }
    }
}

/// Common contract of the automaton writers.
///
/// The `with_*` methods fail with [`FsaError::UnsupportedCapability`] when the
/// format cannot provide what is asked for.
pub trait FsaSerializer: Sized {
    fn format(&self) -> FsaFormat;

    /// Everything this format can provide.
    fn supported_flags(&self) -> FsaFlags;

    fn config(&self) -> &SerializerConfig;

    fn config_mut(&mut self) -> &mut SerializerConfig;

    /// Encodes `fsa` and writes it to `out`, which is returned on success.
    fn serialize_with_progress<F, W>(
        &self,
        fsa: &F,
        out: W,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<W, FsaError>
    where
        F: Fsa + ?Sized,
        W: Write;

    fn serialize<F, W>(&self, fsa: &F, out: W) -> Result<W, FsaError>
    where
        F: Fsa + ?Sized,
        W: Write,
    {
        self.serialize_with_progress(fsa, out, &mut |_| {})
    }

    /// The flags written streams will carry.
    fn flags(&self) -> FsaFlags {
        let config = self.config();
        let mut flags = FsaFlags::NEXTBIT | FsaFlags::SEPARATORS;
        flags.set(FsaFlags::NUMBERS, config.numbers);
        flags.set(FsaFlags::LABEL_MAPPING, config.label_mapping);
        flags & self.supported_flags()
    }

    /// Fails unless every flag in `capability` is supported.
    fn require(&self, capability: FsaFlags) -> Result<(), FsaError> {
        let missing = capability - self.supported_flags();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FsaError::UnsupportedCapability {
                format: self.format(),
                capability: missing,
            })
        }
    }

    fn with_filler(mut self, filler: u8) -> Result<Self, FsaError> {
        self.require(FsaFlags::SEPARATORS)?;
        self.config_mut().filler = filler;
        Ok(self)
    }

    fn with_annotation_separator(mut self, annotation: u8) -> Result<Self, FsaError> {
        self.require(FsaFlags::SEPARATORS)?;
        self.config_mut().annotation = annotation;
        Ok(self)
    }

    /// Stores right-language counts so readers can rank without recomputing.
    fn with_numbers(mut self) -> Result<Self, FsaError> {
        self.require(FsaFlags::NUMBERS)?;
        self.config_mut().numbers = true;
        Ok(self)
    }

    fn with_label_mapping(mut self, enabled: bool) -> Result<Self, FsaError> {
        if enabled {
            self.require(FsaFlags::LABEL_MAPPING)?;
        }
        self.config_mut().label_mapping = enabled;
        Ok(self)
    }
}

/// Serializer selected at run time.
#[derive(Debug, Clone)]
pub enum Codec {
    Fsa5(Fsa5Serializer),
    Cfsa2(Cfsa2Serializer),
}

impl Codec {
    pub fn new(format: FsaFormat) -> Self {
        match format {
            FsaFormat::Fsa5 => Codec::Fsa5(Fsa5Serializer::new()),
            FsaFormat::Cfsa2 => Codec::Cfsa2(Cfsa2Serializer::new()),
        }
    }

    /// Reads a stream of this codec's format.
    pub fn deserialize(&self, input: impl Read) -> Result<AnyFsa, FsaError> {
        let data = read_all(input)?;
        let version = header::peek_version(&data)?;
        let expected = self.format().version();
        if version != expected {
            return Err(FsaError::corrupt(
                4,
                format!("{} version {expected:#04x}", self.format()),
                format!("{version:#04x}"),
            ));
        }
        AnyFsa::from_bytes(&data)
    }
}

impl FsaSerializer for Codec {
    fn format(&self) -> FsaFormat {
        match self {
            Codec::Fsa5(s) => s.format(),
            Codec::Cfsa2(s) => s.format(),
        }
    }

    fn supported_flags(&self) -> FsaFlags {
        match self {
            Codec::Fsa5(s) => s.supported_flags(),
            Codec::Cfsa2(s) => s.supported_flags(),
        }
    }

    fn config(&self) -> &SerializerConfig {
        match self {
            Codec::Fsa5(s) => s.config(),
            Codec::Cfsa2(s) => s.config(),
        }
    }

    fn config_mut(&mut self) -> &mut SerializerConfig {
        match self {
            Codec::Fsa5(s) => s.config_mut(),
            Codec::Cfsa2(s) => s.config_mut(),
        }
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
        match self {
            Codec::Fsa5(s) => s.serialize_with_progress(fsa, out, progress),
            Codec::Cfsa2(s) => s.serialize_with_progress(fsa, out, progress),
        }
    }
}

fn read_all(mut input: impl Read) -> Result<Vec<u8>, FsaError> {
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;
    Ok(data)
}

// Writes the encoded stream and reports the final progress tick.
fn finish<W: Write>(
    mut out: W,
    encoded: &[u8],
    total_nodes: usize,
    progress: &mut dyn FnMut(Progress),
) -> Result<W, FsaError> {
    out.write_all(encoded)?;
    out.flush()?;
    progress(Progress {
        nodes_written: total_nodes,
        total_nodes,
    });
    Ok(out)
}

// Walks every node reachable from `root` once, failing on the first node
// `children` rejects or on a cycle. Returns the number of nodes visited.
fn check_structure(
    root: NodeId,
    stream_offset: usize,
    mut children: impl FnMut(NodeId) -> Result<Vec<NodeId>, FsaError>,
) -> Result<usize, FsaError> {
    use hashbrown::HashMap;

    if root == crate::fsa::TERMINAL_NODE {
        return Ok(0);
    }
    // false while the node is on the stack, true once its subtree is checked.
    let mut done: HashMap<NodeId, bool> = HashMap::new();
    done.insert(root, false);
    let mut stack = vec![(root, children(root)?, 0usize)];
    while let Some((node, targets, next)) = stack.last_mut() {
        let Some(&child) = targets.get(*next) else {
            done.insert(*node, true);
            stack.pop();
            continue;
        };
        *next += 1;
        match done.get(&child) {
            Some(true) => {}
            Some(false) => {
                return Err(FsaError::corrupt(
                    stream_offset + child,
                    "acyclic automaton",
                    "a cycle through this node",
                ));
            }
            None => {
                done.insert(child, false);
                let targets = children(child)?;
                stack.push((child, targets, 0));
            }
        }
    }
    Ok(done.len())
}

// Compares the right-language count stored at every reachable node with the
// one its arcs imply.
fn check_numbers<F: Fsa>(fsa: &F, stream_offset: usize) -> Result<(), FsaError> {
    if !fsa.flags().contains(FsaFlags::NUMBERS) {
        return Ok(());
    }
    let computed = RightLanguage::compute(fsa)?;
    for node in reachable_nodes(fsa) {
        let stored = fsa.right_language_count(node);
        let expected = computed.count(node);
        if stored != expected {
            return Err(FsaError::corrupt(
                stream_offset + node,
                format!("right-language count {expected}"),
                stored.to_string(),
            ));
        }
    }
    Ok(())
}

/// Any automaton this crate produces or reads.
#[derive(Debug, Clone)]
pub enum AnyFsa {
    Memory(MemoryFsa),
    Fsa5(Fsa5),
    Cfsa2(Cfsa2),
}

impl AnyFsa {
    /// Reads a serialized automaton, detecting its format from the header.
    pub fn read(input: impl Read) -> Result<Self, FsaError> {
        let data = read_all(input)?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, FsaError> {
        let version = header::peek_version(data)?;
        match FsaFormat::from_version(version) {
            Some(FsaFormat::Fsa5) => Ok(AnyFsa::Fsa5(Fsa5::from_bytes(data)?)),
            Some(FsaFormat::Cfsa2) => Ok(AnyFsa::Cfsa2(Cfsa2::from_bytes(data)?)),
            None => Err(FsaError::corrupt(
                4,
                "a known format version",
                format!("{version:#04x}"),
            )),
        }
    }

    /// The on-disk format, or `None` for an in-memory automaton.
    pub fn format(&self) -> Option<FsaFormat> {
        match self {
            AnyFsa::Memory(_) => None,
            AnyFsa::Fsa5(_) => Some(FsaFormat::Fsa5),
            AnyFsa::Cfsa2(_) => Some(FsaFormat::Cfsa2),
        }
    }

    /// Filler and annotation separator stored in the header, if any.
    pub fn separators(&self) -> Option<(u8, u8)> {
        match self {
            AnyFsa::Memory(_) => None,
            AnyFsa::Fsa5(fsa) => Some((fsa.filler(), fsa.annotation_separator())),
            AnyFsa::Cfsa2(fsa) => Some((fsa.filler(), fsa.annotation_separator())),
        }
    }
}

impl From<MemoryFsa> for AnyFsa {
    fn from(fsa: MemoryFsa) -> Self {
        AnyFsa::Memory(fsa)
    }
}

macro_rules! dispatch {
    ($self:ident, $fsa:ident => $body:expr) => {
        match $self {
            AnyFsa::Memory($fsa) => $body,
            AnyFsa::Fsa5($fsa) => $body,
            AnyFsa::Cfsa2($fsa) => $body,
        }
    };
}

impl Fsa for AnyFsa {
    fn root_node(&self) -> NodeId {
        dispatch!(self, fsa => fsa.root_node())
    }

    fn first_arc(&self, node: NodeId) -> ArcId {
        dispatch!(self, fsa => fsa.first_arc(node))
    }

    fn next_arc(&self, arc: ArcId) -> ArcId {
        dispatch!(self, fsa => fsa.next_arc(arc))
    }

    fn arc_label(&self, arc: ArcId) -> u8 {
        dispatch!(self, fsa => fsa.arc_label(arc))
    }

    fn is_arc_final(&self, arc: ArcId) -> bool {
        dispatch!(self, fsa => fsa.is_arc_final(arc))
    }

    fn is_arc_terminal(&self, arc: ArcId) -> bool {
        dispatch!(self, fsa => fsa.is_arc_terminal(arc))
    }

    fn end_node(&self, arc: ArcId) -> NodeId {
        dispatch!(self, fsa => fsa.end_node(arc))
    }

    fn right_language_count(&self, node: NodeId) -> u64 {
        dispatch!(self, fsa => fsa.right_language_count(node))
    }

    fn flags(&self) -> FsaFlags {
        dispatch!(self, fsa => fsa.flags())
    }

    fn arc(&self, node: NodeId, label: u8) -> ArcId {
        dispatch!(self, fsa => fsa.arc(node, label))
    }
}
