// In-memory automaton produced by the builder.

use bytemuck::{Pod, Zeroable};

use crate::FsaError;
use crate::analysis::RightLanguage;
use crate::flags::FsaFlags;
use crate::fsa::{ArcId, Fsa, NO_ARC, NodeId, TERMINAL_NODE};

/// The arc completes an accepted sequence.
pub const ARC_FINAL: u8 = 0x01;
/// The arc is the last one of its node.
pub const ARC_LAST: u8 = 0x02;

/// One arc of a [`MemoryFsa`] (8 bytes).
///
/// The arcs of a node are stored contiguously; the node is identified by the
/// index of its first arc. A `target` of 0 means the arc is terminal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ArcRecord {
    pub target: u32,
    pub label: u8,
    pub flags: u8,
    pub _reserved: [u8; 2],
}

const _: () = assert!(std::mem::size_of::<ArcRecord>() == 8);

impl ArcRecord {
    #[inline]
    pub fn new(label: u8, target: u32, is_final: bool) -> Self {
        ArcRecord {
            target,
            label,
            flags: if is_final { ARC_FINAL } else { 0 },
            _reserved: [0; 2],
        }
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.flags & ARC_FINAL != 0
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.flags & ARC_LAST != 0
    }
}

/// A minimal automaton held as a flat arc table.
///
/// Index 0 is a sentinel whose target is the root node, so that no real node
/// can have id 0 ([`TERMINAL_NODE`]).
#[derive(Debug, Clone)]
pub struct MemoryFsa {
    arcs: Vec<ArcRecord>,
    numbers: Option<Vec<u64>>,
}

impl MemoryFsa {
    pub(crate) fn from_arcs(arcs: Vec<ArcRecord>) -> Self {
        debug_assert!(!arcs.is_empty(), "arc table must hold the root sentinel");
        MemoryFsa {
            arcs,
            numbers: None,
        }
    }

    /// Attaches right-language counts so that the automaton reports
    /// [`FsaFlags::NUMBERS`].
    pub fn with_numbers(mut self) -> Result<Self, FsaError> {
        if self.numbers.is_none() {
            let language = RightLanguage::compute(&self)?;
            let mut numbers = vec![0u64; self.arcs.len()];
            for (node, count) in language.iter() {
                if let Some(slot) = numbers.get_mut(node) {
                    *slot = count;
                }
            }
            self.numbers = Some(numbers);
        }
        Ok(self)
    }

    /// The raw arc table, sentinel included.
    pub fn arc_records(&self) -> &[ArcRecord] {
        &self.arcs
    }

    /// Number of arcs, not counting the sentinel.
    pub fn arc_count(&self) -> usize {
        self.arcs.len() - 1
    }

    /// Whether the automaton accepts nothing.
    pub fn is_empty(&self) -> bool {
        self.root_node() == TERMINAL_NODE
    }
}

impl Fsa for MemoryFsa {
    fn root_node(&self) -> NodeId {
        self.arcs[0].target as NodeId
    }

    fn first_arc(&self, node: NodeId) -> ArcId {
        if node == TERMINAL_NODE || node >= self.arcs.len() {
            NO_ARC
        } else {
            node
        }
    }

    fn next_arc(&self, arc: ArcId) -> ArcId {
        match self.arcs.get(arc) {
            Some(record) if !record.is_last() => arc + 1,
            _ => NO_ARC,
        }
    }

    fn arc_label(&self, arc: ArcId) -> u8 {
        self.arcs[arc].label
    }

    fn is_arc_final(&self, arc: ArcId) -> bool {
        self.arcs[arc].is_final()
    }

    fn is_arc_terminal(&self, arc: ArcId) -> bool {
        self.arcs[arc].target == 0
    }

    fn end_node(&self, arc: ArcId) -> NodeId {
        self.arcs[arc].target as NodeId
    }

    fn right_language_count(&self, node: NodeId) -> u64 {
        self.numbers
            .as_ref()
            .and_then(|numbers| numbers.get(node).copied())
            .unwrap_or(0)
    }

    fn flags(&self) -> FsaFlags {
        if self.numbers.is_some() {
            FsaFlags::NUMBERS
        } else {
            FsaFlags::empty()
        }
    }
}
