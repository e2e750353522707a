// The read-only automaton contract and sequence enumeration.

use crate::flags::FsaFlags;

/// Identifier of a state. Its meaning (arc index, byte offset) belongs to the
/// implementation.
pub type NodeId = usize;

/// Identifier of an arc.
pub type ArcId = usize;

/// The state without outgoing arcs. Terminal arcs report it as their end node.
pub const TERMINAL_NODE: NodeId = 0;

/// Returned by arc lookups when there is no (further) arc.
pub const NO_ARC: ArcId = 0;

/// Read-only traversal of a deterministic acyclic automaton over bytes.
///
/// Arcs of a node are visited in increasing (unsigned) label order and every
/// label occurs at most once per node. A sequence is accepted when the arc
/// consuming its last byte is final. Implementations are immutable after
/// construction, so any number of threads may traverse them at once.
pub trait Fsa: Send + Sync {
    /// The start state.
    fn root_node(&self) -> NodeId;

    /// The first outgoing arc of `node`, or [`NO_ARC`].
    fn first_arc(&self, node: NodeId) -> ArcId;

    /// The arc after `arc` in the same node, or [`NO_ARC`].
    fn next_arc(&self, arc: ArcId) -> ArcId;

    fn arc_label(&self, arc: ArcId) -> u8;

    /// Whether the sequence ending with this arc is accepted.
    fn is_arc_final(&self, arc: ArcId) -> bool;

    /// Whether the arc leads to a state without outgoing arcs.
    fn is_arc_terminal(&self, arc: ArcId) -> bool;

    /// The target state of `arc`; [`TERMINAL_NODE`] for terminal arcs.
    fn end_node(&self, arc: ArcId) -> NodeId;

    /// Number of sequences accepted from `node`, or 0 when the automaton does
    /// not store them (see [`FsaFlags::NUMBERS`]).
    fn right_language_count(&self, _node: NodeId) -> u64 {
        0
    }

    fn flags(&self) -> FsaFlags;

    /// The arc of `node` labelled `label`, or [`NO_ARC`].
    fn arc(&self, node: NodeId, label: u8) -> ArcId {
        let mut arc = self.first_arc(node);
        while arc != NO_ARC {
            let current = self.arc_label(arc);
            if current == label {
                return arc;
            }
            if current > label {
                break;
            }
            arc = self.next_arc(arc);
        }
        NO_ARC
    }

    /// Iterates over the arcs of `node`.
    fn arcs(&self, node: NodeId) -> Arcs<'_, Self>
    where
        Self: Sized,
    {
        Arcs {
            fsa: self,
            next: self.first_arc(node),
        }
    }

    /// Iterates over every accepted sequence in lexicographic order.
    fn sequences(&self) -> ByteSequenceIter<'_, Self>
    where
        Self: Sized,
    {
        ByteSequenceIter::new(self, self.root_node())
    }

    /// Iterates over the right language of `node`.
    fn sequences_from(&self, node: NodeId) -> ByteSequenceIter<'_, Self>
    where
        Self: Sized,
    {
        ByteSequenceIter::new(self, node)
    }

    /// Whether `sequence` is accepted. The empty sequence never is.
    fn contains(&self, sequence: &[u8]) -> bool {
        let mut node = self.root_node();
        for (i, &label) in sequence.iter().enumerate() {
            let arc = self.arc(node, label);
            if arc == NO_ARC {
                return false;
            }
            if i + 1 == sequence.len() {
                return self.is_arc_final(arc);
            }
            if self.is_arc_terminal(arc) {
                return false;
            }
            node = self.end_node(arc);
        }
        false
    }
}

/// Iterator over the arcs of one node.
pub struct Arcs<'a, F: ?Sized> {
    fsa: &'a F,
    next: ArcId,
}

impl<F: Fsa + ?Sized> Iterator for Arcs<'_, F> {
    type Item = ArcId;

    fn next(&mut self) -> Option<ArcId> {
        if self.next == NO_ARC {
            return None;
        }
        let arc = self.next;
        self.next = self.fsa.next_arc(arc);
        Some(arc)
    }
}

/// Lazy depth-first enumeration of the sequences accepted from a node.
///
/// Sequences come out in lexicographic order. [`ByteSequenceIter::advance`]
/// lends the current sequence without allocating; the [`Iterator`]
/// implementation copies it. The iterator can be pointed at another node with
/// [`ByteSequenceIter::restart_from`], reusing its buffers.
pub struct ByteSequenceIter<'a, F: ?Sized> {
    fsa: &'a F,
    buffer: Vec<u8>,
    // Next arc to visit at each depth; NO_ARC marks an exhausted level.
    arcs: Vec<ArcId>,
}

impl<'a, F: Fsa + ?Sized> ByteSequenceIter<'a, F> {
    pub fn new(fsa: &'a F, node: NodeId) -> Self {
        let mut iter = ByteSequenceIter {
            fsa,
            buffer: Vec::with_capacity(32),
            arcs: Vec::with_capacity(32),
        };
        iter.restart_from(node);
        iter
    }

    /// Restarts the enumeration at `node`.
    pub fn restart_from(&mut self, node: NodeId) -> &mut Self {
        self.buffer.clear();
        self.arcs.clear();
        let first = self.fsa.first_arc(node);
        if first != NO_ARC {
            self.arcs.push(first);
        }
        self
    }

    /// Moves to the next accepted sequence and returns it.
    pub fn advance(&mut self) -> Option<&[u8]> {
        while let Some(&arc) = self.arcs.last() {
            let depth = self.arcs.len() - 1;
            if arc == NO_ARC {
                self.arcs.pop();
                continue;
            }

            // Keep the level on the stack so the depth stays accurate.
            self.arcs[depth] = self.fsa.next_arc(arc);
            self.buffer.truncate(depth);
            self.buffer.push(self.fsa.arc_label(arc));

            if !self.fsa.is_arc_terminal(arc) {
                let first = self.fsa.first_arc(self.fsa.end_node(arc));
                self.arcs.push(first);
            }

            if self.fsa.is_arc_final(arc) {
                return Some(&self.buffer[..=depth]);
            }
        }
        None
    }
}

impl<F: Fsa + ?Sized> Iterator for ByteSequenceIter<'_, F> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        self.advance().map(<[u8]>::to_vec)
    }
}
