// Matching, ranking and unranking on top of the traversal contract.

use std::sync::OnceLock;

use crate::analysis::RightLanguage;
use crate::flags::FsaFlags;
use crate::fsa::{ArcId, Fsa, NO_ARC, NodeId, TERMINAL_NODE};

/// Outcome of [`FsaTraversal::match_sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// The whole sequence is accepted. `node` is the target of its last arc.
    ExactMatch { node: NodeId },
    /// The whole sequence is a path but not an accepted sequence; every
    /// continuation lives below `node`.
    SequenceIsPrefix { node: NodeId },
    /// Only the first `index` bytes form a path; matching stopped at `node`.
    AutomatonHasPrefix { index: usize, node: NodeId },
    /// Not even the first byte matches.
    NoMatch,
}

/// Query helper bound to one automaton.
///
/// Ranking needs right-language counts. They are read from the automaton when
/// it carries [`FsaFlags::NUMBERS`] and computed once on first use otherwise.
/// Counts saturate at `u64::MAX`, so ranks run from 0 to `u64::MAX - 1`.
pub struct FsaTraversal<'a, F: ?Sized> {
    fsa: &'a F,
    stored: bool,
    counts: OnceLock<RightLanguage>,
}

impl<'a, F: Fsa + ?Sized> FsaTraversal<'a, F> {
    pub fn new(fsa: &'a F) -> Self {
        FsaTraversal {
            fsa,
            stored: fsa.flags().contains(FsaFlags::NUMBERS),
            counts: OnceLock::new(),
        }
    }

    pub fn fsa(&self) -> &'a F {
        self.fsa
    }

    fn count(&self, node: NodeId) -> u64 {
        if node == TERMINAL_NODE {
            0
        } else if self.stored {
            self.fsa.right_language_count(node)
        } else {
            self.counts
                .get_or_init(|| RightLanguage::compute_saturating(self.fsa))
                .count(node)
        }
    }

    // Number of sequences that go through `arc`, counted from its node.
    fn arc_weight(&self, arc: ArcId) -> u64 {
        let own = u64::from(self.fsa.is_arc_final(arc));
        if self.fsa.is_arc_terminal(arc) {
            own
        } else {
            own.saturating_add(self.count(self.fsa.end_node(arc)))
        }
    }

    /// Number of accepted sequences, clamped at `u64::MAX`.
    pub fn size(&self) -> u64 {
        self.count(self.fsa.root_node())
    }

    pub fn match_sequence(&self, sequence: &[u8]) -> MatchResult {
        self.match_from(self.fsa.root_node(), sequence)
    }

    /// Like [`FsaTraversal::match_sequence`], starting at `node`.
    pub fn match_from(&self, mut node: NodeId, sequence: &[u8]) -> MatchResult {
        for (i, &label) in sequence.iter().enumerate() {
            let arc = self.fsa.arc(node, label);
            if arc == NO_ARC {
                return if i == 0 {
                    MatchResult::NoMatch
                } else {
                    MatchResult::AutomatonHasPrefix { index: i, node }
                };
            }

            let next = if self.fsa.is_arc_terminal(arc) {
                TERMINAL_NODE
            } else {
                self.fsa.end_node(arc)
            };
            if i + 1 == sequence.len() {
                return if self.fsa.is_arc_final(arc) {
                    MatchResult::ExactMatch { node: next }
                } else {
                    MatchResult::SequenceIsPrefix { node: next }
                };
            }
            if next == TERMINAL_NODE {
                return MatchResult::AutomatonHasPrefix {
                    index: i + 1,
                    node: TERMINAL_NODE,
                };
            }
            node = next;
        }
        MatchResult::SequenceIsPrefix { node }
    }

    /// Follows `sequence` from `node` and returns the node reached, or `None`
    /// when the path does not exist or runs into a terminal arc.
    pub fn walk(&self, mut node: NodeId, sequence: &[u8]) -> Option<NodeId> {
        for &label in sequence {
            let arc = self.fsa.arc(node, label);
            if arc == NO_ARC || self.fsa.is_arc_terminal(arc) {
                return None;
            }
            node = self.fsa.end_node(arc);
        }
        Some(node)
    }

    /// Rank of `sequence` among all accepted sequences in lexicographic
    /// order, or `None` when it is not accepted or its rank is out of range.
    pub fn perfect_hash(&self, sequence: &[u8]) -> Option<u64> {
        let mut node = self.fsa.root_node();
        let mut rank = 0u64;
        for (i, &label) in sequence.iter().enumerate() {
            let target = self.fsa.arc(node, label);
            if target == NO_ARC {
                return None;
            }

            let mut arc = self.fsa.first_arc(node);
            while arc != target {
                rank = rank
                    .checked_add(self.arc_weight(arc))
                    .filter(|&r| r < u64::MAX)?;
                arc = self.fsa.next_arc(arc);
            }

            let is_final = self.fsa.is_arc_final(target);
            if i + 1 == sequence.len() {
                return is_final.then_some(rank);
            }
            if is_final {
                rank = rank.checked_add(1).filter(|&r| r < u64::MAX)?;
            }
            if self.fsa.is_arc_terminal(target) {
                return None;
            }
            node = self.fsa.end_node(target);
        }
        None
    }

    /// The sequence with rank `index`, or `None` when out of range.
    pub fn sequence_at(&self, mut index: u64) -> Option<Vec<u8>> {
        if index == u64::MAX {
            return None;
        }
        let mut node = self.fsa.root_node();
        let mut out = Vec::new();
        'nodes: loop {
            let mut arc = self.fsa.first_arc(node);
            while arc != NO_ARC {
                let weight = self.arc_weight(arc);
                if index < weight {
                    out.push(self.fsa.arc_label(arc));
                    if self.fsa.is_arc_final(arc) {
                        if index == 0 {
                            return Some(out);
                        }
                        index -= 1;
                    }
                    if self.fsa.is_arc_terminal(arc) {
                        return None;
                    }
                    node = self.fsa.end_node(arc);
                    continue 'nodes;
                }
                index -= weight;
                arc = self.fsa.next_arc(arc);
            }
            return None;
        }
    }
}
