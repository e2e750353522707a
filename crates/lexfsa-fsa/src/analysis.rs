// Right-language counting, statistics and language checks.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use lexfsa_core::ordering::sort_and_dedup;

use crate::FsaError;
use crate::flags::FsaFlags;
use crate::fsa::{ByteSequenceIter, Fsa, NO_ARC, NodeId, TERMINAL_NODE};

/// Reachable non-terminal nodes, children before parents.
pub fn reachable_nodes<F: Fsa + ?Sized>(fsa: &F) -> Vec<NodeId> {
    let root = fsa.root_node();
    let mut order = Vec::new();
    if root == TERMINAL_NODE {
        return order;
    }

    let mut visited = HashSet::new();
    visited.insert(root);
    let mut stack = vec![(root, fsa.first_arc(root))];
    while let Some(top) = stack.last_mut() {
        let arc = top.1;
        if arc == NO_ARC {
            order.push(top.0);
            stack.pop();
            continue;
        }
        top.1 = fsa.next_arc(arc);
        if !fsa.is_arc_terminal(arc) {
            let child = fsa.end_node(arc);
            if visited.insert(child) {
                stack.push((child, fsa.first_arc(child)));
            }
        }
    }
    order
}

/// Number of sequences accepted from every reachable node.
///
/// For a node, the count is the sum over its arcs of 1 when the arc is final
/// plus the count of the arc's target when it is not terminal.
#[derive(Debug, Clone, Default)]
pub struct RightLanguage {
    root: NodeId,
    counts: HashMap<NodeId, u64>,
}

impl RightLanguage {
    /// Computes the counts in one post-order pass.
    ///
    /// Fails with [`FsaError::CountOverflow`] when some node accepts more
    /// sequences than a `u64` can count.
    pub fn compute<F: Fsa + ?Sized>(fsa: &F) -> Result<Self, FsaError> {
        Self::sum_with(fsa, u64::checked_add)
    }

    /// Like [`RightLanguage::compute`], with counts clamped at `u64::MAX`.
    pub fn compute_saturating<F: Fsa + ?Sized>(fsa: &F) -> Self {
        Self::sum_with(fsa, |a, b| Some(a.saturating_add(b))).unwrap_or_default()
    }

    fn sum_with<F: Fsa + ?Sized>(
        fsa: &F,
        add: impl Fn(u64, u64) -> Option<u64>,
    ) -> Result<Self, FsaError> {
        let mut counts = HashMap::new();
        for node in reachable_nodes(fsa) {
            let mut total = 0u64;
            let mut arc = fsa.first_arc(node);
            while arc != NO_ARC {
                let below = if fsa.is_arc_terminal(arc) {
                    0
                } else {
                    counts.get(&fsa.end_node(arc)).copied().unwrap_or(0)
                };
                total = add(total, u64::from(fsa.is_arc_final(arc)))
                    .and_then(|t| add(t, below))
                    .ok_or(FsaError::CountOverflow { node })?;
                arc = fsa.next_arc(arc);
            }
            counts.insert(node, total);
        }
        Ok(RightLanguage {
            root: fsa.root_node(),
            counts,
        })
    }

    /// Reads the counts the automaton stores itself ([`FsaFlags::NUMBERS`]).
    pub fn stored<F: Fsa + ?Sized>(fsa: &F) -> Self {
        let counts = reachable_nodes(fsa)
            .into_iter()
            .map(|node| (node, fsa.right_language_count(node)))
            .collect();
        RightLanguage {
            root: fsa.root_node(),
            counts,
        }
    }

    /// Stored counts when available, computed ones otherwise.
    pub fn of<F: Fsa + ?Sized>(fsa: &F) -> Result<Self, FsaError> {
        if fsa.flags().contains(FsaFlags::NUMBERS) {
            Ok(Self::stored(fsa))
        } else {
            Self::compute(fsa)
        }
    }

    /// Count for `node`; 0 for the terminal node and unknown nodes.
    pub fn count(&self, node: NodeId) -> u64 {
        self.counts.get(&node).copied().unwrap_or(0)
    }

    /// Size of the whole language.
    pub fn total(&self) -> u64 {
        self.count(self.root)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.counts.iter().map(|(&node, &count)| (node, count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// A difference between an automaton and what it should be.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("sequence {:?} is missing", String::from_utf8_lossy(.0))]
    Missing(Vec<u8>),
    #[error("sequence {:?} is accepted but was not in the input", String::from_utf8_lossy(.0))]
    Unexpected(Vec<u8>),
    #[error("nodes {first} and {second} have the same right language")]
    EquivalentStates { first: NodeId, second: NodeId },
}

/// Verifies that `fsa` accepts exactly the non-empty sequences of `input`.
///
/// The input does not need to be sorted; duplicates are ignored.
pub fn check_correct<F, I, S>(input: I, fsa: &F) -> Result<(), Violation>
where
    F: Fsa + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let expected = sort_and_dedup(
        input
            .into_iter()
            .map(|s| s.as_ref().to_vec())
            .filter(|s| !s.is_empty())
            .collect(),
    );

    let mut actual = ByteSequenceIter::new(fsa, fsa.root_node());
    let mut expected = expected.into_iter();
    loop {
        match (expected.next(), actual.advance()) {
            (None, None) => return Ok(()),
            (Some(want), None) => return Err(Violation::Missing(want)),
            (None, Some(got)) => return Err(Violation::Unexpected(got.to_vec())),
            (Some(want), Some(got)) => {
                if want.as_slice() < got {
                    return Err(Violation::Missing(want));
                }
                if want.as_slice() > got {
                    return Err(Violation::Unexpected(got.to_vec()));
                }
            }
        }
    }
}

/// Verifies that no two reachable nodes have the same right language.
///
/// Materializes every right language, so it is meant for tests and
/// validation of modest automata.
pub fn check_minimal<F: Fsa + ?Sized>(fsa: &F) -> Result<(), Violation> {
    let mut seen: HashMap<Vec<Vec<u8>>, NodeId> = HashMap::new();
    let mut iter = ByteSequenceIter::new(fsa, TERMINAL_NODE);
    for node in reachable_nodes(fsa) {
        iter.restart_from(node);
        let mut language = Vec::new();
        while let Some(sequence) = iter.advance() {
            language.push(sequence.to_vec());
        }
        if let Some(&first) = seen.get(&language) {
            return Err(Violation::EquivalentStates {
                first,
                second: node,
            });
        }
        seen.insert(language, node);
    }
    Ok(())
}

/// Structural statistics of an automaton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsaInfo {
    /// Reachable non-terminal nodes.
    pub nodes: usize,
    pub arcs: usize,
    pub final_arcs: usize,
    pub terminal_arcs: usize,
    /// Size of the language; `None` when it does not fit in a `u64`.
    pub sequences: Option<u64>,
    /// Length of the longest accepted sequence.
    pub longest: usize,
}

impl FsaInfo {
    pub fn of<F: Fsa + ?Sized>(fsa: &F) -> Self {
        let mut info = FsaInfo::default();
        let mut depth: HashMap<NodeId, usize> = HashMap::new();
        for node in reachable_nodes(fsa) {
            info.nodes += 1;
            let mut longest = 0;
            let mut arc = fsa.first_arc(node);
            while arc != NO_ARC {
                info.arcs += 1;
                if fsa.is_arc_final(arc) {
                    info.final_arcs += 1;
                    longest = longest.max(1);
                }
                if fsa.is_arc_terminal(arc) {
                    info.terminal_arcs += 1;
                } else {
                    let below = depth.get(&fsa.end_node(arc)).copied().unwrap_or(0);
                    longest = longest.max(below + 1);
                }
                arc = fsa.next_arc(arc);
            }
            depth.insert(node, longest);
        }
        info.sequences = RightLanguage::of(fsa).ok().map(|counts| counts.total());
        info.longest = depth.get(&fsa.root_node()).copied().unwrap_or(0);
        info
    }
}

impl fmt::Display for FsaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nodes:          {}", self.nodes)?;
        writeln!(f, "arcs:           {}", self.arcs)?;
        writeln!(f, "final arcs:     {}", self.final_arcs)?;
        writeln!(f, "terminal arcs:  {}", self.terminal_arcs)?;
        match self.sequences {
            Some(sequences) => writeln!(f, "sequences:      {sequences}")?,
            None => writeln!(f, "sequences:      more than {}", u64::MAX)?,
        }
        write!(f, "longest:        {}", self.longest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_fsa;
    use crate::codec::{AnyFsa, Codec, FsaFormat, FsaSerializer};
    use crate::memory::{ARC_LAST, ArcRecord, MemoryFsa};
    use crate::traversal::FsaTraversal;

    #[test]
    fn right_language_counts() {
        let fsa = build_fsa(["a", "aba", "ac", "b", "ba", "c"]).unwrap();
        let counts = RightLanguage::compute(&fsa).unwrap();
        assert_eq!(counts.total(), 6);
        let a = fsa.end_node(fsa.arc(fsa.root_node(), b'a'));
        assert_eq!(counts.count(a), 2);
        assert_eq!(counts.count(TERMINAL_NODE), 0);

        let stored = RightLanguage::of(&fsa.with_numbers().unwrap()).unwrap();
        assert_eq!(stored.total(), 6);
    }

    #[test]
    fn children_come_before_parents() {
        let fsa = build_fsa(["ab", "b"]).unwrap();
        let order = reachable_nodes(&fsa);
        assert_eq!(order.last(), Some(&fsa.root_node()));
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn correctness_check_reports_differences() {
        let fsa = build_fsa(["ab", "b", "c"]).unwrap();
        assert_eq!(check_correct(["c", "b", "ab", "b"], &fsa), Ok(()));
        assert_eq!(
            check_correct(["ab", "b"], &fsa),
            Err(Violation::Unexpected(b"c".to_vec()))
        );
        assert_eq!(
            check_correct(["ab", "b", "bb", "c"], &fsa),
            Err(Violation::Missing(b"bb".to_vec()))
        );
        assert_eq!(
            check_correct(["ab", "b", "c", "d"], &fsa),
            Err(Violation::Missing(b"d".to_vec()))
        );
    }

    #[test]
    fn minimality_check_detects_duplicate_states() {
        // root -a-> n1 -x-> T, root -b-> n2 -x-> T, with n1 and n2 stored twice.
        let last_final = ArcRecord {
            flags: ARC_LAST | crate::memory::ARC_FINAL,
            ..ArcRecord::new(b'x', 0, true)
        };
        let mut b = ArcRecord::new(b'b', 2, false);
        b.flags |= ARC_LAST;
        let arcs = vec![
            ArcRecord { flags: ARC_LAST, ..ArcRecord::new(0, 3, false) },
            last_final,
            last_final,
            ArcRecord::new(b'a', 1, false),
            b,
        ];
        let fsa = MemoryFsa::from_arcs(arcs);
        assert_eq!(check_correct(["ax", "bx"], &fsa), Ok(()));
        assert!(matches!(
            check_minimal(&fsa),
            Err(Violation::EquivalentStates { .. })
        ));
    }

    // 2^depth sequences of length `depth`: every node has arcs `a` and `b`
    // to the next one.
    fn binary_chain(depth: u32) -> MemoryFsa {
        let mut arcs = vec![ArcRecord {
            flags: ARC_LAST,
            ..ArcRecord::new(0, 1, false)
        }];
        for level in 0..depth {
            let last = level + 1 == depth;
            let next = if last { 0 } else { 1 + 2 * (level + 1) };
            arcs.push(ArcRecord::new(b'a', next, last));
            let mut b = ArcRecord::new(b'b', next, last);
            b.flags |= ARC_LAST;
            arcs.push(b);
        }
        MemoryFsa::from_arcs(arcs)
    }

    #[test]
    fn counts_beyond_u64_are_reported() {
        let fsa = binary_chain(70);
        assert!(matches!(
            RightLanguage::compute(&fsa),
            Err(FsaError::CountOverflow { .. })
        ));
        assert!(matches!(
            fsa.clone().with_numbers(),
            Err(FsaError::CountOverflow { .. })
        ));
        assert_eq!(RightLanguage::compute_saturating(&fsa).total(), u64::MAX);
        assert_eq!(RightLanguage::compute(&binary_chain(10)).unwrap().total(), 1024);

        let info = FsaInfo::of(&fsa);
        assert_eq!(info.sequences, None);
        assert_eq!(info.longest, 70);
        assert!(info.to_string().contains("more than"));
    }

    #[test]
    fn serializing_numbers_beyond_u64_fails() {
        let fsa = binary_chain(70);
        for codec in [Codec::new(FsaFormat::Fsa5), Codec::new(FsaFormat::Cfsa2)] {
            let with_numbers = codec.clone().with_numbers().unwrap();
            assert!(matches!(
                with_numbers.serialize(&fsa, Vec::new()),
                Err(FsaError::CountOverflow { .. })
            ));
            let bytes = codec.serialize(&fsa, Vec::new()).unwrap();
            let read = AnyFsa::from_bytes(&bytes).unwrap();
            assert_eq!(FsaInfo::of(&read).sequences, None);
        }
    }

    #[test]
    fn ranks_saturate_on_huge_languages() {
        let fsa = binary_chain(70);
        let traversal = FsaTraversal::new(&fsa);
        let first = vec![b'a'; 70];
        let last = vec![b'b'; 70];
        assert_eq!(traversal.size(), u64::MAX);
        assert_eq!(traversal.perfect_hash(&first), Some(0));
        assert_eq!(traversal.sequence_at(0), Some(first));
        assert_eq!(traversal.perfect_hash(&last), None);
        assert_eq!(traversal.sequence_at(u64::MAX), None);

        let below = traversal.sequence_at(u64::MAX - 1).unwrap();
        assert_eq!(traversal.perfect_hash(&below), Some(u64::MAX - 1));
    }

    #[test]
    fn info_counts_structure() {
        let fsa = build_fsa(["aba", "b", "ba"]).unwrap();
        let info = FsaInfo::of(&fsa);
        assert_eq!(
            info,
            FsaInfo {
                nodes: 3,
                arcs: 4,
                final_arcs: 2,
                terminal_arcs: 1,
                sequences: Some(3),
                longest: 3,
            }
        );
        assert!(info.to_string().contains("sequences:      3"));
    }

    #[test]
    fn empty_automaton_info() {
        let fsa = build_fsa(Vec::<&str>::new()).unwrap();
        assert_eq!(
            FsaInfo::of(&fsa),
            FsaInfo {
                sequences: Some(0),
                ..FsaInfo::default()
            }
        );
        assert!(check_minimal(&fsa).is_ok());
        assert_eq!(check_correct(Vec::<&str>::new(), &fsa), Ok(()));
    }
}
