// Incremental construction of a minimal acyclic automaton from sorted input.
//
// The builder keeps the path of the previously added sequence as a stack of
// active states. Adding a sequence freezes every active state deeper than the
// prefix it shares with its predecessor: a frozen state is either replaced by
// an equivalent state already in the registry or appended to the arc table.

use std::cmp::Ordering;
use std::fmt;

use lexfsa_core::ordering::{compare, shared_prefix_length};
use smallvec::SmallVec;

use crate::FsaError;
use crate::memory::{ARC_LAST, ArcRecord, MemoryFsa};
use crate::registry::SignatureRegistry;

/// What to do with a sequence equal to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Skip,
}

/// What to do with an empty sequence.
///
/// Finality lives on arcs, so the empty sequence cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPolicy {
    #[default]
    Reject,
    Skip,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderOptions {
    pub duplicates: DuplicatePolicy,
    pub empty: EmptyPolicy,
}

impl BuilderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn empty(mut self, policy: EmptyPolicy) -> Self {
        self.empty = policy;
        self
    }

    /// Skips duplicates and empty sequences instead of failing.
    pub fn lenient() -> Self {
        BuilderOptions {
            duplicates: DuplicatePolicy::Skip,
            empty: EmptyPolicy::Skip,
        }
    }
}

/// Counters collected while building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub sequences: usize,
    pub skipped: usize,
    pub states: usize,
    pub arcs: usize,
    pub registry_hits: usize,
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sequences ({} skipped), {} states, {} arcs, {} registry hits",
            self.sequences, self.skipped, self.states, self.arcs, self.registry_hits
        )
    }
}

struct ActiveState {
    label: u8,
    is_final: bool,
    arcs: SmallVec<[ArcRecord; 8]>,
}

impl ActiveState {
    fn new(label: u8, is_final: bool) -> Self {
        ActiveState {
            label,
            is_final,
            arcs: SmallVec::new(),
        }
    }
}

/// Builds a minimal [`MemoryFsa`] from sequences added in strictly increasing
/// order.
///
/// ```
/// use lexfsa_fsa::{Fsa, FsaBuilder};
///
/// let mut builder = FsaBuilder::new();
/// builder.add(b"ab")?;
/// builder.add(b"b")?;
/// let fsa = builder.complete()?;
/// assert!(fsa.contains(b"ab"));
/// # Ok::<(), lexfsa_fsa::FsaError>(())
/// ```
pub struct FsaBuilder {
    arcs: Vec<ArcRecord>,
    // active[0] is the root; active[i] is reached by previous[..i].
    active: Vec<ActiveState>,
    registry: SignatureRegistry,
    previous: Option<Vec<u8>>,
    options: BuilderOptions,
    stats: BuildStats,
    position: usize,
}

impl Default for FsaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FsaBuilder {
    pub fn new() -> Self {
        Self::with_options(BuilderOptions::default())
    }

    pub fn with_options(options: BuilderOptions) -> Self {
        FsaBuilder {
            arcs: vec![ArcRecord::new(0, 0, false)],
            active: vec![ActiveState::new(0, false)],
            registry: SignatureRegistry::new(),
            previous: None,
            options,
            stats: BuildStats::default(),
            position: 0,
        }
    }

    pub fn options(&self) -> BuilderOptions {
        self.options
    }

    /// Counters so far. States and arcs count frozen ones only.
    pub fn stats(&self) -> BuildStats {
        BuildStats {
            states: self.registry.len(),
            arcs: self.arcs.len() - 1,
            registry_hits: self.registry.hits(),
            ..self.stats
        }
    }

    /// Adds the next sequence. It must be greater than every sequence added
    /// before it.
    pub fn add(&mut self, sequence: impl AsRef<[u8]>) -> Result<(), FsaError> {
        let sequence = sequence.as_ref();
        let position = self.position;
        self.position += 1;

        if sequence.is_empty() {
            return match self.options.empty {
                EmptyPolicy::Reject => Err(FsaError::EmptyInput(position)),
                EmptyPolicy::Skip => {
                    log::trace!("skipping empty sequence at position {position}");
                    self.stats.skipped += 1;
                    Ok(())
                }
            };
        }

        let prefix = match &self.previous {
            None => 0,
            Some(previous) => match compare(previous, sequence) {
                Ordering::Less => shared_prefix_length(previous, sequence),
                Ordering::Equal => {
                    return match self.options.duplicates {
                        DuplicatePolicy::Reject => {
                            Err(FsaError::DuplicateInput(sequence.to_vec()))
                        }
                        DuplicatePolicy::Skip => {
                            self.stats.skipped += 1;
                            Ok(())
                        }
                    };
                }
                Ordering::Greater => {
                    return Err(FsaError::InputOrder {
                        previous: previous.clone(),
                        current: sequence.to_vec(),
                    });
                }
            },
        };

        self.freeze_suffix(prefix)?;
        let last = sequence.len() - 1;
        self.active.extend(
            sequence[prefix..]
                .iter()
                .enumerate()
                .map(|(i, &label)| ActiveState::new(label, prefix + i == last)),
        );

        let previous = self.previous.get_or_insert_with(Vec::new);
        previous.clear();
        previous.extend_from_slice(sequence);
        self.stats.sequences += 1;
        Ok(())
    }

    /// Adds every sequence from `sequences`, stopping at the first error.
    pub fn extend<I, S>(&mut self, sequences: I) -> Result<(), FsaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        sequences.into_iter().try_for_each(|s| self.add(s))
    }

    /// Freezes the remaining path and returns the finished automaton.
    pub fn complete(mut self) -> Result<MemoryFsa, FsaError> {
        self.freeze_suffix(0)?;
        let root = match self.active.pop() {
            Some(root) => self.freeze(root.arcs)?,
            None => 0,
        };
        self.arcs[0].target = root;
        self.arcs[0].flags = ARC_LAST;

        log::debug!("built automaton: {}", self.stats());
        Ok(MemoryFsa::from_arcs(self.arcs))
    }

    // Pops active states until `depth + 1` remain, linking each frozen state
    // into its parent.
    fn freeze_suffix(&mut self, depth: usize) -> Result<(), FsaError> {
        while self.active.len() > depth + 1 {
            let Some(state) = self.active.pop() else {
                break;
            };
            let target = self.freeze(state.arcs)?;
            if let Some(parent) = self.active.last_mut() {
                parent
                    .arcs
                    .push(ArcRecord::new(state.label, target, state.is_final));
            }
        }
        Ok(())
    }

    fn freeze(&mut self, mut arcs: SmallVec<[ArcRecord; 8]>) -> Result<u32, FsaError> {
        let Some(last) = arcs.last_mut() else {
            return Ok(0);
        };
        last.flags |= ARC_LAST;
        self.registry.intern(&mut self.arcs, &arcs)
    }
}

/// Builds a minimal automaton from sorted, distinct, non-empty sequences.
pub fn build_fsa<I, S>(sequences: I) -> Result<MemoryFsa, FsaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    build_fsa_with(BuilderOptions::default(), sequences)
}

/// Like [`build_fsa`] with explicit options.
pub fn build_fsa_with<I, S>(options: BuilderOptions, sequences: I) -> Result<MemoryFsa, FsaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut builder = FsaBuilder::with_options(options);
    builder.extend(sequences)?;
    builder.complete()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FsaInfo, check_minimal};
    use crate::fsa::Fsa;

    fn collect(fsa: &MemoryFsa) -> Vec<Vec<u8>> {
        fsa.sequences().collect()
    }

    #[test]
    fn shares_common_suffixes() {
        let fsa = build_fsa(["aba", "b", "ba"]).unwrap();
        assert_eq!(collect(&fsa), vec![b"aba".to_vec(), b"b".to_vec(), b"ba".to_vec()]);
        // root -a-> n1 -b-> n2; root -b-> n2; n2 -a-> terminal
        let info = FsaInfo::of(&fsa);
        assert_eq!(info.nodes, 3);
        assert_eq!(info.arcs, 4);
        assert!(check_minimal(&fsa).is_ok());
    }

    #[test]
    fn merges_equal_tails() {
        let fsa = build_fsa(["acf", "adg", "aeh", "bdg", "beh"]).unwrap();
        assert!(check_minimal(&fsa).is_ok());
        assert_eq!(collect(&fsa).len(), 5);
        let root = fsa.root_node();
        let a = fsa.end_node(fsa.arc(root, b'a'));
        let b = fsa.end_node(fsa.arc(root, b'b'));
        // The "dg"/"eh" continuations are shared below both branches.
        assert_eq!(
            fsa.end_node(fsa.arc(a, b'd')),
            fsa.end_node(fsa.arc(b, b'd'))
        );
        assert_eq!(
            fsa.end_node(fsa.arc(a, b'e')),
            fsa.end_node(fsa.arc(b, b'e'))
        );
    }

    #[test]
    fn rejects_out_of_order_input() {
        let err = build_fsa(["b", "a"]).unwrap_err();
        match err {
            FsaError::InputOrder { previous, current } => {
                assert_eq!(previous, b"b");
                assert_eq!(current, b"a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_policy() {
        assert!(matches!(
            build_fsa(["a", "a"]),
            Err(FsaError::DuplicateInput(s)) if s == b"a"
        ));

        let options = BuilderOptions::new().duplicates(DuplicatePolicy::Skip);
        let fsa = build_fsa_with(options, ["a", "a", "b"]).unwrap();
        assert_eq!(collect(&fsa), vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn empty_policy() {
        assert!(matches!(build_fsa(["", "a"]), Err(FsaError::EmptyInput(0))));

        let fsa = build_fsa_with(BuilderOptions::lenient(), ["", "a"]).unwrap();
        assert_eq!(collect(&fsa), vec![b"a".to_vec()]);
    }

    #[test]
    fn prefix_of_previous_is_out_of_order() {
        assert!(matches!(
            build_fsa(["abc", "ab"]),
            Err(FsaError::InputOrder { .. })
        ));
    }

    #[test]
    fn empty_input_builds_empty_automaton() {
        let fsa = build_fsa(Vec::<&[u8]>::new()).unwrap();
        assert!(fsa.is_empty());
        assert_eq!(fsa.arc_count(), 0);
    }

    #[test]
    fn stats_track_progress() {
        let mut builder = FsaBuilder::with_options(BuilderOptions::lenient());
        builder.extend(["ab", "ab", "cb"]).unwrap();
        let stats = builder.stats();
        assert_eq!(stats.sequences, 2);
        assert_eq!(stats.skipped, 1);
        let fsa = builder.complete().unwrap();
        // "b" tail is shared: root{a,c} + {b}.
        assert_eq!(fsa.arc_count(), 3);
    }

    #[test]
    fn repeated_builds_are_identical() {
        let words = ["car", "card", "care", "cart", "cat", "dog"];
        let first = build_fsa(words).unwrap();
        let second = build_fsa(words).unwrap();
        assert_eq!(first.arc_records(), second.arc_records());
    }

    #[test]
    fn handles_high_bytes() {
        let words: [&[u8]; 3] = [b"z", &[0x80], &[0xFF, 0x00]];
        let fsa = build_fsa(words).unwrap();
        assert_eq!(collect(&fsa), vec![b"z".to_vec(), vec![0x80], vec![0xFF, 0x00]]);
    }
}
