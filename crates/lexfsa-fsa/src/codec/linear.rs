// Node ordering shared by the writers.
//
// Nodes are laid out in chains: after a node comes the target of its last arc
// whenever that target is not placed yet, so the arc can be written without an
// address. Other targets are queued and start chains of their own.

use hashbrown::HashMap;

use crate::FsaError;
use crate::analysis::{RightLanguage, reachable_nodes};
use crate::fsa::{ArcId, Fsa, NO_ARC, NodeId, TERMINAL_NODE};

pub(crate) struct LinearArc {
    pub label: u8,
    pub is_final: bool,
    /// Index of the target in [`Linearized::nodes`]; `None` for terminal arcs.
    pub target: Option<usize>,
}

pub(crate) struct LinearNode {
    pub arcs: Vec<LinearArc>,
    pub count: u64,
}

pub(crate) struct Linearized {
    pub nodes: Vec<LinearNode>,
    pub root: Option<usize>,
}

impl Linearized {
    /// Whether the last arc of node `index` can point at the node after it.
    pub fn follows(&self, index: usize) -> bool {
        self.nodes[index]
            .arcs
            .last()
            .and_then(|arc| arc.target)
            .is_some_and(|target| target == index + 1)
    }
}

// Target node of `arc`, treating arcs into arc-less nodes as terminal.
fn target<F: Fsa + ?Sized>(fsa: &F, arc: ArcId) -> Option<NodeId> {
    if fsa.is_arc_terminal(arc) {
        return None;
    }
    let node = fsa.end_node(arc);
    (node != TERMINAL_NODE && fsa.first_arc(node) != NO_ARC).then_some(node)
}

fn arcs_of<F: Fsa + ?Sized>(fsa: &F, node: NodeId) -> Vec<ArcId> {
    let mut arcs = Vec::new();
    let mut arc = fsa.first_arc(node);
    while arc != NO_ARC {
        arcs.push(arc);
        arc = fsa.next_arc(arc);
    }
    arcs
}

/// Nodes referenced by at least two arcs, most referenced first.
pub(crate) fn hot_nodes<F: Fsa + ?Sized>(fsa: &F, limit: usize) -> Vec<NodeId> {
    let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
    for node in reachable_nodes(fsa) {
        for arc in arcs_of(fsa, node) {
            if let Some(target) = target(fsa, arc) {
                *in_degree.entry(target).or_default() += 1;
            }
        }
    }
    let mut hot: Vec<(NodeId, usize)> = in_degree
        .into_iter()
        .filter(|&(_, degree)| degree >= 2)
        .collect();
    hot.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    hot.truncate(limit);
    hot.into_iter().map(|(node, _)| node).collect()
}

/// Orders the reachable nodes of `fsa`, starting with `first` (in order) and
/// then the root.
pub(crate) fn linearize<F: Fsa + ?Sized>(
    fsa: &F,
    first: &[NodeId],
    with_counts: bool,
) -> Result<Linearized, FsaError> {
    let root = fsa.root_node();
    if root == TERMINAL_NODE || fsa.first_arc(root) == NO_ARC {
        return Ok(Linearized {
            nodes: Vec::new(),
            root: None,
        });
    }

    let mut index: HashMap<NodeId, usize> = HashMap::new();
    let mut order: Vec<NodeId> = Vec::new();
    let mut pending: Vec<NodeId> = vec![root];
    pending.extend(first.iter().rev().copied());

    while let Some(start) = pending.pop() {
        let mut node = start;
        while !index.contains_key(&node) {
            index.insert(node, order.len());
            order.push(node);

            let arcs = arcs_of(fsa, node);
            let chain = arcs
                .last()
                .and_then(|&arc| target(fsa, arc))
                .filter(|next| !index.contains_key(next));
            for &arc in arcs.iter().rev() {
                if let Some(next) = target(fsa, arc) {
                    if Some(next) != chain && !index.contains_key(&next) {
                        pending.push(next);
                    }
                }
            }
            match chain {
                Some(next) => node = next,
                None => break,
            }
        }
    }

    let counts = with_counts.then(|| RightLanguage::of(fsa)).transpose()?;
    let nodes = order
        .iter()
        .map(|&node| LinearNode {
            arcs: arcs_of(fsa, node)
                .into_iter()
                .map(|arc| LinearArc {
                    label: fsa.arc_label(arc),
                    is_final: fsa.is_arc_final(arc),
                    target: target(fsa, arc).and_then(|t| index.get(&t).copied()),
                })
                .collect(),
            count: counts.as_ref().map_or(0, |c| c.count(node)),
        })
        .collect();

    log::trace!("linearized {} nodes", order.len());
    Ok(Linearized {
        root: index.get(&root).copied(),
        nodes,
    })
}
