//! Sorting the blocks reachable from a root into placement sets.
//!
//! Only *top-level* system blocks are placed by the allocator. Blocks that
//! are parts of another block are *embedded*: they follow their owner and
//! are never placed on their own, even when some other block also points at
//! them. Graphics blocks are leaves placed in their own segment.

use indexmap::IndexSet;
use tracing::{debug, instrument, trace};

use crate::block::{BlockId, BlockKind};
use crate::graph::ResourceGraph;

/// The result of classifying a graph
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockSets {
    /// Top-level system blocks, in first discovery order
    pub system: IndexSet<BlockId>,

    /// Graphics blocks, in first discovery order
    pub graphics: IndexSet<BlockId>,

    /// Blocks embedded in some other block
    pub embedded: IndexSet<BlockId>,
}

/// Walk every block reachable from `root` and sort it into [`BlockSets`].
///
/// Terminates on cyclic graphs; calling it twice on the same graph yields the
/// same sets in the same order.
#[instrument(skip_all, fields(%root))]
pub fn classify(graph: &ResourceGraph, root: BlockId) -> BlockSets {
    let mut sets = BlockSets::default();

    let mut visited = IndexSet::new();
    visited.insert(root);
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if graph.kind(id) != BlockKind::System {
            trace!(block = %id, "graphics block");
            sets.graphics.insert(id);
            continue;
        }

        sets.system.insert(id);
        push_references(graph, id, &mut visited, &mut stack);

        let mut parts = graph.parts(id).into_iter().map(|(_, p)| p).collect::<Vec<_>>();
        while let Some(part) = parts.pop() {
            if !sets.embedded.insert(part) {
                continue;
            }
            trace!(block = %part, owner = %id, "embedded block");

            push_references(graph, part, &mut visited, &mut stack);
            parts.extend(graph.parts(part).into_iter().map(|(_, p)| p));
        }
    }

    sets.system.retain(|id| !sets.embedded.contains(id));

    debug!(
        system = sets.system.len(),
        graphics = sets.graphics.len(),
        embedded = sets.embedded.len(),
        "graph classified"
    );
    sets
}

fn push_references(
    graph: &ResourceGraph,
    id: BlockId,
    visited: &mut IndexSet<BlockId>,
    stack: &mut Vec<BlockId>,
) {
    for reference in graph.references(id).into_iter().flatten() {
        if visited.insert(reference) {
            stack.push(reference);
        }
    }
}
