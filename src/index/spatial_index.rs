use rstar::{RTree, RTreeObject, AABB};

use crate::shape::Shape;

// Envelope of one shape, tagged with its position in the indexed sequence
#[derive(Clone, Copy, Debug)]
struct IndexedEnvelope {
    envelope: AABB<[f64; 2]>,
    position: usize,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Bounding-box R-tree over a fixed sequence of shapes.
///
/// Positions reported by queries are positions in the sequence passed to [`SpatialIndex::build`].
/// Boxes that merely touch count as overlapping, so shapes meeting at an endpoint are reported.
pub struct SpatialIndex {
    tree: RTree<IndexedEnvelope>,
}

impl SpatialIndex {
    /// Bulk loads the index. Shapes without an envelope are never reported.
    pub fn build(shapes: &[&Shape]) -> Self {
        let envelopes: Vec<IndexedEnvelope> = shapes
            .iter()
            .enumerate()
            .filter_map(|(position, shape)| {
                shape
                    .envelope()
                    .map(|envelope| IndexedEnvelope { envelope, position })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(envelopes),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Every pair of positions whose boxes overlap, from a single tree-against-itself traversal.
    ///
    /// Pairs come in both orders and include self pairs; callers canonicalize.
    pub fn query_self_intersecting_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.tree
            .intersection_candidates_with_other_tree(&self.tree)
            .map(|(p, q)| (p.position, q.position))
    }

    /// Positions whose boxes overlap the box of `shape`.
    pub fn query_candidates(&self, shape: &Shape) -> Vec<usize> {
        match shape.envelope() {
            Some(envelope) => self
                .tree
                .locate_in_envelope_intersecting(&envelope)
                .map(|e| e.position)
                .collect(),
            None => Vec::new(),
        }
    }

    /// One-shape-at-a-time equivalent of [`SpatialIndex::query_self_intersecting_pairs`].
    ///
    /// `shapes` must be the sequence the index was built from.
    pub fn query_each(&self, shapes: &[&Shape]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, shape) in shapes.iter().enumerate() {
            pairs.extend(self.query_candidates(shape).into_iter().map(|j| (i, j)));
        }
        pairs
    }
}
