//! Envelope index used to cull geometry parts against a query window.

use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::Envelope;

/// R-tree leaf tying a bounding envelope back to a part in the owning
/// layer's geometry.
#[derive(Debug, Clone)]
pub struct PartEntry {
    pub part_index: usize,
    pub envelope: Envelope,
}

impl RTreeObject for PartEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.envelope.min_x, self.envelope.min_y],
            [self.envelope.max_x, self.envelope.max_y],
        )
    }
}

/// Bulk-loaded R-tree over part envelopes. Built once when a layer's
/// geometry is decoded, queried with the viewport window every pass.
pub struct SpatialIndex {
    tree: RTree<PartEntry>,
}

impl SpatialIndex {
    pub fn build(entries: Vec<PartEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Indices of the parts whose envelope intersects the window, in no
    /// particular order.
    pub fn parts_intersecting(&self, window: &Envelope) -> Vec<usize> {
        let aabb = AABB::from_corners(
            [window.min_x, window.min_y],
            [window.max_x, window.max_y],
        );
        self.tree
            .locate_in_envelope_intersecting(&aabb)
            .map(|entry| entry.part_index)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
