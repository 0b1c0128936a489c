//! Bounding Volume Hierarchy over the triangles of one mesh.
//!
//! Nodes live in a single arena (`Vec<BvhNode>`), children are referenced by index
//! and leaves reference a contiguous range of a reordered face index list. The tree
//! is built once and never modified; editing the mesh drops it.

use crate::mesh::{Face, Vertex};
use tessera_math::{Aabb, DVec3, Interval, Ray};

/// Maximum faces per leaf node before splitting.
pub const LEAF_MAX_SIZE: usize = 4;

/// Centroid extent below which an axis counts as degenerate. Also the minimum
/// thickness given to node bounds so flat geometry still has a hittable box.
pub const BVH_CONSTRUCTION_EPSILON: f64 = 1e-4;

/// What a node holds besides its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvhNodeKind {
    /// `count` faces starting at `first` in the reordered face list.
    Leaf { first: u32, count: u32 },
    /// Two child node indices.
    Branch { left: u32, right: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub kind: BvhNodeKind,
}

/// Per-face data used only during construction.
#[derive(Debug, Clone, Copy)]
struct FaceInfo {
    index: u32,
    bounds: Aabb,
    centroid: DVec3,
}

/// Arena-backed BVH. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    face_indices: Vec<u32>,
}

impl Bvh {
    /// Build over every face of a mesh. Face indices must be valid for `vertices`.
    pub fn build(vertices: &[Vertex], faces: &[Face]) -> Self {
        let bounds: Vec<Aabb> = faces
            .iter()
            .map(|face| {
                Aabb::from_point_cloud(
                    face.indices.iter().map(|&i| vertices[i as usize].position),
                )
            })
            .collect();
        Self::from_primitive_bounds(&bounds)
    }

    /// Build over arbitrary primitives given their bounds. The primitive index is the
    /// position in `bounds`.
    pub fn from_primitive_bounds(bounds: &[Aabb]) -> Self {
        let mut infos: Vec<FaceInfo> = bounds
            .iter()
            .enumerate()
            .map(|(i, b)| FaceInfo {
                index: i as u32,
                bounds: *b,
                centroid: b.centroid(),
            })
            .collect();

        let mut bvh = Bvh {
            nodes: Vec::with_capacity(2 * infos.len() / LEAF_MAX_SIZE + 1),
            face_indices: Vec::with_capacity(infos.len()),
        };

        if infos.is_empty() {
            bvh.nodes.push(BvhNode {
                bounds: Aabb::EMPTY,
                kind: BvhNodeKind::Leaf { first: 0, count: 0 },
            });
        } else {
            bvh.build_recursive(&mut infos);
        }

        log::debug!(
            "Built BVH: {} faces, {} nodes, depth {}",
            bvh.face_indices.len(),
            bvh.nodes.len(),
            bvh.depth()
        );
        bvh
    }

    /// Recursive median split. Returns the index of the node it created.
    fn build_recursive(&mut self, infos: &mut [FaceInfo]) -> u32 {
        let bounds = infos
            .iter()
            .fold(Aabb::EMPTY, |acc, info| Aabb::union(&acc, &info.bounds))
            .padded(BVH_CONSTRUCTION_EPSILON);

        let centroid_bounds = Aabb::from_point_cloud(infos.iter().map(|info| info.centroid));
        let degenerate = (0..3)
            .all(|axis| centroid_bounds.axis_interval(axis).size() < BVH_CONSTRUCTION_EPSILON);

        let node_index = self.nodes.len() as u32;

        if infos.len() <= LEAF_MAX_SIZE || degenerate {
            let first = self.face_indices.len() as u32;
            self.face_indices.extend(infos.iter().map(|info| info.index));
            self.nodes.push(BvhNode {
                bounds,
                kind: BvhNodeKind::Leaf {
                    first,
                    count: infos.len() as u32,
                },
            });
            return node_index;
        }

        let axis = centroid_bounds.longest_axis();
        let mid = infos.len() / 2;
        infos.select_nth_unstable_by(mid, |a, b| {
            a.centroid[axis]
                .partial_cmp(&b.centroid[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Reserve the slot, children are patched in once built.
        self.nodes.push(BvhNode {
            bounds,
            kind: BvhNodeKind::Branch { left: 0, right: 0 },
        });

        let (left_infos, right_infos) = infos.split_at_mut(mid);
        let left = self.build_recursive(left_infos);
        let right = self.build_recursive(right_infos);
        self.nodes[node_index as usize].kind = BvhNodeKind::Branch { left, right };

        node_index
    }

    /// Nearest-hit traversal.
    ///
    /// `hit_face(face, range)` tests one face against the ray restricted to `range` and
    /// returns the hit distance. Every distance it returns is closer than all previous
    /// ones, so the last face it reported a hit for is the nearest. Subtrees whose entry
    /// distance is not closer than the current best are skipped.
    pub fn traverse<F>(&self, ray: &Ray, mut hit_face: F) -> Option<f64>
    where
        F: FnMut(u32, Interval) -> Option<f64>,
    {
        let mut closest = ray.range.max;
        let mut found = false;

        let root = &self.nodes[0];
        let Some(root_span) = root.bounds.intersect(ray, ray.range) else {
            return None;
        };

        let mut stack: Vec<(u32, f64)> = Vec::with_capacity(64);
        stack.push((0, root_span.min));

        while let Some((node_index, entry)) = stack.pop() {
            if entry >= closest {
                continue;
            }
            let node = &self.nodes[node_index as usize];
            match node.kind {
                BvhNodeKind::Leaf { first, count } => {
                    let range = first as usize..(first + count) as usize;
                    for &face in &self.face_indices[range] {
                        if let Some(t) = hit_face(face, ray.range.with_max(closest)) {
                            closest = t;
                            found = true;
                        }
                    }
                }
                BvhNodeKind::Branch { left, right } => {
                    let search = ray.range.with_max(closest);
                    let left_entry = self.entry_distance(left, ray, search);
                    let right_entry = self.entry_distance(right, ray, search);

                    // Push the far child first so the near one is popped next.
                    match (left_entry, right_entry) {
                        (Some(tl), Some(tr)) if tl <= tr => {
                            stack.push((right, tr));
                            stack.push((left, tl));
                        }
                        (Some(tl), Some(tr)) => {
                            stack.push((left, tl));
                            stack.push((right, tr));
                        }
                        (Some(tl), None) => stack.push((left, tl)),
                        (None, Some(tr)) => stack.push((right, tr)),
                        (None, None) => {}
                    }
                }
            }
        }

        found.then_some(closest)
    }

    fn entry_distance(&self, node: u32, ray: &Ray, range: Interval) -> Option<f64> {
        self.nodes[node as usize]
            .bounds
            .intersect(ray, range)
            .map(|span| span.min)
    }

    /// Bounds of the whole tree.
    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Face indices in leaf order.
    pub fn face_indices(&self) -> &[u32] {
        &self.face_indices
    }

    /// Length of the longest root-to-leaf path, counting nodes.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0u32, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let BvhNodeKind::Branch { left, right } = self.nodes[index as usize].kind {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }
}
