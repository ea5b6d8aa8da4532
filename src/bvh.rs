//! Object-median BVH over a flat, index addressed node array.
//!
//! Nodes refer to each other and to primitives by `i32` index only (`-1` is
//! the sentinel) so the arrays can be uploaded as is and walked by a kernel
//! that has no pointers and no recursion.

use bytemuck::{Pod, Zeroable};
use rand::Rng;

use crate::{
    aabb::Aabb,
    error::{Error, Result},
    geometry::{Geometry, Hit},
    ray::Ray,
    rng::Pcg32,
    scope_print_major, Traversal,
};

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct BvhNode {
    pub aabb: Aabb,
    pub left: i32,
    pub right: i32,
    /// Primitive index for leaves, -1 for interior nodes.
    pub primitive: i32,
    /// Material of the leaf primitive, -1 for interior nodes.
    pub material: i32,
    /// Sum of the primitive areas below this node. Drives area sampling, this
    /// is not the surface area of `aabb`.
    pub area: f32,
    _padding: [u32; 3],
}

unsafe impl Pod for BvhNode {}
unsafe impl Zeroable for BvhNode {}

impl BvhNode {
    #[inline(always)]
    fn leaf(aabb: Aabb, primitive: u32, material: u32, area: f32) -> Self {
        Self {
            aabb,
            left: -1,
            right: -1,
            primitive: primitive as i32,
            material: material as i32,
            area,
            _padding: [0; 3],
        }
    }

    #[inline(always)]
    fn interior(left: (i32, &BvhNode), right: (i32, &BvhNode)) -> Self {
        Self {
            aabb: left.1.aabb.union(&right.1.aabb),
            left: left.0,
            right: right.0,
            primitive: -1,
            material: -1,
            area: left.1.area + right.1.area,
            _padding: [0; 3],
        }
    }

    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.primitive >= 0
    }
}

/// How the uniform number driving [`Bvh::sample`] is mapped onto the area range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AreaWarp {
    /// `sqrt(u) * area`. Favours leaves late in the left to right order.
    #[default]
    Sqrt,
    /// `u * area`. Every leaf is chosen in proportion to its area.
    Linear,
}

#[derive(Clone, Debug)]
pub struct Bvh<P> {
    nodes: Vec<BvhNode>,
    primitives: Vec<P>,
    root: i32,
    warp: AreaWarp,
}

impl<P> Default for Bvh<P> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            primitives: Vec::new(),
            root: -1,
            warp: AreaWarp::default(),
        }
    }
}

/// Per primitive data the builder sorts instead of the primitives themselves.
#[derive(Clone, Copy)]
struct BuildRef {
    index: u32,
    aabb: Aabb,
    centroid: glam::Vec3A,
    area: f32,
    material: u32,
}

impl<P: Geometry> Bvh<P> {
    /// Builds the hierarchy. Primitives keep their input order, leaves store
    /// the input index. Zero primitives give an empty BVH with root -1.
    #[tracing::instrument(level = "debug", skip_all, fields(prim_count = primitives.len()))]
    pub fn build(primitives: Vec<P>) -> Self {
        scope_print_major!("build bvh");
        if primitives.is_empty() {
            return Self::default();
        }

        let mut refs: Vec<BuildRef> = primitives
            .iter()
            .enumerate()
            .map(|(index, prim)| {
                let aabb = prim.bounds();
                debug_assert!(!aabb.min.is_nan() && !aabb.max.is_nan());
                BuildRef {
                    index: index as u32,
                    aabb,
                    centroid: aabb.centroid(),
                    area: prim.area(),
                    material: prim.material(),
                }
            })
            .collect();

        let mut nodes = Vec::with_capacity(2 * refs.len() - 1);
        let root = recursive_build(&mut refs, &mut nodes);
        tracing::debug!(nodes = nodes.len(), root, "bvh built");

        Self {
            nodes,
            primitives,
            root,
            warp: AreaWarp::default(),
        }
    }

    #[inline(always)]
    pub fn new_traversal(&self, ray: Ray) -> Traversal {
        let mut stack = Vec::with_capacity(96);
        if self.root >= 0 {
            stack.push(self.root);
        }
        Traversal { stack, ray }
    }

    /// Drains the traversal stack, keeping the nearest hit in `closest`.
    /// Boxes that start beyond `closest` are skipped.
    #[inline(always)]
    pub fn traverse(&self, state: &mut Traversal, closest: &mut Hit) {
        let dir_is_neg = state.ray.dir_is_neg();
        while let Some(current_node_index) = state.stack.pop() {
            let node = &self.nodes[current_node_index as usize];
            let t = node.aabb.intersect_ray(&state.ray, dir_is_neg);
            if t == f32::INFINITY || t > closest.distance {
                continue;
            }
            if node.is_leaf() {
                let hit = self.primitives[node.primitive as usize].intersect(&state.ray);
                *closest = closest.nearest(hit);
            } else {
                state.stack.push(node.right);
                state.stack.push(node.left);
            }
        }
    }

    /// Nearest hit along `ray`, or a miss with infinite distance.
    #[inline(always)]
    pub fn intersect(&self, ray: &Ray) -> Hit {
        let mut closest = Hit::none();
        if self.root < 0 {
            return closest;
        }
        let mut state = self.new_traversal(*ray);
        self.traverse(&mut state, &mut closest);
        closest
    }

    /// Picks a leaf by walking the area sums from the root, then samples a
    /// point on its primitive. The returned density is with respect to area
    /// over the whole hierarchy.
    pub fn sample(&self, rng: &mut Pcg32) -> Result<(Hit, f32)> {
        if self.root < 0 {
            return Err(Error::EmptyBvh);
        }
        let root_area = self.nodes[self.root as usize].area;
        let u: f32 = rng.random();
        let threshold = match self.warp {
            AreaWarp::Sqrt => u.sqrt() * root_area,
            AreaWarp::Linear => u * root_area,
        };
        let (hit, pdf) = self.sample_from(rng, self.root, threshold)?;
        Ok((hit, pdf / root_area))
    }

    fn sample_from(&self, rng: &mut Pcg32, start: i32, mut threshold: f32) -> Result<(Hit, f32)> {
        let mut index = start;
        loop {
            let node = &self.nodes[index as usize];
            if node.is_leaf() {
                let (hit, pdf) = self.primitives[node.primitive as usize].sample(rng)?;
                return Ok((hit, pdf * node.area));
            }
            let left_area = self.nodes[node.left as usize].area;
            if threshold < left_area {
                index = node.left;
            } else {
                threshold -= left_area;
                index = node.right;
            }
        }
    }
}

impl<P> Bvh<P> {
    #[must_use]
    pub fn with_sample_warp(mut self, warp: AreaWarp) -> Self {
        self.warp = warp;
        self
    }

    #[inline(always)]
    pub fn sample_warp(&self) -> AreaWarp {
        self.warp
    }

    /// Index of the root node, -1 when empty.
    #[inline(always)]
    pub fn root(&self) -> i32 {
        self.root
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.root < 0
    }

    #[inline(always)]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    #[inline(always)]
    pub fn primitives(&self) -> &[P] {
        &self.primitives
    }

    #[inline(always)]
    pub fn bounds(&self) -> Aabb {
        self.root_node().map_or_else(Aabb::empty, |node| node.aabb)
    }

    /// Total primitive area.
    #[inline(always)]
    pub fn area(&self) -> f32 {
        self.root_node().map_or(0.0, |node| node.area)
    }

    #[inline(always)]
    fn root_node(&self) -> Option<&BvhNode> {
        usize::try_from(self.root)
            .ok()
            .and_then(|root| self.nodes.get(root))
    }

    /// The node array as raw bytes, ready for upload.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }
}

impl<P: Pod> Bvh<P> {
    /// The primitive array as raw bytes, in the order leaves index it.
    pub fn primitive_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.primitives)
    }
}

/// Emits the subtree in post order and returns the index of its root.
fn recursive_build(refs: &mut [BuildRef], nodes: &mut Vec<BvhNode>) -> i32 {
    let node = match refs.len() {
        1 => {
            let r = refs[0];
            BvhNode::leaf(r.aabb, r.index, r.material, r.area)
        }
        2 => {
            let (left, right) = refs.split_at_mut(1);
            split(left, right, nodes)
        }
        len => {
            let centroid_bounds = refs
                .iter()
                .fold(Aabb::empty(), |aabb, r| aabb.union_point(r.centroid));
            let axis = centroid_bounds.max_extent_axis().index();
            refs.sort_unstable_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
            let (left, right) = refs.split_at_mut(len / 2);
            split(left, right, nodes)
        }
    };
    nodes.push(node);
    (nodes.len() - 1) as i32
}

#[inline(always)]
fn split(left: &mut [BuildRef], right: &mut [BuildRef], nodes: &mut Vec<BvhNode>) -> BvhNode {
    let left_index = recursive_build(left, nodes);
    let right_index = recursive_build(right, nodes);
    BvhNode::interior(
        (left_index, &nodes[left_index as usize]),
        (right_index, &nodes[right_index as usize]),
    )
}
