//! Pooled octree backing the Barnes-Hut force approximation.
//!
//! Nodes live in a flat pool and refer to each other by index. The pool is cleared
//! rather than freed between rebuilds, so stepping a simulation does not churn the heap.
use glam::DVec3;

use crate::math::{Body, MathUtils};

/// Extra half-width added around the bodies' bounding box when sizing the root cube (AU)
const ROOT_PADDING: f64 = 0.1;

/// Subdivision stops at this depth; further bodies landing in the leaf are folded
/// into its aggregate mass. Only reachable for (nearly) coincident bodies.
const MAX_DEPTH: u32 = 64;

const NO_LEAF: usize = usize::MAX;

const INITIAL_CAPACITY: usize = 1024;

/// One cubic cell of the tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeNode {
    /// Minimum corner of the cube
    pub min_corner: DVec3,
    /// Side length of the cube
    pub size: f64,
    pub center_of_mass: DVec3,
    pub total_mass: f64,
    /// Pool indices of the children, by octant
    pub children: [Option<usize>; 8],
    /// Body held by a leaf
    pub body: Option<usize>,
    pub is_leaf: bool,
}

impl OctreeNode {
    fn reset(&mut self, min_corner: DVec3, size: f64) {
        *self = Self {
            min_corner,
            size,
            ..Self::default()
        };
    }

    pub fn midpoint(&self) -> DVec3 {
        self.min_corner + DVec3::splat(self.size * 0.5)
    }

    /// Octant index of a point: bit 0 set for +X, bit 1 for +Y, bit 2 for +Z
    /// relative to the node midpoint.
    pub fn octant_for(&self, point: DVec3) -> usize {
        let mid = self.midpoint();
        let mut index = 0;
        if point.x >= mid.x {
            index |= 1;
        }
        if point.y >= mid.y {
            index |= 2;
        }
        if point.z >= mid.z {
            index |= 4;
        }
        index
    }

    fn child_min_corner(&self, octant: usize) -> DVec3 {
        let half = self.size * 0.5;
        let mut min = self.min_corner;
        if octant & 1 != 0 {
            min.x += half;
        }
        if octant & 2 != 0 {
            min.y += half;
        }
        if octant & 4 != 0 {
            min.z += half;
        }
        min
    }

    fn accumulate(&mut self, position: DVec3, mass: f64) {
        let combined = self.total_mass + mass;
        self.center_of_mass = (self.center_of_mass * self.total_mass + position * mass) / combined;
        self.total_mass = combined;
    }
}

impl Default for OctreeNode {
    fn default() -> Self {
        Self {
            min_corner: DVec3::ZERO,
            size: 0.0,
            center_of_mass: DVec3::ZERO,
            total_mass: 0.0,
            children: [None; 8],
            body: None,
            is_leaf: true,
        }
    }
}

/// Arena of octree nodes, rebuilt from scratch every step.
#[derive(Debug, Clone)]
pub struct OctreePool {
    nodes: Vec<OctreeNode>,
    next_free: usize,
    root: Option<usize>,
    /// Leaf whose aggregate holds each body, by body index
    leaf_of: Vec<usize>,
    /// Reused between force queries for the iterative traversal
    traversal_stack: Vec<usize>,
}

impl OctreePool {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: vec![OctreeNode::default(); capacity.max(1)],
            next_free: 0,
            root: None,
            leaf_of: Vec::new(),
            traversal_stack: Vec::with_capacity(256),
        }
    }

    /// Forget every node without releasing memory
    pub fn clear(&mut self) {
        self.next_free = 0;
        self.root = None;
        self.leaf_of.clear();
    }

    /// Take a node from the pool, doubling the pool when it is exhausted
    pub fn allocate(&mut self, min_corner: DVec3, size: f64) -> usize {
        if self.next_free >= self.nodes.len() {
            let grown = (self.nodes.len() * 2).max(1);
            self.nodes.resize(grown, OctreeNode::default());
        }
        let index = self.next_free;
        self.next_free += 1;
        self.nodes[index].reset(min_corner, size);
        index
    }

    /// Number of nodes in use
    pub fn len(&self) -> usize {
        self.next_free
    }

    pub fn is_empty(&self) -> bool {
        self.next_free == 0
    }

    /// Number of nodes the pool can hold before growing
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> Option<usize> {
        self.root
    }

    pub fn node(&self, index: usize) -> &OctreeNode {
        &self.nodes[index]
    }

    /// Clear the pool and insert every body, sizing the root cube to enclose them all.
    ///
    /// Returns the root index, or `None` for an empty body set.
    pub fn build(&mut self, bodies: &[Body]) -> Option<usize> {
        self.clear();
        if bodies.is_empty() {
            return None;
        }

        let (min, max) = bodies.iter().fold(
            (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
            |(min, max), b| (min.min(b.position), max.max(b.position)),
        );
        let half = (max - min).max_element() * 0.5 + ROOT_PADDING;
        let mid = (min + max) * 0.5;

        let root = self.allocate(mid - DVec3::splat(half), half * 2.0);
        self.root = Some(root);
        for index in 0..bodies.len() {
            self.insert(root, index, bodies, 0);
        }

        log::trace!(
            "Built octree: {} bodies, {} nodes, pool capacity {}",
            bodies.len(),
            self.len(),
            self.capacity()
        );
        Some(root)
    }

    /// Insert body `index` below `node`. Every node on the way absorbs the body's
    /// mass, so each node's aggregate always covers its whole subtree.
    pub fn insert(&mut self, node: usize, index: usize, bodies: &[Body], depth: u32) {
        let position = bodies[index].position;
        let mass = bodies[index].mass;

        if !self.nodes[node].is_leaf {
            self.nodes[node].accumulate(position, mass);
            self.insert_into_child(node, index, bodies, depth);
            return;
        }

        let Some(existing) = self.nodes[node].body else {
            let leaf = &mut self.nodes[node];
            leaf.body = Some(index);
            leaf.total_mass = mass;
            leaf.center_of_mass = position;
            self.set_leaf(index, node);
            return;
        };

        self.nodes[node].accumulate(position, mass);
        if depth >= MAX_DEPTH {
            self.set_leaf(index, node);
            return;
        }

        let leaf = &mut self.nodes[node];
        leaf.is_leaf = false;
        leaf.body = None;
        self.insert_into_child(node, existing, bodies, depth);
        self.insert_into_child(node, index, bodies, depth);
    }

    fn set_leaf(&mut self, index: usize, node: usize) {
        if self.leaf_of.len() <= index {
            self.leaf_of.resize(index + 1, NO_LEAF);
        }
        self.leaf_of[index] = node;
    }

    fn insert_into_child(&mut self, node: usize, index: usize, bodies: &[Body], depth: u32) {
        let octant = self.nodes[node].octant_for(bodies[index].position);
        let child = match self.nodes[node].children[octant] {
            Some(child) => child,
            None => {
                let min_corner = self.nodes[node].child_min_corner(octant);
                let size = self.nodes[node].size * 0.5;
                let child = self.allocate(min_corner, size);
                self.nodes[node].children[octant] = Some(child);
                child
            }
        };
        self.insert(child, index, bodies, depth + 1);
    }

    /// Barnes-Hut acceleration on body `index` (AU/yr²).
    ///
    /// Cells whose `size / distance` falls below `theta` are treated as a point mass at
    /// their centre of mass; closer cells are opened. Leaves act directly, minus the query
    /// body's own share when it is part of the leaf's aggregate.
    pub fn acceleration_on(&mut self, index: usize, bodies: &[Body], theta: f64, softening: f64) -> DVec3 {
        let Some(root) = self.root else {
            return DVec3::ZERO;
        };
        let position = bodies[index].position;
        let mass = bodies[index].mass;
        let own_leaf = self.leaf_of.get(index).copied().unwrap_or(NO_LEAF);
        let mut acceleration = DVec3::ZERO;

        self.traversal_stack.clear();
        self.traversal_stack.push(root);

        while let Some(node_index) = self.traversal_stack.pop() {
            let node = &self.nodes[node_index];
            let offset = node.center_of_mass - position;

            if node.is_leaf {
                if node_index != own_leaf {
                    acceleration += MathUtils::softened_acceleration(node.total_mass, offset, softening);
                    continue;
                }
                // Bodies folded in alongside the query at the depth cap
                let rest_mass = node.total_mass - mass;
                if rest_mass > 0.0 {
                    let rest_com = (node.center_of_mass * node.total_mass - position * mass) / rest_mass;
                    acceleration +=
                        MathUtils::softened_acceleration(rest_mass, rest_com - position, softening);
                }
                continue;
            }

            let distance = offset.length();
            if node.size / distance < theta {
                acceleration += MathUtils::softened_acceleration(node.total_mass, offset, softening);
            } else {
                self.traversal_stack
                    .extend(node.children.iter().flatten().copied());
            }
        }

        acceleration
    }

    /// Sum of masses in the subtree rooted at `node`, found by walking down to the leaves
    pub fn subtree_mass(&self, node: usize) -> f64 {
        let node = &self.nodes[node];
        if node.is_leaf {
            return node.total_mass;
        }
        node.children
            .iter()
            .flatten()
            .map(|&child| self.subtree_mass(child))
            .sum()
    }
}

impl Default for OctreePool {
    fn default() -> Self {
        Self::new()
    }
}
