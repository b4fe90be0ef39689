//! Joint hierarchies and forward-kinematics solving.
//!
//! A [`Skeleton`] owns its joints in a flat arena and keeps a separate solve
//! list. Solving a joint first brings its ancestor chain up to date, so the
//! list only has to contain every joint once; it does not need to be sorted
//! parent-first.
//!
//! ```
//! use rigpass::{Skeleton, Transform, Vec3};
//!
//! let mut skeleton = Skeleton::new();
//! let torso = skeleton.add_node("torso", Transform::new());
//! let head = skeleton.add_node("head", Transform::from_position(Vec3::Y));
//! skeleton.attach(head, torso)?;
//!
//! skeleton.solve_all()?;
//! let head_world = skeleton.world_transform(head).unwrap();
//! # Ok::<(), rigpass::SkeletonError>(())
//! ```

mod node;
mod rig;

pub use node::{Node, NodeId};
pub use rig::Puppet;

use glam::{Mat4, Quat};

use crate::error::SkeletonError;
use crate::transform::Transform;

/// An arena of joints plus the order they are solved in.
#[derive(Clone, Debug)]
pub struct Skeleton {
    nodes: Vec<Node>,
    order: Vec<NodeId>,
    /// Bumped whenever cached world poses become stale. Starts at 1 so that a
    /// fresh node (`solved_in == 0`) is never considered current.
    generation: u64,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new()
    }
}

impl Skeleton {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            order: Vec::new(),
            generation: 1,
        }
    }

    /// Builds a skeleton from `(name, local pose, parent index)` records.
    ///
    /// Links are taken as given: dangling parent indices and cycles are not
    /// rejected here but reported by [`solve_fk`](Self::solve_fk). The solve
    /// order is the record order.
    pub fn from_parents<S, I>(records: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Transform, Option<usize>)>,
    {
        let mut skeleton = Self::new();
        let mut parents = Vec::new();
        for (name, local, parent) in records {
            skeleton.add_node(name, local);
            parents.push(parent);
        }

        let count = skeleton.nodes.len();
        for (index, parent) in parents.into_iter().enumerate() {
            let Some(parent) = parent else { continue };
            skeleton.nodes[index].parent = Some(NodeId(parent));
            if parent < count {
                skeleton.nodes[parent].children.push(NodeId(index));
            }
        }
        skeleton
    }

    /// Adds an unparented node and appends it to the solve order.
    pub fn add_node(&mut self, name: impl Into<String>, local: Transform) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name, local));
        self.order.push(id);
        id
    }

    /// Links `child` under `parent`.
    ///
    /// Fails if either id is unknown, if `child` already has a parent, or if
    /// the link would make `child` its own ancestor.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<(), SkeletonError> {
        self.node_checked(child)?;
        self.node_checked(parent)?;

        if let Some(existing) = self.nodes[child.0].parent {
            return Err(SkeletonError::AlreadyParented {
                child,
                parent: existing,
            });
        }

        // Walk up from the new parent; meeting `child` means a loop.
        let mut current = Some(parent);
        let mut steps = 0;
        while let Some(id) = current {
            if id == child || steps > self.nodes.len() {
                return Err(SkeletonError::Cycle(child));
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
            steps += 1;
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.invalidate();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
    }

    pub fn solve_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Replaces the solve order. The list must contain every node exactly once.
    pub fn set_solve_order(&mut self, order: Vec<NodeId>) -> Result<(), SkeletonError> {
        let expected = self.nodes.len();
        let mut seen = vec![false; expected];
        let valid = order.len() == expected
            && order
                .iter()
                .all(|id| id.0 < expected && !std::mem::replace(&mut seen[id.0], true));
        if !valid {
            return Err(SkeletonError::InvalidSolveOrder { expected });
        }
        self.order = order;
        Ok(())
    }

    /// Replaces a node's local pose and marks every cached world pose stale.
    pub fn set_local(&mut self, id: NodeId, local: Transform) -> Result<(), SkeletonError> {
        self.node_checked(id)?;
        self.nodes[id.0].local = local;
        self.invalidate();
        Ok(())
    }

    pub fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), SkeletonError> {
        let local = self.node_checked(id)?.local.rotation(rotation);
        self.set_local(id, local)
    }

    pub fn local_transform(&self, id: NodeId) -> Result<Mat4, SkeletonError> {
        Ok(self.node_checked(id)?.local_transform())
    }

    /// Marks all cached world poses stale; the next solve recomputes them.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    /// World pose of `id` if it was solved since the last invalidation.
    pub fn world_transform(&self, id: NodeId) -> Option<Mat4> {
        self.nodes
            .get(id.0)
            .filter(|n| n.solved_in == self.generation)
            .map(|n| n.world)
    }

    /// Computes and caches the world pose of `id` as `parent_world * local`.
    ///
    /// Ancestors that are not current are solved first, root-most first, so
    /// the result does not depend on the order nodes are visited in. The walk
    /// is bounded by the node count; exceeding it means the links loop.
    pub fn solve_fk(&mut self, id: NodeId) -> Result<Mat4, SkeletonError> {
        self.node_checked(id)?;

        let mut chain = Vec::new();
        let mut parent_world = Mat4::IDENTITY;
        let mut current = Some(id);
        let mut previous = id;

        while let Some(cur) = current {
            let Some(node) = self.nodes.get(cur.0) else {
                return Err(SkeletonError::MissingParent {
                    child: previous,
                    parent: cur,
                });
            };
            if node.solved_in == self.generation {
                parent_world = node.world;
                break;
            }
            if chain.len() == self.nodes.len() {
                return Err(SkeletonError::Cycle(id));
            }
            chain.push(cur);
            previous = cur;
            current = node.parent;
        }

        for cur in chain.into_iter().rev() {
            let node = &mut self.nodes[cur.0];
            parent_world *= node.local.matrix();
            node.world = parent_world;
            node.solved_in = self.generation;
        }
        Ok(parent_world)
    }

    /// Starts a fresh solve and solves every node in the solve order.
    pub fn solve_all(&mut self) -> Result<(), SkeletonError> {
        self.invalidate();
        for index in 0..self.order.len() {
            let id = self.order[index];
            self.solve_fk(id)?;
        }
        log::trace!("solved {} joints", self.order.len());
        Ok(())
    }

    /// World poses of all solved nodes in solve order.
    pub fn world_transforms(&self) -> impl Iterator<Item = (NodeId, Mat4)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.world_transform(id).map(|m| (id, m)))
    }

    fn node_checked(&self, id: NodeId) -> Result<&Node, SkeletonError> {
        self.nodes.get(id.0).ok_or(SkeletonError::UnknownNode(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn chain_of_three() -> (Skeleton, [NodeId; 3]) {
        let mut s = Skeleton::new();
        let a = s.add_node(
            "a",
            Transform::new()
                .position(Vec3::new(1.0, 0.0, 0.0))
                .rotation(Quat::from_rotation_y(0.4)),
        );
        let b = s.add_node(
            "b",
            Transform::new()
                .position(Vec3::new(0.0, 2.0, 0.0))
                .uniform_scale(0.5),
        );
        let c = s.add_node(
            "c",
            Transform::new()
                .position(Vec3::new(0.0, 0.0, -3.0))
                .rotation(Quat::from_rotation_x(-1.1)),
        );
        s.attach(b, a).unwrap();
        s.attach(c, b).unwrap();
        (s, [a, b, c])
    }

    fn snapshot(s: &Skeleton) -> Vec<Mat4> {
        (0..s.len())
            .map(|i| s.world_transform(NodeId(i)).unwrap())
            .collect()
    }

    #[test]
    fn root_world_equals_local() {
        let (mut s, [a, _, _]) = chain_of_three();
        s.solve_all().unwrap();
        assert_eq!(s.world_transform(a), Some(s.local_transform(a).unwrap()));
    }

    #[test]
    fn child_world_composes_parent_world() {
        let puppet = Puppet::new();
        let mut s = puppet.skeleton;
        s.solve_all().unwrap();

        for (id, node) in s.nodes() {
            let world = s.world_transform(id).unwrap();
            let expected = match node.parent() {
                Some(p) => s.world_transform(p).unwrap() * node.local_transform(),
                None => node.local_transform(),
            };
            assert!(world.abs_diff_eq(expected, 1e-5), "{}", node.name());
        }
    }

    #[test]
    fn leaf_first_solve_resolves_ancestors() {
        let (mut s, [a, b, c]) = chain_of_three();
        s.invalidate();
        let world_c = s.solve_fk(c).unwrap();

        let expected = s.local_transform(a).unwrap()
            * s.local_transform(b).unwrap()
            * s.local_transform(c).unwrap();
        assert!(world_c.abs_diff_eq(expected, 1e-5));
        assert!(s.world_transform(a).is_some());
        assert!(s.world_transform(b).is_some());
    }

    #[test]
    fn solve_is_independent_of_order() {
        let mut reference = Puppet::new().skeleton;
        reference.solve_all().unwrap();
        let expected = snapshot(&reference);

        for seed in 0..16 {
            let mut s = Puppet::new().skeleton;
            let mut order = s.solve_order().to_vec();
            order.shuffle(&mut StdRng::seed_from_u64(seed));
            s.set_solve_order(order).unwrap();
            s.solve_all().unwrap();

            for (got, want) in snapshot(&s).iter().zip(&expected) {
                assert!(got.abs_diff_eq(*want, 1e-6), "seed {seed}");
            }
        }
    }

    #[test]
    fn solving_does_not_touch_local_pose() {
        let (mut s, ids) = chain_of_three();
        let before: Vec<Transform> = ids.iter().map(|&id| *s.node(id).unwrap().local()).collect();
        s.solve_all().unwrap();
        let after: Vec<Transform> = ids.iter().map(|&id| *s.node(id).unwrap().local()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn set_local_invalidates_cache() {
        let (mut s, [a, _, c]) = chain_of_three();
        s.solve_all().unwrap();
        let old = s.world_transform(c).unwrap();

        let moved = s.node(a).unwrap().local().position(Vec3::new(5.0, 0.0, 0.0));
        s.set_local(a, moved).unwrap();
        assert!(s.world_transform(c).is_none());

        let new = s.solve_fk(c).unwrap();
        assert!(!new.abs_diff_eq(old, 1e-3));
        let offset = new.w_axis.truncate() - old.w_axis.truncate();
        assert!(offset.abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn cycle_is_reported() {
        let mut s = Skeleton::from_parents([
            ("a", Transform::new(), Some(1)),
            ("b", Transform::new(), Some(0)),
        ]);
        assert_eq!(s.solve_all(), Err(SkeletonError::Cycle(NodeId(0))));
        assert_eq!(s.solve_fk(NodeId(1)), Err(SkeletonError::Cycle(NodeId(1))));
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let mut s = Skeleton::from_parents([("a", Transform::new(), Some(0))]);
        assert_eq!(s.solve_fk(NodeId(0)), Err(SkeletonError::Cycle(NodeId(0))));
    }

    #[test]
    fn missing_parent_is_reported() {
        let mut s = Skeleton::from_parents([
            ("root", Transform::new(), None),
            ("orphan", Transform::new(), Some(7)),
        ]);
        assert_eq!(
            s.solve_fk(NodeId(1)),
            Err(SkeletonError::MissingParent {
                child: NodeId(1),
                parent: NodeId(7),
            })
        );
        // the well-formed part still solves
        assert!(s.solve_fk(NodeId(0)).is_ok());
    }

    #[test]
    fn attach_rejects_bad_links() {
        let (mut s, [a, b, c]) = chain_of_three();
        assert_eq!(s.attach(a, c), Err(SkeletonError::Cycle(a)));
        assert_eq!(s.attach(a, a), Err(SkeletonError::Cycle(a)));
        assert_eq!(
            s.attach(c, a),
            Err(SkeletonError::AlreadyParented { child: c, parent: b })
        );
        assert_eq!(
            s.attach(NodeId(9), a),
            Err(SkeletonError::UnknownNode(NodeId(9)))
        );
    }

    #[test]
    fn solve_order_must_be_a_permutation() {
        let (mut s, [a, b, _]) = chain_of_three();
        let err = SkeletonError::InvalidSolveOrder { expected: 3 };
        assert_eq!(s.set_solve_order(vec![a, b]), Err(err.clone()));
        assert_eq!(s.set_solve_order(vec![a, b, b]), Err(err.clone()));
        assert_eq!(s.set_solve_order(vec![a, b, NodeId(3)]), Err(err));
    }

    #[test]
    fn unsolved_nodes_have_no_world_pose() {
        let (s, [a, _, _]) = chain_of_three();
        assert!(s.world_transform(a).is_none());
        assert_eq!(s.world_transforms().count(), 0);
    }
}
