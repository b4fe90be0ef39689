use glam::Mat4;

use crate::transform::Transform;

/// Index of a node inside its [`Skeleton`](super::Skeleton) arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A skeleton joint.
///
/// Parent and children are arena indices rather than references, so a
/// skeleton can be cloned or rebuilt without dangling links. Only the
/// skeleton mutates topology; FK solving writes the cached world matrix.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) local: Transform,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) world: Mat4,
    /// Generation in which `world` was last computed; 0 means never.
    pub(crate) solved_in: u64,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>, local: Transform) -> Self {
        Self {
            name: name.into(),
            local,
            parent: None,
            children: Vec::new(),
            world: Mat4::IDENTITY,
            solved_in: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local(&self) -> &Transform {
        &self.local
    }

    /// Local matrix built scale → rotate → translate.
    pub fn local_transform(&self) -> Mat4 {
        self.local.matrix()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
