use glam::{Quat, Vec3};

use super::{NodeId, Skeleton};
use crate::error::SkeletonError;
use crate::transform::Transform;

/// The eight-joint puppet: a torso with a head and two three-joint arms.
///
/// Shoulders carry a yaw in their rest pose; [`animate`](Self::animate)
/// layers a swing on top of it.
#[derive(Clone, Debug)]
pub struct Puppet {
    pub skeleton: Skeleton,
    pub torso: NodeId,
    pub head: NodeId,
    pub right_shoulder: NodeId,
    pub right_elbow: NodeId,
    pub right_wrist: NodeId,
    pub left_shoulder: NodeId,
    pub left_elbow: NodeId,
    pub left_wrist: NodeId,
    shoulder_rest: [Quat; 2],
}

impl Default for Puppet {
    fn default() -> Self {
        Self::new()
    }
}

impl Puppet {
    pub fn new() -> Self {
        let right_yaw = Quat::from_xyzw(0.0, -0.7, 0.0, 1.0).normalize();
        let left_yaw = Quat::from_xyzw(0.0, 0.7, 0.0, 1.0).normalize();

        let joint = |x: f32, y: f32, scale: f32| {
            Transform::new()
                .position(Vec3::new(x, y, 0.0))
                .uniform_scale(scale)
        };

        // Indices into this list are the node ids below.
        let records = [
            ("torso", Transform::new(), None),
            ("head", joint(0.0, 1.4, 0.5), Some(0)),
            ("right_shoulder", joint(-1.2, 0.0, 0.35).rotation(right_yaw), Some(0)),
            ("right_elbow", joint(-1.2, -0.5, 0.2), Some(2)),
            ("right_wrist", joint(-1.2, -1.0, 0.2), Some(3)),
            ("left_shoulder", joint(1.2, 0.0, 0.35).rotation(left_yaw), Some(0)),
            ("left_elbow", joint(1.2, -0.5, 0.2), Some(5)),
            ("left_wrist", joint(1.2, -1.0, 0.2), Some(6)),
        ];
        let skeleton = Skeleton::from_parents(records);
        let [
            torso,
            head,
            right_shoulder,
            right_elbow,
            right_wrist,
            left_shoulder,
            left_elbow,
            left_wrist,
        ] = std::array::from_fn(NodeId);

        Self {
            skeleton,
            torso,
            head,
            right_shoulder,
            right_elbow,
            right_wrist,
            left_shoulder,
            left_elbow,
            left_wrist,
            shoulder_rest: [right_yaw, left_yaw],
        }
    }

    /// Poses the rig for `time` seconds: the torso turns about Y and the
    /// arms swing out of phase. Call [`Skeleton::solve_all`] afterwards.
    pub fn animate(&mut self, time: f32) -> Result<(), SkeletonError> {
        let swing = (time * 2.0).sin() * 0.6;
        self.skeleton
            .set_local_rotation(self.torso, Quat::from_rotation_y(time))?;
        self.skeleton.set_local_rotation(
            self.right_shoulder,
            self.shoulder_rest[0] * Quat::from_rotation_z(swing),
        )?;
        self.skeleton.set_local_rotation(
            self.left_shoulder,
            self.shoulder_rest[1] * Quat::from_rotation_z(-swing),
        )?;
        self.skeleton
            .set_local_rotation(self.head, Quat::from_rotation_x(swing * 0.25))?;
        Ok(())
    }
}
