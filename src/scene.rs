//! Draw lists.
//!
//! A [`Draw`] pairs a mesh with the world matrix it is drawn at. Both
//! backends take a slice of draws per frame: the wgpu renderer with
//! [`Mesh`]/[`Texture`], the headless renderer with [`MeshData`]/[`Image`].

use glam::{Mat4, Vec4};

use crate::headless::Image;
use crate::mesh::{Mesh, MeshData};
use crate::skeleton::{NodeId, Skeleton};
use crate::texture::Texture;

/// One mesh instance for a frame.
pub struct Draw<'a, M, T> {
    pub mesh: &'a M,
    pub model: Mat4,
    /// Multiplied into the albedo.
    pub tint: Vec4,
    pub texture: Option<&'a T>,
}

impl<M, T> Clone for Draw<'_, M, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, T> Copy for Draw<'_, M, T> {}

impl<'a, M, T> Draw<'a, M, T> {
    pub fn new(mesh: &'a M, model: Mat4) -> Self {
        Self {
            mesh,
            model,
            tint: Vec4::ONE,
            texture: None,
        }
    }

    pub fn tint(mut self, tint: Vec4) -> Self {
        self.tint = tint;
        self
    }

    pub fn texture(mut self, texture: &'a T) -> Self {
        self.texture = Some(texture);
        self
    }
}

pub type GpuDraw<'a> = Draw<'a, Mesh, Texture>;
pub type HeadlessDraw<'a> = Draw<'a, MeshData, Image>;

/// One draw per solved joint, at the joint's world pose.
///
/// Joints that have not been solved since the last pose change are skipped.
pub fn skeleton_draws<'a, M, T>(
    skeleton: &Skeleton,
    mesh: &'a M,
    tint: impl Fn(NodeId) -> Vec4,
) -> Vec<Draw<'a, M, T>> {
    skeleton
        .world_transforms()
        .map(|(id, world)| Draw::new(mesh, world).tint(tint(id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Puppet;

    #[test]
    fn one_draw_per_solved_joint() {
        let mut puppet = Puppet::new();
        let cube = MeshData::cube();

        let unsolved: Vec<HeadlessDraw> = skeleton_draws(&puppet.skeleton, &cube, |_| Vec4::ONE);
        assert!(unsolved.is_empty());

        puppet.skeleton.solve_all().unwrap();
        let head = puppet.head;
        let draws: Vec<HeadlessDraw> = skeleton_draws(&puppet.skeleton, &cube, |id| {
            if id == head { Vec4::X } else { Vec4::ONE }
        });
        assert_eq!(draws.len(), 8);
        let head_draw = draws.iter().find(|d| d.tint == Vec4::X).unwrap();
        assert_eq!(
            head_draw.model,
            puppet.skeleton.world_transform(head).unwrap()
        );
    }
}
