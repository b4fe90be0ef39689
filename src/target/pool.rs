use crate::error::TargetError;
use crate::target::{Extent, TargetDesc, TargetLimits};

/// Handle to a target stored in a [`TargetPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) usize);

impl TargetId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Shape of an allocated target, independent of the backend.
pub trait TargetInfo {
    fn extent(&self) -> Extent;
    fn color_count(&self) -> usize;
    fn has_depth(&self) -> bool;
}

/// Allocates render targets for one backend.
///
/// Implemented by [`GpuContext`](crate::gpu::GpuContext) for wgpu textures
/// and by [`HeadlessFactory`](crate::headless::HeadlessFactory) for CPU
/// images.
pub trait TargetFactory {
    type Target: TargetInfo;

    /// Limits that target descriptions are checked against.
    fn limits(&self) -> TargetLimits;

    /// Allocates storage for an already validated description.
    fn create_target(
        &self,
        label: &str,
        desc: &TargetDesc,
        extent: Extent,
    ) -> Result<Self::Target, TargetError>;
}

struct Slot<T> {
    label: String,
    desc: TargetDesc,
    target: Option<T>,
    written_in: u64,
}

/// Owns every offscreen target of a render graph.
///
/// Targets are addressed by [`TargetId`]. During a frame the pool tracks
/// which targets have been written so that reading a stale one can be caught.
pub struct TargetPool<T> {
    slots: Vec<Slot<T>>,
    frame: u64,
}

impl<T> Default for TargetPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TargetPool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            frame: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: TargetId) -> Result<&T, TargetError> {
        self.slots
            .get(id.0)
            .and_then(|slot| slot.target.as_ref())
            .ok_or(TargetError::UnknownTarget(id))
    }

    pub fn desc(&self, id: TargetId) -> Option<&TargetDesc> {
        self.slots.get(id.0).map(|slot| &slot.desc)
    }

    pub fn label(&self, id: TargetId) -> Option<&str> {
        self.slots.get(id.0).map(|slot| slot.label.as_str())
    }

    pub fn find(&self, label: &str) -> Option<TargetId> {
        self.slots
            .iter()
            .position(|slot| slot.label == label)
            .map(TargetId)
    }

    pub fn ids(&self) -> impl Iterator<Item = TargetId> + '_ {
        (0..self.slots.len()).map(TargetId)
    }

    /// Starts a new frame; every target counts as unwritten again.
    pub fn begin_frame(&mut self) {
        self.frame += 1;
    }

    pub fn mark_written(&mut self, id: TargetId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.written_in = self.frame;
        }
    }

    pub fn is_written(&self, id: TargetId) -> bool {
        self.slots
            .get(id.0)
            .is_some_and(|slot| slot.written_in == self.frame)
    }

    /// Removes a target for the duration of the pass that writes it.
    ///
    /// While taken, the target cannot be looked up, so a pass can never
    /// sample the texture it renders into.
    pub fn take(&mut self, id: TargetId) -> Result<T, TargetError> {
        self.slots
            .get_mut(id.0)
            .and_then(|slot| slot.target.take())
            .ok_or(TargetError::UnknownTarget(id))
    }

    pub fn restore(&mut self, id: TargetId, target: T) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.target = Some(target);
        }
    }
}

impl<T: TargetInfo> TargetPool<T> {
    /// Validates `desc` against the factory's limits and allocates it.
    pub fn create<F>(
        &mut self,
        factory: &F,
        label: &str,
        desc: TargetDesc,
        surface: Extent,
    ) -> Result<TargetId, TargetError>
    where
        F: TargetFactory<Target = T>,
    {
        let extent = desc.resolve(surface);
        desc.validate(label, extent, &factory.limits())?;
        let target = factory.create_target(label, &desc, extent)?;

        let id = TargetId(self.slots.len());
        self.slots.push(Slot {
            label: label.to_string(),
            desc,
            target: Some(target),
            written_in: 0,
        });
        Ok(id)
    }

    /// Recreates every surface-sized target whose extent differs from
    /// `surface`. Fixed-size targets are left alone.
    ///
    /// A zero-sized surface (minimized window) is ignored. Returns how many
    /// targets were recreated.
    pub fn resize<F>(&mut self, factory: &F, surface: Extent) -> Result<usize, TargetError>
    where
        F: TargetFactory<Target = T>,
    {
        if surface.is_empty() {
            return Ok(0);
        }

        let limits = factory.limits();
        let mut recreated = 0;
        for slot in &mut self.slots {
            if !slot.desc.follows_surface() {
                continue;
            }
            if slot.target.as_ref().map(|t| t.extent()) == Some(surface) {
                continue;
            }
            slot.desc.validate(&slot.label, surface, &limits)?;
            slot.target = Some(factory.create_target(&slot.label, &slot.desc, surface)?);
            slot.written_in = 0;
            recreated += 1;
        }

        if recreated > 0 {
            log::debug!(
                "resized {recreated} targets to {}x{}",
                surface.width,
                surface.height
            );
        }
        Ok(recreated)
    }
}
