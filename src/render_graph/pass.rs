use crate::target::TargetId;

/// Which shader program a pass runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Program {
    /// Scene draws shaded directly with the material and light.
    Forward,
    /// Scene draws into the geometry buffer: position, normal, albedo.
    Geometry,
    /// Scene draws from the light camera into a depth-only target.
    Shadow,
    /// Full-screen shading from the geometry buffer and the shadow map.
    Lighting,
    /// Full-screen effect over a color target.
    PostProcess,
}

impl Program {
    /// Culling each program uses unless a pass overrides it.
    pub fn default_cull(self) -> CullMode {
        match self {
            Program::Forward | Program::Geometry => CullMode::Back,
            Program::Shadow => CullMode::Front,
            Program::Lighting | Program::PostProcess => CullMode::None,
        }
    }

    /// Full-screen programs draw one triangle and ignore the scene's draws.
    pub fn is_fullscreen(self) -> bool {
        matches!(self, Program::Lighting | Program::PostProcess)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
    #[default]
    None,
    Back,
    Front,
}

impl CullMode {
    pub fn to_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Back => Some(wgpu::Face::Back),
            CullMode::Front => Some(wgpu::Face::Front),
        }
    }
}

/// One attachment of a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attachment {
    Color(usize),
    Depth,
}

impl std::fmt::Display for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attachment::Color(index) => write!(f, "color attachment {index}"),
            Attachment::Depth => f.write_str("the depth attachment"),
        }
    }
}

/// A texture a pass samples, bound at a numbered texture unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureRead {
    pub target: TargetId,
    pub attachment: Attachment,
    pub unit: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutput {
    Target(TargetId),
    /// The swapchain surface, or the headless display image.
    Display,
}

/// Declaration of one pass: what it runs, what it reads, where it writes.
#[derive(Clone, Debug, PartialEq)]
pub struct PassDesc {
    pub name: String,
    pub program: Program,
    pub output: PassOutput,
    pub reads: Vec<TextureRead>,
    pub cull: CullMode,
}

impl PassDesc {
    pub fn new(name: impl Into<String>, program: Program, output: PassOutput) -> Self {
        Self {
            name: name.into(),
            program,
            output,
            reads: Vec::new(),
            cull: program.default_cull(),
        }
    }

    /// Samples `attachment` of `target` at texture `unit`.
    pub fn read(mut self, target: TargetId, attachment: Attachment, unit: u32) -> Self {
        self.reads.push(TextureRead {
            target,
            attachment,
            unit,
        });
        self
    }

    pub fn cull(mut self, cull: CullMode) -> Self {
        self.cull = cull;
        self
    }

    pub fn writes_display(&self) -> bool {
        self.output == PassOutput::Display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programs_pick_their_culling() {
        let target = TargetId(0);
        let shadow = PassDesc::new("shadow", Program::Shadow, PassOutput::Target(target));
        let geometry = PassDesc::new("geometry", Program::Geometry, PassOutput::Target(target));
        let lighting = PassDesc::new("lighting", Program::Lighting, PassOutput::Display);
        assert_eq!(shadow.cull, CullMode::Front);
        assert_eq!(geometry.cull, CullMode::Back);
        assert_eq!(lighting.cull, CullMode::None);
        assert_eq!(lighting.cull(CullMode::Back).cull, CullMode::Back);
    }
}
