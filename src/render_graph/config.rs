use crate::render_graph::{Attachment, PassDesc, PassOutput, Program, RenderGraphBuilder};
use crate::target::{AttachmentSpec, ColorFormat, Extent, SizePolicy, TargetDesc};

/// Label of the geometry buffer target.
pub const GBUFFER: &str = "gbuffer";
pub const SHADOW_MAP: &str = "shadow_map";
/// Output of the lighting pass.
pub const LIT: &str = "lit";
/// Output of the forward pass when a post-process pass follows it.
pub const SCENE: &str = "scene";

/// Texture units the lighting pass binds its inputs to.
pub mod lighting_units {
    pub const POSITION: u32 = 0;
    pub const NORMAL: u32 = 1;
    pub const ALBEDO: u32 = 2;
    pub const SHADOW: u32 = 3;
}

/// Geometry buffer attachment indices.
pub mod gbuffer {
    pub const POSITION: usize = 0;
    pub const NORMAL: usize = 1;
    pub const ALBEDO: usize = 2;
}

/// The supported pass sequences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PipelineConfig {
    /// Forward → Present.
    Forward,
    /// Forward → PostProcess → Present.
    ForwardPostProcess,
    /// Geometry → Shadow → Lighting → PostProcess → Present.
    #[default]
    Deferred,
}

impl PipelineConfig {
    /// Declares the targets and passes of this configuration.
    pub fn graph(self, shadow_map_size: u32) -> RenderGraphBuilder {
        let mut builder = RenderGraphBuilder::new();
        match self {
            PipelineConfig::Forward => {
                builder.pass(PassDesc::new("forward", Program::Forward, PassOutput::Display));
            }
            PipelineConfig::ForwardPostProcess => {
                let scene = builder.target(
                    SCENE,
                    TargetDesc::color(SizePolicy::Surface, ColorFormat::Rgba16Float, true),
                );
                builder
                    .pass(PassDesc::new(
                        "forward",
                        Program::Forward,
                        PassOutput::Target(scene),
                    ))
                    .pass(
                        PassDesc::new("post_process", Program::PostProcess, PassOutput::Display)
                            .read(scene, Attachment::Color(0), 0),
                    );
            }
            PipelineConfig::Deferred => {
                let gbuffer_target = builder.target(
                    GBUFFER,
                    TargetDesc::multi(
                        SizePolicy::Surface,
                        vec![
                            AttachmentSpec::new("position", ColorFormat::Rgba16Float),
                            AttachmentSpec::new("normal", ColorFormat::Rgba16Float),
                            AttachmentSpec::new("albedo", ColorFormat::Rgba8Unorm),
                        ],
                        true,
                    ),
                );
                let shadow = builder.target(
                    SHADOW_MAP,
                    TargetDesc::depth_only(SizePolicy::Fixed(Extent::new(
                        shadow_map_size,
                        shadow_map_size,
                    ))),
                );
                let lit = builder.target(
                    LIT,
                    TargetDesc::color(SizePolicy::Surface, ColorFormat::Rgba16Float, false),
                );

                builder
                    .pass(PassDesc::new(
                        "geometry",
                        Program::Geometry,
                        PassOutput::Target(gbuffer_target),
                    ))
                    .pass(PassDesc::new(
                        "shadow",
                        Program::Shadow,
                        PassOutput::Target(shadow),
                    ))
                    .pass(
                        PassDesc::new("lighting", Program::Lighting, PassOutput::Target(lit))
                            .read(
                                gbuffer_target,
                                Attachment::Color(gbuffer::POSITION),
                                lighting_units::POSITION,
                            )
                            .read(
                                gbuffer_target,
                                Attachment::Color(gbuffer::NORMAL),
                                lighting_units::NORMAL,
                            )
                            .read(
                                gbuffer_target,
                                Attachment::Color(gbuffer::ALBEDO),
                                lighting_units::ALBEDO,
                            )
                            .read(shadow, Attachment::Depth, lighting_units::SHADOW),
                    )
                    .pass(
                        PassDesc::new("post_process", Program::PostProcess, PassOutput::Display)
                            .read(lit, Attachment::Color(0), 0),
                    );
            }
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn programs(config: PipelineConfig) -> Vec<Program> {
        config.graph(1024).passes().iter().map(|p| p.program).collect()
    }

    #[test]
    fn every_configuration_validates() {
        for config in [
            PipelineConfig::Forward,
            PipelineConfig::ForwardPostProcess,
            PipelineConfig::Deferred,
        ] {
            assert_eq!(config.graph(2048).validate(), Ok(()), "{config:?}");
        }
    }

    #[test]
    fn pass_sequences() {
        assert_eq!(programs(PipelineConfig::Forward), vec![Program::Forward]);
        assert_eq!(
            programs(PipelineConfig::ForwardPostProcess),
            vec![Program::Forward, Program::PostProcess]
        );
        assert_eq!(
            programs(PipelineConfig::Deferred),
            vec![
                Program::Geometry,
                Program::Shadow,
                Program::Lighting,
                Program::PostProcess
            ]
        );
    }
}
