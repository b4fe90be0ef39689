//! The render graph and its builder.

use std::collections::{HashMap, HashSet};

use crate::error::{GraphError, TargetError};
use crate::render_graph::{Attachment, PassDesc, PassOutput, Program};
use crate::target::{Extent, TargetDesc, TargetFactory, TargetId, TargetInfo, TargetPool};

/// Collects target declarations and passes, then validates them into a
/// [`RenderGraph`].
///
/// Passes run in the order they are added; there is no reordering. Each
/// pass may only read targets written by a pass before it, and only the last
/// pass writes the display.
///
/// ```
/// use rigpass::render_graph::{Attachment, PassDesc, PassOutput, Program, RenderGraphBuilder};
/// use rigpass::target::{ColorFormat, SizePolicy, TargetDesc};
///
/// let mut builder = RenderGraphBuilder::new();
/// let scene = builder.target(
///     "scene",
///     TargetDesc::color(SizePolicy::Surface, ColorFormat::Rgba16Float, true),
/// );
/// builder
///     .pass(PassDesc::new("forward", Program::Forward, PassOutput::Target(scene)))
///     .pass(
///         PassDesc::new("post", Program::PostProcess, PassOutput::Display)
///             .read(scene, Attachment::Color(0), 0),
///     );
/// assert!(builder.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RenderGraphBuilder {
    targets: Vec<(String, TargetDesc)>,
    passes: Vec<PassDesc>,
}

impl RenderGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a target. It is allocated by [`build`](Self::build).
    pub fn target(&mut self, label: impl Into<String>, desc: TargetDesc) -> TargetId {
        let id = TargetId(self.targets.len());
        self.targets.push((label.into(), desc));
        id
    }

    /// Appends a pass after every pass added so far.
    pub fn pass(&mut self, pass: PassDesc) -> &mut Self {
        self.passes.push(pass);
        self
    }

    pub fn passes(&self) -> &[PassDesc] {
        &self.passes
    }

    fn target_label(&self, id: TargetId) -> String {
        self.targets
            .get(id.0)
            .map(|(label, _)| label.clone())
            .unwrap_or_else(|| format!("{id:?}"))
    }

    fn target_desc(&self, pass: &PassDesc, id: TargetId) -> Result<&TargetDesc, GraphError> {
        self.targets
            .get(id.0)
            .map(|(_, desc)| desc)
            .ok_or_else(|| GraphError::UnknownTarget {
                pass: pass.name.clone(),
                target: id,
            })
    }

    /// Checks pass ordering and bindings without allocating anything.
    pub fn validate(&self) -> Result<(), GraphError> {
        let Some(last) = self.passes.len().checked_sub(1) else {
            return Err(GraphError::Empty);
        };

        let mut writers: HashMap<TargetId, &str> = HashMap::new();

        for (index, pass) in self.passes.iter().enumerate() {
            let mut units = HashSet::new();
            for read in &pass.reads {
                let desc = self.target_desc(pass, read.target)?;
                if pass.output == PassOutput::Target(read.target) {
                    return Err(GraphError::ReadsOwnOutput {
                        pass: pass.name.clone(),
                        target: self.target_label(read.target),
                    });
                }
                if !writers.contains_key(&read.target) {
                    return Err(GraphError::ReadBeforeWrite {
                        pass: pass.name.clone(),
                        target: self.target_label(read.target),
                    });
                }
                let exists = match read.attachment {
                    Attachment::Color(i) => i < desc.colors.len(),
                    Attachment::Depth => desc.depth,
                };
                if !exists {
                    return Err(GraphError::MissingAttachment {
                        pass: pass.name.clone(),
                        target: self.target_label(read.target),
                        attachment: read.attachment.to_string(),
                    });
                }
                if !units.insert(read.unit) {
                    return Err(GraphError::DuplicateUnit {
                        pass: pass.name.clone(),
                        unit: read.unit,
                    });
                }
            }

            match pass.output {
                PassOutput::Display if index != last => {
                    return Err(GraphError::DisplayNotLast {
                        pass: pass.name.clone(),
                    });
                }
                PassOutput::Display => self.check_display_program(pass)?,
                PassOutput::Target(id) => {
                    let desc = self.target_desc(pass, id)?;
                    self.check_target_program(pass, id, desc)?;
                    if let Some(first) = writers.insert(id, &pass.name) {
                        return Err(GraphError::MultipleWriters {
                            target: self.target_label(id),
                            first: first.to_string(),
                            second: pass.name.clone(),
                        });
                    }
                }
            }
        }

        let final_pass = &self.passes[last];
        if !final_pass.writes_display() {
            return Err(GraphError::NoDisplayOutput {
                pass: final_pass.name.clone(),
            });
        }
        Ok(())
    }

    fn check_display_program(&self, pass: &PassDesc) -> Result<(), GraphError> {
        match pass.program {
            Program::Geometry | Program::Shadow => Err(GraphError::InvalidOutput {
                pass: pass.name.clone(),
                output: "the display".into(),
            }),
            _ => Ok(()),
        }
    }

    fn check_target_program(
        &self,
        pass: &PassDesc,
        id: TargetId,
        desc: &TargetDesc,
    ) -> Result<(), GraphError> {
        let ok = match pass.program {
            Program::Shadow => desc.depth,
            Program::Forward | Program::Geometry => !desc.colors.is_empty() && desc.depth,
            Program::Lighting | Program::PostProcess => !desc.colors.is_empty(),
        };
        if ok {
            return Ok(());
        }
        Err(GraphError::InvalidOutput {
            pass: pass.name.clone(),
            output: format!("target '{}'", self.target_label(id)),
        })
    }

    /// Validates the graph and allocates its targets at `surface` size.
    pub fn build<F: TargetFactory>(
        self,
        factory: &F,
        surface: Extent,
    ) -> Result<RenderGraph<F::Target>, GraphError> {
        self.validate()?;

        let mut targets = TargetPool::new();
        for (label, desc) in self.targets {
            targets.create(factory, &label, desc, surface)?;
        }
        log::info!(
            "render graph built: {} passes, {} targets",
            self.passes.len(),
            targets.len()
        );
        Ok(RenderGraph {
            passes: self.passes,
            targets,
        })
    }
}

/// A texture bound for reading during a pass.
pub struct BoundInput<'a, T> {
    pub unit: u32,
    pub attachment: Attachment,
    pub id: TargetId,
    pub target: &'a T,
}

/// What a pass sees while it runs: the textures it reads and the target it
/// writes. `output` is `None` when the pass writes the display.
pub struct PassIo<'a, T> {
    pass: &'a str,
    inputs: Vec<BoundInput<'a, T>>,
    output: Option<&'a mut T>,
}

impl<'a, T> PassIo<'a, T> {
    pub fn inputs(&self) -> &[BoundInput<'a, T>] {
        &self.inputs
    }

    /// The input bound at `unit`.
    pub fn input(&self, unit: u32) -> Result<&BoundInput<'a, T>, GraphError> {
        self.inputs
            .iter()
            .find(|input| input.unit == unit)
            .ok_or_else(|| GraphError::UnboundInput {
                pass: self.pass.to_string(),
                unit,
            })
    }

    pub fn is_display(&self) -> bool {
        self.output.is_none()
    }

    pub fn output(&mut self) -> Option<&mut T> {
        self.output.as_deref_mut()
    }
}

/// Validated passes plus the targets they read and write.
pub struct RenderGraph<T> {
    passes: Vec<PassDesc>,
    targets: TargetPool<T>,
}

impl<T: TargetInfo> RenderGraph<T> {
    pub fn passes(&self) -> &[PassDesc] {
        &self.passes
    }

    pub fn targets(&self) -> &TargetPool<T> {
        &self.targets
    }

    pub fn target(&self, id: TargetId) -> Result<&T, TargetError> {
        self.targets.get(id)
    }

    /// Recreates surface-sized targets for a new surface size.
    pub fn resize<F>(&mut self, factory: &F, surface: Extent) -> Result<usize, TargetError>
    where
        F: TargetFactory<Target = T>,
    {
        self.targets.resize(factory, surface)
    }

    /// Marks every target unwritten; call before the first pass of a frame.
    pub fn begin_frame(&mut self) {
        self.targets.begin_frame();
    }

    /// Runs pass `index` through `run`.
    ///
    /// The pass's output target is removed from the pool while `run` executes
    /// and put back afterwards, even on error. Reading a target that has not
    /// been written since [`begin_frame`](Self::begin_frame) fails with
    /// [`GraphError::StaleRead`].
    pub fn run_pass<F>(&mut self, index: usize, run: F) -> Result<(), GraphError>
    where
        F: FnOnce(&PassDesc, PassIo<'_, T>) -> Result<(), GraphError>,
    {
        let Self { passes, targets } = self;
        let Some(pass) = passes.get(index) else {
            return Ok(());
        };

        for read in &pass.reads {
            if !targets.is_written(read.target) {
                return Err(GraphError::StaleRead {
                    pass: pass.name.clone(),
                    target: targets.label(read.target).unwrap_or_default().to_string(),
                });
            }
        }

        let output_id = match pass.output {
            PassOutput::Target(id) => Some(id),
            PassOutput::Display => None,
        };
        let mut output = output_id.map(|id| targets.take(id)).transpose()?;

        let result = (|| -> Result<(), GraphError> {
            let inputs = pass
                .reads
                .iter()
                .map(|read| {
                    Ok(BoundInput {
                        unit: read.unit,
                        attachment: read.attachment,
                        id: read.target,
                        target: targets.get(read.target)?,
                    })
                })
                .collect::<Result<Vec<_>, TargetError>>()?;
            let io = PassIo {
                pass: &pass.name,
                inputs,
                output: output.as_mut(),
            };
            run(pass, io)
        })();

        if let (Some(id), Some(target)) = (output_id, output) {
            targets.restore(id, target);
            if result.is_ok() {
                targets.mark_written(id);
            }
        }
        result
    }

    /// Runs every pass in declared order.
    pub fn execute<F>(&mut self, mut run: F) -> Result<(), GraphError>
    where
        F: FnMut(usize, &PassDesc, PassIo<'_, T>) -> Result<(), GraphError>,
    {
        self.begin_frame();
        for index in 0..self.passes.len() {
            self.run_pass(index, |pass, io| run(index, pass, io))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessFactory;
    use crate::render_graph::PassDesc;
    use crate::target::{AttachmentSpec, ColorFormat, SizePolicy};

    fn color_target() -> TargetDesc {
        TargetDesc::color(SizePolicy::Surface, ColorFormat::Rgba16Float, false)
    }

    fn scene_target() -> TargetDesc {
        TargetDesc::color(SizePolicy::Surface, ColorFormat::Rgba16Float, true)
    }

    #[test]
    fn empty_graph_is_rejected() {
        assert_eq!(RenderGraphBuilder::new().validate(), Err(GraphError::Empty));
    }

    #[test]
    fn last_pass_must_write_display() {
        let mut b = RenderGraphBuilder::new();
        let scene = b.target("scene", scene_target());
        b.pass(PassDesc::new("forward", Program::Forward, PassOutput::Target(scene)));
        assert_eq!(
            b.validate(),
            Err(GraphError::NoDisplayOutput {
                pass: "forward".into()
            })
        );
    }

    #[test]
    fn display_write_must_be_last() {
        let mut b = RenderGraphBuilder::new();
        b.pass(PassDesc::new("first", Program::Forward, PassOutput::Display))
            .pass(PassDesc::new("second", Program::PostProcess, PassOutput::Display));
        assert_eq!(
            b.validate(),
            Err(GraphError::DisplayNotLast {
                pass: "first".into()
            })
        );
    }

    #[test]
    fn reading_a_later_target_is_rejected() {
        let mut b = RenderGraphBuilder::new();
        let scene = b.target("scene", scene_target());
        let lit = b.target("lit", color_target());
        b.pass(
            PassDesc::new("lighting", Program::Lighting, PassOutput::Target(lit))
                .read(scene, Attachment::Color(0), 0),
        )
        .pass(PassDesc::new("forward", Program::Forward, PassOutput::Target(scene)))
        .pass(
            PassDesc::new("post", Program::PostProcess, PassOutput::Display)
                .read(lit, Attachment::Color(0), 0),
        );
        assert_eq!(
            b.validate(),
            Err(GraphError::ReadBeforeWrite {
                pass: "lighting".into(),
                target: "scene".into()
            })
        );
    }

    #[test]
    fn pass_cannot_read_its_own_output() {
        let mut b = RenderGraphBuilder::new();
        let scene = b.target("scene", scene_target());
        let lit = b.target("lit", color_target());
        b.pass(PassDesc::new("forward", Program::Forward, PassOutput::Target(scene)))
            .pass(
                PassDesc::new("lighting", Program::Lighting, PassOutput::Target(lit))
                    .read(lit, Attachment::Color(0), 0),
            );
        assert_eq!(
            b.validate(),
            Err(GraphError::ReadsOwnOutput {
                pass: "lighting".into(),
                target: "lit".into()
            })
        );
    }

    #[test]
    fn one_writer_per_target() {
        let mut b = RenderGraphBuilder::new();
        let scene = b.target("scene", scene_target());
        b.pass(PassDesc::new("a", Program::Forward, PassOutput::Target(scene)))
            .pass(PassDesc::new("b", Program::Forward, PassOutput::Target(scene)))
            .pass(
                PassDesc::new("post", Program::PostProcess, PassOutput::Display)
                    .read(scene, Attachment::Color(0), 0),
            );
        assert_eq!(
            b.validate(),
            Err(GraphError::MultipleWriters {
                target: "scene".into(),
                first: "a".into(),
                second: "b".into()
            })
        );
    }

    #[test]
    fn units_and_attachments_are_checked() {
        let mut b = RenderGraphBuilder::new();
        let gbuffer = b.target(
            "gbuffer",
            TargetDesc::multi(
                SizePolicy::Surface,
                vec![
                    AttachmentSpec::new("position", ColorFormat::Rgba16Float),
                    AttachmentSpec::new("normal", ColorFormat::Rgba16Float),
                ],
                true,
            ),
        );
        b.pass(PassDesc::new("geometry", Program::Geometry, PassOutput::Target(gbuffer)))
            .pass(
                PassDesc::new("lighting", Program::Lighting, PassOutput::Display)
                    .read(gbuffer, Attachment::Color(0), 0)
                    .read(gbuffer, Attachment::Color(1), 0),
            );
        assert_eq!(
            b.validate(),
            Err(GraphError::DuplicateUnit {
                pass: "lighting".into(),
                unit: 0
            })
        );

        let mut b = RenderGraphBuilder::new();
        let gbuffer = b.target(
            "gbuffer",
            TargetDesc::multi(
                SizePolicy::Surface,
                vec![AttachmentSpec::new("position", ColorFormat::Rgba16Float)],
                true,
            ),
        );
        b.pass(PassDesc::new("geometry", Program::Geometry, PassOutput::Target(gbuffer)))
            .pass(
                PassDesc::new("lighting", Program::Lighting, PassOutput::Display)
                    .read(gbuffer, Attachment::Color(2), 0),
            );
        assert!(matches!(
            b.validate(),
            Err(GraphError::MissingAttachment { .. })
        ));
    }

    #[test]
    fn shadow_pass_needs_a_depth_target() {
        let mut b = RenderGraphBuilder::new();
        let lit = b.target("lit", color_target());
        b.pass(PassDesc::new("shadow", Program::Shadow, PassOutput::Target(lit)))
            .pass(
                PassDesc::new("post", Program::PostProcess, PassOutput::Display)
                    .read(lit, Attachment::Color(0), 0),
            );
        assert!(matches!(
            b.validate(),
            Err(GraphError::InvalidOutput { .. })
        ));
    }

    #[test]
    fn undeclared_target_is_rejected() {
        let mut b = RenderGraphBuilder::new();
        b.pass(
            PassDesc::new("post", Program::PostProcess, PassOutput::Display)
                .read(TargetId(7), Attachment::Color(0), 0),
        );
        assert_eq!(
            b.validate(),
            Err(GraphError::UnknownTarget {
                pass: "post".into(),
                target: TargetId(7)
            })
        );
    }

    fn forward_post() -> RenderGraph<crate::headless::ImageTarget> {
        let mut b = RenderGraphBuilder::new();
        let scene = b.target("scene", scene_target());
        b.pass(PassDesc::new("forward", Program::Forward, PassOutput::Target(scene)))
            .pass(
                PassDesc::new("post", Program::PostProcess, PassOutput::Display)
                    .read(scene, Attachment::Color(0), 0),
            );
        b.build(&HeadlessFactory::default(), Extent::new(4, 4)).unwrap()
    }

    #[test]
    fn execute_runs_passes_in_order() {
        let mut graph = forward_post();
        let mut seen = Vec::new();
        graph
            .execute(|index, pass, mut io| {
                seen.push((index, pass.name.clone(), io.is_display()));
                if index == 1 {
                    assert_eq!(io.input(0)?.target.extent(), Extent::new(4, 4));
                    assert!(io.output().is_none());
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(
            seen,
            vec![(0, "forward".to_string(), false), (1, "post".to_string(), true)]
        );
    }

    #[test]
    fn unbound_unit_is_an_error() {
        let mut graph = forward_post();
        let result = graph.execute(|index, _, io| {
            if index == 1 {
                io.input(3)?;
            }
            Ok(())
        });
        assert_eq!(
            result,
            Err(GraphError::UnboundInput {
                pass: "post".into(),
                unit: 3
            })
        );
    }

    #[test]
    fn reading_an_unwritten_target_is_stale() {
        let mut graph = forward_post();
        graph.begin_frame();
        let result = graph.run_pass(1, |_, _| Ok(()));
        assert_eq!(
            result,
            Err(GraphError::StaleRead {
                pass: "post".into(),
                target: "scene".into()
            })
        );

        graph.run_pass(0, |_, _| Ok(())).unwrap();
        assert!(graph.run_pass(1, |_, _| Ok(())).is_ok());
    }

    #[test]
    fn failed_pass_leaves_target_unwritten() {
        let mut graph = forward_post();
        graph.begin_frame();
        let err = graph.run_pass(0, |pass, _| {
            Err(GraphError::InvalidOutput {
                pass: pass.name.clone(),
                output: "test".into(),
            })
        });
        assert!(err.is_err());
        // The target was put back but not marked written.
        let scene = graph.targets().find("scene").unwrap();
        assert!(graph.target(scene).is_ok());
        assert!(matches!(
            graph.run_pass(1, |_, _| Ok(())),
            Err(GraphError::StaleRead { .. })
        ));
    }
}
