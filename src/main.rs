//! Animated puppet rendered through the deferred pipeline.
//!
//! Keys: `1` no effect, `2` invert, `3` box blur, `Up`/`Down` blur radius.
//!
//! An image path given as the first argument replaces the checkered floor.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use rigpass::scene::{Draw, GpuDraw, skeleton_draws};
use rigpass::{
    AppConfig, Camera, FrameParams, LoggingConfig, Mat4, Mesh, NodeId, PostEffect, Puppet,
    Renderer, RendererConfig, Texture, Vec3, Vec4, init_logging,
};

const FLOOR_HEIGHT: f32 = -2.0;

/// Window, renderer and scene once the event loop has resumed.
struct Demo {
    window: Arc<Window>,
    renderer: Renderer,
    puppet: Puppet,
    cube: Mesh,
    floor: Mesh,
    floor_texture: Texture,
    params: FrameParams,
    start_time: Instant,
}

impl Demo {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        renderer_config: RendererConfig,
        floor_image: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("failed to create window")?,
        );

        let renderer =
            Renderer::new(window.clone(), renderer_config).context("failed to start renderer")?;
        let gpu = renderer.gpu();
        let cube = Mesh::cube(gpu);
        let floor = Mesh::plane(gpu, 8.0, 8);
        let floor_texture = match floor_image {
            Some(path) => Texture::from_file(gpu, path)
                .with_context(|| format!("failed to load floor texture {}", path.display()))?,
            None => Texture::checker(gpu, 256, 8, [90, 90, 100], [200, 200, 210]),
        };

        let params = FrameParams {
            camera: Camera::new()
                .at(Vec3::new(0.0, 1.5, 6.0))
                .looking_at(Vec3::new(0.0, -0.5, 0.0))
                .with_aspect(gpu.aspect()),
            ..Default::default()
        };

        Ok(Self {
            window,
            renderer,
            puppet: Puppet::new(),
            cube,
            floor,
            floor_texture,
            params,
            start_time: Instant::now(),
        })
    }

    fn handle_key(&mut self, key: KeyCode) {
        let post = &mut self.params.post;
        match key {
            KeyCode::Digit1 => post.effect = PostEffect::None,
            KeyCode::Digit2 => post.effect = PostEffect::Invert,
            KeyCode::Digit3 => post.effect = PostEffect::BoxBlur,
            KeyCode::ArrowUp => post.radius = post.radius.saturating_add(1),
            KeyCode::ArrowDown => post.radius = post.radius.saturating_sub(1),
            _ => return,
        }
        *post = post.clamped();
        log::info!("post effect: {} (radius {})", post.effect.name(), post.radius);
    }

    fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.renderer.resize(width, height)?;
        self.params.camera.aspect = self.renderer.gpu().aspect();
        Ok(())
    }

    fn redraw(&mut self) -> anyhow::Result<()> {
        let time = self.start_time.elapsed().as_secs_f32();
        self.params.time = time;

        self.puppet.animate(time)?;
        self.puppet.skeleton.solve_all()?;

        let puppet = &self.puppet;
        let mut draws: Vec<GpuDraw> =
            skeleton_draws(&puppet.skeleton, &self.cube, |id| joint_tint(puppet, id));
        draws.push(
            Draw::new(&self.floor, Mat4::from_translation(Vec3::Y * FLOOR_HEIGHT))
                .texture(&self.floor_texture),
        );

        self.renderer.render(&self.params, &draws)?;
        Ok(())
    }
}

fn joint_tint(puppet: &Puppet, id: NodeId) -> Vec4 {
    if id == puppet.head {
        Vec4::new(0.9, 0.65, 0.5, 1.0)
    } else if id == puppet.torso {
        Vec4::new(0.7, 0.7, 0.75, 1.0)
    } else {
        Vec4::new(0.4, 0.55, 0.9, 1.0)
    }
}

enum DemoApp {
    Pending {
        config: AppConfig,
        renderer: RendererConfig,
        floor_image: Option<PathBuf>,
    },
    Running(Box<Demo>),
    Failed(Option<anyhow::Error>),
}

impl DemoApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        event_loop.exit();
        *self = DemoApp::Failed(Some(err));
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let DemoApp::Pending {
            config,
            renderer,
            floor_image,
        } = self
        {
            match Demo::start(event_loop, config, *renderer, floor_image.as_deref()) {
                Ok(demo) => *self = DemoApp::Running(Box::new(demo)),
                Err(err) => self.fail(event_loop, err),
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let DemoApp::Running(demo) = self else {
            return;
        };

        let result = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => demo.resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => {
                if let (ElementState::Pressed, PhysicalKey::Code(key)) =
                    (event.state, event.physical_key)
                {
                    demo.handle_key(key);
                }
                Ok(())
            }
            WindowEvent::RedrawRequested => {
                let result = demo.redraw();
                demo.window.request_redraw();
                result
            }
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::Pending {
        config: AppConfig::new().title("rigpass puppet"),
        renderer: RendererConfig::default(),
        floor_image: std::env::args_os().nth(1).map(PathBuf::from),
    };
    event_loop.run_app(&mut app)?;

    match app {
        DemoApp::Failed(Some(err)) => Err(err),
        _ => Ok(()),
    }
}
