use super::{CampusApp, RenderSettings};
use crate::config::{AppConfig, WindowConfig};
use crate::input::InputEvent;
use crate::resilience::{classify_surface_error, RecoveryActions, SurfaceFault};
use crate::view::WindowCapture;
use anyhow::{Context, Result};
use glam::Vec3;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

/// Longest frame step handed to the simulation; protects integration after stalls.
const MAX_FRAME_DT: f32 = 0.1;

/// Opens a window and drives the viewer from winit events until it closes.
pub fn run_windowed(config: AppConfig) -> Result<()> {
    let app = CampusApp::new(config)?;
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    let mut shell = ViewerShell::new(app);
    event_loop.run_app(&mut shell).context("Event loop execution failed")?;
    Ok(())
}

struct FrameClock {
    last: Instant,
}

impl FrameClock {
    fn new() -> Self {
        Self { last: Instant::now() }
    }

    fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt.min(MAX_FRAME_DT)
    }
}

/// Window plus a surface that is cleared to the current fog colour every frame.
struct ClearSurface {
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    config: Option<wgpu::SurfaceConfiguration>,
    size: PhysicalSize<u32>,
    title: String,
    vsync: bool,
    fullscreen: bool,
}

impl ClearSurface {
    fn new(window_cfg: &WindowConfig) -> Self {
        Self {
            window: None,
            surface: None,
            device: None,
            queue: None,
            config: None,
            size: PhysicalSize::new(window_cfg.width, window_cfg.height),
            title: window_cfg.title.clone(),
            vsync: window_cfg.vsync,
            fullscreen: window_cfg.fullscreen,
        }
    }

    fn window(&self) -> Option<Arc<Window>> {
        self.window.clone()
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop, settings: &RenderSettings) -> Result<()> {
        if self.window.is_some() {
            return Ok(());
        }
        let mut attrs = Window::default_attributes().with_title(self.title.clone()).with_inner_size(self.size);
        if self.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(event_loop.create_window(attrs).context("Failed to create window")?);
        pollster::block_on(self.init_wgpu(&window, settings.power_preference))?;
        self.window = Some(window);
        Ok(())
    }

    async fn init_wgpu(&mut self, window: &Arc<Window>, power_preference: wgpu::PowerPreference) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone()).context("Failed to create WGPU surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to request WGPU adapter")?;
        let device_desc = wgpu::DeviceDescriptor {
            label: Some("Campus Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        };
        let (device, queue) = adapter.request_device(&device_desc).await.context("Failed to request WGPU device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no supported formats")?;
        let alpha_mode = caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: select_present_mode(self.vsync, &caps.present_modes),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(format = ?format, width = config.width, height = config.height, "surface configured");

        self.size = size;
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.config = Some(config);
        Ok(())
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(config) = self.config.as_mut() {
            config.width = new_size.width;
            config.height = new_size.height;
        }
        self.reconfigure();
    }

    fn reconfigure(&mut self) {
        if let (Some(surface), Some(device), Some(config)) = (&self.surface, &self.device, &self.config) {
            surface.configure(device, config);
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn clear(&mut self, color: Vec3) -> Result<(), wgpu::SurfaceError> {
        let (Some(surface), Some(device), Some(queue)) = (&self.surface, &self.device, &self.queue) else {
            return Ok(());
        };
        let frame = surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Clear Encoder") });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sky Clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(color.x),
                            g: f64::from(color.y),
                            b: f64::from(color.z),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn select_present_mode(vsync: bool, modes: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        modes.iter().copied().find(|mode| *mode != wgpu::PresentMode::Fifo).unwrap_or(wgpu::PresentMode::Fifo)
    }
}

struct ViewerShell {
    app: CampusApp,
    surface: ClearSurface,
    clock: FrameClock,
    should_close: bool,
    awaiting_restore: bool,
}

impl ViewerShell {
    fn new(app: CampusApp) -> Self {
        let surface = ClearSurface::new(&app.config().window);
        Self { app, surface, clock: FrameClock::new(), should_close: false, awaiting_restore: false }
    }

    fn apply_renderer_actions(&mut self) {
        let actions = self.app.take_renderer_actions();
        if actions.contains(RecoveryActions::FREE_GPU_RESOURCES) {
            // The clear pass holds no cached textures or pipelines; the surface stays for reconfigure.
            debug!("gpu resources released");
        }
        if actions.contains(RecoveryActions::RECOMPILE_MATERIALS) {
            self.surface.reconfigure();
        }
        if actions.contains(RecoveryActions::FORCE_REDRAW) {
            self.surface.request_redraw();
        }
    }

    fn redraw(&mut self) {
        let dt = self.clock.tick();
        let report = self.app.frame(dt);
        self.apply_renderer_actions();
        for event in &report.events {
            debug!(%event, "viewer event");
        }
        if report.reload_due {
            if let Err(err) = self.app.reload() {
                error!(error = ?err, "viewer reload failed");
                self.should_close = true;
            }
            return;
        }
        if report.rendering_suspended && !self.awaiting_restore {
            return;
        }
        match self.surface.clear(self.app.lighting().fog_rgb()) {
            Ok(()) => {
                if self.awaiting_restore {
                    self.awaiting_restore = false;
                    self.app.on_context_restored();
                    self.apply_renderer_actions();
                }
            }
            Err(err) => {
                self.app.on_surface_error(&err);
                self.apply_renderer_actions();
                match classify_surface_error(&err) {
                    SurfaceFault::ContextLost => {
                        self.awaiting_restore = true;
                        self.surface.reconfigure();
                    }
                    SurfaceFault::Transient => self.surface.reconfigure(),
                    SurfaceFault::OutOfMemory => warn!("surface out of memory"),
                }
            }
        }
    }
}

impl ApplicationHandler for ViewerShell {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let settings = self.app.render_settings();
        if let Err(err) = self.surface.ensure_window(event_loop, &settings) {
            error!(error = ?err, "window initialization failed");
            self.should_close = true;
            return;
        }
        if let Some(window) = self.surface.window() {
            self.app.resize(window.inner_size());
            self.app.set_capture(Box::new(WindowCapture::new(window)));
        }
    }

    fn window_event(&mut self, _el: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.app.push_input(InputEvent::from_window_event(&event));
        match event {
            WindowEvent::CloseRequested => self.should_close = true,
            WindowEvent::Resized(size) => {
                self.surface.resize(size);
                self.app.resize(size);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn device_event(&mut self, _el: &ActiveEventLoop, _dev: DeviceId, event: DeviceEvent) {
        self.app.push_input(InputEvent::from_device_event(&event));
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        self.surface.request_redraw();
    }
}
