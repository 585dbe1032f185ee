//! Window, event loop and the per-repaint render path.
//!
//! Each repaint builds the compute side on first use, dispatches the field
//! kernel, then clears the surface and draws the field quad. Repaints are
//! event driven: pointer motion, control changes and resizes request one.

use std::sync::Arc;

use glam::{UVec2, Vec2};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::FieldConfig;
use crate::error::{AppError, GpuError};
#[cfg(feature = "egui")]
use crate::gpu::EguiIntegration;
use crate::gpu::{FieldRenderer, GpuFieldBackend, RenderContext};
use crate::input::ControlAction;
use crate::pipeline::FieldPipeline;
use crate::time::FrameClock;

/// Surface, device and renderer for the viewer window.
pub struct GpuState {
    surface: wgpu::Surface<'static>,
    context: RenderContext,
    pub config: wgpu::SurfaceConfiguration,
    renderer: FieldRenderer,
    clear_color: wgpu::Color,
    #[cfg(feature = "egui")]
    egui: EguiIntegration,
}

impl GpuState {
    pub async fn new(window: Arc<Window>, clear_color: [f64; 4]) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;
        let (context, adapter) = RenderContext::request(&instance, &surface).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(context.device(), &config);

        let renderer = FieldRenderer::new(context.device(), config.format);
        #[cfg(feature = "egui")]
        let egui = EguiIntegration::new(context.device(), config.format, &window);

        let [r, g, b, a] = clear_color;
        Ok(Self {
            surface,
            context,
            config,
            renderer,
            clear_color: wgpu::Color { r, g, b, a },
            #[cfg(feature = "egui")]
            egui,
        })
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Reconfigure the surface. The field keeps its resolution; only the
    /// quad is rescaled.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(self.context.device(), &self.config);
        }
    }

    /// Dispatch the field kernel and draw the frame.
    pub fn render(
        &mut self,
        #[allow(unused_variables)] window: &Window,
        pipeline: &mut FieldPipeline<GpuFieldBackend>,
    ) -> Result<(), wgpu::SurfaceError> {
        if !pipeline.setup_attempted() {
            pipeline.ensure_ready(Some(&self.context));
        }
        if !self.renderer.is_attached() {
            if let Some(texture) = pipeline.field_image() {
                self.renderer.attach(self.context.device(), texture);
            }
        }

        // Released before returning, so the quad below may sample it
        pipeline.frame();

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .context
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        #[cfg(feature = "egui")]
        let (egui_output, screen_descriptor) = {
            let mut controls = pipeline.controls();
            let (egui_output, changes) = self.egui.run(window, &mut controls);
            if changes.charge {
                pipeline.set_charge(controls.charge);
            }
            if changes.lower_limit {
                pipeline.set_lower_limit(controls.lower_limit);
            }
            if changes.limiting {
                pipeline.set_limiting(controls.limiting);
            }

            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: egui_output.pixels_per_point,
            };
            self.egui.prepare(
                self.context.device(),
                self.context.queue(),
                &mut encoder,
                &egui_output,
                &screen_descriptor,
            );
            (egui_output, screen_descriptor)
        };

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Field Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer.draw(&mut render_pass);

            #[cfg(feature = "egui")]
            {
                let mut render_pass = render_pass.forget_lifetime();
                self.egui
                    .render(&mut render_pass, &egui_output, &screen_descriptor);
            }
        }

        self.context.queue().submit(std::iter::once(encoder.finish()));
        output.present();

        #[cfg(feature = "egui")]
        self.egui.cleanup(&egui_output);

        Ok(())
    }
}

/// Viewer application state.
pub struct App {
    config: FieldConfig,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    pipeline: FieldPipeline<GpuFieldBackend>,
    clock: FrameClock,
    error: Option<AppError>,
}

impl App {
    pub fn new(config: FieldConfig) -> Self {
        Self {
            pipeline: FieldPipeline::new(config.clone()),
            config,
            window: None,
            gpu_state: None,
            clock: FrameClock::new(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        tracing::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.config.window_title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(self.config.width, self.config.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match pollster::block_on(GpuState::new(window.clone(), self.config.clear_color)) {
            Ok(gpu_state) => self.gpu_state = Some(gpu_state),
            Err(e) => return self.fail(event_loop, e.into()),
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        #[cfg(feature = "egui")]
        if let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) {
            if gpu_state.egui.on_window_event(window, &event) {
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
                self.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.pipeline.pointer_moved(
                        Vec2::new(position.x as f32, position.y as f32),
                        UVec2::new(size.width.max(1), size.height.max(1)),
                    );
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(action) = ControlAction::for_event(&event) {
                    if !action.apply(&mut self.pipeline) {
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) else {
                    return;
                };

                if self.clock.tick() {
                    window.set_title(&format!(
                        "{} - {:.0} FPS",
                        self.config.window_title,
                        self.clock.fps()
                    ));
                }

                match gpu_state.render(window, &mut self.pipeline) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        gpu_state.resize(window.inner_size())
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                    Err(e) => tracing::warn!("Render error: {:?}", e),
                }
            }
            _ => {}
        }

        if self.pipeline.redraw_requested() {
            self.request_redraw();
        }
    }
}

/// Open the viewer window and run until it is closed.
pub fn run(config: FieldConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
