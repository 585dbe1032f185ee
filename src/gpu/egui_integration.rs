//! Egui control panel support.
//!
//! Only compiled with the `egui` feature. The panel draws on top of the field
//! quad in the same render pass.

use std::sync::Arc;
use winit::window::Window;

use crate::params::Controls;

/// Egui integration state.
///
/// Wraps egui context, winit state, and wgpu renderer.
pub struct EguiIntegration {
    pub ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

/// Output from egui frame processing.
pub struct EguiFrameOutput {
    pub paint_jobs: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

impl EguiIntegration {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        window: &Arc<Window>,
    ) -> Self {
        let ctx = egui::Context::default();

        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::dark();
        style.visuals.window_shadow = egui::Shadow::NONE;
        ctx.set_style(style);

        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let renderer = egui_wgpu::Renderer::new(
            device,
            output_format,
            None,  // depth format
            1,     // msaa samples
            false, // dithering
        );

        Self { ctx, state, renderer }
    }

    /// Process a winit event.
    ///
    /// Returns true if egui consumed the event (don't move the pointer source).
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Run the control panel for one frame.
    ///
    /// `controls` is edited in place; returns which controls changed.
    pub fn run(&mut self, window: &Window, controls: &mut Controls) -> (EguiFrameOutput, ControlChanges) {
        let raw_input = self.state.take_egui_input(window);
        self.ctx.begin_pass(raw_input);

        let changes = control_panel(&self.ctx, controls);

        let full_output = self.ctx.end_pass();
        self.state
            .handle_platform_output(window, full_output.platform_output);
        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let output = EguiFrameOutput {
            paint_jobs,
            textures_delta: full_output.textures_delta,
            pixels_per_point: full_output.pixels_per_point,
        };
        (output, changes)
    }

    /// Upload textures and buffers. Call before creating the render pass.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output: &EguiFrameOutput,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &output.paint_jobs,
            screen_descriptor,
        );
    }

    pub fn render(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        output: &EguiFrameOutput,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.renderer
            .render(render_pass, &output.paint_jobs, screen_descriptor);
    }

    /// Free textures after frame is done.
    pub fn cleanup(&mut self, output: &EguiFrameOutput) {
        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

/// Which controls the panel changed this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlChanges {
    pub charge: bool,
    pub lower_limit: bool,
    pub limiting: bool,
}

fn control_panel(ctx: &egui::Context, controls: &mut Controls) -> ControlChanges {
    let mut changes = ControlChanges::default();
    egui::Window::new("Field")
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            changes.charge = ui
                .add(egui::Slider::new(&mut controls.charge, 0..=100).text("Charge"))
                .changed();
            changes.lower_limit = ui
                .add(egui::Slider::new(&mut controls.lower_limit, 0..=100).text("Lower limit"))
                .changed();
            changes.limiting = ui.checkbox(&mut controls.limiting, "Limiting").changed();
        });
    changes
}
