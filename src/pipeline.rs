//! The field compute pipeline as seen by the render loop.
//!
//! [`FieldPipeline`] owns everything that outlives a frame: the source
//! registry, the field parameters, and the lazily built compute side. The
//! compute side is constructed at most once, from the first rendering
//! context offered to [`FieldPipeline::ensure_ready`]; if that fails the
//! pipeline stays idle for the rest of the session and the render loop keeps
//! drawing whatever the texture holds.

use glam::{UVec2, Vec2};

use crate::config::FieldConfig;
use crate::dispatch::{DispatchReport, FieldBackend, FieldDispatcher};
use crate::error::SetupError;
use crate::kernel::FieldKernel;
use crate::mapping::Rect;
use crate::params::{Controls, FieldParams};
use crate::sources::SourceRegistry;
use crate::texture::{FieldExtent, SharedField};

/// Builds the compute side of the pipeline from a rendering context.
///
/// Implemented by [`RenderContext`](crate::gpu::RenderContext): the compute
/// backend shares the renderer's device and queue, which is what lets the
/// kernel write the texture the renderer samples.
pub trait ComputeSetup {
    type Backend: FieldBackend;

    /// Compile `kernel` and allocate the shared image for `extent`.
    fn build(
        &self,
        kernel: &FieldKernel,
        extent: FieldExtent,
    ) -> Result<(Self::Backend, <Self::Backend as FieldBackend>::Image), SetupError>;
}

/// Sources, parameters and the lazily built compute side.
pub struct FieldPipeline<B: FieldBackend> {
    config: FieldConfig,
    registry: SourceRegistry,
    controls: Controls,
    params: FieldParams,
    dispatcher: Option<FieldDispatcher<B>>,
    setup_attempted: bool,
    redraw_requested: bool,
}

impl<B: FieldBackend> FieldPipeline<B> {
    pub fn new(config: FieldConfig) -> Self {
        let controls = config.controls;
        Self {
            config,
            registry: SourceRegistry::new(),
            controls,
            params: FieldParams::from_controls(&controls),
            dispatcher: None,
            setup_attempted: false,
            redraw_requested: false,
        }
    }

    /// Build the compute side if this has not been tried yet.
    ///
    /// Failures are logged and leave the pipeline idle. Returns readiness.
    pub fn ensure_ready<S>(&mut self, setup: Option<&S>) -> bool
    where
        S: ComputeSetup<Backend = B>,
    {
        if self.setup_attempted {
            return self.is_ready();
        }

        match self.try_setup(setup) {
            Ok(()) => {
                tracing::info!(
                    width = self.config.width,
                    height = self.config.height,
                    sources = self.registry.len(),
                    "field pipeline ready"
                );
            }
            Err(SetupError::Unavailable) => {
                tracing::warn!("{}; the field will not be computed", SetupError::Unavailable);
            }
            Err(e) => {
                tracing::error!("{}", e);
            }
        }
        self.is_ready()
    }

    /// Build the compute side, reporting why it failed.
    ///
    /// Only the first call does any work; later calls return `Ok(())` if the
    /// first succeeded and [`SetupError::Unavailable`] otherwise.
    pub fn try_setup<S>(&mut self, setup: Option<&S>) -> Result<(), SetupError>
    where
        S: ComputeSetup<Backend = B>,
    {
        if self.setup_attempted {
            return if self.is_ready() {
                Ok(())
            } else {
                Err(SetupError::Unavailable)
            };
        }
        self.setup_attempted = true;

        let setup = setup.ok_or(SetupError::Unavailable)?;
        self.config.validate()?;
        let kernel = self.config.kernel()?;
        let extent = self.config.extent();
        let (backend, image) = setup.build(&kernel, extent)?;

        self.registry
            .initialize_grid(extent.width, extent.height, self.config.grid_stride);
        self.dispatcher = Some(FieldDispatcher::new(backend, SharedField::new(image, extent)));
        Ok(())
    }

    /// Compute this frame's field. Does nothing until the pipeline is ready.
    pub fn frame(&mut self) -> Option<DispatchReport> {
        self.redraw_requested = false;
        let dispatcher = self.dispatcher.as_mut()?;
        Some(dispatcher.dispatch(self.registry.snapshot(), &self.params))
    }

    pub fn is_ready(&self) -> bool {
        self.dispatcher.is_some()
    }

    pub fn setup_attempted(&self) -> bool {
        self.setup_attempted
    }

    /// Set the charge from a control value in `[0, 100]`.
    pub fn set_charge(&mut self, control: i32) {
        self.controls.charge = control;
        self.params.set_charge(control);
        self.redraw_requested = true;
    }

    /// Set the lower limit from a control value in `[0, 100]`.
    pub fn set_lower_limit(&mut self, control: i32) {
        self.controls.lower_limit = control;
        self.params.set_lower_limit(control);
        self.redraw_requested = true;
    }

    pub fn set_limiting(&mut self, limiting: bool) {
        self.controls.limiting = limiting;
        self.params.set_limiting(limiting);
        self.redraw_requested = true;
    }

    /// Move the pointer source to a window position.
    pub fn pointer_moved(&mut self, position: Vec2, window_size: UVec2) {
        let window = Rect::from_size(window_size.x, window_size.y);
        let field = Rect::from_size(self.config.width, self.config.height);
        self.registry.update_pointer(position, window, field);
        self.redraw_requested = true;
    }

    /// Whether an input changed since the last frame.
    pub fn redraw_requested(&self) -> bool {
        self.redraw_requested
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// The shared image as seen by the renderer, once ready.
    pub fn field_image(&self) -> Option<&B::Image> {
        self.dispatcher.as_ref().map(|d| d.field().render_view())
    }

    pub fn dispatcher(&self) -> Option<&FieldDispatcher<B>> {
        self.dispatcher.as_ref()
    }
}
