//! wgpu implementation of the field pipeline.
//!
//! The renderer and the field kernel run on one device. [`RenderContext`] is
//! that device as owned by the renderer; the compute backend is built from it
//! and keeps clones of the same device and queue handles, so the texture the
//! kernel writes is the texture the quad samples.

mod compute;
#[cfg(feature = "egui")]
mod egui_integration;
mod render;

pub use compute::GpuFieldBackend;
#[cfg(feature = "egui")]
pub use egui_integration::{ControlChanges, EguiFrameOutput, EguiIntegration};
pub use render::FieldRenderer;

use crate::error::GpuError;

/// Device and queue of the live rendering context.
#[derive(Debug, Clone)]
pub struct RenderContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
}

impl RenderContext {
    /// Pick an adapter able to present to `surface` and open a device on it.
    ///
    /// Device errors nobody captured are logged rather than panicking: a bad
    /// frame must not take the viewer down.
    pub async fn request(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
    ) -> Result<(Self, wgpu::Adapter), GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        tracing::info!(
            "GPU adapter selected: {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("metafield Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(|e| {
            tracing::error!("uncaptured GPU error: {}", e);
        }));

        Ok((
            Self {
                device,
                queue,
                adapter_info,
            },
            adapter,
        ))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }
}
