//! Field kernel on wgpu.
//!
//! Acquiring the field image opens a command encoder inside a validation
//! error scope; releasing it submits the encoder and closes the scope. All
//! device errors raised in between surface as one release error, so a frame
//! reports its failures once.

use crate::dispatch::{FieldBackend, KernelArgs};
use crate::error::{DispatchError, InteropError, SetupError};
use crate::kernel::{FieldKernel, KernelArgument, KernelParamsGpu};
use crate::pipeline::ComputeSetup;
use crate::sources::SourcePoint;
use crate::texture::{FieldExtent, FieldTexture, FIELD_TEXTURE_FORMAT};

use super::RenderContext;

/// Compute side of the pipeline, sharing the renderer's device.
pub struct GpuFieldBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    kernel: FieldKernel,
    /// Open while the field image is acquired.
    encoder: Option<wgpu::CommandEncoder>,
}

impl ComputeSetup for RenderContext {
    type Backend = GpuFieldBackend;

    fn build(
        &self,
        kernel: &FieldKernel,
        extent: FieldExtent,
    ) -> Result<(GpuFieldBackend, FieldTexture), SetupError> {
        GpuFieldBackend::build(self, kernel, extent)
    }
}

impl GpuFieldBackend {
    /// Compile `kernel` on the rendering device and allocate the field image.
    pub fn build(
        context: &RenderContext,
        kernel: &FieldKernel,
        extent: FieldExtent,
    ) -> Result<(Self, FieldTexture), SetupError> {
        kernel.check_entry_point()?;

        let device = context.device().clone();
        let queue = context.queue().clone();
        tracing::info!(
            kernel = kernel.name(),
            abi = kernel.abi().version,
            "building field kernel on {}",
            context.adapter_info().name
        );

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.name()),
            source: wgpu::ShaderSource::Wgsl(kernel.source().into()),
        });
        let log = build_log(&pollster::block_on(module.get_compilation_info()));

        let bind_group_layout = create_bind_group_layout(&device, kernel);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Field Kernel Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Field Kernel Pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(kernel.entry_point()),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            let log = if log.is_empty() {
                err.to_string()
            } else {
                format!("{}\n{}", log, err)
            };
            return Err(SetupError::Build {
                kernel: kernel.name().to_string(),
                log,
            });
        }
        if !log.is_empty() {
            tracing::debug!(kernel = kernel.name(), "compiler messages:\n{}", log);
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = FieldTexture::new(&device, extent);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(SetupError::Texture(err.to_string()));
        }

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Kernel Params"),
            size: std::mem::size_of::<KernelParamsGpu>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let backend = Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            params_buffer,
            kernel: kernel.clone(),
            encoder: None,
        };
        Ok((backend, texture))
    }

    pub fn kernel(&self) -> &FieldKernel {
        &self.kernel
    }
}

impl FieldBackend for GpuFieldBackend {
    type Image = FieldTexture;
    type Sources = wgpu::Buffer;

    fn allocate_sources(&mut self, count: usize) -> Result<wgpu::Buffer, DispatchError> {
        // Zero-sized storage bindings are invalid
        let size = (count.max(1) * std::mem::size_of::<SourcePoint>()) as u64;
        let max = u64::from(self.device.limits().max_storage_buffer_binding_size);
        if size > max {
            return Err(DispatchError::Allocate(format!(
                "{} sources need {} bytes, device allows {}",
                count, size, max
            )));
        }

        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Sources Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }

    fn finish_rendering(&mut self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    fn acquire(&mut self, _image: &FieldTexture) -> Result<(), InteropError> {
        if self.encoder.is_some() {
            return Err(InteropError::AlreadyAcquired);
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.encoder = Some(
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Field Compute Encoder"),
                }),
        );
        Ok(())
    }

    fn write_sources(
        &mut self,
        buffer: &wgpu::Buffer,
        points: &[SourcePoint],
    ) -> Result<(), DispatchError> {
        let bytes: &[u8] = bytemuck::cast_slice(points);
        if bytes.len() as u64 > buffer.size() {
            return Err(DispatchError::Upload(format!(
                "{} bytes do not fit a {} byte buffer",
                bytes.len(),
                buffer.size()
            )));
        }

        self.queue.write_buffer(buffer, 0, bytes);
        Ok(())
    }

    fn launch(
        &mut self,
        args: KernelArgs<'_, wgpu::Buffer, FieldTexture>,
        extent: FieldExtent,
    ) -> Result<(), DispatchError> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(DispatchError::Launch("field image is not acquired".into()));
        };

        let params = KernelParamsGpu::from_args(&args);
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let abi = self.kernel.abi();
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Field Kernel Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: abi.binding(KernelArgument::Sources),
                    resource: args.sources.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: abi.binding(KernelArgument::Charge),
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: abi.binding(KernelArgument::Output),
                    resource: wgpu::BindingResource::TextureView(&args.output.storage_view),
                },
            ],
        });

        let [x, y] = self.kernel.workgroups(extent.width, extent.height);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Field Kernel Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(x, y, 1);
        }
        Ok(())
    }

    fn release(&mut self, _image: &FieldTexture) -> Result<(), DispatchError> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| DispatchError::Release("field image is not acquired".into()))?;
        self.queue.submit(std::iter::once(encoder.finish()));

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(DispatchError::Release(err.to_string())),
            None => Ok(()),
        }
    }
}

fn create_bind_group_layout(device: &wgpu::Device, kernel: &FieldKernel) -> wgpu::BindGroupLayout {
    let abi = kernel.abi();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Field Kernel Bind Group Layout"),
        entries: &[
            // Source points
            wgpu::BindGroupLayoutEntry {
                binding: abi.binding(KernelArgument::Sources),
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Count, charge, limit, apply_limit
            wgpu::BindGroupLayoutEntry {
                binding: abi.binding(KernelArgument::Charge),
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Output image
            wgpu::BindGroupLayoutEntry {
                binding: abi.binding(KernelArgument::Output),
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: FIELD_TEXTURE_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
        ],
    })
}

fn build_log(info: &wgpu::CompilationInfo) -> String {
    info.messages
        .iter()
        .map(|m| {
            let kind = format!("{:?}", m.message_type).to_lowercase();
            match &m.location {
                Some(loc) => format!(
                    "{}:{}: {}: {}",
                    loc.line_number, loc.line_position, kind, m.message
                ),
                None => format!("{}: {}", kind, m.message),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
