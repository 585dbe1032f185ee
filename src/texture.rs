//! The texture shared between the field kernel and the renderer.
//!
//! One GPU image is both a storage target for compute and a sampled texture
//! for drawing. [`SharedField`] wraps it with an access tag so the two sides
//! never overlap: compute gets the image only through a [`ComputeLease`],
//! which mutably borrows the field until it is released. While a lease is
//! alive neither a second acquire nor a render-side read compiles.

/// Resolution of the field, in field pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldExtent {
    pub width: u32,
    pub height: u32,
}

impl FieldExtent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels, one kernel invocation each.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Which side currently owns the shared image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// Available to rendering; compute may acquire it.
    Free,
    /// Held by compute until released.
    AcquiredByCompute,
}

/// A shared image and its access state.
#[derive(Debug)]
pub struct SharedField<I> {
    image: I,
    extent: FieldExtent,
    state: AccessState,
}

impl<I> SharedField<I> {
    pub fn new(image: I, extent: FieldExtent) -> Self {
        Self {
            image,
            extent,
            state: AccessState::Free,
        }
    }

    pub fn extent(&self) -> FieldExtent {
        self.extent
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    /// Hand the image to compute.
    ///
    /// Fails with [`InteropError::AlreadyAcquired`](crate::error::InteropError)
    /// only if a previous lease was leaked instead of released.
    pub fn acquire(&mut self) -> Result<ComputeLease<'_, I>, crate::error::InteropError> {
        if self.state == AccessState::AcquiredByCompute {
            return Err(crate::error::InteropError::AlreadyAcquired);
        }
        self.state = AccessState::AcquiredByCompute;
        Ok(ComputeLease { field: self })
    }

    /// The image as seen by the renderer.
    pub fn render_view(&self) -> &I {
        &self.image
    }
}

/// Exclusive compute access to a [`SharedField`].
///
/// Dropping the lease releases the image.
#[derive(Debug)]
pub struct ComputeLease<'a, I> {
    field: &'a mut SharedField<I>,
}

impl<I> ComputeLease<'_, I> {
    /// The image as seen by compute.
    pub fn image(&self) -> &I {
        &self.field.image
    }

    pub fn extent(&self) -> FieldExtent {
        self.field.extent
    }

    /// Return the image to the renderer.
    pub fn release(self) {}
}

impl<I> Drop for ComputeLease<'_, I> {
    fn drop(&mut self) {
        self.field.state = AccessState::Free;
    }
}

/// GPU storage behind the shared field.
///
/// `Rgba8Unorm`, usable both as a write-only storage texture and as a sampled
/// texture. Both views are created once, alongside the texture.
#[derive(Debug)]
pub struct FieldTexture {
    pub texture: wgpu::Texture,
    /// Compute alias, bound as the kernel's output image.
    pub storage_view: wgpu::TextureView,
    /// Render alias, sampled by the quad.
    pub sampled_view: wgpu::TextureView,
    /// Nearest filtering, clamped at the edges.
    pub sampler: wgpu::Sampler,
}

pub const FIELD_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

impl FieldTexture {
    /// Allocate the texture. Its contents start zeroed.
    pub fn new(device: &wgpu::Device, extent: FieldExtent) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Field Texture"),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FIELD_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let storage_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Field Storage View"),
            ..Default::default()
        });
        let sampled_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Field Sampled View"),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Field Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            storage_view,
            sampled_view,
            sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InteropError;

    #[test]
    fn test_lease_cycle() {
        let mut field = SharedField::new("image", FieldExtent::new(4, 3));
        assert_eq!(field.state(), AccessState::Free);

        let lease = field.acquire().unwrap();
        assert_eq!(*lease.image(), "image");
        assert_eq!(lease.extent(), FieldExtent::new(4, 3));
        lease.release();

        assert_eq!(field.state(), AccessState::Free);
        assert_eq!(*field.render_view(), "image");
    }

    #[test]
    fn test_dropped_lease_releases() {
        let mut field = SharedField::new((), FieldExtent::new(1, 1));
        {
            let _lease = field.acquire().unwrap();
        }
        assert_eq!(field.state(), AccessState::Free);
        assert!(field.acquire().is_ok());
    }

    #[test]
    fn test_leaked_lease_blocks_acquire() {
        let mut field = SharedField::new((), FieldExtent::new(1, 1));
        std::mem::forget(field.acquire().unwrap());

        assert_eq!(field.state(), AccessState::AcquiredByCompute);
        assert_eq!(field.acquire().unwrap_err(), InteropError::AlreadyAcquired);
    }

    #[test]
    fn test_pixel_count() {
        assert_eq!(FieldExtent::new(800, 600).pixel_count(), 480_000);
    }
}
