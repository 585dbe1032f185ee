//! The field kernel and the interface the host binds it through.
//!
//! A kernel is a WGSL compute program with a single entry point. The host
//! talks to it through a fixed argument list, [`KernelAbi`]. Any kernel that
//! honours the same bindings can replace the built-in one, for instance to
//! try a different falloff law, without touching the dispatcher.
//!
//! # ABI v1
//!
//! | Argument | Binding | WGSL |
//! |----------|---------|------|
//! | sources | 0 | `var<storage, read> array<vec2<i32>>` |
//! | count, charge, limit, apply_limit | 1 | `var<uniform>` struct, in that order |
//! | output | 2 | `texture_storage_2d<rgba8unorm, write>` |
//!
//! The kernel is launched over one invocation per output pixel, rounded up to
//! whole workgroups; it must ignore invocations outside the image.

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::IVec2;

use crate::dispatch::KernelArgs;
use crate::error::SetupError;
use crate::params::FieldParams;
use crate::sources::SourcePoint;

/// Built-in inverse-square kernel.
pub const METABALLS_SOURCE: &str = include_str!("metaballs.wgsl");

/// Name of the built-in kernel and of its entry point.
pub const METABALLS_ENTRY_POINT: &str = "metaballs";

/// Arguments of the field kernel, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelArgument {
    Sources,
    SourceCount,
    Charge,
    Limit,
    ApplyLimit,
    Output,
}

/// Version of the host/kernel interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelAbi {
    pub version: u32,
    pub arguments: &'static [KernelArgument],
}

impl KernelAbi {
    pub const V1: KernelAbi = KernelAbi {
        version: 1,
        arguments: &[
            KernelArgument::Sources,
            KernelArgument::SourceCount,
            KernelArgument::Charge,
            KernelArgument::Limit,
            KernelArgument::ApplyLimit,
            KernelArgument::Output,
        ],
    };

    /// Bind group slot that carries `argument`.
    pub fn binding(&self, argument: KernelArgument) -> u32 {
        match argument {
            KernelArgument::Sources => 0,
            KernelArgument::SourceCount
            | KernelArgument::Charge
            | KernelArgument::Limit
            | KernelArgument::ApplyLimit => 1,
            KernelArgument::Output => 2,
        }
    }
}

/// Scalar kernel arguments, packed as the binding 1 uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct KernelParamsGpu {
    pub count: u32,
    pub charge: f32,
    pub limit: f32,
    pub apply_limit: i32,
}

impl KernelParamsGpu {
    /// Pack the scalar arguments of one launch.
    pub fn from_args<S, I>(args: &KernelArgs<'_, S, I>) -> Self {
        Self {
            count: args.count,
            charge: args.charge,
            limit: args.limit,
            apply_limit: args.apply_limit,
        }
    }
}

/// Potential of the built-in kernel at `pixel`: the inverse-square falloff
/// `charge / max(d², 1)`, summed over every source.
pub fn field_value(pixel: IVec2, sources: &[SourcePoint], charge: f32) -> f32 {
    let p = pixel.as_vec2();
    sources
        .iter()
        .map(|s| charge / (p - s.as_vec2()).length_squared().max(1.0))
        .sum()
}

/// Intensity the built-in kernel writes at `pixel`.
///
/// With `apply_limit` the result is 1 where the potential reaches `limit`
/// and 0 elsewhere; otherwise it is the potential clamped to `[0, 1]`.
/// Evaluates the field on the host, without a device.
pub fn field_intensity(pixel: IVec2, sources: &[SourcePoint], params: &FieldParams) -> f32 {
    let value = field_value(pixel, sources, params.charge);
    if params.apply_limit {
        if value >= params.limit {
            1.0
        } else {
            0.0
        }
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A field kernel program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKernel {
    name: String,
    source: String,
    entry_point: String,
    workgroup_size: [u32; 2],
    abi: KernelAbi,
}

impl FieldKernel {
    /// The built-in inverse-square kernel.
    pub fn metaballs() -> Self {
        Self::from_wgsl(METABALLS_ENTRY_POINT, METABALLS_SOURCE)
    }

    /// A kernel from WGSL source, using the default entry point and an 8×8
    /// workgroup.
    pub fn from_wgsl(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            entry_point: METABALLS_ENTRY_POINT.to_string(),
            workgroup_size: [8, 8],
            abi: KernelAbi::V1,
        }
    }

    /// Read a kernel from a WGSL file. The file stem becomes the kernel name.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SetupError::KernelSource {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| METABALLS_ENTRY_POINT.to_string());

        tracing::info!(kernel = %name, path = %path.display(), "loaded kernel source");
        Ok(Self::from_wgsl(name, source))
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Workgroup size declared by the kernel's `@workgroup_size`.
    pub fn with_workgroup_size(mut self, x: u32, y: u32) -> Self {
        self.workgroup_size = [x.max(1), y.max(1)];
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn workgroup_size(&self) -> [u32; 2] {
        self.workgroup_size
    }

    pub fn abi(&self) -> KernelAbi {
        self.abi
    }

    /// Workgroup counts covering a `width × height` image.
    pub fn workgroups(&self, width: u32, height: u32) -> [u32; 2] {
        [
            width.div_ceil(self.workgroup_size[0]),
            height.div_ceil(self.workgroup_size[1]),
        ]
    }

    /// Cheap check that the entry point is declared, before handing the
    /// source to the device compiler.
    pub fn check_entry_point(&self) -> Result<(), SetupError> {
        let declared = self
            .source
            .match_indices("fn ")
            .any(|(i, _)| {
                let rest = &self.source[i + 3..];
                rest.trim_start().starts_with(self.entry_point.as_str())
                    && rest
                        .trim_start()
                        .get(self.entry_point.len()..)
                        .is_some_and(|tail| tail.trim_start().starts_with('('))
            });

        if declared {
            Ok(())
        } else {
            Err(SetupError::MissingEntryPoint {
                kernel: self.name.clone(),
                entry_point: self.entry_point.clone(),
            })
        }
    }
}

impl Default for FieldKernel {
    fn default() -> Self {
        Self::metaballs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_builtin_kernel() {
        let kernel = FieldKernel::metaballs();
        assert_eq!(kernel.name(), "metaballs");
        assert_eq!(kernel.entry_point(), "metaballs");
        assert_eq!(kernel.abi().version, 1);
        assert!(kernel.check_entry_point().is_ok());
    }

    #[test]
    fn test_abi_argument_order() {
        let abi = KernelAbi::V1;
        assert_eq!(abi.arguments.len(), 6);
        assert_eq!(abi.arguments[0], KernelArgument::Sources);
        assert_eq!(abi.arguments[5], KernelArgument::Output);
        assert_eq!(abi.binding(KernelArgument::Sources), 0);
        assert_eq!(abi.binding(KernelArgument::Limit), 1);
        assert_eq!(abi.binding(KernelArgument::Output), 2);
    }

    #[test]
    fn test_params_layout() {
        assert_eq!(std::mem::size_of::<KernelParamsGpu>(), 16);

        let args = KernelArgs {
            sources: &(),
            count: 64,
            charge: 2.0,
            limit: 0.25,
            apply_limit: 1,
            output: &(),
        };
        let gpu = KernelParamsGpu::from_args(&args);
        assert_eq!(gpu.count, 64);
        assert_eq!(gpu.charge, 2.0);
        assert_eq!(gpu.apply_limit, 1);
        assert_eq!(bytemuck::bytes_of(&gpu).len(), 16);
    }

    #[test]
    fn test_workgroups_round_up() {
        let kernel = FieldKernel::metaballs();
        assert_eq!(kernel.workgroups(800, 600), [100, 75]);
        assert_eq!(kernel.workgroups(801, 1), [101, 1]);
    }

    #[test]
    fn test_missing_entry_point() {
        let kernel = FieldKernel::from_wgsl("broken", "fn metaballs_helper() {}");
        assert!(matches!(
            kernel.check_entry_point(),
            Err(SetupError::MissingEntryPoint { .. })
        ));

        let kernel = FieldKernel::from_wgsl("spaced", "fn  metaballs (x: u32) {}");
        assert!(kernel.check_entry_point().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = FieldKernel::load("does/not/exist.wgsl").unwrap_err();
        assert!(matches!(err, SetupError::KernelSource { .. }));
    }

    #[test]
    fn test_builtin_kernel_validates() {
        let module = validate_wgsl(METABALLS_SOURCE).unwrap();

        let entry = module
            .entry_points
            .iter()
            .find(|e| e.name == METABALLS_ENTRY_POINT)
            .expect("entry point present");
        assert_eq!(entry.stage, naga::ShaderStage::Compute);
        assert_eq!(entry.workgroup_size, [8, 8, 1]);
    }

    fn limited(charge: f32, limit: f32) -> FieldParams {
        FieldParams {
            charge,
            limit,
            apply_limit: true,
        }
    }

    #[test]
    fn test_field_value_falls_off_with_distance() {
        let sources = [SourcePoint::new(0, 0)];

        // Clamped inside unit distance
        assert_relative_eq!(field_value(IVec2::new(0, 0), &sources, 10.0), 10.0);
        assert_relative_eq!(field_value(IVec2::new(1, 0), &sources, 10.0), 10.0);
        assert_relative_eq!(field_value(IVec2::new(2, 0), &sources, 10.0), 2.5);
        assert_relative_eq!(field_value(IVec2::new(3, 4), &sources, 10.0), 0.4);

        let mut previous = f32::INFINITY;
        for x in 1..50 {
            let value = field_value(IVec2::new(x, 0), &sources, 10.0);
            assert!(value <= previous);
            previous = value;
        }
        assert!(previous < field_value(IVec2::new(1, 0), &sources, 10.0));
    }

    #[test]
    fn test_field_value_sums_sources() {
        let a = SourcePoint::new(10, 10);
        let b = SourcePoint::new(40, 25);
        let p = IVec2::new(22, 17);

        let both = field_value(p, &[a, b], 30.0);
        let sum = field_value(p, &[a], 30.0) + field_value(p, &[b], 30.0);
        assert_relative_eq!(both, sum, epsilon = 1e-6);
        assert_eq!(field_value(p, &[], 30.0), 0.0);
    }

    #[test]
    fn test_raising_limit_shrinks_bright_region() {
        let mut sources = Vec::new();
        for x in (0..=100).step_by(50) {
            for y in (0..=100).step_by(50) {
                sources.push(SourcePoint::new(x, y));
            }
        }

        let lit = |limit: f32| -> Vec<IVec2> {
            let params = limited(30.0, limit);
            (0..100)
                .flat_map(|x| (0..100).map(move |y| IVec2::new(x, y)))
                .filter(|&p| field_intensity(p, &sources, &params) == 1.0)
                .collect()
        };

        let low = lit(0.2);
        let mid = lit(0.5);
        let high = lit(2.0);
        assert!(low.len() > mid.len());
        assert!(mid.len() > high.len());
        assert!(!high.is_empty());
        assert!(high.iter().all(|p| mid.contains(p)));
    }

    #[test]
    fn test_field_intensity_grayscale() {
        let sources = [SourcePoint::new(0, 0)];
        let params = FieldParams {
            charge: 4.0,
            limit: 0.5,
            apply_limit: false,
        };

        assert_eq!(field_intensity(IVec2::new(0, 0), &sources, &params), 1.0);
        assert_relative_eq!(field_intensity(IVec2::new(4, 0), &sources, &params), 0.25);
        assert_eq!(field_intensity(IVec2::new(4, 0), &sources, &limited(4.0, 0.25)), 1.0);
        assert_eq!(field_intensity(IVec2::new(5, 0), &sources, &limited(4.0, 0.25)), 0.0);
    }

    #[test]
    fn test_wgsl_matches_host_field_law() {
        assert!(METABALLS_SOURCE.contains("params.charge / max(dot(d, d), 1.0)"));
        assert!(METABALLS_SOURCE.contains("value >= params.limit"));
        assert!(METABALLS_SOURCE.contains("clamp(value, 0.0, 1.0)"));
    }

    /// Validates WGSL code using naga.
    fn validate_wgsl(code: &str) -> Result<naga::Module, String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(module)
    }
}
