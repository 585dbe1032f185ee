//! Viewer configuration.
//!
//! All values are fixed before the first frame. The field resolution in
//! particular never changes afterwards: resizing the window only rescales the
//! drawn quad.
//!
//! ```ignore
//! use metafield::FieldConfig;
//!
//! let config = FieldConfig::new()
//!     .with_field_size(1024, 768)
//!     .with_grid_stride(128)
//!     .with_kernel_path("kernels/inverse_cube.wgsl");
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SetupError};
use crate::kernel::FieldKernel;
use crate::params::Controls;
use crate::sources::DEFAULT_GRID_STRIDE;
use crate::texture::FieldExtent;

/// Configuration for the field pipeline and its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Field width in field pixels.
    pub width: u32,
    /// Field height in field pixels.
    pub height: u32,
    /// Spacing of the static source grid.
    pub grid_stride: u32,
    /// Initial control positions.
    pub controls: Controls,
    /// WGSL file replacing the built-in kernel.
    pub kernel_path: Option<PathBuf>,
    /// Entry point of an external kernel.
    pub kernel_entry_point: Option<String>,
    /// `@workgroup_size` of an external kernel, when not 8×8.
    pub kernel_workgroup_size: Option<[u32; 2]>,
    pub window_title: String,
    /// Clear color behind the field quad (RGBA, 0-1).
    pub clear_color: [f64; 4],
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            grid_stride: DEFAULT_GRID_STRIDE,
            controls: Controls::default(),
            kernel_path: None,
            kernel_entry_point: None,
            kernel_workgroup_size: None,
            window_title: "metafield".to_string(),
            clear_color: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

impl FieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field resolution. Also the initial window size.
    pub fn with_field_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the spacing of the static source grid.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is zero.
    pub fn with_grid_stride(mut self, stride: u32) -> Self {
        assert!(stride > 0, "grid stride must be positive");
        self.grid_stride = stride;
        self
    }

    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = controls;
        self
    }

    /// Load the kernel from a WGSL file instead of the built-in one.
    pub fn with_kernel_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kernel_path = Some(path.into());
        self
    }

    pub fn with_kernel_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.kernel_entry_point = Some(entry_point.into());
        self
    }

    /// Workgroup size declared by an external kernel.
    pub fn with_kernel_workgroup_size(mut self, x: u32, y: u32) -> Self {
        self.kernel_workgroup_size = Some([x, y]);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }

    pub fn with_clear_color(mut self, color: [f64; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn extent(&self) -> FieldExtent {
        FieldExtent::new(self.width, self.height)
    }

    /// Resolve the kernel this configuration names. Reads the file, if any.
    pub fn kernel(&self) -> Result<FieldKernel, SetupError> {
        let kernel = match &self.kernel_path {
            Some(path) => FieldKernel::load(path)?,
            None => FieldKernel::metaballs(),
        };
        let kernel = match &self.kernel_entry_point {
            Some(entry_point) => kernel.with_entry_point(entry_point.clone()),
            None => kernel,
        };
        Ok(match self.kernel_workgroup_size {
            Some([x, y]) => kernel.with_workgroup_size(x, y),
            None => kernel,
        })
    }

    /// Check the values the builder cannot enforce on deserialized input.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_stride == 0 {
            return Err(ConfigError::Invalid("grid_stride must be positive".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "field size {}x{} is empty",
                self.width, self.height
            )));
        }
        if let Some([x, y]) = self.kernel_workgroup_size {
            if x == 0 || y == 0 {
                return Err(ConfigError::Invalid(format!(
                    "kernel workgroup size {}x{} is empty",
                    x, y
                )));
            }
        }
        Ok(())
    }

    /// Read a configuration from a JSON file. Missing fields keep their
    /// defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FieldConfig::default();
        assert_eq!(config.extent(), FieldExtent::new(800, 600));
        assert_eq!(config.grid_stride, 100);
        assert_eq!(config.controls, Controls::default());
        assert_eq!(config.kernel().unwrap(), FieldKernel::metaballs());
    }

    #[test]
    fn test_builder() {
        let config = FieldConfig::new()
            .with_field_size(320, 240)
            .with_grid_stride(40)
            .with_kernel_entry_point("field_main")
            .with_title("test");

        assert_eq!(config.extent(), FieldExtent::new(320, 240));
        assert_eq!(config.grid_stride, 40);
        assert_eq!(config.window_title, "test");
        assert_eq!(config.kernel().unwrap().entry_point(), "field_main");
    }

    #[test]
    #[should_panic(expected = "grid stride must be positive")]
    fn test_zero_stride_panics() {
        let _ = FieldConfig::new().with_grid_stride(0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: FieldConfig = serde_json::from_str(r#"{ "width": 640, "controls": { "charge": 50, "lower_limit": 10, "limiting": false } }"#).unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 600);
        assert_eq!(config.controls.charge, 50);
        assert!(!config.controls.limiting);
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("metafield-config-{}.json", std::process::id()));
        let config = FieldConfig::new().with_field_size(400, 300).with_kernel_path("k.wgsl");

        config.save(&path).unwrap();
        let loaded = FieldConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_zero_stride() {
        let path = std::env::temp_dir().join(format!("metafield-stride-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "grid_stride": 0 }"#).unwrap();
        let result = FieldConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate() {
        assert!(FieldConfig::default().validate().is_ok());

        let mut config = FieldConfig::default();
        config.width = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = FieldConfig::new().with_kernel_workgroup_size(16, 0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_kernel_workgroup_size() {
        let config = FieldConfig::new().with_kernel_workgroup_size(16, 4);
        let kernel = config.kernel().unwrap();
        assert_eq!(kernel.workgroup_size(), [16, 4]);
        assert_eq!(kernel.workgroups(800, 600), [50, 150]);
    }

    #[test]
    fn test_missing_kernel_file() {
        let config = FieldConfig::new().with_kernel_path("no/such/kernel.wgsl");
        assert!(matches!(config.kernel(), Err(SetupError::KernelSource { .. })));
    }
}
