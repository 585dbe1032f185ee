//! Scalar field parameters and the control values that drive them.
//!
//! Controls are integers in `[0, 100]`, as produced by a slider. Each setter
//! remaps its control value into the parameter's working range. Values
//! outside `[0, 100]` are not rejected; they extrapolate.

use serde::{Deserialize, Serialize};

use crate::mapping::remap_scalar;

/// Range of every integer control.
pub const CONTROL_RANGE: (f32, f32) = (0.0, 100.0);
/// Range `charge` is mapped onto.
pub const CHARGE_RANGE: (f32, f32) = (1.0, 100.0);
/// Range `limit` is mapped onto.
pub const LIMIT_RANGE: (f32, f32) = (0.001, 0.5);

/// Raw control positions, as shown by a UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub charge: i32,
    pub lower_limit: i32,
    pub limiting: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            charge: 30,
            lower_limit: 25,
            limiting: true,
        }
    }
}

/// Parameters read by the field kernel once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldParams {
    /// Strength applied uniformly to every source.
    pub charge: f32,
    /// Threshold used when `apply_limit` is set.
    pub limit: f32,
    /// Whether the kernel thresholds its output.
    pub apply_limit: bool,
}

impl FieldParams {
    /// Parameters matching a set of control positions.
    pub fn from_controls(controls: &Controls) -> Self {
        let mut params = Self {
            charge: CHARGE_RANGE.0,
            limit: LIMIT_RANGE.0,
            apply_limit: false,
        };
        params.set_charge(controls.charge);
        params.set_lower_limit(controls.lower_limit);
        params.set_limiting(controls.limiting);
        params
    }

    pub fn set_charge(&mut self, control: i32) {
        self.charge = remap_scalar(
            control as f32,
            CONTROL_RANGE.0,
            CONTROL_RANGE.1,
            CHARGE_RANGE.0,
            CHARGE_RANGE.1,
        );
    }

    pub fn set_lower_limit(&mut self, control: i32) {
        self.limit = remap_scalar(
            control as f32,
            CONTROL_RANGE.0,
            CONTROL_RANGE.1,
            LIMIT_RANGE.0,
            LIMIT_RANGE.1,
        );
    }

    pub fn set_limiting(&mut self, limiting: bool) {
        self.apply_limit = limiting;
    }
}

impl Default for FieldParams {
    fn default() -> Self {
        Self::from_controls(&Controls::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_controls() {
        let params = FieldParams::default();
        assert_relative_eq!(params.charge, 1.0 + 0.3 * 99.0, epsilon = 1e-4);
        assert_relative_eq!(params.limit, 0.001 + 0.25 * 0.499, epsilon = 1e-6);
        assert!(params.apply_limit);
    }

    #[test]
    fn test_control_endpoints() {
        let mut params = FieldParams::default();

        params.set_charge(0);
        assert_eq!(params.charge, 1.0);
        params.set_charge(100);
        assert_eq!(params.charge, 100.0);

        params.set_lower_limit(0);
        assert_relative_eq!(params.limit, 0.001);
        params.set_lower_limit(100);
        assert_relative_eq!(params.limit, 0.5);
    }

    #[test]
    fn test_out_of_range_controls_extrapolate() {
        let mut params = FieldParams::default();
        params.set_charge(200);
        assert_relative_eq!(params.charge, 199.0);
        params.set_charge(-100);
        assert_relative_eq!(params.charge, -98.0);
    }

    #[test]
    fn test_limiting_toggle() {
        let mut params = FieldParams::default();
        params.set_limiting(false);
        assert!(!params.apply_limit);
        params.set_limiting(true);
        assert!(params.apply_limit);
    }
}
