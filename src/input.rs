//! Keyboard bindings for the field controls.
//!
//! | Key | Action |
//! |-----|--------|
//! | `Up` / `Down` | charge ±5 |
//! | `Right` / `Left` | lower limit ±5 |
//! | `L` | toggle limiting |
//! | `Escape` | quit |
//!
//! These work with or without the `egui` panel and drive the same controls.

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::dispatch::FieldBackend;
use crate::pipeline::FieldPipeline;

/// Control step per key press.
pub const CONTROL_STEP: i32 = 5;

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Move the charge control by this much.
    Charge(i32),
    /// Move the lower limit control by this much.
    LowerLimit(i32),
    ToggleLimiting,
    Quit,
}

impl ControlAction {
    pub fn for_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::ArrowUp => Some(ControlAction::Charge(CONTROL_STEP)),
            KeyCode::ArrowDown => Some(ControlAction::Charge(-CONTROL_STEP)),
            KeyCode::ArrowRight => Some(ControlAction::LowerLimit(CONTROL_STEP)),
            KeyCode::ArrowLeft => Some(ControlAction::LowerLimit(-CONTROL_STEP)),
            KeyCode::KeyL => Some(ControlAction::ToggleLimiting),
            KeyCode::Escape => Some(ControlAction::Quit),
            _ => None,
        }
    }

    /// Action for a key event, on press only.
    pub fn for_event(event: &KeyEvent) -> Option<Self> {
        if event.state != ElementState::Pressed || (event.repeat && !Self::repeats(event)) {
            return None;
        }
        match event.physical_key {
            PhysicalKey::Code(code) => Self::for_key(code),
            PhysicalKey::Unidentified(_) => None,
        }
    }

    fn repeats(event: &KeyEvent) -> bool {
        matches!(
            event.physical_key,
            PhysicalKey::Code(KeyCode::ArrowUp | KeyCode::ArrowDown | KeyCode::ArrowLeft | KeyCode::ArrowRight)
        )
    }

    /// Forward the action to the pipeline. Sliders stay within `[0, 100]`.
    ///
    /// Returns false for [`ControlAction::Quit`], which the caller handles.
    pub fn apply<B: FieldBackend>(self, pipeline: &mut FieldPipeline<B>) -> bool {
        let controls = pipeline.controls();
        match self {
            ControlAction::Charge(delta) => {
                pipeline.set_charge((controls.charge + delta).clamp(0, 100));
            }
            ControlAction::LowerLimit(delta) => {
                pipeline.set_lower_limit((controls.lower_limit + delta).clamp(0, 100));
            }
            ControlAction::ToggleLimiting => pipeline.set_limiting(!controls.limiting),
            ControlAction::Quit => return false,
        }
        tracing::debug!(controls = ?pipeline.controls(), "controls changed");
        true
    }
}
