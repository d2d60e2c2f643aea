//! User zoom multiplier.
//!
//! The multiplier is kept as a whole number of steps away from 1.0, so a
//! zoom in followed by a zoom out lands exactly where it started instead of
//! accumulating floating point drift.

use crate::schema::ToolboxOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct ZoomController {
    steps: i32,
    step: f64,
    min_steps: i32,
    max_steps: i32,
}

impl Default for ZoomController {
    fn default() -> Self {
        Self::new(0.5, 3.0, 0.25)
    }
}

impl ZoomController {
    /// Limits are rounded inward to whole steps; a non-positive step falls
    /// back to 0.25.
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        let step = if step > 0.0 && step.is_finite() { step } else { 0.25 };
        // the smallest legible multiplier is one step above zero
        let floor_steps = ((step - 1.0) / step).ceil() as i32;
        let min_steps = (((min - 1.0) / step).ceil() as i32).max(floor_steps);
        let max_steps = (((max - 1.0) / step).floor() as i32).max(min_steps);
        Self {
            steps: 0.clamp(min_steps, max_steps),
            step,
            min_steps,
            max_steps,
        }
    }

    pub fn from_options(options: &ToolboxOptions) -> Self {
        Self::new(options.zoom_min, options.zoom_max, options.zoom_step)
    }

    pub fn zoom(&self) -> f64 {
        1.0 + self.steps as f64 * self.step
    }

    /// Returns whether the multiplier changed.
    pub fn zoom_in(&mut self) -> bool {
        self.set_steps(self.steps + 1)
    }

    /// Returns whether the multiplier changed.
    pub fn zoom_out(&mut self) -> bool {
        self.set_steps(self.steps - 1)
    }

    pub fn reset(&mut self) -> bool {
        self.set_steps(0)
    }

    pub fn can_zoom_in(&self) -> bool {
        self.steps < self.max_steps
    }

    pub fn can_zoom_out(&self) -> bool {
        self.steps > self.min_steps
    }

    fn set_steps(&mut self, steps: i32) -> bool {
        let steps = steps.clamp(self.min_steps, self.max_steps);
        let changed = steps != self.steps;
        self.steps = steps;
        changed
    }
}

/// Scale the renderer draws a page at.
pub fn effective_scale(base_scale: f64, zoom: f64) -> f64 {
    base_scale * zoom
}
