//! Fits the page column to its container.

/// Tracks the container the page list lives in and derives the base scale
/// that makes the widest page fill the available width.
///
/// The zoom multiplier lives in [`crate::zoom::ZoomController`]; a resize
/// only recomputes the base scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeController {
    width: f64,
    height: f64,
    horizontal_padding: f64,
    widest_page: Option<f64>,
}

impl ResizeController {
    pub fn new(horizontal_padding: f64) -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            horizontal_padding: horizontal_padding.max(0.0),
            widest_page: None,
        }
    }

    /// Container size in CSS pixels. Returns whether the base scale changed.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        let before = self.base_scale();
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.base_scale() != before
    }

    /// Widest page of the document, in points (after rotation).
    pub fn set_widest_page(&mut self, width: f64) -> bool {
        let before = self.base_scale();
        self.widest_page = (width > 0.0).then_some(width);
        self.base_scale() != before
    }

    pub fn clear_document(&mut self) {
        self.widest_page = None;
    }

    /// Scale at which the widest page exactly fills the usable width; 1.0
    /// until both the container and the document are known.
    pub fn base_scale(&self) -> f64 {
        let available = self.width - self.horizontal_padding;
        match self.widest_page {
            Some(page) if available > 0.0 => available / page,
            _ => 1.0,
        }
    }

    /// Viewport the virtualized list is sized to.
    pub fn viewport(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_scale_fits_widest_page() {
        let mut resize = ResizeController::new(20.0);
        assert_eq!(resize.base_scale(), 1.0);

        resize.resize(620.0, 900.0);
        assert_eq!(resize.base_scale(), 1.0);

        assert!(resize.set_widest_page(300.0));
        assert_eq!(resize.base_scale(), 2.0);

        assert!(resize.resize(320.0, 900.0));
        assert_eq!(resize.base_scale(), 1.0);
        assert_eq!(resize.viewport(), (320.0, 900.0));
    }

    #[test]
    fn height_only_resize_keeps_scale() {
        let mut resize = ResizeController::new(0.0);
        resize.set_widest_page(500.0);
        resize.resize(1000.0, 600.0);
        assert!(!resize.resize(1000.0, 300.0));
        assert_eq!(resize.viewport(), (1000.0, 300.0));
    }

    #[test]
    fn container_narrower_than_padding_falls_back() {
        let mut resize = ResizeController::new(50.0);
        resize.set_widest_page(500.0);
        resize.resize(40.0, 100.0);
        assert_eq!(resize.base_scale(), 1.0);
        resize.clear_document();
        resize.resize(1000.0, 100.0);
        assert_eq!(resize.base_scale(), 1.0);
    }
}
