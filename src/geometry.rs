//! Per-page size cache.
//!
//! Sizes are kept in points at scale 1.0, so a zoom change only rescales
//! what the list lays out; nothing needs to be measured again. Each page
//! starts with an estimate and is confirmed once the renderer reports its
//! real size.

use crate::schema::{PageSize, ToolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePhase {
    Estimated,
    Measured,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PageSlot {
    size: PageSize,
    phase: SizePhase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pages: Vec<PageSlot>,
    fallback: PageSize,
}

impl PageGeometry {
    /// `fallback` stands in for pages nobody has estimated.
    pub fn new(fallback: PageSize) -> Self {
        Self {
            pages: Vec::new(),
            fallback,
        }
    }

    /// Starts a new document of `page_count` pages. Estimates are used in
    /// order; missing ones take the fallback size.
    pub fn reset(&mut self, page_count: usize, estimates: &[PageSize]) {
        self.pages = (0..page_count)
            .map(|i| PageSlot {
                size: estimates.get(i).copied().unwrap_or(self.fallback),
                phase: SizePhase::Estimated,
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Records the renderer's size for a 1-based page number. Returns the
    /// size that was cached before.
    pub fn set_measured(
        &mut self,
        page_number: u32,
        size: PageSize,
    ) -> Result<PageSize, ToolError> {
        let page_count = self.pages.len() as u32;
        let slot = page_number
            .checked_sub(1)
            .and_then(|i| self.pages.get_mut(i as usize))
            .ok_or(ToolError::PageOutOfRange {
                page: page_number,
                page_count,
            })?;
        let previous = slot.size;
        slot.size = size;
        slot.phase = SizePhase::Measured;
        Ok(previous)
    }

    /// Unscaled size of the page at `index` (0-based).
    pub fn size(&self, index: usize) -> PageSize {
        self.pages.get(index).map_or(self.fallback, |slot| slot.size)
    }

    pub fn phase(&self, index: usize) -> Option<SizePhase> {
        self.pages.get(index).map(|slot| slot.phase)
    }

    pub fn measured_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|slot| slot.phase == SizePhase::Measured)
            .count()
    }

    /// Size the page occupies on screen with `rotation` degrees applied at
    /// `scale`.
    pub fn laid_out(&self, index: usize, rotation: u16, scale: f64) -> PageSize {
        let size = self.size(index).rotated(rotation);
        PageSize::new(size.width * scale, size.height * scale)
    }

    /// Widest page after rotation, in points.
    pub fn widest(&self, rotation_of: impl Fn(usize) -> u16) -> Option<f64> {
        (0..self.pages.len())
            .map(|i| self.size(i).rotated(rotation_of(i)).width)
            .reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a4() -> PageSize {
        PageSize::new(595.0, 842.0)
    }

    #[test]
    fn estimates_then_measurements() {
        let mut geometry = PageGeometry::new(a4());
        geometry.reset(3, &[PageSize::new(612.0, 792.0)]);

        assert_eq!(geometry.len(), 3);
        assert_eq!(geometry.size(0), PageSize::new(612.0, 792.0));
        assert_eq!(geometry.size(2), a4());
        assert_eq!(geometry.phase(1), Some(SizePhase::Estimated));

        let previous = geometry.set_measured(2, PageSize::new(300.0, 400.0)).unwrap();
        assert_eq!(previous, a4());
        assert_eq!(geometry.phase(1), Some(SizePhase::Measured));
        assert_eq!(geometry.measured_count(), 1);
    }

    #[test]
    fn measurement_out_of_range_is_rejected() {
        let mut geometry = PageGeometry::new(a4());
        geometry.reset(2, &[]);
        assert_eq!(
            geometry.set_measured(0, a4()),
            Err(ToolError::PageOutOfRange { page: 0, page_count: 2 })
        );
        assert!(geometry.set_measured(3, a4()).is_err());
    }

    #[test]
    fn layout_scales_and_rotates() {
        let mut geometry = PageGeometry::new(a4());
        geometry.reset(2, &[PageSize::new(100.0, 200.0), PageSize::new(150.0, 100.0)]);

        assert_eq!(geometry.laid_out(0, 0, 2.0), PageSize::new(200.0, 400.0));
        assert_eq!(geometry.laid_out(0, 90, 0.5), PageSize::new(100.0, 50.0));
        assert_eq!(geometry.widest(|_| 0), Some(150.0));
        assert_eq!(geometry.widest(|i| if i == 0 { 90 } else { 0 }), Some(200.0));
    }

    #[test]
    fn clear_drops_everything() {
        let mut geometry = PageGeometry::new(a4());
        geometry.reset(4, &[]);
        geometry.clear();
        assert!(geometry.is_empty());
        assert_eq!(geometry.widest(|_| 0), None);
        assert_eq!(geometry.phase(0), None);
    }
}
