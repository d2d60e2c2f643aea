//! Virtualized vertical list.
//!
//! Only the items intersecting the viewport, plus `overscan` items on either
//! side, are mounted. Item sizes come from the caller and may change at any
//! time (an estimated page height replaced by its measured one, a zoom
//! change); offsets are prefix sums recomputed from the first changed item.
//!
//! Scroll anchoring: whenever sizes change, the first visible item keeps its
//! position relative to the top of the viewport, so content above it growing
//! or shrinking never makes the page being read jump.

use std::ops::Range;

use serde::Serialize;

use crate::schema::ToolError;

/// A validated item count.
///
/// Counts arrive from the renderer as JavaScript numbers; negative, fractional
/// or non-finite values never produce a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageCount(usize);

impl PageCount {
    pub fn new(raw: f64) -> Result<Self, ToolError> {
        if raw.is_finite() && raw >= 0.0 && raw.fract() == 0.0 && raw <= u32::MAX as f64 {
            Ok(Self(raw as usize))
        } else {
            Err(ToolError::InvalidPageCount(raw))
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl From<usize> for PageCount {
    fn from(count: usize) -> Self {
        Self(count)
    }
}

/// An item the view must render, absolutely positioned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MountedItem {
    pub index: usize,
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualList {
    sizes: Vec<f64>,
    /// `offsets[i]` is the top of item `i`; `offsets[len]` the total size.
    offsets: Vec<f64>,
    viewport_width: f64,
    viewport_height: f64,
    scroll_top: f64,
    overscan: usize,
}

impl VirtualList {
    pub fn new(count: PageCount, overscan: usize, size_of: impl Fn(usize) -> f64) -> Self {
        let sizes: Vec<f64> = (0..count.get()).map(|i| sanitize(size_of(i))).collect();
        let mut list = Self {
            offsets: vec![0.0; sizes.len() + 1],
            sizes,
            viewport_width: 0.0,
            viewport_height: 0.0,
            scroll_top: 0.0,
            overscan,
        };
        list.recompute_from(0);
        list
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn viewport(&self) -> (f64, f64) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn total_size(&self) -> f64 {
        self.offsets[self.sizes.len()]
    }

    pub fn item_offset(&self, index: usize) -> Option<f64> {
        (index < self.sizes.len()).then(|| self.offsets[index])
    }

    pub fn item_size(&self, index: usize) -> Option<f64> {
        self.sizes.get(index).copied()
    }

    /// Item covering `offset`, clamped to the last item past the end.
    pub fn item_at(&self, offset: f64) -> Option<usize> {
        if self.sizes.is_empty() {
            return None;
        }
        let after = self.offsets[1..].partition_point(|end| *end <= offset);
        Some(after.min(self.sizes.len() - 1))
    }

    /// Resizing keeps the scroll offset, clamped to the new maximum.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width.max(0.0);
        self.viewport_height = height.max(0.0);
        self.scroll_top = self.clamp_scroll(self.scroll_top);
    }

    pub fn scroll_to(&mut self, offset: f64) {
        self.scroll_top = self.clamp_scroll(offset);
    }

    /// Aligns the top of `index` with the top of the viewport.
    pub fn scroll_to_item(&mut self, index: usize) {
        if let Some(offset) = self.item_offset(index) {
            self.scroll_to(offset);
        }
    }

    /// Changes one item's size. Returns the scroll offset adjustment applied
    /// to keep the visible content in place.
    pub fn set_item_size(&mut self, index: usize, size: f64) -> f64 {
        let size = sanitize(size);
        if self.sizes.get(index).is_none_or(|&current| current == size) {
            return 0.0;
        }
        let anchor = self.anchor();
        self.sizes[index] = size;
        self.recompute_from(index);
        self.restore(anchor, 1.0)
    }

    /// Replaces every size at once. Returns the scroll offset adjustment.
    pub fn set_sizes(&mut self, size_of: impl Fn(usize) -> f64) -> f64 {
        let anchor = self.anchor();
        for (i, slot) in self.sizes.iter_mut().enumerate() {
            *slot = sanitize(size_of(i));
        }
        self.recompute_from(0);
        self.restore(anchor, 1.0)
    }

    /// Scales every size by `ratio` (a zoom change). The scroll offset scales
    /// with it, so the same part of the same page stays at the top.
    pub fn rescale(&mut self, ratio: f64) -> f64 {
        if !(ratio.is_finite() && ratio > 0.0) || ratio == 1.0 {
            return 0.0;
        }
        let anchor = self.anchor();
        for slot in &mut self.sizes {
            *slot *= ratio;
        }
        self.recompute_from(0);
        self.restore(anchor, ratio)
    }

    /// Items intersecting `[scroll_top, scroll_top + viewport_height)`. The
    /// item at the scroll offset is always included.
    pub fn visible_range(&self) -> Range<usize> {
        let Some(start) = self.item_at(self.scroll_top) else {
            return 0..0;
        };
        let bottom = self.scroll_top + self.viewport_height;
        let stop = self.offsets[..self.sizes.len()].partition_point(|top| *top < bottom);
        start..stop.max(start + 1)
    }

    /// Visible items widened by the overscan, clamped to the list.
    pub fn mounted_range(&self) -> Range<usize> {
        let visible = self.visible_range();
        if visible.is_empty() {
            return visible;
        }
        let start = visible.start.saturating_sub(self.overscan);
        let end = (visible.end + self.overscan).min(self.sizes.len());
        start..end
    }

    pub fn mounted(&self) -> Vec<MountedItem> {
        self.mounted_range()
            .map(|index| MountedItem {
                index,
                top: self.offsets[index],
                height: self.sizes[index],
            })
            .collect()
    }

    fn recompute_from(&mut self, index: usize) {
        for i in index..self.sizes.len() {
            self.offsets[i + 1] = self.offsets[i] + self.sizes[i];
        }
    }

    fn max_scroll(&self) -> f64 {
        (self.total_size() - self.viewport_height).max(0.0)
    }

    fn clamp_scroll(&self, offset: f64) -> f64 {
        if offset.is_finite() {
            offset.clamp(0.0, self.max_scroll())
        } else {
            0.0
        }
    }

    /// First visible item and how far into it the viewport starts.
    fn anchor(&self) -> Option<(usize, f64)> {
        let index = self.item_at(self.scroll_top)?;
        Some((index, self.scroll_top - self.offsets[index]))
    }

    fn restore(&mut self, anchor: Option<(usize, f64)>, ratio: f64) -> f64 {
        let Some((index, into)) = anchor else {
            return 0.0;
        };
        let before = self.scroll_top;
        let into = (into * ratio).min(self.sizes[index]).max(0.0);
        self.scroll_top = self.clamp_scroll(self.offsets[index] + into);
        self.scroll_top - before
    }
}

fn sanitize(size: f64) -> f64 {
    if size.is_finite() && size > 0.0 { size } else { 0.0 }
}
