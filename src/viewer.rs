//! The PDF viewer screen: page cursor, per-page rotations, thumbnail rail and
//! the wiring between zoom, container size, page geometry and the
//! virtualized page list.

use serde::Serialize;

use crate::geometry::{PageGeometry, SizePhase};
use crate::resize::ResizeController;
use crate::schema::{PageSize, ToolError, ToolboxOptions};
use crate::virtual_list::{PageCount, VirtualList};
use crate::zoom::{ZoomController, effective_scale};

/// A page the view must render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page_number: u32,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: u16,
    pub scale: f64,
    /// False while the height is still an estimate.
    pub measured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    pub page_number: u32,
    pub rotation: u16,
    pub current: bool,
    pub scale: f64,
    pub width: f64,
    pub height: f64,
}

/// Everything the browser needs to draw the viewer in one go.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerState {
    pub page_count: u32,
    pub current_page: u32,
    pub page_label: String,
    pub zoom: f64,
    pub scale: f64,
    pub can_zoom_in: bool,
    pub can_zoom_out: bool,
    pub scroll_top: f64,
    pub total_height: f64,
    pub measured_pages: usize,
    pub pages: Vec<PageView>,
}

#[derive(Debug, Clone)]
pub struct Viewer {
    zoom: ZoomController,
    resize: ResizeController,
    geometry: PageGeometry,
    rotations: Vec<u16>,
    list: VirtualList,
    /// Scale the list's item sizes were computed at.
    applied_scale: f64,
    current_page: u32,
    overscan: usize,
    thumbnail_scale: f64,
}

impl Viewer {
    pub fn new(options: &ToolboxOptions) -> Self {
        Self {
            zoom: ZoomController::from_options(options),
            resize: ResizeController::new(options.horizontal_padding),
            geometry: PageGeometry::new(options.default_page_size()),
            rotations: Vec::new(),
            list: VirtualList::new(PageCount::default(), options.overscan, |_| 0.0),
            applied_scale: 1.0,
            current_page: 0,
            overscan: options.overscan,
            thumbnail_scale: options.thumbnail_scale,
        }
    }

    /// The renderer finished loading a document of `raw_count` pages.
    pub fn on_document_load(
        &mut self,
        raw_count: f64,
        estimates: &[PageSize],
    ) -> Result<(), ToolError> {
        let count = match PageCount::new(raw_count) {
            Ok(count) => count,
            Err(e) => {
                log::warn!("{e}");
                self.clear();
                return Err(e);
            }
        };
        log::debug!("document loaded with {} pages", count.get());

        self.geometry.reset(count.get(), estimates);
        self.rotations = vec![0; count.get()];
        self.refresh_widest();
        self.applied_scale = self.scale();

        let (width, height) = self.list.viewport();
        let scale = self.applied_scale;
        let geometry = &self.geometry;
        self.list = VirtualList::new(count, self.overscan, |i| {
            geometry.laid_out(i, 0, scale).height
        });
        self.list.set_viewport(width, height);
        self.current_page = if count.get() > 0 { 1 } else { 0 };
        Ok(())
    }

    /// Drops the document; zoom and container size survive.
    pub fn clear(&mut self) {
        let (width, height) = self.list.viewport();
        self.geometry.clear();
        self.rotations.clear();
        self.resize.clear_document();
        self.list = VirtualList::new(PageCount::default(), self.overscan, |_| 0.0);
        self.list.set_viewport(width, height);
        self.applied_scale = self.scale();
        self.current_page = 0;
    }

    pub fn page_count(&self) -> u32 {
        self.rotations.len() as u32
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_label(&self) -> String {
        format!("{} / {}", self.current_page, self.page_count())
    }

    pub fn scale(&self) -> f64 {
        effective_scale(self.resize.base_scale(), self.zoom.zoom())
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.zoom()
    }

    /// Moves the cursor to `page` (clamped) and scrolls it to the top.
    pub fn goto_page(&mut self, page: u32) -> u32 {
        let total = self.page_count();
        if total == 0 {
            return 0;
        }
        self.current_page = page.clamp(1, total);
        self.list.scroll_to_item(self.current_page as usize - 1);
        self.current_page
    }

    pub fn next_page(&mut self) -> u32 {
        self.goto_page(self.current_page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> u32 {
        self.goto_page(self.current_page.saturating_sub(1))
    }

    /// The user scrolled the page column.
    pub fn on_scroll(&mut self, offset: f64) {
        self.list.scroll_to(offset);
        self.sync_cursor();
    }

    pub fn rotation(&self, page: u32) -> Option<u16> {
        page.checked_sub(1)
            .and_then(|i| self.rotations.get(i as usize))
            .copied()
    }

    /// Turns one page a quarter clockwise. Returns its new angle.
    pub fn rotate_page(&mut self, page: u32) -> Result<u16, ToolError> {
        let index = self.index_of(page)?;
        let angle = (self.rotations[index] + 90) % 360;
        self.rotations[index] = angle;
        let height = self.geometry.laid_out(index, angle, self.applied_scale).height;
        self.list.set_item_size(index, height);
        self.refresh_widest();
        self.apply_scale();
        Ok(angle)
    }

    /// Size of `page` as measured by the renderer, in points at scale 1.
    pub fn set_page_size(&mut self, page: u32, width: f64, height: f64) -> Result<(), ToolError> {
        let index = self.index_of(page)?;
        self.geometry.set_measured(page, PageSize::new(width, height))?;
        let laid_out = self
            .geometry
            .laid_out(index, self.rotations[index], self.applied_scale)
            .height;
        self.list.set_item_size(index, laid_out);
        self.refresh_widest();
        self.apply_scale();
        self.sync_cursor();
        Ok(())
    }

    pub fn zoom_in(&mut self) -> bool {
        let changed = self.zoom.zoom_in();
        self.apply_scale();
        changed
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.zoom.zoom_out();
        self.apply_scale();
        changed
    }

    pub fn reset_zoom(&mut self) -> bool {
        let changed = self.zoom.reset();
        self.apply_scale();
        changed
    }

    /// Container size changed.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.resize.resize(width, height);
        let (width, height) = self.resize.viewport();
        self.list.set_viewport(width, height);
        self.apply_scale();
        self.sync_cursor();
    }

    pub fn thumbnails(&self) -> Vec<Thumbnail> {
        self.rotations
            .iter()
            .enumerate()
            .map(|(i, rotation)| {
                let size = self.geometry.laid_out(i, *rotation, self.thumbnail_scale);
                let page_number = i as u32 + 1;
                Thumbnail {
                    page_number,
                    rotation: *rotation,
                    current: page_number == self.current_page,
                    scale: self.thumbnail_scale,
                    width: size.width,
                    height: size.height,
                }
            })
            .collect()
    }

    pub fn mounted_pages(&self) -> Vec<PageView> {
        self.list
            .mounted()
            .into_iter()
            .map(|item| {
                let rotation = self.rotations[item.index];
                PageView {
                    page_number: item.index as u32 + 1,
                    top: item.top,
                    width: self.geometry.laid_out(item.index, rotation, self.applied_scale).width,
                    height: item.height,
                    rotation,
                    scale: self.applied_scale,
                    measured: self.geometry.phase(item.index) == Some(SizePhase::Measured),
                }
            })
            .collect()
    }

    pub fn state(&self) -> ViewerState {
        ViewerState {
            page_count: self.page_count(),
            current_page: self.current_page,
            page_label: self.page_label(),
            zoom: self.zoom.zoom(),
            scale: self.applied_scale,
            can_zoom_in: self.zoom.can_zoom_in(),
            can_zoom_out: self.zoom.can_zoom_out(),
            scroll_top: self.list.scroll_top(),
            total_height: self.list.total_size(),
            measured_pages: self.geometry.measured_count(),
            pages: self.mounted_pages(),
        }
    }

    fn index_of(&self, page: u32) -> Result<usize, ToolError> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(ToolError::PageOutOfRange { page, page_count });
        }
        Ok(page as usize - 1)
    }

    fn refresh_widest(&mut self) {
        let rotations = &self.rotations;
        let widest = self
            .geometry
            .widest(|i| rotations.get(i).copied().unwrap_or(0))
            .unwrap_or(0.0);
        self.resize.set_widest_page(widest);
    }

    fn apply_scale(&mut self) {
        let scale = self.scale();
        if scale != self.applied_scale && self.applied_scale > 0.0 {
            self.list.rescale(scale / self.applied_scale);
            self.sync_cursor();
        }
        self.applied_scale = scale;
    }

    fn sync_cursor(&mut self) {
        if let Some(index) = self.list.item_at(self.list.scroll_top()) {
            self.current_page = index as u32 + 1;
        }
    }
}
