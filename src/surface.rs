//! Boundary to the page-drawing surface.
//!
//! The layout engine never measures glyphs, wraps lines, or paints anything
//! on its own. Everything goes through [`PageSurface`], which models a
//! stateful page writer: it has a current page, a cursor, a current font and
//! a current cell padding, and every measurement depends on that state.

use crate::error::{Result, TableError};
use crate::style::{Border, FontSpec, Padding, TextAlign, Unit, VerticalAlign};
use crate::types::{Color, Length, Margins};
use std::sync::Arc;

/// A bordered, optionally filled, aligned text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub text: String,
    pub border: Border,
    pub border_width: Length,
    pub align: TextAlign,
    pub valign: VerticalAlign,
    /// Fill color when the cell asks for a painted background.
    pub fill: Option<Color>,
    pub fit_to_width: bool,
    /// Text below this height is clipped.
    pub max_height: Length,
}

/// A raster placed at a rectangle on the current page.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub dpi: u32,
    /// Content hash of the source plus pixel size.
    pub resource_id: String,
    pub raster: Arc<image::RgbaImage>,
}

/// The ambient surface state that measurement and drawing depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    pub font: FontSpec,
    pub cell_height_ratio: f32,
    pub cell_padding: Padding,
}

pub trait PageSurface {
    fn unit(&self) -> Unit;

    /// Points per user unit.
    fn scale_factor(&self) -> f32 {
        self.unit().points_per_unit()
    }

    fn page_width(&self) -> Length;
    fn page_height(&self, page: usize) -> Length;
    fn margins(&self) -> Margins;

    fn position(&self) -> (Length, Length);
    fn set_position(&mut self, x: Length, y: Length);

    /// Current page, 1-based. Zero means no page has been started.
    fn page(&self) -> usize;
    fn page_count(&self) -> usize;
    fn set_page(&mut self, page: usize);
    /// Appends a page, selects it and moves the cursor to the top-left margin.
    fn add_page(&mut self);

    fn font(&self) -> FontSpec;
    fn set_font(&mut self, font: &FontSpec);
    fn cell_height_ratio(&self) -> f32;
    fn set_cell_height_ratio(&mut self, ratio: f32);
    fn cell_padding(&self) -> Padding;
    fn set_cell_padding(&mut self, padding: Padding);

    /// Width of `text` in the current font.
    fn string_width(&self, text: &str) -> Length;

    /// Number of wrapped lines `text` occupies in a box of `width`, given the
    /// padding and border the box will be drawn with.
    fn string_lines(&self, text: &str, width: Length, padding: Padding, border: Border) -> usize;

    fn text_box(&mut self, text_box: &TextBox);
    fn image(&mut self, image: &PlacedImage);

    fn content_width(&self) -> Length {
        let margins = self.margins();
        self.page_width() - margins.left - margins.right
    }

    fn content_height(&self, page: usize) -> Length {
        let margins = self.margins();
        self.page_height(page) - margins.top - margins.bottom
    }

    /// Vertical space left on `page` below `y`.
    fn remaining_height(&self, page: usize, y: Length) -> Length {
        self.page_height(page) - self.margins().bottom - y
    }

    /// Font size of the current font in user units.
    fn font_size_user(&self) -> Length {
        Length::from_f32(self.font().size_pt / self.scale_factor())
    }

    fn capture_state(&self) -> SurfaceState {
        SurfaceState {
            font: self.font(),
            cell_height_ratio: self.cell_height_ratio(),
            cell_padding: self.cell_padding(),
        }
    }

    fn apply_state(&mut self, state: &SurfaceState) {
        self.set_font(&state.font);
        self.set_cell_height_ratio(state.cell_height_ratio);
        self.set_cell_padding(state.cell_padding);
    }
}

/// Saved surface states. Every measurement or draw that touches the font,
/// the padding, or the cell-height ratio runs between a save and a restore.
#[derive(Debug, Default)]
pub struct SurfaceStateStack {
    saved: Vec<SurfaceState>,
}

impl SurfaceStateStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save<S: PageSurface + ?Sized>(&mut self, surface: &S) {
        self.saved.push(surface.capture_state());
    }

    pub fn restore<S: PageSurface + ?Sized>(&mut self, surface: &mut S) -> Result<()> {
        let state = self.saved.pop().ok_or(TableError::StateNotSaved)?;
        surface.apply_state(&state);
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Runs `f` with the surface state saved beforehand and restored
    /// afterwards, also when `f` fails.
    pub fn scoped<S, T, F>(&mut self, surface: &mut S, f: F) -> Result<T>
    where
        S: PageSurface + ?Sized,
        F: FnOnce(&mut S) -> Result<T>,
    {
        self.save(surface);
        let out = f(surface);
        self.restore(surface)?;
        out
    }
}
