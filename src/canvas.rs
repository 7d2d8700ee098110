use crate::style::{Border, FontSpec, FontWeight, Padding, Unit};
use crate::surface::{PageSurface, PlacedImage, TextBox};
use crate::types::{Length, Margins, Size};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    DrawTextBox {
        font: FontSpec,
        padding: Padding,
        cell_height_ratio: f32,
        text_box: TextBox,
    },
    DrawImage {
        x: Length,
        y: Length,
        width: Length,
        height: Length,
        dpi: u32,
        resource_id: String,
        pixel_width: u32,
        pixel_height: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub size: Size,
    pub commands: Vec<Command>,
}

impl Page {
    fn new(size: Size) -> Self {
        Self {
            size,
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub unit: Unit,
    pub pages: Vec<Page>,
}

/// In-memory page surface that records draw commands per page.
///
/// Text metrics approximate a Helvetica-like proportional face, which is
/// enough to drive layout deterministically without loading font files.
#[derive(Debug, Clone)]
pub struct Canvas {
    page_size: Size,
    unit: Unit,
    margins: Margins,
    pages: Vec<Page>,
    current: usize,
    x: Length,
    y: Length,
    font: FontSpec,
    cell_height_ratio: f32,
    cell_padding: Padding,
}

pub const DEFAULT_CELL_HEIGHT_RATIO: f32 = 1.25;

impl Canvas {
    /// Creates a surface with its first page already started.
    pub fn new(page_size: Size, unit: Unit, margins: Margins) -> Self {
        let mut canvas = Self {
            page_size,
            unit,
            margins,
            pages: Vec::new(),
            current: 0,
            x: margins.left,
            y: margins.top,
            font: FontSpec::default(),
            cell_height_ratio: DEFAULT_CELL_HEIGHT_RATIO,
            cell_padding: Padding::zero(),
        };
        canvas.add_page();
        canvas
    }

    pub fn a4_mm() -> Self {
        Self::new(Size::a4_mm(), Unit::Mm, Margins::all(10.0))
    }

    /// Appends a page with its own size without selecting it.
    pub fn push_page_with_size(&mut self, size: Size) {
        self.pages.push(Page::new(size));
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn commands_on(&self, page: usize) -> &[Command] {
        page.checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .map(|p| p.commands.as_slice())
            .unwrap_or(&[])
    }

    pub fn command_count(&self) -> usize {
        self.pages.iter().map(|p| p.commands.len()).sum()
    }

    pub fn finish(self) -> Document {
        Document {
            unit: self.unit,
            pages: self.pages,
        }
    }

    fn current_page_mut(&mut self) -> Option<&mut Page> {
        self.current
            .checked_sub(1)
            .and_then(|idx| self.pages.get_mut(idx))
    }

    fn advance_em(ch: char, weight: FontWeight) -> f32 {
        let base = match ch {
            ' ' => return 0.278,
            'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.278,
            'f' | 't' | 'r' | '(' | ')' | '-' => 0.333,
            'm' | 'w' | 'M' | 'W' | '@' => 0.833,
            'A'..='Z' => 0.667,
            _ => 0.556,
        };
        match weight {
            FontWeight::Normal => base,
            FontWeight::Bold => base + 0.055,
        }
    }

    fn measure(&self, text: &str) -> f32 {
        let em: f32 = text
            .chars()
            .map(|ch| Self::advance_em(ch, self.font.weight))
            .sum();
        em * self.font.size_pt / self.unit.points_per_unit()
    }

    /// Greedy word wrap. Words wider than the line are broken per character.
    fn wrap_count(&self, text: &str, max_width: f32) -> usize {
        if max_width <= 0.0 {
            return text.chars().count().max(1);
        }
        // lengths are milli-precise, compare with the same slack
        let max_width = max_width + 0.001;
        let space = self.measure(" ");
        let mut lines = 0usize;
        for paragraph in text.split('\n') {
            let mut line_width = 0.0f32;
            let mut line_used = false;
            lines += 1;
            for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
                let word_width = self.measure(word);
                let needed = if line_used {
                    line_width + space + word_width
                } else {
                    word_width
                };
                if needed <= max_width {
                    line_width = needed;
                    line_used = true;
                    continue;
                }
                if line_used {
                    lines += 1;
                }
                if word_width <= max_width {
                    line_width = word_width;
                    line_used = true;
                    continue;
                }
                line_width = 0.0;
                line_used = false;
                for ch in word.chars() {
                    let w = self.measure(&ch.to_string());
                    if line_used && line_width + w > max_width {
                        lines += 1;
                        line_width = 0.0;
                    }
                    line_width += w;
                    line_used = true;
                }
            }
        }
        lines.max(1)
    }
}

impl PageSurface for Canvas {
    fn unit(&self) -> Unit {
        self.unit
    }

    fn page_width(&self) -> Length {
        self.page_size.width
    }

    fn page_height(&self, page: usize) -> Length {
        page.checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .map(|p| p.size.height)
            .unwrap_or(self.page_size.height)
    }

    fn margins(&self) -> Margins {
        self.margins
    }

    fn position(&self) -> (Length, Length) {
        (self.x, self.y)
    }

    fn set_position(&mut self, x: Length, y: Length) {
        self.x = x;
        self.y = y;
    }

    fn page(&self) -> usize {
        self.current
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn set_page(&mut self, page: usize) {
        if page >= 1 && page <= self.pages.len() {
            self.current = page;
        }
    }

    fn add_page(&mut self) {
        self.pages.push(Page::new(self.page_size));
        self.current = self.pages.len();
        self.x = self.margins.left;
        self.y = self.margins.top;
    }

    fn font(&self) -> FontSpec {
        self.font.clone()
    }

    fn set_font(&mut self, font: &FontSpec) {
        if &self.font != font {
            self.font = font.clone();
        }
    }

    fn cell_height_ratio(&self) -> f32 {
        self.cell_height_ratio
    }

    fn set_cell_height_ratio(&mut self, ratio: f32) {
        self.cell_height_ratio = ratio;
    }

    fn cell_padding(&self) -> Padding {
        self.cell_padding
    }

    fn set_cell_padding(&mut self, padding: Padding) {
        self.cell_padding = padding;
    }

    fn string_width(&self, text: &str) -> Length {
        Length::from_f32(self.measure(text))
    }

    fn string_lines(&self, text: &str, width: Length, padding: Padding, _border: Border) -> usize {
        let avail = (width - padding.horizontal()).to_f32();
        self.wrap_count(text, avail)
    }

    fn text_box(&mut self, text_box: &TextBox) {
        let command = Command::DrawTextBox {
            font: self.font.clone(),
            padding: self.cell_padding,
            cell_height_ratio: self.cell_height_ratio,
            text_box: text_box.clone(),
        };
        if let Some(page) = self.current_page_mut() {
            page.commands.push(command);
        }
        self.x = text_box.x + text_box.width;
        self.y = text_box.y;
    }

    fn image(&mut self, image: &PlacedImage) {
        let command = Command::DrawImage {
            x: image.x,
            y: image.y,
            width: image.width,
            height: image.height,
            dpi: image.dpi,
            resource_id: image.resource_id.clone(),
            pixel_width: image.raster.width(),
            pixel_height: image.raster.height(),
        };
        if let Some(page) = self.current_page_mut() {
            page.commands.push(command);
        }
    }
}
