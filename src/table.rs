use crate::error::{Result, invalid};
use crate::style::{
    Border, FontSpec, FontWeight, Padding, TextAlign, VerticalAlign, parse_color,
};
use crate::surface::PageSurface;
use crate::types::{Color, Length};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

/// Called when the table starts a new page. It receives a scratch table
/// whose row list is empty; rows it appends are injected at the break (a
/// repeated header, for instance).
///
/// The callback may run more than once for the same break: once to measure
/// how much space the injected rows take, once to inject them. It must
/// produce the same rows every time and must not touch anything except the
/// table it is given.
pub type PageBreakCallback = Rc<dyn Fn(&mut Table)>;

/// Adjusts a cell background before it is drawn.
pub type BackgroundFormatter = Rc<dyn Fn(&mut BackgroundFormatterOptions)>;

pub const FONT_SIZE_DEFAULT_PT: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TableWidth {
    Absolute(Length),
    /// Percentage (0..=100) of the available content width.
    Percent(f32),
}

#[derive(Clone)]
pub struct Table {
    rows: Vec<Row>,
    font_family: String,
    font_size: f32,
    font_weight: FontWeight,
    border_width: Length,
    line_height: f32,
    padding: Option<Padding>,
    width: Option<TableWidth>,
    page_break: Option<PageBreakCallback>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            font_family: FontSpec::default().family,
            font_size: FONT_SIZE_DEFAULT_PT,
            font_weight: FontWeight::Normal,
            border_width: Length::from_f32(0.2),
            line_height: 1.0,
            padding: None,
            width: None,
            page_break: None,
        }
    }

    /// Takes the font defaults from the surface's current font.
    pub fn from_surface<S: PageSurface + ?Sized>(surface: &S) -> Self {
        let font = surface.font();
        Self {
            font_family: font.family,
            font_size: font.size_pt,
            font_weight: font.weight,
            ..Self::new()
        }
    }

    /// A table with the same defaults and no rows and no page-break callback.
    pub(crate) fn scratch(&self) -> Self {
        Self {
            rows: Vec::new(),
            page_break: None,
            ..self.clone()
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub fn set_rows(&mut self, rows: Vec<Row>) -> &mut Self {
        self.rows = rows;
        self
    }

    pub fn new_row(&mut self) -> &mut Row {
        self.rows.push(Row::new());
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    pub fn push_row(&mut self, row: Row) -> &mut Self {
        self.rows.push(row);
        self
    }

    pub(crate) fn take_rows(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.rows)
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) -> &mut Self {
        self.font_family = family.into();
        self
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Font size in points.
    pub fn set_font_size(&mut self, size_pt: f32) -> Result<&mut Self> {
        self.font_size = positive_number("font size", size_pt)?;
        Ok(self)
    }

    pub fn font_weight(&self) -> FontWeight {
        self.font_weight
    }

    pub fn set_font_weight(&mut self, weight: FontWeight) -> &mut Self {
        self.font_weight = weight;
        self
    }

    pub fn border_width(&self) -> Length {
        self.border_width
    }

    pub fn set_border_width(&mut self, width: f32) -> Result<&mut Self> {
        self.border_width = Length::from_f32(non_negative("border width", width)?);
        Ok(self)
    }

    /// Factor applied to the single-line height. 1.5 gives lines one and a
    /// half times as tall as the surface default.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn set_line_height(&mut self, factor: f32) -> Result<&mut Self> {
        self.line_height = positive_number("line height", factor)?;
        Ok(self)
    }

    pub fn padding(&self) -> Option<Padding> {
        self.padding
    }

    pub fn set_padding(&mut self, values: &[f32]) -> Result<&mut Self> {
        self.padding = Some(Padding::from_shorthand(values)?);
        Ok(self)
    }

    pub fn width(&self) -> Option<TableWidth> {
        self.width
    }

    pub fn set_width(&mut self, width: f32) -> Result<&mut Self> {
        let width = non_negative("table width", width)?;
        self.width = Some(TableWidth::Absolute(Length::from_f32(width)));
        Ok(self)
    }

    pub fn set_width_percent(&mut self, percent: f32) -> Result<&mut Self> {
        self.width = Some(TableWidth::Percent(non_negative("table width", percent)?));
        Ok(self)
    }

    pub fn clear_width(&mut self) -> &mut Self {
        self.width = None;
        self
    }

    /// Declared width resolved against the available content width.
    pub fn resolved_width(&self, available: Length) -> Option<Length> {
        match self.width? {
            TableWidth::Absolute(width) => Some(width),
            TableWidth::Percent(percent) => Some(available * (percent / 100.0)),
        }
    }

    pub fn page_break_callback(&self) -> Option<&PageBreakCallback> {
        self.page_break.as_ref()
    }

    pub fn set_page_break_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut Table) + 'static,
    {
        self.page_break = Some(Rc::new(callback));
        self
    }

    /// Lays the table out and draws it on `surface` with default options.
    pub fn draw<S: PageSurface + ?Sized>(&self, surface: &mut S) -> Result<crate::TableMetrics> {
        let options = crate::ConvertOptions::default();
        crate::TableConverter::new(surface, &options).convert(self)
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("rows", &self.rows)
            .field("font_family", &self.font_family)
            .field("font_size", &self.font_size)
            .field("font_weight", &self.font_weight)
            .field("border_width", &self.border_width)
            .field("line_height", &self.line_height)
            .field("padding", &self.padding)
            .field("width", &self.width)
            .field("page_break", &self.page_break.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn new_cell(&mut self, text: impl Into<String>) -> &mut Cell {
        self.cells.push(Cell::new(text));
        let last = self.cells.len() - 1;
        &mut self.cells[last]
    }

    pub fn push_cell(&mut self, cell: Cell) -> &mut Self {
        self.cells.push(cell);
        self
    }
}

/// Everything about a cell that measurement and drawing need, with the
/// table defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedCellStyle {
    pub font: FontSpec,
    pub line_height: f32,
    pub padding: Padding,
    pub border_width: Length,
}

#[derive(Clone)]
pub struct Cell {
    text: String,
    colspan: usize,
    rowspan: usize,
    width: Option<Length>,
    min_height: Option<Length>,
    line_height: Option<f32>,
    font_family: Option<String>,
    font_size: Option<f32>,
    font_weight: Option<FontWeight>,
    border: Border,
    border_width: Option<Length>,
    align: TextAlign,
    valign: VerticalAlign,
    fit_to_width: bool,
    fill: bool,
    padding: Option<Padding>,
    background: Background,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            colspan: 1,
            rowspan: 1,
            width: None,
            min_height: None,
            line_height: None,
            font_family: None,
            font_size: None,
            font_weight: None,
            border: Border::NONE,
            border_width: None,
            align: TextAlign::Left,
            valign: VerticalAlign::Top,
            fit_to_width: false,
            fill: false,
            padding: None,
            background: Background::default(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    pub fn colspan(&self) -> usize {
        self.colspan
    }

    pub fn set_colspan(&mut self, colspan: usize) -> Result<&mut Self> {
        if colspan < 1 {
            return Err(invalid("the colspan must not be lower than 1"));
        }
        self.colspan = colspan;
        Ok(self)
    }

    pub fn rowspan(&self) -> usize {
        self.rowspan
    }

    pub fn set_rowspan(&mut self, rowspan: usize) -> Result<&mut Self> {
        if rowspan < 1 {
            return Err(invalid("the rowspan must not be lower than 1"));
        }
        self.rowspan = rowspan;
        Ok(self)
    }

    pub fn width(&self) -> Option<Length> {
        self.width
    }

    pub fn set_width(&mut self, width: f32) -> Result<&mut Self> {
        self.width = Some(Length::from_f32(non_negative("cell width", width)?));
        Ok(self)
    }

    pub fn min_height(&self) -> Option<Length> {
        self.min_height
    }

    pub fn set_min_height(&mut self, height: f32) -> Result<&mut Self> {
        self.min_height = Some(Length::from_f32(non_negative("minimum height", height)?));
        Ok(self)
    }

    pub fn line_height(&self) -> Option<f32> {
        self.line_height
    }

    pub fn set_line_height(&mut self, factor: f32) -> Result<&mut Self> {
        self.line_height = Some(positive_number("line height", factor)?);
        Ok(self)
    }

    pub fn font_family(&self) -> Option<&str> {
        self.font_family.as_deref()
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) -> &mut Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn font_size(&self) -> Option<f32> {
        self.font_size
    }

    /// Font size in points.
    pub fn set_font_size(&mut self, size_pt: f32) -> Result<&mut Self> {
        self.font_size = Some(positive_number("font size", size_pt)?);
        Ok(self)
    }

    pub fn font_weight(&self) -> Option<FontWeight> {
        self.font_weight
    }

    pub fn set_font_weight(&mut self, weight: FontWeight) -> &mut Self {
        self.font_weight = Some(weight);
        self
    }

    pub fn border(&self) -> Border {
        self.border
    }

    pub fn set_border(&mut self, border: Border) -> &mut Self {
        self.border = border;
        self
    }

    pub fn border_width(&self) -> Option<Length> {
        self.border_width
    }

    pub fn set_border_width(&mut self, width: f32) -> Result<&mut Self> {
        self.border_width = Some(Length::from_f32(non_negative("border width", width)?));
        Ok(self)
    }

    pub fn align(&self) -> TextAlign {
        self.align
    }

    pub fn set_align(&mut self, align: TextAlign) -> &mut Self {
        self.align = align;
        self
    }

    pub fn valign(&self) -> VerticalAlign {
        self.valign
    }

    pub fn set_valign(&mut self, valign: VerticalAlign) -> &mut Self {
        self.valign = valign;
        self
    }

    pub fn fit_to_width(&self) -> bool {
        self.fit_to_width
    }

    pub fn set_fit_to_width(&mut self, fit: bool) -> &mut Self {
        self.fit_to_width = fit;
        self
    }

    pub fn fill(&self) -> bool {
        self.fill
    }

    pub fn set_fill(&mut self, fill: bool) -> &mut Self {
        self.fill = fill;
        self
    }

    pub fn padding(&self) -> Option<Padding> {
        self.padding
    }

    /// One to four values, expanded like the CSS `padding` shorthand.
    pub fn set_padding(&mut self, values: &[f32]) -> Result<&mut Self> {
        self.padding = Some(Padding::from_shorthand(values)?);
        Ok(self)
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn background_mut(&mut self) -> &mut Background {
        &mut self.background
    }

    pub(crate) fn resolve_style(&self, table: &Table, surface_padding: Padding) -> ResolvedCellStyle {
        ResolvedCellStyle {
            font: FontSpec {
                family: self
                    .font_family
                    .clone()
                    .unwrap_or_else(|| table.font_family.clone()),
                size_pt: self.font_size.unwrap_or(table.font_size),
                weight: self.font_weight.unwrap_or(table.font_weight),
            },
            line_height: self.line_height.unwrap_or(table.line_height),
            padding: self.padding.or(table.padding).unwrap_or(surface_padding),
            border_width: self.border_width.unwrap_or(table.border_width),
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("text", &self.text)
            .field("colspan", &self.colspan)
            .field("rowspan", &self.rowspan)
            .field("width", &self.width)
            .field("min_height", &self.min_height)
            .field("border", &self.border)
            .field("align", &self.align)
            .field("valign", &self.valign)
            .field("background", &self.background)
            .finish_non_exhaustive()
    }
}

/// Where a background image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
    /// `data:<mime>;base64,<payload>` or a plain `data:` URI.
    DataUri(String),
}

impl ImageSource {
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        ImageSource::Bytes(Arc::from(data.into()))
    }
}

#[derive(Clone, Default)]
pub struct Background {
    color: Option<Color>,
    image: Option<ImageSource>,
    dpi: Option<u32>,
    formatter: Option<BackgroundFormatter>,
}

impl Background {
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// `None` means transparent.
    pub fn set_color(&mut self, color: Option<Color>) -> &mut Self {
        self.color = color;
        self
    }

    /// CSS hex notation (`#ffffff`, `#fff`) or `transparent`.
    pub fn set_color_str(&mut self, raw: &str) -> Result<&mut Self> {
        self.color = parse_color(raw)?;
        Ok(self)
    }

    pub fn image(&self) -> Option<&ImageSource> {
        self.image.as_ref()
    }

    pub fn set_image(&mut self, image: ImageSource) -> &mut Self {
        self.image = Some(image);
        self
    }

    pub fn dpi(&self) -> Option<u32> {
        self.dpi
    }

    pub fn set_dpi(&mut self, dpi: u32) -> Result<&mut Self> {
        if dpi == 0 {
            return Err(invalid("background dpi must be greater than 0"));
        }
        self.dpi = Some(dpi);
        Ok(self)
    }

    pub fn formatter(&self) -> Option<&BackgroundFormatter> {
        self.formatter.as_ref()
    }

    pub fn set_formatter<F>(&mut self, formatter: F) -> &mut Self
    where
        F: Fn(&mut BackgroundFormatterOptions) + 'static,
    {
        self.formatter = Some(Rc::new(formatter));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.formatter.is_none()
    }
}

impl fmt::Debug for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Background")
            .field("color", &self.color)
            .field("image", &self.image.as_ref().map(|_| "..."))
            .field("dpi", &self.dpi)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

/// What a background formatter may change: the image itself, the size it
/// is drawn at, and the resolution it is resampled to.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundFormatterOptions {
    image: Option<ImageSource>,
    dpi: Option<u32>,
    max_width: Length,
    max_height: Length,
    width: Length,
    height: Length,
}

impl BackgroundFormatterOptions {
    pub fn new(image: Option<ImageSource>, max_width: Length, max_height: Length) -> Self {
        Self {
            image,
            dpi: None,
            max_width,
            max_height,
            width: max_width,
            height: max_height,
        }
    }

    pub fn image(&self) -> Option<&ImageSource> {
        self.image.as_ref()
    }

    pub fn set_image(&mut self, image: Option<ImageSource>) -> &mut Self {
        self.image = image;
        self
    }

    pub fn max_width(&self) -> Length {
        self.max_width
    }

    pub fn max_height(&self) -> Length {
        self.max_height
    }

    pub fn width(&self) -> Length {
        self.width
    }

    pub fn set_width(&mut self, width: Length) -> &mut Self {
        self.width = width.max(Length::ZERO);
        self
    }

    pub fn height(&self) -> Length {
        self.height
    }

    pub fn set_height(&mut self, height: Length) -> &mut Self {
        self.height = height.max(Length::ZERO);
        self
    }

    pub fn dpi(&self) -> Option<u32> {
        self.dpi
    }

    pub fn set_dpi(&mut self, dpi: Option<u32>) -> &mut Self {
        self.dpi = dpi.filter(|v| *v > 0);
        self
    }
}

fn positive_number(what: &str, value: f32) -> Result<f32> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(format!("the {what} must be a positive number (got {value})")));
    }
    Ok(value)
}

fn non_negative(what: &str, value: f32) -> Result<f32> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!(
            "the {what} must be a non-negative number (got {value})"
        )));
    }
    Ok(value)
}
