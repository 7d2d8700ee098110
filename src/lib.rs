mod background;
mod canvas;
mod config;
mod debug;
mod error;
mod grid;
mod height;
mod metrics;
mod paginator;
mod style;
mod surface;
mod table;
mod types;
mod width;

pub use canvas::{Canvas, Command, DEFAULT_CELL_HEIGHT_RATIO, Document, Page};
pub use config::{ConvertOptions, ConvertOptionsBuilder, DEFAULT_DPI, ResampleFilter};
pub use error::{Result, TableError};
pub use grid::{CellSegment, CellSlot, GridRow, RowspanInfo, SpanSource, TableGrid};
pub use metrics::TableMetrics;
pub use paginator::TableConverter;
pub use style::{Border, FontSpec, FontWeight, Padding, TextAlign, Unit, VerticalAlign, parse_color};
pub use surface::{PageSurface, PlacedImage, SurfaceState, SurfaceStateStack, TextBox};
pub use table::{
    Background, BackgroundFormatter, BackgroundFormatterOptions, Cell, FONT_SIZE_DEFAULT_PT,
    ImageSource, PageBreakCallback, Row, Table, TableWidth,
};
pub use types::{Color, Length, Margins, Rect, Size};

#[cfg(test)]
mod tests {
    use super::*;

    fn measure(table: &Table, canvas: &mut Canvas) -> TableGrid {
        let options = ConvertOptions::default();
        TableConverter::new(canvas, &options).measure(table).unwrap()
    }

    #[test]
    fn measured_widths_are_rescaled_proportionally() {
        let mut table = Table::new();
        let row = table.new_row();
        for text in ["short", "a somewhat longer text", "the longest text of the three cells"] {
            row.new_cell(text).set_font_size(30.0).unwrap();
        }
        let mut canvas = Canvas::a4_mm();
        let raw: Vec<Length> = ["short", "a somewhat longer text", "the longest text of the three cells"]
            .iter()
            .map(|text| {
                canvas.set_font(&FontSpec::new("helvetica", 30.0, FontWeight::Normal));
                canvas.string_width(text)
            })
            .collect();
        canvas.set_font(&FontSpec::default());
        let raw_total: Length = raw.iter().sum();
        assert!(raw_total > canvas.content_width());

        let grid = measure(&table, &mut canvas);
        let widths = grid.column_widths();
        let total: Length = widths.iter().sum();
        assert!(total.approx_eq(canvas.content_width(), 3));
        for (new, old) in widths.iter().zip(&raw) {
            let ratio_new = new.to_f32() / widths[0].to_f32();
            let ratio_old = old.to_f32() / raw[0].to_f32();
            assert!((ratio_new - ratio_old).abs() < 1e-3);
        }
    }

    #[test]
    fn rowspan_rows_cover_the_cell() {
        let mut table = Table::new();
        let row = table.new_row();
        row.new_cell("a cell spanning three rows with plenty of text in it")
            .set_rowspan(3)
            .unwrap()
            .set_width(20.0)
            .unwrap();
        row.new_cell("x");
        table.new_row().new_cell("y");
        table.new_row().new_cell("z").set_min_height(30.0).unwrap();
        let mut canvas = Canvas::a4_mm();
        let grid = measure(&table, &mut canvas);
        let info = &grid.rows()[0].spans[&0];
        let covered: Length = grid.row_heights()[0..3].iter().sum();
        assert!(covered >= info.own_height);
        assert_eq!(info.total_height, covered);
    }

    #[test]
    fn percentage_width_fills_its_share() {
        let mut table = Table::new();
        table.set_width_percent(50.0).unwrap();
        let row = table.new_row();
        row.new_cell("one");
        row.new_cell("two");
        let mut canvas = Canvas::a4_mm();
        let grid = measure(&table, &mut canvas);
        let total: Length = grid.column_widths().iter().sum();
        assert!(total.approx_eq(Length::from_f32(95.0), 2));
    }

    #[test]
    fn table_draws_across_pages_on_the_reference_canvas() {
        let mut canvas = Canvas::a4_mm();
        let mut table = Table::from_surface(&canvas);
        table.set_padding(&[1.0, 2.0]).unwrap();
        table.set_page_break_callback(|t| {
            let row = t.new_row();
            row.new_cell("Name").set_border(Border::FRAME);
            row.new_cell("Amount").set_border(Border::FRAME);
        });
        for i in 0..120 {
            let row = table.new_row();
            row.new_cell(format!("item {i}")).set_border(Border::FRAME);
            row.new_cell(format!("{}", i * 3)).set_border(Border::FRAME);
        }
        let metrics = table.draw(&mut canvas).unwrap();
        assert!(metrics.page_breaks >= 1);
        assert_eq!(metrics.rows_drawn, 120 + metrics.injected_rows);
        assert_eq!(metrics.pages_touched(), canvas.page_count());
        let document = canvas.finish();
        assert_eq!(document.pages.len(), metrics.page_breaks + 1);
    }
}
