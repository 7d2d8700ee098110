//! Draws a measured table row by row, breaking pages as the cursor runs out
//! of room.
//!
//! Before a row is drawn two things can happen. If the row does not fit
//! below the cursor, a new page is started and the table's page-break
//! callback may inject rows (a repeated header) at the current index; the
//! loop then looks at the same index again. Then any rowspan starting in
//! this row that runs past the end of the page is cut into per-page pieces;
//! later pieces repeat the cell's frame without its text.

use crate::background::BackgroundCompositor;
use crate::config::ConvertOptions;
use crate::debug::{DebugLogger, JsonValue};
use crate::error::Result;
use crate::grid::{CellSegment, GridRow, SpanSource, TableGrid, measure};
use crate::metrics::TableMetrics;
use crate::surface::{PageSurface, SurfaceStateStack, TextBox};
use crate::table::{Cell, Row, Table};
use crate::types::{Length, Rect};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOrigin {
    /// Index into the table's own rows.
    Source(usize),
    Injected,
}

/// Rows injected at a page break, already measured.
struct Injection {
    rows: Vec<Row>,
    grid: TableGrid,
}

pub struct TableConverter<'s, S: PageSurface + ?Sized> {
    surface: &'s mut S,
    options: ConvertOptions,
    states: SurfaceStateStack,
    backgrounds: BackgroundCompositor,
    debug: Option<DebugLogger>,
    metrics: TableMetrics,
    grid: Option<TableGrid>,
}

impl<'s, S: PageSurface + ?Sized> TableConverter<'s, S> {
    pub fn new(surface: &'s mut S, options: &ConvertOptions) -> Self {
        Self {
            surface,
            options: options.clone(),
            states: SurfaceStateStack::new(),
            backgrounds: BackgroundCompositor::new(options),
            debug: None,
            metrics: TableMetrics::default(),
            grid: None,
        }
    }

    /// Grid of the last conversion, including injected rows and split
    /// rowspans.
    pub fn grid(&self) -> Option<&TableGrid> {
        self.grid.as_ref()
    }

    /// Resolves column widths and row heights without drawing anything.
    pub fn measure(&mut self, table: &Table) -> Result<TableGrid> {
        let verbose = self.options.table_debug();
        measure(table, table.rows(), &mut *self.surface, &mut self.states, verbose)
    }

    pub fn convert(&mut self, table: &Table) -> Result<TableMetrics> {
        self.metrics = TableMetrics::default();
        self.debug = match self.options.debug_path() {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        let result = self.run(table);
        if let Some(logger) = self.debug.take() {
            logger.increment("rows_drawn", self.metrics.rows_drawn as u64);
            logger.increment("cells_drawn", self.metrics.cells_drawn as u64);
            logger.emit_summary("table");
            logger.flush();
        }
        result?;
        Ok(self.metrics.clone())
    }

    fn run(&mut self, table: &Table) -> Result<()> {
        let mut rows: Vec<Row> = table.rows().to_vec();
        let mut origins: Vec<RowOrigin> = (0..rows.len()).map(RowOrigin::Source).collect();
        let mut broken = vec![false; rows.len()];
        let mut grid = self.measure(table)?;
        log::debug!(
            "table measured: rows={} columns={} height={:.3}",
            grid.len(),
            grid.column_widths().len(),
            grid.total_height().to_f32()
        );
        self.event(
            "table.measure",
            &[
                ("rows", JsonValue::Int(grid.len() as i64)),
                ("columns", JsonValue::Int(grid.column_widths().len() as i64)),
                ("height", JsonValue::Num(grid.total_height().to_f32())),
            ],
        );

        let (x0, _) = self.surface.position();
        let mut r = 0;
        while r < rows.len() {
            let remaining = self.remaining();
            let height = grid.rows()[r].height;
            if let RowOrigin::Source(source) = origins[r] {
                if height >= remaining && !broken[source] {
                    broken[source] = true;
                    self.break_page(x0, r, height, remaining);
                    if let Some(injection) = self.injected_rows(table)? {
                        let count = injection.rows.len();
                        self.metrics.injected_rows += count;
                        log::debug!(
                            "table inject: row={} count={} height={:.3}",
                            r,
                            count,
                            injection.grid.total_height().to_f32()
                        );
                        self.event(
                            "table.inject",
                            &[
                                ("row", JsonValue::Int(r as i64)),
                                ("count", JsonValue::Int(count as i64)),
                                ("height", JsonValue::Num(injection.grid.total_height().to_f32())),
                            ],
                        );
                        rows.splice(r..r, injection.rows);
                        origins.splice(r..r, std::iter::repeat_n(RowOrigin::Injected, count));
                        grid.splice(r, injection.grid);
                    }
                    continue;
                }
            }

            if height > remaining {
                log::warn!(
                    "table row {} overflows page {}: height={:.3} remaining={:.3}",
                    r,
                    self.surface.page(),
                    height.to_f32(),
                    remaining.to_f32()
                );
            }
            self.split_rowspans(table, &rows[r], &mut grid, r, remaining)?;
            self.draw_row(table, &rows[r], &grid.rows()[r], x0)?;
            r += 1;
        }

        self.grid = Some(grid);
        Ok(())
    }

    fn remaining(&self) -> Length {
        let (_, y) = self.surface.position();
        self.surface.remaining_height(self.surface.page(), y)
    }

    /// Moves to the next page, reusing one that already exists.
    fn break_page(&mut self, x0: Length, row: usize, height: Length, remaining: Length) {
        let from = self.surface.page();
        let appended = from >= self.surface.page_count();
        if appended {
            self.surface.add_page();
        } else {
            self.surface.set_page(from + 1);
        }
        let top = self.surface.margins().top;
        self.surface.set_position(x0, top);
        self.metrics.page_breaks += 1;
        log::debug!(
            "table page break: row={} height={:.3} remaining={:.3} page {} -> {}",
            row,
            height.to_f32(),
            remaining.to_f32(),
            from,
            self.surface.page()
        );
        self.event(
            "table.page_break",
            &[
                ("row", JsonValue::Int(row as i64)),
                ("from_page", JsonValue::Int(from as i64)),
                ("to_page", JsonValue::Int(self.surface.page() as i64)),
                ("row_height", JsonValue::Num(height.to_f32())),
                ("remaining", JsonValue::Num(remaining.to_f32())),
                ("appended", JsonValue::Bool(appended)),
            ],
        );
    }

    /// Runs the page-break callback on a scratch table and measures what it
    /// produced in a pass of its own.
    fn injected_rows(&mut self, table: &Table) -> Result<Option<Injection>> {
        let Some(callback) = table.page_break_callback() else {
            return Ok(None);
        };
        let mut scratch = table.scratch();
        callback(&mut scratch);
        let rows = scratch.take_rows();
        if rows.is_empty() {
            return Ok(None);
        }
        let verbose = self.options.table_debug();
        let grid = measure(&scratch, &rows, &mut *self.surface, &mut self.states, verbose)?;
        Ok(Some(Injection { rows, grid }))
    }

    /// Cuts every unsplit rowspan starting in row `r` that does not fit in
    /// `remaining` into per-page pieces.
    fn split_rowspans(
        &mut self,
        table: &Table,
        row: &Row,
        grid: &mut TableGrid,
        r: usize,
        remaining: Length,
    ) -> Result<()> {
        let columns: Vec<usize> = grid.rows()[r]
            .spans
            .iter()
            .filter(|(_, info)| info.is_head() && !info.splitted && info.total_height >= remaining)
            .map(|(column, _)| *column)
            .collect();
        if columns.is_empty() {
            return Ok(());
        }

        // every later piece starts on a fresh page below the injected rows
        let injected = match self.injected_rows(table)? {
            Some(injection) => injection.grid.total_height(),
            None => Length::ZERO,
        };

        for column in columns {
            let info = &grid.rows()[r].spans[&column];
            let SpanSource::Origin { cell } = info.source else {
                continue;
            };
            let Some(source) = row.cells().get(cell) else {
                continue;
            };
            let rowspan = info.rowspan;
            let original_total = info.total_height;
            let heights: Vec<Length> = grid.rows()[r..r + rowspan]
                .iter()
                .map(|row| row.height)
                .collect();

            // (first row, row count, height) of every piece
            let mut pieces: Vec<(usize, usize, Length)> = Vec::new();
            let mut capacity = remaining;
            let mut start = 0;
            let mut running = Length::ZERO;
            for (k, height) in heights.iter().enumerate() {
                if k > start && running + *height >= capacity {
                    pieces.push((start, k - start, running));
                    let page = self.surface.page() + pieces.len();
                    capacity = self.surface.content_height(page) - injected;
                    start = k;
                    running = Length::ZERO;
                }
                running += *height;
            }
            pieces.push((start, rowspan - start, running));

            let mut blank = source.clone();
            blank.set_text("");
            for (piece, &(start, len, total)) in pieces.iter().enumerate() {
                let segment = (piece > 0).then(|| {
                    Rc::new(CellSegment {
                        cell: blank.clone(),
                        piece,
                    })
                });
                for j in 0..len {
                    let Some(entry) = grid.rows_mut()[r + start + j].spans.get_mut(&column) else {
                        continue;
                    };
                    entry.rowspan = len;
                    entry.total_height = total;
                    entry.position = j;
                    entry.splitted = true;
                    if j == 0 {
                        if let Some(segment) = &segment {
                            entry.source = SpanSource::Segment(segment.clone());
                        }
                    }
                }
            }

            self.metrics.split_cells += 1;
            log::debug!(
                "table rowspan split: row={} column={} pieces={} total={:.3}",
                r,
                column,
                pieces.len(),
                original_total.to_f32()
            );
            self.event(
                "table.rowspan_split",
                &[
                    ("row", JsonValue::Int(r as i64)),
                    ("column", JsonValue::Int(column as i64)),
                    ("pieces", JsonValue::Int(pieces.len() as i64)),
                    ("total", JsonValue::Num(original_total.to_f32())),
                ],
            );
        }
        Ok(())
    }

    fn draw_row(&mut self, table: &Table, row: &Row, grid_row: &GridRow, x0: Length) -> Result<()> {
        let page = self.surface.page();
        let (_, y) = self.surface.position();

        // (offset, cell, width, height), left to right
        let mut items: Vec<(Length, &Cell, Length, Length)> = Vec::new();
        for (index, (cell, slot)) in row.cells().iter().zip(&grid_row.slots).enumerate() {
            let height = match grid_row.span_at(slot.column) {
                Some(info) if matches!(info.source, SpanSource::Origin { cell: origin } if origin == index) => {
                    info.total_height
                }
                _ => grid_row.height,
            };
            items.push((slot.offset, cell, slot.width, height));
        }
        for info in grid_row.spans.values() {
            if let SpanSource::Segment(segment) = &info.source {
                items.push((info.offset, &segment.cell, info.width, info.total_height));
            }
        }
        items.sort_by_key(|item| item.0.to_milli_i64());

        for (offset, cell, width, height) in items {
            // a surface that auto-breaks inside a text box leaves another page selected
            if self.surface.page() != page {
                self.surface.set_page(page);
            }
            self.draw_cell(table, cell, Rect::new(x0 + offset, y, width, height))?;
        }

        self.surface.set_position(x0, y + grid_row.height);
        self.metrics.rows_drawn += 1;
        if self.metrics.first_page == 0 {
            self.metrics.first_page = page;
        }
        self.metrics.last_page = page;
        Ok(())
    }

    fn draw_cell(&mut self, table: &Table, cell: &Cell, rect: Rect) -> Result<()> {
        let style = cell.resolve_style(table, self.surface.cell_padding());
        if let Some(placed) =
            self.backgrounds
                .draw(&mut *self.surface, cell, rect, style.border_width)?
        {
            self.metrics.backgrounds_drawn += 1;
            self.event(
                "table.background",
                &[
                    ("page", JsonValue::Int(self.surface.page() as i64)),
                    ("resource", JsonValue::Str(&placed.resource_id)),
                    ("pixel_width", JsonValue::Int(placed.raster.width() as i64)),
                    ("pixel_height", JsonValue::Int(placed.raster.height() as i64)),
                ],
            );
        }

        let text_box = TextBox {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            text: cell.text().to_string(),
            border: cell.border(),
            border_width: style.border_width,
            align: cell.align(),
            valign: cell.valign(),
            fill: if cell.fill() {
                cell.background().color()
            } else {
                None
            },
            fit_to_width: cell.fit_to_width(),
            max_height: rect.height,
        };
        self.states.scoped(&mut *self.surface, |s| {
            s.set_font(&style.font);
            s.set_cell_padding(style.padding);
            s.set_cell_height_ratio(s.cell_height_ratio() * style.line_height);
            s.text_box(&text_box);
            Ok(())
        })?;
        self.metrics.cells_drawn += 1;
        Ok(())
    }

    fn event(&self, kind: &str, fields: &[(&str, JsonValue<'_>)]) {
        if let Some(logger) = &self.debug {
            logger.event(kind, fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TableError;
    use crate::canvas::{Canvas, Command, Document};
    use crate::style::{Border, Unit};
    use crate::table::ImageSource;
    use crate::types::{Color, Margins, Size};

    /// A point-based surface whose usable page height is `content` (10pt
    /// margins all round).
    fn page_surface(content: f32) -> Canvas {
        Canvas::new(
            Size {
                width: Length::from_f32(220.0),
                height: Length::from_f32(content + 20.0),
            },
            Unit::Pt,
            Margins::all(10.0),
        )
    }

    fn len(v: f32) -> Length {
        Length::from_f32(v)
    }

    fn table_with_rows(heights: &[f32]) -> Table {
        let mut table = Table::new();
        for (i, h) in heights.iter().enumerate() {
            table
                .new_row()
                .new_cell(format!("row {i}"))
                .set_min_height(*h)
                .unwrap();
        }
        table
    }

    /// (page, y, height, text) of every text box.
    fn text_boxes(canvas: &Canvas) -> Vec<(usize, Length, Length, String)> {
        let mut out = Vec::new();
        for (index, page) in canvas.pages().iter().enumerate() {
            for command in &page.commands {
                if let Command::DrawTextBox { text_box, .. } = command {
                    out.push((index + 1, text_box.y, text_box.height, text_box.text.clone()));
                }
            }
        }
        out
    }

    fn with_header(table: &mut Table, height: f32) {
        table.set_page_break_callback(move |t| {
            t.new_row()
                .new_cell("header")
                .set_min_height(height)
                .unwrap();
        });
    }

    #[test]
    fn rows_stack_down_from_the_cursor() {
        let mut canvas = page_surface(200.0);
        let table = table_with_rows(&[20.0, 30.0]);
        let metrics = table.draw(&mut canvas).unwrap();
        assert_eq!(
            text_boxes(&canvas),
            vec![
                (1, len(10.0), len(20.0), "row 0".into()),
                (1, len(30.0), len(30.0), "row 1".into()),
            ]
        );
        assert_eq!(canvas.position(), (len(10.0), len(60.0)));
        assert_eq!(metrics.rows_drawn, 2);
        assert_eq!(metrics.cells_drawn, 2);
        assert_eq!(metrics.page_breaks, 0);
        assert_eq!(metrics.pages_touched(), 1);
    }

    #[test]
    fn scenario_row_exactly_filling_the_page_breaks() {
        let mut canvas = page_surface(100.0);
        let table = table_with_rows(&[60.0, 40.0]);
        let metrics = table.draw(&mut canvas).unwrap();
        assert_eq!(metrics.page_breaks, 1);
        assert_eq!(canvas.page_count(), 2);
        assert_eq!(
            text_boxes(&canvas)[1],
            (2, len(10.0), len(40.0), "row 1".into())
        );

        let mut canvas = page_surface(100.0);
        let table = table_with_rows(&[60.0, 39.999]);
        let metrics = table.draw(&mut canvas).unwrap();
        assert_eq!(metrics.page_breaks, 0);
        assert_eq!(canvas.page_count(), 1);
    }

    #[test]
    fn break_reuses_an_existing_next_page() {
        let mut canvas = page_surface(100.0);
        canvas.add_page();
        canvas.set_page(1);
        canvas.set_position(len(10.0), len(10.0));
        let table = table_with_rows(&[60.0, 60.0]);
        table.draw(&mut canvas).unwrap();
        assert_eq!(canvas.page_count(), 2);
        assert_eq!(canvas.page(), 2);
        assert_eq!(canvas.commands_on(2).len(), 1);
    }

    #[test]
    fn header_rows_are_injected_at_the_break() {
        let mut canvas = page_surface(100.0);
        let mut table = table_with_rows(&[40.0, 40.0, 40.0]);
        with_header(&mut table, 15.0);
        let metrics = table.draw(&mut canvas).unwrap();

        assert_eq!(
            text_boxes(&canvas),
            vec![
                (1, len(10.0), len(40.0), "row 0".into()),
                (1, len(50.0), len(40.0), "row 1".into()),
                (2, len(10.0), len(15.0), "header".into()),
                (2, len(25.0), len(40.0), "row 2".into()),
            ]
        );
        assert_eq!(metrics.injected_rows, 1);
        assert_eq!(metrics.page_breaks, 1);
        // the caller's table is left alone
        assert_eq!(table.rows().len(), 3);
    }

    #[test]
    fn a_row_breaks_at_most_once() {
        let mut canvas = page_surface(100.0);
        let mut table = table_with_rows(&[50.0, 95.0]);
        with_header(&mut table, 15.0);
        let metrics = table.draw(&mut canvas).unwrap();
        assert_eq!(metrics.page_breaks, 1);
        assert_eq!(canvas.page_count(), 2);
        // the tall row lands under the header even though it overflows
        assert_eq!(
            text_boxes(&canvas)[2],
            (2, len(25.0), len(95.0), "row 1".into())
        );
    }

    #[test]
    fn callback_without_rows_only_breaks() {
        let mut canvas = page_surface(100.0);
        let mut table = table_with_rows(&[70.0, 70.0]);
        table.set_page_break_callback(|_| {});
        let metrics = table.draw(&mut canvas).unwrap();
        assert_eq!(metrics.page_breaks, 1);
        assert_eq!(metrics.injected_rows, 0);
    }

    fn spanning_table() -> Table {
        let mut table = Table::new();
        let row = table.new_row();
        row.new_cell("span")
            .set_rowspan(4)
            .unwrap()
            .set_min_height(20.0)
            .unwrap()
            .set_border(Border::FRAME);
        row.new_cell("r0").set_min_height(30.0).unwrap();
        for i in 1..4 {
            table
                .new_row()
                .new_cell(format!("r{i}"))
                .set_min_height(30.0)
                .unwrap();
        }
        table
    }

    #[test]
    fn split_rowspan_keeps_its_total_height() {
        let mut canvas = page_surface(100.0);
        let table = spanning_table();
        let options = ConvertOptions::default();
        let (metrics, grid, original_total) = {
            let mut converter = TableConverter::new(&mut canvas, &options);
            let before = converter.measure(&table).unwrap();
            let original_total = before.rows()[0].spans[&0].total_height;
            let metrics = converter.convert(&table).unwrap();
            (metrics, converter.grid().cloned().unwrap(), original_total)
        };
        assert_eq!(original_total, len(120.0));
        assert_eq!(metrics.split_cells, 1);

        let head = &grid.rows()[0].spans[&0];
        assert!(head.splitted);
        assert_eq!(head.total_height, len(90.0));
        assert_eq!(head.rowspan, 3);
        let piece = &grid.rows()[3].spans[&0];
        assert!(matches!(&piece.source, SpanSource::Segment(s) if s.piece == 1 && s.cell.text().is_empty()));
        assert_eq!(piece.position, 0);
        assert_eq!(head.total_height + piece.total_height, original_total);

        let boxes = text_boxes(&canvas);
        assert!(boxes.contains(&(1, len(10.0), len(90.0), "span".into())));
        assert!(boxes.contains(&(2, len(10.0), len(30.0), String::new())));
        assert!(boxes.contains(&(2, len(10.0), len(30.0), "r3".into())));
    }

    #[test]
    fn split_reserves_room_for_injected_rows() {
        let mut canvas = page_surface(100.0);
        let mut table = Table::new();
        let row = table.new_row();
        row.new_cell("span")
            .set_rowspan(6)
            .unwrap()
            .set_min_height(20.0)
            .unwrap();
        row.new_cell("r0").set_min_height(30.0).unwrap();
        for i in 1..6 {
            table
                .new_row()
                .new_cell(format!("r{i}"))
                .set_min_height(30.0)
                .unwrap();
        }
        with_header(&mut table, 15.0);
        let options = ConvertOptions::default();
        let mut converter = TableConverter::new(&mut canvas, &options);
        converter.convert(&table).unwrap();
        let grid = converter.grid().unwrap();

        // page 1 holds three rows; page 2 holds the header plus two rows,
        // since 15 + 3 x 30 would overrun the 100pt page
        let heads: Vec<(usize, Length)> = grid
            .rows()
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.spans.get(&0).filter(|s| s.is_head()).map(|s| (i, s.total_height)))
            .collect();
        // a second header lands before the last row, so its piece starts at 7
        assert_eq!(heads, vec![(0, len(90.0)), (4, len(60.0)), (7, len(30.0))]);
        let total: Length = heads.iter().map(|(_, h)| *h).sum();
        assert_eq!(total, len(180.0));
    }

    #[test]
    fn cells_right_of_a_span_are_offset_by_its_width() {
        let mut canvas = page_surface(200.0);
        let mut table = Table::new();
        let row = table.new_row();
        row.new_cell("tall").set_rowspan(2).unwrap().set_width(40.0).unwrap();
        row.new_cell("a").set_width(25.0).unwrap();
        table.new_row().new_cell("b");
        table.draw(&mut canvas).unwrap();

        let xs: Vec<(String, Length)> = canvas
            .commands_on(1)
            .iter()
            .filter_map(|c| match c {
                Command::DrawTextBox { text_box, .. } => Some((text_box.text.clone(), text_box.x)),
                _ => None,
            })
            .collect();
        assert_eq!(
            xs,
            vec![
                ("tall".into(), len(10.0)),
                ("a".into(), len(50.0)),
                ("b".into(), len(50.0)),
            ]
        );
    }

    #[test]
    fn rowspan_origin_is_drawn_at_span_height() {
        let mut canvas = page_surface(200.0);
        let mut table = Table::new();
        let row = table.new_row();
        row.new_cell("tall").set_rowspan(2).unwrap();
        row.new_cell("a").set_min_height(20.0).unwrap();
        table.new_row().new_cell("b").set_min_height(25.0).unwrap();
        table.draw(&mut canvas).unwrap();
        let boxes = text_boxes(&canvas);
        assert_eq!(boxes[0], (1, len(10.0), len(45.0), "tall".into()));
        assert_eq!(boxes[1], (1, len(10.0), len(20.0), "a".into()));
    }

    #[test]
    fn scenario_oversized_cell_fails_before_drawing() {
        let mut canvas = page_surface(25.0);
        let mut table = Table::new();
        table.new_row().new_cell("ok").set_min_height(5.0).unwrap();
        table.new_row().new_cell("huge").set_min_height(30.0).unwrap();
        let err = table.draw(&mut canvas).unwrap_err();
        assert!(matches!(err, TableError::UnsupportedLayout { ref text } if text == "huge"));
        assert_eq!(canvas.command_count(), 0);
    }

    #[test]
    fn drawing_twice_gives_identical_output() {
        let mut table = spanning_table();
        for i in 0..6 {
            table
                .new_row()
                .new_cell(format!("tail {i}"))
                .set_min_height(17.0)
                .unwrap();
        }
        with_header(&mut table, 12.0);

        let draw = |table: &Table| -> (Document, TableGrid) {
            let mut canvas = page_surface(100.0);
            let options = ConvertOptions::default();
            let grid = {
                let mut converter = TableConverter::new(&mut canvas, &options);
                converter.convert(table).unwrap();
                converter.grid().cloned().unwrap()
            };
            (canvas.finish(), grid)
        };
        let (first_doc, first_grid) = draw(&table);
        let (second_doc, second_grid) = draw(&table);
        assert_eq!(first_doc, second_doc);
        assert_eq!(first_grid.row_heights(), second_grid.row_heights());
        assert_eq!(first_grid.column_widths(), second_grid.column_widths());
        assert!(first_doc.pages.len() > 1);
    }

    #[test]
    fn text_box_carries_cell_style_and_state_is_restored() {
        let mut canvas = page_surface(200.0);
        let before = canvas.capture_state();
        let mut table = Table::new();
        table.set_font_size(12.0).unwrap().set_padding(&[1.0]).unwrap();
        table
            .new_row()
            .new_cell("styled")
            .set_align("R".parse().unwrap())
            .set_valign("M".parse().unwrap())
            .set_border("LB".parse().unwrap())
            .set_fill(true)
            .set_fit_to_width(true)
            .set_line_height(2.0)
            .unwrap()
            .background_mut()
            .set_color(Some(Color::rgb(1, 2, 3)));
        table.draw(&mut canvas).unwrap();

        match &canvas.commands_on(1)[0] {
            Command::DrawTextBox {
                font,
                padding,
                cell_height_ratio,
                text_box,
            } => {
                assert_eq!(font.size_pt, 12.0);
                assert_eq!(*padding, crate::style::Padding::all(len(1.0)));
                assert_eq!(*cell_height_ratio, 2.5);
                assert_eq!(text_box.fill, Some(Color::rgb(1, 2, 3)));
                assert_eq!(text_box.border, Border::LEFT | Border::BOTTOM);
                assert!(text_box.fit_to_width);
                assert_eq!(text_box.max_height, text_box.height);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(canvas.capture_state(), before);
    }

    #[test]
    fn background_is_drawn_before_the_text_box() {
        let mut bytes = Vec::new();
        image::RgbaImage::new(2, 2)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let mut canvas = page_surface(200.0);
        let mut table = Table::new();
        table
            .new_row()
            .new_cell("bg")
            .set_min_height(10.0)
            .unwrap()
            .background_mut()
            .set_image(ImageSource::bytes(bytes));
        let metrics = table.draw(&mut canvas).unwrap();
        assert!(matches!(
            canvas.commands_on(1),
            [Command::DrawImage { .. }, Command::DrawTextBox { .. }]
        ));
        assert_eq!(metrics.backgrounds_drawn, 1);
    }

    #[test]
    fn empty_table_draws_nothing() {
        let mut canvas = page_surface(100.0);
        let metrics = Table::new().draw(&mut canvas).unwrap();
        assert_eq!(metrics, TableMetrics::default());
        assert_eq!(canvas.command_count(), 0);
    }

    #[test]
    fn debug_log_records_breaks_and_summary() {
        let path = std::env::temp_dir().join(format!(
            "pagegrid-paginator-{}.jsonl",
            std::process::id()
        ));
        let options = ConvertOptions::builder().debug_log(&path).build().unwrap();
        let mut canvas = page_surface(100.0);
        let mut table = table_with_rows(&[60.0, 60.0]);
        with_header(&mut table, 10.0);
        TableConverter::new(&mut canvas, &options)
            .convert(&table)
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let kinds: Vec<&str> = written
            .lines()
            .filter_map(|line| line.split('"').nth(3))
            .collect();
        assert_eq!(
            kinds,
            vec!["table.measure", "table.page_break", "table.inject", "debug.summary"]
        );
        assert!(written.contains("\"appended\":true"));
        let summary = written.lines().last().unwrap();
        assert!(summary.contains("\"rows_drawn\":3"));
        assert!(summary.contains("\"cells_drawn\":3"));
    }

    #[test]
    fn debug_log_marks_a_reused_page() {
        let path = std::env::temp_dir().join(format!(
            "pagegrid-paginator-reuse-{}.jsonl",
            std::process::id()
        ));
        let options = ConvertOptions::builder().debug_log(&path).build().unwrap();
        let mut canvas = page_surface(100.0);
        canvas.add_page();
        canvas.set_page(1);
        canvas.set_position(len(10.0), len(10.0));
        let table = table_with_rows(&[60.0, 60.0]);
        TableConverter::new(&mut canvas, &options)
            .convert(&table)
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(written.contains("\"appended\":false"));
    }

    #[test]
    fn rowspan_taller_than_a_page_fails_instead_of_dropping_text() {
        let mut canvas = page_surface(25.0);
        let mut table = Table::new();
        let row = table.new_row();
        row.new_cell("a span with more text than one page holds")
            .set_rowspan(2)
            .unwrap()
            .set_min_height(30.0)
            .unwrap();
        row.new_cell("a").set_min_height(5.0).unwrap();
        table.new_row().new_cell("b").set_min_height(5.0).unwrap();
        let err = table.draw(&mut canvas).unwrap_err();
        assert!(matches!(err, TableError::UnsupportedLayout { .. }));
        assert_eq!(canvas.command_count(), 0);
    }

    #[test]
    fn split_capacity_follows_the_next_page_height() {
        let mut canvas = page_surface(100.0);
        // second page is shorter: 60pt of content
        canvas.push_page_with_size(Size {
            width: len(220.0),
            height: len(80.0),
        });
        canvas.set_page(1);
        canvas.set_position(len(10.0), len(10.0));
        let mut table = Table::new();
        let row = table.new_row();
        row.new_cell("span")
            .set_rowspan(6)
            .unwrap()
            .set_min_height(20.0)
            .unwrap();
        row.new_cell("r0").set_min_height(30.0).unwrap();
        for i in 1..6 {
            table
                .new_row()
                .new_cell(format!("r{i}"))
                .set_min_height(30.0)
                .unwrap();
        }
        let options = ConvertOptions::default();
        let heads: Vec<(usize, Length)> = {
            let mut converter = TableConverter::new(&mut canvas, &options);
            converter.convert(&table).unwrap();
            converter
                .grid()
                .unwrap()
                .rows()
                .iter()
                .enumerate()
                .filter_map(|(i, row)| row.spans.get(&0).filter(|s| s.is_head()).map(|s| (i, s.total_height)))
                .collect()
        };
        // page 2 takes one row, the appended page 3 is full size again
        assert_eq!(heads, vec![(0, len(90.0)), (3, len(30.0)), (4, len(60.0))]);
        assert_eq!(canvas.page_count(), 3);
    }

    /// Canvas that starts a new page after the first text box it draws.
    struct AutoBreakingCanvas {
        inner: Canvas,
        broke: bool,
    }

    impl PageSurface for AutoBreakingCanvas {
        fn unit(&self) -> Unit {
            self.inner.unit()
        }
        fn page_width(&self) -> Length {
            self.inner.page_width()
        }
        fn page_height(&self, page: usize) -> Length {
            self.inner.page_height(page)
        }
        fn margins(&self) -> Margins {
            self.inner.margins()
        }
        fn position(&self) -> (Length, Length) {
            self.inner.position()
        }
        fn set_position(&mut self, x: Length, y: Length) {
            self.inner.set_position(x, y);
        }
        fn page(&self) -> usize {
            self.inner.page()
        }
        fn page_count(&self) -> usize {
            self.inner.page_count()
        }
        fn set_page(&mut self, page: usize) {
            self.inner.set_page(page);
        }
        fn add_page(&mut self) {
            self.inner.add_page();
        }
        fn font(&self) -> crate::style::FontSpec {
            self.inner.font()
        }
        fn set_font(&mut self, font: &crate::style::FontSpec) {
            self.inner.set_font(font);
        }
        fn cell_height_ratio(&self) -> f32 {
            self.inner.cell_height_ratio()
        }
        fn set_cell_height_ratio(&mut self, ratio: f32) {
            self.inner.set_cell_height_ratio(ratio);
        }
        fn cell_padding(&self) -> crate::style::Padding {
            self.inner.cell_padding()
        }
        fn set_cell_padding(&mut self, padding: crate::style::Padding) {
            self.inner.set_cell_padding(padding);
        }
        fn string_width(&self, text: &str) -> Length {
            self.inner.string_width(text)
        }
        fn string_lines(&self, text: &str, width: Length, padding: crate::style::Padding, border: Border) -> usize {
            self.inner.string_lines(text, width, padding, border)
        }
        fn text_box(&mut self, text_box: &TextBox) {
            self.inner.text_box(text_box);
            if !self.broke {
                self.broke = true;
                let position = self.inner.position();
                self.inner.add_page();
                self.inner.set_position(position.0, position.1);
            }
        }
        fn image(&mut self, image: &crate::surface::PlacedImage) {
            self.inner.image(image);
        }
    }

    #[test]
    fn row_stays_on_its_page_when_the_surface_breaks_mid_row() {
        let mut surface = AutoBreakingCanvas {
            inner: page_surface(200.0),
            broke: false,
        };
        let mut table = Table::new();
        let row = table.new_row();
        row.new_cell("left").set_min_height(20.0).unwrap();
        row.new_cell("right").set_min_height(20.0).unwrap();
        let metrics = table.draw(&mut surface).unwrap();

        assert_eq!(surface.inner.page_count(), 2);
        assert_eq!(surface.inner.commands_on(1).len(), 2);
        assert!(surface.inner.commands_on(2).is_empty());
        assert_eq!(metrics.last_page, 1);
    }
}
