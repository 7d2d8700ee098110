//! Column width resolution.
//!
//! First pass: place every cell on the column grid (rowspans from earlier
//! rows claim their slots) and sample a width for each column from its
//! single-column cells. An explicit cell width wins for its column;
//! otherwise the column gets the mean of the measured text widths. The
//! columns are then scaled proportionally when they overflow the available
//! width or when the table declares a width of its own.
//!
//! Second pass: every cell's width is the sum of the columns it spans.

use crate::error::Result;
use crate::grid::CellSlot;
use crate::surface::{PageSurface, SurfaceStateStack};
use crate::table::{Row, Table};
use crate::types::Length;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WidthGrid {
    pub columns: Vec<Length>,
    /// One slot per cell, parallel to `Row::cells`.
    pub slots: Vec<Vec<CellSlot>>,
}

/// Column slots claimed by rowspans that started in earlier rows.
#[derive(Debug, Default)]
pub(crate) struct RowspanOccupancy {
    remaining: Vec<usize>,
}

impl RowspanOccupancy {
    /// Starts a row: returns which columns are taken by spans from above and
    /// counts those spans down by one row.
    fn begin_row(&mut self) -> Vec<bool> {
        self.remaining
            .iter_mut()
            .map(|left| {
                if *left > 0 {
                    *left -= 1;
                    true
                } else {
                    false
                }
            })
            .collect()
    }

    fn claim(&mut self, column: usize, colspan: usize, rowspan: usize) {
        let end = column + colspan;
        if self.remaining.len() < end {
            self.remaining.resize(end, 0);
        }
        for slot in &mut self.remaining[column..end] {
            *slot = rowspan.saturating_sub(1);
        }
    }
}

/// Column index of every cell, honoring rowspan occupancy.
pub(crate) fn place_cells(rows: &[Row]) -> Vec<Vec<(usize, usize)>> {
    let mut occupancy = RowspanOccupancy::default();
    let mut placements = Vec::with_capacity(rows.len());
    for row in rows {
        let blocked = occupancy.begin_row();
        let mut column = 0usize;
        let mut placed = Vec::with_capacity(row.cells().len());
        for cell in row.cells() {
            while blocked.get(column).copied().unwrap_or(false) {
                column += 1;
            }
            let colspan = cell.colspan().max(1);
            placed.push((column, colspan));
            if cell.rowspan() > 1 {
                occupancy.claim(column, colspan, cell.rowspan());
            }
            column += colspan;
        }
        placements.push(placed);
    }
    placements
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnSample {
    Unset,
    Fixed(Length),
    Measured { total: Length, count: i32 },
}

impl ColumnSample {
    fn add_explicit(&mut self, width: Length) {
        if !matches!(self, ColumnSample::Fixed(_)) {
            *self = ColumnSample::Fixed(width);
        }
    }

    fn add_measured(&mut self, width: Length) {
        match self {
            ColumnSample::Fixed(_) => {}
            ColumnSample::Unset => {
                *self = ColumnSample::Measured {
                    total: width,
                    count: 1,
                }
            }
            ColumnSample::Measured { total, count } => {
                *total += width;
                *count += 1;
            }
        }
    }

    fn width(self) -> Length {
        match self {
            ColumnSample::Unset => Length::ZERO,
            ColumnSample::Fixed(width) => width,
            ColumnSample::Measured { total, count } => total / count,
        }
    }
}

pub(crate) fn resolve_widths<S: PageSurface + ?Sized>(
    table: &Table,
    rows: &[Row],
    surface: &mut S,
    states: &mut SurfaceStateStack,
    verbose: bool,
) -> Result<WidthGrid> {
    let placements = place_cells(rows);
    let column_count = placements
        .iter()
        .flat_map(|row| row.iter().map(|(column, colspan)| column + colspan))
        .max()
        .unwrap_or(0);

    let mut samples = vec![ColumnSample::Unset; column_count];
    let surface_padding = surface.cell_padding();
    for (row, placed) in rows.iter().zip(&placements) {
        for (cell, &(column, colspan)) in row.cells().iter().zip(placed) {
            if colspan != 1 {
                continue;
            }
            if let Some(width) = cell.width() {
                samples[column].add_explicit(width);
                continue;
            }
            if matches!(samples[column], ColumnSample::Fixed(_)) {
                continue;
            }
            let style = cell.resolve_style(table, surface_padding);
            let measured = states.scoped(surface, |s| {
                s.set_font(&style.font);
                Ok(s.string_width(cell.text()))
            })?;
            samples[column].add_measured(measured);
        }
    }

    let mut columns: Vec<Length> = samples.iter().map(|s| s.width()).collect();
    let raw_total: Length = columns.iter().sum();
    let available = surface.content_width();
    let declared = table.resolved_width(available);
    if raw_total > Length::ZERO && (raw_total > available || declared.is_some()) {
        let target = declared.unwrap_or(available);
        for width in &mut columns {
            *width = width.scale(target, raw_total);
        }
    }
    if verbose {
        log::debug!(
            "table widths: columns={} raw_total={:.3} available={:.3} declared={:?} widths={:?}",
            column_count,
            raw_total.to_f32(),
            available.to_f32(),
            declared.map(|w| w.to_f32()),
            columns.iter().map(|w| w.to_f32()).collect::<Vec<_>>()
        );
    }

    let slots = placements
        .iter()
        .map(|placed| {
            placed
                .iter()
                .map(|&(column, colspan)| CellSlot {
                    column,
                    colspan,
                    offset: columns.iter().take(column).sum(),
                    width: span_width(&columns, column, colspan),
                })
                .collect()
        })
        .collect();

    Ok(WidthGrid { columns, slots })
}

pub(crate) fn span_width(columns: &[Length], column: usize, colspan: usize) -> Length {
    columns.iter().skip(column).take(colspan).sum()
}
