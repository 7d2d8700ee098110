//! The derived layout of a table: per-cell geometry, row heights and the
//! bookkeeping for cells that span several rows.
//!
//! A grid is produced by [`measure`] from a row list. It is never stored on
//! the [`Table`] itself; the paginator owns the grid for the duration of one
//! draw, splices the grids of injected rows into it, and rewrites rowspan
//! entries when a tall cell has to be split across pages.

use crate::error::Result;
use crate::height::resolve_heights;
use crate::surface::{PageSurface, SurfaceStateStack};
use crate::table::{Cell, Row, Table};
use crate::types::Length;
use crate::width::resolve_widths;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Where a cell sits on the column grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSlot {
    pub column: usize,
    pub colspan: usize,
    /// Distance from the left edge of the table.
    pub offset: Length,
    pub width: Length,
}

/// A cell cloned for a later piece of a split rowspan. The text stays with
/// the first piece; later pieces only repeat the cell's borders, fill and
/// background.
#[derive(Debug, Clone)]
pub struct CellSegment {
    pub cell: Cell,
    /// 1 for the first piece after the split, 2 for the next one, and so on.
    pub piece: usize,
}

#[derive(Debug, Clone)]
pub enum SpanSource {
    /// The span starts in this row; the cell is `Row::cells()[cell]`.
    Origin { cell: usize },
    /// A row the span passes through.
    Covered,
    /// First row of a piece of a split span.
    Segment(Rc<CellSegment>),
}

/// Rowspan bookkeeping for one (row, column) pair.
#[derive(Debug, Clone)]
pub struct RowspanInfo {
    /// Height the cell needs for its own content.
    pub own_height: Length,
    /// Sum of the heights of the rows the span (or span piece) covers.
    pub total_height: Length,
    pub rowspan: usize,
    pub colspan: usize,
    pub offset: Length,
    pub width: Length,
    /// Row index within the span (or span piece); 0 for its first row.
    pub position: usize,
    pub source: SpanSource,
    /// Set once the span has been cut into per-page pieces.
    pub splitted: bool,
}

impl RowspanInfo {
    pub fn is_head(&self) -> bool {
        self.position == 0
    }
}

#[derive(Debug, Clone)]
pub struct GridRow {
    /// One slot per cell, parallel to `Row::cells()`.
    pub slots: Vec<CellSlot>,
    pub height: Length,
    /// Rowspan entries touching this row, keyed by column.
    pub spans: BTreeMap<usize, RowspanInfo>,
}

impl GridRow {
    pub fn span_at(&self, column: usize) -> Option<&RowspanInfo> {
        self.spans.get(&column)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableGrid {
    columns: Vec<Length>,
    rows: Vec<GridRow>,
}

impl TableGrid {
    /// Resolved column widths of the pass that produced this grid.
    pub fn column_widths(&self) -> &[Length] {
        &self.columns
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [GridRow] {
        &mut self.rows
    }

    pub fn row_heights(&self) -> Vec<Length> {
        self.rows.iter().map(|r| r.height).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_height(&self) -> Length {
        self.rows.iter().map(|r| r.height).sum()
    }

    /// Inserts the rows of `other` before row `at`.
    pub(crate) fn splice(&mut self, at: usize, other: TableGrid) {
        let at = at.min(self.rows.len());
        self.rows.splice(at..at, other.rows);
    }
}

/// Measures `rows` with the defaults of `table`: column widths first, then
/// row heights. Leaves the surface state as it found it.
pub(crate) fn measure<S: PageSurface + ?Sized>(
    table: &Table,
    rows: &[Row],
    surface: &mut S,
    states: &mut SurfaceStateStack,
    verbose: bool,
) -> Result<TableGrid> {
    let widths = resolve_widths(table, rows, surface, states, verbose)?;
    let heights = resolve_heights(table, rows, &widths.slots, surface, states, verbose)?;
    let rows = widths
        .slots
        .into_iter()
        .zip(heights.rows)
        .zip(heights.spans)
        .map(|((slots, height), spans)| GridRow {
            slots,
            height,
            spans,
        })
        .collect();
    Ok(TableGrid {
        columns: widths.columns,
        rows,
    })
}
