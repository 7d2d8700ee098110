//! Row height resolution.
//!
//! A cell needs `lines x line height + vertical padding`, at least its
//! minimum height. A row is as tall as its tallest single-row cell. A cell
//! spanning `n` rows contributes `ceil(height / n)` to each row it covers;
//! once every row is measured, the span's total is the sum of the heights of
//! those rows.

use crate::error::{Result, unsupported_layout};
use crate::grid::{CellSlot, RowspanInfo, SpanSource};
use crate::surface::{PageSurface, SurfaceStateStack};
use crate::table::{Cell, Row, Table};
use crate::types::Length;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub(crate) struct HeightGrid {
    pub rows: Vec<Length>,
    pub spans: Vec<BTreeMap<usize, RowspanInfo>>,
}

/// Height `cell` needs in a box of `width`, measured with the cell's own
/// font and padding.
pub(crate) fn cell_height<S: PageSurface + ?Sized>(
    table: &Table,
    cell: &Cell,
    width: Length,
    surface: &mut S,
    states: &mut SurfaceStateStack,
) -> Result<Length> {
    let style = cell.resolve_style(table, surface.cell_padding());
    let height = states.scoped(surface, |s| {
        s.set_font(&style.font);
        s.set_cell_padding(style.padding);
        let lines = s.string_lines(cell.text(), width, style.padding, cell.border());
        let line = s.font_size_user() * (style.line_height * s.cell_height_ratio());
        Ok(line * lines as i32 + style.padding.vertical())
    })?;
    Ok(match cell.min_height() {
        Some(min) => height.max(min),
        None => height,
    })
}

pub(crate) fn resolve_heights<S: PageSurface + ?Sized>(
    table: &Table,
    rows: &[Row],
    slots: &[Vec<CellSlot>],
    surface: &mut S,
    states: &mut SurfaceStateStack,
    verbose: bool,
) -> Result<HeightGrid> {
    let page_content = surface.content_height(surface.page());
    let mut heights = vec![Length::ZERO; rows.len()];
    let mut spans: Vec<BTreeMap<usize, RowspanInfo>> = vec![BTreeMap::new(); rows.len()];

    for (r, (row, row_slots)) in rows.iter().zip(slots).enumerate() {
        for (index, (cell, slot)) in row.cells().iter().zip(row_slots).enumerate() {
            let height = cell_height(table, cell, slot.width, surface, states)?;
            // a span never reaches past the last row
            let rowspan = cell.rowspan().min(rows.len() - r);
            // a rowspan may be cut across pages, its content may not
            if height > page_content {
                return Err(unsupported_layout(cell.text()));
            }
            if rowspan <= 1 {
                heights[r] = heights[r].max(height);
                continue;
            }

            let share = height.div_ceil(rowspan);
            for k in 0..rowspan {
                heights[r + k] = heights[r + k].max(share);
                spans[r + k].insert(
                    slot.column,
                    RowspanInfo {
                        own_height: height,
                        total_height: height,
                        rowspan,
                        colspan: slot.colspan,
                        offset: slot.offset,
                        width: slot.width,
                        position: k,
                        source: if k == 0 {
                            SpanSource::Origin { cell: index }
                        } else {
                            SpanSource::Covered
                        },
                        splitted: false,
                    },
                );
            }
        }
    }

    for r in 0..rows.len() {
        let totals: Vec<(usize, Length)> = spans[r]
            .iter()
            .filter(|(_, info)| info.is_head())
            .map(|(column, info)| (*column, heights[r..r + info.rowspan].iter().sum()))
            .collect();
        for (column, total) in totals {
            for k in 0..spans[r][&column].rowspan {
                if let Some(info) = spans[r + k].get_mut(&column) {
                    info.total_height = total;
                }
            }
        }
    }

    if verbose {
        log::debug!(
            "table heights: rows={} total={:.3} page_content={:.3}",
            rows.len(),
            heights.iter().sum::<Length>().to_f32(),
            page_content.to_f32()
        );
    }

    Ok(HeightGrid {
        rows: heights,
        spans,
    })
}
