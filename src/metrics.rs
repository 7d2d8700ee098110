/// Counts gathered while drawing one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMetrics {
    /// Page the first row landed on.
    pub first_page: usize,
    /// Page the last row landed on.
    pub last_page: usize,
    pub page_breaks: usize,
    /// Rows added by the page-break callback.
    pub injected_rows: usize,
    /// Rowspans cut into per-page pieces.
    pub split_cells: usize,
    pub rows_drawn: usize,
    pub cells_drawn: usize,
    pub backgrounds_drawn: usize,
}

impl TableMetrics {
    pub fn pages_touched(&self) -> usize {
        if self.first_page == 0 {
            0
        } else {
            self.last_page.saturating_sub(self.first_page) + 1
        }
    }
}
