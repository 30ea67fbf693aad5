use std::collections::BTreeSet;

use super::cursor::Attrs;

/// Scalar value marking the trailing half of a wide (2-column) character.
pub const WIDE_SPACER: char = '\0';

/// A single screen cell: one Unicode scalar plus its rendition.
/// `ch == WIDE_SPACER` marks the right half of a double-width character,
/// whose leading half sits in the cell to the left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub attrs: Attrs,
    pub dirty: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            attrs: Attrs::default(),
            dirty: false,
        }
    }
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        self.ch == ' ' && self.attrs == Attrs::default()
    }
}

/// Smallest axis-aligned rectangle enclosing the dirty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyBounds {
    pub min_x: usize,
    pub max_x: usize,
    pub min_y: usize,
    pub max_y: usize,
}

/// Fixed-size cell matrix with incremental damage tracking: a screen-level
/// dirty flag, the set of dirty line indices, and the bounding rectangle of
/// dirty cells. `just_cleared` is a sticky marker set by a full erase so the
/// next paint repaints everything once.
pub struct Screen {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    dirty: bool,
    dirty_lines: BTreeSet<usize>,
    bounds: Option<DirtyBounds>,
    just_cleared: bool,
}

impl Screen {
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![Cell::default(); width * height],
            dirty: false,
            dirty_lines: BTreeSet::new(),
            bounds: None,
            just_cleared: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if x < self.width && y < self.height {
            Some(&self.cells[y * self.width + x])
        } else {
            None
        }
    }

    pub fn row(&self, y: usize) -> &[Cell] {
        let start = y * self.width;
        &self.cells[start..start + self.width]
    }

    /// Deep copy of one row, for scrollback capture.
    pub fn row_snapshot(&self, y: usize) -> Vec<Cell> {
        let mut row = self.row(y).to_vec();
        for cell in &mut row {
            cell.dirty = false;
        }
        row
    }

    /// Row rendered as a string, spacer cells skipped. Test and export helper.
    pub fn row_text(&self, y: usize) -> String {
        self.row(y)
            .iter()
            .filter(|c| c.ch != WIDE_SPACER)
            .map(|c| c.ch)
            .collect()
    }

    pub fn is_row_blank(&self, y: usize) -> bool {
        self.row(y).iter().all(Cell::is_blank)
    }

    /// Write one cell. Out-of-bounds writes are silently dropped.
    pub fn set_cell(&mut self, x: usize, y: usize, ch: char, attrs: Attrs) {
        if x >= self.width || y >= self.height {
            return;
        }
        let cell = &mut self.cells[y * self.width + x];
        cell.ch = ch;
        cell.attrs = attrs;
        cell.dirty = true;
        self.mark_dirty(x, y);
    }

    /// Blank one cell with the given rendition's background.
    pub fn erase_cell(&mut self, x: usize, y: usize, attrs: Attrs) {
        let blank = Attrs {
            bg: attrs.bg,
            ..Attrs::default()
        };
        self.set_cell(x, y, ' ', blank);
    }

    /// Blank cells [start_x, end_x) of a row. Wide pairs split by either
    /// boundary are blanked whole so no continuation cell is orphaned.
    pub fn erase_row_span(&mut self, y: usize, start_x: usize, end_x: usize, attrs: Attrs) {
        if y >= self.height {
            return;
        }
        let end_x = end_x.min(self.width);
        if start_x > 0 && self.cell(start_x, y).map_or(false, |c| c.ch == WIDE_SPACER) {
            self.erase_cell(start_x - 1, y, attrs);
        }
        if end_x < self.width && self.cell(end_x, y).map_or(false, |c| c.ch == WIDE_SPACER) {
            self.erase_cell(end_x, y, attrs);
        }
        for x in start_x..end_x {
            self.erase_cell(x, y, attrs);
        }
    }

    pub fn erase_row(&mut self, y: usize, attrs: Attrs) {
        self.erase_row_span(y, 0, self.width, attrs);
    }

    /// Rotate rows [top+1, bottom] up by one, blank row `bottom`, and return
    /// a deep copy of the departed top row so the caller can capture it.
    pub fn scroll_up(&mut self, top: usize, bottom: usize) -> Vec<Cell> {
        let departed = self.row_snapshot(top);
        for y in top..bottom {
            let (src, dst) = ((y + 1) * self.width, y * self.width);
            for x in 0..self.width {
                self.cells[dst + x] = self.cells[src + x];
            }
        }
        self.blank_row_default(bottom);
        for y in top..=bottom {
            self.mark_row_dirty(y);
        }
        departed
    }

    /// Mirror of `scroll_up`: rotate rows down by one, blank row `top`.
    pub fn scroll_down(&mut self, top: usize, bottom: usize) {
        for y in (top..bottom).rev() {
            let (src, dst) = (y * self.width, (y + 1) * self.width);
            for x in 0..self.width {
                self.cells[dst + x] = self.cells[src + x];
            }
        }
        self.blank_row_default(top);
        for y in top..=bottom {
            self.mark_row_dirty(y);
        }
    }

    /// Insert `count` blank cells at `x`, shifting the rest of the row right.
    pub fn insert_cells(&mut self, x: usize, y: usize, count: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.split_wide_pair_at(x, y);
        let start = y * self.width;
        let row = &mut self.cells[start..start + self.width];
        let count = count.min(self.width - x);
        row[x..].rotate_right(count);
        for cell in &mut row[x..x + count] {
            *cell = Cell::default();
        }
        self.mark_row_dirty(y);
    }

    /// Delete `count` cells at `x`, shifting the rest of the row left and
    /// blank-filling on the right.
    pub fn delete_cells(&mut self, x: usize, y: usize, count: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.split_wide_pair_at(x, y);
        let start = y * self.width;
        let row = &mut self.cells[start..start + self.width];
        let count = count.min(self.width - x);
        row[x..].rotate_left(count);
        let blank_from = self.width - count;
        for cell in &mut row[blank_from..] {
            *cell = Cell::default();
        }
        // The shift can pull a continuation cell to the front of the span
        // when its leader was deleted.
        if self.cells[start + x].ch == WIDE_SPACER {
            self.cells[start + x] = Cell::default();
        }
        self.mark_row_dirty(y);
    }

    /// If (x, y) holds the trailing half of a wide pair, blank both halves.
    fn split_wide_pair_at(&mut self, x: usize, y: usize) {
        if self.cell(x, y).map_or(false, |c| c.ch == WIDE_SPACER) && x > 0 {
            self.set_cell(x - 1, y, ' ', Attrs::default());
            self.set_cell(x, y, ' ', Attrs::default());
        }
    }

    /// Blank every cell, set the sticky `just_cleared` marker and mark the
    /// whole screen dirty.
    pub fn clear_all(&mut self) {
        for cell in &mut self.cells {
            *cell = Cell::default();
            cell.dirty = true;
        }
        self.just_cleared = true;
        self.mark_all_dirty();
    }

    fn blank_row_default(&mut self, y: usize) {
        let start = y * self.width;
        for cell in &mut self.cells[start..start + self.width] {
            *cell = Cell::default();
            cell.dirty = true;
        }
    }

    fn mark_dirty(&mut self, x: usize, y: usize) {
        self.dirty = true;
        self.dirty_lines.insert(y);
        self.bounds = Some(match self.bounds {
            None => DirtyBounds {
                min_x: x,
                max_x: x,
                min_y: y,
                max_y: y,
            },
            Some(b) => DirtyBounds {
                min_x: b.min_x.min(x),
                max_x: b.max_x.max(x),
                min_y: b.min_y.min(y),
                max_y: b.max_y.max(y),
            },
        });
    }

    pub fn mark_row_dirty(&mut self, y: usize) {
        if y >= self.height {
            return;
        }
        let start = y * self.width;
        for cell in &mut self.cells[start..start + self.width] {
            cell.dirty = true;
        }
        self.mark_dirty(0, y);
        self.mark_dirty(self.width - 1, y);
    }

    pub fn mark_all_dirty(&mut self) {
        for y in 0..self.height {
            self.mark_row_dirty(y);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn dirty_bounds(&self) -> Option<DirtyBounds> {
        self.bounds
    }

    pub fn dirty_lines(&self) -> &BTreeSet<usize> {
        &self.dirty_lines
    }

    /// Consume the sticky full-repaint marker.
    pub fn take_just_cleared(&mut self) -> bool {
        std::mem::take(&mut self.just_cleared)
    }

    /// Reset all damage state after a paint.
    pub fn clear_dirty(&mut self) {
        for cell in &mut self.cells {
            cell.dirty = false;
        }
        self.dirty = false;
        self.dirty_lines.clear();
        self.bounds = None;
    }

    /// Resize to new dimensions, preserving the top-left overlap.
    pub fn resize(&mut self, width: usize, height: usize) {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return;
        }
        let mut cells = vec![Cell::default(); width * height];
        for y in 0..self.height.min(height) {
            for x in 0..self.width.min(width) {
                cells[y * width + x] = self.cells[y * self.width + x];
            }
        }
        self.cells = cells;
        self.width = width;
        self.height = height;
        self.dirty_lines.clear();
        self.bounds = None;
        self.mark_all_dirty();
    }
}
