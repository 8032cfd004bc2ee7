#![forbid(unsafe_code)]

//! Cursor arithmetic over a pane's visible entries.
//!
//! Entries are laid out row-major in `cols` columns (`cols == 1` for the list
//! layout). The last row may be short; its missing cells are padding and never
//! hold an entry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A cursor movement request, as carried in keymap command arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Motion {
    Step {
        direction: Direction,
        #[serde(default = "one")]
        count: usize,
        #[serde(default)]
        wrap: bool,
    },
    Page {
        direction: Direction,
    },
    Home,
    End,
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCursor {
    total: usize,
    cols: usize,
}

impl GridCursor {
    pub fn new(total: usize, cols: usize) -> Self {
        Self {
            total,
            cols: cols.max(1),
        }
    }

    pub fn list(total: usize) -> Self {
        Self::new(total, 1)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `total` rounded up to a whole number of rows.
    pub fn total_cells(&self) -> usize {
        self.total.div_ceil(self.cols) * self.cols
    }

    /// Clamped movement: never wraps, never leaves the row horizontally.
    pub fn step(&self, current: usize, direction: Direction, count: usize) -> Option<usize> {
        let last = self.total.checked_sub(1)?;
        let current = current.min(last);
        let row_start = current - current % self.cols;
        let next = match direction {
            Direction::Left => current.saturating_sub(count).max(row_start),
            Direction::Right => {
                let row_end = (row_start + self.cols - 1).min(last);
                current.saturating_add(count).min(row_end)
            }
            Direction::Up => self.vertical(current, -self.row_delta(count)),
            Direction::Down => self.vertical(current, self.row_delta(count)),
        };
        Some(next)
    }

    /// Wraparound movement over the padded cell range.
    pub fn cycle(&self, current: usize, direction: Direction, count: usize) -> Option<usize> {
        if self.total == 0 {
            return None;
        }
        let cells = self.total_cells();
        let delta = match direction {
            Direction::Up => -self.row_delta(count),
            Direction::Down => self.row_delta(count),
            Direction::Left => -signed(count),
            Direction::Right => signed(count),
        };
        let shift = delta.rem_euclid(signed(cells)) as usize;
        let index = (current % cells + shift) % cells;
        if index < self.total {
            return Some(index);
        }
        match direction {
            Direction::Right => Some(0),
            Direction::Up | Direction::Left | Direction::Down => Some(self.total - 1),
        }
    }

    /// Moves one screen minus one row, clamped like [`GridCursor::step`].
    pub fn page(&self, current: usize, direction: Direction, rows_per_page: usize) -> Option<usize> {
        let last = self.total.checked_sub(1)?;
        let current = current.min(last);
        let delta = signed(rows_per_page.saturating_mul(self.cols).saturating_sub(self.cols));
        let next = match direction {
            Direction::Up | Direction::Left => self.vertical(current, -delta),
            Direction::Down | Direction::Right => self.vertical(current, delta),
        };
        Some(next)
    }

    pub fn home(&self) -> Option<usize> {
        (self.total > 0).then_some(0)
    }

    pub fn end(&self) -> Option<usize> {
        self.total.checked_sub(1)
    }

    pub fn apply(&self, current: usize, motion: Motion, rows_per_page: usize) -> Option<usize> {
        match motion {
            Motion::Step {
                direction,
                count,
                wrap: false,
            } => self.step(current, direction, count),
            Motion::Step {
                direction,
                count,
                wrap: true,
            } => self.cycle(current, direction, count),
            Motion::Page { direction } => self.page(current, direction, rows_per_page),
            Motion::Home => self.home(),
            Motion::End => self.end(),
        }
    }

    fn row_delta(&self, rows: usize) -> isize {
        signed(rows.saturating_mul(self.cols))
    }

    fn vertical(&self, current: usize, delta: isize) -> usize {
        let last = self.total - 1;
        let column = current % self.cols;
        let target = signed(current).saturating_add(delta);
        if target < 0 {
            return column;
        }
        let target = target as usize;
        if target > last {
            let bottom = self.total_cells() - self.cols + column;
            return bottom.min(last);
        }
        target
    }
}

fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}
