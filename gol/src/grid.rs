// grid.rs - Toroidal boolean grid for Conway's Game of Life

use serde::{Deserialize, Serialize};

use crate::error::{GolError, Result};

/// Byte value an image uses for a live cell.
pub const ALIVE_BYTE: u8 = 255;
pub const DEAD_BYTE: u8 = 0;

/// A cell coordinate: `x` is the column, `y` the row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

/// Fixed-size `height x width` grid stored row-major.
///
/// Reads through [`Grid::alive`] wrap around both edges, so the grid behaves
/// like a torus. Writes through [`Grid::set`] do not wrap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    /// Builds a grid from row-major image samples; `255` is alive, anything else dead.
    pub fn from_bytes(width: usize, height: usize, bytes: &[u8]) -> Result<Self> {
        if width.checked_mul(height) != Some(bytes.len()) {
            return Err(GolError::Image(format!(
                "expected {height}x{width} samples, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cells: bytes.iter().map(|&b| b == ALIVE_BYTE).collect(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells
            .iter()
            .map(|&alive| if alive { ALIVE_BYTE } else { DEAD_BYTE })
            .collect()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// False when the buffer does not match the declared dimensions,
    /// which can only happen for grids that came off the wire.
    pub fn is_consistent(&self) -> bool {
        self.width.checked_mul(self.height) == Some(self.cells.len())
    }

    /// Cell state with both coordinates wrapped onto the torus.
    pub fn alive(&self, row: isize, col: isize) -> bool {
        let r = row.rem_euclid(self.height as isize) as usize;
        let c = col.rem_euclid(self.width as isize) as usize;
        self.cells[r * self.width + c]
    }

    pub fn set(&mut self, row: usize, col: usize, alive: bool) {
        assert!(row < self.height && col < self.width, "cell ({row}, {col}) outside grid");
        self.cells[row * self.width + col] = alive;
    }

    /// Inverts one cell; used to replay cell-flip events onto a copy of the grid.
    pub fn toggle(&mut self, row: usize, col: usize) {
        let alive = self.alive(row as isize, col as isize);
        self.set(row, col, !alive);
    }

    /// State of `(row, col)` in the next generation.
    pub fn next_state(&self, row: usize, col: usize) -> bool {
        let (row, col) = (row as isize, col as isize);
        let mut count = 0;
        for dr in -1..=1 {
            for dc in -1..=1 {
                if (dr != 0 || dc != 0) && self.alive(row + dr, col + dc) {
                    count += 1;
                }
            }
        }

        match (self.alive(row, col), count) {
            (true, 2) | (_, 3) => true, // Survival or birth
            _ => false,
        }
    }

    /// Writes the next-generation state of rows `first_row..` into `out`,
    /// which must hold a whole number of rows.
    pub(crate) fn next_rows_into(&self, first_row: usize, out: &mut [bool]) {
        for (i, cell) in out.iter_mut().enumerate() {
            *cell = self.next_state(first_row + i / self.width, i % self.width);
        }
    }

    pub(crate) fn rows(&self, start: usize, end: usize) -> &[bool] {
        &self.cells[start * self.width..end * self.width]
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [bool] {
        &mut self.cells
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&alive| alive).count()
    }

    /// Coordinates of every live cell in row-major order.
    pub fn alive_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &alive)| alive)
            .map(|(i, _)| Cell { x: i % self.width, y: i / self.width })
            .collect()
    }

    /// Coordinates whose state differs between `self` and `other`, row-major.
    pub fn flipped_cells(&self, other: &Grid) -> Vec<Cell> {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.cells
            .iter()
            .zip(&other.cells)
            .enumerate()
            .filter(|&(_, (a, b))| a != b)
            .map(|(i, _)| Cell { x: i % self.width, y: i / self.width })
            .collect()
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }
}
