// patterns.rs - Well-known seed patterns, placed relative to an origin on the torus

use crate::grid::Grid;

pub struct Pattern {
    pub name: &'static str,
    /// `(row, col)` offsets from the pattern's origin.
    pub cells: &'static [(usize, usize)],
}

pub const BLINKER: Pattern = Pattern {
    name: "Blinker",
    cells: &[(1, 2), (2, 2), (3, 2)],
};

pub const BLOCK: Pattern = Pattern {
    name: "Block",
    cells: &[(1, 1), (1, 2), (2, 1), (2, 2)],
};

pub const GLIDER: Pattern = Pattern {
    name: "Glider",
    cells: &[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)],
};

pub const TOAD: Pattern = Pattern {
    name: "Toad",
    cells: &[(1, 2), (1, 3), (1, 4), (2, 1), (2, 2), (2, 3)],
};

pub const BEACON: Pattern = Pattern {
    name: "Beacon",
    cells: &[(0, 0), (0, 1), (1, 0), (1, 1), (2, 2), (2, 3), (3, 2), (3, 3)],
};

pub const R_PENTOMINO: Pattern = Pattern {
    name: "R-pentomino",
    cells: &[(0, 1), (0, 2), (1, 0), (1, 1), (2, 1)],
};

pub const PATTERNS: &[Pattern] = &[BLINKER, BLOCK, GLIDER, TOAD, BEACON, R_PENTOMINO];

pub fn find(name: &str) -> Option<&'static Pattern> {
    PATTERNS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Clears `grid` and draws `pattern` with its origin at `(row, col)`, wrapping at the edges.
pub fn apply_pattern(grid: &mut Grid, pattern: &Pattern, row: usize, col: usize) {
    grid.clear();
    for &(dr, dc) in pattern.cells {
        grid.set((row + dr) % grid.height(), (col + dc) % grid.width(), true);
    }
}
