// world.rs - Double-buffered generation store and the fork-join local stepper

use std::any::Any;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{GolError, Result};
use crate::grid::{Cell, Grid};
use crate::partition::{Band, partition};

/// Two equally sized grids plus the index of the one holding the current generation.
///
/// The other buffer holds the previous generation between steps and is the
/// write target of the next step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct World {
    grids: [Grid; 2],
    active: usize,
    threads: usize,
}

/// Wire form of a [`World`]: the current generation plus the run's dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorldSnapshot {
    pub width: usize,
    pub height: usize,
    pub threads: usize,
    pub grid: Grid,
}

impl World {
    pub fn new(width: usize, height: usize, threads: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GolError::Configuration(format!(
                "grid must be non-empty, got {height}x{width}"
            )));
        }
        if threads == 0 || threads > height {
            return Err(GolError::Configuration(format!(
                "thread count must be between 1 and {height}, got {threads}"
            )));
        }
        Ok(Self {
            grids: [Grid::new(width, height), Grid::new(width, height)],
            active: 0,
            threads,
        })
    }

    /// Seeds the world with `grid` as the current generation and an empty previous one.
    pub fn with_grid(grid: Grid, threads: usize) -> Result<Self> {
        let mut world = Self::new(grid.width(), grid.height(), threads)?;
        world.grids[world.active] = grid;
        Ok(world)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.grids[0].width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.grids[0].height()
    }

    #[inline]
    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn current(&self) -> &Grid {
        &self.grids[self.active]
    }

    pub fn previous(&self) -> &Grid {
        &self.grids[self.active ^ 1]
    }

    pub fn alive_count(&self) -> usize {
        self.current().alive_count()
    }

    pub fn alive_cells(&self) -> Vec<Cell> {
        self.current().alive_cells()
    }

    /// Cells whose state changed between the previous and the current generation.
    pub fn flipped_cells(&self) -> Vec<Cell> {
        self.current().flipped_cells(self.previous())
    }

    /// Copies the current generation out, e.g. for an RPC payload.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            width: self.width(),
            height: self.height(),
            threads: self.threads,
            grid: self.current().clone(),
        }
    }

    /// Advances the whole grid by one generation.
    pub fn step(&mut self) -> Result<()> {
        self.next_step(Band::new(0, self.height()))
    }

    /// Advances one generation, computing the rows of `band` with one thread per
    /// sub-band. Rows outside `band` carry over unchanged.
    ///
    /// Every worker reads only the current grid and writes only its own slice of
    /// the next one; the buffers are swapped after all workers have joined.
    pub fn next_step(&mut self, band: Band) -> Result<()> {
        let height = self.height();
        if band.end > height {
            return Err(GolError::Configuration(format!(
                "band {}..{} exceeds grid height {height}",
                band.start, band.end
            )));
        }
        let bands = partition(band, self.threads)?;
        let width = self.width();
        let (current, next) = self.buffers();

        let cells = next.cells_mut();
        let (head, rest) = cells.split_at_mut(band.start * width);
        let (mut body, tail) = rest.split_at_mut(band.len() * width);
        head.copy_from_slice(current.rows(0, band.start));
        tail.copy_from_slice(current.rows(band.end, height));

        let results: Vec<thread::Result<()>> = thread::scope(|s| {
            let mut handles = Vec::with_capacity(bands.len());
            for b in &bands {
                let (chunk, rest) = std::mem::take(&mut body).split_at_mut(b.len() * width);
                body = rest;
                let first_row = b.start;
                handles.push(s.spawn(move || current.next_rows_into(first_row, chunk)));
            }
            handles.into_iter().map(|handle| handle.join()).collect()
        });

        for result in results {
            result.map_err(|payload| GolError::StepFailed(panic_message(&*payload)))?;
        }

        self.active ^= 1;
        Ok(())
    }

    fn buffers(&mut self) -> (&Grid, &mut Grid) {
        let [a, b] = &mut self.grids;
        if self.active == 0 { (&*a, b) } else { (&*b, a) }
    }
}

impl TryFrom<WorldSnapshot> for World {
    type Error = GolError;

    fn try_from(snapshot: WorldSnapshot) -> Result<Self> {
        let WorldSnapshot { width, height, threads, grid } = snapshot;
        if !grid.is_consistent() || grid.width() != width || grid.height() != height {
            return Err(GolError::InvalidRequest(format!(
                "grid buffer does not match declared {height}x{width} dimensions"
            )));
        }
        World::with_grid(grid, threads).map_err(|err| GolError::InvalidRequest(err.to_string()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("worker panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{self, Pattern};
    use proptest::prelude::*;

    fn world_with(pattern: &Pattern, size: usize, threads: usize) -> World {
        let mut grid = Grid::new(size, size);
        patterns::apply_pattern(&mut grid, pattern, 0, 0);
        World::with_grid(grid, threads).unwrap()
    }

    #[test]
    fn dead_world_stays_dead() {
        let mut world = World::new(7, 5, 3).unwrap();
        for _ in 0..4 {
            world.step().unwrap();
            assert_eq!(world.alive_count(), 0);
        }
    }

    #[test]
    fn blinker_oscillates() {
        let mut world = world_with(&patterns::BLINKER, 5, 2);
        let vertical = world.current().clone();

        world.step().unwrap();
        let expected: Vec<Cell> = [(1, 2), (2, 2), (3, 2)]
            .iter()
            .map(|&(x, y)| Cell { x, y })
            .collect();
        assert_eq!(world.alive_cells(), expected);

        world.step().unwrap();
        assert_eq!(world.current(), &vertical);
    }

    #[test]
    fn block_is_still() {
        let mut world = world_with(&patterns::BLOCK, 6, 4);
        let block = world.current().clone();
        for _ in 0..5 {
            world.step().unwrap();
            assert_eq!(world.current(), &block);
        }
    }

    #[test]
    fn previous_generation_kept_for_diffing() {
        let mut world = world_with(&patterns::BLINKER, 5, 1);
        let before = world.current().clone();
        world.step().unwrap();
        assert_eq!(world.previous(), &before);
        assert_eq!(world.flipped_cells().len(), 4);
    }

    #[test]
    fn partial_band_carries_other_rows_over() {
        let mut world = world_with(&patterns::BLINKER, 5, 1);
        world.next_step(Band::new(0, 2)).unwrap();
        // Rows 2.. lie outside the band; a full step would have grown (2, 1).
        assert!(!world.current().alive(1, 2));
        assert!(world.current().alive(2, 2));
        assert!(!world.current().alive(2, 1));
        assert!(world.current().alive(3, 2));
    }

    #[test]
    fn rejects_bad_thread_counts() {
        assert!(matches!(World::new(4, 4, 0), Err(GolError::Configuration(_))));
        assert!(matches!(World::new(4, 4, 5), Err(GolError::Configuration(_))));
        assert!(matches!(World::new(0, 4, 1), Err(GolError::Configuration(_))));
    }

    #[test]
    fn rejects_band_past_the_grid() {
        let mut world = World::new(4, 4, 1).unwrap();
        assert!(matches!(world.next_step(Band::new(0, 5)), Err(GolError::Configuration(_))));
    }

    #[test]
    fn snapshot_round_trips_through_try_from() {
        let world = world_with(&patterns::GLIDER, 8, 3);
        let restored = World::try_from(world.snapshot()).unwrap();
        assert_eq!(restored.current(), world.current());
        assert_eq!(restored.threads(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn thread_count_does_not_change_results(
            (w, h, cells, threads) in (1usize..12, 1usize..12).prop_flat_map(|(w, h)| {
                (Just(w), Just(h), proptest::collection::vec(any::<bool>(), w * h), 1..=h)
            })
        ) {
            let bytes: Vec<u8> = cells.iter().map(|&a| if a { 255 } else { 0 }).collect();
            let grid = Grid::from_bytes(w, h, &bytes).unwrap();
            let mut single = World::with_grid(grid.clone(), 1).unwrap();
            let mut many = World::with_grid(grid, threads).unwrap();
            for _ in 0..4 {
                single.step().unwrap();
                many.step().unwrap();
                prop_assert_eq!(single.current(), many.current());
            }
        }
    }
}
