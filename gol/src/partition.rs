// partition.rs - Splits an axis range into contiguous per-worker bands

use serde::{Deserialize, Serialize};

use crate::error::{GolError, Result};

/// Half-open index range `[start, end)` owned by one worker for one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub start: usize,
    pub end: usize,
}

impl Band {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Divides `range` into `threads` bands of `len / threads` indices each;
/// the last band also takes the remainder.
pub fn partition(range: Band, threads: usize) -> Result<Vec<Band>> {
    let len = range.len();
    if threads == 0 || threads > len {
        return Err(GolError::Configuration(format!(
            "cannot split {len} rows between {threads} threads"
        )));
    }

    let size = len / threads;
    let bands = (0..threads)
        .map(|i| {
            let start = range.start + i * size;
            let end = if i == threads - 1 { range.end } else { start + size };
            Band { start, end }
        })
        .collect();
    Ok(bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_thread_gets_whole_range() {
        assert_eq!(partition(Band::new(3, 10), 1).unwrap(), vec![Band::new(3, 10)]);
    }

    #[test]
    fn last_band_absorbs_remainder() {
        let bands = partition(Band::new(0, 10), 3).unwrap();
        assert_eq!(bands, vec![Band::new(0, 3), Band::new(3, 6), Band::new(6, 10)]);
    }

    #[test]
    fn rejects_zero_and_too_many_threads() {
        assert!(matches!(partition(Band::new(0, 4), 0), Err(GolError::Configuration(_))));
        assert!(matches!(partition(Band::new(0, 4), 5), Err(GolError::Configuration(_))));
        assert!(matches!(partition(Band::new(2, 2), 1), Err(GolError::Configuration(_))));
    }

    proptest! {
        #[test]
        fn bands_tile_the_range((start, len, threads) in (0usize..50, 1usize..200)
            .prop_flat_map(|(s, l)| (Just(s), Just(l), 1..=l)))
        {
            let range = Band::new(start, start + len);
            let bands = partition(range, threads).unwrap();
            prop_assert_eq!(bands.len(), threads);
            prop_assert_eq!(bands[0].start, range.start);
            prop_assert_eq!(bands[threads - 1].end, range.end);
            for pair in bands.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            prop_assert!(bands.iter().all(|b| !b.is_empty()));
        }
    }
}
