use std::collections::BTreeSet;

const DEFAULT_INTERVAL: usize = 8;

/// Tab stop columns. Defaults to a stop at every eighth column; HTS adds
/// stops, TBC removes them, and a resize keeps custom stops that still fit
/// while re-seeding the defaults for the new width.
#[derive(Debug, Clone)]
pub struct TabStops {
    stops: BTreeSet<usize>,
    width: usize,
}

impl TabStops {
    pub fn new(width: usize) -> Self {
        let mut stops = BTreeSet::new();
        seed_defaults(&mut stops, width);
        Self { stops, width }
    }

    /// Next stop strictly after `col`, if any.
    pub fn next_after(&self, col: usize) -> Option<usize> {
        self.stops.range(col + 1..self.width).next().copied()
    }

    pub fn set(&mut self, col: usize) {
        if col < self.width {
            self.stops.insert(col);
        }
    }

    pub fn clear(&mut self, col: usize) {
        self.stops.remove(&col);
    }

    /// TBC 3: drop everything, then restore the default grid.
    pub fn clear_all(&mut self) {
        self.stops.clear();
        seed_defaults(&mut self.stops, self.width);
    }

    /// Rebuild for a new width: prior stops that still fit are kept and the
    /// default grid is guaranteed present.
    pub fn resize(&mut self, width: usize) {
        self.stops.retain(|&c| c < width);
        self.width = width;
        seed_defaults(&mut self.stops, width);
    }

    pub fn is_set(&self, col: usize) -> bool {
        self.stops.contains(&col)
    }
}

fn seed_defaults(stops: &mut BTreeSet<usize>, width: usize) {
    for col in (0..width).step_by(DEFAULT_INTERVAL) {
        stops.insert(col);
    }
}
