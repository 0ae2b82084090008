//! Rising rows: a timer pushes the stack up one row and fills a fresh bottom row.

use crate::board::{Board, Cell, Pos};
use crate::compactor::Move;
use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use std::time::{Duration, Instant};

/// What one spawn cycle did to the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnCycle {
    /// Cells that moved up one row.
    pub moved: Vec<Move>,
    /// Cells pushed out past row 0.
    pub discarded: Vec<(Pos, Cell)>,
    /// The new bottom row.
    pub created: Vec<(Pos, Cell)>,
}

#[derive(Debug, Clone)]
pub struct RowSpawner {
    interval: Duration,
    next_due: Option<Instant>,
    variant_count: u8,
    rng: Pcg32,
}

impl RowSpawner {
    pub fn new(interval: Duration, variant_count: u8, seed: u64) -> Self {
        Self {
            interval,
            next_due: None,
            variant_count,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arms the timer; the first row arrives one interval from `now`.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Next tick one interval after `now`. Called on every due tick, spawned or not.
    pub fn reschedule(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    /// Pushes the pending tick back, e.g. by the time spent paused.
    pub fn delay(&mut self, by: Duration) {
        if let Some(due) = self.next_due.as_mut() {
            *due += by;
        }
    }

    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    fn random_cell(&mut self) -> Cell {
        Cell::new(self.rng.random_range(0..self.variant_count))
    }

    /// Fills the bottom `rows` rows with random colours.
    pub fn populate(&mut self, board: &mut Board, rows: usize) -> Vec<(Pos, Cell)> {
        let height = board.rows();
        let mut created = Vec::with_capacity(rows * board.columns());
        for row in height.saturating_sub(rows)..height {
            for col in 0..board.columns() {
                let pos = Pos::new(col, row);
                let cell = self.random_cell();
                board.set(pos, cell);
                created.push((pos, cell));
            }
        }
        created
    }

    /// Shifts every row up by one and fills every column of the new bottom row.
    /// Whatever sat in row 0 is discarded; callers check for a full board first.
    pub fn spawn_cycle(&mut self, board: &mut Board) -> SpawnCycle {
        let mut cycle = SpawnCycle::default();
        for (pos, cell) in board.iter() {
            if pos.row == 0 {
                cycle.discarded.push((pos, cell));
            } else {
                cycle.moved.push(Move {
                    cell,
                    from: pos,
                    to: Pos::new(pos.col, pos.row - 1),
                });
            }
        }

        let bottom: Vec<Option<Cell>> = (0..board.columns())
            .map(|_| Some(self.random_cell()))
            .collect();
        board.push_bottom_row(bottom);

        let last = board.rows() - 1;
        cycle.created = (0..board.columns())
            .filter_map(|col| {
                let pos = Pos::new(col, last);
                board.get(pos).map(|cell| (pos, cell))
            })
            .collect();
        cycle
    }
}
