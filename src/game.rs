//! Game state: board, click handling, rising rows, busy window, game over.

use crate::board::{Board, Cell, Pos};
use crate::compactor;
use crate::matcher::{self, Component};
use crate::spawner::RowSpawner;
use crate::{ConfigError, GameConfig, log_info, vlog};
use std::time::{Duration, Instant};

/// Notifications for whoever draws the board. All methods default to no-ops.
pub trait BoardListener {
    fn cell_created(&mut self, _pos: Pos, _cell: Cell) {}
    fn cell_removed(&mut self, _pos: Pos, _cell: Cell) {}
    fn cell_moved(&mut self, _cell: Cell, _from: Pos, _to: Pos) {}
    fn game_over(&mut self) {}
}

impl BoardListener for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    Created { pos: Pos, cell: Cell },
    Removed { pos: Pos, cell: Cell },
    Moved { cell: Cell, from: Pos, to: Pos },
    GameOver,
}

impl BoardListener for Vec<BoardEvent> {
    fn cell_created(&mut self, pos: Pos, cell: Cell) {
        self.push(BoardEvent::Created { pos, cell });
    }

    fn cell_removed(&mut self, pos: Pos, cell: Cell) {
        self.push(BoardEvent::Removed { pos, cell });
    }

    fn cell_moved(&mut self, cell: Cell, from: Pos, to: Pos) {
        self.push(BoardEvent::Moved { cell, from, to });
    }

    fn game_over(&mut self) {
        self.push(BoardEvent::GameOver);
    }
}

/// At most one board mutation runs at a time; triggers arriving meanwhile are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Busy {
    #[default]
    Idle,
    /// A row spawn is in progress.
    Adding,
    /// A matched group is being removed (held for the removal animation when enabled).
    Deleting(Component),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Busy, finished, or off the board.
    Ignored,
    /// Group too small to remove; carries its size (0 for an empty cell).
    NoMatch(usize),
    /// Removal of a group of this size has started (or completed, without animation).
    Matched(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    NotDue,
    /// Due, but a deletion or spawn was in progress.
    Skipped,
    Spawned,
    /// Top row was occupied when the row was due.
    GameOver,
}

#[derive(Debug)]
pub struct GameController<L: BoardListener = ()> {
    board: Board,
    spawner: RowSpawner,
    busy: Busy,
    /// Latched when a due tick found the top row occupied.
    finished: bool,
    animate_removal: bool,
    removed_total: usize,
    listener: L,
}

impl<L: BoardListener> GameController<L> {
    /// Builds the board and fills the bottom `initial_rows` rows.
    pub fn new(config: &GameConfig, listener: L) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut board = Board::new(config.columns, config.rows);
        let mut spawner = RowSpawner::new(config.spawn_interval, config.variant_count, config.seed);
        let created = spawner.populate(&mut board, config.initial_rows);
        let mut this = Self {
            board,
            spawner,
            busy: Busy::Idle,
            finished: false,
            animate_removal: config.animate_removal,
            removed_total: 0,
            listener,
        };
        for (pos, cell) in created {
            this.listener.cell_created(pos, cell);
        }
        log_info!(
            "new game {}x{} colors={} seed={}",
            config.columns,
            config.rows,
            config.variant_count,
            config.seed
        );
        Ok(this)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn busy(&self) -> &Busy {
        &self.busy
    }

    pub fn is_busy(&self) -> bool {
        self.busy != Busy::Idle
    }

    /// Top row occupied: the board has reached the loss line.
    pub fn is_game_over(&self) -> bool {
        self.board.is_top_row_occupied()
    }

    /// The game-over signal has fired; the session accepts no more clicks.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Cells waiting for the removal animation to end.
    pub fn pending_removal(&self) -> Option<&Component> {
        match &self.busy {
            Busy::Deleting(component) => Some(component),
            _ => None,
        }
    }

    pub fn removed_total(&self) -> usize {
        self.removed_total
    }

    #[cfg(test)]
    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn spawn_interval(&self) -> Duration {
        self.spawner.interval()
    }

    pub fn time_until_spawn(&self, now: Instant) -> Option<Duration> {
        self.spawner.time_until_next(now)
    }

    /// Starts the row timer.
    pub fn start(&mut self, now: Instant) {
        self.spawner.start(now);
    }

    /// Holds the row timer back by `paused`.
    pub fn pause_for(&mut self, paused: Duration) {
        self.spawner.delay(paused);
    }

    /// Call every frame. Runs a spawn tick when the timer is due and reschedules it
    /// whatever the tick did.
    pub fn tick(&mut self, now: Instant) -> SpawnOutcome {
        if !self.spawner.is_due(now) {
            return SpawnOutcome::NotDue;
        }
        self.spawner.reschedule(now);
        self.on_spawn_tick()
    }

    /// One spawn tick: dropped while busy, game over when the top row is occupied,
    /// otherwise shift everything up and add a bottom row.
    pub fn on_spawn_tick(&mut self) -> SpawnOutcome {
        if self.finished {
            return SpawnOutcome::GameOver;
        }
        if self.is_busy() {
            vlog!("spawn skipped: busy ({:?})", self.busy);
            return SpawnOutcome::Skipped;
        }
        if self.board.is_top_row_occupied() {
            self.finished = true;
            log_info!("game over: top row occupied, removed {}", self.removed_total);
            self.listener.game_over();
            return SpawnOutcome::GameOver;
        }

        self.busy = Busy::Adding;
        let cycle = self.spawner.spawn_cycle(&mut self.board);
        for (pos, cell) in cycle.discarded {
            self.listener.cell_removed(pos, cell);
        }
        for m in cycle.moved {
            self.listener.cell_moved(m.cell, m.from, m.to);
        }
        for (pos, cell) in cycle.created {
            self.listener.cell_created(pos, cell);
        }
        self.busy = Busy::Idle;
        vlog!("row spawned, headroom {}", self.board.headroom());
        SpawnOutcome::Spawned
    }

    /// Pointer input at a grid coordinate.
    pub fn handle_click(&mut self, pos: Pos) -> ClickOutcome {
        if self.finished || self.is_busy() || !self.board.contains(pos) {
            vlog!("click {} ignored", pos);
            return ClickOutcome::Ignored;
        }
        let component = matcher::find_connected(&self.board, pos);
        let count = component.len();
        if count <= 1 {
            vlog!("click {}: group of {}, nothing removed", pos, count);
            return ClickOutcome::NoMatch(count);
        }

        vlog!("click {}: removing {} of colour {}", pos, count, component.color);
        self.busy = Busy::Deleting(component);
        if !self.animate_removal {
            self.finish_deletion();
        }
        ClickOutcome::Matched(count)
    }

    /// Removes the pending group, compacts the board and leaves the busy window.
    /// Returns how many cells were removed (0 when nothing was pending).
    pub fn finish_deletion(&mut self) -> usize {
        let component = match &mut self.busy {
            Busy::Deleting(component) => std::mem::take(component),
            _ => return 0,
        };

        let mut removed = 0;
        for &pos in component.cells() {
            if let Some(cell) = self.board.clear(pos) {
                self.listener.cell_removed(pos, cell);
                removed += 1;
            }
        }
        for m in compactor::compact(&mut self.board) {
            self.listener.cell_moved(m.cell, m.from, m.to);
        }
        self.removed_total += removed;
        self.busy = Busy::Idle;
        removed
    }
}

#[cfg(test)]
impl<L: BoardListener> GameController<L> {
    fn with_board(board: Board, animate_removal: bool, listener: L) -> Self {
        Self {
            spawner: RowSpawner::new(Duration::from_secs(1), 4, 0),
            board,
            busy: Busy::Idle,
            finished: false,
            animate_removal,
            removed_total: 0,
            listener,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(rows: &[&str]) -> GameController<Vec<BoardEvent>> {
        GameController::with_board(Board::from_rows(rows), false, Vec::new())
    }

    fn animated(rows: &[&str]) -> GameController<Vec<BoardEvent>> {
        GameController::with_board(Board::from_rows(rows), true, Vec::new())
    }

    #[test]
    fn test_new_populates_initial_rows() {
        let config = GameConfig {
            columns: 6,
            rows: 8,
            variant_count: 3,
            initial_rows: 2,
            ..GameConfig::default()
        };
        let game = GameController::new(&config, Vec::new()).unwrap();
        assert_eq!(game.board().occupied(), 12);
        assert_eq!(game.board().headroom(), 6);
        assert_eq!(game.listener().len(), 12);
        assert!(game.board().iter().all(|(_, c)| c.color < 3));
        assert!(!game.is_busy());
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let config = GameConfig {
            variant_count: 0,
            ..GameConfig::default()
        };
        assert_eq!(
            GameController::new(&config, ()).unwrap_err(),
            ConfigError::NoColors
        );
    }

    #[test]
    fn test_clear_whole_single_colour_board() {
        let mut game = game(&["000", "000", "000"]);
        assert_eq!(game.handle_click(Pos::new(1, 1)), ClickOutcome::Matched(9));
        assert_eq!(game.board().occupied(), 0);
        assert!((0..3).all(|c| game.board().is_column_empty(c)));
        assert_eq!(game.removed_total(), 9);

        let events = game.listener().len();
        assert_eq!(game.handle_click(Pos::new(0, 2)), ClickOutcome::NoMatch(0));
        assert_eq!(game.listener().len(), events);
    }

    #[test]
    fn test_single_block_is_not_removed() {
        let mut game = game(&["010"]);
        assert_eq!(game.handle_click(Pos::new(1, 0)), ClickOutcome::NoMatch(1));
        assert_eq!(game.board(), &Board::from_rows(&["010"]));
        assert!(game.listener().is_empty());
    }

    #[test]
    fn test_removes_exactly_the_group() {
        let mut game = game(&["...", "12.", "112"]);
        assert_eq!(game.handle_click(Pos::new(0, 2)), ClickOutcome::Matched(3));
        let removed: Vec<Pos> = game
            .listener()
            .iter()
            .filter_map(|e| match e {
                BoardEvent::Removed { pos, .. } => Some(*pos),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec![Pos::new(0, 1), Pos::new(0, 2), Pos::new(1, 2)]);
        // Column 0 is gone, so the 2s slide left and settle.
        assert_eq!(game.board(), &Board::from_rows(&["...", "...", "22."]));
    }

    #[test]
    fn test_emptied_outer_columns_compact_left() {
        let mut game = game(&["000", "010", "010"]);
        assert_eq!(game.handle_click(Pos::new(2, 2)), ClickOutcome::Matched(7));
        assert_eq!(game.board(), &Board::from_rows(&["...", "1..", "1.."]));
        assert!(game.board().is_column_empty(1));
        assert!(game.board().is_column_empty(2));
    }

    #[test]
    fn test_out_of_range_click_ignored() {
        let mut game = game(&["00"]);
        assert_eq!(game.handle_click(Pos::new(5, 0)), ClickOutcome::Ignored);
        assert_eq!(game.board().occupied(), 2);
    }

    #[test]
    fn test_busy_deleting_drops_clicks_and_spawns() {
        let mut game = animated(&["...", "00.", "111"]);
        assert_eq!(game.handle_click(Pos::new(0, 2)), ClickOutcome::Matched(3));
        assert_eq!(game.pending_removal().map(Component::len), Some(3));
        let snapshot = game.board().clone();

        assert_eq!(game.handle_click(Pos::new(0, 1)), ClickOutcome::Ignored);
        assert_eq!(game.on_spawn_tick(), SpawnOutcome::Skipped);
        assert_eq!(game.board(), &snapshot);
        assert!(game.listener().is_empty());

        assert_eq!(game.finish_deletion(), 3);
        assert!(!game.is_busy());
        assert_eq!(game.board(), &Board::from_rows(&["...", "...", "00."]));
        assert_eq!(game.handle_click(Pos::new(0, 2)), ClickOutcome::Matched(2));
    }

    #[test]
    fn test_busy_adding_drops_clicks() {
        let mut game = game(&["..", "00"]);
        game.busy = Busy::Adding;
        assert_eq!(game.handle_click(Pos::new(0, 1)), ClickOutcome::Ignored);
        assert_eq!(game.on_spawn_tick(), SpawnOutcome::Skipped);
        assert_eq!(game.board(), &Board::from_rows(&["..", "00"]));
        assert!(game.listener().is_empty());
    }

    #[test]
    fn test_finish_deletion_without_pending_is_noop() {
        let mut game = game(&["00"]);
        assert_eq!(game.finish_deletion(), 0);
        assert_eq!(game.busy(), &Busy::Idle);
        assert_eq!(game.board().occupied(), 2);
    }

    #[test]
    fn test_spawn_tick_shifts_and_fills() {
        let mut game = game(&["...", "...", "1.2"]);
        assert_eq!(game.on_spawn_tick(), SpawnOutcome::Spawned);
        assert_eq!(game.board().row(1), Board::from_rows(&["1.2"]).row(0));
        assert!(game.board().row(2).iter().all(Option::is_some));
        assert!(!game.is_busy());

        let created = game
            .listener()
            .iter()
            .filter(|e| matches!(e, BoardEvent::Created { .. }))
            .count();
        let moved = game
            .listener()
            .iter()
            .filter(|e| matches!(e, BoardEvent::Moved { .. }))
            .count();
        assert_eq!((created, moved), (3, 2));
    }

    #[test]
    fn test_game_over_fires_once_and_freezes() {
        let mut game = game(&["1..", "222"]);
        assert!(game.is_game_over());
        let snapshot = game.board().clone();

        assert_eq!(game.on_spawn_tick(), SpawnOutcome::GameOver);
        assert_eq!(game.on_spawn_tick(), SpawnOutcome::GameOver);
        assert_eq!(game.board(), &snapshot);
        assert_eq!(game.listener(), &vec![BoardEvent::GameOver]);
        assert!(game.is_finished());
        assert_eq!(game.handle_click(Pos::new(0, 1)), ClickOutcome::Ignored);
    }

    #[test]
    fn test_full_top_row_can_still_be_cleared_before_the_tick() {
        let mut game = game(&["11.", "22."]);
        assert!(game.is_game_over());
        assert_eq!(game.handle_click(Pos::new(0, 0)), ClickOutcome::Matched(2));
        assert!(!game.is_game_over());
        assert_eq!(game.on_spawn_tick(), SpawnOutcome::Spawned);
    }

    #[test]
    fn test_tick_reschedules_even_when_skipped() {
        let t0 = Instant::now();
        let second = Duration::from_secs(1);
        let mut game = animated(&["...", "..0", "..0"]);
        game.start(t0);
        assert_eq!(game.tick(t0), SpawnOutcome::NotDue);

        game.handle_click(Pos::new(2, 2));
        assert_eq!(game.tick(t0 + second), SpawnOutcome::Skipped);
        assert_eq!(game.tick(t0 + second), SpawnOutcome::NotDue);

        game.finish_deletion();
        assert_eq!(game.tick(t0 + second * 2), SpawnOutcome::Spawned);
    }
}
