//! App: terminal init, main loop, spawn timer and input handling.

use crate::board::Pos;
use crate::game::BoardEvent;
use crate::input::{Action, key_to_action, mouse_to_action};
use crate::theme::Theme;
use crate::ui::{self, Game};
use crate::{GameConfig, log_info, vlog};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Frame budget for drawing and event polling (~60 FPS).
const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    game: Game,
    screen: Screen,
    paused_at: Option<Instant>,
    cursor: Pos,
    /// Games started so far; offsets the seed on restart.
    games: u64,
    /// Terminal area of the last drawn frame, for mouse hit-testing.
    last_area: Rect,
    removal_effect: Option<Effect>,
    removal_effect_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let game = Game::new(&config, Vec::new())?;
        let cursor = bottom_left(&game);
        Ok(Self {
            config,
            theme,
            game,
            screen: Screen::Playing,
            paused_at: None,
            cursor,
            games: 1,
            last_area: Rect::default(),
            removal_effect: None,
            removal_effect_time: None,
        })
    }

    fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    fn reset_game(&mut self, now: Instant) -> Result<()> {
        let config = GameConfig {
            seed: self.config.seed.wrapping_add(self.games),
            ..self.config.clone()
        };
        self.games += 1;
        log_info!("restart: game {} seed {}", self.games, config.seed);
        self.game = Game::new(&config, Vec::new())?;
        self.game.start(now);
        self.cursor = bottom_left(&self.game);
        self.screen = Screen::Playing;
        self.paused_at = None;
        self.removal_effect = None;
        self.removal_effect_time = None;
        Ok(())
    }

    fn toggle_pause(&mut self, now: Instant) {
        match self.paused_at.take() {
            Some(since) => {
                self.game.pause_for(now.saturating_duration_since(since));
                vlog!("resumed");
            }
            None => {
                self.paused_at = Some(now);
                vlog!("paused");
            }
        }
    }

    fn select(&mut self, pos: Pos) {
        self.cursor = pos;
        self.game.handle_click(pos);
    }

    /// Returns false when the app should quit.
    fn apply_action(&mut self, action: Action, now: Instant) -> Result<bool> {
        match action {
            Action::Quit => return Ok(false),
            Action::Restart => self.reset_game(now)?,
            Action::Pause if self.screen == Screen::Playing => self.toggle_pause(now),
            _ if self.screen != Screen::Playing || self.is_paused() => {}
            Action::Select => self.select(self.cursor),
            Action::Click(x, y) => {
                let board = self.game.board();
                let rect = ui::game_layout(self.last_area, board.columns(), board.rows()).board;
                if let Some(pos) = ui::cell_at(rect, board, x, y) {
                    self.select(pos);
                }
            }
            Action::CursorLeft | Action::CursorRight | Action::CursorUp | Action::CursorDown => {
                let board = self.game.board();
                self.cursor = step_cursor(self.cursor, action, board.columns(), board.rows());
            }
            Action::Pause | Action::None => {}
        }
        Ok(true)
    }

    /// Spawn tick and listener events for one frame.
    fn update(&mut self, now: Instant) {
        if self.screen == Screen::Playing && !self.is_paused() {
            self.game.tick(now);
        }
        for event in std::mem::take(self.game.listener_mut()) {
            if event == BoardEvent::GameOver {
                self.screen = Screen::GameOver;
                self.paused_at = None;
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        self.game.start(Instant::now());
        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        log_info!("exit");

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let paused = self.is_paused();
            let mut area = self.last_area;
            terminal.draw(|f| {
                area = f.area();
                ui::draw(
                    f,
                    self.screen,
                    &self.game,
                    &self.theme,
                    paused,
                    self.cursor,
                    &mut self.removal_effect,
                    &mut self.removal_effect_time,
                    now,
                )
            })?;
            self.last_area = area;

            if !paused
                && self.game.pending_removal().is_some()
                && self.removal_effect.as_ref().is_some_and(|e| e.done())
            {
                self.game.finish_deletion();
                self.removal_effect = None;
                self.removal_effect_time = None;
            }

            let timeout = FRAME.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let action = match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => key_to_action(key),
                        Event::Mouse(mouse) => mouse_to_action(mouse),
                        _ => continue,
                    };
                    if !self.apply_action(action, Instant::now())? {
                        return Ok(());
                    }
                }
            }

            self.update(Instant::now());
        }
    }
}

fn bottom_left(game: &Game) -> Pos {
    Pos::new(0, game.board().rows() - 1)
}

/// Move the keyboard cursor one cell, clamped to the board.
fn step_cursor(cursor: Pos, action: Action, columns: usize, rows: usize) -> Pos {
    let Pos { col, row } = cursor;
    match action {
        Action::CursorLeft => Pos::new(col.saturating_sub(1), row),
        Action::CursorRight => Pos::new((col + 1).min(columns - 1), row),
        Action::CursorUp => Pos::new(col, row.saturating_sub(1)),
        Action::CursorDown => Pos::new(col, (row + 1).min(rows - 1)),
        _ => cursor,
    }
}
