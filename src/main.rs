//! Blockfall: click-to-clear block puzzle in the terminal. Rows rise from below;
//! clear same-coloured groups before the stack reaches the top.

mod app;
mod board;
mod compactor;
mod game;
mod input;
mod logging;
mod matcher;
mod spawner;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use rand::Rng as _;
use std::time::Duration;
use thiserror::Error;

/// Most colours the palettes can tell apart.
pub const MAX_COLORS: u8 = theme::BLOCK_COLORS as u8;

/// Options derived from CLI that shape a game session (board size, colours, row timer).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub columns: usize,
    pub rows: usize,
    pub variant_count: u8,
    pub initial_rows: usize,
    pub spawn_interval: Duration,
    pub seed: u64,
    pub animate_removal: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            columns: 13,
            rows: 11,
            variant_count: 4,
            initial_rows: 5,
            spawn_interval: Duration::from_secs(1),
            seed: 0,
            animate_removal: true,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board needs at least one column and one row (got {columns}x{rows})")]
    EmptyBoard { columns: usize, rows: usize },
    #[error(
        "board of {columns}x{rows} is too large (at most {max_columns}x{max_rows})",
        max_columns = ui::MAX_COLUMNS,
        max_rows = ui::MAX_ROWS
    )]
    BoardTooLarge { columns: usize, rows: usize },
    #[error("at least one colour is required")]
    NoColors,
    #[error("at most {max} colours are supported (got {0})", max = MAX_COLORS)]
    TooManyColors(u8),
    #[error("{initial} initial rows do not fit a board of {rows} rows")]
    TooManyInitialRows { initial: usize, rows: usize },
    #[error("row interval must be positive")]
    ZeroInterval,
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigError::EmptyBoard {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.columns > ui::MAX_COLUMNS || self.rows > ui::MAX_ROWS {
            return Err(ConfigError::BoardTooLarge {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.variant_count == 0 {
            return Err(ConfigError::NoColors);
        }
        if self.variant_count > MAX_COLORS {
            return Err(ConfigError::TooManyColors(self.variant_count));
        }
        if self.initial_rows > self.rows {
            return Err(ConfigError::TooManyInitialRows {
                initial: self.initial_rows,
                rows: self.rows,
            });
        }
        if self.spawn_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        logging::init(path, args.verbose)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette)
        .with_context(|| "failed to load theme")?;
    let config = GameConfig {
        columns: args.columns,
        rows: args.rows,
        variant_count: args.colors,
        initial_rows: args.initial_rows,
        spawn_interval: Duration::from_millis(args.interval_ms),
        seed: args.seed.unwrap_or_else(|| rand::rng().random()),
        animate_removal: !args.no_animation,
    };
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// Click-to-clear block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall",
    version,
    about = "Click-to-clear block puzzle in the terminal. Rows rise from below; clear groups before they reach the top.",
    long_about = "Blockfall is a terminal take on the classic collapse puzzle.\n\n\
        Click a block to remove it together with every same-coloured block touching it \
        (groups of two or more). Blocks fall to close the gaps and empty columns slide left. \
        Every interval a new row pushes the stack up; when a row is due while the top row is \
        occupied, the game is over.\n\n\
        CONTROLS:\n  Mouse       Click a block\n  Arrows/hjkl Move cursor   Space/Enter Select\n  \
        P           Pause         R           Restart      Q / Esc   Quit"
)]
pub struct Args {
    /// Board width in blocks.
    #[arg(long, default_value = "13", value_name = "COLS")]
    pub columns: usize,

    /// Board height in blocks.
    #[arg(long, default_value = "11", value_name = "ROWS")]
    pub rows: usize,

    /// Number of block colours (1 to 6).
    #[arg(short, long, default_value = "4", value_name = "N")]
    pub colors: u8,

    /// Rows filled at the bottom when a game starts.
    #[arg(long, default_value = "5", value_name = "N")]
    pub initial_rows: usize,

    /// Time between rising rows, in milliseconds.
    #[arg(short, long, default_value = "1000", value_name = "MS")]
    pub interval_ms: u64,

    /// Seed for block colours; random when not set.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Remove matched groups instantly instead of fading them out.
    #[arg(long)]
    pub no_animation: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write a debug log to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,

    /// Log every click and spawn (needs --log-file).
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(GameConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_config_errors() {
        let base = GameConfig::default();
        let cases = [
            (
                GameConfig { columns: 0, ..base.clone() },
                ConfigError::EmptyBoard { columns: 0, rows: 11 },
            ),
            (
                GameConfig { columns: ui::MAX_COLUMNS + 1, ..base.clone() },
                ConfigError::BoardTooLarge { columns: ui::MAX_COLUMNS + 1, rows: 11 },
            ),
            (
                GameConfig { rows: ui::MAX_ROWS + 1, initial_rows: 0, ..base.clone() },
                ConfigError::BoardTooLarge { columns: 13, rows: ui::MAX_ROWS + 1 },
            ),
            (
                GameConfig { columns: 20_000, ..base.clone() },
                ConfigError::BoardTooLarge { columns: 20_000, rows: 11 },
            ),
            (GameConfig { variant_count: 0, ..base.clone() }, ConfigError::NoColors),
            (GameConfig { variant_count: 7, ..base.clone() }, ConfigError::TooManyColors(7)),
            (
                GameConfig { initial_rows: 12, ..base.clone() },
                ConfigError::TooManyInitialRows { initial: 12, rows: 11 },
            ),
            (
                GameConfig { spawn_interval: Duration::ZERO, ..base.clone() },
                ConfigError::ZeroInterval,
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn test_largest_board_is_accepted() {
        let config = GameConfig {
            columns: ui::MAX_COLUMNS,
            rows: ui::MAX_ROWS,
            initial_rows: 0,
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_args_map_to_config() {
        let args = Args::parse_from([
            "blockfall",
            "--columns",
            "8",
            "--rows",
            "6",
            "-c",
            "3",
            "--seed",
            "5",
            "--palette",
            "colourblind",
        ]);
        assert_eq!((args.columns, args.rows, args.colors), (8, 6, 3));
        assert_eq!(args.seed, Some(5));
        assert_eq!(args.palette, Palette::Colorblind);
        assert_eq!(args.interval_ms, 1000);
        assert!(!args.no_animation);
    }
}
