//! Layout and drawing: board, sidebar, pause and game-over overlays, removal fade.
//! Also maps terminal positions back to board cells for mouse input.

use crate::app::Screen;
use crate::board::{Board, Pos};
use crate::game::{BoardEvent, Busy, GameController};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// A block is CELL_W x CELL_H terminal cells; its last line is a half block so
/// vertically stacked blocks stay visually apart.
const CELL_W: u16 = 4;
const CELL_H: u16 = 2;
/// Blank columns between neighbouring blocks.
const MARGIN_X: u16 = 1;
/// Blank lines between neighbouring blocks.
const MARGIN_Y: u16 = 0;

const SIDEBAR_WIDTH: u16 = 26;

/// Widest board whose layout, border and sidebar still fit terminal coordinates.
pub const MAX_COLUMNS: usize =
    ((u16::MAX - 2 - SIDEBAR_WIDTH + MARGIN_X) / (CELL_W + MARGIN_X)) as usize;
/// Tallest board whose layout and border still fit terminal coordinates.
pub const MAX_ROWS: usize = ((u16::MAX - 2 + MARGIN_Y) / (CELL_H + MARGIN_Y)) as usize;

/// Removal fade length.
const REMOVAL_FADE_MS: u32 = 250;

pub type Game = GameController<Vec<BoardEvent>>;

/// Screen areas for one frame. Both drawing and click hit-testing go through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameLayout {
    pub board_outer: Rect,
    /// Board cells only, inside the border.
    pub board: Rect,
    pub sidebar: Rect,
}

/// Board size in terminal cells, without border. Sizes are bounded by
/// [`MAX_COLUMNS`] and [`MAX_ROWS`].
fn board_pixel_size(columns: usize, rows: usize) -> (u16, u16) {
    let w = (columns as u16) * (CELL_W + MARGIN_X) - MARGIN_X;
    let h = (rows as u16) * (CELL_H + MARGIN_Y) - MARGIN_Y;
    (w, h)
}

/// Smallest terminal (columns, rows) that shows the whole board and sidebar.
pub fn required_terminal_size(columns: usize, rows: usize) -> (u16, u16) {
    let (w, h) = board_pixel_size(columns, rows);
    (w + 2 + SIDEBAR_WIDTH, h + 2)
}

/// Board and sidebar centred in `area`.
pub fn game_layout(area: Rect, columns: usize, rows: usize) -> GameLayout {
    let (bw, bh) = board_pixel_size(columns, rows);
    let (outer_w, outer_h) = (bw + 2, bh + 2);
    let total_w = outer_w + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(outer_h) / 2;
    let board_outer = Rect {
        x,
        y,
        width: outer_w.min(area.width),
        height: outer_h.min(area.height),
    };
    let board = Rect {
        x: x + 1,
        y: y + 1,
        width: bw.min(board_outer.width.saturating_sub(2)),
        height: bh.min(board_outer.height.saturating_sub(2)),
    };
    let sidebar_x = x + outer_w;
    let sidebar = Rect {
        x: sidebar_x.min(area.right()),
        y,
        width: SIDEBAR_WIDTH.min(area.right().saturating_sub(sidebar_x)),
        height: board_outer.height,
    };
    GameLayout {
        board_outer,
        board,
        sidebar,
    }
}

/// Terminal rect of one block: `origin + index * (cell + margin)` on each axis.
pub fn cell_rect(board_rect: Rect, pos: Pos) -> Rect {
    Rect {
        x: board_rect.x.saturating_add(pos.col as u16 * (CELL_W + MARGIN_X)),
        y: board_rect.y.saturating_add(pos.row as u16 * (CELL_H + MARGIN_Y)),
        width: CELL_W,
        height: CELL_H,
    }
}

/// Board cell under a terminal position. None on margins and outside the board.
pub fn cell_at(board_rect: Rect, board: &Board, x: u16, y: u16) -> Option<Pos> {
    if !board_rect.contains(Position { x, y }) {
        return None;
    }
    let (dx, dy) = (x - board_rect.x, y - board_rect.y);
    let (pitch_x, pitch_y) = (CELL_W + MARGIN_X, CELL_H + MARGIN_Y);
    if dx % pitch_x >= CELL_W || dy % pitch_y >= CELL_H {
        return None;
    }
    let pos = Pos::new(usize::from(dx / pitch_x), usize::from(dy / pitch_y));
    board.contains(pos).then_some(pos)
}

/// Buffer positions covered by the given cells, clipped to the board.
fn buffer_positions(board_rect: Rect, cells: &[Pos]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &pos in cells {
        let r = cell_rect(board_rect, pos).intersection(board_rect);
        for bx in r.left()..r.right() {
            for by in r.top()..r.bottom() {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Milliseconds the fade advances this frame. Zero while paused, so the fade
/// resumes where it stopped.
fn removal_step_ms(last: &mut Option<Instant>, now: Instant, paused: bool) -> u32 {
    let delta = last
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    *last = Some(now);
    if paused {
        return 0;
    }
    delta.as_millis().min(u32::MAX as u128) as u32
}

/// Create or advance the fade over cells pending removal.
fn apply_removal_effect(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    board_rect: Rect,
    removal_effect: &mut Option<Effect>,
    removal_effect_time: &mut Option<Instant>,
    paused: bool,
    now: Instant,
) {
    let Some(pending) = game.pending_removal().filter(|c| !c.is_empty()) else {
        return;
    };
    let delta_ms = removal_step_ms(removal_effect_time, now, paused);

    if removal_effect.is_none() {
        let fading = buffer_positions(board_rect, pending.cells());
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            fading.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (REMOVAL_FADE_MS, Interpolation::QuadOut))
            .with_filter(filter)
            .with_area(board_rect);
        *removal_effect = Some(effect);
    }

    if let Some(effect) = removal_effect {
        frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
    }
}

/// Draw the current screen. While a group is pending removal and animation is on,
/// runs the fade and updates `removal_effect` / `removal_effect_time`. The fade
/// holds still while paused.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    game: &Game,
    theme: &Theme,
    paused: bool,
    cursor: Pos,
    removal_effect: &mut Option<Effect>,
    removal_effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    let board = game.board();
    let layout = game_layout(area, board.columns(), board.rows());

    draw_board(frame, game, theme, layout, (screen == Screen::Playing).then_some(cursor));
    draw_sidebar(frame, game, theme, layout.sidebar, now);
    apply_removal_effect(
        frame,
        game,
        theme,
        layout.board,
        removal_effect,
        removal_effect_time,
        paused && screen == Screen::Playing,
        now,
    );

    let (need_w, need_h) = required_terminal_size(board.columns(), board.rows());
    if area.width < need_w || area.height < need_h {
        draw_too_small(frame, theme, area, need_w, need_h);
    }

    match screen {
        Screen::Playing if paused => draw_pause_overlay(frame, theme, layout.board_outer),
        Screen::Playing => {}
        Screen::GameOver => draw_game_over(frame, game, theme, layout.board_outer),
    }
}

fn draw_board(frame: &mut Frame, game: &Game, theme: &Theme, layout: GameLayout, cursor: Option<Pos>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg))
        .title(Span::styled(" Blockfall ", Style::default().fg(theme.title)));
    block.render(layout.board_outer, frame.buffer_mut());

    let board = game.board();
    let pending = game.pending_removal();
    let clip = layout.board;
    let buf = frame.buffer_mut();
    for row in 0..board.rows() {
        for col in 0..board.columns() {
            let pos = Pos::new(col, row);
            let rect = cell_rect(clip, pos);
            if !rect.intersects(clip) {
                continue;
            }
            let cell = board.get(pos);
            let removing = pending.is_some_and(|c| c.contains(pos));
            let fill = cell.map(|c| theme.block_color(c.color));
            for dy in 0..CELL_H {
                for dx in 0..CELL_W {
                    let (x, y) = (rect.x.saturating_add(dx), rect.y.saturating_add(dy));
                    if !clip.contains(Position { x, y }) {
                        continue;
                    }
                    let last_line = dy == CELL_H - 1;
                    let under_cursor = cursor == Some(pos) && last_line;
                    let lower_bg = if under_cursor { theme.title } else { theme.bg };
                    let (symbol, style) = match fill {
                        Some(c) if last_line => ("▀", Style::default().fg(c).bg(lower_bg)),
                        Some(c) if removing => ("▓", Style::default().fg(c).bg(theme.bg)),
                        Some(c) => ("█", Style::default().fg(c).bg(theme.bg)),
                        // Mark the loss line on empty top-row slots.
                        None if row == 0 && !last_line && dx == CELL_W / 2 => {
                            ("·", Style::default().fg(theme.inactive_fg).bg(theme.bg))
                        }
                        None if under_cursor => ("▔", Style::default().fg(theme.title).bg(theme.bg)),
                        None => (" ", Style::default().bg(theme.bg)),
                    };
                    buf[(x, y)].set_symbol(symbol).set_style(style);
                }
            }
        }
    }
}

fn sidebar_line<'a>(label: &'a str, value: String, theme: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {label:<10}"), Style::default().fg(theme.inactive_fg)),
        Span::styled(value, Style::default().fg(theme.main_fg)),
    ])
}

fn draw_sidebar(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect, now: Instant) {
    if area.width < 4 || area.height < 4 {
        return;
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let board = game.board();
    let headroom = board.headroom();
    let headroom_color = match headroom {
        _ if game.is_game_over() => Color::Red,
        1 | 2 => Color::Yellow,
        _ => theme.main_fg,
    };
    let state = match game.busy() {
        Busy::Idle if game.is_finished() => "over".to_string(),
        Busy::Idle => "ready".to_string(),
        Busy::Adding => "rising".to_string(),
        Busy::Deleting(c) => format!("clearing {}", c.len()),
    };
    let mut lines = vec![
        Line::from(""),
        sidebar_line("Board", format!("{}x{}", board.columns(), board.rows()), theme),
        sidebar_line("Blocks", board.occupied().to_string(), theme),
        sidebar_line("Cleared", game.removed_total().to_string(), theme),
        Line::from(vec![
            Span::styled(format!(" {:<10}", "Headroom"), Style::default().fg(theme.inactive_fg)),
            Span::styled(format!("{headroom} rows"), Style::default().fg(headroom_color)),
        ]),
        sidebar_line("State", state, theme),
        Line::from(""),
        Line::from(Span::styled(" Next row", Style::default().fg(theme.inactive_fg))),
    ];
    let text_h = lines.len() as u16;
    lines.push(Line::from(""));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Click / Space  clear",
        Style::default().fg(theme.inactive_fg),
    )));
    lines.push(Line::from(Span::styled(
        " P pause  R restart",
        Style::default().fg(theme.inactive_fg),
    )));
    lines.push(Line::from(Span::styled(" Q quit", Style::default().fg(theme.inactive_fg))));
    Paragraph::new(lines).render(inner, frame.buffer_mut());

    let interval = game.spawn_interval().as_secs_f64();
    let remaining = game
        .time_until_spawn(now)
        .map_or(interval, |d| d.as_secs_f64());
    let ratio = if interval > 0.0 {
        (1.0 - remaining / interval).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let gauge_area = Rect {
        x: inner.x + 1,
        y: inner.y + text_h,
        width: inner.width.saturating_sub(2),
        height: 1,
    }
    .intersection(inner);
    Gauge::default()
        .gauge_style(Style::default().fg(theme.title).bg(theme.div_line))
        .label(format!("{remaining:.1}s"))
        .ratio(ratio)
        .render(gauge_area, frame.buffer_mut());
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 30, 8);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Cleared: {} ", game.removed_total()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R — Restart    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg))
            .title(Span::styled(" Blockfall ", Style::default().fg(theme.title))),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_too_small(frame: &mut Frame, theme: &Theme, area: Rect, need_w: u16, need_h: u16) {
    let msg = format!(
        " Terminal {}x{}, need {}x{} ",
        area.width, area.height, need_w, need_h
    );
    let line = Line::from(Span::styled(
        msg,
        Style::default().fg(Color::Black).bg(theme.title),
    ));
    let bar = Rect {
        height: 1.min(area.height),
        ..area
    };
    Paragraph::new(line).alignment(Alignment::Center).render(bar, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn area() -> Rect {
        Rect::new(0, 0, 100, 30)
    }

    #[test]
    fn test_layout_centres_board_and_sidebar() {
        let layout = game_layout(area(), 3, 2);
        // 3 columns: 3 * (4 + 1) - 1 = 14 wide; 2 rows: 4 high; plus border.
        assert_eq!(layout.board_outer, Rect::new(30, 12, 16, 6));
        assert_eq!(layout.board, Rect::new(31, 13, 14, 4));
        assert_eq!(layout.sidebar.x, 46);
        assert_eq!(layout.sidebar.width, SIDEBAR_WIDTH);
    }

    #[test]
    fn test_cell_rect_follows_index_times_pitch() {
        let board_rect = Rect::new(31, 13, 14, 4);
        assert_eq!(cell_rect(board_rect, Pos::new(0, 0)), Rect::new(31, 13, 4, 2));
        assert_eq!(cell_rect(board_rect, Pos::new(2, 1)), Rect::new(41, 15, 4, 2));
    }

    #[test]
    fn test_cell_at_maps_clicks() {
        let board = Board::new(3, 2);
        let rect = game_layout(area(), 3, 2).board;
        assert_eq!(cell_at(rect, &board, 31, 13), Some(Pos::new(0, 0)));
        assert_eq!(cell_at(rect, &board, 34, 14), Some(Pos::new(0, 0)));
        assert_eq!(cell_at(rect, &board, 36, 14), Some(Pos::new(1, 0)));
        assert_eq!(cell_at(rect, &board, 41, 15), Some(Pos::new(2, 1)));
        assert_eq!(cell_at(rect, &board, 44, 16), Some(Pos::new(2, 1)));
    }

    #[test]
    fn test_cell_at_rejects_margins_and_outside() {
        let board = Board::new(3, 2);
        let rect = game_layout(area(), 3, 2).board;
        assert_eq!(cell_at(rect, &board, 35, 13), None); // gap between columns 0 and 1
        assert_eq!(cell_at(rect, &board, 30, 13), None); // border
        assert_eq!(cell_at(rect, &board, 31, 17), None); // below last row
        assert_eq!(cell_at(rect, &board, 45, 13), None); // right border
    }

    #[test]
    fn test_cell_at_inverts_cell_rect() {
        let board = Board::new(5, 4);
        let rect = game_layout(area(), 5, 4).board;
        for row in 0..4 {
            for col in 0..5 {
                let pos = Pos::new(col, row);
                let r = cell_rect(rect, pos);
                assert_eq!(cell_at(rect, &board, r.x, r.y), Some(pos));
                assert_eq!(cell_at(rect, &board, r.right() - 1, r.bottom() - 1), Some(pos));
            }
        }
    }

    #[test]
    fn test_buffer_positions_cover_cells() {
        let rect = Rect::new(0, 0, 14, 4);
        let set = buffer_positions(rect, &[Pos::new(0, 0), Pos::new(2, 1)]);
        assert_eq!(set.len(), 16);
        assert!(set.contains(&(0, 0)));
        assert!(set.contains(&(13, 3)));
        assert!(!set.contains(&(4, 0)));
    }

    #[test]
    fn test_removal_step_holds_while_paused() {
        let start = Instant::now();
        let mut last = None;
        assert_eq!(removal_step_ms(&mut last, start, false), 0);
        assert_eq!(removal_step_ms(&mut last, start + Duration::from_millis(40), false), 40);
        // Paused frames do not advance, and resuming does not catch up.
        assert_eq!(removal_step_ms(&mut last, start + Duration::from_millis(500), true), 0);
        assert_eq!(removal_step_ms(&mut last, start + Duration::from_millis(900), true), 0);
        assert_eq!(removal_step_ms(&mut last, start + Duration::from_millis(916), false), 16);
    }

    #[test]
    fn test_required_terminal_size() {
        assert_eq!(required_terminal_size(13, 11), (64 + 2 + SIDEBAR_WIDTH, 24));
    }

    #[test]
    fn test_largest_board_layout_fits() {
        let (w, h) = required_terminal_size(MAX_COLUMNS, MAX_ROWS);
        assert!(w >= u16::MAX - (CELL_W + MARGIN_X));
        assert!(h >= u16::MAX - (CELL_H + MARGIN_Y));
        let full = Rect {
            x: 0,
            y: 0,
            width: u16::MAX,
            height: u16::MAX,
        };
        let layout = game_layout(full, MAX_COLUMNS, MAX_ROWS);
        let corner = cell_rect(layout.board, Pos::new(MAX_COLUMNS - 1, MAX_ROWS - 1));
        assert!(corner.right() <= layout.board.right());
        assert!(corner.bottom() <= layout.board.bottom());
    }
}
