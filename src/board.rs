//! Board: fixed-size grid of optional colored cells. Row 0 is the top (loss line).

use std::collections::VecDeque;
use std::fmt;

/// Grid coordinate. `col` grows to the right, `row` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub col: usize,
    pub row: usize,
}

impl Pos {
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// A single block. Colour index is in `0..variant_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub color: u8,
}

impl Cell {
    pub const fn new(color: u8) -> Self {
        Self { color }
    }
}

/// Playfield storage. `rows[y][x]`; rows[0] is top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    columns: usize,
    rows: VecDeque<Vec<Option<Cell>>>,
}

impl Board {
    pub fn new(columns: usize, rows: usize) -> Self {
        let rows = (0..rows).map(|_| vec![None; columns]).collect();
        Self { columns, rows }
    }

    /// Build a board from text rows, top first: `.` is empty, `0`..`9` a colour.
    #[cfg(test)]
    pub fn from_rows(text: &[&str]) -> Self {
        let columns = text.first().map_or(0, |r| r.len());
        let rows = text
            .iter()
            .map(|line| {
                assert_eq!(line.len(), columns, "ragged board row {line:?}");
                line.bytes()
                    .map(|b| match b {
                        b'.' => None,
                        b'0'..=b'9' => Some(Cell::new(b - b'0')),
                        other => panic!("bad board char {:?}", other as char),
                    })
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.col < self.columns && pos.row < self.rows.len()
    }

    /// Cell at `pos`. Panics when `pos` is off the board; check with [`Board::contains`].
    #[inline]
    pub fn get(&self, pos: Pos) -> Option<Cell> {
        self.rows[pos.row][pos.col]
    }

    #[inline]
    pub fn set(&mut self, pos: Pos, cell: Cell) {
        self.rows[pos.row][pos.col] = Some(cell);
    }

    /// Empties the slot and hands back what was there.
    #[inline]
    pub fn clear(&mut self, pos: Pos) -> Option<Cell> {
        self.rows[pos.row][pos.col].take()
    }

    pub fn is_column_empty(&self, col: usize) -> bool {
        self.rows.iter().all(|row| row[col].is_none())
    }

    /// Loss condition: anything in row 0.
    pub fn is_top_row_occupied(&self) -> bool {
        self.rows.front().is_some_and(|row| row.iter().any(Option::is_some))
    }

    #[cfg(test)]
    pub fn row(&self, row: usize) -> &[Option<Cell>] {
        &self.rows[row]
    }

    /// One column, top to bottom.
    pub fn column(&self, col: usize) -> Vec<Option<Cell>> {
        self.rows.iter().map(|row| row[col]).collect()
    }

    /// Overwrite one column, top to bottom. `cells.len()` must equal `rows()`.
    pub(crate) fn write_column(&mut self, col: usize, cells: &[Option<Cell>]) {
        debug_assert_eq!(cells.len(), self.rows.len());
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row[col] = *cell;
        }
    }

    /// Drops the top row and appends `bottom` below the last row.
    /// Returns the discarded top row.
    pub(crate) fn push_bottom_row(&mut self, bottom: Vec<Option<Cell>>) -> Vec<Option<Cell>> {
        debug_assert_eq!(bottom.len(), self.columns);
        let top = self.rows.pop_front().unwrap_or_default();
        self.rows.push_back(bottom);
        top
    }

    /// Occupied cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Pos, Cell)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(col, cell)| cell.map(|c| (Pos::new(col, row), c)))
        })
    }

    pub fn occupied(&self) -> usize {
        self.iter().count()
    }

    /// Rows between the top line and the highest occupied row.
    pub fn headroom(&self) -> usize {
        self.rows
            .iter()
            .position(|row| row.iter().any(Option::is_some))
            .unwrap_or(self.rows.len())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for cell in row {
                match cell {
                    Some(c) => write!(f, "{}", char::from_digit(u32::from(c.color), 36).unwrap_or('?'))?,
                    None => f.write_str(".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new(4, 3);
        assert_eq!(board.columns(), 4);
        assert_eq!(board.rows(), 3);
        assert_eq!(board.occupied(), 0);
        assert!(!board.is_top_row_occupied());
        assert!((0..4).all(|c| board.is_column_empty(c)));
        assert_eq!(board.headroom(), 3);
    }

    #[test]
    fn test_set_get_clear() {
        let mut board = Board::new(3, 3);
        let pos = Pos::new(2, 1);
        board.set(pos, Cell::new(3));
        assert_eq!(board.get(pos), Some(Cell::new(3)));
        assert!(!board.is_column_empty(2));
        assert_eq!(board.clear(pos), Some(Cell::new(3)));
        assert_eq!(board.get(pos), None);
        assert_eq!(board.clear(pos), None);
        assert!(board.is_column_empty(2));
    }

    #[test]
    fn test_top_row_occupied() {
        let mut board = Board::from_rows(&["...", "..1", "001"]);
        assert!(!board.is_top_row_occupied());
        assert_eq!(board.headroom(), 1);
        board.set(Pos::new(1, 0), Cell::new(2));
        assert!(board.is_top_row_occupied());
        assert_eq!(board.headroom(), 0);
    }

    #[test]
    fn test_contains() {
        let board = Board::new(2, 5);
        assert!(board.contains(Pos::new(1, 4)));
        assert!(!board.contains(Pos::new(2, 0)));
        assert!(!board.contains(Pos::new(0, 5)));
    }

    #[test]
    #[should_panic]
    fn test_get_out_of_range_panics() {
        let board = Board::new(2, 2);
        let _ = board.get(Pos::new(2, 0));
    }

    #[test]
    fn test_push_bottom_row_shifts_up() {
        let mut board = Board::from_rows(&["1.", ".2", "34"]);
        let dropped = board.push_bottom_row(vec![Some(Cell::new(5)), None]);
        assert_eq!(dropped, vec![Some(Cell::new(1)), None]);
        assert_eq!(board, Board::from_rows(&[".2", "34", "5."]));
    }

    #[test]
    fn test_iter_and_display() {
        let board = Board::from_rows(&["..", "10"]);
        let cells: Vec<_> = board.iter().collect();
        assert_eq!(
            cells,
            vec![(Pos::new(0, 1), Cell::new(1)), (Pos::new(1, 1), Cell::new(0))]
        );
        assert_eq!(board.to_string(), "..\n10\n");
    }

    #[test]
    fn test_column_roundtrip() {
        let mut board = Board::from_rows(&["1.", "..", "2."]);
        assert_eq!(board.column(0), vec![Some(Cell::new(1)), None, Some(Cell::new(2))]);
        board.write_column(1, &[None, Some(Cell::new(7)), None]);
        assert_eq!(board, Board::from_rows(&["1.", ".7", "2."]));
    }
}
