//! Gravity after a removal: settle each column downward, then close empty columns.

use crate::board::{Board, Cell, Pos};

/// One cell relocated by compaction or by a row shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub cell: Cell,
    pub from: Pos,
    pub to: Pos,
}

/// Settle, then compact. Moves are listed in the order they were applied, so a cell
/// may appear twice (once falling, once sliding left).
pub fn compact(board: &mut Board) -> Vec<Move> {
    let mut moves = settle_columns(board);
    moves.extend(compact_columns(board));
    moves
}

/// Each column becomes its empty slots on top and its cells below, in their
/// original top-to-bottom order.
pub fn settle_columns(board: &mut Board) -> Vec<Move> {
    let rows = board.rows();
    let mut moves = Vec::new();
    for col in 0..board.columns() {
        let column = board.column(col);
        let stacked: Vec<(usize, Cell)> = column
            .iter()
            .enumerate()
            .filter_map(|(row, cell)| cell.map(|c| (row, c)))
            .collect();
        let first = rows - stacked.len();
        let mut settled = vec![None; rows];
        for (i, &(from_row, cell)) in stacked.iter().enumerate() {
            let to_row = first + i;
            settled[to_row] = Some(cell);
            if to_row != from_row {
                moves.push(Move {
                    cell,
                    from: Pos::new(col, from_row),
                    to: Pos::new(col, to_row),
                });
            }
        }
        if settled != column {
            board.write_column(col, &settled);
        }
    }
    moves
}

/// Slides non-empty columns toward column 0, keeping their left-to-right order.
pub fn compact_columns(board: &mut Board) -> Vec<Move> {
    let rows = board.rows();
    let mut moves = Vec::new();
    let mut target = 0;
    for col in 0..board.columns() {
        if board.is_column_empty(col) {
            continue;
        }
        if col != target {
            let column = board.column(col);
            for (row, cell) in column.iter().enumerate() {
                if let Some(cell) = *cell {
                    moves.push(Move {
                        cell,
                        from: Pos::new(col, row),
                        to: Pos::new(target, row),
                    });
                }
            }
            board.write_column(target, &column);
            board.write_column(col, &vec![None; rows]);
        }
        target += 1;
    }
    moves
}
