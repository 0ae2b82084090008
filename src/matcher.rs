//! Match detection: 4-neighbour flood fill from a clicked cell.

use crate::board::{Board, Pos};
use std::collections::HashSet;

const NEIGHBOURS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Maximal same-colour 4-connected group. Also the set of cells slated for removal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Component {
    pub color: u8,
    cells: Vec<Pos>,
}

impl Component {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Pos] {
        &self.cells
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains(&pos)
    }
}

/// Component containing `origin`, matched against the origin's own colour.
/// Empty when `origin` holds no cell.
pub fn find_connected(board: &Board, origin: Pos) -> Component {
    match board.get(origin) {
        Some(cell) => find_connected_with_color(board, origin, cell.color),
        None => Component::default(),
    }
}

/// Component of `color` reachable from `origin`. Empty when `origin` is empty or a
/// different colour.
pub fn find_connected_with_color(board: &Board, origin: Pos, color: u8) -> Component {
    if board.get(origin).is_none_or(|c| c.color != color) {
        return Component { color, cells: Vec::new() };
    }

    let mut visited = HashSet::new();
    let mut cells = Vec::new();
    let mut stack = vec![origin];
    visited.insert(origin);

    while let Some(pos) = stack.pop() {
        cells.push(pos);
        for (dx, dy) in NEIGHBOURS_4 {
            let (Some(col), Some(row)) = (
                pos.col.checked_add_signed(dx),
                pos.row.checked_add_signed(dy),
            ) else {
                continue;
            };
            let next = Pos::new(col, row);
            if !board.contains(next) || visited.contains(&next) {
                continue;
            }
            if board.get(next).is_some_and(|c| c.color == color) {
                visited.insert(next);
                stack.push(next);
            }
        }
    }

    cells.sort_unstable();
    Component { color, cells }
}
