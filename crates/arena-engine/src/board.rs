//! Pure board rules: move validation, snapshot application, outcome
//! detection. No state of its own.

use arena_types::models::{Board, Mark};

use crate::error::{Error, Result};

/// The 8 winning triples, evaluated in fixed order: rows, columns,
/// diagonals. At most one mark can complete a line under legal alternating
/// play, but the order is pinned for reproducibility.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win { mark: Mark, line: [usize; 3] },
    Draw,
    Open,
}

/// Check a candidate move against a board snapshot.
pub fn validate(board: &Board, cell: usize) -> Result<()> {
    if cell >= 9 {
        return Err(Error::InvalidCell(cell));
    }
    if board.cell(cell).is_some() {
        return Err(Error::CellOccupied(cell));
    }
    Ok(())
}

/// Returns a new board with the cell set. The input is untouched so
/// callers can retry or branch safely.
pub fn apply(board: &Board, cell: usize, mark: Mark) -> Board {
    let mut next = *board;
    next.0[cell] = Some(mark);
    next
}

/// Detect win or draw. Draw is declared iff no line matches and all 9
/// cells are occupied.
pub fn outcome(board: &Board) -> Outcome {
    for line in WIN_LINES {
        let [a, b, c] = line;
        if let Some(mark) = board.cell(a) {
            if board.cell(b) == Some(mark) && board.cell(c) == Some(mark) {
                return Outcome::Win { mark, line };
            }
        }
    }
    if board.is_full() { Outcome::Draw } else { Outcome::Open }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_of(cells: [Option<Mark>; 9]) -> Board {
        Board(cells)
    }

    const X: Option<Mark> = Some(Mark::X);
    const O: Option<Mark> = Some(Mark::O);
    const E: Option<Mark> = None;

    #[test]
    fn top_row_wins_for_x() {
        let board = board_of([X, X, X, E, E, E, E, E, E]);
        assert_eq!(
            outcome(&board),
            Outcome::Win { mark: Mark::X, line: [0, 1, 2] }
        );
    }

    #[test]
    fn column_and_diagonal_wins() {
        let col = board_of([O, E, E, O, E, E, O, E, E]);
        assert_eq!(
            outcome(&col),
            Outcome::Win { mark: Mark::O, line: [0, 3, 6] }
        );

        let diag = board_of([X, E, E, E, X, E, E, E, X]);
        assert_eq!(
            outcome(&diag),
            Outcome::Win { mark: Mark::X, line: [0, 4, 8] }
        );
    }

    #[test]
    fn full_board_without_line_is_draw() {
        // X O X / X O O / O X X -- no three in a row
        let board = board_of([X, O, X, X, O, O, O, X, X]);
        assert_eq!(outcome(&board), Outcome::Draw);
    }

    #[test]
    fn partial_board_is_open() {
        let board = board_of([X, O, E, E, E, E, E, E, E]);
        assert_eq!(outcome(&board), Outcome::Open);
    }

    #[test]
    fn validate_rejects_out_of_range_and_occupied() {
        let board = board_of([X, E, E, E, E, E, E, E, E]);
        assert!(matches!(validate(&board, 9), Err(Error::InvalidCell(9))));
        assert!(matches!(validate(&board, 0), Err(Error::CellOccupied(0))));
        assert!(validate(&board, 4).is_ok());
    }

    #[test]
    fn apply_leaves_input_untouched() {
        let board = board_of([E; 9]);
        let next = apply(&board, 4, Mark::X);
        assert_eq!(board.filled(), 0);
        assert_eq!(next.cell(4), Some(Mark::X));
        assert_eq!(next.filled(), 1);
    }

    #[test]
    fn row_evaluated_before_diagonal() {
        // Both [0,1,2] and [0,4,8] complete for X; fixed order reports the row.
        let board = board_of([X, X, X, E, X, E, E, E, X]);
        assert_eq!(
            outcome(&board),
            Outcome::Win { mark: Mark::X, line: [0, 1, 2] }
        );
    }
}
