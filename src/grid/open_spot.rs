use serde::Serialize;

use crate::board::{Board, Card, CardId, GridSpot, Position};
use crate::config::GridConfig;

use super::error::{GridError, GridResult};
use super::matrix::{CardMatrix, DragPositions, MatrixOptions, build_occupancy_matrix};

/// For every cell, how many empty columns run rightward from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenSpotMatrix {
    columns: usize,
    rows: Vec<Vec<usize>>,
}

impl OpenSpotMatrix {
    /// Derives run lengths from an occupancy matrix, appending `buffer_rows`
    /// fully empty rows underneath.
    pub fn from_occupancy(matrix: &CardMatrix, buffer_rows: usize) -> Self {
        let columns = matrix.columns();
        let mut rows: Vec<Vec<usize>> = Vec::with_capacity(matrix.len() + buffer_rows);
        for cells in matrix.rows() {
            let mut open_row = vec![0; columns];
            let mut open = 0;
            for col in (0..columns).rev() {
                if cells.get(col).is_some_and(Option::is_some) {
                    open = 0;
                } else {
                    open += 1;
                }
                open_row[col] = open;
            }
            rows.push(open_row);
        }
        for _ in 0..buffer_rows {
            rows.push((1..=columns).rev().collect());
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, row: usize) -> Option<&[usize]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[usize]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSpotOptions<'a> {
    /// Cards being placed; they are left out of the matrix.
    pub moving: &'a [Card],
    pub drag_positions: Option<&'a DragPositions>,
    pub for_section: bool,
}

pub fn calculate_open_spot_matrix(
    board: &Board,
    options: OpenSpotOptions<'_>,
    config: &GridConfig,
) -> GridResult<OpenSpotMatrix> {
    let exclude: Vec<CardId> = options.moving.iter().map(|card| card.id).collect();
    let moving_sections =
        !options.moving.is_empty() && options.moving.iter().all(|card| card.is_section);
    let matrix = build_occupancy_matrix(
        board,
        MatrixOptions {
            drag_positions: options.drag_positions,
            exclude: &exclude,
            for_section: options.for_section || moving_sections,
        },
    )?;
    Ok(OpenSpotMatrix::from_occupancy(&matrix, config.buffer_rows))
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    spot: GridSpot,
    distance: f64,
}

/// Finds the open spot closest to `position` that fits its width and height.
///
/// Rows from `position.row` through `search_window_rows` below it are
/// scanned. On the target row and above, distance is Euclidean with the
/// column difference weighted by `left_bias`/`right_bias`; on lower rows it is
/// the distance in row-major (reflow) order. Scanning stops at the first
/// exact fit or once `max_candidates` are collected. A row missing from the
/// matrix is entirely open, so a target on such a row is returned as is,
/// even when `col + width` runs past `num_columns`; callers that need the
/// card on the grid must clamp the column themselves.
pub fn find_closest_open_spot(
    position: &Position,
    matrix: &OpenSpotMatrix,
    num_columns: usize,
    config: &GridConfig,
) -> Option<GridSpot> {
    if matrix.row(position.row).is_none() {
        return Some(position.spot());
    }

    let width = position.width.max(1);
    let height = position.height.max(1);
    let last_row = (position.row + config.search_window_rows).min(matrix.len() - 1);
    let mut candidates: Vec<Candidate> = Vec::new();

    'rows: for row_idx in position.row..=last_row {
        let Some(open_row) = matrix.row(row_idx) else {
            break;
        };
        for (col_idx, &open) in open_row.iter().enumerate() {
            if open >= width && fits_below(matrix, row_idx, col_idx, width, height) {
                let distance = spot_distance(row_idx, col_idx, position, num_columns, config);
                candidates.push(Candidate {
                    spot: GridSpot {
                        row: row_idx,
                        col: col_idx,
                    },
                    distance,
                });
                if distance == 0.0 {
                    break 'rows;
                }
            }
            if candidates.len() >= config.max_candidates {
                break 'rows;
            }
        }
    }

    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    candidates.first().map(|candidate| candidate.spot)
}

/// Every extra row a tall card needs must be missing (implicitly empty) or
/// have enough open run at the same column.
fn fits_below(matrix: &OpenSpotMatrix, row: usize, col: usize, width: usize, height: usize) -> bool {
    (1..height).all(|offset| match matrix.row(row + offset) {
        None => true,
        Some(open_row) => open_row.get(col).is_some_and(|open| *open >= width),
    })
}

fn spot_distance(
    row: usize,
    col: usize,
    target: &Position,
    num_columns: usize,
    config: &GridConfig,
) -> f64 {
    if row > target.row {
        // below the target, closeness follows reflow order
        let flat = |r: usize, c: usize| (r * num_columns + c) as f64;
        return (flat(row, col) - flat(target.row, target.col)).abs();
    }
    let row_diff = row as f64 - target.row as f64;
    let mut col_diff = col as f64 - target.col as f64;
    col_diff *= if col_diff < 0.0 {
        config.left_bias
    } else {
        config.right_bias
    };
    (row_diff * row_diff + col_diff * col_diff).sqrt()
}

/// True when the closest open spot for `card`, ignoring the card itself, is
/// exactly where the card already sits.
pub fn exact_open_spot(card: &Card, board: &Board, config: &GridConfig) -> GridResult<bool> {
    let position = card
        .position()
        .ok_or(GridError::UnplacedCard { card: card.id })?;
    let columns = board
        .columns()
        .ok_or(GridError::InvalidBoard { board: board.id })?;
    let matrix = calculate_open_spot_matrix(
        board,
        OpenSpotOptions {
            moving: std::slice::from_ref(card),
            ..Default::default()
        },
        config,
    )?;
    Ok(find_closest_open_spot(&position, &matrix, columns, config) == Some(position.spot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardId;

    fn board(cards: Vec<Card>) -> Board {
        Board::new(BoardId(1), 4).with_cards(cards)
    }

    fn open_spots(cards: Vec<Card>) -> OpenSpotMatrix {
        calculate_open_spot_matrix(&board(cards), OpenSpotOptions::default(), &GridConfig::default())
            .unwrap()
    }

    #[test]
    fn run_lengths_count_rightward() {
        let matrix = open_spots(vec![Card::new(CardId(1), 1, 1).at(0, 1)]);
        assert_eq!(matrix.row(0), Some(&[1, 0, 2, 1][..]));
        assert_eq!(matrix.len(), 5);
        assert_eq!(matrix.row(4), Some(&[4, 3, 2, 1][..]));
    }

    #[test]
    fn empty_board_is_only_buffer_rows() {
        let matrix = open_spots(vec![]);
        assert_eq!(matrix.len(), 4);
    }

    #[test]
    fn missing_row_returns_position_unchanged() {
        let matrix = OpenSpotMatrix::from_occupancy(&CardMatrix::new(4), 0);
        let spot = find_closest_open_spot(
            &Position::new(0, 0, 1, 1),
            &matrix,
            4,
            &GridConfig::default(),
        );
        assert_eq!(spot, Some(GridSpot { row: 0, col: 0 }));
    }

    #[test]
    fn missing_row_does_not_clamp_to_right_edge() {
        let matrix = open_spots(vec![Card::new(CardId(1), 1, 1).at(0, 0)]);
        let target = Position::new(matrix.len(), 4, 2, 1);
        let spot = find_closest_open_spot(&target, &matrix, 5, &GridConfig::default());
        assert_eq!(spot, Some(target.spot()));
    }

    #[test]
    fn open_target_is_an_exact_fit() {
        let matrix = open_spots(vec![Card::new(CardId(1), 2, 1).at(0, 0)]);
        let spot = find_closest_open_spot(
            &Position::new(0, 2, 2, 1),
            &matrix,
            4,
            &GridConfig::default(),
        );
        assert_eq!(spot, Some(GridSpot { row: 0, col: 2 }));
    }

    #[test]
    fn prefers_right_over_equally_distant_left() {
        // row 0: [_, _, X, _, _] -> target col 2 is taken
        let b = Board::new(BoardId(1), 5)
            .with_cards(vec![Card::new(CardId(1), 1, 1).at(0, 2)]);
        let matrix =
            calculate_open_spot_matrix(&b, OpenSpotOptions::default(), &GridConfig::default())
                .unwrap();
        let spot = find_closest_open_spot(
            &Position::new(0, 2, 1, 1),
            &matrix,
            5,
            &GridConfig::default(),
        );
        assert_eq!(spot, Some(GridSpot { row: 0, col: 3 }));
    }

    #[test]
    fn lower_rows_follow_snake_order() {
        // row 0: [_, _, X, X]; a width-2 card aimed at (0, 2) could go left on
        // row 0 (distance 2.02) or to (1, 0), which is 2 steps later in reflow order
        let matrix = open_spots(vec![Card::new(CardId(1), 2, 1).at(0, 2)]);
        let spot = find_closest_open_spot(
            &Position::new(0, 2, 2, 1),
            &matrix,
            4,
            &GridConfig::default(),
        );
        assert_eq!(spot, Some(GridSpot { row: 1, col: 0 }));
    }

    #[test]
    fn tall_cards_need_every_row_open() {
        // row 1 is blocked at cols 0-1, so a 2x2 card aimed at (0,0) moves right
        let matrix = open_spots(vec![Card::new(CardId(1), 2, 1).at(1, 0)]);
        let spot = find_closest_open_spot(
            &Position::new(0, 0, 2, 2),
            &matrix,
            4,
            &GridConfig::default(),
        );
        assert_eq!(spot, Some(GridSpot { row: 0, col: 2 }));
    }

    #[test]
    fn full_rows_push_card_into_buffer() {
        let matrix = open_spots(vec![Card::new(CardId(1), 4, 2).at(0, 0)]);
        let spot = find_closest_open_spot(
            &Position::new(0, 1, 1, 1),
            &matrix,
            4,
            &GridConfig::default(),
        );
        // (2, 0) comes first in reflow order after (0, 1)
        assert_eq!(spot, Some(GridSpot { row: 2, col: 0 }));
    }

    #[test]
    fn nothing_fits_past_search_window() {
        let config = GridConfig {
            search_window_rows: 1,
            buffer_rows: 0,
            ..GridConfig::default()
        };
        let b = board(vec![Card::new(CardId(1), 4, 3).at(0, 0)]);
        let matrix = calculate_open_spot_matrix(&b, OpenSpotOptions::default(), &config).unwrap();
        assert_eq!(
            find_closest_open_spot(&Position::new(0, 0, 1, 1), &matrix, 4, &config),
            None
        );
    }

    #[test]
    fn candidate_cap_bounds_search() {
        let config = GridConfig {
            max_candidates: 1,
            ..GridConfig::default()
        };
        // the scan runs left to right, so the first hit is the far-left column
        let matrix = open_spots(vec![Card::new(CardId(1), 1, 1).at(0, 3)]);
        let target = Position::new(0, 3, 1, 1);
        let spot = find_closest_open_spot(&target, &matrix, 4, &config);
        assert_eq!(spot, Some(GridSpot { row: 0, col: 0 }));

        let uncapped = find_closest_open_spot(&target, &matrix, 4, &GridConfig::default());
        assert_eq!(uncapped, Some(GridSpot { row: 0, col: 2 }));
    }

    #[test]
    fn exact_open_spot_ignores_the_card_itself() {
        let card = Card::new(CardId(2), 1, 1).at(0, 1);
        let b = board(vec![Card::new(CardId(1), 1, 1).at(0, 0), card.clone()]);
        assert!(exact_open_spot(&card, &b, &GridConfig::default()).unwrap());

        let stacked = Card::new(CardId(3), 1, 1).at(0, 0);
        assert!(!exact_open_spot(&stacked, &b, &GridConfig::default()).unwrap());
    }
}
