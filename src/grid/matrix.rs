use std::collections::BTreeMap;
use std::ops::Range;

use serde::Serialize;
use tracing::trace;

use crate::board::{Board, Card, CardId, Position};

use super::error::{GridError, GridResult};

/// Tentative placements that are not committed to the board yet, keyed by
/// the card they belong to.
pub type DragPositions = BTreeMap<CardId, Position>;

/// What a matrix cell holds: a copy of the occupying card's footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupant {
    pub card: CardId,
    pub position: Position,
    pub is_section: bool,
    pub created_at: i64,
    /// Index of the card in the board's display order; drag positions sort last.
    pub board_index: usize,
}

impl Occupant {
    fn from_card(card: &Card, board_index: usize) -> Option<Self> {
        Some(Self {
            card: card.id,
            position: card.position()?,
            is_section: card.is_section,
            created_at: card.created_at,
            board_index,
        })
    }

    fn dragged(card: CardId, position: Position) -> Self {
        Self {
            card,
            position,
            is_section: false,
            created_at: i64::MAX,
            board_index: usize::MAX,
        }
    }

    /// True when `self` was created after `other`. Equal timestamps fall back
    /// to display order, so the later-listed card counts as newer.
    pub fn is_newer_than(&self, other: &Occupant) -> bool {
        (self.created_at, self.board_index) > (other.created_at, other.board_index)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixOptions<'a> {
    pub drag_positions: Option<&'a DragPositions>,
    pub exclude: &'a [CardId],
    /// Probe mode for placing a section: other sections block their interior
    /// instead of their border ring.
    pub for_section: bool,
}

/// Occupancy grid indexed `[row][col]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMatrix {
    columns: usize,
    rows: Vec<Vec<Option<Occupant>>>,
}

impl CardMatrix {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
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

    /// Grows the matrix with empty rows until `row` exists.
    pub fn ensure_row(&mut self, row: usize) {
        while self.rows.len() <= row {
            self.rows.push(vec![None; self.columns]);
        }
    }

    pub fn row(&self, row: usize) -> Option<&[Option<Occupant>]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<Occupant>]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Occupant> {
        self.rows.get(row)?.get(col)?.as_ref()
    }

    /// Writes an occupant. Columns past the grid's right edge are dropped.
    pub fn set(&mut self, row: usize, col: usize, occupant: Occupant) {
        if col >= self.columns {
            return;
        }
        self.ensure_row(row);
        self.rows[row][col] = Some(occupant);
    }

    pub fn contains_card(&self, card: CardId) -> bool {
        self.rows
            .iter()
            .flatten()
            .any(|cell| cell.is_some_and(|occ| occ.card == card))
    }

    /// First occupant found inside `position`, scanning row by row, skipping
    /// any card listed in `ignore`.
    pub fn first_occupant_in(&self, position: &Position, ignore: &[CardId]) -> Option<Occupant> {
        for row in position.row..=position.max_row() {
            for col in position.col..=position.max_col() {
                if let Some(occ) = self.get(row, col) {
                    if !ignore.contains(&occ.card) {
                        return Some(*occ);
                    }
                }
            }
        }
        None
    }

    /// Rectangular sub-view. Rows or columns outside the matrix come back empty.
    pub fn slice(&self, rows: Range<usize>, cols: Range<usize>) -> Vec<Vec<Option<Occupant>>> {
        rows.map(|row| {
            cols.clone()
                .map(|col| self.get(row, col).copied())
                .collect()
        })
        .collect()
    }

    /// Card ids per cell, for dumps and debugging.
    pub fn ids(&self) -> Vec<Vec<Option<CardId>>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.map(|occ| occ.card)).collect())
            .collect()
    }
}

/// Builds the occupancy matrix for a board's visible cards.
///
/// Excluded cards are left out, drag positions are written on top, and the
/// oldest card keeps any contested cell. Sections only mark their border ring
/// (the interior belongs to their children) unless `for_section` is set, in
/// which case they mark only their interior.
pub fn build_occupancy_matrix(board: &Board, options: MatrixOptions<'_>) -> GridResult<CardMatrix> {
    let columns = board
        .columns()
        .ok_or(GridError::InvalidBoard { board: board.id })?;

    let mut occupants: Vec<Occupant> = board
        .cards
        .iter()
        .enumerate()
        .filter(|(_, card)| card.is_visible() && !options.exclude.contains(&card.id))
        .filter_map(|(idx, card)| Occupant::from_card(card, idx))
        .collect();
    // newest first: later writes win, so the oldest card ends up owning a cell
    occupants.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.board_index.cmp(&a.board_index))
    });
    if let Some(drag_positions) = options.drag_positions {
        occupants.extend(
            drag_positions
                .iter()
                .map(|(card, position)| Occupant::dragged(*card, *position)),
        );
    }

    let mut matrix = CardMatrix::new(columns);
    let Some(max_row) = occupants.iter().map(|occ| occ.position.max_row()).max() else {
        return Ok(matrix);
    };
    matrix.ensure_row(max_row);

    for occ in &occupants {
        let pos = occ.position;
        if occ.is_section && options.for_section {
            if pos.height < 3 || pos.width < 3 {
                continue;
            }
            for row in pos.row + 1..pos.max_row() {
                for col in pos.col + 1..pos.max_col() {
                    matrix.set(row, col, *occ);
                }
            }
        } else if occ.is_section {
            for row in pos.row..=pos.max_row() {
                for col in pos.col..=pos.max_col() {
                    let edge = row == pos.row
                        || row == pos.max_row()
                        || col == pos.col
                        || col == pos.max_col();
                    if edge {
                        matrix.set(row, col, *occ);
                    }
                }
            }
        } else {
            for row in pos.row..=pos.max_row() {
                for col in pos.col..=pos.max_col() {
                    matrix.set(row, col, *occ);
                }
            }
        }
    }

    trace!(
        board = %board.id,
        rows = matrix.len(),
        columns,
        cells = ?matrix.ids(),
        "built occupancy matrix"
    );
    Ok(matrix)
}
