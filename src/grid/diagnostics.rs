use tracing::warn;

use crate::board::{Board, Card, CardId, Position};

use super::error::{GridError, GridResult};
use super::matrix::{CardMatrix, MatrixOptions, Occupant, build_occupancy_matrix};

/// Cards that should be repositioned because they overlap another card.
///
/// Horizontally adjacent cells owned by different cards are compared; when
/// the left card reaches past the start of the right one, the newer of the
/// two is reported and the older keeps its spot. A card sitting entirely
/// inside a section's interior is that section's child and is not compared
/// against it, but a card lying on a section's border is. Visible cards that
/// own no cell at all (unplaced, or fully covered by older cards) are
/// reported too. Nothing is moved.
pub fn overlapping_cards(board: &Board) -> GridResult<Vec<CardId>> {
    let matrix = build_occupancy_matrix(board, MatrixOptions::default())?;
    let mut flagged: Vec<CardId> = Vec::new();

    for cells in matrix.rows() {
        for pair in cells.windows(2) {
            let (Some(left), Some(right)) = (pair[0], pair[1]) else {
                continue;
            };
            if left.card == right.card || is_section_child(&left, &right) {
                continue;
            }
            if left.position.max_col() + 1 > right.position.col {
                let newer = if left.is_newer_than(&right) {
                    left.card
                } else {
                    right.card
                };
                push_unique(&mut flagged, newer);
            }
        }
    }

    for card in board.visible_cards() {
        if !matrix.contains_card(card.id) {
            push_unique(&mut flagged, card.id);
        }
    }

    if !flagged.is_empty() {
        warn!(board = %board.id, cards = ?flagged, "overlapping cards detected");
    }
    Ok(flagged)
}

/// The selected card plus every card stacked below it without a blank row in
/// between, following wide cards into the extra columns they cover.
pub fn uninterrupted_cards_below(selected: &Card, board: &Board) -> GridResult<Vec<CardId>> {
    let position = selected
        .position()
        .ok_or(GridError::UnplacedCard { card: selected.id })?;
    let matrix = build_occupancy_matrix(board, MatrixOptions::default())?;

    let mut cards = vec![selected.id];
    for col in position.col..=position.max_col() {
        collect_column(&matrix, position.row + 1, col, &mut cards);
    }
    Ok(cards)
}

fn collect_column(matrix: &CardMatrix, start_row: usize, col: usize, cards: &mut Vec<CardId>) {
    let mut row = start_row;
    while let Some(occ) = matrix.get(row, col) {
        push_unique(cards, occ.card);
        if occ.position.width > 1 {
            let above = row.checked_sub(1).and_then(|r| matrix.get(r, col));
            for extra in columns_sticking_out(&occ.position, above) {
                collect_column(matrix, row + 1, extra, cards);
            }
        }
        row += 1;
    }
}

fn columns_sticking_out(card: &Position, above: Option<&Occupant>) -> Vec<usize> {
    let Some(above) = above else {
        return Vec::new();
    };
    let covered = above.position.col..=above.position.max_col();
    (card.col..=card.max_col())
        .filter(|col| !covered.contains(col))
        .collect()
}

/// True when one of the pair is a section and the other sits inside its
/// interior, clear of the border ring.
fn is_section_child(a: &Occupant, b: &Occupant) -> bool {
    let (section, card) = match (a.is_section, b.is_section) {
        (true, false) => (a, b),
        (false, true) => (b, a),
        _ => return false,
    };
    let (outer, inner) = (section.position, card.position);
    outer.width >= 3
        && outer.height >= 3
        && inner.row > outer.row
        && inner.col > outer.col
        && inner.max_row() < outer.max_row()
        && inner.max_col() < outer.max_col()
}

fn push_unique(cards: &mut Vec<CardId>, card: CardId) {
    if !cards.contains(&card) {
        cards.push(card);
    }
}
