//! Board grid placement and collision engine.
//!
//! Every operation is a pure computation over a [`Board`] snapshot and the
//! cards being placed; results are written back onto the moving cards.

mod diagnostics;
mod drag;
mod error;
mod matrix;
mod open_spot;
mod placement;
mod sequential;

pub use diagnostics::{overlapping_cards, uninterrupted_cards_below};
pub use drag::{
    DragPreview, DragSpot, GridOffset, max_resize_height, max_resize_width, preview_drag,
    section_resize_blocked,
};
pub use error::{GridError, GridResult};
pub use matrix::{CardMatrix, DragPositions, MatrixOptions, Occupant, build_occupancy_matrix};
pub use open_spot::{
    OpenSpotMatrix, OpenSpotOptions, calculate_open_spot_matrix, exact_open_spot,
    find_closest_open_spot,
};
pub use placement::{
    BestPlacement, DragMapEntry, PlaceRequest, PlacementReport, calculate_best_placement,
    cards_in_section, determine_drag_map, place_cards_on_board,
};
pub use sequential::{SequentialOptions, calculate_rows_cols, group_by_consecutive};

use crate::board::{Board, Card};

/// The placed card with the lowest row, ties broken by lowest column.
pub fn top_left_card(cards: &[Card]) -> Option<&Card> {
    cards
        .iter()
        .filter_map(|card| Some(((card.row?, card.col?), card)))
        .min_by_key(|(spot, _)| *spot)
        .map(|(_, card)| card)
}

/// Sorts cards by (row, col) so groups are placed in reading order. Unplaced
/// cards sort first; the sort is stable.
pub fn order_by_row_col(cards: &mut [Card]) {
    cards.sort_by_key(|card| (card.row, card.col));
}

/// Last row a card covers, or 0 when it is unplaced.
pub fn card_max_row(card: &Card) -> usize {
    card.position().map_or(0, |pos| pos.max_row())
}

/// Last column a card covers, or 0 when it is unplaced.
pub fn card_max_col(card: &Card) -> usize {
    card.position().map_or(0, |pos| pos.max_col())
}

/// Cards currently visible and placed on `board`, in display order.
pub fn placed_cards(board: &Board) -> impl Iterator<Item = &Card> {
    board.visible_cards().filter(|card| card.is_placed())
}
