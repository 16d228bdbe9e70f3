use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{Board, Card, CardId, Position};
use crate::config::GridConfig;

use super::error::{GridError, GridResult};
use super::matrix::{CardMatrix, MatrixOptions, build_occupancy_matrix};
use super::placement::DragMapEntry;

/// A signed grid coordinate; drag positions may hang off the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridOffset {
    pub row: isize,
    pub col: isize,
}

impl GridOffset {
    pub fn new(row: isize, col: isize) -> Self {
        Self { row, col }
    }

    fn shifted(self, row: isize, col: isize) -> Self {
        Self {
            row: self.row + row,
            col: self.col + col,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSpot {
    pub card: CardId,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPreview {
    /// Master position after bumping the group back into bounds.
    pub master: GridOffset,
    pub bump: GridOffset,
    pub spots: Vec<DragSpot>,
    /// Some spot lands on a card that is not moving.
    pub has_collision: bool,
    /// Card under the master's requested (unbumped) position.
    pub hovering: Option<CardId>,
}

/// Tentative spots for a dragged group whose master card is held at
/// `master`.
///
/// Each card sits at its drag-map offset from the master. If any of them
/// would leave the grid (left edge, right edge or top), the whole group is
/// shifted by the largest bump needed on each axis. Spots are not resolved
/// against other cards; overlaps are only reported.
pub fn preview_drag(
    board: &Board,
    master: GridOffset,
    drag_map: &[DragMapEntry],
    moving: &[Card],
) -> GridResult<DragPreview> {
    let columns = board
        .columns()
        .ok_or(GridError::InvalidBoard { board: board.id })?;
    let exclude: Vec<CardId> = moving.iter().map(|card| card.id).collect();
    let cards = build_occupancy_matrix(
        board,
        MatrixOptions {
            exclude: &exclude,
            ..Default::default()
        },
    )?;
    let section_cards = build_occupancy_matrix(
        board,
        MatrixOptions {
            exclude: &exclude,
            for_section: true,
            ..Default::default()
        },
    )?;

    let hovering = drag_map
        .iter()
        .find(|entry| entry.row_offset == 0 && entry.col_offset == 0)
        .and_then(|entry| moving.get(entry.index))
        .and_then(|card| {
            let position = clamp_position(master, card);
            matrix_for(card, &cards, &section_cards).first_occupant_in(&position, &exclude)
        })
        .map(|occ| occ.card);

    let mut bump = GridOffset::default();
    for entry in drag_map {
        let Some(card) = moving.get(entry.index) else {
            continue;
        };
        let spot = master.shifted(entry.row_offset, entry.col_offset);
        let needed = bump_into_bounds(spot, card.width, columns);
        if needed.row.abs() > bump.row.abs() {
            bump.row = needed.row;
        }
        if needed.col.abs() > bump.col.abs() {
            bump.col = needed.col;
        }
    }
    let master = master.shifted(bump.row, bump.col);
    if bump != GridOffset::default() {
        debug!(board = %board.id, bump_row = bump.row, bump_col = bump.col, "bumped drag group into bounds");
    }

    let mut spots = Vec::with_capacity(drag_map.len());
    let mut has_collision = false;
    for entry in drag_map {
        let Some(card) = moving.get(entry.index) else {
            continue;
        };
        let position = clamp_position(master.shifted(entry.row_offset, entry.col_offset), card);
        has_collision |= matrix_for(card, &cards, &section_cards)
            .first_occupant_in(&position, &exclude)
            .is_some();
        spots.push(DragSpot {
            card: card.id,
            position,
        });
    }

    Ok(DragPreview {
        master,
        bump,
        spots,
        has_collision,
        hovering,
    })
}

fn matrix_for<'m>(card: &Card, cards: &'m CardMatrix, sections: &'m CardMatrix) -> &'m CardMatrix {
    if card.is_section { sections } else { cards }
}

fn bump_into_bounds(spot: GridOffset, width: usize, columns: usize) -> GridOffset {
    let mut bump = GridOffset::default();
    let right_edge = spot.col + width as isize;
    if spot.col < 0 {
        bump.col = -spot.col;
    } else if right_edge > columns as isize {
        bump.col = columns as isize - right_edge;
    }
    if spot.row < 0 {
        bump.row = -spot.row;
    }
    bump
}

fn clamp_position(spot: GridOffset, card: &Card) -> Position {
    Position::new(
        spot.row.max(0) as usize,
        spot.col.max(0) as usize,
        card.width,
        card.height,
    )
}

/// Widest the card can be resized to before running into another card,
/// bounded by the per-card maximum (the column count for sections) and the
/// board's right edge. Cards in `ignore` do not block.
pub fn max_resize_width(
    card: &Card,
    board: &Board,
    ignore: &[CardId],
    config: &GridConfig,
) -> GridResult<usize> {
    let (position, columns, matrix) = resize_context(card, board)?;
    let limit = if card.is_section {
        columns
    } else {
        config.max_card_width
    };
    let limit = limit.min(columns.saturating_sub(position.col)).max(1);

    for col in position.col + position.width..position.col + limit {
        let blocked = (position.row..position.row + position.height)
            .any(|row| is_blocking(&matrix, row, col, card.id, ignore));
        if blocked {
            return Ok(col - position.col);
        }
    }
    Ok(limit)
}

/// Tallest the card can be resized to before running into another card,
/// bounded by the per-card maximum (the column count for sections).
pub fn max_resize_height(
    card: &Card,
    board: &Board,
    ignore: &[CardId],
    config: &GridConfig,
) -> GridResult<usize> {
    let (position, columns, matrix) = resize_context(card, board)?;
    let limit = if card.is_section {
        columns
    } else {
        config.max_card_height
    };

    for row in position.row + position.height..position.row + limit {
        let blocked = (position.col..position.col + position.width)
            .any(|col| is_blocking(&matrix, row, col, card.id, ignore));
        if blocked {
            return Ok(row - position.row);
        }
    }
    Ok(limit)
}

fn resize_context(card: &Card, board: &Board) -> GridResult<(Position, usize, CardMatrix)> {
    let position = card
        .position()
        .ok_or(GridError::UnplacedCard { card: card.id })?;
    let columns = board
        .columns()
        .ok_or(GridError::InvalidBoard { board: board.id })?;
    let matrix = build_occupancy_matrix(
        board,
        MatrixOptions {
            for_section: card.is_section,
            ..Default::default()
        },
    )?;
    Ok((position, columns, matrix))
}

fn is_blocking(matrix: &CardMatrix, row: usize, col: usize, card: CardId, ignore: &[CardId]) -> bool {
    matrix
        .get(row, col)
        .is_some_and(|occ| occ.card != card && !ignore.contains(&occ.card))
}

/// Whether resizing `section` to `width` x `height` must be refused.
///
/// Sections below the minimum size are refused. Growing is refused when the
/// new area covers a card that is not already inside the section; shrinking
/// is refused when a card inside the section would no longer fit.
pub fn section_resize_blocked(
    section: &Card,
    width: usize,
    height: usize,
    board: &Board,
    config: &GridConfig,
) -> GridResult<bool> {
    if width < config.min_section_size || height < config.min_section_size {
        return Ok(true);
    }
    let current = section
        .position()
        .ok_or(GridError::UnplacedCard { card: section.id })?;
    let resized = Position { width, height, ..current };
    if resized == current {
        return Ok(false);
    }

    let exclude = [section.id];
    let matrix = build_occupancy_matrix(
        board,
        MatrixOptions {
            exclude: &exclude,
            ..Default::default()
        },
    )?;
    let rows = current.row..current.max_row().max(resized.max_row()) + 1;
    let cols = current.col..current.max_col().max(resized.max_col()) + 1;
    let blocked = matrix
        .slice(rows, cols)
        .iter()
        .flatten()
        .flatten()
        .filter(|occ| !occ.is_section)
        .any(|occ| {
            let inside_now = current.contains(&occ.position);
            let inside_after = resized.contains(&occ.position);
            (inside_now && !inside_after) || (!inside_now && occ.position.intersects(&resized))
        });
    Ok(blocked)
}
