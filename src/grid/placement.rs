use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::board::{Board, Card, CardId, GridSpot, Position};
use crate::config::GridConfig;

use super::error::{GridError, GridResult};
use super::matrix::DragPositions;
use super::open_spot::{OpenSpotOptions, calculate_open_spot_matrix, find_closest_open_spot};
use super::sequential::{SequentialOptions, calculate_rows_cols};
use super::{order_by_row_col, top_left_card};

/// Where a group lands when the caller gives no explicit anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestPlacement {
    pub row: usize,
    pub col: usize,
    /// The whole group fits on the anchor row without wrapping.
    pub fit_entire_width: bool,
}

/// A moving card's offset from the master card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragMapEntry {
    pub card: CardId,
    /// Index of the card in the moving slice.
    pub index: usize,
    pub row_offset: isize,
    pub col_offset: isize,
}

#[derive(Debug, Clone, Copy)]
pub struct PlaceRequest<'a> {
    pub row: Option<usize>,
    pub col: Option<usize>,
    /// Board the cards are placed onto.
    pub board: &'a Board,
    /// Collection the cards come from; may be the same board.
    pub from: &'a Board,
}

impl<'a> PlaceRequest<'a> {
    pub fn new(board: &'a Board, from: &'a Board) -> Self {
        Self {
            row: None,
            col: None,
            board,
            from,
        }
    }

    pub fn at(mut self, row: usize, col: usize) -> Self {
        self.row = Some(row);
        self.col = Some(col);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReport {
    pub anchor: Option<GridSpot>,
    pub placed: Vec<CardId>,
    /// Cards for which no open spot was found; their row/col are untouched.
    pub unplaced: Vec<CardId>,
}

impl PlacementReport {
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }
}

/// Relative offsets of every moving card from `master`. Unplaced cards count
/// as sitting at the origin.
pub fn determine_drag_map(master: &Card, moving: &[Card]) -> Vec<DragMapEntry> {
    let master_row = master.row.unwrap_or(0) as isize;
    let master_col = master.col.unwrap_or(0) as isize;
    moving
        .iter()
        .enumerate()
        .map(|(index, card)| DragMapEntry {
            card: card.id,
            index,
            row_offset: card.row.unwrap_or(0) as isize - master_row,
            col_offset: card.col.unwrap_or(0) as isize - master_col,
        })
        .collect()
}

/// Picks the anchor at the end of the board: right after the last card if
/// the group fits on that row, otherwise at the start of the next row.
pub fn calculate_best_placement(
    board: &Board,
    moving: &[Card],
    master: &Card,
    config: &GridConfig,
) -> GridResult<BestPlacement> {
    let columns = board
        .columns()
        .ok_or(GridError::InvalidBoard { board: board.id })?;

    let min_col = moving.iter().filter_map(|card| card.col).min().unwrap_or(0);
    let max_col = moving
        .iter()
        .filter_map(|card| Some(card.col? + card.width))
        .max()
        .unwrap_or(0);
    let span = max_col.saturating_sub(min_col);

    let (last_row, last_col, last_width) = super::placed_cards(board)
        .filter_map(|card| Some((card.row?, card.col?, card.width)))
        .last()
        .unwrap_or((0, 0, 0));

    let mut open_width = columns.saturating_sub(last_col + last_width);
    let (row, col) = if (last_col < config.best_placement_max_col && open_width >= span)
        || (open_width > 0 && span > columns)
    {
        (last_row, last_col + last_width)
    } else {
        open_width = columns;
        let col = if open_width >= span {
            master.col.unwrap_or(0).saturating_sub(min_col)
        } else {
            0
        };
        (last_row + 1, col)
    };

    Ok(BestPlacement {
        row,
        col,
        fit_entire_width: open_width >= span,
    })
}

/// Moving cards that sit entirely inside `section`; they travel with it.
pub fn cards_in_section(section: &Card, moving: &[Card]) -> Vec<usize> {
    let Some(bounds) = section.position() else {
        return Vec::new();
    };
    moving
        .iter()
        .enumerate()
        .filter(|(_, card)| card.id != section.id && !card.is_section)
        .filter(|(_, card)| card.position().is_some_and(|pos| bounds.contains(&pos)))
        .map(|(idx, _)| idx)
        .collect()
}

/// Places `moving` onto the request's board, writing row/col/parent onto
/// each card.
///
/// Cards without positions (or coming from a list collection) are first laid
/// out sequentially. The group is anchored at the requested row/col or at the
/// best placement at the end of the board, then each card is put on the open
/// spot closest to its offset from the master card, taking the spots already
/// claimed in this call into account. Cards inside a moving section shift by
/// the same delta as the section. The cards are left sorted by row/col.
pub fn place_cards_on_board(
    request: PlaceRequest<'_>,
    moving: &mut [Card],
    config: &GridConfig,
) -> GridResult<PlacementReport> {
    let board = request.board;
    let columns = board
        .columns()
        .ok_or(GridError::InvalidBoard { board: board.id })?;
    let mut report = PlacementReport::default();
    if moving.is_empty() {
        return Ok(report);
    }

    let mut master_id = None;
    if !request.from.is_board() || moving.iter().any(|card| !card.is_placed()) {
        calculate_rows_cols(
            moving,
            SequentialOptions {
                num_columns: config.default_layout_columns,
                prefilled: 0,
            },
        );
    } else {
        master_id = top_left_card(moving).map(|card| card.id);
    }
    order_by_row_col(moving);
    let master_idx = master_id
        .and_then(|id| moving.iter().position(|card| card.id == id))
        .unwrap_or(0);

    let (anchor_row, anchor_col) = match (request.row, request.col) {
        (Some(row), Some(col)) => (row, col),
        _ => {
            let placement = calculate_best_placement(board, moving, &moving[master_idx], config)?;
            debug!(
                board = %board.id,
                row = placement.row,
                col = placement.col,
                fit_entire_width = placement.fit_entire_width,
                "computed best placement"
            );
            if !placement.fit_entire_width {
                // reflow into the board's width, continuing after the anchor column
                calculate_rows_cols(
                    moving,
                    SequentialOptions {
                        num_columns: columns,
                        prefilled: placement.col,
                    },
                );
            }
            (placement.row, placement.col)
        }
    };
    report.anchor = Some(GridSpot {
        row: anchor_row,
        col: anchor_col,
    });

    let drag_map = determine_drag_map(&moving[master_idx], moving);
    let mut section_members: BTreeMap<CardId, Vec<usize>> = BTreeMap::new();
    for section in moving.iter().filter(|card| card.is_section) {
        section_members.insert(section.id, cards_in_section(section, moving));
    }
    let nested: BTreeSet<CardId> = section_members
        .values()
        .flatten()
        .map(|idx| moving[*idx].id)
        .collect();

    let mut drag_positions = DragPositions::new();
    for entry in &drag_map {
        if nested.contains(&entry.card) {
            continue;
        }
        let card = &moving[entry.index];
        let (card_id, is_section) = (card.id, card.is_section);
        let (prior_row, prior_col) = (card.row.unwrap_or(0), card.col.unwrap_or(0));
        let target = Position::new(
            anchor_row.saturating_add_signed(entry.row_offset),
            anchor_col.saturating_add_signed(entry.col_offset),
            card.width,
            card.height,
        );

        let open_spots = calculate_open_spot_matrix(
            board,
            OpenSpotOptions {
                moving: &*moving,
                drag_positions: Some(&drag_positions),
                for_section: is_section,
            },
            config,
        )?;
        let Some(spot) = find_closest_open_spot(&target, &open_spots, columns, config) else {
            warn!(
                board = %board.id,
                card = %card_id,
                row = target.row,
                col = target.col,
                "no open spot within search window"
            );
            report.unplaced.push(card_id);
            if let Some(members) = section_members.get(&card_id) {
                report
                    .unplaced
                    .extend(members.iter().map(|&idx| moving[idx].id));
            }
            continue;
        };
        drag_positions.insert(
            card_id,
            Position {
                row: spot.row,
                col: spot.col,
                ..target
            },
        );

        let row_diff = spot.row as isize - prior_row as isize;
        let col_diff = spot.col as isize - prior_col as isize;
        if let Some(members) = section_members.get(&card_id) {
            for &idx in members {
                let member = &mut moving[idx];
                member.parent = Some(board.id);
                member.row = member.row.map(|row| row.saturating_add_signed(row_diff));
                member.col = member.col.map(|col| col.saturating_add_signed(col_diff));
                report.placed.push(member.id);
            }
        }

        let card = &mut moving[entry.index];
        card.move_to(spot);
        card.parent = Some(board.id);
        report.placed.push(card_id);
        debug!(
            board = %board.id,
            card = %card_id,
            target_row = target.row,
            target_col = target.col,
            row = spot.row,
            col = spot.col,
            "placed card"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardId;

    fn spot(card: &Card) -> (usize, usize) {
        (card.row.unwrap(), card.col.unwrap())
    }

    fn find(cards: &[Card], id: u64) -> &Card {
        cards.iter().find(|card| card.id == CardId(id)).unwrap()
    }

    #[test]
    fn places_new_card_after_last_card() {
        let board = Board::new(BoardId(1), 4).with_cards(vec![Card::new(CardId(1), 2, 1).at(0, 0)]);
        let mut moving = vec![Card::new(CardId(2), 2, 1)];
        let report =
            place_cards_on_board(PlaceRequest::new(&board, &board), &mut moving, &GridConfig::default())
                .unwrap();
        assert_eq!(report.anchor, Some(GridSpot { row: 0, col: 2 }));
        assert_eq!(spot(&moving[0]), (0, 2));
        assert_eq!(moving[0].parent, Some(BoardId(1)));
        assert!(report.is_complete());
    }

    #[test]
    fn explicit_anchor_avoids_collisions() {
        let board = Board::new(BoardId(1), 4).with_cards(vec![Card::new(CardId(9), 1, 1).at(0, 1)]);
        let mut moving = vec![
            Card::new(CardId(1), 1, 1).at(5, 0),
            Card::new(CardId(2), 1, 1).at(5, 1),
        ];
        let report = place_cards_on_board(
            PlaceRequest::new(&board, &board).at(0, 0),
            &mut moving,
            &GridConfig::default(),
        )
        .unwrap();
        assert_eq!(spot(find(&moving, 1)), (0, 0));
        assert_eq!(spot(find(&moving, 2)), (0, 2));
        assert_eq!(report.placed, vec![CardId(1), CardId(2)]);
    }

    #[test]
    fn section_moves_with_its_children() {
        let source = Board::new(BoardId(2), 8);
        let target = Board::new(BoardId(1), 8);
        let mut moving = vec![
            Card::new(CardId(1), 1, 1).at(1, 1),
            Card::new(CardId(5), 3, 3).at(0, 0).section(),
        ];
        place_cards_on_board(
            PlaceRequest::new(&target, &source).at(2, 4),
            &mut moving,
            &GridConfig::default(),
        )
        .unwrap();
        assert_eq!(spot(find(&moving, 5)), (2, 4));
        assert_eq!(spot(find(&moving, 1)), (3, 5));
        assert!(moving.iter().all(|card| card.parent == Some(BoardId(1))));
    }

    #[test]
    fn list_source_is_normalized_to_four_columns() {
        let source = Board::list(BoardId(2));
        let target = Board::new(BoardId(1), 8);
        let mut moving: Vec<Card> = (1..=6).map(|i| Card::new(CardId(i), 1, 1)).collect();
        place_cards_on_board(PlaceRequest::new(&target, &source), &mut moving, &GridConfig::default())
            .unwrap();
        let spots: Vec<_> = moving.iter().map(spot).collect();
        assert_eq!(spots, vec![(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 1)]);
    }

    #[test]
    fn group_wider_than_remaining_row_reflows() {
        let board = Board::new(BoardId(1), 4).with_cards(vec![Card::new(CardId(9), 1, 1).at(0, 0)]);
        let mut moving = vec![
            Card::new(CardId(1), 3, 1).at(0, 0),
            Card::new(CardId(2), 3, 1).at(0, 3),
        ];
        let source = Board::new(BoardId(2), 8);
        let report =
            place_cards_on_board(PlaceRequest::new(&board, &source), &mut moving, &GridConfig::default())
                .unwrap();
        assert_eq!(report.anchor, Some(GridSpot { row: 0, col: 1 }));
        assert_eq!(spot(find(&moving, 1)), (0, 1));
        assert_eq!(spot(find(&moving, 2)), (1, 0));
    }

    #[test]
    fn invalid_board_leaves_cards_untouched() {
        let board = Board::list(BoardId(3));
        let mut moving = vec![Card::new(CardId(1), 1, 1).at(4, 2)];
        let before = moving.clone();
        let err = place_cards_on_board(PlaceRequest::new(&board, &board), &mut moving, &GridConfig::default())
            .unwrap_err();
        assert_eq!(err, GridError::InvalidBoard { board: BoardId(3) });
        assert_eq!(moving, before);
    }

    #[test]
    fn unplaceable_card_is_reported_not_fatal() {
        let config = GridConfig {
            search_window_rows: 0,
            buffer_rows: 0,
            ..GridConfig::default()
        };
        let board = Board::new(BoardId(1), 4).with_cards(vec![Card::new(CardId(9), 4, 1).at(0, 0)]);
        let mut moving = vec![Card::new(CardId(1), 1, 1).at(3, 3)];
        let report =
            place_cards_on_board(PlaceRequest::new(&board, &board).at(0, 0), &mut moving, &config)
                .unwrap();
        assert_eq!(report.unplaced, vec![CardId(1)]);
        assert!(report.placed.is_empty());
        assert_eq!(spot(&moving[0]), (3, 3));
        assert_eq!(moving[0].parent, None);
    }

    #[test]
    fn unplaceable_section_reports_its_children() {
        let config = GridConfig {
            search_window_rows: 0,
            buffer_rows: 0,
            ..GridConfig::default()
        };
        let source = Board::new(BoardId(2), 4);
        let target = Board::new(BoardId(1), 4).with_cards(vec![Card::new(CardId(9), 4, 1).at(0, 0)]);
        let mut moving = vec![
            Card::new(CardId(5), 3, 3).at(0, 0).section(),
            Card::new(CardId(1), 1, 1).at(1, 1),
        ];
        let report =
            place_cards_on_board(PlaceRequest::new(&target, &source).at(0, 0), &mut moving, &config)
                .unwrap();
        assert_eq!(report.unplaced, vec![CardId(5), CardId(1)]);
        assert!(report.placed.is_empty());
        assert_eq!(spot(find(&moving, 1)), (1, 1));
        assert_eq!(find(&moving, 1).parent, None);
    }

    #[test]
    fn best_placement_wraps_when_last_row_is_full() {
        let board = Board::new(BoardId(1), 4).with_cards(vec![Card::new(CardId(9), 1, 1).at(2, 3)]);
        let moving = vec![Card::new(CardId(1), 2, 1).at(0, 0)];
        let placement =
            calculate_best_placement(&board, &moving, &moving[0], &GridConfig::default()).unwrap();
        assert_eq!(
            placement,
            BestPlacement {
                row: 3,
                col: 0,
                fit_entire_width: true
            }
        );
    }

    #[test]
    fn best_placement_on_empty_board_starts_at_origin() {
        let board = Board::new(BoardId(1), 16);
        let moving = vec![Card::new(CardId(1), 2, 1).at(4, 4)];
        let placement =
            calculate_best_placement(&board, &moving, &moving[0], &GridConfig::default()).unwrap();
        assert_eq!((placement.row, placement.col), (0, 0));
        assert!(placement.fit_entire_width);
    }

    #[test]
    fn best_placement_skips_far_right_last_card() {
        // 16 columns: the last card starts at col 8, past the trailing limit
        let board = Board::new(BoardId(1), 16).with_cards(vec![Card::new(CardId(9), 1, 1).at(0, 8)]);
        let moving = vec![Card::new(CardId(1), 1, 1).at(0, 0)];
        let placement =
            calculate_best_placement(&board, &moving, &moving[0], &GridConfig::default()).unwrap();
        assert_eq!((placement.row, placement.col), (1, 0));
    }

    #[test]
    fn drag_map_is_relative_to_master() {
        let moving = vec![
            Card::new(CardId(1), 1, 1).at(2, 3),
            Card::new(CardId(2), 1, 1).at(4, 1),
        ];
        let map = determine_drag_map(&moving[0], &moving);
        assert_eq!((map[0].row_offset, map[0].col_offset), (0, 0));
        assert_eq!((map[1].row_offset, map[1].col_offset), (2, -2));
    }

    #[test]
    fn negative_offsets_clamp_to_zero() {
        let board = Board::new(BoardId(1), 4);
        let mut moving = vec![
            Card::new(CardId(1), 1, 1).at(0, 2),
            Card::new(CardId(2), 1, 1).at(1, 0),
        ];
        place_cards_on_board(
            PlaceRequest::new(&board, &board).at(0, 0),
            &mut moving,
            &GridConfig::default(),
        )
        .unwrap();
        assert_eq!(spot(find(&moving, 1)), (0, 0));
        assert_eq!(spot(find(&moving, 2)), (1, 0));
    }
}
