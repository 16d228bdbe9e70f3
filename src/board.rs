use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Placeholder ids start here so they never collide with persisted ids.
const PLACEHOLDER_ID_BASE: u64 = 1 << 52;

static NEXT_PLACEHOLDER_ID: AtomicU64 = AtomicU64::new(PLACEHOLDER_ID_BASE);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl CardId {
    /// Allocates an id for a card that has not been persisted yet.
    pub fn placeholder() -> Self {
        Self(NEXT_PLACEHOLDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_placeholder(self) -> bool {
        self.0 >= PLACEHOLDER_ID_BASE
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_placeholder() {
            write!(f, "placeholder-{}", self.0 - PLACEHOLDER_ID_BASE)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub u64);

impl std::fmt::Display for BoardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    #[serde(default)]
    pub row: Option<usize>,
    #[serde(default)]
    pub col: Option<usize>,
    #[serde(default = "default_span")]
    pub width: usize,
    #[serde(default = "default_span")]
    pub height: usize,
    #[serde(default)]
    pub is_section: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub parent: Option<BoardId>,
}

fn default_span() -> usize {
    1
}

impl Card {
    pub fn new(id: CardId, width: usize, height: usize) -> Self {
        Self {
            id,
            row: None,
            col: None,
            width: width.max(1),
            height: height.max(1),
            is_section: false,
            pinned: false,
            archived: false,
            created_at: 0,
            parent: None,
        }
    }

    pub fn placeholder(width: usize, height: usize) -> Self {
        Self::new(CardId::placeholder(), width, height)
    }

    pub fn at(mut self, row: usize, col: usize) -> Self {
        self.row = Some(row);
        self.col = Some(col);
        self
    }

    pub fn section(mut self) -> Self {
        self.is_section = true;
        self
    }

    pub fn created(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_visible(&self) -> bool {
        !self.archived
    }

    pub fn is_placed(&self) -> bool {
        self.row.is_some() && self.col.is_some()
    }

    /// The card's footprint, if it has been placed.
    pub fn position(&self) -> Option<Position> {
        Some(Position {
            row: self.row?,
            col: self.col?,
            width: self.width,
            height: self.height,
        })
    }

    pub fn move_to(&mut self, spot: GridSpot) {
        self.row = Some(spot.row);
        self.col = Some(spot.col);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionKind {
    #[default]
    Board,
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    #[serde(default)]
    pub kind: CollectionKind,
    #[serde(default)]
    pub num_columns: Option<usize>,
    /// Cards in the board's current display order.
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl Board {
    pub fn new(id: BoardId, num_columns: usize) -> Self {
        Self {
            id,
            kind: CollectionKind::Board,
            num_columns: Some(num_columns),
            cards: Vec::new(),
        }
    }

    pub fn list(id: BoardId) -> Self {
        Self {
            id,
            kind: CollectionKind::List,
            num_columns: None,
            cards: Vec::new(),
        }
    }

    pub fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = cards;
        self
    }

    pub fn is_board(&self) -> bool {
        self.kind == CollectionKind::Board
    }

    /// Column count, treating zero the same as unset.
    pub fn columns(&self) -> Option<usize> {
        self.num_columns.filter(|cols| *cols > 0)
    }

    pub fn visible_cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(|card| card.is_visible())
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub row: usize,
    pub col: usize,
    pub width: usize,
    pub height: usize,
}

impl Position {
    pub fn new(row: usize, col: usize, width: usize, height: usize) -> Self {
        Self {
            row,
            col,
            width,
            height,
        }
    }

    pub fn max_row(&self) -> usize {
        self.row + self.height.max(1) - 1
    }

    pub fn max_col(&self) -> usize {
        self.col + self.width.max(1) - 1
    }

    pub fn spot(&self) -> GridSpot {
        GridSpot {
            row: self.row,
            col: self.col,
        }
    }

    pub fn contains(&self, other: &Position) -> bool {
        other.row >= self.row
            && other.col >= self.col
            && other.max_row() <= self.max_row()
            && other.max_col() <= self.max_col()
    }

    pub fn intersects(&self, other: &Position) -> bool {
        self.row <= other.max_row()
            && other.row <= self.max_row()
            && self.col <= other.max_col()
            && other.col <= self.max_col()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSpot {
    pub row: usize,
    pub col: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_ids_are_unique_and_flagged() {
        let a = CardId::placeholder();
        let b = CardId::placeholder();
        assert_ne!(a, b);
        assert!(a.is_placeholder());
        assert!(!CardId(42).is_placeholder());
    }

    #[test]
    fn card_defaults_from_minimal_json() {
        let card: Card = serde_json::from_str(r#"{"id": 7, "row": 1, "col": 2}"#).unwrap();
        assert_eq!(card.width, 1);
        assert_eq!(card.height, 1);
        assert!(!card.is_section);
        assert_eq!(card.position(), Some(Position::new(1, 2, 1, 1)));
    }

    #[test]
    fn unplaced_card_has_no_position() {
        let card = Card::new(CardId(1), 2, 1);
        assert!(card.position().is_none());
        assert!(!card.is_placed());
    }

    #[test]
    fn position_contains_and_intersects() {
        let section = Position::new(0, 0, 4, 3);
        let inside = Position::new(1, 1, 2, 1);
        let straddling = Position::new(2, 3, 2, 1);
        assert!(section.contains(&inside));
        assert!(!section.contains(&straddling));
        assert!(section.intersects(&straddling));
        assert!(!inside.intersects(&Position::new(0, 3, 1, 1)));
    }

    #[test]
    fn zero_columns_counts_as_missing() {
        let mut board = Board::new(BoardId(1), 0);
        assert!(board.columns().is_none());
        board.num_columns = Some(16);
        assert_eq!(board.columns(), Some(16));
    }
}
