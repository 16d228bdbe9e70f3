use thiserror::Error;

use crate::board::{BoardId, CardId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("board {board} has no column count")]
    InvalidBoard { board: BoardId },
    #[error("card {card} has no row/col")]
    UnplacedCard { card: CardId },
    #[error("card {card} is not on the board")]
    UnknownCard { card: CardId },
}

pub type GridResult<T> = Result<T, GridError>;
