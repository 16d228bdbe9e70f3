use crate::board::{Board, CardId};
use crate::grid::{CardMatrix, GridResult, MatrixOptions, build_occupancy_matrix};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDump {
    pub board: String,
    pub num_columns: usize,
    pub rows: Vec<Vec<Option<CardId>>>,
    pub cards: Vec<CardDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDump {
    pub id: CardId,
    pub row: Option<usize>,
    pub col: Option<usize>,
    pub width: usize,
    pub height: usize,
    pub is_section: bool,
    pub in_matrix: bool,
}

impl GridDump {
    pub fn from_matrix(board: &Board, matrix: &CardMatrix) -> Self {
        let cards = board
            .visible_cards()
            .map(|card| CardDump {
                id: card.id,
                row: card.row,
                col: card.col,
                width: card.width,
                height: card.height,
                is_section: card.is_section,
                in_matrix: matrix.contains_card(card.id),
            })
            .collect();

        GridDump {
            board: board.id.to_string(),
            num_columns: matrix.columns(),
            rows: matrix.ids(),
            cards,
        }
    }

    pub fn from_board(board: &Board) -> GridResult<Self> {
        let matrix = build_occupancy_matrix(board, MatrixOptions::default())?;
        Ok(Self::from_matrix(board, &matrix))
    }

    /// One line per row, card ids in occupied cells and `.` in empty ones.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| cell.map_or_else(|| ".".to_string(), |id| id.to_string()))
                .collect();
            out.push_str(&cells.join(" "));
            out.push('\n');
        }
        out
    }
}

pub fn write_grid_dump(path: &Path, board: &Board) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = GridDump::from_board(board)?;
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
