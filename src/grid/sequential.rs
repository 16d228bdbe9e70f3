use crate::board::{Card, CardId};
use crate::config::DEFAULT_LAYOUT_COLUMNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Empty,
    Prefilled,
    Taken(CardId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialOptions {
    pub num_columns: usize,
    /// Cells at the start of the first row treated as already taken.
    pub prefilled: usize,
}

impl Default for SequentialOptions {
    fn default() -> Self {
        Self {
            num_columns: DEFAULT_LAYOUT_COLUMNS,
            prefilled: 0,
        }
    }
}

/// Partitions the indexes of `values` into runs where the item equals `value`.
pub fn group_by_consecutive<T: PartialEq>(values: &[T], value: &T) -> Vec<Vec<usize>> {
    let mut groups = Vec::new();
    let mut buffer = Vec::new();
    for (idx, item) in values.iter().enumerate() {
        if item == value {
            buffer.push(idx);
        } else if !buffer.is_empty() {
            groups.push(std::mem::take(&mut buffer));
        }
    }
    if !buffer.is_empty() {
        groups.push(buffer);
    }
    groups
}

/// Assigns row/col to every card in input order, packing them left to right
/// and top to bottom into `num_columns` columns.
///
/// Each card takes the first gap in the current row wide enough for it; when
/// no gap fits, the cursor moves to the next row. A card that reaches the last
/// column also advances the cursor. Cards wider than the grid are laid out as
/// if they were exactly as wide as it.
pub fn calculate_rows_cols(cards: &mut [Card], options: SequentialOptions) -> &mut [Card] {
    let columns = options.num_columns.max(1);
    let mut grid: Vec<Vec<Cell>> = vec![vec![Cell::Empty; columns]];
    for cell in grid[0].iter_mut().take(options.prefilled) {
        *cell = Cell::Prefilled;
    }

    let mut row = 0;
    for card in cards.iter_mut() {
        let width = card.width.clamp(1, columns);
        let height = card.height.max(1);
        loop {
            let gaps = group_by_consecutive(&grid[row], &Cell::Empty);
            let Some(col) = gaps.iter().find(|gap| gap.len() >= width).map(|gap| gap[0]) else {
                row += 1;
                ensure_row(&mut grid, row, columns);
                continue;
            };

            card.row = Some(row);
            card.col = Some(col);
            for fill_row in row..row + height {
                ensure_row(&mut grid, fill_row, columns);
                for cell in &mut grid[fill_row][col..col + width] {
                    *cell = Cell::Taken(card.id);
                }
            }
            if grid[row].last() == Some(&Cell::Taken(card.id)) {
                row += 1;
                ensure_row(&mut grid, row, columns);
            }
            break;
        }
    }
    cards
}

fn ensure_row(grid: &mut Vec<Vec<Cell>>, row: usize, columns: usize) {
    while grid.len() <= row {
        grid.push(vec![Cell::Empty; columns]);
    }
}
