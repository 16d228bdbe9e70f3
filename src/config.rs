use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rows below the requested row that the open-spot finder will consider.
pub const SEARCH_WINDOW_ROWS: usize = 20;
/// The finder stops collecting candidates once it holds this many.
pub const MAX_CANDIDATES: usize = 32;
/// Empty rows appended under every open-spot matrix so a fit always exists.
pub const BUFFER_ROWS: usize = 4;
/// Weight applied to the column difference of candidates left of the target.
pub const LEFT_BIAS: f64 = 1.01;
/// Weight applied to the column difference of candidates right of the target.
pub const RIGHT_BIAS: f64 = 0.99;
/// Column count used when normalizing list-style cards.
pub const DEFAULT_LAYOUT_COLUMNS: usize = 4;
/// Best placement only continues the last card's row if it starts left of this column.
pub const BEST_PLACEMENT_MAX_COL: usize = 6;
pub const MAX_CARD_WIDTH: usize = 4;
pub const MAX_CARD_HEIGHT: usize = 2;
pub const MIN_SECTION_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    pub search_window_rows: usize,
    pub max_candidates: usize,
    pub buffer_rows: usize,
    pub left_bias: f64,
    pub right_bias: f64,
    pub default_layout_columns: usize,
    pub best_placement_max_col: usize,
    pub max_card_width: usize,
    pub max_card_height: usize,
    pub min_section_size: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            search_window_rows: SEARCH_WINDOW_ROWS,
            max_candidates: MAX_CANDIDATES,
            buffer_rows: BUFFER_ROWS,
            left_bias: LEFT_BIAS,
            right_bias: RIGHT_BIAS,
            default_layout_columns: DEFAULT_LAYOUT_COLUMNS,
            best_placement_max_col: BEST_PLACEMENT_MAX_COL,
            max_card_width: MAX_CARD_WIDTH,
            max_card_height: MAX_CARD_HEIGHT,
            min_section_size: MIN_SECTION_SIZE,
        }
    }
}

/// Loads tuning overrides from a JSON5 file. Keys absent from the file keep
/// their defaults; no path means defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<GridConfig> {
    let Some(path) = path else {
        return Ok(GridConfig::default());
    };

    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
        .map_err(|err| anyhow::anyhow!("invalid config file {}: {err}", path.display()))
}

pub fn parse_config(contents: &str) -> anyhow::Result<GridConfig> {
    let config: GridConfig = json5::from_str(contents)?;
    if config.default_layout_columns == 0 {
        return Err(anyhow::anyhow!("defaultLayoutColumns must be at least 1"));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_named_constants() {
        let config = GridConfig::default();
        assert_eq!(config.search_window_rows, 20);
        assert_eq!(config.max_candidates, 32);
        assert_eq!(config.buffer_rows, 4);
        assert_eq!(config.left_bias, 1.01);
        assert_eq!(config.right_bias, 0.99);
    }

    #[test]
    fn partial_json5_overrides_keep_other_defaults() {
        let config = parse_config(
            r#"{
                // widen the search for tall boards
                searchWindowRows: 40,
            }"#,
        )
        .unwrap();
        assert_eq!(config.search_window_rows, 40);
        assert_eq!(config.max_candidates, MAX_CANDIDATES);
    }

    #[test]
    fn rejects_zero_layout_columns() {
        assert!(parse_config("{ defaultLayoutColumns: 0 }").is_err());
    }

    #[test]
    fn missing_path_yields_defaults() {
        assert_eq!(load_config(None).unwrap(), GridConfig::default());
    }
}
