use collection_grid::grid::{
    DragMapEntry, GridOffset, OpenSpotOptions, calculate_open_spot_matrix, determine_drag_map,
    find_closest_open_spot, overlapping_cards, place_cards_on_board, preview_drag,
};
use collection_grid::{Board, Card, GridConfig, PlaceRequest, Position};
use serde::Deserialize;
use serde_json::json;
use wasm_bindgen::prelude::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceInput {
    board: Board,
    from: Option<Board>,
    moving: Vec<Card>,
    row: Option<usize>,
    col: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenSpotInput {
    board: Board,
    position: Position,
    #[serde(default)]
    moving: Vec<Card>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DragInput {
    board: Board,
    master: GridOffset,
    moving: Vec<Card>,
    drag_map: Option<Vec<DragMapEntry>>,
}

fn to_js(error: impl ToString) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_config(config_json: Option<String>) -> Result<GridConfig, JsValue> {
    match config_json {
        Some(raw) => collection_grid::config::parse_config(&raw).map_err(to_js),
        None => Ok(GridConfig::default()),
    }
}

fn place(input: PlaceInput, config: &GridConfig) -> Result<String, String> {
    let PlaceInput {
        board,
        from,
        mut moving,
        row,
        col,
    } = input;
    let from = from.unwrap_or_else(|| board.clone());
    let mut request = PlaceRequest::new(&board, &from);
    request.row = row;
    request.col = col;
    let report = place_cards_on_board(request, &mut moving, config).map_err(|e| e.to_string())?;
    serde_json::to_string(&json!({ "cards": moving, "report": report })).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn place_cards(input_json: &str, config_json: Option<String>) -> Result<String, JsValue> {
    let input: PlaceInput = serde_json::from_str(input_json).map_err(to_js)?;
    let config = parse_config(config_json)?;
    place(input, &config).map_err(to_js)
}

#[wasm_bindgen]
pub fn closest_open_spot(input_json: &str, config_json: Option<String>) -> Result<String, JsValue> {
    let input: OpenSpotInput = serde_json::from_str(input_json).map_err(to_js)?;
    let config = parse_config(config_json)?;
    let columns = input
        .board
        .columns()
        .ok_or_else(|| to_js(format!("board {} has no column count", input.board.id)))?;
    let matrix = calculate_open_spot_matrix(
        &input.board,
        OpenSpotOptions {
            moving: &input.moving,
            ..Default::default()
        },
        &config,
    )
    .map_err(to_js)?;
    let spot = find_closest_open_spot(&input.position, &matrix, columns, &config);
    serde_json::to_string(&spot).map_err(to_js)
}

#[wasm_bindgen]
pub fn drag_preview(input_json: &str) -> Result<String, JsValue> {
    let input: DragInput = serde_json::from_str(input_json).map_err(to_js)?;
    let drag_map = match input.drag_map {
        Some(map) => map,
        None => match input.moving.first() {
            Some(master) => determine_drag_map(master, &input.moving),
            None => Vec::new(),
        },
    };
    let preview =
        preview_drag(&input.board, input.master, &drag_map, &input.moving).map_err(to_js)?;
    serde_json::to_string(&preview).map_err(to_js)
}

#[wasm_bindgen]
pub fn find_overlapping_cards(board_json: &str) -> Result<String, JsValue> {
    let board: Board = serde_json::from_str(board_json).map_err(to_js)?;
    let overlapping = overlapping_cards(&board).map_err(to_js)?;
    serde_json::to_string(&overlapping).map_err(to_js)
}
