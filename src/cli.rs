use crate::board::{Board, Card, CardId, Position};
use crate::config::{GridConfig, load_config};
use crate::grid::{
    GridError, OpenSpotOptions, PlaceRequest, SequentialOptions, calculate_open_spot_matrix,
    calculate_rows_cols, find_closest_open_spot, overlapping_cards, place_cards_on_board,
    uninterrupted_cards_below,
};
use crate::grid_dump::{GridDump, write_grid_dump};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gridcalc", version, about = "Board grid placement and collision engine")]
pub struct Args {
    /// Scenario file (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Tuning file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Operation to run against the scenario
    #[arg(long = "op", value_enum, default_value = "place")]
    pub operation: Operation,

    /// Also write the resulting board's occupancy grid to this file
    #[arg(long = "dumpFile")]
    pub dump: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Place,
    Layout,
    Overlaps,
    Below,
    Dump,
    OpenSpot,
}

/// Input for one run: the board plus whatever the operation needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub board: Board,
    #[serde(default)]
    pub from: Option<Board>,
    #[serde(default)]
    pub moving: Vec<Card>,
    #[serde(default)]
    pub row: Option<usize>,
    #[serde(default)]
    pub col: Option<usize>,
    #[serde(default)]
    pub selected: Option<CardId>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub columns: Option<usize>,
    #[serde(default)]
    pub prefilled: usize,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let scenario: Scenario = serde_json::from_str(&input)?;
    let (output, board) = run_scenario(args.operation, scenario, &config)?;

    if let Some(path) = args.dump.as_deref() {
        write_grid_dump(path, &board)?;
    }
    write_output(&output, args.output.as_deref())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Runs one operation, returning its JSON result and the board as it looks
/// afterwards.
pub fn run_scenario(
    operation: Operation,
    scenario: Scenario,
    config: &GridConfig,
) -> Result<(Value, Board)> {
    let Scenario {
        mut board,
        from,
        mut moving,
        row,
        col,
        selected,
        position,
        columns,
        prefilled,
    } = scenario;

    let output = match operation {
        Operation::Place => {
            let from = from.unwrap_or_else(|| board.clone());
            let mut request = PlaceRequest::new(&board, &from);
            request.row = row;
            request.col = col;
            let report = place_cards_on_board(request, &mut moving, config)?;
            let output = json!({ "cards": moving, "report": report });
            merge_cards(&mut board, &moving);
            output
        }
        Operation::Layout => {
            let options = SequentialOptions {
                num_columns: columns.unwrap_or(config.default_layout_columns),
                prefilled,
            };
            calculate_rows_cols(&mut moving, options);
            json!({ "cards": moving })
        }
        Operation::Overlaps => {
            json!({ "overlapping": overlapping_cards(&board)? })
        }
        Operation::Below => {
            let id = selected.ok_or_else(|| anyhow::anyhow!("scenario needs a 'selected' card id"))?;
            let card = board
                .card(id)
                .ok_or(GridError::UnknownCard { card: id })?;
            json!({ "cards": uninterrupted_cards_below(card, &board)? })
        }
        Operation::Dump => serde_json::to_value(GridDump::from_board(&board)?)?,
        Operation::OpenSpot => {
            let position =
                position.ok_or_else(|| anyhow::anyhow!("scenario needs a 'position'"))?;
            let num_columns = board
                .columns()
                .ok_or(GridError::InvalidBoard { board: board.id })?;
            let matrix = calculate_open_spot_matrix(
                &board,
                OpenSpotOptions {
                    moving: &moving,
                    ..Default::default()
                },
                config,
            )?;
            json!({ "spot": find_closest_open_spot(&position, &matrix, num_columns, config) })
        }
    };
    Ok((output, board))
}

/// Writes placed cards back onto the board, replacing cards with the same id.
fn merge_cards(board: &mut Board, placed: &[Card]) {
    for card in placed {
        match board.cards.iter_mut().find(|existing| existing.id == card.id) {
            Some(existing) => *existing = card.clone(),
            None => board.cards.push(card.clone()),
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(output: &Value, path: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(output)?;
    match path {
        Some(path) => std::fs::write(path, text + "\n")?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{text}")?;
        }
    }
    Ok(())
}
