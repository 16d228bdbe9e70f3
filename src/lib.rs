pub mod board;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod grid;
pub mod grid_dump;

pub use board::{Board, BoardId, Card, CardId, CollectionKind, GridSpot, Position};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{GridConfig, load_config};
pub use grid::{
    GridError, GridResult, PlaceRequest, PlacementReport, calculate_rows_cols,
    find_closest_open_spot, overlapping_cards, place_cards_on_board, uninterrupted_cards_below,
};
pub use grid_dump::{GridDump, write_grid_dump};
