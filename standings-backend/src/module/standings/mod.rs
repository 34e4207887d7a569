///! Tournament standings ingestion
///!
///! Parses uploaded standings sheets into the shared record model.

pub mod parser;

pub use parser::{parse_standings_csv, parse_standings_file, parse_standings_reader};
pub use standings_common::{LabelSet, LayoutVariant, TeamRecord};
