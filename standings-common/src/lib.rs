///! Shared data model for the standings card workspace

mod types;
pub use types::*;
