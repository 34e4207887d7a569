///! Standings card pipeline: ingest, render, export

pub mod controller;
pub mod export;
pub mod renderer;
pub mod standings;
