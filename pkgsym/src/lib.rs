#![warn(clippy::all, clippy::pedantic)]

pub mod backend;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod links;
pub mod manifest;
pub mod prefs;
pub mod process;
pub mod project;
pub mod recent;
pub mod refresh;
pub mod symlinker;
pub mod utils;

mod test_utils;
