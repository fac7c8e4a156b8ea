pub mod app;
pub mod checks;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod state;
pub mod utils;
pub mod web;
