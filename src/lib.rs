pub mod api;
pub mod cli;
pub mod collections;
pub mod config;
pub mod error;
pub mod extract;
pub mod migrate;
pub mod path;
pub mod resolve;
pub mod text;
pub mod workspace;
