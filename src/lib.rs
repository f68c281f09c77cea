// Public API for integration tests and the server binary

pub mod bot;
pub mod command;
pub mod config;
pub mod export;
pub mod extract;
pub mod gateway;
pub mod identity;
pub mod leaderboard;
pub mod proof;
pub mod protocol;
pub mod puzzle;
pub mod store;
pub mod types;
