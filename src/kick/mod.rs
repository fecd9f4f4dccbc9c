pub mod api;
pub mod connection;
pub mod event_parser;
pub mod payloads;

pub use connection::{KickConnection, KickSettings};
