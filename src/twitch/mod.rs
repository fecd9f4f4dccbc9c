pub mod commands;
pub mod connection;
pub mod line_parser;
pub mod sub_tier;
pub mod tag_values;
pub mod tags;

pub use connection::{TwitchConnection, TwitchCredentials, TwitchSettings};
