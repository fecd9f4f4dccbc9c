#![allow(async_fn_in_trait)]

pub mod assets;
pub mod avatar;
pub mod chat_message;
pub mod connection_state;
pub mod errors;
pub mod ingestion;
pub mod kick;
pub mod locale;
pub mod logging;
pub mod orchestrator;
pub mod socket_session;
pub mod twitch;
#[cfg(test)]
pub mod testing_helper_methods;

pub use chat_message::{ChatEvent, ChatMessage, Platform};
pub use errors::AppError;
pub use orchestrator::{ChatOrchestrator, ChatRenderer, Credentials, OrchestratorSettings, UserCommand};
