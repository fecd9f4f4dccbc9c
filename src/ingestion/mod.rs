pub mod buffer;
pub mod ledger;

pub use buffer::{FlushReport, IngestionBuffer};
pub use ledger::FirstInteractionLedger;
