//! Ledger module - trade instructions, positions, and the batch application math.

mod ledger_apply;
mod ledger_errors;
mod ledger_model;
mod ledger_traits;

// Re-export the public interface
pub use ledger_apply::{apply_instruction, LedgerState};
pub use ledger_errors::LedgerError;
pub use ledger_model::{Position, TradeInstruction};
pub use ledger_traits::LedgerExecutorTrait;
