//! Cross-chain settlement: takes the trades a match produced and moves each
//! leg (source-chain escrow release, destination-chain counter-asset
//! delivery) through the chain client, with retry, idempotency, and a
//! synchronous-with-timeout or fully-asynchronous execution mode.

pub mod coordinator;
pub mod result;

pub use coordinator::{SettlementCoordinator, SettlementExecution};
pub use result::{LegResult, OrderSettlementResult, TradeSettlementResult};
