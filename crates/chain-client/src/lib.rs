//! Chain access layer: a `ChainClient` trait abstracting RPC reads and writes
//! against whichever chain a network config points at, a production
//! `ethers`-backed implementation, and a deterministic in-memory fake for
//! tests in the `validator` and `settlement` crates.

pub mod client;
pub mod error;
pub mod escrow;
pub mod ethers_client;
pub mod fake;
pub mod registry;

pub use client::{ChainClient, SettleParams, SettleReceipt};
pub use error::ChainClientError;
pub use escrow::EscrowBalance;
pub use ethers_client::EthersChainClient;
pub use fake::FakeChainClient;
pub use registry::{NetworkConfig, TokenRegistry};
