//! Automated market-making: a driver that, once started, quotes a bid and
//! an ask around a reference price every interval, cancelling and
//! replacing its previous quotes each tick.

pub mod driver;
pub mod error;
pub mod price_source;
pub mod types;

pub use driver::{BotState, MarketMakerDriver};
pub use error::DriverError;
pub use price_source::{GateioPriceSource, PriceSource, PriceSourceError};
pub use types::{BotCommand, BotConfig, CommandResponse};
