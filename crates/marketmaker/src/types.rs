use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::driver::BotState;

/// Parameters for starting the bot, mirroring the original command payload:
/// required account/assets/quantity, optional spread and a manual
/// reference price override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub account: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub quantity: Decimal,
    #[serde(default = "default_spread_percentage")]
    pub spread_percentage: Decimal,
    #[serde(default)]
    pub reference_price: Option<Decimal>,
    pub from_network: String,
    pub to_network: String,
}

fn default_spread_percentage() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

/// Commands accepted by the bot's control surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BotCommand {
    Start(BotConfig),
    Stop,
    Status,
    /// Forces an immediate quote update without waiting for the next tick.
    Register,
    /// Cancels every order currently resting from this bot's last tick.
    Cancel,
    Modify { spread_percentage: Decimal },
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub state: BotState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
