use rust_decimal::Decimal;
use serde::Serialize;

/// Outcome of validating one order against escrow. `valid = false` always
/// carries a `reason`; fail-closed on any error resolving decimals or
/// balance, since an order that can't be checked can't be trusted.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub network_key: String,
    pub token: String,
    pub required_amount: Decimal,
    pub available: Decimal,
}

impl ValidationResult {
    pub fn reject(network_key: String, token: String, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            network_key,
            token,
            required_amount: Decimal::ZERO,
            available: Decimal::ZERO,
        }
    }
}
