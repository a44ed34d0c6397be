use serde::Serialize;

/// Outcome of one settlement leg (source-chain or destination-chain).
#[derive(Debug, Clone, Serialize)]
pub struct LegResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True for the destination leg of a same-chain trade, which needs no
    /// second call since one leg already moved both assets.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LegResult {
    pub fn ok(tx_hash: String) -> Self {
        Self {
            success: true,
            tx_hash: Some(tx_hash),
            error: None,
            skipped: false,
            reason: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_hash: None,
            error: Some(error.into()),
            skipped: false,
            reason: None,
        }
    }

    pub fn skipped_same_chain() -> Self {
        Self {
            success: true,
            tx_hash: None,
            error: None,
            skipped: true,
            reason: Some("same_chain_single_leg".to_string()),
        }
    }
}

/// Settlement outcome for one trade: both legs, and whether both succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct TradeSettlementResult {
    pub success: bool,
    pub source_chain: LegResult,
    pub destination_chain: LegResult,
}

/// Settlement outcome for an entire order's trades.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSettlementResult {
    pub settled: bool,
    pub settlement_results: Vec<TradeSettlementResult>,
    pub total_trades: usize,
    pub successful_settlements: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
