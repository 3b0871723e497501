//! Broker position, reference data and derived analytics types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{InstrumentType, QuantityDirection};

/// A holding as reported by the broker, with marks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPosition {
    pub account_number: String,
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub underlying_symbol: String,
    /// Always non-negative; see `quantity_direction`
    pub quantity: Decimal,
    pub quantity_direction: QuantityDirection,
    pub multiplier: Decimal,
    pub average_open_price: Decimal,
    /// Market value of the whole holding
    #[serde(default)]
    pub mark: Option<Decimal>,
    /// Per-unit mark price
    #[serde(default)]
    pub mark_price: Option<Decimal>,
    #[serde(default)]
    pub close_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl RawPosition {
    pub fn signed_quantity(&self) -> Decimal {
        self.quantity * self.quantity_direction.sign()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityOptionInfo {
    pub symbol: String,
    pub streamer_symbol: String,
    pub underlying_symbol: String,
    pub strike_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureOptionInfo {
    pub symbol: String,
    pub streamer_symbol: String,
    /// The future contract this option settles into
    pub underlying_symbol: String,
    /// Product root used for market metrics (e.g. "/ES")
    pub root_symbol: String,
    pub strike_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityInfo {
    pub symbol: String,
    pub streamer_symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureInfo {
    pub symbol: String,
    pub streamer_symbol: String,
    /// Product root used for market metrics (e.g. "/ES")
    pub root_symbol: String,
    pub notional_multiplier: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoInfo {
    pub symbol: String,
    pub streamer_symbol: String,
}

/// Per-symbol market metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub symbol: String,
    #[serde(default)]
    pub beta: Option<Decimal>,
    /// Implied-volatility rank as a fraction (0..1)
    #[serde(default)]
    pub iv_rank: Option<Decimal>,
    #[serde(default)]
    pub dividend_next_date: Option<NaiveDate>,
    #[serde(default)]
    pub earnings_next_date: Option<NaiveDate>,
}

/// Reference data resolved for one position
///
/// Each variant carries exactly what its analytics formula needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instrument {
    EquityOption(EquityOptionInfo),
    FutureOption {
        option: FutureOptionInfo,
        future: FutureInfo,
    },
    Equity(EquityInfo),
    Future(FutureInfo),
    Cryptocurrency(CryptoInfo),
}

/// Analytics computed for one position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionAnalytics {
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub streamer_symbol: String,
    pub quantity: Decimal,
    pub quantity_direction: QuantityDirection,
    pub multiplier: Decimal,
    pub average_open_price: Decimal,
    pub mark_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub strike: Option<Decimal>,
    pub previous_close: Decimal,
    pub day_change: Decimal,
    pub pnl_day: Decimal,
    pub pnl_total: Decimal,
    pub trade_price: Decimal,
    /// Percentage (0..100)
    pub iv_rank: Option<Decimal>,
    pub delta: Decimal,
    pub theta: Decimal,
    pub gamma: Decimal,
    pub beta_delta: Decimal,
    pub net_liquidity: Decimal,
    pub dividend_next_date: Option<NaiveDate>,
    pub earnings_next_date: Option<NaiveDate>,
}

/// Positions plus portfolio-level sums
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub positions: Vec<PositionAnalytics>,
    /// Symbols left out because their instrument class is not handled
    pub skipped: Vec<String>,
    pub net_liquidity: Decimal,
    pub pnl_total: Decimal,
    pub pnl_day: Decimal,
    pub delta: Decimal,
    pub theta: Decimal,
    pub gamma: Decimal,
    pub beta_delta: Decimal,
}

impl PortfolioSummary {
    /// Add one position and fold it into the sums
    pub fn push(&mut self, position: PositionAnalytics) {
        self.net_liquidity += position.net_liquidity;
        self.pnl_total += position.pnl_total;
        self.pnl_day += position.pnl_day;
        self.delta += position.delta;
        self.theta += position.theta;
        self.gamma += position.gamma;
        self.beta_delta += position.beta_delta;
        self.positions.push(position);
    }

    /// Distance from the beta-weighted delta target when it exceeds `variation`
    pub fn delta_target_breach(&self, target: Decimal, variation: Decimal) -> Option<Decimal> {
        let diff = target - self.beta_delta;
        if diff.abs() > variation {
            Some(diff)
        } else {
            None
        }
    }
}
