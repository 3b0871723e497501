//! Typed trade intent built from a validated webhook payload

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{Direction, OptionKind, OrderType};

/// How the strike is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrikeSelector {
    /// Exact strike price
    Strike(Decimal),
    /// Delta target in hundredths, -99..=99 excluding zero
    Delta(i32),
}

impl StrikeSelector {
    /// Delta target as a signed fraction: negative for puts, positive for calls
    pub fn signed_delta(delta: i32, kind: OptionKind) -> Decimal {
        let magnitude = Decimal::new(i64::from(delta.abs()), 2);
        match kind {
            OptionKind::Call => magnitude,
            OptionKind::Put => -magnitude,
        }
    }
}

/// How the expiration is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpirySelector {
    Date(NaiveDate),
    /// Nearest listed expiration to this many days out
    DaysToExpiration(i64),
}

/// A fully validated trading signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub ticker: String,
    /// Underlying price at signal time
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub option_kind: OptionKind,
    pub direction: Direction,
    pub quantity: u32,
    pub strike: StrikeSelector,
    pub expiry: ExpirySelector,
    /// Spread width in strikes; 0 trades a single contract
    pub width: usize,
    /// `None` uses the configured default
    pub order_type: Option<OrderType>,
}

impl TradeIntent {
    pub fn is_opening(&self) -> bool {
        self.direction.is_opening()
    }

    pub fn is_spread(&self) -> bool {
        self.width > 0
    }

    /// Leg quantity signed by direction: bought positive, sold negative
    pub fn signed_quantity(&self) -> Decimal {
        Decimal::from(self.quantity) * Decimal::from(self.direction.sign())
    }

    pub fn order_type_or(&self, default: OrderType) -> OrderType {
        self.order_type.unwrap_or(default)
    }
}
