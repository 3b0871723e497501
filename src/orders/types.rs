//! Order, leg and broker response types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::BrokerMessage;
use crate::common::types::{InstrumentType, OrderType, PriceEffect, TimeInForce};

/// Leg action sent to the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderAction {
    #[serde(rename = "Buy to Open")]
    BuyToOpen,
    #[serde(rename = "Sell to Open")]
    SellToOpen,
    #[serde(rename = "Buy to Close")]
    BuyToClose,
    #[serde(rename = "Sell to Close")]
    SellToClose,
    Buy,
    Sell,
}

impl OrderAction {
    /// Action for a signed leg quantity: positive buys, negative sells
    pub fn for_quantity(quantity: Decimal, opening: bool) -> Self {
        match (quantity.is_sign_negative(), opening) {
            (false, true) => OrderAction::BuyToOpen,
            (true, true) => OrderAction::SellToOpen,
            (false, false) => OrderAction::BuyToClose,
            (true, false) => OrderAction::SellToClose,
        }
    }
}

/// A single leg of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLeg {
    pub symbol: String,
    pub instrument_type: InstrumentType,
    /// Positive = bought, negative = sold
    pub quantity: Decimal,
    pub action: OrderAction,
}

impl OrderLeg {
    pub fn new(
        symbol: impl Into<String>,
        instrument_type: InstrumentType,
        quantity: Decimal,
        opening: bool,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            instrument_type,
            quantity,
            action: OrderAction::for_quantity(quantity, opening),
        }
    }
}

/// An order ready for dry-run and placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedOrder {
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub legs: Vec<OrderLeg>,
    /// Net price per unit; negative is a credit. `None` for market and stop orders.
    pub price: Option<Decimal>,
    pub price_effect: PriceEffect,
    #[serde(default)]
    pub stop_trigger: Option<Decimal>,
}

impl PricedOrder {
    pub fn is_credit(&self) -> bool {
        self.price_effect == PriceEffect::Credit
    }

    pub fn leg_symbols(&self) -> Vec<&str> {
        self.legs.iter().map(|l| l.symbol.as_str()).collect()
    }
}

/// Effect of an order on buying power
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyingPowerEffect {
    pub change_in_buying_power: Decimal,
    pub change_in_buying_power_effect: PriceEffect,
    #[serde(default)]
    pub current_buying_power: Decimal,
    #[serde(default)]
    pub new_buying_power: Decimal,
}

impl BuyingPowerEffect {
    /// Change in buying power, negative when the order consumes it
    pub fn signed_change(&self) -> Decimal {
        match self.change_in_buying_power_effect {
            PriceEffect::Debit => -self.change_in_buying_power.abs(),
            _ => self.change_in_buying_power.abs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCalculation {
    pub total_fees: Decimal,
}

/// Broker response to a dry-run or live placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrderResponse {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub buying_power_effect: BuyingPowerEffect,
    #[serde(default)]
    pub fee_calculation: Option<FeeCalculation>,
    #[serde(default)]
    pub warnings: Vec<BrokerMessage>,
    #[serde(default)]
    pub errors: Vec<BrokerMessage>,
}

impl PlacedOrderResponse {
    pub fn total_fees(&self) -> Decimal {
        self.fee_calculation
            .as_ref()
            .map(|f| f.total_fees)
            .unwrap_or_default()
    }
}

/// Outcome of a successful live placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub order: PricedOrder,
    pub order_id: Option<String>,
    pub status: Option<String>,
    pub buying_power_change: Decimal,
    /// Buying-power change as a percentage of net liquidating value
    pub buying_power_pct: Decimal,
    pub fees: Decimal,
    pub warnings: Vec<BrokerMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_action_from_signed_quantity() {
        assert_eq!(OrderAction::for_quantity(dec!(1), true), OrderAction::BuyToOpen);
        assert_eq!(OrderAction::for_quantity(dec!(-1), true), OrderAction::SellToOpen);
        assert_eq!(OrderAction::for_quantity(dec!(2), false), OrderAction::BuyToClose);
        assert_eq!(OrderAction::for_quantity(dec!(-2), false), OrderAction::SellToClose);
    }

    #[test]
    fn test_action_serializes_with_broker_labels() {
        let json = serde_json::to_string(&OrderAction::SellToClose).unwrap();
        assert_eq!(json, "\"Sell to Close\"");
    }

    #[test]
    fn test_buying_power_signed_change() {
        let debit = BuyingPowerEffect {
            change_in_buying_power: dec!(250),
            change_in_buying_power_effect: PriceEffect::Debit,
            current_buying_power: dec!(1000),
            new_buying_power: dec!(750),
        };
        assert_eq!(debit.signed_change(), dec!(-250));
    }
}
