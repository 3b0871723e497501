//! Builds orders from resolved contracts and from held positions

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::debug;

use super::pricing::{limit_price, price_effect};
use super::types::{OrderAction, OrderLeg, PricedOrder};
use crate::chain::types::ContractSelection;
use crate::common::errors::{ResolutionError, Result};
use crate::common::types::{
    InstrumentType, OrderType, PriceEffect, QuantityDirection, Quote, TimeInForce,
};
use crate::portfolio::types::RawPosition;

/// Order for `selection` with the primary leg at `quantity`
///
/// A positive quantity buys the primary leg; the far leg of a spread takes
/// the opposite side. Only limit orders carry a price.
pub fn build_option_order(
    selection: &ContractSelection,
    quantity: Decimal,
    opening: bool,
    order_type: OrderType,
    time_in_force: TimeInForce,
    quotes: &HashMap<String, Quote>,
) -> Result<PricedOrder> {
    if let (ContractSelection::Spread { width, .. }, OrderType::Market) = (selection, order_type)
    {
        return Err(ResolutionError::SpreadRequiresPricedOrder { width: *width }.into());
    }

    let buying = quantity.is_sign_positive();
    let mut legs = Vec::with_capacity(2);
    match selection {
        ContractSelection::Single(contract) => {
            legs.push(OrderLeg::new(
                contract.symbol.clone(),
                contract.instrument_type(),
                quantity,
                opening,
            ));
        }
        ContractSelection::Spread { near, far, .. } => {
            legs.push(OrderLeg::new(
                near.symbol.clone(),
                near.instrument_type(),
                quantity,
                opening,
            ));
            legs.push(OrderLeg::new(
                far.symbol.clone(),
                far.instrument_type(),
                -quantity,
                opening,
            ));
        }
    }

    let (price, effect) = match order_type {
        OrderType::Limit => {
            let price = limit_price(selection, quotes, buying)?;
            (Some(price), price_effect(price))
        }
        OrderType::Market | OrderType::Stop => {
            let effect = if buying {
                PriceEffect::Debit
            } else {
                PriceEffect::Credit
            };
            (None, effect)
        }
    };

    debug!(%order_type, ?price, legs = legs.len(), "Built option order");
    Ok(PricedOrder {
        order_type,
        time_in_force,
        legs,
        price,
        price_effect: effect,
        stop_trigger: None,
    })
}

/// Limit order closing every given position
///
/// Futures close with plain buy/sell, everything else with buy/sell to close.
/// Cryptocurrency forces GTC. Without `price_override` the price is the
/// direction-signed sum of mark prices rounded to cents; a positive sum
/// closes for a credit.
pub fn build_closing_order(
    positions: &[RawPosition],
    price_override: Option<Decimal>,
) -> Result<PricedOrder> {
    let first = positions.first().ok_or_else(|| ResolutionError::NotClosable {
        symbol: String::new(),
        reason: "no positions selected".to_string(),
    })?;

    let mut legs = Vec::with_capacity(positions.len());
    let mut total = Decimal::ZERO;
    let mut time_in_force = TimeInForce::Day;

    for position in positions {
        if position.account_number != first.account_number {
            return Err(ResolutionError::NotClosable {
                symbol: position.symbol.clone(),
                reason: "all legs must be in the same account".to_string(),
            }
            .into());
        }
        if position.quantity_direction == QuantityDirection::Zero
            || position.instrument_type == InstrumentType::Unknown
        {
            return Err(ResolutionError::NotClosable {
                symbol: position.symbol.clone(),
                reason: format!(
                    "{} position with direction {:?}",
                    position.instrument_type, position.quantity_direction
                ),
            }
            .into());
        }

        let mark = position.mark_price.unwrap_or_default();
        total += mark * position.quantity_direction.sign();

        // Closing a long sells, closing a short buys
        let quantity = -position.signed_quantity();
        let action = match position.instrument_type {
            InstrumentType::Future if quantity.is_sign_negative() => OrderAction::Sell,
            InstrumentType::Future => OrderAction::Buy,
            _ => OrderAction::for_quantity(quantity, false),
        };
        if position.instrument_type == InstrumentType::Cryptocurrency {
            time_in_force = TimeInForce::Gtc;
        }

        legs.push(OrderLeg {
            symbol: position.symbol.clone(),
            instrument_type: position.instrument_type.clone(),
            quantity,
            action,
        });
    }

    let total = price_override.unwrap_or_else(|| total.round_dp(2));
    // Positive totals are received
    let price = -total;

    Ok(PricedOrder {
        order_type: OrderType::Limit,
        time_in_force,
        legs,
        price: Some(price),
        price_effect: price_effect(price),
        stop_trigger: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::{OptionContract, TickSize};
    use crate::common::errors::TradeError;
    use crate::common::types::OptionKind;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn contract(symbol: &str, strike: Decimal) -> OptionContract {
        OptionContract {
            symbol: symbol.to_string(),
            streamer_symbol: format!(".{}", symbol),
            root_symbol: "SPY".to_string(),
            underlying_symbol: "SPY".to_string(),
            option_kind: OptionKind::Put,
            strike,
            expiration: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            tick_sizes: vec![TickSize {
                value: dec!(0.01),
                threshold: None,
            }],
        }
    }

    fn quotes() -> HashMap<String, Quote> {
        [(".P600", dec!(4.10), dec!(4.20)), (".P590", dec!(2.00), dec!(2.04))]
            .into_iter()
            .map(|(s, bid, ask)| {
                (
                    s.to_string(),
                    Quote {
                        symbol: s.to_string(),
                        bid,
                        ask,
                        timestamp: None,
                    },
                )
            })
            .collect()
    }

    fn position(
        symbol: &str,
        instrument_type: InstrumentType,
        quantity: Decimal,
        direction: QuantityDirection,
        mark_price: Decimal,
    ) -> RawPosition {
        RawPosition {
            account_number: "5WT001".to_string(),
            symbol: symbol.to_string(),
            instrument_type,
            underlying_symbol: symbol.to_string(),
            quantity,
            quantity_direction: direction,
            multiplier: dec!(1),
            average_open_price: dec!(1),
            mark: None,
            mark_price: Some(mark_price),
            close_price: None,
            created_at: Utc.with_ymd_and_hms(2025, 7, 1, 15, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_sell_to_open_put_spread_for_credit() {
        let selection = ContractSelection::Spread {
            near: contract("P600", dec!(600)),
            far: contract("P590", dec!(590)),
            width: 2,
        };
        let order = build_option_order(
            &selection,
            dec!(-2),
            true,
            OrderType::Limit,
            TimeInForce::Day,
            &quotes(),
        )
        .unwrap();

        assert_eq!(order.legs[0].action, OrderAction::SellToOpen);
        assert_eq!(order.legs[0].quantity, dec!(-2));
        assert_eq!(order.legs[1].action, OrderAction::BuyToOpen);
        assert_eq!(order.legs[1].quantity, dec!(2));
        // 4.15 - 2.02
        assert_eq!(order.price, Some(dec!(-2.13)));
        assert_eq!(order.price_effect, PriceEffect::Credit);
    }

    #[test]
    fn test_market_and_stop_orders_carry_no_price() {
        let selection = ContractSelection::Single(contract("P600", dec!(600)));
        for order_type in [OrderType::Market, OrderType::Stop] {
            let order = build_option_order(
                &selection,
                dec!(1),
                false,
                order_type,
                TimeInForce::Day,
                &HashMap::new(),
            )
            .unwrap();
            assert_eq!(order.price, None);
            assert_eq!(order.legs[0].action, OrderAction::BuyToClose);
            assert_eq!(order.price_effect, PriceEffect::Debit);
        }
    }

    #[test]
    fn test_market_spread_is_rejected() {
        let selection = ContractSelection::Spread {
            near: contract("P600", dec!(600)),
            far: contract("P590", dec!(590)),
            width: 2,
        };
        let result = build_option_order(
            &selection,
            dec!(1),
            true,
            OrderType::Market,
            TimeInForce::Day,
            &quotes(),
        );
        assert!(matches!(
            result,
            Err(TradeError::Resolution(ResolutionError::SpreadRequiresPricedOrder { width: 2 }))
        ));
    }

    #[test]
    fn test_closing_order_from_positions() {
        let positions = vec![
            position(
                "SPY   250815P00600000",
                InstrumentType::EquityOption,
                dec!(1),
                QuantityDirection::Short,
                dec!(4.153),
            ),
            position(
                "/ESU5",
                InstrumentType::Future,
                dec!(2),
                QuantityDirection::Long,
                dec!(6400.25),
            ),
        ];
        let order = build_closing_order(&positions, None).unwrap();

        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.time_in_force, TimeInForce::Day);
        assert_eq!(order.legs[0].action, OrderAction::BuyToClose);
        assert_eq!(order.legs[0].quantity, dec!(1));
        assert_eq!(order.legs[1].action, OrderAction::Sell);
        assert_eq!(order.legs[1].quantity, dec!(-2));
        // 6400.25 - 4.153 = 6396.097, received
        assert_eq!(order.price, Some(dec!(-6396.10)));
        assert!(order.is_credit());
    }

    #[test]
    fn test_crypto_closes_good_till_cancelled() {
        let positions = vec![position(
            "BTC/USD",
            InstrumentType::Cryptocurrency,
            dec!(0.5),
            QuantityDirection::Long,
            dec!(60000),
        )];
        let order = build_closing_order(&positions, Some(dec!(59000))).unwrap();
        assert_eq!(order.time_in_force, TimeInForce::Gtc);
        assert_eq!(order.legs[0].action, OrderAction::SellToClose);
        assert_eq!(order.price, Some(dec!(-59000)));
    }

    #[test]
    fn test_closing_rejects_mixed_accounts() {
        let mut other = position(
            "AAPL",
            InstrumentType::Equity,
            dec!(10),
            QuantityDirection::Long,
            dec!(200),
        );
        other.account_number = "5WT002".to_string();
        let positions = vec![
            position(
                "MSFT",
                InstrumentType::Equity,
                dec!(10),
                QuantityDirection::Long,
                dec!(400),
            ),
            other,
        ];
        let result = build_closing_order(&positions, None);
        assert!(matches!(
            result,
            Err(TradeError::Resolution(ResolutionError::NotClosable { .. }))
        ));
        assert!(build_closing_order(&[], None).is_err());
    }
}
