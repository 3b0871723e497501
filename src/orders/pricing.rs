//! Mid-price calculation and tick rounding

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::chain::types::{ContractSelection, OptionContract, TickSize};
use crate::common::errors::{Result, TradeError};
use crate::common::types::{PriceEffect, Quote};

/// Tick used when a contract carries no schedule
pub const DEFAULT_TICK: Decimal = dec!(0.01);

/// Round to the nearest multiple of `tick`, halves to the even multiple
///
/// 1.05 at a 0.10 tick gives 1.00; 1.15 gives 1.20.
pub fn round_to_tick(price: Decimal, tick: Decimal) -> Decimal {
    if tick <= Decimal::ZERO {
        return price;
    }
    (price / tick).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven) * tick
}

/// Tick that applies at `price`
///
/// The first entry whose threshold lies above the price wins; otherwise the
/// last entry without a threshold.
pub fn tick_for(price: Decimal, schedule: &[TickSize]) -> Decimal {
    let price = price.abs();
    schedule
        .iter()
        .find(|t| matches!(t.threshold, Some(threshold) if price < threshold))
        .or_else(|| schedule.iter().rev().find(|t| t.threshold.is_none()))
        .map(|t| t.value)
        .unwrap_or(DEFAULT_TICK)
}

/// Mid price of one contract
pub fn contract_mid(contract: &OptionContract, quotes: &HashMap<String, Quote>) -> Result<Decimal> {
    quotes
        .get(&contract.streamer_symbol)
        .map(Quote::midpoint)
        .ok_or_else(|| TradeError::Stream(format!("no quote for {}", contract.streamer_symbol)))
}

/// Unrounded net mid: the near leg minus the far leg for spreads
pub fn net_mid(selection: &ContractSelection, quotes: &HashMap<String, Quote>) -> Result<Decimal> {
    match selection {
        ContractSelection::Single(contract) => contract_mid(contract, quotes),
        ContractSelection::Spread { near, far, .. } => {
            Ok(contract_mid(near, quotes)? - contract_mid(far, quotes)?)
        }
    }
}

/// Tick-rounded order price signed for the side taken
///
/// Buying the primary leg pays (positive, debit); selling it receives
/// (negative, credit).
pub fn limit_price(
    selection: &ContractSelection,
    quotes: &HashMap<String, Quote>,
    buying: bool,
) -> Result<Decimal> {
    let mid = net_mid(selection, quotes)?;
    let tick = tick_for(mid, &selection.primary().tick_sizes);
    let rounded = round_to_tick(mid, tick);
    Ok(if buying { rounded } else { -rounded })
}

/// Debit for positive prices, credit for negative
pub fn price_effect(price: Decimal) -> PriceEffect {
    if price > Decimal::ZERO {
        PriceEffect::Debit
    } else if price < Decimal::ZERO {
        PriceEffect::Credit
    } else {
        PriceEffect::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::OptionKind;
    use chrono::NaiveDate;

    fn schedule() -> Vec<TickSize> {
        vec![
            TickSize {
                value: dec!(0.05),
                threshold: Some(dec!(3)),
            },
            TickSize {
                value: dec!(0.10),
                threshold: None,
            },
        ]
    }

    fn contract(streamer: &str, strike: Decimal) -> OptionContract {
        OptionContract {
            symbol: format!("SPY {}", strike),
            streamer_symbol: streamer.to_string(),
            root_symbol: "SPY".to_string(),
            underlying_symbol: "SPY".to_string(),
            option_kind: OptionKind::Call,
            strike,
            expiration: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            tick_sizes: schedule(),
        }
    }

    fn quote(symbol: &str, bid: Decimal, ask: Decimal) -> (String, Quote) {
        (
            symbol.to_string(),
            Quote {
                symbol: symbol.to_string(),
                bid,
                ask,
                timestamp: None,
            },
        )
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round_to_tick(dec!(1.05), dec!(0.05)), dec!(1.05));
        assert_eq!(round_to_tick(dec!(1.05), dec!(0.10)), dec!(1.00));
        assert_eq!(round_to_tick(dec!(1.15), dec!(0.10)), dec!(1.20));
        assert_eq!(round_to_tick(dec!(1.17), dec!(0.05)), dec!(1.15));
        assert_eq!(round_to_tick(dec!(-1.15), dec!(0.10)), dec!(-1.20));
        assert_eq!(round_to_tick(dec!(1.234), Decimal::ZERO), dec!(1.234));
    }

    #[test]
    fn test_tick_schedule() {
        assert_eq!(tick_for(dec!(2.95), &schedule()), dec!(0.05));
        assert_eq!(tick_for(dec!(3.00), &schedule()), dec!(0.10));
        assert_eq!(tick_for(dec!(-2.50), &schedule()), dec!(0.05));
        assert_eq!(tick_for(dec!(5), &[]), DEFAULT_TICK);
    }

    #[test]
    fn test_single_limit_price_sign() {
        let selection = ContractSelection::Single(contract(".A", dec!(600)));
        let quotes: HashMap<_, _> = [quote(".A", dec!(1.00), dec!(1.10))].into_iter().collect();

        assert_eq!(limit_price(&selection, &quotes, true).unwrap(), dec!(1.05));
        assert_eq!(limit_price(&selection, &quotes, false).unwrap(), dec!(-1.05));
        assert_eq!(price_effect(dec!(-1.05)), PriceEffect::Credit);
    }

    #[test]
    fn test_spread_nets_legs() {
        let selection = ContractSelection::Spread {
            near: contract(".A", dec!(600)),
            far: contract(".B", dec!(610)),
            width: 2,
        };
        let quotes: HashMap<_, _> = [
            quote(".A", dec!(5.00), dec!(5.20)),
            quote(".B", dec!(1.40), dec!(1.52)),
        ]
        .into_iter()
        .collect();

        // 5.10 - 1.46 = 3.64, above the 3.00 threshold so 0.10 ticks
        assert_eq!(limit_price(&selection, &quotes, true).unwrap(), dec!(3.60));
    }

    #[test]
    fn test_missing_quote_is_an_error() {
        let selection = ContractSelection::Single(contract(".A", dec!(600)));
        let result = limit_price(&selection, &HashMap::new(), true);
        assert!(matches!(result, Err(TradeError::Stream(_))));
    }
}
