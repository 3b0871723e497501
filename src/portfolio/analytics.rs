//! Per-position analytics
//!
//! One pure function per instrument class computes the class-specific part
//! of [`PositionAnalytics`]; [`analyze_position`] adds the shared day-change,
//! P&L and same-day rules. Nothing here mutates its inputs, so the same
//! inputs always produce the same summary.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use tracing::warn;

use super::types::{
    CryptoInfo, EquityInfo, EquityOptionInfo, FutureInfo, FutureOptionInfo, Instrument,
    MarketMetrics, PortfolioSummary, PositionAnalytics, RawPosition,
};
use crate::common::errors::{Result, TradeError};
use crate::common::types::{Greeks, InstrumentType, Summary};

/// Calendar used to decide whether a position was opened today
pub const EXCHANGE_TIMEZONE: Tz = chrono_tz::America::New_York;

/// Everything one analytics pass reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsInputs {
    /// Ordered as they should appear in the summary
    pub positions: Vec<RawPosition>,
    /// Keyed by position symbol
    pub instruments: HashMap<String, Instrument>,
    /// Keyed by streamer symbol
    pub greeks: HashMap<String, Greeks>,
    /// Keyed by streamer symbol
    pub summaries: HashMap<String, Summary>,
    /// Keyed by underlying or root symbol
    pub metrics: HashMap<String, MarketMetrics>,
    /// Last traded price of the beta benchmark
    pub benchmark_price: Decimal,
}

impl AnalyticsInputs {
    fn previous_close(&self, streamer_symbol: &str) -> Decimal {
        self.summaries
            .get(streamer_symbol)
            .and_then(|s| s.prev_day_close_price)
            .unwrap_or_default()
    }
}

/// Calendar day of `at` on the exchange clock
pub fn exchange_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&EXCHANGE_TIMEZONE).date_naive()
}

/// Beta-weighted delta: beta × reference price × delta / benchmark price
pub fn beta_weighted_delta(
    beta: Option<Decimal>,
    reference_price: Decimal,
    delta: Decimal,
    benchmark_price: Decimal,
) -> Decimal {
    match beta {
        Some(beta) if !benchmark_price.is_zero() => {
            beta * reference_price * delta / benchmark_price
        }
        _ => Decimal::ZERO,
    }
}

/// Class-specific values, before the shared P&L rules
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClassValues {
    streamer_symbol: String,
    strike: Option<Decimal>,
    trade_price: Decimal,
    iv_rank: Option<Decimal>,
    delta: Decimal,
    theta: Decimal,
    gamma: Decimal,
    beta_delta: Decimal,
    /// Futures are marked to market: net liquidity is the day's P&L
    marked_to_market: bool,
    metrics: Option<MarketMetrics>,
}

/// Contract Greeks scaled by size and direction
fn scaled_greeks(position: &RawPosition, greeks: Option<&Greeks>) -> (Decimal, Decimal, Decimal) {
    let scale = position.quantity * position.multiplier * position.quantity_direction.sign();
    match greeks {
        Some(g) => (g.delta * scale, g.theta * scale, g.gamma * scale),
        None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
    }
}

fn iv_rank_percent(metrics: Option<&MarketMetrics>) -> Option<Decimal> {
    metrics
        .and_then(|m| m.iv_rank)
        .map(|rank| rank * Decimal::ONE_HUNDRED)
}

fn equity_option(
    position: &RawPosition,
    info: &EquityOptionInfo,
    inputs: &AnalyticsInputs,
) -> ClassValues {
    let metrics = inputs.metrics.get(&info.underlying_symbol);
    let (delta, theta, gamma) = scaled_greeks(position, inputs.greeks.get(&info.streamer_symbol));
    let underlying_close = inputs.previous_close(&info.underlying_symbol);
    ClassValues {
        streamer_symbol: info.streamer_symbol.clone(),
        strike: Some(info.strike_price),
        trade_price: position.average_open_price * position.multiplier,
        iv_rank: iv_rank_percent(metrics),
        delta,
        theta,
        gamma,
        beta_delta: beta_weighted_delta(
            metrics.and_then(|m| m.beta),
            underlying_close,
            delta,
            inputs.benchmark_price,
        ),
        marked_to_market: false,
        metrics: metrics.cloned(),
    }
}

fn future_option(
    position: &RawPosition,
    option: &FutureOptionInfo,
    future: &FutureInfo,
    inputs: &AnalyticsInputs,
) -> ClassValues {
    let metrics = inputs.metrics.get(&option.root_symbol);
    let (delta, theta, gamma) = scaled_greeks(position, inputs.greeks.get(&option.streamer_symbol));
    let future_close = inputs.previous_close(&future.streamer_symbol);
    ClassValues {
        streamer_symbol: option.streamer_symbol.clone(),
        strike: Some(option.strike_price),
        trade_price: position.average_open_price,
        iv_rank: iv_rank_percent(metrics),
        delta,
        theta,
        gamma,
        beta_delta: beta_weighted_delta(
            metrics.and_then(|m| m.beta),
            future_close,
            delta,
            inputs.benchmark_price,
        ),
        marked_to_market: false,
        metrics: metrics.cloned(),
    }
}

fn equity(position: &RawPosition, info: &EquityInfo, inputs: &AnalyticsInputs) -> ClassValues {
    let metrics = inputs.metrics.get(&position.symbol);
    let delta = position.signed_quantity();
    ClassValues {
        streamer_symbol: info.streamer_symbol.clone(),
        strike: None,
        trade_price: position.average_open_price,
        iv_rank: iv_rank_percent(metrics),
        delta,
        theta: Decimal::ZERO,
        gamma: Decimal::ZERO,
        beta_delta: beta_weighted_delta(
            metrics.and_then(|m| m.beta),
            position.mark_price.unwrap_or_default(),
            delta,
            inputs.benchmark_price,
        ),
        marked_to_market: false,
        metrics: metrics.cloned(),
    }
}

fn future(position: &RawPosition, info: &FutureInfo, inputs: &AnalyticsInputs) -> ClassValues {
    let metrics = inputs.metrics.get(&info.root_symbol);
    let delta = position.signed_quantity() * position.multiplier;
    ClassValues {
        streamer_symbol: info.streamer_symbol.clone(),
        strike: None,
        trade_price: position.average_open_price * info.notional_multiplier,
        iv_rank: iv_rank_percent(metrics),
        delta,
        theta: Decimal::ZERO,
        gamma: Decimal::ZERO,
        beta_delta: beta_weighted_delta(
            metrics.and_then(|m| m.beta),
            position.mark_price.unwrap_or_default(),
            delta,
            inputs.benchmark_price,
        ),
        marked_to_market: true,
        metrics: metrics.cloned(),
    }
}

fn cryptocurrency(position: &RawPosition, info: &CryptoInfo) -> ClassValues {
    ClassValues {
        streamer_symbol: info.streamer_symbol.clone(),
        strike: None,
        trade_price: position.average_open_price,
        iv_rank: None,
        delta: Decimal::ZERO,
        theta: Decimal::ZERO,
        gamma: Decimal::ZERO,
        beta_delta: Decimal::ZERO,
        marked_to_market: false,
        metrics: None,
    }
}

/// Analytics for one position against its resolved instrument
pub fn analyze_position(
    position: &RawPosition,
    instrument: &Instrument,
    inputs: &AnalyticsInputs,
    today: NaiveDate,
) -> PositionAnalytics {
    let values = match instrument {
        Instrument::EquityOption(info) => equity_option(position, info, inputs),
        Instrument::FutureOption { option, future: f } => {
            future_option(position, option, f, inputs)
        }
        Instrument::Equity(info) => equity(position, info, inputs),
        Instrument::Future(info) => future(position, info, inputs),
        Instrument::Cryptocurrency(info) => cryptocurrency(position, info),
    };

    let direction = position.quantity_direction.sign();
    let size = position.quantity * position.multiplier;
    let mark_price = position.mark_price.unwrap_or_default();
    let previous_close = inputs.previous_close(&values.streamer_symbol);
    let day_change = mark_price - previous_close;
    let computed_pnl_day = day_change * size * direction;
    let pnl_total = (mark_price - position.average_open_price) * size * direction;

    let net_liquidity = if values.marked_to_market {
        computed_pnl_day
    } else {
        mark_price * size * direction
    };
    let pnl_day = if exchange_date(position.created_at) == today {
        pnl_total
    } else {
        computed_pnl_day
    };

    let (dividend_next_date, earnings_next_date) = values
        .metrics
        .as_ref()
        .map(|m| (m.dividend_next_date, m.earnings_next_date))
        .unwrap_or((None, None));

    PositionAnalytics {
        symbol: position.symbol.clone(),
        instrument_type: position.instrument_type.clone(),
        streamer_symbol: values.streamer_symbol,
        quantity: position.quantity,
        quantity_direction: position.quantity_direction,
        multiplier: position.multiplier,
        average_open_price: position.average_open_price,
        mark_price,
        created_at: position.created_at,
        strike: values.strike,
        previous_close,
        day_change,
        pnl_day,
        pnl_total,
        trade_price: values.trade_price,
        iv_rank: values.iv_rank,
        delta: values.delta,
        theta: values.theta,
        gamma: values.gamma,
        beta_delta: values.beta_delta,
        net_liquidity,
        dividend_next_date,
        earnings_next_date,
    }
}

/// Analytics for every position plus portfolio sums
///
/// Positions of an unknown class are skipped with a warning and listed in
/// `skipped`. A known class without its instrument record fails the pass.
pub fn compute_summary(inputs: &AnalyticsInputs, today: NaiveDate) -> Result<PortfolioSummary> {
    let mut summary = PortfolioSummary::default();
    for position in &inputs.positions {
        if position.instrument_type == InstrumentType::Unknown {
            warn!(symbol = %position.symbol, "Skipping position with unknown instrument type");
            summary.skipped.push(position.symbol.clone());
            continue;
        }
        let instrument = inputs
            .instruments
            .get(&position.symbol)
            .ok_or_else(|| TradeError::MissingReferenceData(position.symbol.clone()))?;
        summary.push(analyze_position(position, instrument, inputs, today));
    }
    Ok(summary)
}
