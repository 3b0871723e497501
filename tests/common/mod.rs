//! Common test utilities and fixtures
//!
//! In-memory stand-ins for the broker collaborators plus a fake streaming
//! feed that answers subscriptions from a fixed set of events.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use signal_options::chain::types::{
    ChainExpiration, ExpirationType, OptionChain, StrikeListing, TickSize,
};
use signal_options::common::channels::{create_streamer, FeedHandle, SubscriptionRequest};
use signal_options::common::errors::{BrokerMessage, Result, TradeError};
use signal_options::common::traits::{Brokerage, ChainProvider, InstrumentProvider, MetricsProvider};
use signal_options::common::types::{
    Greeks, InstrumentType, MarketEvent, OptionKind, PriceEffect, QuantityDirection, Quote,
    Summary, TradeTick,
};
use signal_options::config::types::{ApiCredentials, StreamingSettings};
use signal_options::orders::types::{
    BuyingPowerEffect, FeeCalculation, PlacedOrderResponse, PricedOrder,
};
use signal_options::portfolio::types::{
    CryptoInfo, EquityInfo, EquityOptionInfo, FutureInfo, FutureOptionInfo, MarketMetrics,
    RawPosition,
};
use signal_options::session::{Account, AccountBalance, Session, SessionManager};
use signal_options::streaming::aggregator::QuoteAggregator;

pub const ACCOUNT: &str = "5WT001";

// ============================================================================
// Broker
// ============================================================================

/// Broker that records every order it is asked to place
#[derive(Default)]
pub struct RecordingBroker {
    pub positions: Vec<RawPosition>,
    /// Errors returned from dry runs; empty means the dry run passes
    pub dry_run_errors: Vec<BrokerMessage>,
    pub placed: Mutex<Vec<(PricedOrder, bool)>>,
}

impl RecordingBroker {
    pub fn with_positions(positions: Vec<RawPosition>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    pub fn rejecting(code: &str, message: &str) -> Self {
        Self {
            dry_run_errors: vec![BrokerMessage {
                code: code.to_string(),
                message: message.to_string(),
            }],
            ..Default::default()
        }
    }

    /// Recorded orders, in call order, with their dry-run flag
    pub fn placed(&self) -> Vec<(PricedOrder, bool)> {
        self.placed.lock().unwrap().clone()
    }

    pub fn live_orders(&self) -> Vec<PricedOrder> {
        self.placed()
            .into_iter()
            .filter(|(_, dry_run)| !dry_run)
            .map(|(order, _)| order)
            .collect()
    }
}

#[async_trait]
impl Brokerage for RecordingBroker {
    async fn authenticate(&self, credentials: &ApiCredentials) -> Result<Session> {
        Ok(Session {
            token: format!("token-{}", credentials.username),
            user: Some(credentials.username.clone()),
        })
    }

    async fn validate(&self, _session: &Session) -> Result<bool> {
        Ok(true)
    }

    async fn get_accounts(&self, _session: &Session) -> Result<Vec<Account>> {
        Ok(vec![
            Account {
                account_number: ACCOUNT.to_string(),
                nickname: Some("Signals".to_string()),
                is_closed: false,
            },
            Account {
                account_number: "5WT999".to_string(),
                nickname: None,
                is_closed: true,
            },
        ])
    }

    async fn get_positions(
        &self,
        _session: &Session,
        account: &Account,
        _include_marks: bool,
    ) -> Result<Vec<RawPosition>> {
        Ok(self
            .positions
            .iter()
            .filter(|p| p.account_number == account.account_number)
            .cloned()
            .collect())
    }

    async fn get_balances(&self, _session: &Session, _account: &Account) -> Result<AccountBalance> {
        Ok(AccountBalance {
            cash_balance: dec!(15000),
            net_liquidating_value: dec!(50000),
            derivative_buying_power: dec!(30000),
            equity_buying_power: dec!(60000),
            maintenance_requirement: dec!(5000),
        })
    }

    async fn place_order(
        &self,
        _session: &Session,
        _account: &Account,
        order: &PricedOrder,
        dry_run: bool,
    ) -> Result<PlacedOrderResponse> {
        self.placed.lock().unwrap().push((order.clone(), dry_run));
        let errors = if dry_run {
            self.dry_run_errors.clone()
        } else {
            Vec::new()
        };
        Ok(PlacedOrderResponse {
            order_id: (!dry_run).then(|| "42".to_string()),
            status: Some("Received".to_string()),
            buying_power_effect: BuyingPowerEffect {
                change_in_buying_power: dec!(500),
                change_in_buying_power_effect: PriceEffect::Debit,
                current_buying_power: dec!(30000),
                new_buying_power: dec!(29500),
            },
            fee_calculation: Some(FeeCalculation {
                total_fees: dec!(2.28),
            }),
            warnings: Vec::new(),
            errors,
        })
    }
}

pub fn session_manager(broker: Arc<RecordingBroker>) -> Arc<SessionManager<RecordingBroker>> {
    Arc::new(SessionManager::new(
        broker,
        ApiCredentials::new("trader".to_string(), "secret".to_string()),
        Some(ACCOUNT.to_string()),
    ))
}

// ============================================================================
// Option chains
// ============================================================================

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// OCC symbol, e.g. "SPY   250815C00600000"
pub fn occ(root: &str, expiration: NaiveDate, kind: OptionKind, strike: Decimal) -> String {
    let thousandths = (strike * dec!(1000)).trunc().to_i64().unwrap();
    format!(
        "{:<6}{}{}{:08}",
        root,
        expiration.format("%y%m%d"),
        kind,
        thousandths
    )
}

/// Streamer symbol, e.g. ".SPY250815C600"
pub fn streamer(root: &str, expiration: NaiveDate, kind: OptionKind, strike: Decimal) -> String {
    format!(".{}{}{}{}", root, expiration.format("%y%m%d"), kind, strike.normalize())
}

fn expiration(
    root: &str,
    on: NaiveDate,
    dte: i64,
    expiration_type: ExpirationType,
) -> ChainExpiration {
    let strikes = [dec!(590), dec!(595), dec!(600), dec!(605), dec!(610)]
        .into_iter()
        .map(|strike| StrikeListing {
            strike_price: strike,
            call: occ(root, on, OptionKind::Call, strike),
            call_streamer_symbol: streamer(root, on, OptionKind::Call, strike),
            put: occ(root, on, OptionKind::Put, strike),
            put_streamer_symbol: streamer(root, on, OptionKind::Put, strike),
        })
        .collect();
    ChainExpiration {
        expiration_date: on,
        days_to_expiration: dte,
        expiration_type,
        settlement_type: Some("PM".to_string()),
        tick_sizes: vec![
            TickSize {
                value: dec!(0.01),
                threshold: Some(dec!(3)),
            },
            TickSize {
                value: dec!(0.05),
                threshold: None,
            },
        ],
        strikes,
    }
}

/// SPY chain with a weekly and a monthly expiration
pub fn spy_chain() -> OptionChain {
    OptionChain {
        root_symbol: "SPY".to_string(),
        underlying_symbol: "SPY".to_string(),
        expirations: vec![
            expiration("SPY", date(2025, 8, 8), 7, ExpirationType::Weekly),
            expiration("SPY", date(2025, 8, 15), 14, ExpirationType::Regular),
        ],
    }
}

/// Chains keyed by root
pub struct StaticChains(pub HashMap<String, OptionChain>);

impl StaticChains {
    pub fn spy() -> Self {
        Self(HashMap::from([("SPY".to_string(), spy_chain())]))
    }
}

#[async_trait]
impl ChainProvider for StaticChains {
    async fn get_chain(&self, _session: &Session, root: &str) -> Result<OptionChain> {
        self.0
            .get(root)
            .cloned()
            .ok_or_else(|| TradeError::Broker(format!("no chain for {}", root)))
    }
}

// ============================================================================
// Reference data
// ============================================================================

#[derive(Default)]
pub struct StaticInstruments {
    pub equity_options: Vec<EquityOptionInfo>,
    pub future_options: Vec<FutureOptionInfo>,
    pub equities: Vec<EquityInfo>,
    pub futures: Vec<FutureInfo>,
    pub cryptocurrencies: Vec<CryptoInfo>,
}

fn matching<T: Clone>(items: &[T], symbols: &[String], symbol: impl Fn(&T) -> &str) -> Vec<T> {
    items
        .iter()
        .filter(|item| symbols.iter().any(|s| s == symbol(item)))
        .cloned()
        .collect()
}

#[async_trait]
impl InstrumentProvider for StaticInstruments {
    async fn get_equity_options(
        &self,
        _session: &Session,
        symbols: &[String],
    ) -> Result<Vec<EquityOptionInfo>> {
        Ok(matching(&self.equity_options, symbols, |i| &i.symbol))
    }

    async fn get_future_options(
        &self,
        _session: &Session,
        symbols: &[String],
    ) -> Result<Vec<FutureOptionInfo>> {
        Ok(matching(&self.future_options, symbols, |i| &i.symbol))
    }

    async fn get_equities(
        &self,
        _session: &Session,
        symbols: &[String],
    ) -> Result<Vec<EquityInfo>> {
        Ok(matching(&self.equities, symbols, |i| &i.symbol))
    }

    async fn get_futures(&self, _session: &Session, symbols: &[String]) -> Result<Vec<FutureInfo>> {
        Ok(matching(&self.futures, symbols, |i| &i.symbol))
    }

    async fn get_cryptocurrencies(
        &self,
        _session: &Session,
        symbols: &[String],
    ) -> Result<Vec<CryptoInfo>> {
        Ok(matching(&self.cryptocurrencies, symbols, |i| &i.symbol))
    }
}

pub struct StaticMetrics(pub Vec<MarketMetrics>);

#[async_trait]
impl MetricsProvider for StaticMetrics {
    async fn get_market_metrics(
        &self,
        _session: &Session,
        symbols: &[String],
    ) -> Result<Vec<MarketMetrics>> {
        Ok(matching(&self.0, symbols, |m| &m.symbol))
    }
}

// ============================================================================
// Streaming
// ============================================================================

pub fn streaming_settings() -> StreamingSettings {
    StreamingSettings {
        timeout_ms: 1000,
        max_attempts: 2,
        retry_delay_ms: 50,
    }
}

/// Aggregator whose feed answers each subscription with the matching events
pub fn quote_aggregator(events: Vec<MarketEvent>) -> QuoteAggregator {
    let (streamer, feed) = create_streamer();
    spawn_feed(feed, events);
    QuoteAggregator::new(Arc::new(streamer), streaming_settings())
}

pub fn spawn_feed(mut feed: FeedHandle, events: Vec<MarketEvent>) {
    tokio::spawn(async move {
        while let Some(request) = feed.next_request().await {
            if let SubscriptionRequest::Subscribe { kind, symbols } = request {
                for event in events
                    .iter()
                    .filter(|e| e.kind() == kind && symbols.iter().any(|s| s == e.symbol()))
                {
                    feed.publish(event.clone());
                }
            }
        }
    });
}

pub fn quote(symbol: &str, bid: Decimal, ask: Decimal) -> MarketEvent {
    MarketEvent::Quote(Quote {
        symbol: symbol.to_string(),
        bid,
        ask,
        timestamp: None,
    })
}

pub fn greeks(symbol: &str, delta: Decimal, theta: Decimal, gamma: Decimal) -> MarketEvent {
    MarketEvent::Greeks(Greeks {
        symbol: symbol.to_string(),
        delta,
        gamma,
        theta,
        vega: Decimal::ZERO,
        volatility: dec!(0.18),
    })
}

pub fn summary(symbol: &str, prev_close: Decimal) -> MarketEvent {
    MarketEvent::Summary(Summary {
        symbol: symbol.to_string(),
        prev_day_close_price: Some(prev_close),
        day_open_price: None,
    })
}

pub fn trade(symbol: &str, price: Decimal) -> MarketEvent {
    MarketEvent::Trade(TradeTick {
        symbol: symbol.to_string(),
        price,
        size: dec!(100),
    })
}

// ============================================================================
// Positions
// ============================================================================

pub fn position(
    symbol: &str,
    instrument_type: InstrumentType,
    underlying: &str,
    quantity: Decimal,
    direction: QuantityDirection,
    multiplier: Decimal,
    average_open_price: Decimal,
    mark_price: Decimal,
) -> RawPosition {
    RawPosition {
        account_number: ACCOUNT.to_string(),
        symbol: symbol.to_string(),
        instrument_type,
        underlying_symbol: underlying.to_string(),
        quantity,
        quantity_direction: direction,
        multiplier,
        average_open_price,
        mark: Some(mark_price * quantity * multiplier),
        mark_price: Some(mark_price),
        close_price: None,
        created_at: Utc.with_ymd_and_hms(2025, 7, 1, 15, 0, 0).unwrap(),
    }
}
