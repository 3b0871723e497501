//! Gathers positions, reference data and live market data for analytics
//!
//! Fetches run in concurrent groups; any failure fails the whole pass.
//!
//! 1. positions (sorted by symbol)
//! 2. equity options, future options, equities, cryptocurrencies
//! 3. futures held directly or underlying a held future option
//! 4. market metrics, Greeks, daily summaries and the benchmark trade

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument, warn};

use super::analytics::{compute_summary, exchange_date, AnalyticsInputs};
use super::types::{FutureInfo, Instrument, PortfolioSummary, RawPosition};
use crate::common::errors::{Result, TradeError};
use crate::common::traits::{Brokerage, InstrumentProvider, MetricsProvider};
use crate::common::types::InstrumentType;
use crate::config::types::PortfolioSettings;
use crate::session::{Account, Session};
use crate::streaming::aggregator::QuoteAggregator;

/// Builds [`PortfolioSummary`] values for an account
pub struct PositionAggregator<B: Brokerage> {
    broker: Arc<B>,
    instruments: Arc<dyn InstrumentProvider>,
    metrics: Arc<dyn MetricsProvider>,
    quotes: QuoteAggregator,
    settings: PortfolioSettings,
}

impl<B: Brokerage> PositionAggregator<B> {
    pub fn new(
        broker: Arc<B>,
        instruments: Arc<dyn InstrumentProvider>,
        metrics: Arc<dyn MetricsProvider>,
        quotes: QuoteAggregator,
        settings: PortfolioSettings,
    ) -> Self {
        Self {
            broker,
            instruments,
            metrics,
            quotes,
            settings,
        }
    }

    /// Enriched summary of every position in the account as of today
    #[instrument(skip(self, session, account), fields(account = %account.account_number))]
    pub async fn summarize(
        &self,
        session: &Session,
        account: &Account,
    ) -> Result<PortfolioSummary> {
        let today = exchange_date(Utc::now());
        self.summarize_on(session, account, today).await
    }

    /// Enriched summary with an explicit exchange-calendar `today`
    pub async fn summarize_on(
        &self,
        session: &Session,
        account: &Account,
        today: NaiveDate,
    ) -> Result<PortfolioSummary> {
        let inputs = self.gather(session, account).await?;
        let summary = compute_summary(&inputs, today)?;

        if let Some(diff) = summary.delta_target_breach(
            self.settings.delta_target,
            self.settings.delta_variation,
        ) {
            warn!(
                target = %self.settings.delta_target,
                beta_delta = %summary.beta_delta,
                %diff,
                "Portfolio beta-weighting misses target"
            );
        }

        info!(
            positions = summary.positions.len(),
            skipped = summary.skipped.len(),
            net_liquidity = %summary.net_liquidity,
            pnl_day = %summary.pnl_day,
            beta_delta = %summary.beta_delta,
            "Portfolio summarized"
        );
        Ok(summary)
    }

    /// Fetch everything one analytics pass needs
    pub async fn gather(&self, session: &Session, account: &Account) -> Result<AnalyticsInputs> {
        let mut positions = self.broker.get_positions(session, account, true).await?;
        if positions.is_empty() {
            return Ok(AnalyticsInputs::default());
        }
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let equity_option_symbols = symbols_of(&positions, InstrumentType::EquityOption);
        let future_option_symbols = symbols_of(&positions, InstrumentType::FutureOption);
        let equity_symbols = symbols_of(&positions, InstrumentType::Equity);
        let crypto_symbols = symbols_of(&positions, InstrumentType::Cryptocurrency);

        let (equity_options, future_options, equities, cryptos) = tokio::try_join!(
            fetch_if_any(&equity_option_symbols, || self
                .instruments
                .get_equity_options(session, &equity_option_symbols)),
            fetch_if_any(&future_option_symbols, || self
                .instruments
                .get_future_options(session, &future_option_symbols)),
            fetch_if_any(&equity_symbols, || self
                .instruments
                .get_equities(session, &equity_symbols)),
            fetch_if_any(&crypto_symbols, || self
                .instruments
                .get_cryptocurrencies(session, &crypto_symbols)),
        )?;

        let future_symbols: Vec<String> = symbols_of(&positions, InstrumentType::Future)
            .into_iter()
            .chain(future_options.iter().map(|o| o.underlying_symbol.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let futures = fetch_if_any(&future_symbols, || {
            self.instruments.get_futures(session, &future_symbols)
        })
        .await?;
        let futures_by_symbol: HashMap<String, FutureInfo> = futures
            .into_iter()
            .map(|f| (f.symbol.clone(), f))
            .collect();

        let mut instruments: HashMap<String, Instrument> = HashMap::new();
        let mut greeks_symbols = BTreeSet::new();
        let mut summary_symbols = BTreeSet::new();
        let mut metric_symbols = BTreeSet::new();

        for option in equity_options {
            greeks_symbols.insert(option.streamer_symbol.clone());
            summary_symbols.insert(option.streamer_symbol.clone());
            summary_symbols.insert(option.underlying_symbol.clone());
            metric_symbols.insert(option.underlying_symbol.clone());
            instruments.insert(option.symbol.clone(), Instrument::EquityOption(option));
        }
        for option in future_options {
            let future = futures_by_symbol
                .get(&option.underlying_symbol)
                .ok_or_else(|| TradeError::MissingReferenceData(option.underlying_symbol.clone()))?;
            greeks_symbols.insert(option.streamer_symbol.clone());
            summary_symbols.insert(option.streamer_symbol.clone());
            summary_symbols.insert(future.streamer_symbol.clone());
            metric_symbols.insert(option.root_symbol.clone());
            instruments.insert(
                option.symbol.clone(),
                Instrument::FutureOption {
                    option,
                    future: future.clone(),
                },
            );
        }
        for equity in equities {
            summary_symbols.insert(equity.streamer_symbol.clone());
            metric_symbols.insert(equity.symbol.clone());
            instruments.insert(equity.symbol.clone(), Instrument::Equity(equity));
        }
        for position in positions
            .iter()
            .filter(|p| p.instrument_type == InstrumentType::Future)
        {
            let future = futures_by_symbol
                .get(&position.symbol)
                .ok_or_else(|| TradeError::MissingReferenceData(position.symbol.clone()))?;
            summary_symbols.insert(future.streamer_symbol.clone());
            metric_symbols.insert(future.root_symbol.clone());
            instruments.insert(future.symbol.clone(), Instrument::Future(future.clone()));
        }
        for crypto in cryptos {
            summary_symbols.insert(crypto.streamer_symbol.clone());
            instruments.insert(crypto.symbol.clone(), Instrument::Cryptocurrency(crypto));
        }

        // Only positions of an unknown class may lack an instrument
        if let Some(missing) = positions.iter().find(|p| {
            p.instrument_type != InstrumentType::Unknown && !instruments.contains_key(&p.symbol)
        }) {
            return Err(TradeError::MissingReferenceData(missing.symbol.clone()));
        }

        let greeks_symbols: Vec<String> = greeks_symbols.into_iter().collect();
        let summary_symbols: Vec<String> = summary_symbols.into_iter().collect();
        let metric_symbols: Vec<String> = metric_symbols.into_iter().collect();
        let benchmark = vec![self.settings.benchmark_symbol.clone()];

        let (metrics, greeks, summaries, trades) = tokio::try_join!(
            fetch_if_any(&metric_symbols, || self
                .metrics
                .get_market_metrics(session, &metric_symbols)),
            self.quotes.greeks(&greeks_symbols),
            self.quotes.summaries(&summary_symbols),
            self.quotes.trades(&benchmark),
        )?;

        let benchmark_price = trades
            .get(&self.settings.benchmark_symbol)
            .map(|t| t.price)
            .unwrap_or_default();

        Ok(AnalyticsInputs {
            positions,
            instruments,
            greeks,
            summaries,
            metrics: metrics.into_iter().map(|m| (m.symbol.clone(), m)).collect(),
            benchmark_price,
        })
    }
}

fn symbols_of(positions: &[RawPosition], instrument_type: InstrumentType) -> Vec<String> {
    positions
        .iter()
        .filter(|p| p.instrument_type == instrument_type)
        .map(|p| p.symbol.clone())
        .collect()
}

/// Run `fetch` only when there is something to look up
async fn fetch_if_any<T, F, Fut>(symbols: &[String], fetch: F) -> Result<Vec<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    if symbols.is_empty() {
        return Ok(Vec::new());
    }
    fetch().await
}
