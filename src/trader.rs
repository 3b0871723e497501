//! Signal to order pipeline
//!
//! ```text
//! payload ─▶ validate ─▶ resolve contracts ─▶ quotes ─▶ build order ─▶ dry run ─▶ live
//! ```
//!
//! Every failure is scoped to the one signal that caused it and is logged
//! with its category before being returned.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::chain::resolver::ContractResolver;
use crate::chain::types::ContractSelection;
use crate::common::errors::{ResolutionError, Result, TradeError};
use crate::common::traits::{Brokerage, ChainProvider};
use crate::common::types::{OrderType, Quote};
use crate::config::types::OrderSettings;
use crate::intent::types::TradeIntent;
use crate::intent::validator::validate_payload;
use crate::orders::builder::{build_closing_order, build_option_order};
use crate::orders::submit::OrderSubmitter;
use crate::orders::types::SubmissionReport;
use crate::session::SessionManager;
use crate::streaming::aggregator::QuoteAggregator;

/// Turns validated signals into submitted orders
pub struct SignalTrader<B: Brokerage> {
    sessions: Arc<SessionManager<B>>,
    resolver: ContractResolver,
    quotes: QuoteAggregator,
    submitter: OrderSubmitter<B>,
    settings: OrderSettings,
}

impl<B: Brokerage> SignalTrader<B> {
    pub fn new(
        sessions: Arc<SessionManager<B>>,
        chains: Arc<dyn ChainProvider>,
        quotes: QuoteAggregator,
        settings: OrderSettings,
    ) -> Self {
        let resolver = ContractResolver::new(chains, quotes.clone(), settings.expiration_filter);
        let submitter = OrderSubmitter::new(sessions.broker().clone());
        Self {
            sessions,
            resolver,
            quotes,
            submitter,
            settings,
        }
    }

    /// Validate a webhook payload and trade it
    pub async fn handle_webhook(&self, payload: &Value) -> Result<SubmissionReport> {
        let intent = validate_payload(payload).map_err(TradeError::from);
        let outcome = match intent {
            Ok(intent) => self.execute(&intent).await,
            Err(e) => Err(e),
        };
        outcome.map_err(log_failure)
    }

    /// Resolve, price and submit the order for an intent
    #[instrument(
        skip(self, intent),
        fields(ticker = %intent.ticker, direction = %intent.direction)
    )]
    pub async fn execute(&self, intent: &TradeIntent) -> Result<SubmissionReport> {
        let session = self.sessions.ensure_valid().await?;
        let account = self.sessions.account(&session).await?;
        let order_type = intent.order_type_or(self.settings.default_order_type);

        let selection = self.resolver.resolve(&session, intent, order_type).await?;
        let quotes = self.quotes_for(&selection, order_type).await?;
        let order = build_option_order(
            &selection,
            intent.signed_quantity(),
            intent.is_opening(),
            order_type,
            self.settings.time_in_force,
            &quotes,
        )?;

        info!(
            contract = %selection.primary().display_name(),
            %order_type,
            price = ?order.price,
            "Submitting signal order"
        );
        self.submitter.submit(&session, &account, &order).await
    }

    /// Close a held option by OCC symbol; negative quantities sell to close
    #[instrument(skip(self))]
    pub async fn close_option(
        &self,
        symbol: &str,
        quantity: Decimal,
        order_type: OrderType,
    ) -> Result<SubmissionReport> {
        let outcome: Result<SubmissionReport> = async {
            let session = self.sessions.ensure_valid().await?;
            let account = self.sessions.account(&session).await?;
            let contract = self.resolver.resolve_symbol(&session, symbol).await?;
            let selection = ContractSelection::Single(contract);
            let quotes = self.quotes_for(&selection, order_type).await?;
            let order = build_option_order(
                &selection,
                quantity,
                false,
                order_type,
                self.settings.time_in_force,
                &quotes,
            )?;
            self.submitter.submit(&session, &account, &order).await
        }
        .await;
        outcome.map_err(log_failure)
    }

    /// Close the held positions with the given symbols in one order
    #[instrument(skip(self))]
    pub async fn close_positions(
        &self,
        symbols: &[String],
        price_override: Option<Decimal>,
    ) -> Result<SubmissionReport> {
        let outcome: Result<SubmissionReport> = async {
            let session = self.sessions.ensure_valid().await?;
            let account = self.sessions.account(&session).await?;
            let held = self
                .sessions
                .broker()
                .get_positions(&session, &account, true)
                .await?;

            let mut selected = Vec::with_capacity(symbols.len());
            for symbol in symbols {
                let position = held.iter().find(|p| &p.symbol == symbol).ok_or_else(|| {
                    ResolutionError::NotClosable {
                        symbol: symbol.clone(),
                        reason: "no such position".to_string(),
                    }
                })?;
                selected.push(position.clone());
            }

            let order = build_closing_order(&selected, price_override)?;
            self.submitter.submit(&session, &account, &order).await
        }
        .await;
        outcome.map_err(log_failure)
    }

    async fn quotes_for(
        &self,
        selection: &ContractSelection,
        order_type: OrderType,
    ) -> Result<HashMap<String, Quote>> {
        if order_type == OrderType::Limit {
            self.quotes.quotes(&selection.streamer_symbols()).await
        } else {
            Ok(HashMap::new())
        }
    }
}

fn log_failure(e: TradeError) -> TradeError {
    error!(
        category = e.category(),
        recoverable = e.is_recoverable(),
        error = %e,
        "Signal not traded"
    );
    e
}
