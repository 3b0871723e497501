//! Collects one streaming event per symbol, with retry
//!
//! A collection attempt listens, subscribes and waits until every requested
//! symbol has produced an event or the timeout elapses. Failed attempts are
//! retried after a fixed delay; the last failure is returned once the retry
//! budget is spent. Partial results are never returned.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, instrument, warn};

use crate::common::errors::{Result, TradeError};
use crate::common::traits::MarketStreamer;
use crate::common::types::{Greeks, MarketEvent, Quote, StreamEventKind, Summary, TradeTick};
use crate::config::types::StreamingSettings;

/// Batches streaming subscriptions into all-or-nothing collections
#[derive(Clone)]
pub struct QuoteAggregator {
    streamer: Arc<dyn MarketStreamer>,
    settings: StreamingSettings,
}

impl QuoteAggregator {
    pub fn new(streamer: Arc<dyn MarketStreamer>, settings: StreamingSettings) -> Self {
        Self { streamer, settings }
    }

    /// Latest event per symbol for every symbol in `symbols`
    #[instrument(skip(self, symbols), fields(count = symbols.len()))]
    pub async fn collect(
        &self,
        kind: StreamEventKind,
        symbols: &[String],
    ) -> Result<HashMap<String, MarketEvent>> {
        let wanted: HashSet<String> = symbols.iter().cloned().collect();
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }

        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.collect_once(kind, &wanted, attempt).await {
                Ok(events) => {
                    debug!(%kind, attempt, symbols = events.len(), "Collection complete");
                    return Ok(events);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        %kind,
                        attempt,
                        max_attempts,
                        error = %e,
                        delay_ms = self.settings.retry_delay_ms,
                        "Collection failed, retrying"
                    );
                    sleep(self.settings.retry_delay()).await;
                }
                Err(e) => {
                    error!(%kind, attempt, error = %e, "Collection failed");
                    return Err(e);
                }
            }
        }
    }

    async fn collect_once(
        &self,
        kind: StreamEventKind,
        wanted: &HashSet<String>,
        attempt: u32,
    ) -> Result<HashMap<String, MarketEvent>> {
        let mut events = self.streamer.listen(kind);
        let symbols: Vec<String> = wanted.iter().cloned().collect();
        self.streamer.subscribe(kind, &symbols).await?;

        let mut received: HashMap<String, MarketEvent> = HashMap::with_capacity(wanted.len());
        let outcome = timeout(self.settings.timeout(), async {
            while let Some(event) = events.next().await {
                if wanted.contains(event.symbol()) {
                    received.insert(event.symbol().to_string(), event);
                    if received.len() == wanted.len() {
                        return true;
                    }
                }
            }
            false
        })
        .await;

        if let Err(e) = self.streamer.unsubscribe(kind, &symbols).await {
            debug!(%kind, error = %e, "Unsubscribe failed");
        }

        match outcome {
            Ok(true) => Ok(received),
            Ok(false) => Err(TradeError::Stream(format!(
                "{} stream ended after {}/{} symbols",
                kind,
                received.len(),
                wanted.len()
            ))),
            Err(_) => Err(TradeError::StreamingTimeout {
                kind,
                received: received.len(),
                expected: wanted.len(),
                attempts: attempt,
            }),
        }
    }

    pub async fn quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        let events = self.collect(StreamEventKind::Quote, symbols).await?;
        Ok(typed(events, |e| match e {
            MarketEvent::Quote(q) => Some(q),
            _ => None,
        }))
    }

    pub async fn greeks(&self, symbols: &[String]) -> Result<HashMap<String, Greeks>> {
        let events = self.collect(StreamEventKind::Greeks, symbols).await?;
        Ok(typed(events, |e| match e {
            MarketEvent::Greeks(g) => Some(g),
            _ => None,
        }))
    }

    pub async fn summaries(&self, symbols: &[String]) -> Result<HashMap<String, Summary>> {
        let events = self.collect(StreamEventKind::Summary, symbols).await?;
        Ok(typed(events, |e| match e {
            MarketEvent::Summary(s) => Some(s),
            _ => None,
        }))
    }

    pub async fn trades(&self, symbols: &[String]) -> Result<HashMap<String, TradeTick>> {
        let events = self.collect(StreamEventKind::Trade, symbols).await?;
        Ok(typed(events, |e| match e {
            MarketEvent::Trade(t) => Some(t),
            _ => None,
        }))
    }
}

fn typed<T>(
    events: HashMap<String, MarketEvent>,
    extract: impl Fn(MarketEvent) -> Option<T>,
) -> HashMap<String, T> {
    events
        .into_iter()
        .filter_map(|(symbol, event)| extract(event).map(|value| (symbol, value)))
        .collect()
}
