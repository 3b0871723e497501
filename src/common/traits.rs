//! Trait definitions for the brokerage collaborators
//!
//! The network client lives outside this crate; these traits are the
//! seams it plugs into.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::errors::Result;
use super::types::{MarketEvent, StreamEventKind};
use crate::chain::types::OptionChain;
use crate::config::types::ApiCredentials;
use crate::orders::types::{PlacedOrderResponse, PricedOrder};
use crate::portfolio::types::{
    CryptoInfo, EquityInfo, EquityOptionInfo, FutureInfo, FutureOptionInfo, MarketMetrics,
    RawPosition,
};
use crate::session::{Account, AccountBalance, Session};

/// Stream of events for one event kind
pub type EventStream = BoxStream<'static, MarketEvent>;

/// Authenticated account operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Open a new session with the given credentials
    async fn authenticate(&self, credentials: &ApiCredentials) -> Result<Session>;

    /// Check whether a cached session is still accepted
    async fn validate(&self, session: &Session) -> Result<bool>;

    /// All accounts visible to the session, open or closed
    async fn get_accounts(&self, session: &Session) -> Result<Vec<Account>>;

    async fn get_positions(
        &self,
        session: &Session,
        account: &Account,
        include_marks: bool,
    ) -> Result<Vec<RawPosition>>;

    async fn get_balances(&self, session: &Session, account: &Account) -> Result<AccountBalance>;

    /// Submit an order; with `dry_run` the broker only simulates it
    async fn place_order(
        &self,
        session: &Session,
        account: &Account,
        order: &PricedOrder,
        dry_run: bool,
    ) -> Result<PlacedOrderResponse>;
}

/// Option chain lookups
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Full chain for an underlying root ("SPY", "/ES")
    async fn get_chain(&self, session: &Session, root: &str) -> Result<OptionChain>;
}

/// Instrument reference data, one call per instrument class
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstrumentProvider: Send + Sync {
    async fn get_equity_options(
        &self,
        session: &Session,
        symbols: &[String],
    ) -> Result<Vec<EquityOptionInfo>>;

    async fn get_future_options(
        &self,
        session: &Session,
        symbols: &[String],
    ) -> Result<Vec<FutureOptionInfo>>;

    async fn get_equities(&self, session: &Session, symbols: &[String]) -> Result<Vec<EquityInfo>>;

    async fn get_futures(&self, session: &Session, symbols: &[String]) -> Result<Vec<FutureInfo>>;

    async fn get_cryptocurrencies(
        &self,
        session: &Session,
        symbols: &[String],
    ) -> Result<Vec<CryptoInfo>>;
}

/// Beta, IV rank and calendar metrics per symbol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn get_market_metrics(
        &self,
        session: &Session,
        symbols: &[String],
    ) -> Result<Vec<MarketMetrics>>;
}

/// Streaming quote/Greeks/summary/trade feed
///
/// Callers obtain the stream with `listen` before calling `subscribe` so
/// that no event published in response to the subscription is missed.
#[async_trait]
pub trait MarketStreamer: Send + Sync {
    async fn subscribe(&self, kind: StreamEventKind, symbols: &[String]) -> Result<()>;

    async fn unsubscribe(&self, kind: StreamEventKind, symbols: &[String]) -> Result<()>;

    /// Events of one kind, keyed by streamer symbol
    fn listen(&self, kind: StreamEventKind) -> EventStream;
}
