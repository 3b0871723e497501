//! Signal Options Library
//!
//! Turns charting-platform trade signals into brokerage option orders
//! and builds enriched portfolio analytics for an account.

pub mod chain;
pub mod common;
pub mod config;
pub mod intent;
pub mod orders;
pub mod portfolio;
pub mod session;
pub mod streaming;
pub mod trader;

// Re-export commonly used types
pub use chain::resolver::ContractResolver;
pub use chain::types::{ContractSelection, ExpirationFilter, OptionChain, OptionContract};
pub use common::errors::{ResolutionError, Result, TradeError, ValidationError, ValidationIssue};
pub use common::traits::{
    Brokerage, ChainProvider, InstrumentProvider, MarketStreamer, MetricsProvider,
};
pub use common::types::{
    Direction, MarketEvent, OptionKind, OrderType, StreamEventKind, TimeInForce,
};
pub use config::types::AppConfig;
pub use intent::types::{ExpirySelector, StrikeSelector, TradeIntent};
pub use intent::validator::{parse_trade_intent, validate_payload};
pub use orders::submit::OrderSubmitter;
pub use orders::types::{PricedOrder, SubmissionReport};
pub use portfolio::aggregator::PositionAggregator;
pub use portfolio::types::{PortfolioSummary, PositionAnalytics};
pub use session::{Account, Session, SessionManager};
pub use streaming::aggregator::QuoteAggregator;
pub use trader::SignalTrader;
