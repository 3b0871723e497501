//! Position analytics across equity options, future options, equities,
//! futures and cryptocurrencies

pub mod aggregator;
pub mod analytics;
pub mod types;

pub use aggregator::PositionAggregator;
pub use types::{PortfolioSummary, PositionAnalytics, RawPosition};
