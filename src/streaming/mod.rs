//! Streaming quote/Greeks collection

pub mod aggregator;

pub use aggregator::QuoteAggregator;
