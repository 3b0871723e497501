//! Trade intent validation
//!
//! A webhook payload becomes a [`TradeIntent`] only when every field checks
//! out; otherwise the caller gets one [`ValidationError`](crate::common::errors::ValidationError)
//! listing every problem.

pub mod types;
pub mod validator;

pub use types::{ExpirySelector, StrikeSelector, TradeIntent};
pub use validator::{parse_trade_intent, validate_map, validate_payload};
