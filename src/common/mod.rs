//! Shared error taxonomy, domain enums, market events and collaborator traits

pub mod channels;
pub mod errors;
pub mod traits;
pub mod types;

pub use channels::{create_streamer, ChannelStreamer, FeedHandle, SubscriptionRequest};
pub use errors::{Result, TradeError};
