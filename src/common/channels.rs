//! Channel-backed streamer for inter-task communication
//!
//! The network feed task owns a [`FeedHandle`]: it reads subscription
//! requests and publishes decoded events. Consumers hold the matching
//! [`ChannelStreamer`], which implements [`MarketStreamer`].

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use super::errors::{Result, TradeError};
use super::traits::{EventStream, MarketStreamer};
use super::types::{MarketEvent, StreamEventKind};

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Subscription change forwarded to the feed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionRequest {
    Subscribe {
        kind: StreamEventKind,
        symbols: Vec<String>,
    },
    Unsubscribe {
        kind: StreamEventKind,
        symbols: Vec<String>,
    },
}

/// Consumer side: subscribe and listen
#[derive(Debug, Clone)]
pub struct ChannelStreamer {
    events: broadcast::Sender<MarketEvent>,
    requests: mpsc::Sender<SubscriptionRequest>,
}

/// Feed side: receive subscription requests and publish events
#[derive(Debug)]
pub struct FeedHandle {
    events: broadcast::Sender<MarketEvent>,
    pub requests: mpsc::Receiver<SubscriptionRequest>,
}

impl FeedHandle {
    /// Publish an event to every listener; returns how many received it
    pub fn publish(&self, event: MarketEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Wait for the next subscription request
    pub async fn next_request(&mut self) -> Option<SubscriptionRequest> {
        self.requests.recv().await
    }
}

/// Create a streamer/feed pair with the default buffer size
pub fn create_streamer() -> (ChannelStreamer, FeedHandle) {
    create_streamer_with_size(DEFAULT_CHANNEL_SIZE)
}

/// Create a streamer/feed pair with a custom buffer size
pub fn create_streamer_with_size(size: usize) -> (ChannelStreamer, FeedHandle) {
    let (events, _) = broadcast::channel(size);
    let (request_tx, request_rx) = mpsc::channel(size);
    (
        ChannelStreamer {
            events: events.clone(),
            requests: request_tx,
        },
        FeedHandle {
            events,
            requests: request_rx,
        },
    )
}

#[async_trait]
impl MarketStreamer for ChannelStreamer {
    async fn subscribe(&self, kind: StreamEventKind, symbols: &[String]) -> Result<()> {
        debug!(%kind, count = symbols.len(), "Subscribing");
        self.requests
            .send(SubscriptionRequest::Subscribe {
                kind,
                symbols: symbols.to_vec(),
            })
            .await
            .map_err(|e| TradeError::Stream(format!("feed is gone: {}", e)))
    }

    async fn unsubscribe(&self, kind: StreamEventKind, symbols: &[String]) -> Result<()> {
        self.requests
            .send(SubscriptionRequest::Unsubscribe {
                kind,
                symbols: symbols.to_vec(),
            })
            .await
            .map_err(|e| TradeError::Stream(format!("feed is gone: {}", e)))
    }

    fn listen(&self, kind: StreamEventKind) -> EventStream {
        let receiver = self.events.subscribe();
        stream::unfold(receiver, move |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.kind() == kind => return Some((event, receiver)),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%kind, skipped, "Listener lagged behind the feed");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
