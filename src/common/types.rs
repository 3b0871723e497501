//! Unified types used across intent, chain, order and portfolio modules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Parse from the first letter of a case-insensitive label ("c", "Call", "PUT", ...)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => Some(OptionKind::Call),
            Some('P') => Some(OptionKind::Put),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionKind::Call => write!(f, "C"),
            OptionKind::Put => write!(f, "P"),
        }
    }
}

/// Trade direction carried by a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Buy to open
    Bto,
    /// Sell to open
    Sto,
    /// Buy to close
    Btc,
    /// Sell to close
    Stc,
    Buy,
    Sell,
}

impl Direction {
    /// Parse the exact upper-case code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "BTO" => Some(Direction::Bto),
            "STO" => Some(Direction::Sto),
            "BTC" => Some(Direction::Btc),
            "STC" => Some(Direction::Stc),
            "BUY" => Some(Direction::Buy),
            "SELL" => Some(Direction::Sell),
            _ => None,
        }
    }

    pub fn is_opening(&self) -> bool {
        matches!(self, Direction::Bto | Direction::Sto)
    }

    pub fn is_closing(&self) -> bool {
        matches!(self, Direction::Btc | Direction::Stc)
    }

    /// Buying directions increase the held quantity
    pub fn is_buy(&self) -> bool {
        matches!(self, Direction::Bto | Direction::Btc | Direction::Buy)
    }

    /// +1 for buys, -1 for sells
    pub fn sign(&self) -> i64 {
        if self.is_buy() {
            1
        } else {
            -1
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Direction::Bto => "BTO",
            Direction::Sto => "STO",
            Direction::Btc => "BTC",
            Direction::Stc => "STC",
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        };
        write!(f, "{}", code)
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

impl OrderType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "MARKET" => Some(OrderType::Market),
            "LIMIT" => Some(OrderType::Limit),
            "STOP" => Some(OrderType::Stop),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Stop => write!(f, "STOP"),
        }
    }
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    Day,
    Gtc,
}

/// Whether an order pays (debit) or receives (credit) premium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceEffect {
    Credit,
    Debit,
    None,
}

/// Instrument class of a held position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentType {
    #[serde(rename = "Equity Option")]
    EquityOption,
    #[serde(rename = "Future Option")]
    FutureOption,
    #[serde(rename = "Equity")]
    Equity,
    #[serde(rename = "Future")]
    Future,
    #[serde(rename = "Cryptocurrency")]
    Cryptocurrency,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            InstrumentType::EquityOption => "Equity Option",
            InstrumentType::FutureOption => "Future Option",
            InstrumentType::Equity => "Equity",
            InstrumentType::Future => "Future",
            InstrumentType::Cryptocurrency => "Cryptocurrency",
            InstrumentType::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

/// Long or short holding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantityDirection {
    Long,
    Short,
    Zero,
}

impl QuantityDirection {
    /// +1 long, -1 short, 0 flat
    pub fn sign(&self) -> Decimal {
        match self {
            QuantityDirection::Long => Decimal::ONE,
            QuantityDirection::Short => Decimal::NEGATIVE_ONE,
            QuantityDirection::Zero => Decimal::ZERO,
        }
    }
}

/// Kind of streaming event a subscription delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEventKind {
    Quote,
    Greeks,
    Trade,
    Summary,
}

impl std::fmt::Display for StreamEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEventKind::Quote => write!(f, "quote"),
            StreamEventKind::Greeks => write!(f, "greeks"),
            StreamEventKind::Trade => write!(f, "trade"),
            StreamEventKind::Summary => write!(f, "summary"),
        }
    }
}

/// Top of book for a streamer symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Quote {
    /// Calculate the midpoint price
    pub fn midpoint(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2)
    }

    /// Calculate the spread
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// Per-share option Greeks for a streamer symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub symbol: String,
    pub delta: Decimal,
    pub gamma: Decimal,
    pub theta: Decimal,
    #[serde(default)]
    pub vega: Decimal,
    #[serde(default)]
    pub volatility: Decimal,
}

/// Last trade for a streamer symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTick {
    pub symbol: String,
    pub price: Decimal,
    #[serde(default)]
    pub size: Decimal,
}

/// Daily summary for a streamer symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub symbol: String,
    #[serde(default)]
    pub prev_day_close_price: Option<Decimal>,
    #[serde(default)]
    pub day_open_price: Option<Decimal>,
}

/// Unified streaming event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    Quote(Quote),
    Greeks(Greeks),
    Trade(TradeTick),
    Summary(Summary),
}

impl MarketEvent {
    /// Streamer symbol the event is keyed by
    pub fn symbol(&self) -> &str {
        match self {
            MarketEvent::Quote(q) => &q.symbol,
            MarketEvent::Greeks(g) => &g.symbol,
            MarketEvent::Trade(t) => &t.symbol,
            MarketEvent::Summary(s) => &s.symbol,
        }
    }

    pub fn kind(&self) -> StreamEventKind {
        match self {
            MarketEvent::Quote(_) => StreamEventKind::Quote,
            MarketEvent::Greeks(_) => StreamEventKind::Greeks,
            MarketEvent::Trade(_) => StreamEventKind::Trade,
            MarketEvent::Summary(_) => StreamEventKind::Summary,
        }
    }
}
