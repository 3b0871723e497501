//! Option chain and resolved contract types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{InstrumentType, OptionKind};

/// Expiration cycle of a sub-chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpirationType {
    Regular,
    Weekly,
    Quarterly,
    #[serde(rename = "End-Of-Month")]
    EndOfMonth,
}

/// Restricts which expiration cycles a days-to-expiration search considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationFilter {
    /// Every expiration is a candidate
    #[default]
    Any,
    /// Only standard monthly expirations
    Monthlies,
    Weeklies,
    Quarterlies,
}

impl ExpirationFilter {
    pub fn accepts(&self, expiration_type: ExpirationType) -> bool {
        match self {
            ExpirationFilter::Any => true,
            ExpirationFilter::Monthlies => expiration_type == ExpirationType::Regular,
            ExpirationFilter::Weeklies => expiration_type == ExpirationType::Weekly,
            ExpirationFilter::Quarterlies => matches!(
                expiration_type,
                ExpirationType::Quarterly | ExpirationType::EndOfMonth
            ),
        }
    }
}

/// One entry of a tick-size schedule
///
/// `threshold` is the price below which `value` applies; `None` applies to any price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSize {
    pub value: Decimal,
    #[serde(default)]
    pub threshold: Option<Decimal>,
}

/// Call/put pair listed at one strike
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeListing {
    pub strike_price: Decimal,
    pub call: String,
    pub call_streamer_symbol: String,
    pub put: String,
    pub put_streamer_symbol: String,
}

impl StrikeListing {
    pub fn symbol(&self, kind: OptionKind) -> &str {
        match kind {
            OptionKind::Call => &self.call,
            OptionKind::Put => &self.put,
        }
    }

    pub fn streamer_symbol(&self, kind: OptionKind) -> &str {
        match kind {
            OptionKind::Call => &self.call_streamer_symbol,
            OptionKind::Put => &self.put_streamer_symbol,
        }
    }
}

/// All strikes for one expiration date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainExpiration {
    pub expiration_date: NaiveDate,
    pub days_to_expiration: i64,
    pub expiration_type: ExpirationType,
    #[serde(default)]
    pub settlement_type: Option<String>,
    pub tick_sizes: Vec<TickSize>,
    /// Ascending by strike price
    pub strikes: Vec<StrikeListing>,
}

/// Option chain for one underlying root, expirations ascending by date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionChain {
    pub root_symbol: String,
    pub underlying_symbol: String,
    pub expirations: Vec<ChainExpiration>,
}

/// A concrete tradeable option contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: String,
    pub streamer_symbol: String,
    pub root_symbol: String,
    pub underlying_symbol: String,
    pub option_kind: OptionKind,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    pub tick_sizes: Vec<TickSize>,
}

impl OptionContract {
    pub(crate) fn from_listing(
        chain: &OptionChain,
        expiration: &ChainExpiration,
        listing: &StrikeListing,
        kind: OptionKind,
    ) -> Self {
        Self {
            symbol: listing.symbol(kind).to_string(),
            streamer_symbol: listing.streamer_symbol(kind).to_string(),
            root_symbol: chain.root_symbol.clone(),
            underlying_symbol: chain.underlying_symbol.clone(),
            option_kind: kind,
            strike: listing.strike_price,
            expiration: expiration.expiration_date,
            tick_sizes: expiration.tick_sizes.clone(),
        }
    }

    /// Futures roots start with '/'
    pub fn instrument_type(&self) -> InstrumentType {
        if self.root_symbol.starts_with('/') {
            InstrumentType::FutureOption
        } else {
            InstrumentType::EquityOption
        }
    }

    /// Human-readable contract description (e.g., "SPY 600C 2025-08-15")
    pub fn display_name(&self) -> String {
        format!(
            "{} {}{} {}",
            self.underlying_symbol, self.strike, self.option_kind, self.expiration
        )
    }
}

/// Fields encoded in an OCC equity option symbol ("SPY   250815C00590000")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccSymbol {
    pub root: String,
    pub expiration: NaiveDate,
    pub option_kind: OptionKind,
    pub strike: Decimal,
}

impl OccSymbol {
    pub fn parse(symbol: &str) -> Option<Self> {
        if symbol.len() != 21 || !symbol.is_ascii() {
            return None;
        }
        let root = symbol[..6].trim();
        if root.is_empty() {
            return None;
        }
        let expiration = NaiveDate::parse_from_str(&symbol[6..12], "%y%m%d").ok()?;
        let option_kind = match &symbol[12..13] {
            "C" => OptionKind::Call,
            "P" => OptionKind::Put,
            _ => return None,
        };
        let digits = &symbol[13..];
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let thousandths: i64 = digits.parse().ok()?;
        Some(Self {
            root: root.to_string(),
            expiration,
            option_kind,
            strike: Decimal::new(thousandths, 3).normalize(),
        })
    }
}

/// The contract(s) an order will trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractSelection {
    Single(OptionContract),
    /// `near` is the signal's contract, `far` the hedge `width` strikes away
    Spread {
        near: OptionContract,
        far: OptionContract,
        width: usize,
    },
}

impl ContractSelection {
    /// The leg that carries the signal's direction
    pub fn primary(&self) -> &OptionContract {
        match self {
            ContractSelection::Single(contract) => contract,
            ContractSelection::Spread { near, .. } => near,
        }
    }

    pub fn contracts(&self) -> Vec<&OptionContract> {
        match self {
            ContractSelection::Single(contract) => vec![contract],
            ContractSelection::Spread { near, far, .. } => vec![near, far],
        }
    }

    pub fn streamer_symbols(&self) -> Vec<String> {
        self.contracts()
            .into_iter()
            .map(|c| c.streamer_symbol.clone())
            .collect()
    }

    pub fn is_spread(&self) -> bool {
        matches!(self, ContractSelection::Spread { .. })
    }
}
