//! Error types for the application

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::StreamEventKind;

/// Result type alias using our TradeError
pub type Result<T> = std::result::Result<T, TradeError>;

/// Main error type for signal handling, order placement and analytics
#[derive(Error, Debug)]
pub enum TradeError {
    /// Malformed, missing or contradictory webhook fields
    #[error("Invalid trade signal:\n{0}")]
    Validation(#[from] ValidationError),

    /// No contract matches the requested expiration/strike/spread
    #[error("Contract resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// The broker rejected the simulated order; nothing was sent live
    #[error("Dry-run rejected: {message} (buying power {buying_power}, net liquidity {net_liquidity})")]
    DryRunRejected {
        message: String,
        buying_power: Decimal,
        net_liquidity: Decimal,
    },

    /// The broker returned order-level errors for the live order
    #[error("Order submission failed: {}", join_messages(.errors))]
    Submission { errors: Vec<BrokerMessage> },

    /// Streaming collection incomplete after all retries
    #[error("Timed out collecting {kind} events: {received}/{expected} symbols after {attempts} attempts")]
    StreamingTimeout {
        kind: StreamEventKind,
        received: usize,
        expected: usize,
        attempts: u32,
    },

    /// Streaming transport errors
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Broker transport or API errors
    #[error("Broker error: {0}")]
    Broker(String),

    /// Authentication/session errors
    #[error("Session error: {0}")]
    Session(String),

    /// A held position of a known class came back without its instrument record
    #[error("No reference data for {0}")]
    MissingReferenceData(String),

    /// Configured account does not exist or is closed
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TradeError {
    /// Whether a retry of the same request can succeed
    ///
    /// Used by the streaming aggregator; order placement is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TradeError::StreamingTimeout { .. } | TradeError::Stream(_) | TradeError::Broker(_)
        )
    }

    /// Whether the failure is scoped to one request rather than the process
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TradeError::Configuration(_))
    }

    /// Short category label for operator reports
    pub fn category(&self) -> &'static str {
        match self {
            TradeError::Validation(_) => "validation",
            TradeError::Resolution(_) => "resolution",
            TradeError::DryRunRejected { .. } => "dry_run_rejected",
            TradeError::Submission { .. } => "submission",
            TradeError::StreamingTimeout { .. } => "streaming_timeout",
            TradeError::Stream(_) => "stream",
            TradeError::Broker(_) => "broker",
            TradeError::Session(_) => "session",
            TradeError::MissingReferenceData(_) => "reference_data",
            TradeError::AccountNotFound(_) => "account",
            TradeError::JsonParse(_) => "json",
            TradeError::Configuration(_) => "configuration",
        }
    }
}

/// A code/message pair reported by the broker for an order
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BrokerMessage {
    pub code: String,
    pub message: String,
}

impl fmt::Display for BrokerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

fn join_messages(messages: &[BrokerMessage]) -> String {
    messages
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// One problem found while validating a webhook payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A required field is absent
    Missing { field: String, hint: Option<String> },
    /// A field is present but cannot be parsed into its type
    MalformedField { field: String, value: String, expected: String },
    /// A field is not one of the allowed values
    InvalidEnum { field: String, value: String, expected: String },
    /// A numeric field is outside its allowed range
    InvalidRange { field: String, value: String, expected: String },
    /// Fields are individually valid but contradict each other
    Conflict(String),
}

impl ValidationIssue {
    /// Name of the offending field, if the issue is about a single field
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationIssue::Missing { field, .. }
            | ValidationIssue::MalformedField { field, .. }
            | ValidationIssue::InvalidEnum { field, .. }
            | ValidationIssue::InvalidRange { field, .. } => Some(field),
            ValidationIssue::Conflict(_) => None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Missing { field, hint: None } => {
                write!(f, "{} not found in data.", field)
            }
            ValidationIssue::Missing {
                field,
                hint: Some(hint),
            } => write!(f, "{} not found in data. {}", field, hint),
            ValidationIssue::MalformedField {
                field,
                value,
                expected,
            } => write!(f, "{} is not {}: {}.", field, expected, value),
            ValidationIssue::InvalidEnum {
                field,
                value,
                expected,
            } => write!(f, "Invalid {}: {}. Expected: {}", field, value, expected),
            ValidationIssue::InvalidRange {
                field,
                value,
                expected,
            } => write!(f, "{} must be {}: {}.", field, expected, value),
            ValidationIssue::Conflict(message) => write!(f, "{}", message),
        }
    }
}

/// Every problem found in a payload; displayed newline-joined
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// True if any issue names the given field
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field() == Some(field))
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failures while turning an intent into concrete contracts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no unique expiration matching {requested} for {root} ({matches} matches)")]
    ExpirationNotFound {
        root: String,
        requested: String,
        matches: usize,
    },

    #[error("strike {strike} not found in {root} {expiration} chain")]
    StrikeNotFound {
        root: String,
        strike: Decimal,
        expiration: chrono::NaiveDate,
    },

    #[error("spread width {width} needs {width} strikes beyond {strike}, only {available} available")]
    InsufficientStrikes {
        strike: Decimal,
        width: usize,
        available: usize,
    },

    #[error("spread orders must be priced; width {width} is not allowed for market orders")]
    SpreadRequiresPricedOrder { width: usize },

    #[error("no contracts to search for delta {target} in {root} chain")]
    NoDeltaCandidates { root: String, target: Decimal },

    #[error("position {symbol} cannot be closed: {reason}")]
    NotClosable { symbol: String, reason: String },
}
