//! Authenticated broker session shared across requests
//!
//! The entry point builds one [`SessionManager`] and passes it by reference
//! to every component. Each request starts with [`SessionManager::ensure_valid`].

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::common::errors::{Result, TradeError};
use crate::common::traits::Brokerage;
use crate::config::types::{ApiCredentials, BrokerConfig};

/// Token issued by the broker after login
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_number: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub cash_balance: Decimal,
    pub net_liquidating_value: Decimal,
    pub derivative_buying_power: Decimal,
    pub equity_buying_power: Decimal,
    #[serde(default)]
    pub maintenance_requirement: Decimal,
}

/// Owns the broker handle and the cached session
pub struct SessionManager<B: Brokerage> {
    broker: Arc<B>,
    credentials: ApiCredentials,
    account_number: Option<String>,
    session: RwLock<Option<Session>>,
}

impl<B: Brokerage> SessionManager<B> {
    pub fn new(
        broker: Arc<B>,
        credentials: ApiCredentials,
        account_number: Option<String>,
    ) -> Self {
        Self {
            broker,
            credentials,
            account_number,
            session: RwLock::new(None),
        }
    }

    /// Build from the broker section of the configuration
    pub fn from_config(broker: Arc<B>, config: &BrokerConfig) -> Result<Self> {
        let credentials = config.credentials().ok_or_else(|| {
            TradeError::Configuration("broker username and password are required".to_string())
        })?;
        Ok(Self::new(broker, credentials, config.account_number.clone()))
    }

    pub fn broker(&self) -> &Arc<B> {
        &self.broker
    }

    /// Return a session the broker accepts, logging in only when needed
    ///
    /// Concurrent callers that all find the cached session rejected log in
    /// once; the rest pick up the session the first one stored.
    #[instrument(skip(self))]
    pub async fn ensure_valid(&self) -> Result<Session> {
        let cached = self.session.read().await.clone();
        if let Some(session) = &cached {
            if self.broker.validate(session).await? {
                debug!("Reusing cached session");
                return Ok(session.clone());
            }
            info!("Cached session rejected, re-authenticating");
        }

        let mut guard = self.session.write().await;
        if let Some(current) = guard.as_ref() {
            if cached.as_ref().map(|s| &s.token) != Some(&current.token) {
                debug!("Session already refreshed");
                return Ok(current.clone());
            }
        }
        let session = self.broker.authenticate(&self.credentials).await?;
        info!(user = ?session.user, "Authenticated");
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Look up an open account by number
    pub async fn get_account(&self, session: &Session, account_number: &str) -> Result<Account> {
        self.broker
            .get_accounts(session)
            .await?
            .into_iter()
            .find(|a| a.account_number == account_number && !a.is_closed)
            .ok_or_else(|| TradeError::AccountNotFound(account_number.to_string()))
    }

    /// The configured account
    pub async fn account(&self, session: &Session) -> Result<Account> {
        let number = self.account_number.as_deref().ok_or_else(|| {
            TradeError::Configuration("no broker account number configured".to_string())
        })?;
        self.get_account(session, number).await
    }
}
