//! Dry-run checked order submission

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use super::types::{PlacedOrderResponse, PricedOrder, SubmissionReport};
use crate::common::errors::{Result, TradeError};
use crate::common::traits::Brokerage;
use crate::session::{Account, AccountBalance, Session};

/// Places orders only after the broker accepts a simulated copy
pub struct OrderSubmitter<B: Brokerage> {
    broker: Arc<B>,
}

impl<B: Brokerage> OrderSubmitter<B> {
    pub fn new(broker: Arc<B>) -> Self {
        Self { broker }
    }

    /// Simulate the order and report its effect without placing it
    #[instrument(skip(self, session, account, order), fields(account = %account.account_number))]
    pub async fn review(
        &self,
        session: &Session,
        account: &Account,
        order: &PricedOrder,
    ) -> Result<SubmissionReport> {
        let dry_run = self.dry_run(session, account, order).await?;
        let balances = self.balances(session, account).await;
        Ok(report(order, &dry_run, &balances))
    }

    /// Dry-run, then place live; the live call never happens if the dry run fails
    ///
    /// Balances are read before the live call so that nothing after a
    /// successful placement can turn it into an error.
    #[instrument(skip(self, session, account, order), fields(account = %account.account_number))]
    pub async fn submit(
        &self,
        session: &Session,
        account: &Account,
        order: &PricedOrder,
    ) -> Result<SubmissionReport> {
        let dry_run = self.dry_run(session, account, order).await?;
        for warning in &dry_run.warnings {
            warn!(%warning, "Dry-run warning");
        }
        let balances = self.balances(session, account).await;

        let placed = self.broker.place_order(session, account, order, false).await?;
        if !placed.errors.is_empty() {
            for e in &placed.errors {
                error!(error = %e, "Order rejected");
            }
            return Err(TradeError::Submission {
                errors: placed.errors,
            });
        }

        let mut report = report(order, &dry_run, &balances);
        report.order_id = placed.order_id;
        report.status = placed.status;
        for warning in placed.warnings {
            if !report.warnings.contains(&warning) {
                warn!(%warning, "Order warning");
                report.warnings.push(warning);
            }
        }

        info!(
            order_id = ?report.order_id,
            legs = ?order.leg_symbols(),
            price = ?order.price,
            bp_pct = %report.buying_power_pct,
            "Order placed"
        );
        Ok(report)
    }

    async fn dry_run(
        &self,
        session: &Session,
        account: &Account,
        order: &PricedOrder,
    ) -> Result<PlacedOrderResponse> {
        let message = match self.broker.place_order(session, account, order, true).await {
            Ok(response) if response.errors.is_empty() => return Ok(response),
            Ok(response) => response
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
            Err(e) => e.to_string(),
        };

        let balances = self.balances(session, account).await;
        warn!(
            %message,
            buying_power = %balances.derivative_buying_power,
            net_liquidity = %balances.net_liquidating_value,
            maintenance = %balances.maintenance_requirement,
            "Dry-run rejected"
        );
        Err(TradeError::DryRunRejected {
            message,
            buying_power: balances.derivative_buying_power,
            net_liquidity: balances.net_liquidating_value,
        })
    }

    /// Account balances, or zeros when the broker cannot report them
    async fn balances(&self, session: &Session, account: &Account) -> AccountBalance {
        match self.broker.get_balances(session, account).await {
            Ok(balances) => balances,
            Err(e) => {
                warn!(error = %e, "Balances unavailable, reporting zero");
                AccountBalance::default()
            }
        }
    }
}

fn report(
    order: &PricedOrder,
    dry_run: &PlacedOrderResponse,
    balances: &AccountBalance,
) -> SubmissionReport {
    let change = dry_run.buying_power_effect.signed_change();
    SubmissionReport {
        order: order.clone(),
        order_id: dry_run.order_id.clone(),
        status: dry_run.status.clone(),
        buying_power_change: change,
        buying_power_pct: percent_of(change, balances.net_liquidating_value),
        fees: dry_run.total_fees(),
        warnings: dry_run.warnings.clone(),
    }
}

/// `part` as a percentage of `whole`, rounded to two places; zero when `whole` is zero
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
}
