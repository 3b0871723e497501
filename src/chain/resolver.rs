//! Resolves a trade intent into concrete option contracts

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use super::types::{
    ChainExpiration, ContractSelection, ExpirationFilter, OccSymbol, OptionChain, OptionContract,
};
use crate::common::errors::{ResolutionError, Result};
use crate::common::traits::ChainProvider;
use crate::common::types::{OptionKind, OrderType};
use crate::intent::types::{ExpirySelector, StrikeSelector, TradeIntent};
use crate::session::Session;
use crate::streaming::aggregator::QuoteAggregator;

/// Pick the sub-chain for an exact date or the nearest days-to-expiration
///
/// Exact dates must match exactly one expiration. Days-to-expiration picks
/// the smallest absolute day distance among expirations accepted by
/// `filter`; the earlier expiration wins an equal distance.
pub fn select_expiration<'a>(
    chain: &'a OptionChain,
    expiry: &ExpirySelector,
    filter: ExpirationFilter,
) -> std::result::Result<&'a ChainExpiration, ResolutionError> {
    match expiry {
        ExpirySelector::Date(date) => {
            let matches: Vec<&ChainExpiration> = chain
                .expirations
                .iter()
                .filter(|e| e.expiration_date == *date)
                .collect();
            match matches.as_slice() {
                [only] => Ok(only),
                _ => Err(ResolutionError::ExpirationNotFound {
                    root: chain.root_symbol.clone(),
                    requested: date.to_string(),
                    matches: matches.len(),
                }),
            }
        }
        ExpirySelector::DaysToExpiration(dte) => {
            let mut candidates: Vec<&ChainExpiration> = chain
                .expirations
                .iter()
                .filter(|e| filter.accepts(e.expiration_type))
                .collect();
            candidates.sort_by_key(|e| e.expiration_date);
            candidates
                .into_iter()
                .min_by_key(|e| (e.days_to_expiration - dte).abs())
                .ok_or_else(|| ResolutionError::ExpirationNotFound {
                    root: chain.root_symbol.clone(),
                    requested: format!("{} days ({:?})", dte, filter),
                    matches: 0,
                })
        }
    }
}

/// Index of the listing at exactly `strike`
pub fn find_strike(
    chain: &OptionChain,
    expiration: &ChainExpiration,
    strike: Decimal,
) -> std::result::Result<usize, ResolutionError> {
    expiration
        .strikes
        .iter()
        .position(|s| s.strike_price == strike)
        .ok_or_else(|| ResolutionError::StrikeNotFound {
            root: chain.root_symbol.clone(),
            strike,
            expiration: expiration.expiration_date,
        })
}

/// Candidate with the smallest absolute distance to `target`; the first one wins ties
pub fn closest_delta<T>(candidates: &[(T, Decimal)], target: Decimal) -> Option<&T> {
    let mut best: Option<(&T, Decimal)> = None;
    for (candidate, delta) in candidates {
        let distance = (*delta - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Index of the far leg `width` strikes away from `index`
///
/// Calls move up the chain, puts move down.
pub fn spread_leg_index(
    expiration: &ChainExpiration,
    index: usize,
    kind: OptionKind,
    width: usize,
) -> std::result::Result<usize, ResolutionError> {
    let strike = expiration.strikes[index].strike_price;
    let (available, far) = match kind {
        OptionKind::Call => {
            let available = expiration.strikes.len() - index - 1;
            (available, index + width)
        }
        OptionKind::Put => (index, index.wrapping_sub(width)),
    };
    if width > available {
        return Err(ResolutionError::InsufficientStrikes {
            strike,
            width,
            available,
        });
    }
    Ok(far)
}

/// Turns intents and OCC symbols into tradeable contracts
pub struct ContractResolver {
    chains: Arc<dyn ChainProvider>,
    aggregator: QuoteAggregator,
    filter: ExpirationFilter,
}

impl ContractResolver {
    pub fn new(
        chains: Arc<dyn ChainProvider>,
        aggregator: QuoteAggregator,
        filter: ExpirationFilter,
    ) -> Self {
        Self {
            chains,
            aggregator,
            filter,
        }
    }

    /// Resolve the contract, or spread, an intent trades
    #[instrument(skip(self, session, intent), fields(ticker = %intent.ticker))]
    pub async fn resolve(
        &self,
        session: &Session,
        intent: &TradeIntent,
        order_type: OrderType,
    ) -> Result<ContractSelection> {
        if intent.is_spread() && order_type == OrderType::Market {
            return Err(ResolutionError::SpreadRequiresPricedOrder {
                width: intent.width,
            }
            .into());
        }

        let chain = self.chains.get_chain(session, &intent.ticker).await?;
        let expiration = select_expiration(&chain, &intent.expiry, self.filter)?;
        debug!(expiration = %expiration.expiration_date, "Selected expiration");

        let index = match intent.strike {
            StrikeSelector::Strike(strike) => find_strike(&chain, expiration, strike)?,
            StrikeSelector::Delta(delta) => {
                let target = StrikeSelector::signed_delta(delta, intent.option_kind);
                self.find_by_delta(&chain, expiration, intent.option_kind, target)
                    .await?
            }
        };

        let kind = intent.option_kind;
        let listing = &expiration.strikes[index];
        let near = OptionContract::from_listing(&chain, expiration, listing, kind);
        let selection = if intent.is_spread() {
            let far_index = spread_leg_index(expiration, index, kind, intent.width)?;
            let far_listing = &expiration.strikes[far_index];
            let far = OptionContract::from_listing(&chain, expiration, far_listing, kind);
            ContractSelection::Spread {
                near,
                far,
                width: intent.width,
            }
        } else {
            ContractSelection::Single(near)
        };

        let names: Vec<String> = selection.contracts().iter().map(|c| c.display_name()).collect();
        info!(contracts = ?names, "Resolved contracts");
        Ok(selection)
    }

    /// Look up a single contract from its OCC symbol
    #[instrument(skip(self, session))]
    pub async fn resolve_symbol(&self, session: &Session, symbol: &str) -> Result<OptionContract> {
        let occ = OccSymbol::parse(symbol).ok_or_else(|| ResolutionError::NotClosable {
            symbol: symbol.to_string(),
            reason: "not an OCC equity option symbol".to_string(),
        })?;

        let chain = self.chains.get_chain(session, &occ.root).await?;
        let expiration =
            select_expiration(&chain, &ExpirySelector::Date(occ.expiration), self.filter)?;
        let index = find_strike(&chain, expiration, occ.strike)?;
        Ok(OptionContract::from_listing(
            &chain,
            expiration,
            &expiration.strikes[index],
            occ.option_kind,
        ))
    }

    async fn find_by_delta(
        &self,
        chain: &OptionChain,
        expiration: &ChainExpiration,
        kind: OptionKind,
        target: Decimal,
    ) -> Result<usize> {
        let symbols: Vec<String> = expiration
            .strikes
            .iter()
            .map(|s| s.streamer_symbol(kind).to_string())
            .collect();
        let greeks = self.aggregator.greeks(&symbols).await?;

        let candidates: Vec<(usize, Decimal)> = expiration
            .strikes
            .iter()
            .enumerate()
            .filter_map(|(i, s)| greeks.get(s.streamer_symbol(kind)).map(|g| (i, g.delta)))
            .collect();

        let index = closest_delta(&candidates, target).copied().ok_or_else(|| {
            ResolutionError::NoDeltaCandidates {
                root: chain.root_symbol.clone(),
                target,
            }
        })?;
        debug!(
            %target,
            strike = %expiration.strikes[index].strike_price,
            "Closest delta"
        );
        Ok(index)
    }
}
