use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

/// Decimal places kept for player prices
pub const PRICE_SCALE: u32 = 4;

/// Decimal places kept for currency amounts (balances, trade totals)
pub const CURRENCY_SCALE: u32 = 2;

/// Error types for pricing operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Outcome of pricing a single order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceUpdate {
    pub new_price: Decimal,
    pub price_change: Decimal,
}

/// Price for a buy order.
///
/// The price rises by 1% of itself for every 10% of the total share supply
/// bought in a single order, and never above `price_cap`.
pub fn compute_buy_price(
    current_price: Decimal,
    shares_to_buy: i64,
    total_shares: i64,
    price_cap: Decimal,
) -> PricingResult<PriceUpdate> {
    check_market(current_price, shares_to_buy, total_shares)?;
    if price_cap <= Decimal::ZERO {
        return Err(PricingError::InvalidArgument(
            "Price cap must be positive".to_string(),
        ));
    }

    let increase = current_price * impact_percent(shares_to_buy, total_shares);
    let new_price = (current_price + increase).min(price_cap);

    Ok(PriceUpdate {
        new_price,
        price_change: new_price - current_price,
    })
}

/// Price for a sell order. Mirror image of [`compute_buy_price`], bounded
/// below by `price_floor`.
pub fn compute_sell_price(
    current_price: Decimal,
    shares_to_sell: i64,
    total_shares: i64,
    price_floor: Decimal,
) -> PricingResult<PriceUpdate> {
    check_market(current_price, shares_to_sell, total_shares)?;
    if price_floor <= Decimal::ZERO {
        return Err(PricingError::InvalidArgument(
            "Price floor must be positive".to_string(),
        ));
    }

    let decrease = current_price * impact_percent(shares_to_sell, total_shares);
    let new_price = (current_price - decrease).max(price_floor);

    Ok(PriceUpdate {
        new_price,
        price_change: new_price - current_price,
    })
}

/// Total cost (buy) or revenue (sell) of a trade. Not rounded.
pub fn compute_trade_total(shares: i64, price_per_share: Decimal) -> Decimal {
    Decimal::from(shares) * price_per_share
}

/// Round a price to [`PRICE_SCALE`] places
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a currency amount to [`CURRENCY_SCALE`] places
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Fraction of its own value the price moves for an order of `shares`.
fn impact_percent(shares: i64, total_shares: i64) -> Decimal {
    let share_percentage = Decimal::from(shares) / Decimal::from(total_shares) * Decimal::ONE_HUNDRED;
    share_percentage / Decimal::TEN * Decimal::new(1, 2)
}

fn check_market(current_price: Decimal, shares: i64, total_shares: i64) -> PricingResult<()> {
    if total_shares <= 0 {
        return Err(PricingError::InvalidArgument(format!(
            "Total shares must be positive, got {}",
            total_shares
        )));
    }
    if current_price <= Decimal::ZERO {
        return Err(PricingError::InvalidArgument(format!(
            "Current price must be positive, got {}",
            current_price
        )));
    }
    if shares < 0 {
        return Err(PricingError::InvalidArgument(format!(
            "Share count must not be negative, got {}",
            shares
        )));
    }
    Ok(())
}
