//! Share pricing.
//!
//! Linear price-impact model: every order moves the player's price by 1% of
//! itself per 10% of total supply traded, clamped to the player's floor and cap.

pub mod impact;

pub use impact::{
    compute_buy_price, compute_sell_price, compute_trade_total, round_currency, round_price,
    PriceUpdate, PricingError, PricingResult, CURRENCY_SCALE, PRICE_SCALE,
};
