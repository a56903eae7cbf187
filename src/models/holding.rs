use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::pricing::round_price;

/// A user's position in one player
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub player_id: Uuid,
    pub shares: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_buy_price: Decimal, // NUMERIC(14, 4)
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Holding {
    /// Cost basis of the position at its average buy price
    pub fn cost_basis(&self) -> Decimal {
        Decimal::from(self.shares) * self.average_buy_price
    }
}

/// Weighted-average cost after adding `new_shares` bought at `price`
pub fn weighted_average_price(
    old_shares: i64,
    old_average: Decimal,
    new_shares: i64,
    price: Decimal,
) -> Decimal {
    let total_shares = old_shares + new_shares;
    if total_shares <= 0 {
        return Decimal::ZERO;
    }
    let total_cost = Decimal::from(old_shares) * old_average + Decimal::from(new_shares) * price;
    round_price(total_cost / Decimal::from(total_shares))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_average_price() {
        // 100 @ 20 + 100 @ 22 = 21
        let avg = weighted_average_price(100, Decimal::new(20, 0), 100, Decimal::new(22, 0));
        assert_eq!(avg, Decimal::new(21, 0));

        // First purchase is the trade price
        let avg = weighted_average_price(0, Decimal::ZERO, 50, Decimal::new(2020, 2));
        assert_eq!(avg, Decimal::new(2020, 2));

        // 1 @ 10 + 2 @ 11 = 32 / 3 = 10.6667
        let avg = weighted_average_price(1, Decimal::new(10, 0), 2, Decimal::new(11, 0));
        assert_eq!(avg, Decimal::new(106667, 4));
    }
}
