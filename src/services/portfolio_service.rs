use crate::error::{AppError, AppResult};
use crate::models::{
    Holding, Player, PlayerSummary, PortfolioEntry, PortfolioSummary, PortfolioView, UserAccount,
};
use crate::pricing::round_currency;
use crate::repositories::MarketStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// P&L as a percentage of cost basis; zero when nothing was paid
fn pnl_percent(pnl: Decimal, cost_basis: Decimal) -> Decimal {
    if cost_basis > Decimal::ZERO {
        pnl / cost_basis * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Value each holding at its player's current price and total the results
pub fn build_portfolio(account: &UserAccount, positions: &[(Holding, Player)]) -> PortfolioView {
    let entries: Vec<PortfolioEntry> = positions
        .iter()
        .map(|(holding, player)| {
            let current_value = Decimal::from(holding.shares) * player.current_price;
            let cost_basis = holding.cost_basis();
            let pnl = current_value - cost_basis;

            PortfolioEntry {
                id: holding.id,
                player: PlayerSummary::from(player),
                shares: holding.shares,
                average_buy_price: holding.average_buy_price,
                current_value: round_currency(current_value),
                cost_basis: round_currency(cost_basis),
                pnl: round_currency(pnl),
                pnl_percent: round_currency(pnl_percent(pnl, cost_basis)),
            }
        })
        .collect();

    let portfolio_value: Decimal = entries.iter().map(|e| e.current_value).sum();
    let total_cost_basis: Decimal = entries.iter().map(|e| e.cost_basis).sum();
    let total_pnl = portfolio_value - total_cost_basis;

    let summary = PortfolioSummary {
        virtual_balance: account.virtual_balance,
        total_value: round_currency(account.virtual_balance + portfolio_value),
        total_holdings: entries.len(),
        portfolio_value,
        total_cost_basis,
        total_pnl,
        total_pnl_percent: round_currency(pnl_percent(total_pnl, total_cost_basis)),
    };

    PortfolioView { entries, summary }
}

/// Service computing a user's holdings and P&L
pub struct PortfolioService {
    store: Arc<dyn MarketStore>,
}

impl PortfolioService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    pub async fn portfolio(&self, user_id: Uuid) -> AppResult<PortfolioView> {
        let account = self
            .store
            .get_account(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let holdings = self.store.list_holdings_for_user(user_id).await?;

        let mut positions = Vec::with_capacity(holdings.len());
        for holding in holdings {
            match self.store.get_player(holding.player_id).await? {
                Some(player) => positions.push((holding, player)),
                None => warn!(
                    "Holding {} references missing player {}",
                    holding.id, holding.player_id
                ),
            }
        }

        Ok(build_portfolio(&account, &positions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(balance: Decimal) -> UserAccount {
        let now = Utc::now().naive_utc();
        UserAccount {
            id: Uuid::new_v4(),
            email: "fan@example.com".to_string(),
            virtual_balance: balance,
            created_at: now,
            updated_at: now,
        }
    }

    fn position(shares: i64, avg: Decimal, current: Decimal) -> (Holding, Player) {
        let now = Utc::now().naive_utc();
        let player = Player {
            id: Uuid::new_v4(),
            name: "Cole Palmer".to_string(),
            team: "Chelsea".to_string(),
            position: "MID".to_string(),
            base_price: Decimal::new(20, 0),
            current_price: current,
            price_cap: Decimal::new(40, 0),
            price_floor: Decimal::new(10, 0),
            total_shares: 1000,
            available_shares: 1000 - shares,
            created_at: now,
            updated_at: now,
        };
        let holding = Holding {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            player_id: player.id,
            shares,
            average_buy_price: avg,
            created_at: now,
            updated_at: now,
        };
        (holding, player)
    }

    #[test]
    fn test_portfolio_pnl() {
        let account = account(Decimal::new(7980, 0));
        let positions = vec![
            position(100, Decimal::new(2020, 2), Decimal::new(2222, 2)),
            position(10, Decimal::new(30, 0), Decimal::new(27, 0)),
        ];
        let view = build_portfolio(&account, &positions);

        let first = &view.entries[0];
        assert_eq!(first.current_value, Decimal::new(2222, 0));
        assert_eq!(first.cost_basis, Decimal::new(2020, 0));
        assert_eq!(first.pnl, Decimal::new(202, 0));
        assert_eq!(first.pnl_percent, Decimal::new(10, 0));

        let second = &view.entries[1];
        assert_eq!(second.pnl, Decimal::new(-30, 0));
        assert_eq!(second.pnl_percent, Decimal::new(-10, 0));

        let summary = &view.summary;
        assert_eq!(summary.total_holdings, 2);
        assert_eq!(summary.portfolio_value, Decimal::new(2492, 0));
        assert_eq!(summary.total_cost_basis, Decimal::new(2320, 0));
        assert_eq!(summary.total_pnl, Decimal::new(172, 0));
        // 172 / 2320 = 7.4137..%
        assert_eq!(summary.total_pnl_percent, Decimal::new(741, 2));
        assert_eq!(summary.total_value, Decimal::new(10472, 0));
    }

    #[test]
    fn test_empty_portfolio() {
        let view = build_portfolio(&account(Decimal::new(10_000, 0)), &[]);
        assert!(view.entries.is_empty());
        assert_eq!(view.summary.total_pnl_percent, Decimal::ZERO);
        assert_eq!(view.summary.total_value, Decimal::new(10_000, 0));
    }

    #[test]
    fn test_zero_cost_basis_has_zero_percent() {
        let positions = vec![position(5, Decimal::ZERO, Decimal::new(20, 0))];
        let view = build_portfolio(&account(Decimal::ZERO), &positions);
        assert_eq!(view.entries[0].pnl, Decimal::new(100, 0));
        assert_eq!(view.entries[0].pnl_percent, Decimal::ZERO);
    }
}
