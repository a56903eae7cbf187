use crate::error::AppResult;
use crate::models::{Holding, LeaderboardEntry, Player, UserAccount};
use crate::pricing::round_currency;
use crate::repositories::MarketStore;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Rank accounts by balance plus holdings at current prices, richest first.
///
/// Ties keep the order of `accounts`.
pub fn rank_accounts(
    accounts: &[UserAccount],
    holdings: &[Holding],
    players: &[Player],
) -> Vec<LeaderboardEntry> {
    let prices: HashMap<Uuid, Decimal> = players.iter().map(|p| (p.id, p.current_price)).collect();

    let mut per_user: HashMap<Uuid, (Decimal, usize)> = HashMap::new();
    for holding in holdings {
        let price = prices.get(&holding.player_id).copied().unwrap_or(Decimal::ZERO);
        let entry = per_user.entry(holding.user_id).or_insert((Decimal::ZERO, 0));
        entry.0 += Decimal::from(holding.shares) * price;
        entry.1 += 1;
    }

    let mut entries: Vec<LeaderboardEntry> = accounts
        .iter()
        .map(|account| {
            let (portfolio_value, holdings_count) = per_user
                .get(&account.id)
                .copied()
                .unwrap_or((Decimal::ZERO, 0));
            let portfolio_value = round_currency(portfolio_value);

            LeaderboardEntry {
                rank: 0,
                user_id: account.id,
                email: account.email.clone(),
                virtual_balance: account.virtual_balance,
                portfolio_value,
                total_value: account.virtual_balance + portfolio_value,
                holdings_count,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.total_value.cmp(&a.total_value));
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index + 1;
    }

    entries
}

/// Service ranking every account by total wealth
pub struct LeaderboardService {
    store: Arc<dyn MarketStore>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    pub async fn leaderboard(&self) -> AppResult<Vec<LeaderboardEntry>> {
        let accounts = self.store.list_accounts().await?;
        let holdings = self.store.list_holdings().await?;
        let players = self.store.list_players().await?;

        Ok(rank_accounts(&accounts, &holdings, &players))
    }
}
