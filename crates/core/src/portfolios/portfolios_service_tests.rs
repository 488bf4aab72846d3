//! Tests for the portfolio service.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::constants::DEFAULT_PORTFOLIO_ID;
    use crate::errors::{DatabaseError, Result};
    use crate::ledger::Position;
    use crate::market_data::{
        Candle, HistoryInterval, HistoryRange, PriceOracleTrait, QuoteSnapshot,
    };
    use crate::portfolios::{
        NewPortfolio, Portfolio, PortfolioRepositoryTrait, PortfolioService, PortfolioServiceTrait,
        PortfolioUpdate,
    };
    use crate::Error;

    // --- Mock PortfolioRepository ---

    #[derive(Default)]
    struct MockPortfolioRepository {
        portfolios: Mutex<HashMap<String, Portfolio>>,
        positions: Mutex<Vec<Position>>,
    }

    #[async_trait]
    impl PortfolioRepositoryTrait for MockPortfolioRepository {
        async fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
            let now = Utc::now();
            let portfolio = Portfolio {
                id: new_portfolio.id.unwrap_or_else(|| "generated".to_string()),
                name: new_portfolio.name,
                base_currency: new_portfolio.base_currency,
                cash_balance: new_portfolio.opening_cash,
                created_at: now,
                updated_at: now,
            };
            self.portfolios
                .lock()
                .unwrap()
                .insert(portfolio.id.clone(), portfolio.clone());
            Ok(portfolio)
        }

        async fn update(&self, _update: PortfolioUpdate) -> Result<Portfolio> {
            unimplemented!()
        }

        async fn delete(&self, portfolio_id: &str) -> Result<usize> {
            Ok(self
                .portfolios
                .lock()
                .unwrap()
                .remove(portfolio_id)
                .map(|_| 1)
                .unwrap_or(0))
        }

        async fn reset(&self, _portfolio_id: &str, _cash_balance: Decimal) -> Result<Portfolio> {
            unimplemented!()
        }

        fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio> {
            self.portfolios
                .lock()
                .unwrap()
                .get(portfolio_id)
                .cloned()
                .ok_or_else(|| {
                    Error::Database(DatabaseError::NotFound(format!(
                        "Portfolio {}",
                        portfolio_id
                    )))
                })
        }

        fn list(&self) -> Result<Vec<Portfolio>> {
            Ok(self.portfolios.lock().unwrap().values().cloned().collect())
        }

        fn list_positions(&self, portfolio_id: &str) -> Result<Vec<Position>> {
            Ok(self
                .positions
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.portfolio_id == portfolio_id)
                .cloned()
                .collect())
        }
    }

    // --- Mock PriceOracle ---

    struct MockPriceOracle {
        prices: HashMap<String, Decimal>,
    }

    #[async_trait]
    impl PriceOracleTrait for MockPriceOracle {
        async fn get_quote(&self, symbol: &str) -> Result<QuoteSnapshot> {
            Ok(QuoteSnapshot {
                symbol: symbol.to_string(),
                price: self.prices.get(symbol).copied(),
                previous_close: None,
                change: None,
                change_percent: None,
                currency: Some("USD".to_string()),
                market_state: Some("REGULAR".to_string()),
                as_of: Utc::now(),
            })
        }

        async fn get_history(
            &self,
            _symbol: &str,
            _range: HistoryRange,
            _interval: HistoryInterval,
        ) -> Result<Vec<Candle>> {
            Ok(Vec::new())
        }
    }

    fn service_with(
        repository: Arc<MockPortfolioRepository>,
        prices: HashMap<String, Decimal>,
    ) -> PortfolioService {
        PortfolioService::new(repository, Arc::new(MockPriceOracle { prices }))
    }

    #[tokio::test]
    async fn default_portfolio_is_auto_created_on_first_access() {
        let repository = Arc::new(MockPortfolioRepository::default());
        let service = service_with(repository.clone(), HashMap::new());

        let portfolio = service.get_portfolio(DEFAULT_PORTFOLIO_ID).await.unwrap();
        assert_eq!(portfolio.id, DEFAULT_PORTFOLIO_ID);
        assert_eq!(portfolio.cash_balance, dec!(100000));

        // Second access returns the same row, not a fresh one.
        let again = service.get_portfolio(DEFAULT_PORTFOLIO_ID).await.unwrap();
        assert_eq!(again.created_at, portfolio.created_at);
    }

    #[tokio::test]
    async fn unknown_portfolio_is_not_auto_created() {
        let repository = Arc::new(MockPortfolioRepository::default());
        let service = service_with(repository, HashMap::new());

        let err = service.get_portfolio("nope").await.unwrap_err();
        assert!(matches!(err, Error::Database(DatabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn snapshot_marks_positions_and_falls_back_to_cost() {
        let repository = Arc::new(MockPortfolioRepository::default());
        repository
            .create(NewPortfolio {
                id: Some("p1".to_string()),
                name: "Test".to_string(),
                base_currency: "USD".to_string(),
                opening_cash: dec!(1000),
            })
            .await
            .unwrap();
        repository.positions.lock().unwrap().extend([
            Position {
                portfolio_id: "p1".to_string(),
                symbol: "AAPL".to_string(),
                quantity: dec!(10),
                average_price: dec!(100),
            },
            Position {
                portfolio_id: "p1".to_string(),
                symbol: "UNQUOTED".to_string(),
                quantity: dec!(2),
                average_price: dec!(50),
            },
        ]);

        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), dec!(110));
        let service = service_with(repository, prices);

        let snapshot = service.get_snapshot("p1").await.unwrap();
        assert_eq!(snapshot.holdings.len(), 2);

        let aapl = snapshot.holdings.iter().find(|h| h.symbol == "AAPL").unwrap();
        assert_eq!(aapl.market_value, dec!(1100));
        assert_eq!(aapl.unrealized_pnl, dec!(100));

        let unquoted = snapshot
            .holdings
            .iter()
            .find(|h| h.symbol == "UNQUOTED")
            .unwrap();
        assert_eq!(unquoted.market_price, dec!(50));
        assert_eq!(unquoted.unrealized_pnl, dec!(0));

        // 1000 cash + 1100 + 100
        assert_eq!(snapshot.total_equity, dec!(2200));
    }
}
