//! End-to-end tests for the ledger executor against a real SQLite database.

use std::sync::Arc;

use rust_decimal_macros::dec;
use tempfile::TempDir;

use paperdesk_core::ledger::{LedgerError, LedgerExecutorTrait, TradeInstruction};
use paperdesk_core::portfolios::{NewPortfolio, PortfolioRepositoryTrait};
use paperdesk_core::trades::{TradeRepositoryTrait, TradeSide};
use paperdesk_core::Error;
use paperdesk_storage_sqlite::ledger::LedgerRepository;
use paperdesk_storage_sqlite::portfolios::PortfolioRepository;
use paperdesk_storage_sqlite::trades::TradeRepository;
use paperdesk_storage_sqlite::{create_pool, run_migrations, spawn_writer, DbPool, WriteHandle};

struct TestDb {
    // Keeps the database directory alive for the duration of the test.
    _dir: TempDir,
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

fn setup() -> TestDb {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("paperdesk-test.db");
    let pool = create_pool(db_path.to_str().expect("utf-8 path")).expect("create pool");
    run_migrations(&pool).expect("run migrations");
    let writer = spawn_writer(pool.clone());
    TestDb {
        _dir: dir,
        pool: Arc::new(pool),
        writer,
    }
}

async fn create_portfolio(db: &TestDb, cash: rust_decimal::Decimal) -> String {
    let repository = PortfolioRepository::new(db.pool.clone(), db.writer.clone());
    let portfolio = repository
        .create(NewPortfolio {
            id: None,
            name: "Test".to_string(),
            base_currency: "USD".to_string(),
            opening_cash: cash,
        })
        .await
        .expect("create portfolio");
    portfolio.id
}

fn buy(symbol: &str, quantity: rust_decimal::Decimal, price: rust_decimal::Decimal) -> TradeInstruction {
    TradeInstruction {
        symbol: symbol.to_string(),
        side: TradeSide::Buy,
        quantity,
        price,
    }
}

fn sell(symbol: &str, quantity: rust_decimal::Decimal, price: rust_decimal::Decimal) -> TradeInstruction {
    TradeInstruction {
        symbol: symbol.to_string(),
        side: TradeSide::Sell,
        quantity,
        price,
    }
}

#[tokio::test]
async fn batch_applies_cash_positions_and_trades() {
    let db = setup();
    let portfolio_id = create_portfolio(&db, dec!(10000)).await;

    let ledger = LedgerRepository::new(db.writer.clone());
    let updated = ledger
        .execute_batch(
            &portfolio_id,
            vec![
                buy("AAPL", dec!(10), dec!(100)),
                buy("AAPL", dec!(5), dec!(110)),
                sell("AAPL", dec!(4), dec!(120)),
            ],
        )
        .await
        .expect("execute batch");

    // 10000 - 1000 - 550 + 480
    assert_eq!(updated.cash_balance, dec!(8930));

    let portfolio_repo = PortfolioRepository::new(db.pool.clone(), db.writer.clone());
    let positions = portfolio_repo.list_positions(&portfolio_id).expect("positions");
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].quantity, dec!(11));
    // SELL keeps the blended average of (10*100 + 5*110) / 15.
    assert_eq!(positions[0].average_price.round_dp(2), dec!(103.33));

    let trade_repo = TradeRepository::new(db.pool.clone());
    let trades = trade_repo.list(&portfolio_id).expect("trades");
    assert_eq!(trades.len(), 3);
}

#[tokio::test]
async fn selling_out_removes_the_position_row() {
    let db = setup();
    let portfolio_id = create_portfolio(&db, dec!(5000)).await;

    let ledger = LedgerRepository::new(db.writer.clone());
    ledger
        .execute_batch(&portfolio_id, vec![buy("NVDA", dec!(3), dec!(500))])
        .await
        .expect("buy");
    ledger
        .execute_batch(&portfolio_id, vec![sell("NVDA", dec!(3), dec!(550))])
        .await
        .expect("sell");

    let portfolio_repo = PortfolioRepository::new(db.pool.clone(), db.writer.clone());
    let positions = portfolio_repo.list_positions(&portfolio_id).expect("positions");
    assert!(positions.is_empty());
}

#[tokio::test]
async fn failing_batch_rolls_back_entirely() {
    let db = setup();
    let portfolio_id = create_portfolio(&db, dec!(10000)).await;

    let ledger = LedgerRepository::new(db.writer.clone());
    // First instruction is valid, the second oversells a position that the
    // first one just created. The whole batch must vanish.
    let err = ledger
        .execute_batch(
            &portfolio_id,
            vec![buy("AMD", dec!(5), dec!(100)), sell("AMD", dec!(6), dec!(100))],
        )
        .await
        .expect_err("batch should fail");
    assert!(matches!(err, Error::Ledger(LedgerError::Oversell)));

    let portfolio_repo = PortfolioRepository::new(db.pool.clone(), db.writer.clone());
    let portfolio = portfolio_repo.get_by_id(&portfolio_id).expect("portfolio");
    assert_eq!(portfolio.cash_balance, dec!(10000));
    assert!(portfolio_repo
        .list_positions(&portfolio_id)
        .expect("positions")
        .is_empty());

    let trade_repo = TradeRepository::new(db.pool.clone());
    assert!(trade_repo.list(&portfolio_id).expect("trades").is_empty());
}

#[tokio::test]
async fn buy_beyond_cash_is_rejected_with_no_partial_debit() {
    let db = setup();
    let portfolio_id = create_portfolio(&db, dec!(500)).await;

    let ledger = LedgerRepository::new(db.writer.clone());
    let err = ledger
        .execute_batch(&portfolio_id, vec![buy("GOOG", dec!(10), dec!(100))])
        .await
        .expect_err("insufficient cash");
    assert!(matches!(err, Error::Ledger(LedgerError::InsufficientCash)));

    let portfolio_repo = PortfolioRepository::new(db.pool.clone(), db.writer.clone());
    let portfolio = portfolio_repo.get_by_id(&portfolio_id).expect("portfolio");
    assert_eq!(portfolio.cash_balance, dec!(500));
}

#[tokio::test]
async fn unknown_portfolio_fails_fast() {
    let db = setup();
    let ledger = LedgerRepository::new(db.writer.clone());
    let err = ledger
        .execute_batch("missing", vec![buy("AAPL", dec!(1), dec!(1))])
        .await
        .expect_err("unknown portfolio");
    assert!(matches!(err, Error::NotFound(_)));
}
