//! Integration tests running the core services against a temporary SQLite database.

use brokerage_core::errors::{DatabaseError, Error, Result};
use brokerage_core::events::NoOpDomainEventSink;
use brokerage_core::ledger::LedgerStoreTrait;
use brokerage_core::market_prices::{
    MarketPriceService, MarketPriceServiceTrait, PricingProviderTrait, PricingService,
};
use brokerage_core::money::{Currency, Money};
use brokerage_core::orders::{NewOrder, OrderService, OrderServiceTrait, OrderStatus};
use brokerage_core::portfolios::{
    AdjustmentKind, ManualTotals, NewPortfolio, Portfolio, PortfolioService,
    PortfolioServiceTrait, ValuationMode,
};
use brokerage_core::positions::{InvestmentType, NewPosition};
use brokerage_core::settings::SettingsRepositoryTrait;
use brokerage_core::trading::{TradeRequest, TradeService, TradeServiceTrait, TradeSide, TradeTarget};
use brokerage_core::valuation::recalculate;
use brokerage_storage_sqlite::db::{create_pool, run_migrations, spawn_writer};
use brokerage_storage_sqlite::ledger::SqliteLedgerStore;
use brokerage_storage_sqlite::market_prices::MarketPriceRepository;
use brokerage_storage_sqlite::orders::OrderRepository;
use brokerage_storage_sqlite::portfolios::PortfolioRepository;
use brokerage_storage_sqlite::positions::PositionRepository;
use brokerage_storage_sqlite::settings::SettingsRepository;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

struct Harness {
    ledger: Arc<dyn LedgerStoreTrait>,
    settings: Arc<SettingsRepository>,
    portfolios: PortfolioService,
    orders: Arc<OrderService>,
    trades: TradeService,
    prices: MarketPriceService,
    // Keeps the database file alive for the duration of the test
    _temp_dir: TempDir,
}

fn harness() -> Harness {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
    run_migrations(&pool).expect("Failed to run migrations");
    let writer = spawn_writer((*pool).clone());

    let ledger: Arc<dyn LedgerStoreTrait> = Arc::new(SqliteLedgerStore::new(writer.clone()));
    let portfolio_repository = Arc::new(PortfolioRepository::new(pool.clone()));
    let position_repository = Arc::new(PositionRepository::new(pool.clone()));
    let order_repository = Arc::new(OrderRepository::new(pool.clone()));
    let market_price_repository = Arc::new(MarketPriceRepository::new(pool.clone()));
    let settings = Arc::new(SettingsRepository::new(pool.clone(), writer));
    let pricing: Arc<dyn PricingProviderTrait> = Arc::new(PricingService::new(
        settings.clone(),
        market_price_repository.clone(),
    ));

    Harness {
        portfolios: PortfolioService::new(
            ledger.clone(),
            portfolio_repository.clone(),
            position_repository.clone(),
            Arc::new(NoOpDomainEventSink),
        ),
        orders: Arc::new(OrderService::new(
            ledger.clone(),
            order_repository,
            Arc::new(NoOpDomainEventSink),
        )),
        trades: TradeService::new(
            ledger.clone(),
            portfolio_repository,
            position_repository,
            pricing,
            Arc::new(NoOpDomainEventSink),
        ),
        prices: MarketPriceService::new(
            ledger.clone(),
            market_price_repository,
            Arc::new(NoOpDomainEventSink),
        ),
        ledger,
        settings,
        _temp_dir: temp_dir,
    }
}

fn usd(amount: Decimal) -> Money {
    Money::parse(amount, "USD").unwrap()
}

async fn create_portfolio(h: &Harness) -> Portfolio {
    h.portfolios
        .create_portfolio(NewPortfolio {
            id: None,
            user_id: "user-1".to_string(),
            name: "Retirement".to_string(),
            description: Some("Long term".to_string()),
            currency: Currency::parse("USD").unwrap(),
        })
        .await
        .unwrap()
}

fn new_position(portfolio_id: &str, quantity: Decimal, purchase: Decimal) -> NewPosition {
    NewPosition {
        id: None,
        portfolio_id: portfolio_id.to_string(),
        order_id: None,
        investment_type: InvestmentType::Bond,
        name: "Treasury 2030".to_string(),
        symbol: Some("T2030".to_string()),
        quantity,
        purchase_price: usd(purchase),
        current_price: None,
        purchase_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        maturity_date: Some(NaiveDate::from_ymd_opt(2030, 2, 1).unwrap()),
        interest_rate: Some(dec!(4.125)),
        status: None,
    }
}

fn new_order(portfolio_id: &str) -> NewOrder {
    NewOrder {
        id: None,
        user_id: "user-1".to_string(),
        portfolio_id: portfolio_id.to_string(),
        investment_type: InvestmentType::Stock,
        name: "Acme Corp".to_string(),
        symbol: Some("ACME".to_string()),
        quantity: dec!(3),
        price: usd(dec!(100)),
        maturity_date: None,
        interest_rate: None,
    }
}

#[tokio::test]
async fn test_positions_round_trip_exact_decimals() {
    let h = harness();
    let portfolio = create_portfolio(&h).await;
    let added = h
        .portfolios
        .add_position(new_position(&portfolio.id, dec!(0.123456), dec!(1012.345678)))
        .await
        .unwrap();

    let stored = h.portfolios.get_positions(&portfolio.id).unwrap();
    assert_eq!(stored, vec![added]);

    let reloaded = h.portfolios.get_portfolio(&portfolio.id).unwrap();
    assert_eq!(reloaded.description.as_deref(), Some("Long term"));
    assert_eq!(
        reloaded.totals,
        recalculate(reloaded.currency, &stored)
            .unwrap()
            .rounded_for_persistence()
    );
}

#[tokio::test]
async fn test_failed_job_rolls_back() {
    let h = harness();
    let portfolio = create_portfolio(&h).await;
    let renamed = Portfolio {
        name: "Renamed".to_string(),
        ..portfolio.clone()
    };

    let result: Result<()> = h
        .ledger
        .execute(move |writer| {
            writer.update_portfolio(&renamed)?;
            Err(Error::InvalidAdjustment("abort".to_string()))
        })
        .await;

    // the domain error crosses the transaction boundary unchanged
    assert!(matches!(result, Err(Error::InvalidAdjustment(_))));
    assert_eq!(
        h.portfolios.get_portfolio(&portfolio.id).unwrap().name,
        "Retirement"
    );
}

#[tokio::test]
async fn test_manual_override_is_audited() {
    let h = harness();
    let portfolio = create_portfolio(&h).await;
    h.portfolios
        .add_position(new_position(&portfolio.id, dec!(10), dec!(100)))
        .await
        .unwrap();

    let manual = h
        .portfolios
        .set_manual_totals(
            &portfolio.id,
            ManualTotals::new(dec!(5000), dec!(0), dec!(5000)),
        )
        .await
        .unwrap();
    assert_eq!(manual.valuation_mode, ValuationMode::Manual);
    assert!(manual.totals.gain_percentage.is_zero());

    h.portfolios
        .add_position(new_position(&portfolio.id, dec!(1), dec!(50)))
        .await
        .unwrap();
    let auto = h.portfolios.switch_to_auto(&portfolio.id).await.unwrap();
    assert_eq!(auto.totals.total_value.amount(), dec!(1050));

    let kinds: Vec<AdjustmentKind> = h
        .portfolios
        .list_adjustments(&portfolio.id)
        .unwrap()
        .into_iter()
        .map(|a| a.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            AdjustmentKind::ManualTotals,
            AdjustmentKind::DeferredPositionChange,
            AdjustmentKind::SwitchToAuto,
        ]
    );
}

#[tokio::test]
async fn test_delete_is_strict_unless_cascading() {
    let h = harness();
    let portfolio = create_portfolio(&h).await;
    h.portfolios
        .add_position(new_position(&portfolio.id, dec!(1), dec!(10)))
        .await
        .unwrap();
    h.orders.submit_order(new_order(&portfolio.id)).await.unwrap();

    assert!(matches!(
        h.portfolios.delete_portfolio(&portfolio.id).await,
        Err(Error::PortfolioNotEmpty {
            position_count: 1,
            ..
        })
    ));

    assert_eq!(
        h.portfolios
            .delete_portfolio_with_positions(&portfolio.id)
            .await
            .unwrap(),
        1
    );
    assert!(matches!(
        h.portfolios.get_portfolio(&portfolio.id),
        Err(Error::Database(DatabaseError::NotFound(_)))
    ));
    assert!(h
        .orders
        .list_orders(None, Some(&portfolio.id))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_removed_position_does_not_block_maturity() {
    let h = harness();
    let portfolio = create_portfolio(&h).await;
    let due_date = NaiveDate::from_ymd_opt(2031, 1, 1).unwrap();

    let mut first = new_order(&portfolio.id);
    first.maturity_date = Some(due_date);
    let first = h.orders.submit_order(first).await.unwrap();
    let first = h.orders.approve(&first.id).await.unwrap();
    h.portfolios
        .remove_position(first.position_id.as_deref().unwrap())
        .await
        .unwrap();

    let stored = h.orders.get_order(&first.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.position_id, None);

    let mut second = new_order(&portfolio.id);
    second.maturity_date = Some(due_date);
    let second = h.orders.submit_order(second).await.unwrap();
    h.orders.approve(&second.id).await.unwrap();

    let matured = h.orders.mature_due_orders(due_date).await.unwrap();
    assert_eq!(
        matured.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
        vec![second.id.as_str()]
    );
    assert!(h
        .portfolios
        .get_positions(&portfolio.id)
        .unwrap()
        .iter()
        .all(|p| p.status == OrderStatus::Matured));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_transitions_have_one_winner() {
    let h = harness();
    let portfolio = create_portfolio(&h).await;

    for _ in 0..5 {
        let order = h.orders.submit_order(new_order(&portfolio.id)).await.unwrap();
        let approve = {
            let orders = h.orders.clone();
            let id = order.id.clone();
            tokio::spawn(async move { orders.approve(&id).await })
        };
        let reject = {
            let orders = h.orders.clone();
            let id = order.id.clone();
            tokio::spawn(async move { orders.reject(&id, Some("duplicate".to_string())).await })
        };
        let (approved, rejected) = (approve.await.unwrap(), reject.await.unwrap());
        assert!(approved.is_ok() != rejected.is_ok());

        let stored = h.orders.get_order(&order.id).unwrap();
        assert_eq!(stored.position_id.is_some(), stored.status == OrderStatus::Active);
    }

    let positions = h.portfolios.get_positions(&portfolio.id).unwrap();
    let stored = h.portfolios.get_portfolio(&portfolio.id).unwrap();
    assert_eq!(
        stored.totals,
        recalculate(stored.currency, &positions)
            .unwrap()
            .rounded_for_persistence()
    );
}

#[tokio::test]
async fn test_trading_uses_stored_fee_rate_and_prices() {
    let h = harness();
    let portfolio = create_portfolio(&h).await;
    assert_eq!(h.settings.get_setting("fee_rate").unwrap(), "0.01");

    h.prices.update_price("ACME", usd(dec!(450))).await.unwrap();
    let request = TradeRequest {
        side: TradeSide::Buy,
        portfolio_id: portfolio.id.clone(),
        target: TradeTarget::Catalog {
            symbol: "ACME".to_string(),
            name: "Acme Corp".to_string(),
            investment_type: InvestmentType::Stock,
        },
        quantity: dec!(5),
    };
    let execution = h.trades.buy(request).await.unwrap();
    assert_eq!(execution.position.total_value(), usd(dec!(2250)));

    h.settings.update_setting("fee_rate", "0.02").await.unwrap();
    h.prices.update_price("ACME", usd(dec!(500))).await.unwrap();

    let repriced = h.portfolios.get_portfolio(&portfolio.id).unwrap();
    assert_eq!(repriced.totals.total_value.amount(), dec!(2500));
    assert_eq!(repriced.totals.total_gain.amount(), dec!(250));

    let sell = TradeRequest {
        side: TradeSide::Sell,
        portfolio_id: portfolio.id.clone(),
        target: TradeTarget::Position {
            position_id: execution.position.id.clone(),
        },
        quantity: dec!(6),
    };
    assert!(matches!(
        h.trades.sell(sell).await,
        Err(Error::InsufficientHolding { .. })
    ));
}
