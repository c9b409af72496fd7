#[cfg(test)]
mod tests {
    use crate::errors::{DatabaseError, Error};
    use crate::events::{DomainEvent, MockDomainEventSink};
    use crate::ledger::{InMemoryLedgerStore, LedgerStoreTrait};
    use crate::money::{Currency, Money};
    use crate::orders::OrderStatus;
    use crate::portfolios::{
        AdjustmentKind, ManualTotals, NewPortfolio, Portfolio, PortfolioService,
        PortfolioServiceTrait, PortfolioUpdate, ValuationMode,
    };
    use crate::positions::{InvestmentType, NewPosition, PositionUpdate};
    use crate::settings::SettingsRepositoryTrait;
    use crate::valuation::recalculate;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<InMemoryLedgerStore>,
        sink: MockDomainEventSink,
        service: PortfolioService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryLedgerStore::new());
        let sink = MockDomainEventSink::new();
        let service = PortfolioService::new(
            store.clone() as Arc<dyn LedgerStoreTrait>,
            store.clone(),
            store.clone(),
            Arc::new(sink.clone()),
        );
        Fixture {
            store,
            sink,
            service,
        }
    }

    fn usd(amount: Decimal) -> Money {
        Money::parse(amount, "USD").unwrap()
    }

    async fn create_portfolio(service: &PortfolioService) -> Portfolio {
        service
            .create_portfolio(NewPortfolio {
                id: None,
                user_id: "user-1".to_string(),
                name: "Growth".to_string(),
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
            investment_type: InvestmentType::Stock,
            name: "Acme Corp".to_string(),
            symbol: Some("ACME".to_string()),
            quantity,
            purchase_price: usd(purchase),
            current_price: None,
            purchase_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            maturity_date: None,
            interest_rate: None,
            status: None,
        }
    }

    fn assert_no_drift(fixture: &Fixture, portfolio_id: &str) {
        let portfolio = fixture.service.get_portfolio(portfolio_id).unwrap();
        let positions = fixture.service.get_positions(portfolio_id).unwrap();
        let expected = recalculate(portfolio.currency, &positions)
            .unwrap()
            .rounded_for_persistence();
        assert_eq!(portfolio.totals, expected);
    }

    #[tokio::test]
    async fn test_auto_totals_follow_every_position_mutation() {
        let fixture = fixture();
        let portfolio = create_portfolio(&fixture.service).await;

        let first = fixture
            .service
            .add_position(new_position(&portfolio.id, dec!(10), dec!(400)))
            .await
            .unwrap();
        assert_no_drift(&fixture, &portfolio.id);

        let second = fixture
            .service
            .add_position(new_position(&portfolio.id, dec!(2.5), dec!(19.99)))
            .await
            .unwrap();
        assert_no_drift(&fixture, &portfolio.id);

        fixture
            .service
            .update_position(PositionUpdate {
                id: first.id.clone(),
                name: first.name.clone(),
                symbol: first.symbol.clone(),
                quantity: dec!(10),
                purchase_price: usd(dec!(400)),
                current_price: usd(dec!(450)),
                maturity_date: None,
                interest_rate: None,
            })
            .await
            .unwrap();
        assert_no_drift(&fixture, &portfolio.id);

        let totals = fixture.service.get_portfolio(&portfolio.id).unwrap().totals;
        assert_eq!(totals.total_value.amount(), dec!(4549.98));
        assert_eq!(totals.total_invested.amount(), dec!(4049.98));
        assert_eq!(totals.total_gain.amount(), dec!(500));

        fixture.service.remove_position(&second.id).await.unwrap();
        assert_no_drift(&fixture, &portfolio.id);
        let totals = fixture.service.get_portfolio(&portfolio.id).unwrap().totals;
        assert_eq!(totals.gain_percentage, dec!(12.5));
    }

    #[tokio::test]
    async fn test_position_in_foreign_currency_is_rejected() {
        let fixture = fixture();
        let portfolio = create_portfolio(&fixture.service).await;

        let mut input = new_position(&portfolio.id, dec!(1), dec!(10));
        input.purchase_price = Money::parse(dec!(10), "EUR").unwrap();
        let result = fixture.service.add_position(input).await;
        assert!(matches!(result, Err(Error::CurrencyMismatch { .. })));
        assert!(fixture.service.get_positions(&portfolio.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_positions_cannot_be_edited_or_removed() {
        let fixture = fixture();
        let portfolio = create_portfolio(&fixture.service).await;

        let mut input = new_position(&portfolio.id, dec!(1), dec!(10));
        input.status = Some(OrderStatus::Pending);
        let pending = fixture.service.add_position(input).await.unwrap();

        let update = PositionUpdate {
            id: pending.id.clone(),
            name: pending.name.clone(),
            symbol: None,
            quantity: dec!(2),
            purchase_price: usd(dec!(10)),
            current_price: usd(dec!(10)),
            maturity_date: None,
            interest_rate: None,
        };
        assert!(matches!(
            fixture.service.update_position(update).await,
            Err(Error::InvalidOrderState {
                status: OrderStatus::Pending,
                action: "edit",
                ..
            })
        ));
        assert!(matches!(
            fixture.service.remove_position(&pending.id).await,
            Err(Error::InvalidOrderState {
                action: "remove",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_manual_override_holds_until_switch_to_auto() {
        let fixture = fixture();
        let portfolio = create_portfolio(&fixture.service).await;
        fixture
            .service
            .add_position(new_position(&portfolio.id, dec!(10), dec!(400)))
            .await
            .unwrap();

        let manual = fixture
            .service
            .set_manual_totals(&portfolio.id, ManualTotals::new(dec!(9000), dec!(0), dec!(10)))
            .await
            .unwrap();
        assert_eq!(manual.valuation_mode, ValuationMode::Manual);
        assert_eq!(manual.totals.gain_percentage, Decimal::ZERO);

        fixture
            .service
            .add_position(new_position(&portfolio.id, dec!(1), dec!(5)))
            .await
            .unwrap();
        let still_manual = fixture.service.get_portfolio(&portfolio.id).unwrap();
        assert_eq!(still_manual.totals, manual.totals);

        let auto = fixture.service.switch_to_auto(&portfolio.id).await.unwrap();
        assert_eq!(auto.valuation_mode, ValuationMode::Auto);
        assert_eq!(auto.totals.total_value.amount(), dec!(4005));
        assert_no_drift(&fixture, &portfolio.id);

        let again = fixture.service.switch_to_auto(&portfolio.id).await.unwrap();
        assert_eq!(again.totals, auto.totals);
        assert_eq!(again.valuation_mode, ValuationMode::Auto);

        let kinds: Vec<AdjustmentKind> = fixture
            .service
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

        let mode_changes = fixture
            .sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, DomainEvent::ValuationModeChanged { .. }))
            .count();
        assert_eq!(mode_changes, 2);
    }

    #[tokio::test]
    async fn test_invalid_manual_totals_leave_portfolio_untouched() {
        let fixture = fixture();
        let portfolio = create_portfolio(&fixture.service).await;

        let result = fixture
            .service
            .set_manual_totals(&portfolio.id, ManualTotals::new(dec!(-10), dec!(0), dec!(0)))
            .await;
        assert!(matches!(result, Err(Error::InvalidAdjustment(_))));
        assert_eq!(fixture.service.get_portfolio(&portfolio.id).unwrap(), portfolio);
    }

    #[tokio::test]
    async fn test_delete_is_strict_unless_cascading() {
        let fixture = fixture();
        let portfolio = create_portfolio(&fixture.service).await;
        fixture
            .service
            .add_position(new_position(&portfolio.id, dec!(1), dec!(10)))
            .await
            .unwrap();

        match fixture.service.delete_portfolio(&portfolio.id).await {
            Err(Error::PortfolioNotEmpty {
                portfolio_id,
                position_count,
            }) => {
                assert_eq!(portfolio_id, portfolio.id);
                assert_eq!(position_count, 1);
            }
            other => panic!("expected PortfolioNotEmpty, got {:?}", other),
        }
        assert!(fixture.service.get_portfolio(&portfolio.id).is_ok());

        let deleted = fixture
            .service
            .delete_portfolio_with_positions(&portfolio.id)
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(matches!(
            fixture.service.get_portfolio(&portfolio.id),
            Err(Error::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_empty_portfolio_can_be_deleted() {
        let fixture = fixture();
        let portfolio = create_portfolio(&fixture.service).await;
        assert_eq!(fixture.service.delete_portfolio(&portfolio.id).await.unwrap(), 1);
        assert!(fixture.service.list_portfolios(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_user_portfolio_provisions_once() {
        let fixture = fixture();
        fixture
            .store
            .update_setting("base_currency", "EUR")
            .await
            .unwrap();

        let first = fixture.service.ensure_user_portfolio("user-9").await.unwrap();
        assert_eq!(first.currency.code(), "EUR");
        assert_eq!(first.name, "Main Portfolio");

        let second = fixture.service.ensure_user_portfolio("user-9").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(fixture.service.list_portfolios(Some("user-9")).unwrap().len(), 1);
        assert!(fixture.service.list_portfolios(Some("user-1")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_portfolio_metadata() {
        let fixture = fixture();
        let portfolio = create_portfolio(&fixture.service).await;

        let updated = fixture
            .service
            .update_portfolio(PortfolioUpdate {
                id: portfolio.id.clone(),
                name: "Income".to_string(),
                description: None,
                is_active: false,
            })
            .await
            .unwrap();
        assert_eq!(updated.name, "Income");
        assert!(!updated.is_active);
        assert_eq!(updated.totals, portfolio.totals);
        assert_eq!(updated.currency, portfolio.currency);

        assert!(fixture
            .service
            .update_portfolio(PortfolioUpdate {
                id: "missing".to_string(),
                name: "x".to_string(),
                description: None,
                is_active: true,
            })
            .await
            .is_err());
    }
}
